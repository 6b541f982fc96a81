//! Configuration: env-driven via `dotenvy` at process start, composed into
//! a single `EngineConfig` aggregate. Each sub-config validates its own
//! ranges; `EngineConfig::load()` runs every sub-validation and additionally
//! enforces the one cross-field startup invariant (`min_order_value` must
//! not exceed `max_order_value`) before the engine is allowed to boot.

use crate::application::engine::{EngineRuntimeConfig, WatchedSymbol};
use crate::application::signal_manager::SignalManagerConfig;
use crate::application::time_filter::TimeFilterConfig;
use crate::domain::errors::ConfigError;
use crate::domain::exposure::ExposureLimits;
use crate::domain::risk::risk_config::RiskConfig;
use crate::domain::signal::AssetClass;
use crate::domain::trailing_stop::TrailingStopConfig;
use std::env;

/// Credentials and base URL for one broker adapter.
#[derive(Debug, Clone)]
pub struct BrokerCredentials {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
}

impl BrokerCredentials {
    fn from_env(prefix: &str) -> Self {
        Self {
            base_url: env::var(format!("{prefix}_BASE_URL")).unwrap_or_default(),
            api_key: env::var(format!("{prefix}_API_KEY")).unwrap_or_default(),
            api_secret: env::var(format!("{prefix}_API_SECRET")).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub risk: RiskConfig,
    pub exposure: ExposureLimits,
    pub signal: SignalManagerConfig,
    pub time_filter: TimeFilterConfig,
    pub trailing_stop: TrailingStopConfig,
    pub runtime: EngineRuntimeConfig,
    pub futures_broker: BrokerCredentials,
    pub equity_broker: BrokerCredentials,
    pub market_data: BrokerCredentials,
    pub database_url: String,
    pub env_label: String,
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_symbols(key: &str, default: &str, asset_class: AssetClass, timeframe: &str, bar_limit: u32) -> Vec<WatchedSymbol> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|symbol| WatchedSymbol {
            symbol: symbol.to_string(),
            asset_class,
            timeframe: timeframe.to_string(),
            bar_limit,
        })
        .collect()
}

impl EngineConfig {
    /// Loads `.env` (if present) then every setting from the environment,
    /// falling back to the same defaults the domain sub-configs carry.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut watched_symbols = parse_symbols("FUTURES_SYMBOLS", "MNQ,MES", AssetClass::Futures, "5Min", 200);
        watched_symbols.extend(parse_symbols("EQUITY_SYMBOLS", "SPY,QQQ", AssetClass::Equity, "5Min", 200));

        let exposure = ExposureLimits {
            max_gross_exposure_pct: parse_env("MAX_GROSS_EXPOSURE_PCT", ExposureLimits::default().max_gross_exposure_pct),
            max_net_long_pct: parse_env("MAX_NET_LONG_EXPOSURE_PCT", ExposureLimits::default().max_net_long_pct),
            max_net_short_pct: parse_env("MAX_NET_SHORT_EXPOSURE_PCT", ExposureLimits::default().max_net_short_pct),
            max_group_exposure_pct: parse_env("MAX_GROUP_EXPOSURE_PCT", ExposureLimits::default().max_group_exposure_pct),
            warning_threshold_pct: parse_env("EXPOSURE_WARNING_THRESHOLD_PCT", ExposureLimits::default().warning_threshold_pct),
            // Named correlation groups (spec §4.5) are declared with explicit
            // symbol sets, not a flat env var; operators who need different
            // groups override `ExposureLimits::groups` at call sites rather
            // than through this loader.
            groups: ExposureLimits::default().groups,
        };

        let config = Self {
            risk: RiskConfig::default(),
            exposure,
            signal: SignalManagerConfig::default(),
            time_filter: TimeFilterConfig::default(),
            trailing_stop: TrailingStopConfig::default(),
            runtime: EngineRuntimeConfig {
                watched_symbols,
                tick_interval_secs: parse_env("TICK_INTERVAL_SECS", 60),
                max_concurrent_symbols: parse_env("MAX_CONCURRENT_SYMBOLS", 8),
                trailing_stop: TrailingStopConfig::default(),
            },
            futures_broker: BrokerCredentials::from_env("FUTURES_BROKER"),
            equity_broker: BrokerCredentials::from_env("EQUITY_BROKER"),
            market_data: BrokerCredentials::from_env("MARKET_DATA"),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./data/engine.db".to_string()),
            env_label: env::var("ENGINE_ENV").unwrap_or_else(|_| "development".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.risk.validate()?;
        if self.runtime.watched_symbols.is_empty() {
            return Err(ConfigError::Invalid("at least one watched symbol is required".into()));
        }
        if self.runtime.tick_interval_secs == 0 {
            return Err(ConfigError::Invalid("tick_interval_secs must be > 0".into()));
        }
        if self.runtime.max_concurrent_symbols == 0 {
            return Err(ConfigError::Invalid("max_concurrent_symbols must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tick_interval_is_rejected() {
        let mut config = EngineConfig {
            risk: RiskConfig::default(),
            exposure: ExposureLimits::default(),
            signal: SignalManagerConfig::default(),
            time_filter: TimeFilterConfig::default(),
            trailing_stop: TrailingStopConfig::default(),
            runtime: EngineRuntimeConfig {
                watched_symbols: vec![WatchedSymbol {
                    symbol: "MNQ".into(),
                    asset_class: AssetClass::Futures,
                    timeframe: "5Min".into(),
                    bar_limit: 200,
                }],
                tick_interval_secs: 0,
                max_concurrent_symbols: 8,
                trailing_stop: TrailingStopConfig::default(),
            },
            futures_broker: BrokerCredentials { base_url: String::new(), api_key: String::new(), api_secret: String::new() },
            equity_broker: BrokerCredentials { base_url: String::new(), api_key: String::new(), api_secret: String::new() },
            market_data: BrokerCredentials { base_url: String::new(), api_key: String::new(), api_secret: String::new() },
            database_url: "sqlite://./data/test.db".into(),
            env_label: "test".into(),
        };
        assert!(config.validate().is_err());
        config.runtime.tick_interval_secs = 60;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn no_watched_symbols_is_rejected() {
        let config = EngineConfig {
            risk: RiskConfig::default(),
            exposure: ExposureLimits::default(),
            signal: SignalManagerConfig::default(),
            time_filter: TimeFilterConfig::default(),
            trailing_stop: TrailingStopConfig::default(),
            runtime: EngineRuntimeConfig {
                watched_symbols: vec![],
                tick_interval_secs: 60,
                max_concurrent_symbols: 8,
                trailing_stop: TrailingStopConfig::default(),
            },
            futures_broker: BrokerCredentials { base_url: String::new(), api_key: String::new(), api_secret: String::new() },
            equity_broker: BrokerCredentials { base_url: String::new(), api_key: String::new(), api_secret: String::new() },
            market_data: BrokerCredentials { base_url: String::new(), api_key: String::new(), api_secret: String::new() },
            database_url: "sqlite://./data/test.db".into(),
            env_label: "test".into(),
        };
        assert!(config.validate().is_err());
    }
}
