//! Rustrade Engine server -- headless trading system. Loads config, wires
//! every infrastructure adapter behind the domain's ports, builds the
//! `Engine`, and drives its tick loop on a timer until Ctrl+C.

use rustrade_engine::application::engine::Engine;
use rustrade_engine::application::market_data::CachedMarketDataProvider;
use rustrade_engine::application::signal_manager::SignalManager;
use rustrade_engine::application::time_filter::TimeFilter;
use rustrade_engine::config::EngineConfig;
use rustrade_engine::domain::broker::BrokerType;
use rustrade_engine::domain::market::RegimeDetector;
use rustrade_engine::domain::risk::RiskManager;
use rustrade_engine::infrastructure::broker::RestBrokerAdapter;
use rustrade_engine::infrastructure::market_data::HttpMarketDataSource;
use rustrade_engine::infrastructure::persistence::database::Database;
use rustrade_engine::infrastructure::persistence::repositories::{
    SqliteAuditLogRepository, SqliteDailyMetricsRepository, SqliteEquityCurveRepository, SqlitePositionRepository,
    SqliteRiskStateRepository, SqliteSignalRepository, SqliteTradeHistoryRepository, SqliteTradeRepository,
};

use anyhow::Result;
use chrono::Datelike;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!("Rustrade Engine {} starting...", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::load()?;
    info!(env = %config.env_label, symbols = config.runtime.watched_symbols.len(), "configuration loaded");

    let database = Database::new(&config.database_url).await?;

    let trade_repo = Arc::new(SqliteTradeRepository::new(database.clone()));
    let position_repo = Arc::new(SqlitePositionRepository::new(database.clone(), "primary"));
    let trade_history_repo = Arc::new(SqliteTradeHistoryRepository::new(database.clone()));
    let signal_repo = Arc::new(SqliteSignalRepository::new(database.clone()));
    let risk_state_repo = Arc::new(SqliteRiskStateRepository::new(database.clone()));
    let audit_repo = Arc::new(SqliteAuditLogRepository::new(database.clone()));
    let daily_metrics_repo = Arc::new(SqliteDailyMetricsRepository::new(database.clone()));
    let equity_curve_repo = Arc::new(SqliteEquityCurveRepository::new(database.clone()));

    let initial_risk_state = risk_state_repo.load().await?;

    let futures_symbols: Vec<String> = config
        .runtime
        .watched_symbols
        .iter()
        .filter(|s| s.asset_class == rustrade_engine::domain::signal::AssetClass::Futures)
        .map(|s| s.symbol.clone())
        .collect();
    let equity_symbols: Vec<String> = config
        .runtime
        .watched_symbols
        .iter()
        .filter(|s| s.asset_class == rustrade_engine::domain::signal::AssetClass::Equity)
        .map(|s| s.symbol.clone())
        .collect();

    let mut brokers: HashMap<BrokerType, Arc<dyn rustrade_engine::domain::broker::BrokerAdapter>> = HashMap::new();
    brokers.insert(
        BrokerType::Futures,
        Arc::new(RestBrokerAdapter::new(
            config.futures_broker.base_url.clone(),
            config.futures_broker.api_key.clone(),
            config.futures_broker.api_secret.clone(),
            BrokerType::Futures,
            rustrade_engine::domain::signal::AssetClass::Futures,
            futures_symbols,
        )),
    );
    brokers.insert(
        BrokerType::Equity,
        Arc::new(RestBrokerAdapter::new(
            config.equity_broker.base_url.clone(),
            config.equity_broker.api_key.clone(),
            config.equity_broker.api_secret.clone(),
            BrokerType::Equity,
            rustrade_engine::domain::signal::AssetClass::Equity,
            equity_symbols,
        )),
    );

    let market_data_source = HttpMarketDataSource::new(
        config.market_data.base_url.clone(),
        config.market_data.api_key.clone(),
        config.market_data.api_secret.clone(),
    );
    let market_data = Arc::new(CachedMarketDataProvider::new(market_data_source));

    let signal_manager = SignalManager::new(config.signal, RegimeDetector::default(), TimeFilter::new(config.time_filter));
    let risk_manager = RiskManager::new(config.risk, config.exposure);
    let tick_interval_secs = config.runtime.tick_interval_secs;

    let engine = Arc::new(Engine::new(
        config.runtime,
        signal_manager,
        risk_manager,
        initial_risk_state,
        market_data,
        brokers,
        trade_repo,
        position_repo,
        trade_history_repo,
        signal_repo,
        risk_state_repo,
        audit_repo,
        daily_metrics_repo,
        equity_curve_repo,
        config.env_label,
    ));

    info!(interval_secs = tick_interval_secs, "engine built, starting tick loop");
    run_tick_loop(engine, tick_interval_secs).await
}

async fn run_tick_loop<S>(engine: Arc<Engine<S>>, tick_interval_secs: u64) -> Result<()>
where
    S: rustrade_engine::application::market_data::MarketDataSource + Send + Sync + 'static,
{
    let mut shutdown = Box::pin(tokio::signal::ctrl_c());
    let mut ticker = tokio::time::interval(Duration::from_secs(tick_interval_secs));
    let mut hourly = tokio::time::interval(Duration::from_secs(3600));
    let mut daily_boundary_check = tokio::time::interval(Duration::from_secs(60));
    let mut last_trading_day = chrono::Utc::now().date_naive();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = engine.run_tick().await {
                    tracing::error!(error = %e, "tick failed");
                }
            }
            _ = hourly.tick() => {
                if let Err(e) = engine.record_equity_snapshot().await {
                    tracing::error!(error = %e, "equity snapshot failed");
                }
            }
            _ = daily_boundary_check.tick() => {
                let today = chrono::Utc::now().date_naive();
                if today != last_trading_day {
                    let is_new_week = today.iso_week().week() != last_trading_day.iso_week().week() || today < last_trading_day;
                    let now_ms = chrono::Utc::now().timestamp_millis();
                    if let Err(e) = engine.run_daily_reset(today, is_new_week, now_ms).await {
                        tracing::error!(error = %e, "daily reset failed");
                    }
                    last_trading_day = today;
                }
            }
            _ = &mut shutdown => {
                info!("shutdown signal received, exiting");
                return Ok(());
            }
        }
    }
}
