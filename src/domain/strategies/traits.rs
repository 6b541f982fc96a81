use crate::domain::errors::EngineError;
use crate::domain::market::{MarketRegime, PriceBar};
use crate::domain::signal::{AssetClass, Signal, SignalSource, SignalStatus};
use std::collections::HashMap;
use uuid::Uuid;

/// Everything a strategy needs to emit signals for one symbol/timeframe on
/// one tick. Strategies are pure: same input, same output, no side effects.
pub struct StrategyInput<'a> {
    pub symbol: &'a str,
    pub asset_class: AssetClass,
    pub timeframe: &'a str,
    pub bars: &'a [PriceBar],
    pub regime: MarketRegime,
    pub now_ms: i64,
    /// Signals below this strength are suppressed before being returned.
    pub min_strength: f64,
    pub signal_ttl_ms: i64,
}

pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn source(&self) -> SignalSource;

    /// At most one LONG and/or one SHORT candidate, with strength below
    /// `input.min_strength` already filtered out.
    fn evaluate(&self, input: &StrategyInput) -> Result<Vec<Signal>, EngineError>;
}

/// Shared constructor so every strategy builds signals identically:
/// candidates below `min_strength` are dropped here, once, instead of in
/// each strategy's own logic.
pub(super) fn build_signal(
    input: &StrategyInput,
    source: SignalSource,
    direction: crate::domain::indicators::Direction,
    strength: f64,
    entry_price: rust_decimal::Decimal,
    stop_loss: rust_decimal::Decimal,
    take_profit: Option<rust_decimal::Decimal>,
    reasons: Vec<String>,
    indicators: HashMap<String, f64>,
) -> Option<Signal> {
    use crate::domain::indicators::Direction as IndicatorDirection;
    use crate::domain::signal::Direction as SignalDirection;

    if strength < input.min_strength {
        return None;
    }

    let direction = match direction {
        IndicatorDirection::Long => SignalDirection::Long,
        IndicatorDirection::Short => SignalDirection::Short,
        IndicatorDirection::Neutral => return None,
    };

    Some(Signal {
        id: Uuid::new_v4().to_string(),
        symbol: input.symbol.to_string(),
        asset_class: input.asset_class,
        timeframe: input.timeframe.to_string(),
        direction,
        strength,
        entry_price,
        stop_loss,
        take_profit,
        source,
        regime: input.regime,
        reasons,
        indicators,
        status: SignalStatus::Active,
        timestamp: input.now_ms,
        expires_at: input.now_ms + input.signal_ttl_ms,
    })
}
