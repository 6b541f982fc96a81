//! A trailing stop firing mid-tick: the ratchet math itself lives in
//! `domain::trailing_stop` and is unit-tested there. What only shows up
//! with the full `Engine` wired together is what happens *after* it
//! fires -- a held position gets looked up and closed at the broker, and
//! the stop is forgotten so it can't fire twice.

mod support;

use chrono::TimeZone;
use rustrade_engine::application::engine::{Engine, EngineRuntimeConfig, WatchedSymbol};
use rustrade_engine::application::market_data::CachedMarketDataProvider;
use rustrade_engine::application::signal_manager::{SignalManager, SignalManagerConfig, StrategyWeight};
use rustrade_engine::application::time_filter::{TimeFilter, TimeFilterConfig};
use rustrade_engine::domain::broker::{BrokerAdapter, BrokerType};
use rustrade_engine::domain::exposure::ExposureLimits;
use rustrade_engine::domain::market::{PriceBar, RegimeDetector, Timeframe};
use rustrade_engine::domain::risk::{RiskConfig, RiskManager, RiskState};
use rustrade_engine::domain::signal::{AssetClass, Direction};
use rustrade_engine::domain::trading::Position;
use rustrade_engine::domain::trailing_stop::{TrailingStopConfig, TrailingStopState};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

use support::{FakeBroker, FakeMarketDataSource, InMemoryRepos};

/// Every strategy disabled -- this test is only about what a tick does
/// with an already-registered trailing stop, not fresh signal generation.
fn signal_config() -> SignalManagerConfig {
    SignalManagerConfig {
        momentum: StrategyWeight { enabled: false, weight: 0.0 },
        mean_reversion: StrategyWeight { enabled: false, weight: 0.0 },
        breakout: StrategyWeight { enabled: false, weight: 0.0 },
        enable_regime_filter: false,
        enable_time_filter: false,
        min_strength: 0.1,
        max_signals_per_symbol: 3,
        signal_ttl_ms: 60 * 60 * 1000,
    }
}

fn flat_bars_ending_at(close: rust_decimal::Decimal) -> Vec<PriceBar> {
    let mut bars: Vec<PriceBar> = (0..40)
        .map(|i| PriceBar::new(i * 300_000, dec!(100), dec!(100.2), dec!(99.8), dec!(100), dec!(1000)))
        .collect();
    bars.push(PriceBar::new(40 * 300_000, close, close, close, close, dec!(1000)));
    bars
}

#[tokio::test]
async fn triggered_stop_closes_the_held_position_and_is_forgotten() {
    let now = chrono::Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
    let now_ms = now.timestamp_millis();

    let market_source = FakeMarketDataSource::new();
    // Closing price below the already-activated stop -- this is what
    // flips `check_trigger` true on the very first tick the engine runs.
    market_source.set_bars("MNQ", flat_bars_ending_at(dec!(99.9))).await;
    let market_data = Arc::new(CachedMarketDataProvider::new(market_source));

    let broker = Arc::new(FakeBroker::new(BrokerType::Futures, AssetClass::Futures, dec!(100000)).with_held_position(Position { symbol: "MNQ".into(), quantity: dec!(1), average_price: dec!(100) }));
    let mut brokers: HashMap<BrokerType, Arc<dyn BrokerAdapter>> = HashMap::new();
    brokers.insert(BrokerType::Futures, broker.clone());

    let risk_state = RiskState::new(dec!(100000), now.date_naive(), now_ms);
    let repos = Arc::new(InMemoryRepos::new(risk_state.clone()));

    let signal_manager = SignalManager::new(signal_config(), RegimeDetector::default(), TimeFilter::new(TimeFilterConfig::default()));
    let risk_manager = RiskManager::new(RiskConfig::default(), ExposureLimits::default());

    let runtime_config = EngineRuntimeConfig {
        watched_symbols: vec![WatchedSymbol { symbol: "MNQ".into(), asset_class: AssetClass::Futures, timeframe: Timeframe::FiveMin.as_str().into(), bar_limit: 200 }],
        trailing_stop: TrailingStopConfig::default(),
        ..Default::default()
    };

    let engine = Arc::new(Engine::new(
        runtime_config,
        signal_manager,
        risk_manager,
        risk_state,
        market_data,
        brokers,
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        "test".into(),
    ));

    // Already activated and ratcheted to 100.2 -- mirrors the state
    // `on_price_tick` would be in after the 100.2/100.5/100.4 leg of the
    // ratchet scenario, so this tick only needs to exercise the trigger.
    let mut state = TrailingStopState::new("pos-1".into(), "MNQ".into(), Direction::Long, dec!(100), dec!(98), now_ms);
    state.activated = true;
    state.current_stop = dec!(100.2);
    state.highest_price = dec!(100.5);
    engine.register_trailing_stop(state).await;

    assert_eq!(engine.status().await.open_position_count, 1);

    engine.run_tick().await.unwrap();

    assert_eq!(broker.order_count().await, 1, "the trigger should have closed the held position");
    let closing_order = &broker.placed_orders.lock().await[0];
    assert_eq!(closing_order.direction, Direction::Short, "closing a LONG trailing stop sells");
    assert_eq!(engine.status().await.open_position_count, 0, "the fired stop must be forgotten");
}
