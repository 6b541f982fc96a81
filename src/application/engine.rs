//! The tick scheduler and control plane. `Engine` is the one struct that
//! knows about every other piece -- signal manager, risk manager, broker
//! adapters, repositories, trailing stops -- and the only thing `main`
//! constructs directly.

use crate::domain::audit::{AuditEntry, Category, Severity};
use crate::domain::broker::{BrokerAdapter, BrokerType, UnifiedOrder};
use crate::domain::errors::StorageError;
use crate::domain::repositories::{
    AuditLogRepository, DailyMetricsRepository, EquityCurvePoint, EquityCurveRepository, PositionRepository, QueryPage,
    RiskStateRepository, SignalRepository, TradeHistoryRepository, TradeRepository,
};
use crate::domain::risk::circuit_breaker::TriggerType;
use crate::domain::risk::{RiskManager, RiskState};
use crate::domain::signal::{AssetClass, Signal, SignalSource, SignalStatus};
use crate::domain::trading::{Order, Position, Trade};
use crate::domain::trailing_stop::{on_price_tick, TrailingStopConfig, TrailingStopState};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, Semaphore};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::market_data::{CachedMarketDataProvider, HistoryQuery, MarketDataSource};
use super::signal_manager::SignalManager;

#[derive(Debug, Clone)]
pub struct WatchedSymbol {
    pub symbol: String,
    pub asset_class: AssetClass,
    pub timeframe: String,
    pub bar_limit: u32,
}

#[derive(Debug, Clone)]
pub struct EngineRuntimeConfig {
    pub watched_symbols: Vec<WatchedSymbol>,
    pub tick_interval_secs: u64,
    pub max_concurrent_symbols: usize,
    pub trailing_stop: TrailingStopConfig,
}

impl Default for EngineRuntimeConfig {
    fn default() -> Self {
        Self {
            watched_symbols: Vec::new(),
            tick_interval_secs: 60,
            max_concurrent_symbols: 8,
            trailing_stop: TrailingStopConfig::default(),
        }
    }
}

/// Snapshot returned by the "read status" control-plane operation.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub risk_state: RiskState,
    pub open_position_count: usize,
    pub env_label: String,
}

pub struct Engine<S: MarketDataSource> {
    config: EngineRuntimeConfig,
    signal_manager: SignalManager,
    risk_manager: RiskManager,
    risk_state: Mutex<RiskState>,
    market_data: Arc<CachedMarketDataProvider<S>>,
    brokers: HashMap<BrokerType, Arc<dyn BrokerAdapter>>,
    trailing_stops: RwLock<HashMap<String, TrailingStopState>>,
    in_flight: Mutex<HashSet<String>>,
    tick_semaphore: Semaphore,
    env_label: String,

    trade_repo: Arc<dyn TradeRepository>,
    position_repo: Arc<dyn PositionRepository>,
    trade_history_repo: Arc<dyn TradeHistoryRepository>,
    signal_repo: Arc<dyn SignalRepository>,
    risk_state_repo: Arc<dyn RiskStateRepository>,
    audit_repo: Arc<dyn AuditLogRepository>,
    daily_metrics_repo: Arc<dyn DailyMetricsRepository>,
    equity_curve_repo: Arc<dyn EquityCurveRepository>,
}

impl<S: MarketDataSource> Engine<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EngineRuntimeConfig,
        signal_manager: SignalManager,
        risk_manager: RiskManager,
        initial_risk_state: RiskState,
        market_data: Arc<CachedMarketDataProvider<S>>,
        brokers: HashMap<BrokerType, Arc<dyn BrokerAdapter>>,
        trade_repo: Arc<dyn TradeRepository>,
        position_repo: Arc<dyn PositionRepository>,
        trade_history_repo: Arc<dyn TradeHistoryRepository>,
        signal_repo: Arc<dyn SignalRepository>,
        risk_state_repo: Arc<dyn RiskStateRepository>,
        audit_repo: Arc<dyn AuditLogRepository>,
        daily_metrics_repo: Arc<dyn DailyMetricsRepository>,
        equity_curve_repo: Arc<dyn EquityCurveRepository>,
        env_label: String,
    ) -> Self {
        let max_concurrent = config.max_concurrent_symbols;
        Self {
            config,
            signal_manager,
            risk_manager,
            risk_state: Mutex::new(initial_risk_state),
            market_data,
            brokers,
            trailing_stops: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
            tick_semaphore: Semaphore::new(max_concurrent),
            env_label,
            trade_repo,
            position_repo,
            trade_history_repo,
            signal_repo,
            risk_state_repo,
            audit_repo,
            daily_metrics_repo,
            equity_curve_repo,
        }
    }

    fn broker_for(&self, asset_class: AssetClass) -> Option<&Arc<dyn BrokerAdapter>> {
        let broker_type = match asset_class {
            AssetClass::Futures => BrokerType::Futures,
            AssetClass::Equity => BrokerType::Equity,
        };
        self.brokers.get(&broker_type)
    }

    async fn audit(&self, severity: Severity, category: Category, message: impl Into<String>, related: Option<(&str, &str)>) {
        let message = message.into();
        let mut entry = AuditEntry::new(Uuid::new_v4().to_string(), Utc::now().timestamp_millis(), severity, category, message.clone());
        if let Some((id, kind)) = related {
            entry = entry.with_related(id, kind);
        }
        match severity {
            Severity::Critical | Severity::Error => error!(%message, "audit"),
            Severity::Warn => warn!(%message, "audit"),
            Severity::Info => info!(%message, "audit"),
        }
        if let Err(e) = self.audit_repo.append(entry).await {
            error!(error = %e, "failed to persist audit entry");
        }
    }

    /// Runs one tick: fans out across watched symbols with bounded
    /// concurrency, never starting a second overlapping tick for a symbol
    /// whose prior tick hasn't finished.
    #[instrument(skip(self))]
    pub async fn run_tick(self: &Arc<Self>) -> Result<()>
    where
        S: 'static,
    {
        let now = Utc::now();
        let now_ms = now.timestamp_millis();

        let mut handles = Vec::new();
        for watched in self.config.watched_symbols.clone() {
            {
                let mut in_flight = self.in_flight.lock().await;
                if in_flight.contains(&watched.symbol) {
                    warn!(symbol = %watched.symbol, "skipping tick, prior tick still in flight");
                    continue;
                }
                in_flight.insert(watched.symbol.clone());
            }

            let engine = self.clone();
            let symbol = watched.symbol.clone();
            handles.push(tokio::spawn(async move {
                let _permit = engine.tick_semaphore.acquire().await.expect("semaphore is never closed");
                let result = engine.process_symbol(&watched, now, now_ms).await;
                if let Err(e) = &result {
                    error!(symbol = %symbol, error = %e, "tick failed for symbol");
                }
                engine.in_flight.lock().await.remove(&symbol);
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    }

    #[instrument(skip(self, watched), fields(symbol = %watched.symbol))]
    async fn process_symbol(&self, watched: &WatchedSymbol, now: DateTime<Utc>, now_ms: i64) -> Result<()> {
        let bars = self
            .market_data
            .fetch_historical_data(
                &watched.symbol,
                &watched.timeframe,
                HistoryQuery { limit: Some(watched.bar_limit), ..Default::default() },
            )
            .await
            .with_context(|| format!("fetching bars for {}", watched.symbol))?;

        let signals = self
            .signal_manager
            .evaluate_symbol(&watched.symbol, watched.asset_class, &watched.timeframe, &bars, now_ms, now);

        for signal in signals {
            self.handle_signal(signal).await?;
        }

        self.update_trailing_stops(watched, &bars, now_ms).await?;
        Ok(())
    }

    async fn handle_signal(&self, signal: Signal) -> Result<()> {
        let persisted = self.signal_repo.create(signal.clone()).await.context("persisting signal")?;

        let Some(broker) = self.broker_for(persisted.asset_class) else {
            warn!(symbol = %persisted.symbol, "no broker adapter registered for asset class");
            return Ok(());
        };

        let account = broker.get_account().await.context("fetching account for risk evaluation")?;
        let positions = broker.get_positions().await.context("fetching positions for risk evaluation")?;
        let current_positions: HashMap<String, rust_decimal::Decimal> = positions
            .iter()
            .map(|p| (p.symbol.clone(), p.quantity * p.average_price))
            .collect();

        let mut risk_state = self.risk_state.lock().await;
        let decision = self.risk_manager.evaluate_order(
            &persisted,
            &account,
            &risk_state,
            positions.len(),
            &current_positions,
            persisted.timestamp,
        );

        use crate::domain::risk::filters::Decision;
        match decision.decision {
            Decision::Block => {
                self.signal_repo.update_status(&persisted.id, SignalStatus::Cancelled).await.ok();
                self.audit(
                    Severity::Info,
                    Category::Risk,
                    format!("signal {} blocked: {}", persisted.id, decision.reason.unwrap_or_default()),
                    Some((&persisted.id, "signal")),
                )
                .await;
            }
            Decision::Allow | Decision::Reduce => {
                let qty = decision.position_size.unwrap_or_default();
                let order = UnifiedOrder {
                    client_order_id: Uuid::new_v4().to_string(),
                    symbol: persisted.symbol.clone(),
                    asset_class: persisted.asset_class,
                    direction: persisted.direction,
                    quantity: qty,
                    order_type: crate::domain::trading::OrderType::Market,
                    limit_price: None,
                    stop_price: Some(persisted.stop_loss),
                    signal_id: Some(persisted.id.clone()),
                };
                match broker.place_order(order).await {
                    Ok(result) => {
                        self.signal_repo.update_status(&persisted.id, SignalStatus::Executed).await.ok();
                        self.persist_order_result(&persisted, &result).await;
                    }
                    Err(e) => {
                        warn!(symbol = %persisted.symbol, error = %e, "order placement failed");
                        self.audit(
                            Severity::Error,
                            Category::Broker,
                            format!("order placement failed for signal {}: {}", persisted.id, e),
                            Some((&persisted.id, "signal")),
                        )
                        .await;
                    }
                }
            }
        }

        risk_state.update_equity(account.equity, persisted.timestamp);
        self.check_and_trip_circuit_breaker(&mut risk_state, persisted.timestamp).await;
        self.risk_state_repo.save(&risk_state).await.ok();
        Ok(())
    }

    /// Spec §4.4: every fill-driven equity update re-runs the circuit
    /// breaker's trigger checks. A fresh trip here is what a *later* tick's
    /// circuit-breaker gate (step 1 of `evaluate_order`) must already see,
    /// per the ordering guarantee in §5 -- this runs under the same
    /// `risk_state` lock the caller is already holding.
    async fn check_and_trip_circuit_breaker(&self, state: &mut RiskState, now_ms: i64) {
        if state.circuit_breaker_triggered {
            return;
        }
        if let Some(trigger) = self.risk_manager.circuit_breaker.check_triggers(state, &self.risk_manager.config) {
            self.risk_manager.circuit_breaker.trip(state, trigger, now_ms);
            self.audit(
                Severity::Critical,
                Category::Risk,
                format!("circuit breaker tripped: {}", trigger.reason()),
                None,
            )
            .await;
        }
    }

    async fn persist_order_result(&self, signal: &Signal, result: &crate::domain::broker::OrderResult) {
        let order = Order {
            id: Uuid::new_v4().to_string(),
            client_order_id: result.client_order_id.clone(),
            broker_order_id: Some(result.broker_order_id.clone()),
            symbol: signal.symbol.clone(),
            side: match signal.direction {
                crate::domain::signal::Direction::Long => crate::domain::trading::OrderSide::Buy,
                _ => crate::domain::trading::OrderSide::Sell,
            },
            order_type: crate::domain::trading::OrderType::Market,
            quantity: result.filled_quantity,
            filled_quantity: result.filled_quantity,
            limit_price: None,
            stop_price: Some(signal.stop_loss),
            status: crate::domain::trading::OrderStatus::Filled,
            signal_id: Some(signal.id.clone()),
            submitted_at: result.submitted_at,
            filled_at: Some(result.submitted_at),
        };
        if let Err(e) = self.trade_repo.create(order).await {
            error!(error = %e, "failed to persist order");
        }
    }

    async fn update_trailing_stops(&self, watched: &WatchedSymbol, bars: &[crate::domain::market::PriceBar], now_ms: i64) -> Result<()> {
        let Some(last_bar) = bars.last() else { return Ok(()) };
        let mut stops = self.trailing_stops.write().await;
        if let Some(state) = stops.get_mut(&watched.symbol) {
            let triggered = on_price_tick(state, last_bar.close, &self.config.trailing_stop, now_ms);
            if triggered {
                info!(symbol = %watched.symbol, stop = %state.current_stop, "trailing stop triggered");
                if let Some(broker) = self.broker_for(watched.asset_class) {
                    let held_quantity = broker
                        .get_positions()
                        .await
                        .ok()
                        .and_then(|positions| positions.into_iter().find(|p| p.symbol == watched.symbol).map(|p| p.quantity))
                        .unwrap_or(rust_decimal::Decimal::ZERO);
                    if held_quantity.is_zero() {
                        warn!(symbol = %watched.symbol, "trailing stop fired but no held quantity found; skipping close order");
                    } else {
                        let close_order = UnifiedOrder {
                            client_order_id: Uuid::new_v4().to_string(),
                            symbol: watched.symbol.clone(),
                            asset_class: watched.asset_class,
                            direction: match state.side {
                                crate::domain::signal::Direction::Long => crate::domain::signal::Direction::Short,
                                crate::domain::signal::Direction::Short => crate::domain::signal::Direction::Long,
                                crate::domain::signal::Direction::Neutral => crate::domain::signal::Direction::Neutral,
                            },
                            quantity: held_quantity,
                            order_type: crate::domain::trading::OrderType::Market,
                            limit_price: None,
                            stop_price: None,
                            signal_id: None,
                        };
                        if let Err(e) = broker.place_order(close_order).await {
                            error!(symbol = %watched.symbol, error = %e, "trailing-stop close order failed");
                        }
                    }
                }
                stops.remove(&watched.symbol);
            }
        }
        Ok(())
    }

    /// Registers a newly opened position's trailing stop. Called once a
    /// fill confirms an entry; the engine is the map's only writer.
    pub async fn register_trailing_stop(&self, state: TrailingStopState) {
        self.trailing_stops.write().await.insert(state.symbol.clone(), state);
    }

    // --- Control plane (spec: inbound read-only operations plus one mutation) ---

    pub async fn status(&self) -> EngineStatus {
        let risk_state = self.risk_state.lock().await.clone();
        EngineStatus {
            open_position_count: self.trailing_stops.read().await.len(),
            risk_state,
            env_label: self.env_label.clone(),
        }
    }

    pub async fn active_signals(&self) -> Result<Vec<Signal>, StorageError> {
        self.signal_repo.find_active(Utc::now().timestamp_millis()).await
    }

    pub async fn trades(&self, symbol: Option<&str>, page: QueryPage) -> Result<Vec<Order>, StorageError> {
        self.trade_repo.list(symbol, page).await
    }

    pub async fn trade_history(&self, symbol: Option<&str>, page: QueryPage) -> Result<Vec<Trade>, StorageError> {
        self.trade_history_repo.list(symbol, page).await
    }

    pub async fn positions(&self) -> Result<Vec<Position>, StorageError> {
        self.position_repo.list_all().await
    }

    pub async fn audit_log(&self, category: Option<&str>, page: QueryPage) -> Result<Vec<AuditEntry>, StorageError> {
        self.audit_repo.list(category, page).await
    }

    /// The one control-plane mutation besides signal management: clears
    /// the circuit breaker unconditionally and leaves an audit trail.
    pub async fn reset_circuit_breaker(&self) -> Result<()> {
        let mut state = self.risk_state.lock().await;
        self.risk_manager.circuit_breaker.reset(&mut state);
        self.risk_state_repo.save(&state).await.context("persisting risk state after reset")?;
        drop(state);
        self.audit(Severity::Info, Category::Risk, "circuit breaker reset via control plane", None).await;
        Ok(())
    }

    // --- Scheduled events (spec §6: driven externally by a timer/cron the
    // transport layer owns; these are the handles it calls into) ---

    /// Hourly equity snapshot: records one `EquityCurvePoint` from the
    /// current risk-state equity reading.
    #[instrument(skip(self))]
    pub async fn record_equity_snapshot(&self) -> Result<()> {
        let state = self.risk_state.lock().await;
        let point = EquityCurvePoint { timestamp: state.last_updated, equity: state.current_equity, cash: state.current_equity };
        drop(state);
        self.equity_curve_repo.record(point).await.context("recording equity snapshot")
    }

    /// Daily reset: rolls `RiskState`'s start-of-day reference equity
    /// forward and clears the day's PDT/trade counters, upserting the
    /// closed day's rollup into `daily_metrics` first. `is_new_week` should
    /// be true only when this reset runs on a Monday boundary.
    #[instrument(skip(self))]
    pub async fn run_daily_reset(&self, today: chrono::NaiveDate, is_new_week: bool, now_ms: i64) -> Result<()> {
        let mut state = self.risk_state.lock().await;
        let closing_day = state.trading_day;
        let realized_pnl = state.daily_pnl();
        let trade_count = state.today_trade_count;
        let max_drawdown_pct = state.drawdown_pct();

        let history = self.trade_history_repo.list(None, QueryPage::default()).await.unwrap_or_default();
        let (win_count, loss_count) = history
            .iter()
            .filter(|t| t.exit_timestamp.is_some_and(|ts| {
                chrono::DateTime::from_timestamp_millis(ts).map(|dt| dt.date_naive() == closing_day).unwrap_or(false)
            }))
            .fold((0u32, 0u32), |(w, l), t| {
                if t.pnl > rust_decimal::Decimal::ZERO { (w + 1, l) } else if t.pnl < rust_decimal::Decimal::ZERO { (w, l + 1) } else { (w, l) }
            });

        self.daily_metrics_repo
            .upsert(crate::domain::repositories::DailyMetrics { trading_day: closing_day, realized_pnl, trade_count, win_count, loss_count, max_drawdown_pct })
            .await
            .ok();

        state.roll_to_new_day(today, is_new_week, now_ms);

        // DAILY_LOSS/WEEKLY_LOSS are indefinite halts (until=None); this
        // boundary is the only thing that clears them absent a manual reset.
        if state.circuit_breaker_triggered && state.circuit_breaker_until.is_none() {
            self.risk_manager.circuit_breaker.reset(&mut state);
            self.audit(Severity::Info, Category::Risk, "circuit breaker cleared by scheduled day/week rollover", None).await;
        }

        self.risk_state_repo.save(&state).await.context("persisting risk state after daily reset")?;
        drop(state);
        self.audit(Severity::Info, Category::Risk, format!("daily reset rolled over trading day {closing_day}"), None).await;
        Ok(())
    }

    pub async fn create_manual_signal(&self, mut signal: Signal) -> Result<Signal> {
        signal.source = SignalSource::Manual;
        signal.status = SignalStatus::Active;
        self.signal_repo.create(signal).await.context("persisting manual signal")
    }

    pub async fn cancel_signal(&self, signal_id: &str) -> Result<()> {
        self.signal_repo.update_status(signal_id, SignalStatus::Cancelled).await.context("cancelling signal")
    }
}
