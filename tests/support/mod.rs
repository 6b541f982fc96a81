//! In-memory fakes for the engine's ports, shared across integration tests.
//! Mirrors the teacher's own mock-service pattern: plain structs behind
//! tokio locks, no trait-object indirection beyond what the port demands.

use async_trait::async_trait;
use rustrade_engine::application::market_data::{HistoryQuery, MarketDataSource};
use rustrade_engine::domain::audit::AuditEntry;
use rustrade_engine::domain::broker::{BrokerAdapter, BrokerType, OrderResult, UnifiedOrder};
use rustrade_engine::domain::errors::{BrokerError, StorageError};
use rustrade_engine::domain::market::{PriceBar, Quote};
use rustrade_engine::domain::repositories::{
    AuditLogRepository, DailyMetrics, DailyMetricsRepository, EquityCurvePoint, EquityCurveRepository, PositionRepository,
    QueryPage, RiskStateRepository, SignalRepository, TradeHistoryRepository, TradeRepository,
};
use rustrade_engine::domain::risk::RiskState;
use rustrade_engine::domain::signal::{AssetClass, Signal, SignalStatus};
use rustrade_engine::domain::trading::{AggregatedAccount, Order, Position, Trade};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Serves a fixed, swappable bar series per symbol. No TTL logic of its
/// own -- `CachedMarketDataProvider` owns that; this is the raw vendor
/// stand-in underneath it.
pub struct FakeMarketDataSource {
    bars: Mutex<HashMap<String, Vec<PriceBar>>>,
}

impl FakeMarketDataSource {
    pub fn new() -> Self {
        Self { bars: Mutex::new(HashMap::new()) }
    }

    pub async fn set_bars(&self, symbol: &str, bars: Vec<PriceBar>) {
        self.bars.lock().await.insert(symbol.to_string(), bars);
    }
}

#[async_trait]
impl MarketDataSource for FakeMarketDataSource {
    async fn fetch_historical_data(&self, symbol: &str, _timeframe: &str, _query: HistoryQuery) -> anyhow::Result<Vec<PriceBar>> {
        Ok(self.bars.lock().await.get(symbol).cloned().unwrap_or_default())
    }

    async fn fetch_quote(&self, _symbol: &str) -> anyhow::Result<Option<Quote>> {
        Ok(None)
    }

    async fn fetch_quotes(&self, _symbols: &[String]) -> anyhow::Result<HashMap<String, Quote>> {
        Ok(HashMap::new())
    }
}

/// A broker double that always answers with a configured account/position
/// book and records every order it is asked to place.
pub struct FakeBroker {
    broker_type: BrokerType,
    asset_class: AssetClass,
    symbols: Vec<String>,
    account: StdMutex<AggregatedAccount>,
    positions: StdMutex<Vec<Position>>,
    pub placed_orders: Mutex<Vec<UnifiedOrder>>,
}

impl FakeBroker {
    pub fn new(broker_type: BrokerType, asset_class: AssetClass, equity: Decimal) -> Self {
        Self {
            broker_type,
            asset_class,
            symbols: Vec::new(),
            account: StdMutex::new(AggregatedAccount { equity, cash: equity, buying_power: equity, day_trades_remaining: Some(3), timestamp: 0 }),
            positions: StdMutex::new(Vec::new()),
            placed_orders: Mutex::new(Vec::new()),
        }
    }

    pub fn with_open_position_count(self, count: usize) -> Self {
        let mut positions = Vec::with_capacity(count);
        for i in 0..count {
            positions.push(Position { symbol: format!("SYM{i}"), quantity: Decimal::ONE, average_price: Decimal::ONE });
        }
        *self.positions.lock().unwrap() = positions;
        self
    }

    pub fn with_held_position(self, position: Position) -> Self {
        self.positions.lock().unwrap().push(position);
        self
    }

    pub async fn order_count(&self) -> usize {
        self.placed_orders.lock().await.len()
    }
}

#[async_trait]
impl BrokerAdapter for FakeBroker {
    fn broker_type(&self) -> BrokerType {
        self.broker_type
    }

    fn asset_class(&self) -> AssetClass {
        self.asset_class
    }

    fn supported_symbols(&self) -> &[String] {
        &self.symbols
    }

    async fn authenticate(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn get_account(&self) -> Result<AggregatedAccount, BrokerError> {
        Ok(self.account.lock().unwrap().clone())
    }

    async fn get_positions(&self) -> Result<Vec<Position>, BrokerError> {
        Ok(self.positions.lock().unwrap().clone())
    }

    async fn place_order(&self, order: UnifiedOrder) -> Result<OrderResult, BrokerError> {
        let result = OrderResult {
            broker_order_id: Uuid::new_v4().to_string(),
            client_order_id: order.client_order_id.clone(),
            status: rustrade_engine::domain::broker::NormalizedOrderStatus::Filled,
            filled_quantity: order.quantity,
            avg_fill_price: order.limit_price,
            submitted_at: 0,
        };
        self.placed_orders.lock().await.push(order);
        Ok(result)
    }

    async fn cancel_order(&self, _broker_order_id: &str) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn get_order_status(&self, _broker_order_id: &str) -> Result<OrderResult, BrokerError> {
        Err(BrokerError::InvalidResponse("not tracked by fake broker".into()))
    }
}

/// One in-memory stand-in for all six repository ports. A real deployment
/// hands the engine six separate `Arc<dyn ...>`s backed by sqlx; tests only
/// need the shape, not the separation, so one struct behind six trait impls
/// keeps the fixture small.
pub struct InMemoryRepos {
    pub orders: Mutex<Vec<Order>>,
    pub trade_history: Mutex<Vec<Trade>>,
    pub signals: Mutex<Vec<Signal>>,
    pub positions: Mutex<Vec<Position>>,
    pub risk_state: Mutex<Option<RiskState>>,
    pub audit_log: Mutex<Vec<AuditEntry>>,
    pub daily_metrics: Mutex<Vec<DailyMetrics>>,
    pub equity_curve: Mutex<Vec<EquityCurvePoint>>,
}

impl InMemoryRepos {
    pub fn new(initial_risk_state: RiskState) -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
            trade_history: Mutex::new(Vec::new()),
            signals: Mutex::new(Vec::new()),
            positions: Mutex::new(Vec::new()),
            risk_state: Mutex::new(Some(initial_risk_state)),
            audit_log: Mutex::new(Vec::new()),
            daily_metrics: Mutex::new(Vec::new()),
            equity_curve: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TradeRepository for InMemoryRepos {
    async fn create(&self, order: Order) -> Result<Order, StorageError> {
        let mut orders = self.orders.lock().await;
        if let Some(existing) = orders.iter().find(|o| o.client_order_id == order.client_order_id) {
            return Ok(existing.clone());
        }
        orders.push(order.clone());
        Ok(order)
    }

    async fn update_status(&self, id: &str, order: Order) -> Result<(), StorageError> {
        let mut orders = self.orders.lock().await;
        if let Some(existing) = orders.iter_mut().find(|o| o.id == id) {
            *existing = order;
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, StorageError> {
        Ok(self.orders.lock().await.iter().find(|o| o.id == id).cloned())
    }

    async fn find_by_client_order_id(&self, client_order_id: &str) -> Result<Option<Order>, StorageError> {
        Ok(self.orders.lock().await.iter().find(|o| o.client_order_id == client_order_id).cloned())
    }

    async fn list(&self, symbol: Option<&str>, _page: QueryPage) -> Result<Vec<Order>, StorageError> {
        let orders = self.orders.lock().await;
        Ok(match symbol {
            Some(s) => orders.iter().filter(|o| o.symbol == s).cloned().collect(),
            None => orders.clone(),
        })
    }
}

#[async_trait]
impl PositionRepository for InMemoryRepos {
    async fn upsert(&self, position: Position) -> Result<(), StorageError> {
        let mut positions = self.positions.lock().await;
        if let Some(existing) = positions.iter_mut().find(|p| p.symbol == position.symbol) {
            *existing = position;
        } else {
            positions.push(position);
        }
        Ok(())
    }

    async fn remove(&self, symbol: &str, _broker: &str) -> Result<(), StorageError> {
        self.positions.lock().await.retain(|p| p.symbol != symbol);
        Ok(())
    }

    async fn find(&self, symbol: &str, _broker: &str) -> Result<Option<Position>, StorageError> {
        Ok(self.positions.lock().await.iter().find(|p| p.symbol == symbol).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Position>, StorageError> {
        Ok(self.positions.lock().await.clone())
    }
}

#[async_trait]
impl TradeHistoryRepository for InMemoryRepos {
    async fn record(&self, trade: Trade) -> Result<(), StorageError> {
        self.trade_history.lock().await.push(trade);
        Ok(())
    }

    async fn list(&self, symbol: Option<&str>, _page: QueryPage) -> Result<Vec<Trade>, StorageError> {
        let trades = self.trade_history.lock().await;
        Ok(match symbol {
            Some(s) => trades.iter().filter(|t| t.symbol == s).cloned().collect(),
            None => trades.clone(),
        })
    }
}

#[async_trait]
impl SignalRepository for InMemoryRepos {
    async fn create(&self, signal: Signal) -> Result<Signal, StorageError> {
        self.signals.lock().await.push(signal.clone());
        Ok(signal)
    }

    async fn update_status(&self, id: &str, status: SignalStatus) -> Result<(), StorageError> {
        if let Some(existing) = self.signals.lock().await.iter_mut().find(|s| s.id == id) {
            existing.status = status;
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Signal>, StorageError> {
        Ok(self.signals.lock().await.iter().find(|s| s.id == id).cloned())
    }

    async fn find_active(&self, now_ms: i64) -> Result<Vec<Signal>, StorageError> {
        Ok(self
            .signals
            .lock()
            .await
            .iter()
            .filter(|s| s.status == SignalStatus::Active && s.expires_at > now_ms)
            .cloned()
            .collect())
    }

    async fn list(&self, symbol: Option<&str>, _page: QueryPage) -> Result<Vec<Signal>, StorageError> {
        let signals = self.signals.lock().await;
        Ok(match symbol {
            Some(s) => signals.iter().filter(|sig| sig.symbol == s).cloned().collect(),
            None => signals.clone(),
        })
    }
}

#[async_trait]
impl RiskStateRepository for InMemoryRepos {
    async fn load(&self) -> Result<RiskState, StorageError> {
        self.risk_state.lock().await.clone().ok_or_else(|| StorageError::Failed("risk state never seeded".into()))
    }

    async fn save(&self, state: &RiskState) -> Result<(), StorageError> {
        *self.risk_state.lock().await = Some(state.clone());
        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryRepos {
    async fn append(&self, entry: AuditEntry) -> Result<(), StorageError> {
        self.audit_log.lock().await.push(entry);
        Ok(())
    }

    async fn list(&self, category: Option<&str>, _page: QueryPage) -> Result<Vec<AuditEntry>, StorageError> {
        let _ = category;
        Ok(self.audit_log.lock().await.clone())
    }
}

#[async_trait]
impl DailyMetricsRepository for InMemoryRepos {
    async fn upsert(&self, metrics: DailyMetrics) -> Result<(), StorageError> {
        let mut rows = self.daily_metrics.lock().await;
        if let Some(existing) = rows.iter_mut().find(|m| m.trading_day == metrics.trading_day) {
            *existing = metrics;
        } else {
            rows.push(metrics);
        }
        Ok(())
    }

    async fn find(&self, day: chrono::NaiveDate) -> Result<Option<DailyMetrics>, StorageError> {
        Ok(self.daily_metrics.lock().await.iter().find(|m| m.trading_day == day).cloned())
    }
}

#[async_trait]
impl EquityCurveRepository for InMemoryRepos {
    async fn record(&self, point: EquityCurvePoint) -> Result<(), StorageError> {
        self.equity_curve.lock().await.push(point);
        Ok(())
    }

    async fn list_since(&self, since_ms: i64) -> Result<Vec<EquityCurvePoint>, StorageError> {
        Ok(self.equity_curve.lock().await.iter().filter(|p| p.timestamp >= since_ms).cloned().collect())
    }
}

/// Bars matching the strategy layer's own squeeze-then-breakout fixture:
/// a long flat base, a steepening run-up with rising volume, then a sharp
/// breakout bar. Reliable enough to drive an end-to-end test without
/// depending on exact indicator internals.
pub fn breakout_bar_series() -> Vec<PriceBar> {
    let mut bars: Vec<PriceBar> = (0..40).map(|i| bar(i, 100.0, 1000.0)).collect();
    for i in 0..25 {
        bars.push(bar(40 + i, 100.0 + i as f64 * 1.5, 1000.0));
    }
    bars.push(bar(65, 140.0, 5000.0));
    bars
}

fn bar(i: i64, close: f64, volume: f64) -> PriceBar {
    use rust_decimal::prelude::FromPrimitive;
    PriceBar::new(
        i * 300_000,
        Decimal::from_f64(close).unwrap(),
        Decimal::from_f64(close + 0.5).unwrap(),
        Decimal::from_f64(close - 0.5).unwrap(),
        Decimal::from_f64(close).unwrap(),
        Decimal::from_f64(volume).unwrap(),
    )
}
