//! Persistence contracts. These traits are the only interface the domain
//! and application layers have onto storage; every implementation
//! (in-memory for tests, sqlx-backed for production) lives in
//! `infrastructure` and is swapped in behind them.

use crate::domain::audit::AuditEntry;
use crate::domain::errors::StorageError;
use crate::domain::risk::RiskState;
use crate::domain::signal::{Signal, SignalStatus};
use crate::domain::trading::{Order, Position, Trade};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of the hourly equity snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityCurvePoint {
    pub timestamp: i64,
    pub equity: Decimal,
    pub cash: Decimal,
}

/// One row of the daily rollup: realized P&L, trade count, win rate for a
/// single trading day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub trading_day: chrono::NaiveDate,
    pub realized_pnl: Decimal,
    pub trade_count: u32,
    pub win_count: u32,
    pub loss_count: u32,
    pub max_drawdown_pct: f64,
}

/// Optional filter + pagination for read-heavy control-plane queries.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Orders in flight or terminal. `create` is idempotent on
/// `client_order_id`: a duplicate insert returns the existing row rather
/// than erroring or inserting a second one.
#[async_trait]
pub trait TradeRepository: Send + Sync {
    async fn create(&self, order: Order) -> Result<Order, StorageError>;
    async fn update_status(&self, id: &str, order: Order) -> Result<(), StorageError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, StorageError>;
    async fn find_by_client_order_id(&self, client_order_id: &str) -> Result<Option<Order>, StorageError>;
    async fn list(&self, symbol: Option<&str>, page: QueryPage) -> Result<Vec<Order>, StorageError>;
}

#[async_trait]
pub trait PositionRepository: Send + Sync {
    async fn upsert(&self, position: Position) -> Result<(), StorageError>;
    async fn remove(&self, symbol: &str, broker: &str) -> Result<(), StorageError>;
    async fn find(&self, symbol: &str, broker: &str) -> Result<Option<Position>, StorageError>;
    async fn list_all(&self) -> Result<Vec<Position>, StorageError>;
}

/// Closed round-trips, append-mostly. Used for performance reporting, not
/// order lifecycle tracking (that's `TradeRepository`, confusingly named
/// after the wire entity rather than this one).
#[async_trait]
pub trait TradeHistoryRepository: Send + Sync {
    async fn record(&self, trade: Trade) -> Result<(), StorageError>;
    async fn list(&self, symbol: Option<&str>, page: QueryPage) -> Result<Vec<Trade>, StorageError>;
}

/// Signal inserts never mutate an existing row; status changes happen only
/// through `update_status`.
#[async_trait]
pub trait SignalRepository: Send + Sync {
    async fn create(&self, signal: Signal) -> Result<Signal, StorageError>;
    async fn update_status(&self, id: &str, status: SignalStatus) -> Result<(), StorageError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Signal>, StorageError>;
    async fn find_active(&self, now_ms: i64) -> Result<Vec<Signal>, StorageError>;
    async fn list(&self, symbol: Option<&str>, page: QueryPage) -> Result<Vec<Signal>, StorageError>;
}

/// RiskState is a singleton at `id = 1`; `load` must never return `None`
/// once the engine has booted once (first-boot bootstrap seeds it).
#[async_trait]
pub trait RiskStateRepository: Send + Sync {
    async fn load(&self) -> Result<RiskState, StorageError>;
    async fn save(&self, state: &RiskState) -> Result<(), StorageError>;
}

/// Lock-free append; must tolerate the highest write volume of any table.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<(), StorageError>;
    async fn list(&self, category: Option<&str>, page: QueryPage) -> Result<Vec<AuditEntry>, StorageError>;
}

#[async_trait]
pub trait DailyMetricsRepository: Send + Sync {
    async fn upsert(&self, metrics: DailyMetrics) -> Result<(), StorageError>;
    async fn find(&self, day: chrono::NaiveDate) -> Result<Option<DailyMetrics>, StorageError>;
}

#[async_trait]
pub trait EquityCurveRepository: Send + Sync {
    async fn record(&self, point: EquityCurvePoint) -> Result<(), StorageError>;
    async fn list_since(&self, since_ms: i64) -> Result<Vec<EquityCurvePoint>, StorageError>;
}
