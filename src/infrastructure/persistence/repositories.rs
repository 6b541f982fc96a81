//! sqlx-backed implementations of every `domain::repositories` trait,
//! against the schema `Database::init` creates. Decimals and timestamps are
//! stored as text/integer respectively and round-tripped through
//! `to_string()`/`Decimal::from_str`, matching the teacher's
//! `persistence/repositories.rs` convention for numeric columns sqlite has
//! no native decimal type for.

use super::database::Database;
use crate::domain::audit::{AuditEntry, Category, Severity};
use crate::domain::errors::StorageError;
use crate::domain::repositories::{
    AuditLogRepository, DailyMetrics, DailyMetricsRepository, EquityCurvePoint, EquityCurveRepository, PositionRepository,
    QueryPage, RiskStateRepository, SignalRepository, TradeHistoryRepository, TradeRepository,
};
use crate::domain::risk::RiskState;
use crate::domain::signal::{AssetClass, Direction, Signal, SignalSource, SignalStatus};
use crate::domain::trading::{Order, OrderSide, OrderStatus, OrderType, Position, Trade};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::Row;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::info;

fn fail(context: &str, err: sqlx::Error) -> StorageError {
    StorageError::Failed(format!("{context}: {err}"))
}

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap_or_default()
}

fn order_side_str(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "BUY",
        OrderSide::Sell => "SELL",
    }
}

fn order_side_from_str(s: &str) -> OrderSide {
    match s {
        "SELL" => OrderSide::Sell,
        _ => OrderSide::Buy,
    }
}

fn order_type_str(t: OrderType) -> &'static str {
    match t {
        OrderType::Market => "MARKET",
        OrderType::Limit => "LIMIT",
        OrderType::Stop => "STOP",
        OrderType::StopLimit => "STOP_LIMIT",
    }
}

fn order_type_from_str(s: &str) -> OrderType {
    match s {
        "LIMIT" => OrderType::Limit,
        "STOP" => OrderType::Stop,
        "STOP_LIMIT" => OrderType::StopLimit,
        _ => OrderType::Market,
    }
}

fn order_status_str(s: OrderStatus) -> &'static str {
    match s {
        OrderStatus::Pending => "PENDING",
        OrderStatus::Submitted => "SUBMITTED",
        OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
        OrderStatus::Filled => "FILLED",
        OrderStatus::Cancelled => "CANCELLED",
        OrderStatus::Rejected => "REJECTED",
    }
}

fn order_status_from_str(s: &str) -> OrderStatus {
    match s {
        "SUBMITTED" => OrderStatus::Submitted,
        "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
        "FILLED" => OrderStatus::Filled,
        "CANCELLED" => OrderStatus::Cancelled,
        "REJECTED" => OrderStatus::Rejected,
        _ => OrderStatus::Pending,
    }
}

fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> Order {
    Order {
        id: row.get("id"),
        client_order_id: row.get("client_order_id"),
        broker_order_id: row.get("broker_order_id"),
        symbol: row.get("symbol"),
        side: order_side_from_str(row.get::<String, _>("side").as_str()),
        order_type: order_type_from_str(row.get::<String, _>("order_type").as_str()),
        quantity: dec(row.get::<String, _>("quantity").as_str()),
        filled_quantity: dec(row.get::<String, _>("filled_quantity").as_str()),
        limit_price: row.get::<Option<String>, _>("limit_price").as_deref().map(dec),
        stop_price: row.get::<Option<String>, _>("stop_price").as_deref().map(dec),
        status: order_status_from_str(row.get::<String, _>("status").as_str()),
        signal_id: row.get("signal_id"),
        submitted_at: row.get("submitted_at"),
        filled_at: row.get("filled_at"),
    }
}

pub struct SqliteTradeRepository {
    database: Database,
}

impl SqliteTradeRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl TradeRepository for SqliteTradeRepository {
    async fn create(&self, order: Order) -> Result<Order, StorageError> {
        if let Some(existing) = self.find_by_client_order_id(&order.client_order_id).await? {
            return Ok(existing);
        }
        sqlx::query(
            r#"
            INSERT INTO trades (
                id, client_order_id, broker_order_id, symbol, side, order_type, quantity,
                filled_quantity, limit_price, stop_price, status, signal_id, submitted_at, filled_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(client_order_id) DO NOTHING
            "#,
        )
        .bind(&order.id)
        .bind(&order.client_order_id)
        .bind(&order.broker_order_id)
        .bind(&order.symbol)
        .bind(order_side_str(order.side))
        .bind(order_type_str(order.order_type))
        .bind(order.quantity.to_string())
        .bind(order.filled_quantity.to_string())
        .bind(order.limit_price.map(|p| p.to_string()))
        .bind(order.stop_price.map(|p| p.to_string()))
        .bind(order_status_str(order.status))
        .bind(&order.signal_id)
        .bind(order.submitted_at)
        .bind(order.filled_at)
        .execute(&self.database.pool)
        .await
        .map_err(|e| fail("inserting trade", e))?;

        info!(client_order_id = %order.client_order_id, "persisted trade");
        Ok(order)
    }

    async fn update_status(&self, id: &str, order: Order) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            UPDATE trades SET broker_order_id = ?, filled_quantity = ?, status = ?, filled_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&order.broker_order_id)
        .bind(order.filled_quantity.to_string())
        .bind(order_status_str(order.status))
        .bind(order.filled_at)
        .bind(id)
        .execute(&self.database.pool)
        .await
        .map_err(|e| fail("updating trade status", e))?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, StorageError> {
        let row = sqlx::query("SELECT * FROM trades WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.database.pool)
            .await
            .map_err(|e| fail("finding trade by id", e))?;
        Ok(row.as_ref().map(row_to_order))
    }

    async fn find_by_client_order_id(&self, client_order_id: &str) -> Result<Option<Order>, StorageError> {
        let row = sqlx::query("SELECT * FROM trades WHERE client_order_id = ?")
            .bind(client_order_id)
            .fetch_optional(&self.database.pool)
            .await
            .map_err(|e| fail("finding trade by client order id", e))?;
        Ok(row.as_ref().map(row_to_order))
    }

    async fn list(&self, symbol: Option<&str>, page: QueryPage) -> Result<Vec<Order>, StorageError> {
        let limit = page.limit.unwrap_or(100) as i64;
        let offset = page.offset.unwrap_or(0) as i64;
        let rows = match symbol {
            Some(symbol) => sqlx::query("SELECT * FROM trades WHERE symbol = ? ORDER BY submitted_at DESC LIMIT ? OFFSET ?")
                .bind(symbol)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.database.pool)
                .await,
            None => sqlx::query("SELECT * FROM trades ORDER BY submitted_at DESC LIMIT ? OFFSET ?")
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.database.pool)
                .await,
        }
        .map_err(|e| fail("listing trades", e))?;
        Ok(rows.iter().map(row_to_order).collect())
    }
}

pub struct SqlitePositionRepository {
    database: Database,
    broker: String,
}

impl SqlitePositionRepository {
    pub fn new(database: Database, broker: impl Into<String>) -> Self {
        Self { database, broker: broker.into() }
    }
}

#[async_trait]
impl PositionRepository for SqlitePositionRepository {
    async fn upsert(&self, position: Position) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO positions (symbol, broker, quantity, average_price)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(symbol, broker) DO UPDATE SET
                quantity = excluded.quantity,
                average_price = excluded.average_price
            "#,
        )
        .bind(&position.symbol)
        .bind(&self.broker)
        .bind(position.quantity.to_string())
        .bind(position.average_price.to_string())
        .execute(&self.database.pool)
        .await
        .map_err(|e| fail("upserting position", e))?;
        Ok(())
    }

    async fn remove(&self, symbol: &str, broker: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM positions WHERE symbol = ? AND broker = ?")
            .bind(symbol)
            .bind(broker)
            .execute(&self.database.pool)
            .await
            .map_err(|e| fail("removing position", e))?;
        Ok(())
    }

    async fn find(&self, symbol: &str, broker: &str) -> Result<Option<Position>, StorageError> {
        let row = sqlx::query("SELECT symbol, quantity, average_price FROM positions WHERE symbol = ? AND broker = ?")
            .bind(symbol)
            .bind(broker)
            .fetch_optional(&self.database.pool)
            .await
            .map_err(|e| fail("finding position", e))?;
        Ok(row.map(|r| Position {
            symbol: r.get("symbol"),
            quantity: dec(r.get::<String, _>("quantity").as_str()),
            average_price: dec(r.get::<String, _>("average_price").as_str()),
        }))
    }

    async fn list_all(&self) -> Result<Vec<Position>, StorageError> {
        let rows = sqlx::query("SELECT symbol, quantity, average_price FROM positions")
            .fetch_all(&self.database.pool)
            .await
            .map_err(|e| fail("listing positions", e))?;
        Ok(rows
            .iter()
            .map(|r| Position {
                symbol: r.get("symbol"),
                quantity: dec(r.get::<String, _>("quantity").as_str()),
                average_price: dec(r.get::<String, _>("average_price").as_str()),
            })
            .collect())
    }
}

pub struct SqliteTradeHistoryRepository {
    database: Database,
}

impl SqliteTradeHistoryRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl TradeHistoryRepository for SqliteTradeHistoryRepository {
    async fn record(&self, trade: Trade) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO trade_history (
                id, symbol, side, entry_price, exit_price, quantity, pnl, entry_timestamp,
                exit_timestamp, strategy_used, regime_detected, entry_reason, exit_reason, fees
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&trade.id)
        .bind(&trade.symbol)
        .bind(order_side_str(trade.side))
        .bind(trade.entry_price.to_string())
        .bind(trade.exit_price.map(|p| p.to_string()))
        .bind(trade.quantity.to_string())
        .bind(trade.pnl.to_string())
        .bind(trade.entry_timestamp)
        .bind(trade.exit_timestamp)
        .bind(&trade.strategy_used)
        .bind(&trade.regime_detected)
        .bind(&trade.entry_reason)
        .bind(&trade.exit_reason)
        .bind(trade.fees.to_string())
        .execute(&self.database.pool)
        .await
        .map_err(|e| fail("recording trade history", e))?;
        info!(trade_id = %trade.id, "recorded closed trade");
        Ok(())
    }

    async fn list(&self, symbol: Option<&str>, page: QueryPage) -> Result<Vec<Trade>, StorageError> {
        let limit = page.limit.unwrap_or(100) as i64;
        let offset = page.offset.unwrap_or(0) as i64;
        let rows = match symbol {
            Some(symbol) => {
                sqlx::query("SELECT * FROM trade_history WHERE symbol = ? ORDER BY entry_timestamp DESC LIMIT ? OFFSET ?")
                    .bind(symbol)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.database.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM trade_history ORDER BY entry_timestamp DESC LIMIT ? OFFSET ?")
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.database.pool)
                    .await
            }
        }
        .map_err(|e| fail("listing trade history", e))?;

        Ok(rows
            .iter()
            .map(|r| Trade {
                id: r.get("id"),
                symbol: r.get("symbol"),
                side: order_side_from_str(r.get::<String, _>("side").as_str()),
                entry_price: dec(r.get::<String, _>("entry_price").as_str()),
                exit_price: r.get::<Option<String>, _>("exit_price").as_deref().map(dec),
                quantity: dec(r.get::<String, _>("quantity").as_str()),
                pnl: dec(r.get::<String, _>("pnl").as_str()),
                entry_timestamp: r.get("entry_timestamp"),
                exit_timestamp: r.get("exit_timestamp"),
                strategy_used: r.get("strategy_used"),
                regime_detected: r.get("regime_detected"),
                entry_reason: r.get("entry_reason"),
                exit_reason: r.get("exit_reason"),
                fees: dec(r.get::<String, _>("fees").as_str()),
            })
            .collect())
    }
}

fn asset_class_str(a: AssetClass) -> &'static str {
    match a {
        AssetClass::Futures => "FUTURES",
        AssetClass::Equity => "EQUITY",
    }
}

fn asset_class_from_str(s: &str) -> AssetClass {
    match s {
        "EQUITY" => AssetClass::Equity,
        _ => AssetClass::Futures,
    }
}

fn direction_str(d: Direction) -> &'static str {
    match d {
        Direction::Long => "LONG",
        Direction::Short => "SHORT",
        Direction::Neutral => "NEUTRAL",
    }
}

fn direction_from_str(s: &str) -> Direction {
    match s {
        "SHORT" => Direction::Short,
        "NEUTRAL" => Direction::Neutral,
        _ => Direction::Long,
    }
}

fn signal_source_str(s: SignalSource) -> &'static str {
    match s {
        SignalSource::Momentum => "MOMENTUM",
        SignalSource::MeanReversion => "MEAN_REVERSION",
        SignalSource::Breakout => "BREAKOUT",
        SignalSource::Manual => "MANUAL",
    }
}

fn signal_source_from_str(s: &str) -> SignalSource {
    match s {
        "MEAN_REVERSION" => SignalSource::MeanReversion,
        "BREAKOUT" => SignalSource::Breakout,
        "MANUAL" => SignalSource::Manual,
        _ => SignalSource::Momentum,
    }
}

fn signal_status_str(s: SignalStatus) -> &'static str {
    match s {
        SignalStatus::Active => "ACTIVE",
        SignalStatus::Executed => "EXECUTED",
        SignalStatus::Expired => "EXPIRED",
        SignalStatus::Cancelled => "CANCELLED",
    }
}

fn signal_status_from_str(s: &str) -> SignalStatus {
    match s {
        "EXECUTED" => SignalStatus::Executed,
        "EXPIRED" => SignalStatus::Expired,
        "CANCELLED" => SignalStatus::Cancelled,
        _ => SignalStatus::Active,
    }
}

fn regime_str(r: crate::domain::market::MarketRegime) -> &'static str {
    use crate::domain::market::MarketRegime;
    match r {
        MarketRegime::TrendUp => "TREND_UP",
        MarketRegime::TrendDown => "TREND_DOWN",
        MarketRegime::Ranging => "RANGING",
        MarketRegime::Volatile => "VOLATILE",
    }
}

fn regime_from_str(s: &str) -> crate::domain::market::MarketRegime {
    use crate::domain::market::MarketRegime;
    match s {
        "TREND_DOWN" => MarketRegime::TrendDown,
        "VOLATILE" => MarketRegime::Volatile,
        "RANGING" => MarketRegime::Ranging,
        _ => MarketRegime::TrendUp,
    }
}

fn row_to_signal(row: &sqlx::sqlite::SqliteRow) -> Signal {
    let reasons_json: String = row.get("reasons_json");
    let indicators_json: String = row.get("indicators_json");
    Signal {
        id: row.get("id"),
        symbol: row.get("symbol"),
        asset_class: asset_class_from_str(row.get::<String, _>("asset_class").as_str()),
        timeframe: row.get("timeframe"),
        direction: direction_from_str(row.get::<String, _>("direction").as_str()),
        strength: row.get("strength"),
        entry_price: dec(row.get::<String, _>("entry_price").as_str()),
        stop_loss: dec(row.get::<String, _>("stop_loss").as_str()),
        take_profit: row.get::<Option<String>, _>("take_profit").as_deref().map(dec),
        source: signal_source_from_str(row.get::<String, _>("source").as_str()),
        regime: regime_from_str(row.get::<String, _>("regime").as_str()),
        reasons: serde_json::from_str(&reasons_json).unwrap_or_default(),
        indicators: serde_json::from_str(&indicators_json).unwrap_or_default(),
        status: signal_status_from_str(row.get::<String, _>("status").as_str()),
        timestamp: row.get("timestamp"),
        expires_at: row.get("expires_at"),
    }
}

pub struct SqliteSignalRepository {
    database: Database,
}

impl SqliteSignalRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl SignalRepository for SqliteSignalRepository {
    async fn create(&self, signal: Signal) -> Result<Signal, StorageError> {
        let reasons_json = serde_json::to_string(&signal.reasons).unwrap_or_default();
        let indicators_json = serde_json::to_string(&signal.indicators).unwrap_or_default();
        sqlx::query(
            r#"
            INSERT INTO signals (
                id, symbol, asset_class, timeframe, direction, strength, entry_price, stop_loss,
                take_profit, source, regime, reasons_json, indicators_json, status, timestamp, expires_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&signal.id)
        .bind(&signal.symbol)
        .bind(asset_class_str(signal.asset_class))
        .bind(&signal.timeframe)
        .bind(direction_str(signal.direction))
        .bind(signal.strength)
        .bind(signal.entry_price.to_string())
        .bind(signal.stop_loss.to_string())
        .bind(signal.take_profit.map(|p| p.to_string()))
        .bind(signal_source_str(signal.source))
        .bind(regime_str(signal.regime))
        .bind(reasons_json)
        .bind(indicators_json)
        .bind(signal_status_str(signal.status))
        .bind(signal.timestamp)
        .bind(signal.expires_at)
        .execute(&self.database.pool)
        .await
        .map_err(|e| fail("inserting signal", e))?;
        Ok(signal)
    }

    async fn update_status(&self, id: &str, status: SignalStatus) -> Result<(), StorageError> {
        sqlx::query("UPDATE signals SET status = ? WHERE id = ?")
            .bind(signal_status_str(status))
            .bind(id)
            .execute(&self.database.pool)
            .await
            .map_err(|e| fail("updating signal status", e))?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Signal>, StorageError> {
        let row = sqlx::query("SELECT * FROM signals WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.database.pool)
            .await
            .map_err(|e| fail("finding signal by id", e))?;
        Ok(row.as_ref().map(row_to_signal))
    }

    async fn find_active(&self, now_ms: i64) -> Result<Vec<Signal>, StorageError> {
        let rows = sqlx::query("SELECT * FROM signals WHERE status = 'ACTIVE' AND expires_at > ? ORDER BY timestamp DESC")
            .bind(now_ms)
            .fetch_all(&self.database.pool)
            .await
            .map_err(|e| fail("finding active signals", e))?;
        Ok(rows.iter().map(row_to_signal).collect())
    }

    async fn list(&self, symbol: Option<&str>, page: QueryPage) -> Result<Vec<Signal>, StorageError> {
        let limit = page.limit.unwrap_or(100) as i64;
        let offset = page.offset.unwrap_or(0) as i64;
        let rows = match symbol {
            Some(symbol) => sqlx::query("SELECT * FROM signals WHERE symbol = ? ORDER BY timestamp DESC LIMIT ? OFFSET ?")
                .bind(symbol)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.database.pool)
                .await,
            None => sqlx::query("SELECT * FROM signals ORDER BY timestamp DESC LIMIT ? OFFSET ?")
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.database.pool)
                .await,
        }
        .map_err(|e| fail("listing signals", e))?;
        Ok(rows.iter().map(row_to_signal).collect())
    }
}

const RISK_STATE_ID: &str = "1";

pub struct SqliteRiskStateRepository {
    database: Database,
}

impl SqliteRiskStateRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl RiskStateRepository for SqliteRiskStateRepository {
    async fn load(&self) -> Result<RiskState, StorageError> {
        let row = sqlx::query("SELECT * FROM risk_state WHERE id = ?")
            .bind(RISK_STATE_ID)
            .fetch_optional(&self.database.pool)
            .await
            .map_err(|e| fail("loading risk state", e))?;

        match row {
            Some(row) => Ok(RiskState {
                id: row.get("id"),
                start_of_day_equity: dec(row.get::<String, _>("start_of_day_equity").as_str()),
                start_of_week_equity: dec(row.get::<String, _>("start_of_week_equity").as_str()),
                peak_equity: dec(row.get::<String, _>("peak_equity").as_str()),
                current_equity: dec(row.get::<String, _>("current_equity").as_str()),
                consecutive_losses: row.get::<i64, _>("consecutive_losses") as u32,
                consecutive_wins: row.get::<i64, _>("consecutive_wins") as u32,
                today_trade_count: row.get::<i64, _>("today_trade_count") as u32,
                day_trades_used: row.get::<i64, _>("day_trades_used") as u32,
                circuit_breaker_triggered: row.get("circuit_breaker_triggered"),
                circuit_breaker_until: row.get("circuit_breaker_until"),
                circuit_breaker_reason: row.get("circuit_breaker_reason"),
                trading_day: row.get("trading_day"),
                last_updated: row.get("last_updated"),
            }),
            None => {
                let bootstrap = RiskState::new(Decimal::ZERO, chrono::Utc::now().date_naive(), chrono::Utc::now().timestamp_millis());
                self.save(&bootstrap).await?;
                Ok(bootstrap)
            }
        }
    }

    async fn save(&self, state: &RiskState) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO risk_state (
                id, start_of_day_equity, start_of_week_equity, peak_equity, current_equity,
                consecutive_losses, consecutive_wins, today_trade_count, day_trades_used,
                circuit_breaker_triggered, circuit_breaker_until, circuit_breaker_reason,
                trading_day, last_updated
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                start_of_day_equity = excluded.start_of_day_equity,
                start_of_week_equity = excluded.start_of_week_equity,
                peak_equity = excluded.peak_equity,
                current_equity = excluded.current_equity,
                consecutive_losses = excluded.consecutive_losses,
                consecutive_wins = excluded.consecutive_wins,
                today_trade_count = excluded.today_trade_count,
                day_trades_used = excluded.day_trades_used,
                circuit_breaker_triggered = excluded.circuit_breaker_triggered,
                circuit_breaker_until = excluded.circuit_breaker_until,
                circuit_breaker_reason = excluded.circuit_breaker_reason,
                trading_day = excluded.trading_day,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(&state.id)
        .bind(state.start_of_day_equity.to_string())
        .bind(state.start_of_week_equity.to_string())
        .bind(state.peak_equity.to_string())
        .bind(state.current_equity.to_string())
        .bind(state.consecutive_losses as i64)
        .bind(state.consecutive_wins as i64)
        .bind(state.today_trade_count as i64)
        .bind(state.day_trades_used as i64)
        .bind(state.circuit_breaker_triggered)
        .bind(state.circuit_breaker_until)
        .bind(&state.circuit_breaker_reason)
        .bind(state.trading_day)
        .bind(state.last_updated)
        .execute(&self.database.pool)
        .await
        .map_err(|e| fail("saving risk state", e))?;
        Ok(())
    }
}

fn severity_str(s: Severity) -> &'static str {
    match s {
        Severity::Info => "INFO",
        Severity::Warn => "WARN",
        Severity::Error => "ERROR",
        Severity::Critical => "CRITICAL",
    }
}

fn severity_from_str(s: &str) -> Severity {
    match s {
        "WARN" => Severity::Warn,
        "ERROR" => Severity::Error,
        "CRITICAL" => Severity::Critical,
        _ => Severity::Info,
    }
}

fn category_str(c: Category) -> &'static str {
    match c {
        Category::Order => "ORDER",
        Category::Risk => "RISK",
        Category::Signal => "SIGNAL",
        Category::Broker => "BROKER",
        Category::System => "SYSTEM",
        Category::Auth => "AUTH",
        Category::Config => "CONFIG",
    }
}

fn category_from_str(s: &str) -> Category {
    match s {
        "RISK" => Category::Risk,
        "SIGNAL" => Category::Signal,
        "BROKER" => Category::Broker,
        "SYSTEM" => Category::System,
        "AUTH" => Category::Auth,
        "CONFIG" => Category::Config,
        _ => Category::Order,
    }
}

pub struct SqliteAuditLogRepository {
    database: Database,
}

impl SqliteAuditLogRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl AuditLogRepository for SqliteAuditLogRepository {
    async fn append(&self, entry: AuditEntry) -> Result<(), StorageError> {
        let context_json = serde_json::to_string(&entry.context).unwrap_or_default();
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, timestamp, severity, category, message, context_json, related_entity_id, related_entity_type)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(entry.timestamp)
        .bind(severity_str(entry.severity))
        .bind(category_str(entry.category))
        .bind(&entry.message)
        .bind(context_json)
        .bind(&entry.related_entity_id)
        .bind(&entry.related_entity_type)
        .execute(&self.database.pool)
        .await
        .map_err(|e| fail("appending audit entry", e))?;
        Ok(())
    }

    async fn list(&self, category: Option<&str>, page: QueryPage) -> Result<Vec<AuditEntry>, StorageError> {
        let limit = page.limit.unwrap_or(200) as i64;
        let offset = page.offset.unwrap_or(0) as i64;
        let rows = match category {
            Some(category) => sqlx::query("SELECT * FROM audit_log WHERE category = ? ORDER BY timestamp DESC LIMIT ? OFFSET ?")
                .bind(category)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.database.pool)
                .await,
            None => sqlx::query("SELECT * FROM audit_log ORDER BY timestamp DESC LIMIT ? OFFSET ?")
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.database.pool)
                .await,
        }
        .map_err(|e| fail("listing audit log", e))?;

        Ok(rows
            .iter()
            .map(|r| {
                let context_json: String = r.get("context_json");
                AuditEntry {
                    id: r.get("id"),
                    timestamp: r.get("timestamp"),
                    severity: severity_from_str(r.get::<String, _>("severity").as_str()),
                    category: category_from_str(r.get::<String, _>("category").as_str()),
                    message: r.get("message"),
                    context: serde_json::from_str::<HashMap<String, String>>(&context_json).unwrap_or_default(),
                    related_entity_id: r.get("related_entity_id"),
                    related_entity_type: r.get("related_entity_type"),
                }
            })
            .collect())
    }
}

pub struct SqliteDailyMetricsRepository {
    database: Database,
}

impl SqliteDailyMetricsRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl DailyMetricsRepository for SqliteDailyMetricsRepository {
    async fn upsert(&self, metrics: DailyMetrics) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO daily_metrics (trading_day, realized_pnl, trade_count, win_count, loss_count, max_drawdown_pct)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(trading_day) DO UPDATE SET
                realized_pnl = excluded.realized_pnl,
                trade_count = excluded.trade_count,
                win_count = excluded.win_count,
                loss_count = excluded.loss_count,
                max_drawdown_pct = excluded.max_drawdown_pct
            "#,
        )
        .bind(metrics.trading_day)
        .bind(metrics.realized_pnl.to_string())
        .bind(metrics.trade_count)
        .bind(metrics.win_count)
        .bind(metrics.loss_count)
        .bind(metrics.max_drawdown_pct)
        .execute(&self.database.pool)
        .await
        .map_err(|e| fail("upserting daily metrics", e))?;
        Ok(())
    }

    async fn find(&self, day: chrono::NaiveDate) -> Result<Option<DailyMetrics>, StorageError> {
        let row = sqlx::query("SELECT * FROM daily_metrics WHERE trading_day = ?")
            .bind(day)
            .fetch_optional(&self.database.pool)
            .await
            .map_err(|e| fail("finding daily metrics", e))?;
        Ok(row.map(|r| DailyMetrics {
            trading_day: r.get("trading_day"),
            realized_pnl: dec(r.get::<String, _>("realized_pnl").as_str()),
            trade_count: r.get("trade_count"),
            win_count: r.get("win_count"),
            loss_count: r.get("loss_count"),
            max_drawdown_pct: r.get("max_drawdown_pct"),
        }))
    }
}

pub struct SqliteEquityCurveRepository {
    database: Database,
}

impl SqliteEquityCurveRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl EquityCurveRepository for SqliteEquityCurveRepository {
    async fn record(&self, point: EquityCurvePoint) -> Result<(), StorageError> {
        sqlx::query("INSERT OR REPLACE INTO equity_curve (timestamp, equity, cash) VALUES (?, ?, ?)")
            .bind(point.timestamp)
            .bind(point.equity.to_string())
            .bind(point.cash.to_string())
            .execute(&self.database.pool)
            .await
            .map_err(|e| fail("recording equity curve point", e))?;
        Ok(())
    }

    async fn list_since(&self, since_ms: i64) -> Result<Vec<EquityCurvePoint>, StorageError> {
        let rows = sqlx::query("SELECT * FROM equity_curve WHERE timestamp >= ? ORDER BY timestamp ASC")
            .bind(since_ms)
            .fetch_all(&self.database.pool)
            .await
            .map_err(|e| fail("listing equity curve", e))?;
        Ok(rows
            .iter()
            .map(|r| EquityCurvePoint {
                timestamp: r.get("timestamp"),
                equity: dec(r.get::<String, _>("equity").as_str()),
                cash: dec(r.get::<String, _>("cash").as_str()),
            })
            .collect())
    }
}
