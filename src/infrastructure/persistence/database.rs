use anyhow::{Context, Result};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

/// Pooled SQLite handle, shared by every repository implementation.
#[allow(dead_code)]
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent()
                && !parent.exists()
            {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create database directory")?;
            }
        }

        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        info!("Connected to database: {}", db_url);

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    /// Idempotent schema init: the eight tables the engine persists to.
    /// Every timestamp column is milliseconds since epoch; enums are
    /// stored as their uppercase literal strings.
    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                client_order_id TEXT NOT NULL UNIQUE,
                broker_order_id TEXT,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                order_type TEXT NOT NULL,
                quantity TEXT NOT NULL,
                filled_quantity TEXT NOT NULL,
                limit_price TEXT,
                stop_price TEXT,
                status TEXT NOT NULL,
                signal_id TEXT,
                submitted_at INTEGER NOT NULL,
                filled_at INTEGER
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create trades table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trades_symbol ON trades (symbol, submitted_at);")
            .execute(&mut *conn)
            .await
            .context("failed to create trades index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS positions (
                symbol TEXT NOT NULL,
                broker TEXT NOT NULL,
                quantity TEXT NOT NULL,
                average_price TEXT NOT NULL,
                PRIMARY KEY (symbol, broker)
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create positions table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trade_history (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                entry_price TEXT NOT NULL,
                exit_price TEXT,
                quantity TEXT NOT NULL,
                pnl TEXT NOT NULL,
                entry_timestamp INTEGER NOT NULL,
                exit_timestamp INTEGER,
                strategy_used TEXT,
                regime_detected TEXT,
                entry_reason TEXT,
                exit_reason TEXT,
                fees TEXT NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create trade_history table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trade_history_symbol ON trade_history (symbol, entry_timestamp);")
            .execute(&mut *conn)
            .await
            .context("failed to create trade_history index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS signals (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                asset_class TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                direction TEXT NOT NULL,
                strength REAL NOT NULL,
                entry_price TEXT NOT NULL,
                stop_loss TEXT NOT NULL,
                take_profit TEXT,
                source TEXT NOT NULL,
                regime TEXT NOT NULL,
                reasons_json TEXT NOT NULL,
                indicators_json TEXT NOT NULL,
                status TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create signals table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_signals_status ON signals (status, expires_at);")
            .execute(&mut *conn)
            .await
            .context("failed to create signals index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS risk_state (
                id TEXT PRIMARY KEY,
                start_of_day_equity TEXT NOT NULL,
                start_of_week_equity TEXT NOT NULL,
                peak_equity TEXT NOT NULL,
                current_equity TEXT NOT NULL,
                consecutive_losses INTEGER NOT NULL,
                consecutive_wins INTEGER NOT NULL,
                today_trade_count INTEGER NOT NULL,
                day_trades_used INTEGER NOT NULL,
                circuit_breaker_triggered BOOLEAN NOT NULL,
                circuit_breaker_until INTEGER,
                circuit_breaker_reason TEXT,
                trading_day DATE NOT NULL,
                last_updated INTEGER NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create risk_state table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_metrics (
                trading_day DATE PRIMARY KEY,
                realized_pnl TEXT NOT NULL,
                trade_count INTEGER NOT NULL,
                win_count INTEGER NOT NULL,
                loss_count INTEGER NOT NULL,
                max_drawdown_pct REAL NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create daily_metrics table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS equity_curve (
                timestamp INTEGER PRIMARY KEY,
                equity TEXT NOT NULL,
                cash TEXT NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create equity_curve table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_log (
                id TEXT PRIMARY KEY,
                timestamp INTEGER NOT NULL,
                severity TEXT NOT NULL,
                category TEXT NOT NULL,
                message TEXT NOT NULL,
                context_json TEXT NOT NULL,
                related_entity_id TEXT,
                related_entity_type TEXT
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("failed to create audit_log table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_log_category ON audit_log (category, timestamp);")
            .execute(&mut *conn)
            .await
            .context("failed to create audit_log index")?;

        info!("Database schema initialized.");
        Ok(())
    }
}
