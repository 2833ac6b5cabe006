use crate::DbError;
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use core_types::{Action, SIGNAL_TIME_FORMAT, Signal};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

/// The durable, append-only log of generated signals.
///
/// Implementations must allow an append and a read to run at the same time.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Persists `signal` and returns its row id.
    async fn append(&self, signal: &Signal) -> Result<i64, DbError>;

    /// Returns at most `limit` signals, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<Signal>, DbError>;
}

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: SqlitePool,
    /// Offset the stored local times were written in.
    offset: FixedOffset,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: SqlitePool, offset: FixedOffset) -> Self {
        Self { pool, offset }
    }

    /// Total number of stored signals.
    pub async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM signals")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn decode_signal(&self, row: &SqliteRow) -> Result<Signal, DbError> {
        let time: String = row.try_get("time")?;
        let naive = NaiveDateTime::parse_from_str(&time, SIGNAL_TIME_FORMAT)
            .map_err(|e| DbError::CorruptRow(format!("time '{}': {}", time, e)))?;
        let time = self
            .offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| DbError::CorruptRow(format!("ambiguous local time '{}'", time)))?;

        let action: String = row.try_get("action")?;
        let action = action
            .parse::<Action>()
            .map_err(|e| DbError::CorruptRow(e.to_string()))?;

        Ok(Signal {
            time,
            action,
            symbol: row.try_get("symbol")?,
            price: row.try_get("price")?,
            message: row.try_get("message")?,
            timeframe: row.try_get("timeframe")?,
        })
    }
}

#[async_trait]
impl SignalStore for DbRepository {
    async fn append(&self, signal: &Signal) -> Result<i64, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO signals (time, action, symbol, price, message, timeframe)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(signal.local_time_string())
        .bind(signal.action.as_str())
        .bind(&signal.symbol)
        .bind(signal.price)
        .bind(&signal.message)
        .bind(&signal.timeframe)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::debug!(id, action = %signal.action, price = signal.price, "Stored signal");
        Ok(id)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Signal>, DbError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        // Row ids follow insertion order; the text time column only has second resolution.
        let rows = sqlx::query(
            r#"
            SELECT time, action, symbol, price, message, timeframe
            FROM signals
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| self.decode_signal(row)).collect()
    }
}
