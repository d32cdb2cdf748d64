//! Persistence writer for train events
//!
//! Owns the MySQL pool and maps each event kind to a parameterized
//! insert. Duplicate deliveries (the two transports are redundant, and
//! both are at-least-once) are absorbed by the UNIQUE KEY on
//! (train_id, stanox, timestamp) together with INSERT IGNORE.

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::metrics::ROWS_TOTAL;
use crate::models::{ActivationEvent, CancellationEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;
use tracing::{debug, info};

/// Result of one insert attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written
    Inserted,
    /// The row already existed; delivery was a duplicate
    Duplicate,
}

/// Seam between the consumers and the store, for testing with fakes
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn insert_activation(&self, event: &ActivationEvent) -> Result<InsertOutcome>;

    async fn insert_cancellation(&self, event: &CancellationEvent) -> Result<InsertOutcome>;
}

/// Normalize an instant to the `YYYY-MM-DD HH:MM:SS` form the tables
/// store, rendered in UTC.
pub fn sql_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// MySQL-backed event store
pub struct TrainStore {
    pool: MySqlPool,
}

impl TrainStore {
    /// Connect the pool and verify the connection
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(
            "Connecting to database {} at {}:{}",
            config.database, config.host, config.port
        );

        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.connect_url())
            .await?;

        // Test the connection
        sqlx::query("SELECT 1").fetch_one(&pool).await?;

        info!("Database connection verified");

        Ok(Self { pool })
    }

    /// Build the pool without connecting; each query attempt connects
    /// on demand and fails individually if the database is unreachable.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(&config.connect_url())?;

        Ok(Self { pool })
    }

    /// Verify the store is reachable
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    /// Drain the pool on shutdown
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }

    fn record_outcome(table: &str, rows_affected: u64) -> InsertOutcome {
        if rows_affected == 0 {
            debug!("Duplicate event skipped for {}", table);
            ROWS_TOTAL.with_label_values(&[table, "duplicate"]).inc();
            InsertOutcome::Duplicate
        } else {
            ROWS_TOTAL.with_label_values(&[table, "inserted"]).inc();
            InsertOutcome::Inserted
        }
    }
}

#[async_trait]
impl EventSink for TrainStore {
    async fn insert_activation(&self, event: &ActivationEvent) -> Result<InsertOutcome> {
        let result = sqlx::query(
            "INSERT IGNORE INTO active_trains (train_id, stanox, timestamp) \
             VALUES (?, ?, STR_TO_DATE(?, '%Y-%m-%d %H:%i:%s'))",
        )
        .bind(&event.train_id)
        .bind(&event.stanox)
        .bind(sql_timestamp(event.timestamp))
        .execute(&self.pool)
        .await?;

        debug!(
            "Inserted active train {} at stanox {}",
            event.train_id, event.stanox
        );

        Ok(Self::record_outcome("active_trains", result.rows_affected()))
    }

    async fn insert_cancellation(&self, event: &CancellationEvent) -> Result<InsertOutcome> {
        let result = sqlx::query(
            "INSERT IGNORE INTO cancelled_trains (train_id, stanox, reason_code, timestamp) \
             VALUES (?, ?, ?, STR_TO_DATE(?, '%Y-%m-%d %H:%i:%s'))",
        )
        .bind(&event.train_id)
        .bind(&event.stanox)
        .bind(&event.reason_code)
        .bind(sql_timestamp(event.timestamp))
        .execute(&self.pool)
        .await?;

        debug!(
            "Inserted cancelled train {} (reason {})",
            event.train_id, event.reason_code
        );

        Ok(Self::record_outcome(
            "cancelled_trains",
            result.rows_affected(),
        ))
    }
}
