//! Prometheus metrics for the ingestion worker

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

lazy_static! {
    /// Rows written (or skipped as duplicates), by table and outcome
    pub static ref ROWS_TOTAL: CounterVec = register_counter_vec!(
        "rail_ingest_rows_total",
        "Rows written per table",
        &["table", "outcome"]
    )
    .unwrap();
}
