//! Rail event ingestion worker
//!
//! Consumes train-activation and train-cancellation events from two
//! independent transports (a durable queue broker and a partitioned
//! topic log), decodes the JSON payloads and writes rows into MySQL.
//! The two transport paths are redundant; the store deduplicates on
//! (train_id, stanox, timestamp).

pub mod config;
pub mod consumers;
pub mod database;
pub mod error;
pub mod metrics;
pub mod models;

pub use config::Config;
pub use database::{EventSink, InsertOutcome, TrainStore};
pub use error::{IngestError, Result};
