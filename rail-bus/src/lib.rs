//! Transport glue for the rail event ingestion worker
//!
//! Provides the two message transports and their shared plumbing:
//! - Durable work queues over NATS JetStream with explicit acknowledgment
//! - Partitioned topic consumption over Kafka with a fixed consumer group
//! - Topic-agnostic JSON decoding into caller-supplied shapes
//! - Bounded exponential backoff for broker connects
//! - Observability via Prometheus metrics

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod message;
pub mod metrics;
pub mod queue;
pub mod retry;
pub mod topic;
pub mod types;

pub use error::{Error, Result};
pub use queue::{QueueClient, QueueHandler};
pub use retry::{RetryConfig, RetryPolicy};
pub use topic::{TopicConsumer, TopicHandler, TopicProducer};
pub use types::ProcessingResult;
