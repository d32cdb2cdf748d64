//! Error types for the transport layer

use thiserror::Error;

/// Transport error
#[derive(Debug, Error)]
pub enum Error {
    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Stream declaration error
    #[error("Stream error: {0}")]
    Stream(String),

    /// Publish error
    #[error("Publish error: {0}")]
    Publish(String),

    /// Subscribe error
    #[error("Subscribe error: {0}")]
    Subscribe(String),

    /// Consume loop error
    #[error("Consume error: {0}")]
    Consume(String),

    /// Kafka client error
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// Payload decode error
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
