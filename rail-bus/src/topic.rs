//! Topic Client Adapter over Kafka
//!
//! One `StreamConsumer` joins a fixed consumer group for the subscribed
//! topics; partition assignment stays with the client. Offsets are
//! committed per message after the handler reports its outcome, so a
//! record is only considered consumed once processing finished.
//! Per-partition delivery order is preserved; nothing is guaranteed
//! across partitions or topics.

use crate::{metrics::CONSUME_TOTAL, metrics::PUBLISH_TOTAL, Error, ProcessingResult, Result};
use async_trait::async_trait;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::{ClientConfig, Message};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Per-record callback for topic deliveries
#[async_trait]
pub trait TopicHandler: Send + Sync {
    /// Handle one delivered record
    async fn handle(&self, topic: &str, partition: i32, payload: &[u8]) -> ProcessingResult;
}

/// Topic adapter configuration
#[derive(Debug, Clone)]
pub struct TopicConfig {
    /// Comma-separated broker addresses
    pub brokers: String,

    /// Consumer group id (fixed per deployment)
    pub group_id: String,

    /// Client id reported to the brokers
    pub client_id: String,

    /// librdkafka log verbosity (`debug`, `info`, `warning`, `error`)
    pub log_level: String,
}

fn parse_log_level(level: &str) -> RDKafkaLogLevel {
    match level.to_ascii_lowercase().as_str() {
        "debug" => RDKafkaLogLevel::Debug,
        "notice" => RDKafkaLogLevel::Notice,
        "warning" | "warn" => RDKafkaLogLevel::Warning,
        "error" => RDKafkaLogLevel::Error,
        _ => RDKafkaLogLevel::Info,
    }
}

/// Consumer group member for the topic transport
pub struct TopicConsumer {
    consumer: StreamConsumer,
}

impl TopicConsumer {
    /// Build the consumer from configuration
    pub fn new(config: &TopicConfig) -> Result<Self> {
        info!(
            "Creating topic consumer (brokers: {}, group: {})",
            config.brokers, config.group_id
        );

        let mut cfg = ClientConfig::new();
        cfg.set("bootstrap.servers", &config.brokers);
        cfg.set("group.id", &config.group_id);
        cfg.set("client.id", &config.client_id);
        cfg.set("session.timeout.ms", "6000");
        // Offsets are committed manually, after the insert completed
        cfg.set("enable.auto.commit", "false");
        cfg.set("auto.offset.reset", "earliest");
        cfg.set_log_level(parse_log_level(&config.log_level));

        let consumer: StreamConsumer = cfg.create()?;

        Ok(Self { consumer })
    }

    /// Join the consumer group for the named topics
    pub fn subscribe(&self, topics: &[&str]) -> Result<()> {
        self.consumer.subscribe(topics)?;
        info!("Subscribed to topics: {:?}", topics);
        Ok(())
    }

    /// Consume records until shutdown is signalled
    ///
    /// Handler outcomes are never propagated as loop errors: one
    /// malformed record must never halt the stream. Success commits the
    /// record's offset; a permanent failure is logged and committed
    /// (dropped); a retryable failure is retried in place until it
    /// resolves, so the loop never fetches the next record while an
    /// earlier one is unprocessed and a later commit can never advance
    /// the partition past an unwritten event. Shutdown during a retry
    /// wait leaves the offset uncommitted for redelivery.
    pub async fn run<H>(&self, handler: Arc<H>, mut shutdown: watch::Receiver<bool>) -> Result<()>
    where
        H: TopicHandler + 'static,
    {
        loop {
            let msg = tokio::select! {
                _ = shutdown.changed() => {
                    info!("Shutdown signalled, stopping topic consumer");
                    break;
                }
                msg = self.consumer.recv() => match msg {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("Topic consumer error: {}", e);
                        continue;
                    }
                },
            };

            let topic = msg.topic().to_string();
            let partition = msg.partition();
            let payload = msg.payload().unwrap_or_default();

            let outcome = match resolve_record(
                handler.as_ref(),
                &topic,
                partition,
                payload,
                &mut shutdown,
                RETRY_PAUSE,
            )
            .await
            {
                Some(outcome) => outcome,
                None => {
                    info!("Shutdown signalled during retry; offset stays uncommitted");
                    break;
                }
            };

            CONSUME_TOTAL
                .with_label_values(&["topic", outcome.outcome_label()])
                .inc();

            if let ProcessingResult::PermanentError(reason) = &outcome {
                error!(
                    "Dropping record from {} partition {}: {}",
                    topic, partition, reason
                );
            }

            if let Err(e) = self.consumer.commit_message(&msg, CommitMode::Async) {
                error!("Failed to commit offset for {}: {}", topic, e);
            }
        }

        self.consumer.unsubscribe();
        info!("Topic consumer disconnected");
        Ok(())
    }
}

/// Pause between in-place retries of a failed record
const RETRY_PAUSE: Duration = Duration::from_secs(2);

/// Drive one record to a terminal outcome.
///
/// Retryable failures are retried in place with a pause between
/// attempts; only `Success` or `PermanentError` is returned, so the
/// caller commits exactly the records that finished processing.
/// Returns `None` when shutdown interrupts a retry wait.
async fn resolve_record<H>(
    handler: &H,
    topic: &str,
    partition: i32,
    payload: &[u8],
    shutdown: &mut watch::Receiver<bool>,
    pause: Duration,
) -> Option<ProcessingResult>
where
    H: TopicHandler + ?Sized,
{
    loop {
        match handler.handle(topic, partition, payload).await {
            ProcessingResult::RetryableError(reason) => {
                warn!(
                    "Handler failed for {} partition {} (retrying in {:?}): {}",
                    topic, partition, pause, reason
                );
                CONSUME_TOTAL
                    .with_label_values(&["topic", "retryable_error"])
                    .inc();

                tokio::select! {
                    _ = shutdown.changed() => return None,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
            outcome => return Some(outcome),
        }
    }
}

/// Thin producer wrapper for the topic transport
pub struct TopicProducer {
    producer: FutureProducer,
}

impl TopicProducer {
    /// Build the producer from broker addresses
    pub fn new(brokers: &str) -> Result<Self> {
        let mut cfg = ClientConfig::new();
        cfg.set("bootstrap.servers", brokers);
        cfg.set("message.timeout.ms", "5000");

        let producer: FutureProducer = cfg.create()?;

        Ok(Self { producer })
    }

    /// Publish a raw payload to a topic
    pub async fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<()> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        let result = self
            .producer
            .send(record, Timeout::Never)
            .await
            .map_err(|(e, _)| Error::Kafka(e));

        let status = if result.is_ok() { "success" } else { "error" };
        PUBLISH_TOTAL.with_label_values(&["topic", status]).inc();

        result?;
        info!("Published message to topic {}", topic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Handler failing with a retryable error for the first N attempts
    struct FlakyHandler {
        failures: u32,
        attempts: AtomicU32,
    }

    #[async_trait]
    impl TopicHandler for FlakyHandler {
        async fn handle(&self, _topic: &str, _partition: i32, _payload: &[u8]) -> ProcessingResult {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                ProcessingResult::RetryableError("store unavailable".to_string())
            } else {
                ProcessingResult::Success
            }
        }
    }

    #[tokio::test]
    async fn test_failed_record_retried_in_place_until_success() {
        let handler = FlakyHandler {
            failures: 2,
            attempts: AtomicU32::new(0),
        };
        let (_tx, mut shutdown) = watch::channel(false);

        // The record must resolve before the loop would fetch the next
        // one, so a later commit can never skip past a failed insert.
        let outcome = resolve_record(
            &handler,
            "train_activation",
            0,
            b"{}",
            &mut shutdown,
            Duration::from_millis(1),
        )
        .await;

        assert!(matches!(outcome, Some(ProcessingResult::Success)));
        assert_eq!(handler.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_shutdown_during_retry_leaves_record_unresolved() {
        let handler = FlakyHandler {
            failures: u32::MAX,
            attempts: AtomicU32::new(0),
        };
        let (tx, mut shutdown) = watch::channel(false);

        let resolve = resolve_record(
            &handler,
            "train_activation",
            0,
            b"{}",
            &mut shutdown,
            Duration::from_secs(60),
        );
        tokio::pin!(resolve);

        tokio::select! {
            _ = &mut resolve => panic!("record resolved without shutdown"),
            _ = tokio::time::sleep(Duration::from_millis(10)) => {}
        }
        tx.send(true).unwrap();

        // No terminal outcome: the caller must not commit the offset
        assert!(resolve.await.is_none());
    }

    #[tokio::test]
    async fn test_permanent_failure_resolves_immediately() {
        struct RejectingHandler;

        #[async_trait]
        impl TopicHandler for RejectingHandler {
            async fn handle(
                &self,
                _topic: &str,
                _partition: i32,
                _payload: &[u8],
            ) -> ProcessingResult {
                ProcessingResult::PermanentError("bad json".to_string())
            }
        }

        let (_tx, mut shutdown) = watch::channel(false);
        let outcome = resolve_record(
            &RejectingHandler,
            "train_activation",
            0,
            b"not json",
            &mut shutdown,
            Duration::from_secs(60),
        )
        .await;

        assert!(matches!(outcome, Some(ProcessingResult::PermanentError(_))));
    }

    #[test]
    fn test_log_level_parsing() {
        assert!(matches!(parse_log_level("debug"), RDKafkaLogLevel::Debug));
        assert!(matches!(parse_log_level("WARN"), RDKafkaLogLevel::Warning));
        assert!(matches!(parse_log_level("unknown"), RDKafkaLogLevel::Info));
    }

    #[tokio::test]
    #[ignore] // Requires Kafka broker
    async fn test_consumer_creation_and_subscribe() {
        let config = TopicConfig {
            brokers: "localhost:9092".to_string(),
            group_id: "rail_consumer_group".to_string(),
            client_id: "rail_app_consumer".to_string(),
            log_level: "info".to_string(),
        };

        let consumer = TopicConsumer::new(&config).expect("Failed to create consumer");
        consumer
            .subscribe(&["train_activation", "train_cancellation"])
            .expect("Failed to subscribe");
    }
}
