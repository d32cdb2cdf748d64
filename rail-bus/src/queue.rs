//! Queue Client Adapter over NATS JetStream
//!
//! Each logical queue is a durable work-queue stream consumed through an
//! explicit-ack pull consumer: FIFO per queue, at-least-once delivery,
//! ack only after the handler has finished. A handler outcome maps to
//! the broker disposition (ack / nak / term), so a malformed message is
//! dropped without redelivery while a transient failure is redelivered
//! after the configured nak delay.

use crate::{metrics::CONSUME_TOTAL, metrics::PUBLISH_TOTAL, Error, ProcessingResult, Result};
use async_nats::jetstream::{
    self,
    consumer::{pull, AckPolicy, DeliverPolicy},
    stream::{Config as StreamConfig, RetentionPolicy, StorageType},
    Context as JetStreamContext,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Per-message callback for queue deliveries
#[async_trait]
pub trait QueueHandler: Send + Sync {
    /// Handle one delivered payload (UTF-8 text)
    async fn handle(&self, payload: &str) -> ProcessingResult;
}

/// Queue adapter configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Acknowledgment wait before redelivery
    pub ack_wait: Duration,

    /// Max delivery attempts per message
    pub max_deliver: i64,

    /// Delay requested with a negative acknowledgment, so the delivery
    /// attempts span a realistic outage window instead of burning
    /// immediately
    pub nak_delay: Duration,

    /// Stream retention age
    pub max_age: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            ack_wait: Duration::from_secs(30),
            max_deliver: 5,
            nak_delay: Duration::from_secs(30),
            max_age: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

/// Map a handler outcome to the broker disposition for the delivery
fn ack_disposition(outcome: &ProcessingResult, nak_delay: Duration) -> jetstream::AckKind {
    match outcome {
        ProcessingResult::Success => jetstream::AckKind::Ack,
        ProcessingResult::RetryableError(_) => jetstream::AckKind::Nak(Some(nak_delay)),
        ProcessingResult::PermanentError(_) => jetstream::AckKind::Term,
    }
}

/// Queue client owning the broker connection and JetStream context
pub struct QueueClient {
    context: JetStreamContext,
    config: QueueConfig,
}

impl QueueClient {
    /// Connect to the queue broker and build the JetStream context
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to queue broker at {}", url);

        let client = async_nats::connect(url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let context = jetstream::new(client);

        info!("Queue broker connected");

        Ok(Self {
            context,
            config: QueueConfig::default(),
        })
    }

    /// Override the adapter configuration
    pub fn with_config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    /// Declare the durable stream backing a queue (idempotent)
    async fn ensure_queue(&self, queue: &str) -> Result<()> {
        let config = StreamConfig {
            name: queue.to_string(),
            description: Some(format!("Work queue: {}", queue)),
            subjects: vec![queue.to_string()],
            retention: RetentionPolicy::WorkQueue,
            max_age: self.config.max_age,
            storage: StorageType::File,
            ..Default::default()
        };

        self.context
            .get_or_create_stream(config)
            .await
            .map_err(|e| Error::Stream(e.to_string()))?;

        Ok(())
    }

    /// Publish a raw payload to a queue, waiting for the broker ack
    pub async fn publish(&self, queue: &str, payload: Bytes) -> Result<()> {
        self.ensure_queue(queue).await?;

        let result = self
            .context
            .publish(queue.to_string(), payload)
            .await
            .map_err(|e| Error::Publish(e.to_string()))?
            .await
            .map_err(|e| Error::Publish(e.to_string()));

        let status = if result.is_ok() { "success" } else { "error" };
        PUBLISH_TOTAL.with_label_values(&["queue", status]).inc();

        result?;
        info!("Published message to queue {}", queue);
        Ok(())
    }

    /// Consume a queue until shutdown is signalled
    ///
    /// Declares the queue durable, registers a durable pull consumer and
    /// invokes the handler for every delivery. Handler outcomes never
    /// terminate the loop; only shutdown or the stream ending does.
    pub async fn consume<H>(
        &self,
        queue: &str,
        handler: Arc<H>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()>
    where
        H: QueueHandler + 'static,
    {
        self.ensure_queue(queue).await?;

        let consumer_config = pull::Config {
            durable_name: Some(format!("{}_worker", queue)),
            ack_policy: AckPolicy::Explicit,
            ack_wait: self.config.ack_wait,
            max_deliver: self.config.max_deliver,
            deliver_policy: DeliverPolicy::All,
            ..Default::default()
        };

        let consumer = self
            .context
            .create_consumer_on_stream(consumer_config, queue)
            .await
            .map_err(|e| Error::Subscribe(e.to_string()))?;

        info!("Consuming queue {}", queue);

        let mut messages = consumer
            .messages()
            .await
            .map_err(|e| Error::Consume(e.to_string()))?;

        loop {
            let msg = tokio::select! {
                _ = shutdown.changed() => {
                    info!("Shutdown signalled, stopping queue consumer for {}", queue);
                    break;
                }
                msg = messages.next() => match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!("Queue delivery error on {}: {}", queue, e);
                        continue;
                    }
                    None => {
                        warn!("Queue message stream ended for {}", queue);
                        break;
                    }
                },
            };

            let outcome = match std::str::from_utf8(&msg.payload) {
                Ok(text) => handler.handle(text).await,
                Err(e) => ProcessingResult::PermanentError(format!("invalid UTF-8: {}", e)),
            };

            CONSUME_TOTAL
                .with_label_values(&["queue", outcome.outcome_label()])
                .inc();

            match &outcome {
                ProcessingResult::Success => {}
                ProcessingResult::RetryableError(reason) => {
                    warn!(
                        "Handler failed on {} (redelivery in {:?}): {}",
                        queue, self.config.nak_delay, reason
                    );
                }
                ProcessingResult::PermanentError(reason) => {
                    error!("Dropping message on {}: {}", queue, reason);
                }
            }

            let kind = ack_disposition(&outcome, self.config.nak_delay);
            if let Err(e) = msg.ack_with(kind).await {
                error!("Failed to acknowledge message on {}: {}", queue, e);
            }
        }

        Ok(())
    }
}
