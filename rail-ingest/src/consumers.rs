//! Transport handlers wiring decode → store
//!
//! Both transports funnel into the same two ingest paths. A decode
//! failure is a permanent drop (the message is never redelivered); an
//! insert failure is retryable, so the delivery is nak'd (queue) or its
//! offset withheld (topic) and the message comes back later. The insert
//! completes before any outcome is reported, so a message is only
//! acknowledged once its row landed (or was a known duplicate).

use crate::database::EventSink;
use crate::models::{
    ActivationEvent, CancellationEvent, ACTIVATION_TOPIC, CANCELLATION_TOPIC,
};
use async_trait::async_trait;
use rail_bus::{message, ProcessingResult, QueueHandler, TopicHandler};
use std::sync::Arc;
use tracing::info;

/// Which event shape a queue carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Activation,
    Cancellation,
}

async fn ingest_activation<S: EventSink + ?Sized>(sink: &S, payload: &[u8]) -> ProcessingResult {
    let event: ActivationEvent = match message::decode_json(payload) {
        Ok(event) => event,
        Err(e) => {
            return ProcessingResult::PermanentError(format!("malformed activation payload: {}", e))
        }
    };

    info!(
        "Received activation for train {} at stanox {}",
        event.train_id, event.stanox
    );

    match sink.insert_activation(&event).await {
        Ok(_) => ProcessingResult::Success,
        Err(e) => ProcessingResult::RetryableError(format!("activation insert failed: {}", e)),
    }
}

async fn ingest_cancellation<S: EventSink + ?Sized>(sink: &S, payload: &[u8]) -> ProcessingResult {
    let event: CancellationEvent = match message::decode_json(payload) {
        Ok(event) => event,
        Err(e) => {
            return ProcessingResult::PermanentError(format!(
                "malformed cancellation payload: {}",
                e
            ))
        }
    };

    info!(
        "Received cancellation for train {} (reason {})",
        event.train_id, event.reason_code
    );

    match sink.insert_cancellation(&event).await {
        Ok(_) => ProcessingResult::Success,
        Err(e) => ProcessingResult::RetryableError(format!("cancellation insert failed: {}", e)),
    }
}

/// Queue handler bound to one queue's event shape
pub struct QueueWorker<S> {
    sink: Arc<S>,
    kind: EventKind,
}

impl<S> QueueWorker<S> {
    pub fn new(sink: Arc<S>, kind: EventKind) -> Self {
        Self { sink, kind }
    }
}

#[async_trait]
impl<S: EventSink + 'static> QueueHandler for QueueWorker<S> {
    async fn handle(&self, payload: &str) -> ProcessingResult {
        match self.kind {
            EventKind::Activation => ingest_activation(self.sink.as_ref(), payload.as_bytes()).await,
            EventKind::Cancellation => {
                ingest_cancellation(self.sink.as_ref(), payload.as_bytes()).await
            }
        }
    }
}

/// Topic handler dispatching on the record's topic
pub struct TopicWorker<S> {
    sink: Arc<S>,
}

impl<S> TopicWorker<S> {
    pub fn new(sink: Arc<S>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl<S: EventSink + 'static> TopicHandler for TopicWorker<S> {
    async fn handle(&self, topic: &str, _partition: i32, payload: &[u8]) -> ProcessingResult {
        match topic {
            ACTIVATION_TOPIC => ingest_activation(self.sink.as_ref(), payload).await,
            CANCELLATION_TOPIC => ingest_cancellation(self.sink.as_ref(), payload).await,
            other => ProcessingResult::PermanentError(format!("unexpected topic: {}", other)),
        }
    }
}
