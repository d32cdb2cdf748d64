//! Dev publisher: pushes one sample activation and one sample
//! cancellation to both transports so a running worker has something to
//! ingest. Configuration comes from the same environment variables as
//! the worker.

use bytes::Bytes;
use rail_bus::{QueueClient, TopicProducer};
use rail_ingest::config::Config;
use rail_ingest::models::{
    ACTIVATION_QUEUE, ACTIVATION_TOPIC, CANCELLATION_QUEUE, CANCELLATION_TOPIC,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const ACTIVATION_PAYLOAD: &str =
    r#"{"trainId":"T123","stanox":"12345","timestamp":"2024-01-01T10:00:00Z"}"#;
const CANCELLATION_PAYLOAD: &str =
    r#"{"trainId":"T999","stanox":"99999","reasonCode":"AB","timestamp":"2024-06-01T08:30:00Z"}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let queue = QueueClient::connect(&config.queue.url).await?;
    queue
        .publish(ACTIVATION_QUEUE, Bytes::from_static(ACTIVATION_PAYLOAD.as_bytes()))
        .await?;
    queue
        .publish(
            CANCELLATION_QUEUE,
            Bytes::from_static(CANCELLATION_PAYLOAD.as_bytes()),
        )
        .await?;
    info!("Seeded queue transport");

    let producer = TopicProducer::new(&config.topic.brokers)?;
    producer
        .send(ACTIVATION_TOPIC, "T123", ACTIVATION_PAYLOAD.as_bytes())
        .await?;
    producer
        .send(CANCELLATION_TOPIC, "T999", CANCELLATION_PAYLOAD.as_bytes())
        .await?;
    info!("Seeded topic transport");

    Ok(())
}
