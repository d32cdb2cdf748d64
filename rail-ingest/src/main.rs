//! Rail ingestion worker binary
//!
//! Wires both transports to the persistence writer and owns the
//! process lifecycle: connect under bounded backoff, spawn the consume
//! loops, wait for a termination signal, then stop the topic consumer
//! first, drain the queue tasks and close the pool.

use rail_bus::{QueueClient, RetryPolicy, TopicConsumer};
use rail_ingest::config::Config;
use rail_ingest::consumers::{EventKind, QueueWorker, TopicWorker};
use rail_ingest::database::TrainStore;
use rail_ingest::models::{
    ACTIVATION_QUEUE, ACTIVATION_TOPIC, CANCELLATION_QUEUE, CANCELLATION_TOPIC,
};
use std::sync::Arc;
use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    info!("Starting rail ingestion worker");

    let config = Config::from_env()?;
    let retry = RetryPolicy::with_defaults();

    // Database: connect eagerly under retry; if the database stays
    // unreachable, fall back to a lazy pool so the worker keeps running
    // and each insert attempt fails individually.
    let store = match retry
        .execute(|| TrainStore::connect(&config.database), "database connect")
        .await
    {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(
                "Database unreachable after retries ({}); continuing with lazy pool",
                e
            );
            let store = Arc::new(TrainStore::connect_lazy(&config.database)?);
            if let Err(e) = store.health_check().await {
                warn!("Database still unreachable, inserts will fail until it recovers: {}", e);
            }
            store
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Queue transport: one consumer per queue, each bound to its event
    // shape. A connect failure disables the transport; the worker keeps
    // running on the topic path.
    let mut queue_tasks = Vec::new();
    match retry
        .execute(
            || QueueClient::connect(&config.queue.url),
            "queue broker connect",
        )
        .await
    {
        Ok(client) => {
            let client = Arc::new(client);
            let bindings = [
                (ACTIVATION_QUEUE, EventKind::Activation),
                (CANCELLATION_QUEUE, EventKind::Cancellation),
            ];

            for (queue, kind) in bindings {
                let client = client.clone();
                let handler = Arc::new(QueueWorker::new(store.clone(), kind));
                let rx = shutdown_rx.clone();

                queue_tasks.push(tokio::spawn(async move {
                    if let Err(e) = client.consume(queue, handler, rx).await {
                        error!("Queue consumer for {} stopped: {}", queue, e);
                    }
                }));
            }
        }
        Err(e) => {
            warn!(
                "Queue broker unreachable after retries; queue transport disabled: {}",
                e
            );
        }
    }

    // Topic transport: one consumer group member for both topics.
    let topic_task = match start_topic_consumer(&config, store.clone(), shutdown_rx.clone()) {
        Ok(task) => Some(task),
        Err(e) => {
            warn!("Topic transport disabled: {}", e);
            None
        }
    };

    // Wait for shutdown signal
    let mut sigterm = unix_signal(SignalKind::terminate())?;
    tokio::select! {
        _ = signal::ctrl_c() => info!("Received SIGINT"),
        _ = sigterm.recv() => info!("Received SIGTERM"),
    }

    info!("Shutting down ingestion worker...");
    let _ = shutdown_tx.send(true);

    // Topic consumer disconnects first, then the queue loops stop
    if let Some(task) = topic_task {
        let _ = task.await;
    }
    for task in queue_tasks {
        let _ = task.await;
    }

    store.close().await;

    info!("Ingestion worker stopped");
    Ok(())
}

fn start_topic_consumer(
    config: &Config,
    store: Arc<TrainStore>,
    shutdown: watch::Receiver<bool>,
) -> rail_bus::Result<tokio::task::JoinHandle<()>> {
    let consumer = TopicConsumer::new(&config.topic.to_bus_config())?;
    consumer.subscribe(&[ACTIVATION_TOPIC, CANCELLATION_TOPIC])?;

    let handler = Arc::new(TopicWorker::new(store));

    Ok(tokio::spawn(async move {
        if let Err(e) = consumer.run(handler, shutdown).await {
            error!("Topic consumer stopped: {}", e);
        }
    }))
}
