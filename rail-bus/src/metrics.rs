//! Prometheus metrics for the transport layer

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

lazy_static! {
    /// Total deliveries handled, by transport and outcome
    pub static ref CONSUME_TOTAL: CounterVec = register_counter_vec!(
        "rail_bus_consume_total",
        "Total deliveries handled",
        &["transport", "outcome"]
    )
    .unwrap();

    /// Total publishes, by transport and status
    pub static ref PUBLISH_TOTAL: CounterVec = register_counter_vec!(
        "rail_bus_publish_total",
        "Total messages published",
        &["transport", "status"]
    )
    .unwrap();
}
