//! Metrics collection.
//!
//! # Metrics
//! - `circuit_breaker_transitions_total` (counter): state changes by breaker, group, target state
//! - `circuit_breaker_rejections_total` (counter): calls refused while open
//! - `circuit_breaker_failures_total` (counter): classified failures recorded
//! - `circuit_breaker_registry_size` (gauge): breakers held per registry
//!
//! # Design Decisions
//! - Emitted through the `metrics` facade; exporter choice is left to the binary
//! - Labels for breaker name and group

use ::metrics::{counter, gauge};

use crate::resilience::CircuitState;

pub fn record_transition(breaker: &str, group: Option<&str>, to: CircuitState) {
    counter!(
        "circuit_breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "group" => group.unwrap_or_default().to_string(),
        "to" => to.as_str()
    )
    .increment(1);
}

pub fn record_rejection(breaker: &str, group: Option<&str>) {
    counter!(
        "circuit_breaker_rejections_total",
        "breaker" => breaker.to_string(),
        "group" => group.unwrap_or_default().to_string()
    )
    .increment(1);
}

pub fn record_failure(breaker: &str, group: Option<&str>) {
    counter!(
        "circuit_breaker_failures_total",
        "breaker" => breaker.to_string(),
        "group" => group.unwrap_or_default().to_string()
    )
    .increment(1);
}

pub fn record_registry_size(registry: &str, size: usize) {
    gauge!("circuit_breaker_registry_size", "registry" => registry.to_string()).set(size as f64);
}
