//! Shared helpers for integration tests.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use circuit_guard::resilience::ManualClock;
use circuit_guard::{Breaker, BreakerConfig};

/// Error produced by test operations.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestError {
    Unavailable,
    NotFound,
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestError::Unavailable => write!(f, "service unavailable"),
            TestError::NotFound => write!(f, "not found"),
        }
    }
}

impl std::error::Error for TestError {}

/// Breaker config with whole-second durations.
pub fn config(max_failures: i64, rolling_window_secs: f64, recovery_secs: f64) -> BreakerConfig {
    BreakerConfig::new(
        "test-upstream",
        Duration::from_secs_f64(recovery_secs),
        max_failures,
        Duration::from_secs_f64(rolling_window_secs),
    )
}

/// Breaker on a manual clock starting at zero.
#[allow(dead_code)]
pub fn manual_breaker(config: BreakerConfig) -> (Breaker<TestError>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0.0));
    let breaker = Breaker::new(config).with_clock(clock.clone());
    (breaker, clock)
}
