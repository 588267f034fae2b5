//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Guarded call:
//!     → registry.rs (resolve or create the breaker for a key)
//!     → circuit_breaker.rs (refuse if open, otherwise run the operation)
//!     → classifier.rs (decide whether a failure counts)
//!     → circuit_breaker.rs (record failure, trip or recover)
//! ```
//!
//! # Design Decisions
//! - Circuit breaker prevents cascading failures; it never retries
//! - Timeouts belong to the wrapped operation, not to the breaker
//! - Time is read through clock.rs so transitions are testable

pub mod circuit_breaker;
pub mod classifier;
pub mod clock;
pub mod error;
pub mod registry;

pub use circuit_breaker::{Breaker, BreakerSnapshot, CircuitState};
pub use classifier::{AlwaysTrip, Cancellation, ErrorClassifier, FnClassifier, IgnoreCancelled};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BreakerError, CircuitOpenError};
pub use registry::BreakerRegistry;
