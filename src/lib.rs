//! Circuit breakers for async Rust.
//!
//! # Architecture Overview
//!
//! ```text
//!     caller
//!       │  run(key, op)
//!       ▼
//!  ┌──────────────────┐   get-or-create    ┌────────────────┐
//!  │ BreakerRegistry  │──────────────────▶ │    Breaker     │
//!  │ (DashMap by key) │                    │ Closed / Open  │
//!  └──────────────────┘                    │  / Half-Open   │
//!                                          └───────┬────────┘
//!                        open: fail fast ◀─────────┤
//!                                                  │ closed / half-open
//!                                                  ▼
//!                                           wrapped operation
//!
//!  Cross-cutting: config (TOML + validation), observability (tracing, metrics)
//! ```
//!
//! ```no_run
//! use std::time::Duration;
//! use circuit_guard::{Breaker, BreakerConfig, BreakerError};
//!
//! # async fn fetch() -> Result<String, std::io::ErrorKind> { Ok(String::new()) }
//! # async fn example() {
//! let config = BreakerConfig::new("inventory", Duration::from_secs(30), 5, Duration::from_secs(15));
//! let breaker = Breaker::new(config);
//!
//! match breaker.run(|| fetch()).await {
//!     Ok(body) => println!("{body}"),
//!     Err(BreakerError::Open(e)) => eprintln!("skipping: {e}"),
//!     Err(BreakerError::Operation(e)) => eprintln!("dependency failed: {e:?}"),
//! }
//! # }
//! ```

pub mod config;
pub mod observability;
pub mod resilience;

pub use config::{BreakerConfig, GuardConfig};
pub use resilience::{
    Breaker, BreakerError, BreakerRegistry, BreakerSnapshot, CircuitOpenError, CircuitState,
};
