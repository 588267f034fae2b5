//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breakers and registries produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges via the metrics facade)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON in production)
//!     → Whatever metrics recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
