//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → BreakerConfig handed to Breaker / BreakerRegistry
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a breaker keeps its own snapshot
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::BreakerConfig;
pub use schema::GuardConfig;
pub use schema::{LogFormat, ObservabilityConfig};
pub use validation::ValidationError;
