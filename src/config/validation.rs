//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (recovery timeout > 0, known log levels)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{BreakerConfig, GuardConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("breaker name must not be empty")]
    EmptyName,

    #[error("breaker '{0}': recovery timeout must be positive")]
    ZeroRecoveryTimeout(String),

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),
}

/// Validate a full configuration.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_breaker(&config.breaker);

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate breaker settings on their own.
pub fn validate_breaker(config: &BreakerConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }
    if config.recovery_timeout.is_zero() {
        errors.push(ValidationError::ZeroRecoveryTimeout(config.name.clone()));
    }

    errors
}
