//! Errors returned by breakers.
//!
//! Callers tell "the dependency failed" ([`BreakerError::Operation`]) apart
//! from "the breaker refused to try" ([`BreakerError::Open`]) by variant.

use std::error::Error;
use std::fmt;

/// Returned instead of running the operation while a breaker is Open.
#[derive(Debug, Clone)]
pub struct CircuitOpenError<E> {
    /// Name of the breaker that refused.
    pub name: String,
    /// Group of the breaker, if any.
    pub group: Option<String>,
    /// The failure that most recently counted against the breaker.
    pub last_error: Option<E>,
}

impl<E> fmt::Display for CircuitOpenError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "circuit breaker '{}'", self.name)?;
        if let Some(group) = &self.group {
            write!(f, " in group '{}'", group)?;
        }
        write!(f, " is open")
    }
}

impl<E> Error for CircuitOpenError<E>
where
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.last_error.as_ref().map(|e| e as &(dyn Error + 'static))
    }
}

/// Outcome of a guarded call that did not produce a value.
#[derive(Debug, Clone)]
pub enum BreakerError<E> {
    /// The breaker is open; the operation was not invoked.
    Open(CircuitOpenError<E>),
    /// The operation ran and failed; the error is passed through untouched.
    Operation(E),
}

impl<E> BreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open(_))
    }

    /// The operation's own error, if it ran.
    pub fn into_operation(self) -> Option<E> {
        match self {
            BreakerError::Operation(e) => Some(e),
            BreakerError::Open(_) => None,
        }
    }

    pub fn as_operation(&self) -> Option<&E> {
        match self {
            BreakerError::Operation(e) => Some(e),
            BreakerError::Open(_) => None,
        }
    }
}

impl<E> From<CircuitOpenError<E>> for BreakerError<E> {
    fn from(err: CircuitOpenError<E>) -> Self {
        BreakerError::Open(err)
    }
}

impl<E: fmt::Display> fmt::Display for BreakerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerError::Open(e) => write!(f, "{}", e),
            BreakerError::Operation(e) => write!(f, "{}", e),
        }
    }
}

impl<E> Error for BreakerError<E>
where
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BreakerError::Open(e) => Some(e),
            BreakerError::Operation(e) => e.source(),
        }
    }
}
