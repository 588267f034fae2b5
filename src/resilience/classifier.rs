//! Failure classification.
//!
//! A classifier decides, per error, whether it counts toward tripping a
//! breaker. Errors it rejects are still returned to the caller; they just
//! leave the breaker untouched.

/// Decides whether an error counts toward tripping.
pub trait ErrorClassifier<E>: Send + Sync {
    fn should_trip(&self, error: &E) -> bool;
}

/// Counts every error. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysTrip;

impl<E> ErrorClassifier<E> for AlwaysTrip {
    fn should_trip(&self, _error: &E) -> bool {
        true
    }
}

/// Classifier built from a predicate.
///
/// ```
/// use circuit_guard::resilience::{ErrorClassifier, FnClassifier};
///
/// let only_5xx = FnClassifier::new(|status: &u16| *status >= 500);
/// assert!(only_5xx.should_trip(&503u16));
/// assert!(!only_5xx.should_trip(&404u16));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnClassifier<F>(F);

impl<F> FnClassifier<F> {
    pub fn new(predicate: F) -> Self {
        Self(predicate)
    }
}

impl<E, F> ErrorClassifier<E> for FnClassifier<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn should_trip(&self, error: &E) -> bool {
        (self.0)(error)
    }
}

/// Errors that can report they stem from a cancelled operation.
pub trait Cancellation {
    fn is_cancelled(&self) -> bool;
}

/// Wraps a classifier so cancelled operations never trip.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreCancelled<C>(pub C);

impl<E, C> ErrorClassifier<E> for IgnoreCancelled<C>
where
    E: Cancellation,
    C: ErrorClassifier<E>,
{
    fn should_trip(&self, error: &E) -> bool {
        !error.is_cancelled() && self.0.should_trip(error)
    }
}
