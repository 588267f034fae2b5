//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: the next call probes whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: max_failures classified failures within rolling_window
//! Open → Half-Open: on the first call/state query after recovery_timeout
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails
//! ```
//!
//! # Design Decisions
//! - One mutex per breaker; the wrapped operation runs outside it
//! - Recovery is checked lazily on entry, there is no background timer
//! - Operation errors are always returned as-is; only refusals are synthesized

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::classifier::{AlwaysTrip, ErrorClassifier};
use crate::resilience::clock::{Clock, SystemClock};
use crate::resilience::error::{BreakerError, CircuitOpenError};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a breaker, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub group: Option<String>,
    pub state: CircuitState,
    pub failure_count: usize,
    pub last_opened_at: Option<f64>,
}

struct BreakerState<E> {
    state: CircuitState,
    /// Failure timestamps, oldest first, at most `max_failures` long.
    failures: VecDeque<f64>,
    last_opened_at: Option<f64>,
    last_error: Option<E>,
}

/// Guards calls to a single dependency.
pub struct Breaker<E> {
    config: BreakerConfig,
    inner: Mutex<BreakerState<E>>,
    classifier: Arc<dyn ErrorClassifier<E>>,
    clock: Arc<dyn Clock>,
}

impl<E> fmt::Debug for Breaker<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Breaker")
            .field("name", &self.config.name)
            .field("group", &self.config.group)
            .field("state", &inner.state)
            .field("failures", &inner.failures.len())
            .finish()
    }
}

impl<E> Breaker<E> {
    /// Create a closed breaker that trips on every error and reads the wall clock.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failures: VecDeque::with_capacity(config.max_failures.min(64)),
                last_opened_at: None,
                last_error: None,
            }),
            config,
            classifier: Arc::new(AlwaysTrip),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier<E>>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<E> Breaker<E> {
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn group(&self) -> Option<&str> {
        self.config.group.as_deref()
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Current state. A due Open → Half-Open transition is applied first.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.open_if_reset_timeout_passed(&mut inner, self.clock.now());
        inner.state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut inner = self.lock();
        self.open_if_reset_timeout_passed(&mut inner, self.clock.now());
        BreakerSnapshot {
            name: self.config.name.clone(),
            group: self.config.group.clone(),
            state: inner.state,
            failure_count: inner.failures.len(),
            last_opened_at: inner.last_opened_at,
        }
    }

    /// Force the breaker open. The recovery timeout restarts from now, even
    /// if the breaker was already open.
    pub fn open(&self) {
        let mut inner = self.lock();
        let now = self.clock.now();
        self.transition_to_open(&mut inner, now);
    }

    /// Force the breaker closed, discarding recorded failures.
    pub fn close(&self) {
        let mut inner = self.lock();
        self.transition_to_closed(&mut inner);
    }

    /// Run `operation` under the breaker.
    ///
    /// Returns [`BreakerError::Open`] without invoking `operation` while the
    /// circuit is open. Otherwise the operation's own result is returned,
    /// with failures wrapped in [`BreakerError::Operation`].
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Clone,
    {
        self.acquire()?;

        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(error) => {
                if self.classifier.should_trip(&error) {
                    self.on_failure(error.clone());
                } else {
                    debug!(
                        breaker = %self.config.name,
                        "Error not classified as failure, breaker unchanged"
                    );
                }
                Err(BreakerError::Operation(error))
            }
        }
    }

    fn acquire(&self) -> Result<(), CircuitOpenError<E>>
    where
        E: Clone,
    {
        let mut inner = self.lock();
        self.open_if_reset_timeout_passed(&mut inner, self.clock.now());

        if inner.state == CircuitState::Open {
            debug!(breaker = %self.config.name, "Circuit breaker is open, rejecting call");
            metrics::record_rejection(&self.config.name, self.group());
            return Err(CircuitOpenError {
                name: self.config.name.clone(),
                group: self.config.group.clone(),
                last_error: inner.last_error.clone(),
            });
        }
        Ok(())
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            self.transition_to_closed(&mut inner);
        }
    }

    fn on_failure(&self, error: E) {
        let mut inner = self.lock();
        let now = self.clock.now();

        self.record_failure(&mut inner, now);
        inner.last_error = Some(error);
        metrics::record_failure(&self.config.name, self.group());

        let state = inner.state;
        match state {
            CircuitState::HalfOpen => {
                warn!(breaker = %self.config.name, "Probe failed, reopening circuit");
                self.transition_to_open(&mut inner, now);
            }
            CircuitState::Closed => {
                debug!(
                    breaker = %self.config.name,
                    failures = inner.failures.len(),
                    threshold = self.config.max_failures,
                    "Circuit breaker failure recorded"
                );
                if self.threshold_reached(&inner.failures) {
                    self.transition_to_open(&mut inner, now);
                }
            }
            // A call admitted before the trip finished late; keep the
            // original opening time.
            CircuitState::Open => {}
        }
    }

    fn record_failure(&self, inner: &mut BreakerState<E>, now: f64) {
        let max = self.config.max_failures;
        if max == 0 {
            return;
        }
        while inner.failures.len() >= max {
            inner.failures.pop_front();
        }
        inner.failures.push_back(now);
    }

    /// Inclusive: a span of exactly `rolling_window` trips.
    fn threshold_reached(&self, failures: &VecDeque<f64>) -> bool {
        if failures.len() < self.config.max_failures {
            return false;
        }
        let span = match (failures.front(), failures.back()) {
            (Some(oldest), Some(newest)) => newest - oldest,
            _ => 0.0,
        };
        span <= self.config.rolling_window.as_secs_f64()
    }

    fn open_if_reset_timeout_passed(&self, inner: &mut BreakerState<E>, now: f64) {
        if let Some(opened_at) = inner.last_opened_at {
            if now - opened_at >= self.config.recovery_timeout.as_secs_f64() {
                inner.last_opened_at = None;
                self.transition_to_half_open(inner);
            }
        }
    }

    fn transition_to_open(&self, inner: &mut BreakerState<E>, now: f64) {
        inner.last_opened_at = Some(now);
        if inner.state == CircuitState::Open {
            return;
        }
        inner.state = CircuitState::Open;
        warn!(
            breaker = %self.config.name,
            group = ?self.config.group,
            failures = inner.failures.len(),
            "Circuit breaker opened"
        );
        metrics::record_transition(&self.config.name, self.group(), CircuitState::Open);
    }

    fn transition_to_half_open(&self, inner: &mut BreakerState<E>) {
        inner.state = CircuitState::HalfOpen;
        info!(breaker = %self.config.name, "Circuit breaker half-open, allowing probe");
        metrics::record_transition(&self.config.name, self.group(), CircuitState::HalfOpen);
    }

    fn transition_to_closed(&self, inner: &mut BreakerState<E>) {
        inner.failures.clear();
        inner.last_opened_at = None;
        if inner.state == CircuitState::Closed {
            return;
        }
        inner.state = CircuitState::Closed;
        info!(breaker = %self.config.name, "Circuit breaker closed");
        metrics::record_transition(&self.config.name, self.group(), CircuitState::Closed);
    }

    /// Every critical section leaves the state consistent, so a poisoned
    /// lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, BreakerState<E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn failure_log(&self) -> Vec<f64> {
        self.lock().failures.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::classifier::FnClassifier;
    use crate::resilience::clock::ManualClock;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum TestError {
        Down,
        BadRequest,
    }

    fn breaker(max_failures: i64, clock: &Arc<ManualClock>) -> Breaker<TestError> {
        let config = BreakerConfig::new(
            "test",
            Duration::from_secs(30),
            max_failures,
            Duration::from_secs(15),
        );
        Breaker::new(config).with_clock(clock.clone())
    }

    async fn fail(b: &Breaker<TestError>) -> Result<(), BreakerError<TestError>> {
        b.run(|| async { Err::<(), _>(TestError::Down) }).await
    }

    async fn succeed(b: &Breaker<TestError>) -> Result<u32, BreakerError<TestError>> {
        b.run(|| async { Ok(7) }).await
    }

    #[tokio::test]
    async fn test_closed_passes_through() {
        let clock = Arc::new(ManualClock::new(0.0));
        let b = breaker(3, &clock);

        assert_eq!(succeed(&b).await.unwrap(), 7);
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_opens_at_threshold() {
        let clock = Arc::new(ManualClock::new(0.0));
        let b = breaker(3, &clock);

        for _ in 0..2 {
            assert!(matches!(fail(&b).await, Err(BreakerError::Operation(TestError::Down))));
            clock.advance(1.0);
        }
        assert_eq!(b.state(), CircuitState::Closed);

        // Third failure still returns the operation error, then trips.
        assert!(matches!(fail(&b).await, Err(BreakerError::Operation(_))));
        assert_eq!(b.state(), CircuitState::Open);

        let calls = &AtomicU32::new(0);
        let result = b
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TestError>(())
            })
            .await;
        match result {
            Err(BreakerError::Open(e)) => {
                assert_eq!(e.name, "test");
                assert_eq!(e.last_error, Some(TestError::Down));
            }
            other => panic!("expected open error, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_log_is_bounded() {
        let clock = Arc::new(ManualClock::new(0.0));
        let b = breaker(3, &clock);

        for _ in 0..5 {
            let _ = fail(&b).await;
            clock.advance(20.0);
        }
        assert_eq!(b.failure_log(), vec![40.0, 60.0, 80.0]);
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_success_while_closed_keeps_log() {
        let clock = Arc::new(ManualClock::new(0.0));
        let b = breaker(3, &clock);

        let _ = fail(&b).await;
        succeed(&b).await.unwrap();
        assert_eq!(b.failure_log().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_max_failures_trips_on_first_failure() {
        let clock = Arc::new(ManualClock::new(0.0));
        let b = breaker(-2, &clock);

        let _ = fail(&b).await;
        assert_eq!(b.state(), CircuitState::Open);
        assert!(b.failure_log().is_empty());
    }

    #[tokio::test]
    async fn test_unclassified_failures_ignored() {
        let clock = Arc::new(ManualClock::new(0.0));
        let b = breaker(2, &clock).with_classifier(Arc::new(FnClassifier::new(
            |e: &TestError| *e == TestError::Down,
        )));

        for _ in 0..5 {
            let result = b.run(|| async { Err::<(), _>(TestError::BadRequest) }).await;
            assert!(matches!(result, Err(BreakerError::Operation(TestError::BadRequest))));
        }
        assert_eq!(b.state(), CircuitState::Closed);
        assert!(b.failure_log().is_empty());
    }

    #[tokio::test]
    async fn test_recovery_to_half_open_then_closed() {
        let clock = Arc::new(ManualClock::new(0.0));
        let b = breaker(1, &clock);

        let _ = fail(&b).await;
        assert_eq!(b.state(), CircuitState::Open);

        clock.advance(29.5);
        assert!(succeed(&b).await.unwrap_err().is_open());

        clock.advance(0.5);
        assert_eq!(b.state(), CircuitState::HalfOpen);
        assert_eq!(succeed(&b).await.unwrap(), 7);
        assert_eq!(b.state(), CircuitState::Closed);
        assert!(b.failure_log().is_empty());
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let clock = Arc::new(ManualClock::new(0.0));
        let b = breaker(5, &clock);

        b.open();
        clock.advance(30.0);
        assert_eq!(b.state(), CircuitState::HalfOpen);

        let _ = fail(&b).await;
        let snapshot = b.snapshot();
        assert_eq!(snapshot.state, CircuitState::Open);
        assert_eq!(snapshot.last_opened_at, Some(30.0));
    }

    #[tokio::test]
    async fn test_half_open_unclassified_failure_stays_half_open() {
        let clock = Arc::new(ManualClock::new(0.0));
        let b = breaker(5, &clock).with_classifier(Arc::new(FnClassifier::new(
            |e: &TestError| *e == TestError::Down,
        )));

        b.open();
        clock.advance(30.0);
        let result = b.run(|| async { Err::<(), _>(TestError::BadRequest) }).await;
        assert!(matches!(result, Err(BreakerError::Operation(TestError::BadRequest))));
        assert_eq!(b.state(), CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn test_forced_open_after_recovery_timeout_fails_fast() {
        let clock = Arc::new(ManualClock::new(0.0));
        let b = breaker(1, &clock);
        let calls = &AtomicU32::new(0);

        let _ = fail(&b).await;
        clock.set(31.0);
        b.open();

        let snapshot = b.snapshot();
        assert_eq!(snapshot.state, CircuitState::Open);
        assert_eq!(snapshot.last_opened_at, Some(31.0));

        let result = b
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TestError>(())
            })
            .await;
        assert!(matches!(result, Err(BreakerError::Open(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        clock.set(61.0);
        assert!(succeed(&b).await.is_ok());
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_open_and_close_are_idempotent() {
        let clock = Arc::new(ManualClock::new(5.0));
        let b = breaker(5, &clock);

        b.open();
        clock.advance(10.0);
        b.open();
        let snapshot = b.snapshot();
        assert_eq!(snapshot.state, CircuitState::Open);
        assert_eq!(snapshot.last_opened_at, Some(15.0));

        let _ = fail(&b).await;
        b.close();
        b.close();
        let snapshot = b.snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failure_count, 0);
        assert_eq!(snapshot.last_opened_at, None);
    }

    #[tokio::test]
    async fn test_late_failure_while_open_keeps_open_time() {
        let clock = Arc::new(ManualClock::new(0.0));
        let b = breaker(5, &clock);

        b.open();
        clock.advance(10.0);
        b.on_failure(TestError::Down);
        assert_eq!(b.snapshot().last_opened_at, Some(0.0));
        assert_eq!(b.failure_log(), vec![10.0]);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CircuitState::HalfOpen.to_string(), "half_open");
        assert_eq!(
            serde_json::to_string(&CircuitState::HalfOpen).unwrap(),
            "\"half_open\""
        );
    }
}
