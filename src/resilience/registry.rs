//! Keyed breaker registry.
//!
//! # Responsibilities
//! - Create one breaker per key on first use, from a shared template
//! - Route guarded calls to the breaker for their key
//! - Force every known breaker open or closed
//!
//! # Design Decisions
//! - Breakers are named after their key and grouped under the registry name
//! - Get-or-create goes through the DashMap entry API, so racing callers
//!   for a new key all receive the same breaker
//! - Entries are never evicted

use std::fmt::{self, Display};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::circuit_breaker::{Breaker, BreakerSnapshot};
use crate::resilience::classifier::{AlwaysTrip, ErrorClassifier};
use crate::resilience::clock::{Clock, SystemClock};
use crate::resilience::error::BreakerError;

/// One breaker per key, all sharing a base configuration.
pub struct BreakerRegistry<K, E> {
    name: String,
    base_config: BreakerConfig,
    breakers: DashMap<K, Arc<Breaker<E>>>,
    classifier: Arc<dyn ErrorClassifier<E>>,
    clock: Arc<dyn Clock>,
}

impl<K, E> fmt::Debug for BreakerRegistry<K, E>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakerRegistry")
            .field("name", &self.name)
            .field("breakers", &self.breakers.len())
            .finish()
    }
}

impl<K, E> BreakerRegistry<K, E>
where
    K: Eq + Hash + Display + Clone,
{
    pub fn new(name: impl Into<String>, base_config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            base_config,
            breakers: DashMap::new(),
            classifier: Arc::new(AlwaysTrip),
            clock: Arc::new(SystemClock),
        }
    }

    /// Classifier shared by every breaker this registry creates.
    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier<E>>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Clock shared by every breaker this registry creates.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_config(&self) -> &BreakerConfig {
        &self.base_config
    }

    /// Run `operation` under the breaker for `key`, creating it if needed.
    pub async fn run<T, F, Fut>(&self, key: K, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Clone,
    {
        let breaker = self.breaker(key);
        breaker.run(operation).await
    }

    /// The breaker for `key`, created on first use.
    pub fn breaker(&self, key: K) -> Arc<Breaker<E>> {
        if let Some(existing) = self.breakers.get(&key) {
            return Arc::clone(existing.value());
        }

        match self.breakers.entry(key) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let breaker = Arc::new(self.build(entry.key()));
                entry.insert(Arc::clone(&breaker));
                tracing::debug!(
                    registry = %self.name,
                    breaker = %breaker.name(),
                    "Circuit breaker created"
                );
                metrics::record_registry_size(&self.name, self.breakers.len());
                breaker
            }
        }
    }

    /// The breaker for `key`, if one has been created.
    pub fn get(&self, key: &K) -> Option<Arc<Breaker<E>>> {
        self.breakers.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Force every registered breaker open. Keys seen later start closed.
    pub fn open_all(&self) {
        let breakers = self.all();
        tracing::info!(registry = %self.name, count = breakers.len(), "Opening all circuit breakers");
        for breaker in breakers {
            breaker.open();
        }
    }

    /// Force every registered breaker closed.
    pub fn close_all(&self) {
        let breakers = self.all();
        tracing::info!(registry = %self.name, count = breakers.len(), "Closing all circuit breakers");
        for breaker in breakers {
            breaker.close();
        }
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Snapshots of every registered breaker, ordered by name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<_> = self.all().iter().map(|b| b.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    fn build(&self, key: &K) -> Breaker<E> {
        let mut config = self.base_config.clone();
        config.name = key.to_string();
        config.group = Some(self.name.clone());

        Breaker::new(config)
            .with_classifier(Arc::clone(&self.classifier))
            .with_clock(Arc::clone(&self.clock))
    }

    /// Collect first so no map shard is locked while breakers are.
    fn all(&self) -> Vec<Arc<Breaker<E>>> {
        self.breakers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}
