//! Cache entries and the one-time materialization protocol.
//!
//! # State Transition Diagram
//!
//! ```text
//!                 ┌─── producer ok ───→ Materialized
//! Pending ─ get ──┤
//!                 └─ error / panic ───→ Failed
//! ```
//!
//! Both terminal states are final. The terminal state lives in a
//! [`OnceCell`], so exactly one caller runs the producer while concurrent
//! callers for the same entry block until it finishes and then observe the
//! same outcome. A producer that asks for its own entry gets
//! `InvalidState` instead of waiting on itself.

use std::any::{type_name, Any};
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use lazycache_core::{
    BoundProducer, CacheCollection, CacheError, CacheResult, CacheView, CollectionKind,
    OrderedCollection, PopulateSummary, ProducerError, RegistryConfig, TypeKey,
};
use once_cell::sync::OnceCell;

use crate::stats::StatsCounters;

/// Observable lifecycle state of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    /// Registered, producer not yet invoked
    Pending,
    /// Producer succeeded; the collection is immutable from now on
    Materialized { items: usize, elapsed: Duration },
    /// Producer failed; every later access re-raises this error
    Failed { error: CacheError },
}

impl EntryState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EntryState::Pending)
    }
}

/// Type-erased, populated collection.
///
/// `view` always holds a `CacheView<T>` for the element type the entry was
/// registered with.
struct Materialized {
    view: Arc<dyn Any + Send + Sync>,
    element: &'static str,
    summary: PopulateSummary,
}

impl Materialized {
    fn new<T: Send + Sync + 'static>(view: CacheView<T>, summary: PopulateSummary) -> Self {
        Self {
            view: Arc::new(view),
            element: type_name::<T>(),
            summary,
        }
    }
}

type Materializer = Box<dyn FnOnce() -> CacheResult<Materialized> + Send>;

struct Outcome {
    result: CacheResult<Materialized>,
    elapsed: Duration,
}

/// One registered cache entry.
pub(crate) struct CacheEntry {
    key: TypeKey,
    kind: CollectionKind,
    producer: &'static str,
    materializer: Mutex<Option<Materializer>>,
    /// Thread currently running the producer, if any.
    materializing: Mutex<Option<ThreadId>>,
    outcome: OnceCell<Outcome>,
}

impl CacheEntry {
    /// Entry whose collection discipline is chosen by `kind`.
    pub(crate) fn new<T>(kind: CollectionKind, bound: BoundProducer<T>) -> Self
    where
        T: Eq + Hash + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        let producer = bound.name();
        let materializer: Materializer = Box::new(move || {
            let mut collection = CacheCollection::new(kind);
            let items = bound.produce().map_err(|source| failure(key, source))?;
            let summary = collection.populate(items)?;
            Ok(Materialized::new(collection.into_view(), summary))
        });
        Self::pending(key, kind, producer, materializer)
    }

    /// Ordered entry for element types without `Eq + Hash`.
    pub(crate) fn ordered<T>(bound: BoundProducer<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        let producer = bound.name();
        let materializer: Materializer = Box::new(move || {
            let mut collection = OrderedCollection::new();
            let items = bound.produce().map_err(|source| failure(key, source))?;
            let summary = collection.populate(items)?;
            Ok(Materialized::new(
                CacheCollection::from(collection).into_view(),
                summary,
            ))
        });
        Self::pending(key, CollectionKind::Ordered, producer, materializer)
    }

    fn pending(
        key: TypeKey,
        kind: CollectionKind,
        producer: &'static str,
        materializer: Materializer,
    ) -> Self {
        Self {
            key,
            kind,
            producer,
            materializer: Mutex::new(Some(materializer)),
            materializing: Mutex::new(None),
            outcome: OnceCell::new(),
        }
    }

    pub(crate) fn key(&self) -> TypeKey {
        self.key
    }

    pub(crate) fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub(crate) fn producer(&self) -> &'static str {
        self.producer
    }

    pub(crate) fn state(&self) -> EntryState {
        match self.outcome.get() {
            None => EntryState::Pending,
            Some(Outcome {
                result: Ok(materialized),
                elapsed,
            }) => EntryState::Materialized {
                items: materialized.summary.stored,
                elapsed: *elapsed,
            },
            Some(Outcome { result: Err(error), .. }) => EntryState::Failed {
                error: error.clone(),
            },
        }
    }

    /// Typed view if the entry is already materialized; never runs the producer.
    pub(crate) fn peek<T: Send + Sync + 'static>(&self) -> Option<CacheView<T>> {
        match self.outcome.get() {
            Some(Outcome {
                result: Ok(materialized),
                ..
            }) => downcast(self.key, materialized).ok(),
            _ => None,
        }
    }

    /// Typed view, materializing on first access.
    pub(crate) fn resolve<T: Send + Sync + 'static>(
        &self,
        config: &RegistryConfig,
        stats: &StatsCounters,
    ) -> CacheResult<CacheView<T>> {
        if self.outcome.get().is_none() && self.is_materializing_here() {
            tracing::warn!(
                registry = %config.label,
                type_name = self.key.name(),
                producer = self.producer,
                "Rejected recursive cache access"
            );
            return Err(CacheError::InvalidState {
                reason: format!("recursive materialization of {}", self.key),
            });
        }
        stats.record_lookup(self.outcome.get().is_some());

        let mut panic_payload = None;
        let outcome = self
            .outcome
            .get_or_init(|| self.materialize(config, stats, &mut panic_payload));
        if let Some(payload) = panic_payload {
            // Failure is recorded; hand the original panic back to this caller.
            panic::resume_unwind(payload);
        }

        match &outcome.result {
            Ok(materialized) => downcast(self.key, materialized),
            Err(error) => Err(error.clone()),
        }
    }

    fn materialize(
        &self,
        config: &RegistryConfig,
        stats: &StatsCounters,
        panic_payload: &mut Option<Box<dyn Any + Send>>,
    ) -> Outcome {
        let taken = self
            .materializer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(materializer) = taken else {
            return Outcome {
                result: Err(CacheError::InvalidState {
                    reason: format!("producer for {} was already consumed", self.key),
                }),
                elapsed: Duration::ZERO,
            };
        };

        stats.record_invocation();
        self.set_materializing(Some(thread::current().id()));
        let started = Instant::now();
        let caught = panic::catch_unwind(AssertUnwindSafe(materializer));
        self.set_materializing(None);
        let result = match caught {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                if !config.catch_panics {
                    *panic_payload = Some(payload);
                }
                Err(failure(self.key, ProducerError::Panicked { message }))
            }
        };
        let elapsed = started.elapsed();

        match &result {
            Ok(materialized) => {
                stats.record_materialized();
                tracing::info!(
                    registry = %config.label,
                    type_name = self.key.name(),
                    kind = %self.kind,
                    producer = self.producer,
                    items = materialized.summary.stored,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Cache materialized"
                );
                if materialized.summary.dropped > 0 {
                    tracing::debug!(
                        registry = %config.label,
                        type_name = self.key.name(),
                        dropped = materialized.summary.dropped,
                        "Dropped duplicate items"
                    );
                }
                if elapsed > config.slow_producer_threshold {
                    tracing::warn!(
                        registry = %config.label,
                        type_name = self.key.name(),
                        producer = self.producer,
                        elapsed_ms = elapsed.as_millis() as u64,
                        threshold_ms = config.slow_producer_threshold.as_millis() as u64,
                        "Slow cache materialization"
                    );
                }
            }
            Err(error) => {
                stats.record_failed();
                tracing::error!(
                    registry = %config.label,
                    type_name = self.key.name(),
                    producer = self.producer,
                    error = %error,
                    "Cache materialization failed"
                );
            }
        }

        Outcome { result, elapsed }
    }

    fn is_materializing_here(&self) -> bool {
        let current = thread::current().id();
        *self
            .materializing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            == Some(current)
    }

    fn set_materializing(&self, owner: Option<ThreadId>) {
        *self
            .materializing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = owner;
    }
}

fn failure(key: TypeKey, source: ProducerError) -> CacheError {
    CacheError::MaterializationFailure {
        type_name: key.name(),
        source,
    }
}

fn downcast<T: Send + Sync + 'static>(
    key: TypeKey,
    materialized: &Materialized,
) -> CacheResult<CacheView<T>> {
    materialized
        .view
        .downcast_ref::<CacheView<T>>()
        .cloned()
        .ok_or(CacheError::TypeMismatch {
            expected: key.name(),
            found: materialized.element,
        })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazycache_core::{args, Args, FnProducer, Param, Signature};

    fn entry_of(items: Vec<u32>, kind: CollectionKind) -> CacheEntry {
        CacheEntry::new(kind, BoundProducer::from_fn("fixed", move || Ok(items)))
    }

    #[test]
    fn test_new_entry_is_pending() {
        let entry = entry_of(vec![1, 2], CollectionKind::Ordered);
        assert_eq!(entry.state(), EntryState::Pending);
        assert!(entry.peek::<u32>().is_none());
        assert_eq!(entry.producer(), "fixed");
        assert_eq!(entry.key(), TypeKey::of::<u32>());
    }

    #[test]
    fn test_resolve_materializes_once() {
        let entry = entry_of(vec![3, 1, 3], CollectionKind::Unique);
        let stats = StatsCounters::default();
        let config = RegistryConfig::default();

        let first = entry.resolve::<u32>(&config, &stats).unwrap();
        let second = entry.resolve::<u32>(&config, &stats).unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(first.len(), 2);
        assert!(matches!(entry.state(), EntryState::Materialized { items: 2, .. }));

        let snapshot = stats.snapshot(1);
        assert_eq!(snapshot.producer_invocations, 1);
        assert_eq!(snapshot.lookups, 2);
        assert_eq!(snapshot.hits, 1);
    }

    #[test]
    fn test_wrong_element_type_is_type_mismatch() {
        let entry = entry_of(vec![1], CollectionKind::Ordered);
        let err = entry
            .resolve::<String>(&RegistryConfig::default(), &StatsCounters::default())
            .unwrap_err();
        assert!(matches!(err, CacheError::TypeMismatch { found, .. } if found == "u32"));
    }

    #[test]
    fn test_producer_error_becomes_failed_state() {
        let producer = FnProducer::new(
            Signature::new("parse").param(Param::required("input")),
            |args: &Args| args.get::<Vec<u32>>(0),
        );
        let bound = BoundProducer::bind(producer, args!["not a list"]).unwrap();
        let entry = CacheEntry::ordered(bound);

        let err = entry
            .resolve::<u32>(&RegistryConfig::default(), &StatsCounters::default())
            .unwrap_err();
        assert!(matches!(
            err,
            CacheError::MaterializationFailure {
                source: ProducerError::InvalidArgument { index: 0, .. },
                ..
            }
        ));
        assert_eq!(entry.state(), EntryState::Failed { error: err });
    }

    #[test]
    fn test_caught_panic_is_recorded_as_failure() {
        let entry: CacheEntry =
            CacheEntry::ordered(BoundProducer::<u8>::from_fn("explode", || panic!("kaboom")));
        let err = entry
            .resolve::<u8>(&RegistryConfig::default(), &StatsCounters::default())
            .unwrap_err();
        match err {
            CacheError::MaterializationFailure {
                source: ProducerError::Panicked { message },
                ..
            } => assert_eq!(message, "kaboom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_uncaught_panic_propagates_but_entry_fails() {
        let entry: CacheEntry =
            CacheEntry::ordered(BoundProducer::<u8>::from_fn("explode", || panic!("kaboom")));
        let config = RegistryConfig::default().with_catch_panics(false);
        let stats = StatsCounters::default();

        let unwound = panic::catch_unwind(AssertUnwindSafe(|| entry.resolve::<u8>(&config, &stats)));
        assert!(unwound.is_err());
        assert!(matches!(entry.state(), EntryState::Failed { .. }));

        // Later callers see the recorded failure instead of a panic.
        assert!(entry.resolve::<u8>(&config, &stats).is_err());
        assert_eq!(stats.snapshot(1).producer_invocations, 1);
    }
}
