//! The cache registry.
//!
//! Maps element types to lazily materialized cache entries. Registration
//! stores a pending entry without running anything; the first `get` for a
//! type runs its producer, and every later `get` returns the same view or
//! the same captured failure.
//!
//! # Concurrency
//!
//! Entries live in a sharded concurrent map. Lookups clone the entry handle
//! out of the map before materializing, so no map lock is held while a
//! producer runs and a slow producer never stalls other types. Exclusion
//! during materialization is per entry.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lazycache_core::{
    Args, BoundProducer, CacheError, CacheResult, CacheView, CollectionKind, Producer,
    RegistryConfig, TypeKey,
};

use crate::entry::{CacheEntry, EntryState};
use crate::stats::{RegistryStats, StatsCounters};

struct RegistryInner {
    config: RegistryConfig,
    entries: DashMap<TypeKey, Arc<CacheEntry>>,
    stats: StatsCounters,
}

/// Type-keyed registry of lazily computed collections.
///
/// Cloning is cheap and every clone shares the same entries, so one
/// registry can be handed to any number of threads.
///
/// # Example
///
/// ```
/// use lazycache_core::{args, Args, CollectionKind, FnProducer, Param, ProducerError, Signature};
/// use lazycache_registry::CacheRegistry;
///
/// let registry = CacheRegistry::new();
/// let producer = FnProducer::new(
///     Signature::new("squares").param(Param::required("count")),
///     |args: &Args| -> Result<Vec<u64>, ProducerError> {
///         let count: u64 = args.get(0)?;
///         Ok((0..count).map(|n| n * n).collect())
///     },
/// );
/// registry.register(CollectionKind::Ordered, producer, args![4]).unwrap();
///
/// let squares = registry.get::<u64>().unwrap();
/// assert_eq!(squares.to_vec(), vec![0, 1, 4, 9]);
/// ```
#[derive(Clone)]
pub struct CacheRegistry {
    inner: Arc<RegistryInner>,
}

impl CacheRegistry {
    /// Create an empty registry with default configuration.
    pub fn new() -> Self {
        Self::from_valid_config(RegistryConfig::default())
    }

    /// Create an empty registry with the given configuration.
    pub fn with_config(config: RegistryConfig) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                entries: DashMap::new(),
                stats: StatsCounters::default(),
            }),
        }
    }

    /// Get the registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    // ========================================================================
    // REGISTRATION
    // ========================================================================

    /// Register `producer` with `args` as the source of `T`'s collection.
    ///
    /// Fails with `DuplicateRegistration` if `T` already has an entry and
    /// with `ArityMismatch` if `args` does not fit the producer's signature.
    /// The producer is not invoked.
    pub fn register<T, P>(&self, kind: CollectionKind, producer: P, args: Args) -> CacheResult<()>
    where
        T: Eq + Hash + Send + Sync + 'static,
        P: Producer<T>,
    {
        self.ensure_vacant(TypeKey::of::<T>())?;
        let bound = BoundProducer::bind(producer, args)?;
        self.insert(CacheEntry::new(kind, bound))
    }

    /// Register an ordered collection for element types that are not hashable.
    pub fn register_ordered<T, P>(&self, producer: P, args: Args) -> CacheResult<()>
    where
        T: Send + Sync + 'static,
        P: Producer<T>,
    {
        self.ensure_vacant(TypeKey::of::<T>())?;
        let bound = BoundProducer::bind(producer, args)?;
        self.insert(CacheEntry::ordered(bound))
    }

    /// Register a producer whose arguments are already bound.
    pub fn register_bound<T>(&self, kind: CollectionKind, bound: BoundProducer<T>) -> CacheResult<()>
    where
        T: Eq + Hash + Send + Sync + 'static,
    {
        self.insert(CacheEntry::new(kind, bound))
    }

    /// Ordered counterpart of [`register_bound`](Self::register_bound).
    pub fn register_ordered_bound<T>(&self, bound: BoundProducer<T>) -> CacheResult<()>
    where
        T: Send + Sync + 'static,
    {
        self.insert(CacheEntry::ordered(bound))
    }

    fn ensure_vacant(&self, key: TypeKey) -> CacheResult<()> {
        if self.inner.entries.contains_key(&key) {
            return Err(self.duplicate(key));
        }
        Ok(())
    }

    fn insert(&self, entry: CacheEntry) -> CacheResult<()> {
        let key = entry.key();
        match self.inner.entries.entry(key) {
            Entry::Occupied(_) => Err(self.duplicate(key)),
            Entry::Vacant(vacant) => {
                tracing::debug!(
                    registry = %self.inner.config.label,
                    type_name = key.name(),
                    kind = %entry.kind(),
                    producer = entry.producer(),
                    "Registered cache entry"
                );
                vacant.insert(Arc::new(entry));
                Ok(())
            }
        }
    }

    fn duplicate(&self, key: TypeKey) -> CacheError {
        tracing::warn!(
            registry = %self.inner.config.label,
            type_name = key.name(),
            "Rejected duplicate cache registration"
        );
        CacheError::DuplicateRegistration {
            type_name: key.name(),
        }
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Get the collection for `T`, materializing it on first access.
    ///
    /// Concurrent first accesses block until the single materialization
    /// finishes. A failed materialization is permanent: the same error is
    /// returned on every later call and the producer never runs again.
    pub fn get<T: Send + Sync + 'static>(&self) -> CacheResult<CacheView<T>> {
        let entry = self.entry(TypeKey::of::<T>())?;
        entry.resolve::<T>(&self.inner.config, &self.inner.stats)
    }

    /// Get the collection for `T` only if it is already materialized.
    pub fn try_get<T: Send + Sync + 'static>(&self) -> Option<CacheView<T>> {
        self.entry(TypeKey::of::<T>()).ok()?.peek::<T>()
    }

    fn entry(&self, key: TypeKey) -> CacheResult<Arc<CacheEntry>> {
        self.inner
            .entries
            .get(&key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(CacheError::NotRegistered {
                type_name: key.name(),
            })
    }

    // ========================================================================
    // INTROSPECTION
    // ========================================================================

    /// Check whether `T` has an entry.
    pub fn is_registered<T: 'static>(&self) -> bool {
        self.inner.entries.contains_key(&TypeKey::of::<T>())
    }

    /// Lifecycle state of `T`'s entry, if registered.
    pub fn state<T: 'static>(&self) -> Option<EntryState> {
        self.entry(TypeKey::of::<T>()).ok().map(|entry| entry.state())
    }

    /// Names of all registered element types, sorted.
    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .inner
            .entries
            .iter()
            .map(|entry| entry.key().name())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Get registry statistics.
    pub fn stats(&self) -> RegistryStats {
        self.inner.stats.snapshot(self.len())
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("label", &self.inner.config.label)
            .field("entries", &self.len())
            .finish()
    }
}
