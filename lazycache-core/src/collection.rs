//! Cache collections and their read-only views.
//!
//! A collection is populated exactly once from a producer's output and is
//! immutable afterwards. Two disciplines exist:
//!
//! - [`OrderedCollection`] appends every item in input order, duplicates kept.
//! - [`UniqueCollection`] inserts items one at a time and silently drops
//!   duplicates by value equality. Iteration order is unspecified.
//!
//! Consumers never see a collection directly; they receive a [`CacheView`],
//! a cheap shared handle that only allows reading.

use std::collections::{hash_set, HashSet};
use std::hash::Hash;
use std::iter::FusedIterator;
use std::slice;
use std::sync::Arc;

use crate::error::{CacheError, CacheResult};
use crate::kind::CollectionKind;

/// Outcome of populating a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateSummary {
    /// Items now held by the collection.
    pub stored: usize,
    /// Items discarded as duplicates (always 0 for ordered collections).
    pub dropped: usize,
}

fn already_populated(kind: CollectionKind) -> CacheError {
    CacheError::InvalidState {
        reason: format!("{} collection is already populated", kind),
    }
}

// ============================================================================
// ORDERED
// ============================================================================

/// Insertion-ordered collection that keeps duplicates.
#[derive(Debug)]
pub struct OrderedCollection<T> {
    items: Vec<T>,
    populated: bool,
}

impl<T> OrderedCollection<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            populated: false,
        }
    }

    /// Append every item in iteration order.
    pub fn populate<I>(&mut self, items: I) -> CacheResult<PopulateSummary>
    where
        I: IntoIterator<Item = T>,
    {
        if self.populated {
            return Err(already_populated(CollectionKind::Ordered));
        }
        self.items.extend(items);
        self.populated = true;
        Ok(PopulateSummary {
            stored: self.items.len(),
            dropped: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> Default for OrderedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// UNIQUE
// ============================================================================

/// Set-semantics collection; duplicates are dropped silently.
#[derive(Debug)]
pub struct UniqueCollection<T> {
    items: HashSet<T>,
    populated: bool,
}

impl<T> UniqueCollection<T> {
    pub fn new() -> Self {
        Self {
            items: HashSet::new(),
            populated: false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn iter(&self) -> hash_set::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: Eq + Hash> UniqueCollection<T> {
    /// Insert items one at a time, counting the ones rejected as duplicates.
    pub fn populate<I>(&mut self, items: I) -> CacheResult<PopulateSummary>
    where
        I: IntoIterator<Item = T>,
    {
        if self.populated {
            return Err(already_populated(CollectionKind::Unique));
        }
        let mut dropped = 0;
        for item in items {
            if !self.items.insert(item) {
                dropped += 1;
            }
        }
        self.populated = true;
        Ok(PopulateSummary {
            stored: self.items.len(),
            dropped,
        })
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }
}

impl<T> Default for UniqueCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// CACHE COLLECTION
// ============================================================================

/// A cache collection of either discipline.
#[derive(Debug)]
pub enum CacheCollection<T> {
    Ordered(OrderedCollection<T>),
    Unique(UniqueCollection<T>),
}

impl<T> CacheCollection<T> {
    /// Empty collection of the given kind.
    pub fn new(kind: CollectionKind) -> Self {
        match kind {
            CollectionKind::Ordered => CacheCollection::Ordered(OrderedCollection::new()),
            CollectionKind::Unique => CacheCollection::Unique(UniqueCollection::new()),
        }
    }

    pub fn kind(&self) -> CollectionKind {
        match self {
            CacheCollection::Ordered(_) => CollectionKind::Ordered,
            CacheCollection::Unique(_) => CollectionKind::Unique,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CacheCollection::Ordered(c) => c.len(),
            CacheCollection::Unique(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_populated(&self) -> bool {
        match self {
            CacheCollection::Ordered(c) => c.is_populated(),
            CacheCollection::Unique(c) => c.is_populated(),
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        match self {
            CacheCollection::Ordered(c) => Iter::Ordered(c.iter()),
            CacheCollection::Unique(c) => Iter::Unique(c.iter()),
        }
    }

    /// Freeze the collection behind a shared read-only view.
    pub fn into_view(self) -> CacheView<T> {
        CacheView {
            inner: Arc::new(self),
        }
    }
}

impl<T: Eq + Hash> CacheCollection<T> {
    /// Populate according to the collection's discipline.
    pub fn populate<I>(&mut self, items: I) -> CacheResult<PopulateSummary>
    where
        I: IntoIterator<Item = T>,
    {
        match self {
            CacheCollection::Ordered(c) => c.populate(items),
            CacheCollection::Unique(c) => c.populate(items),
        }
    }
}

impl<T> From<OrderedCollection<T>> for CacheCollection<T> {
    fn from(collection: OrderedCollection<T>) -> Self {
        CacheCollection::Ordered(collection)
    }
}

impl<T> From<UniqueCollection<T>> for CacheCollection<T> {
    fn from(collection: UniqueCollection<T>) -> Self {
        CacheCollection::Unique(collection)
    }
}

/// Iterator over a cache collection.
#[derive(Debug)]
pub enum Iter<'a, T> {
    Ordered(slice::Iter<'a, T>),
    Unique(hash_set::Iter<'a, T>),
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Iter::Ordered(it) => it.next(),
            Iter::Unique(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Iter::Ordered(it) => it.size_hint(),
            Iter::Unique(it) => it.size_hint(),
        }
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

// ============================================================================
// VIEW
// ============================================================================

/// Read-only shared view of a materialized collection.
///
/// Cloning a view is cheap and every clone refers to the same collection
/// instance; see [`CacheView::ptr_eq`].
#[derive(Debug)]
pub struct CacheView<T> {
    inner: Arc<CacheCollection<T>>,
}

impl<T> CacheView<T> {
    pub fn kind(&self) -> CollectionKind {
        self.inner.kind()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.inner.iter()
    }

    /// True when both views share one collection instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> CacheView<T> {
    /// Copy the contents out, in the view's iteration order.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T: Eq + Hash> CacheView<T> {
    pub fn contains(&self, item: &T) -> bool {
        match self.inner.as_ref() {
            CacheCollection::Ordered(c) => c.iter().any(|x| x == item),
            CacheCollection::Unique(c) => c.contains(item),
        }
    }
}

impl<T> Clone for CacheView<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<'a, T> IntoIterator for &'a CacheView<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// TESTS
// =============================================================================
