//! LAZYCACHE Test Utilities
//!
//! Shared test infrastructure for the lazycache workspace:
//! - Instrumented producers that count their invocations
//! - Proptest generators for kinds and item lists
//! - Fixtures for common element types
//! - Assertions for the cache error taxonomy

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Re-export core types for convenience
pub use lazycache_core::{
    args, Args, BoundProducer, CacheError, CacheResult, CacheView, CollectionKind, FnProducer,
    Param, Producer, ProducerError, Signature,
};

// ============================================================================
// ELEMENT TYPES
// ============================================================================

/// Small hashable element type used across registry tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Widget {
    pub name: String,
}

impl Widget {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

// ============================================================================
// INSTRUMENTED PRODUCERS
// ============================================================================

/// Shared invocation counter handed out by the instrumented producers.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Producer returning a fixed item list and counting how often it runs.
#[derive(Debug, Clone)]
pub struct CountingProducer<T> {
    items: Vec<T>,
    calls: CallCounter,
    delay: Option<Duration>,
}

impl<T: Clone + Send + 'static> CountingProducer<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            calls: CallCounter::new(),
            delay: None,
        }
    }

    /// Sleep for `delay` before returning, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl<T: Clone + Send + 'static> Producer<T> for CountingProducer<T> {
    fn signature(&self) -> Signature {
        Signature::new("counting")
    }

    fn produce(&self, _args: &Args) -> Result<Vec<T>, ProducerError> {
        self.calls.bump();
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        Ok(self.items.clone())
    }
}

/// Producer that always fails and counts how often it runs.
#[derive(Debug, Clone)]
pub struct FailingProducer {
    reason: String,
    calls: CallCounter,
}

impl FailingProducer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            calls: CallCounter::new(),
        }
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl<T> Producer<T> for FailingProducer {
    fn signature(&self) -> Signature {
        Signature::new("failing")
    }

    fn produce(&self, _args: &Args) -> Result<Vec<T>, ProducerError> {
        self.calls.bump();
        Err(ProducerError::failed(&self.reason))
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for registry inputs.

    use super::*;
    use proptest::prelude::*;

    /// Generate a collection kind.
    pub fn arb_collection_kind() -> impl Strategy<Value = CollectionKind> {
        prop_oneof![Just(CollectionKind::Ordered), Just(CollectionKind::Unique)]
    }

    /// Generate an item list drawn from a small domain, so duplicates are common.
    pub fn arb_items() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(0u8..16, 0..64)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built producers for common testing scenarios.

    use super::*;

    /// `make_widgets(count, prefix = "W")` producing `W0..W{count-1}`.
    pub fn make_widgets() -> FnProducer<impl Fn(&Args) -> Result<Vec<Widget>, ProducerError>> {
        FnProducer::new(
            Signature::new("make_widgets")
                .param(Param::required("count"))
                .param(Param::optional("prefix", "W")),
            |args: &Args| -> Result<Vec<Widget>, ProducerError> {
                let count: usize = args.get(0)?;
                let prefix: String = args.get(1)?;
                Ok((0..count)
                    .map(|i| Widget::new(format!("{prefix}{i}")))
                    .collect())
            },
        )
    }

    /// Producer with two required parameters and one optional parameter.
    pub fn three_param_producer() -> FnProducer<impl Fn(&Args) -> Result<Vec<i64>, ProducerError>>
    {
        FnProducer::new(
            Signature::new("span")
                .param(Param::required("start"))
                .param(Param::required("len"))
                .param(Param::optional("step", 1)),
            |args: &Args| -> Result<Vec<i64>, ProducerError> {
                let start: i64 = args.get(0)?;
                let len: i64 = args.get(1)?;
                let step: i64 = args.get(2)?;
                Ok((0..len).map(|i| start + i * step).collect())
            },
        )
    }

    /// Widgets named `W0..W{count-1}`.
    pub fn widgets(count: usize) -> Vec<Widget> {
        (0..count).map(|i| Widget::new(format!("W{i}"))).collect()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for cache results.

    use super::*;

    /// Assert that a CacheResult is a DuplicateRegistration error.
    #[track_caller]
    pub fn assert_duplicate<T: std::fmt::Debug>(result: &CacheResult<T>) {
        match result {
            Err(CacheError::DuplicateRegistration { .. }) => {}
            other => panic!("Expected DuplicateRegistration, got: {:?}", other),
        }
    }

    /// Assert that a CacheResult is an ArityMismatch for `supplied` arguments.
    #[track_caller]
    pub fn assert_arity_mismatch<T: std::fmt::Debug>(result: &CacheResult<T>, supplied: usize) {
        match result {
            Err(CacheError::ArityMismatch { supplied: s, .. }) => {
                assert_eq!(*s, supplied, "Wrong supplied count in ArityMismatch");
            }
            other => panic!("Expected ArityMismatch, got: {:?}", other),
        }
    }

    /// Assert that a CacheResult is a NotRegistered error.
    #[track_caller]
    pub fn assert_not_registered<T: std::fmt::Debug>(result: &CacheResult<T>) {
        match result {
            Err(CacheError::NotRegistered { .. }) => {}
            other => panic!("Expected NotRegistered, got: {:?}", other),
        }
    }

    /// Assert that a CacheResult is a MaterializationFailure and return its cause.
    #[track_caller]
    pub fn assert_materialization_failure<T: std::fmt::Debug>(
        result: &CacheResult<T>,
    ) -> ProducerError {
        match result {
            Err(CacheError::MaterializationFailure { source, .. }) => source.clone(),
            other => panic!("Expected MaterializationFailure, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
