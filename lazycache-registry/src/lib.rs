//! LAZYCACHE Registry - Type-Keyed Lazy Caches
//!
//! A [`CacheRegistry`] maps element types to collections that are computed
//! on first access. Each type registers one producer with its arguments;
//! the producer runs at most once, and its result (or its failure) is what
//! every later lookup for that type observes.
//!
//! # Example
//!
//! ```
//! use lazycache_core::{BoundProducer, CollectionKind};
//! use lazycache_registry::{CacheRegistry, EntryState};
//!
//! #[derive(Debug, Clone, PartialEq, Eq, Hash)]
//! struct Color(&'static str);
//!
//! let registry = CacheRegistry::new();
//! registry
//!     .register_bound(
//!         CollectionKind::Unique,
//!         BoundProducer::from_fn("colors", || {
//!             Ok(vec![Color("red"), Color("blue"), Color("red")])
//!         }),
//!     )
//!     .unwrap();
//! assert_eq!(registry.state::<Color>(), Some(EntryState::Pending));
//!
//! let colors = registry.get::<Color>().unwrap();
//! assert_eq!(colors.len(), 2);
//! assert!(colors.contains(&Color("blue")));
//! ```

mod entry;
mod registry;
mod stats;

pub use entry::EntryState;
pub use registry::CacheRegistry;
pub use stats::RegistryStats;

pub use lazycache_core::{
    args, Args, BoundProducer, CacheError, CacheResult, CacheView, CollectionKind, FnProducer,
    Param, Producer, ProducerError, RegistryConfig, Signature,
};
