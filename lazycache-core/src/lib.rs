//! LAZYCACHE Core - Keys, Collections, Producers
//!
//! Building blocks shared by the registry and its callers. This crate has no
//! shared state and does no logging: it defines what a cache entry is made
//! of, not how entries are stored.

pub mod collection;
pub mod config;
pub mod error;
pub mod key;
pub mod kind;
pub mod producer;

pub use collection::{
    CacheCollection, CacheView, Iter, OrderedCollection, PopulateSummary, UniqueCollection,
};
pub use config::RegistryConfig;
pub use error::{CacheError, CacheResult, ConfigError, ProducerError};
pub use key::TypeKey;
pub use kind::{CollectionKind, CollectionKindParseError};
pub use producer::{Args, BoundProducer, FnProducer, Param, Producer, Signature};
