//! Collection kind selecting how a cache entry is populated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Population discipline for a cache entry, fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Keeps insertion order and duplicates
    Ordered,
    /// Collapses duplicates by value equality; no order guarantee
    Unique,
}

impl CollectionKind {
    /// Stable lowercase name, used in logs and config.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Ordered => "ordered",
            CollectionKind::Unique => "unique",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = CollectionKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ordered" | "list" => Ok(CollectionKind::Ordered),
            "unique" | "set" => Ok(CollectionKind::Unique),
            _ => Err(CollectionKindParseError(s.to_string())),
        }
    }
}

/// Error when parsing an invalid collection kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionKindParseError(pub String);

impl fmt::Display for CollectionKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid collection kind: {}", self.0)
    }
}

impl std::error::Error for CollectionKindParseError {}
