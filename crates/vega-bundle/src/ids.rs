use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for ranges, results, monikers, and shard-local
/// documents.
///
/// Identifiers are unique only within a single bundle's namespace; the same
/// logical range in two independently produced bundles generally carries two
/// unrelated ids. Shard indices derived from an id are therefore never
/// meaningful across bundles, only within the bundle that owns the id.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The unique-identifier source failed.
///
/// No valid identifier can be synthesized once the source fails, so the
/// surrounding operation must abort; a partially produced result cannot be
/// trusted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("identifier source exhausted: {message}")]
pub struct IdExhaustedError {
    pub message: String,
}

/// Source of fresh identifiers.
///
/// The merge mints ids for relabeled ranges, new result groups, and
/// shard-local document entries. Implementations must return ids that never
/// collide with ids already present in the bundle being extended.
pub trait IdAllocator {
    fn fresh(&mut self) -> Result<Id, IdExhaustedError>;
}

/// Production id source: random (v4) UUIDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidAllocator;

impl IdAllocator for UuidAllocator {
    fn fresh(&mut self) -> Result<Id, IdExhaustedError> {
        Ok(Id::new(uuid::Uuid::new_v4().to_string()))
    }
}
