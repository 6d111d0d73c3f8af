//! Persistent storage of cache records.
//!
//! The sampling engine never touches paths directly: it reads and writes whole
//! [`CacheRecord`]s through the [`CacheStore`] trait. Writes are optimistic. The caller
//! passes the revision it observed when it read the record, and a store rejects the
//! write with [`StoreError::Conflict`] if another writer published a different record
//! in between.

pub mod fs;
pub mod memory;

use crate::core::io::xyz::XyzError;
use crate::core::models::ids::ComputationKey;
use crate::core::models::record::CacheRecord;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error for '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse '{path}': {source}", path = path.display())]
    TomlDe {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize '{path}': {source}", path = path.display())]
    TomlSer {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error("Failed to read trajectory '{path}': {source}", path = path.display())]
    Trajectory { path: PathBuf, source: XyzError },
    #[error("Corrupt record at '{path}': {reason}", path = path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error(
        "Concurrent update of {key}: expected revision {expected:?}, found {found:?}"
    )]
    Conflict {
        key: ComputationKey,
        expected: Option<u64>,
        found: Option<u64>,
    },
}

/// Result of a successful [`CacheStore::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new record was published under this revision.
    Written { revision: u64 },
    /// The stored record already had identical content; nothing was written.
    Unchanged { revision: u64 },
}

impl WriteOutcome {
    pub fn revision(self) -> u64 {
        match self {
            WriteOutcome::Written { revision } | WriteOutcome::Unchanged { revision } => revision,
        }
    }
}

pub trait CacheStore {
    /// Returns the published record for `key`, or `None` if nothing is cached.
    fn read(&self, key: &ComputationKey) -> Result<Option<CacheRecord>, StoreError>;

    /// Atomically publishes `record` as the state of `key`.
    ///
    /// `expected_revision` is the revision observed by the caller (`None` if no record
    /// existed). The store assigns the new revision itself; the `revision` field of
    /// `record` is ignored.
    fn write(
        &self,
        key: &ComputationKey,
        record: &CacheRecord,
        expected_revision: Option<u64>,
    ) -> Result<WriteOutcome, StoreError>;

    /// Directory holding the record of `key`, for stores that keep one on disk.
    fn location(&self, _key: &ComputationKey) -> Option<PathBuf> {
        None
    }
}

/// What a store should do with a write, given the currently published record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteDecision {
    Publish { revision: u64 },
    Skip { revision: u64 },
}

pub(crate) fn decide_write(
    key: &ComputationKey,
    current: Option<&CacheRecord>,
    record: &CacheRecord,
    expected_revision: Option<u64>,
) -> Result<WriteDecision, StoreError> {
    let found = current.map(|c| c.revision);

    if let Some(current) = current {
        if current.same_content(record) {
            return Ok(WriteDecision::Skip {
                revision: current.revision,
            });
        }
    }

    if found != expected_revision {
        return Err(StoreError::Conflict {
            key: key.clone(),
            expected: expected_revision,
            found,
        });
    }

    Ok(WriteDecision::Publish {
        revision: found.map_or(1, |r| r + 1),
    })
}
