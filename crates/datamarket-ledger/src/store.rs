//! The [`WorldState`] trait: what the engine needs from a ledger.
//!
//! Documents are JSON values stamped with the height of the commit that last
//! wrote them. A transaction hands its reads and staged writes to
//! [`WorldState::commit`] as one [`ReadWriteSet`]; the store applies it
//! atomically or rejects it when anything it read has moved.

use std::collections::BTreeMap;

use datamarket_types::Result;
use serde_json::Value;

use crate::Query;

/// A stored document and the commit height that last wrote it.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    pub value: Value,
    pub version: u64,
}

/// Keys and versions a query observed when it ran.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeRead {
    pub query: Query,
    pub observed: BTreeMap<String, u64>,
}

/// Everything a transaction read and wants to write.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadWriteSet {
    pub tx_id: String,
    /// Point reads: key → version seen (`None` when the key was absent).
    pub reads: BTreeMap<String, Option<u64>>,
    pub range_reads: Vec<RangeRead>,
    /// Staged writes: `None` deletes the key.
    pub writes: BTreeMap<String, Option<Value>>,
}

impl ReadWriteSet {
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Versioned key/value world state.
pub trait WorldState: Send + Sync {
    /// Current document under `key`.
    fn get_state(&self, key: &str) -> Result<Option<Versioned>>;

    /// Every document matching `query`, ordered by key.
    fn scan(&self, query: &Query) -> Result<Vec<(String, Versioned)>>;

    /// Validate the read set against current versions and apply the writes.
    /// Returns the ledger height after the commit.
    ///
    /// # Errors
    /// `CommitConflict` if a point read or query result changed since it was
    /// observed, `DuplicateTransaction` if the tx id was already committed.
    fn commit(&self, rw_set: ReadWriteSet) -> Result<u64>;

    /// Number of commits that wrote at least one key.
    fn height(&self) -> Result<u64>;
}
