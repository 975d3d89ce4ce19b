//! In-memory [`WorldState`] with multi-version concurrency control.
//!
//! Each key carries the height of the commit that last wrote it. A commit is
//! accepted only if every key it read still has the version it saw and every
//! query it ran would still return the same keys at the same versions.
//!
//! This is a reference store: the set of committed tx ids used to reject
//! duplicates is kept for the ledger's lifetime and never pruned.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use datamarket_types::{DataMarketError, Result};
use tracing::{debug, warn};

use crate::{Query, ReadWriteSet, Versioned, WorldState};

#[derive(Debug, Default)]
struct Inner {
    docs: BTreeMap<String, Versioned>,
    height: u64,
    committed: HashSet<String>,
}

impl Inner {
    fn scan(&self, query: &Query) -> Vec<(String, Versioned)> {
        self.docs
            .iter()
            .filter(|(_, v)| query.matches(&v.value))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn validate(&self, rw_set: &ReadWriteSet) -> Result<()> {
        for (key, seen) in &rw_set.reads {
            let current = self.docs.get(key).map(|v| v.version);
            if current != *seen {
                return Err(DataMarketError::CommitConflict { key: key.clone() });
            }
        }
        for range in &rw_set.range_reads {
            let now: BTreeMap<String, u64> = self
                .scan(&range.query)
                .into_iter()
                .map(|(k, v)| (k, v.version))
                .collect();
            if now != range.observed {
                let key = now
                    .iter()
                    .find(|(k, v)| range.observed.get(*k) != Some(v))
                    .map(|(k, _)| k.clone())
                    .or_else(|| {
                        range
                            .observed
                            .keys()
                            .find(|k| !now.contains_key(*k))
                            .cloned()
                    })
                    .unwrap_or_else(|| range.query.to_string());
                return Err(DataMarketError::CommitConflict { key });
            }
        }
        Ok(())
    }
}

/// Thread-safe in-memory ledger.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: RwLock<Inner>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.docs.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| DataMarketError::Storage("ledger lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| DataMarketError::Storage("ledger lock poisoned".into()))
    }
}

impl WorldState for MemoryLedger {
    fn get_state(&self, key: &str) -> Result<Option<Versioned>> {
        Ok(self.read()?.docs.get(key).cloned())
    }

    fn scan(&self, query: &Query) -> Result<Vec<(String, Versioned)>> {
        Ok(self.read()?.scan(query))
    }

    fn commit(&self, rw_set: ReadWriteSet) -> Result<u64> {
        let mut inner = self.write()?;
        if inner.committed.contains(&rw_set.tx_id) {
            return Err(DataMarketError::DuplicateTransaction(rw_set.tx_id));
        }
        if let Err(err) = inner.validate(&rw_set) {
            warn!(tx_id = %rw_set.tx_id, error = %err, "commit rejected");
            return Err(err);
        }

        if !rw_set.is_read_only() {
            inner.height += 1;
            let version = inner.height;
            for (key, staged) in rw_set.writes {
                match staged {
                    Some(value) => {
                        inner.docs.insert(key, Versioned { value, version });
                    }
                    None => {
                        inner.docs.remove(&key);
                    }
                }
            }
        }
        inner.committed.insert(rw_set.tx_id.clone());
        debug!(tx_id = %rw_set.tx_id, height = inner.height, "committed");
        Ok(inner.height)
    }

    fn height(&self) -> Result<u64> {
        Ok(self.read()?.height)
    }
}
