//! One invocation's view of the world state.
//!
//! Reads go to the store (and are recorded with their version) unless the
//! transaction already staged a write for the key, in which case the staged
//! value is returned. Nothing reaches the store until [`Transaction::commit`];
//! dropping a transaction discards its writes.

use std::collections::BTreeMap;

use datamarket_types::{DataMarketError, Record, Result};
use serde_json::Value;
use tracing::debug;

use crate::{Query, RangeRead, ReadWriteSet, TxHeader, WorldState};

pub struct Transaction<'a> {
    store: &'a dyn WorldState,
    header: TxHeader,
    reads: BTreeMap<String, Option<u64>>,
    range_reads: Vec<RangeRead>,
    writes: BTreeMap<String, Option<Value>>,
}

impl<'a> Transaction<'a> {
    pub fn begin(store: &'a dyn WorldState, header: TxHeader) -> Self {
        Self {
            store,
            header,
            reads: BTreeMap::new(),
            range_reads: Vec::new(),
            writes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn header(&self) -> &TxHeader {
        &self.header
    }

    #[must_use]
    pub fn tx_id(&self) -> &str {
        &self.header.tx_id
    }

    // =================================================================
    // Raw documents
    // =================================================================

    /// Current value of `key` as this transaction sees it.
    pub fn get_raw(&mut self, key: &str) -> Result<Option<Value>> {
        if let Some(staged) = self.writes.get(key) {
            return Ok(staged.clone());
        }
        let current = self.store.get_state(key)?;
        self.reads
            .entry(key.to_string())
            .or_insert_with(|| current.as_ref().map(|v| v.version));
        Ok(current.map(|v| v.value))
    }

    pub fn exists(&mut self, key: &str) -> Result<bool> {
        Ok(self.get_raw(key)?.is_some())
    }

    pub fn put_raw(&mut self, key: impl Into<String>, value: Value) {
        self.writes.insert(key.into(), Some(value));
    }

    pub fn delete(&mut self, key: impl Into<String>) {
        self.writes.insert(key.into(), None);
    }

    /// Documents matching `query`, ordered by key, with this transaction's
    /// staged writes applied on top of the store's result.
    pub fn query_raw(&mut self, query: &Query) -> Result<Vec<(String, Value)>> {
        let found = self.store.scan(query)?;
        self.range_reads.push(RangeRead {
            query: query.clone(),
            observed: found
                .iter()
                .map(|(k, v)| (k.clone(), v.version))
                .collect(),
        });

        let mut merged: BTreeMap<String, Value> =
            found.into_iter().map(|(k, v)| (k, v.value)).collect();
        for (key, staged) in &self.writes {
            match staged {
                Some(value) if query.matches(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                _ => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    // =================================================================
    // Typed records
    // =================================================================

    /// The `T` stored under `key`; `None` if absent or a different kind of document.
    pub fn fetch<T: Record>(&mut self, key: &str) -> Result<Option<T>> {
        let Some(value) = self.get_raw(key)? else {
            return Ok(None);
        };
        if value.get("docType").and_then(Value::as_str) != Some(T::DOC_TYPE.as_str()) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Like [`fetch`](Self::fetch) but absence is `NotFound`.
    pub fn require<T: Record>(&mut self, key: &str) -> Result<T> {
        self.fetch(key)?
            .ok_or_else(|| DataMarketError::not_found(T::DOC_TYPE, key))
    }

    /// Stage `record` under its own key, replacing any previous value.
    pub fn store<T: Record>(&mut self, record: &T) -> Result<()> {
        if record.doc_type() != T::DOC_TYPE {
            return Err(DataMarketError::Internal(format!(
                "record {} carries docType {} but is stored as {}",
                record.key(),
                record.doc_type(),
                T::DOC_TYPE
            )));
        }
        let value = serde_json::to_value(record)?;
        debug!(tx_id = %self.header.tx_id, key = record.key(), doc_type = %T::DOC_TYPE, "staged write");
        self.put_raw(record.key(), value);
        Ok(())
    }

    /// Stage a record that must not exist yet under any document type.
    pub fn insert_new<T: Record>(&mut self, record: &T) -> Result<()> {
        if self.exists(record.key())? {
            return Err(DataMarketError::DuplicateRecord {
                key: record.key().to_string(),
            });
        }
        self.store(record)
    }

    /// Every `T` matching `query`.
    pub fn select<T: Record>(&mut self, query: &Query) -> Result<Vec<T>> {
        if query.doc_type() != T::DOC_TYPE {
            return Err(DataMarketError::Internal(format!(
                "query for {} decoded as {}",
                query.doc_type(),
                T::DOC_TYPE
            )));
        }
        self.query_raw(query)?
            .into_iter()
            .map(|(_, v)| serde_json::from_value(v).map_err(DataMarketError::from))
            .collect()
    }

    // =================================================================
    // Completion
    // =================================================================

    #[must_use]
    pub fn has_writes(&self) -> bool {
        !self.writes.is_empty()
    }

    #[must_use]
    pub fn into_read_write_set(self) -> ReadWriteSet {
        ReadWriteSet {
            tx_id: self.header.tx_id,
            reads: self.reads,
            range_reads: self.range_reads,
            writes: self.writes,
        }
    }

    /// Hand the read/write set to the store. Returns the ledger height.
    pub fn commit(self) -> Result<u64> {
        let store = self.store;
        store.commit(self.into_read_write_set())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use datamarket_types::{DataOffer, DocType, OrgId};
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::{Field, MemoryLedger};

    fn header(n: u32) -> TxHeader {
        TxHeader::new(
            OrgId::from("Org1MSP"),
            Utc.with_ymd_and_hms(2024, 3, 1, 8, n, 0).unwrap(),
        )
    }

    fn offer(id: &str) -> DataOffer {
        DataOffer::dummy(id, "alice", "Org1MSP", Decimal::new(300, 0), Decimal::new(50, 0))
    }

    #[test]
    fn reads_see_own_writes() {
        let ledger = MemoryLedger::new();
        let mut tx = Transaction::begin(&ledger, header(0));
        assert!(tx.fetch::<DataOffer>("o-1").unwrap().is_none());
        tx.store(&offer("o-1")).unwrap();
        assert_eq!(tx.require::<DataOffer>("o-1").unwrap().id.as_str(), "o-1");
        // Nothing visible outside until commit.
        assert!(ledger.get_state("o-1").unwrap().is_none());
        assert_eq!(tx.commit().unwrap(), 1);
        assert!(ledger.get_state("o-1").unwrap().is_some());
    }

    #[test]
    fn dropped_transaction_writes_nothing() {
        let ledger = MemoryLedger::new();
        {
            let mut tx = Transaction::begin(&ledger, header(0));
            tx.store(&offer("o-1")).unwrap();
        }
        assert!(ledger.get_state("o-1").unwrap().is_none());
        assert_eq!(ledger.height().unwrap(), 0);
    }

    #[test]
    fn require_reports_not_found() {
        let ledger = MemoryLedger::new();
        let mut tx = Transaction::begin(&ledger, header(0));
        let err = tx.require::<DataOffer>("missing").unwrap_err();
        assert!(matches!(
            err,
            DataMarketError::NotFound { doc_type: DocType::DataOffer, .. }
        ));
    }

    #[test]
    fn fetch_ignores_other_doc_types() {
        let ledger = MemoryLedger::new();
        let mut tx = Transaction::begin(&ledger, header(0));
        tx.put_raw("k", json!({"docType": "escrow", "id": "k"}));
        assert!(tx.fetch::<DataOffer>("k").unwrap().is_none());
        assert!(tx.exists("k").unwrap());
    }

    #[test]
    fn insert_new_rejects_existing_key() {
        let ledger = MemoryLedger::new();
        let mut tx = Transaction::begin(&ledger, header(0));
        tx.insert_new(&offer("o-1")).unwrap();
        let err = tx.insert_new(&offer("o-1")).unwrap_err();
        assert!(matches!(err, DataMarketError::DuplicateRecord { .. }));
    }

    #[test]
    fn query_overlays_staged_writes() {
        let ledger = MemoryLedger::new();
        let mut tx = Transaction::begin(&ledger, header(0));
        tx.store(&offer("o-1")).unwrap();
        tx.store(&offer("o-2")).unwrap();
        tx.commit().unwrap();

        let mut tx = Transaction::begin(&ledger, header(1));
        let mut changed = offer("o-2");
        changed.creator = "carol".into();
        tx.store(&changed).unwrap();
        tx.store(&offer("o-3")).unwrap();
        tx.delete("o-1");

        let q = Query::new(DocType::DataOffer).where_eq(Field::Creator, "alice");
        let ids: Vec<String> = tx
            .select::<DataOffer>(&q)
            .unwrap()
            .into_iter()
            .map(|o| o.id.0)
            .collect();
        assert_eq!(ids, ["o-3"]);
    }

    #[test]
    fn select_with_mismatched_type_is_internal() {
        let ledger = MemoryLedger::new();
        let mut tx = Transaction::begin(&ledger, header(0));
        let err = tx
            .select::<DataOffer>(&Query::new(DocType::Escrow))
            .unwrap_err();
        assert!(matches!(err, DataMarketError::Internal(_)));
    }
}
