//! Append-only delivery-proof log kept per offer.

use serde::{Deserialize, Serialize};

use crate::{DataMarketError, DocType, HashId, HashLogId, OfferId, Record, Result};

/// Key prefix for logs created without a caller-supplied id.
pub const HASH_LOG_KEY_PREFIX: &str = "offer_data_hash:";

/// One delivery proof: the hash of a delivered file and when it was logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataHash {
    #[serde(rename = "docType")]
    pub doc_type: DocType,
    pub id: HashId,
    pub hash: String,
    #[serde(rename = "file_name")]
    pub filename: String,
    /// `YYYY-MM-DD HH:MM`, as reported by the provider.
    #[serde(rename = "entryDate")]
    pub entry_date: String,
}

impl DataHash {
    #[must_use]
    pub fn new(id: HashId, hash: String, filename: String, entry_date: String) -> Self {
        Self {
            doc_type: DocType::DataHashValue,
            id,
            hash,
            filename,
            entry_date,
        }
    }
}

/// The ordered log of every [`DataHash`] a provider appended for one offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferDataHash {
    #[serde(rename = "docType")]
    pub doc_type: DocType,
    pub id: HashLogId,
    pub offer_id: OfferId,
    #[serde(rename = "data_provider")]
    pub provider: String,
    #[serde(rename = "data_hashes", default)]
    pub entries: Vec<DataHash>,
}

impl Record for OfferDataHash {
    const DOC_TYPE: DocType = DocType::OfferDataHash;

    fn key(&self) -> &str {
        self.id.as_str()
    }

    fn doc_type(&self) -> DocType {
        self.doc_type
    }
}

impl OfferDataHash {
    /// An empty log for `offer_id`.
    #[must_use]
    pub fn new(id: HashLogId, offer_id: OfferId, provider: String) -> Self {
        Self {
            doc_type: DocType::OfferDataHash,
            id,
            offer_id,
            provider,
            entries: Vec::new(),
        }
    }

    /// Default log key for an offer.
    #[must_use]
    pub fn default_id(offer_id: &OfferId) -> HashLogId {
        HashLogId(format!("{HASH_LOG_KEY_PREFIX}{offer_id}"))
    }

    #[must_use]
    pub fn contains_id(&self, id: &HashId) -> bool {
        self.entries.iter().any(|e| &e.id == id)
    }

    /// Whether any logged entry carries this hash value.
    #[must_use]
    pub fn contains_value(&self, hash: &str) -> bool {
        self.entries.iter().any(|e| e.hash == hash)
    }

    /// Append an entry.
    ///
    /// # Errors
    /// Returns `DuplicateRecord` if the hash id is already in the log.
    pub fn append(&mut self, entry: DataHash) -> Result<()> {
        if self.contains_id(&entry.id) {
            return Err(DataMarketError::DuplicateRecord {
                key: format!("{}/{}", self.id, entry.id),
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Entries whose id is in `linked`, in log order.
    #[must_use]
    pub fn entries_linked_to<'a>(&'a self, linked: &[HashId]) -> Vec<&'a DataHash> {
        self.entries
            .iter()
            .filter(|e| linked.contains(&e.id))
            .collect()
    }
}
