//! Per-invocation context: transaction header, open transaction, caller identity.

use chrono::{DateTime, Utc};
use datamarket_types::{DataMarketError, LedgerTime, OrgCheck, OrgId, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::{IdentityProvider, Transaction};

/// Transaction id, timestamp and submitting organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHeader {
    pub tx_id: String,
    pub timestamp: DateTime<Utc>,
    pub creator: OrgId,
}

impl TxHeader {
    /// Fresh header with a unique transaction id.
    ///
    /// `tx_id = hex(SHA-256("datamarket:tx:v1:" || creator || timestamp || uuid_v7))`
    #[must_use]
    pub fn new(creator: OrgId, timestamp: DateTime<Utc>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"datamarket:tx:v1:");
        hasher.update(creator.as_str().as_bytes());
        hasher.update(timestamp.to_rfc3339().as_bytes());
        hasher.update(Uuid::now_v7().as_bytes());
        Self {
            tx_id: hex::encode(hasher.finalize()),
            timestamp,
            creator,
        }
    }

    /// Transaction time truncated to the minute.
    #[must_use]
    pub fn now(&self) -> LedgerTime {
        LedgerTime::from_datetime(self.timestamp)
    }
}

/// Everything an operation needs: the open transaction, who is calling,
/// and how strictly organizations are checked.
pub struct TxContext<'a> {
    pub tx: Transaction<'a>,
    identity: &'a dyn IdentityProvider,
    org_check: &'a OrgCheck,
}

impl<'a> TxContext<'a> {
    pub fn new(tx: Transaction<'a>, identity: &'a dyn IdentityProvider, org_check: &'a OrgCheck) -> Self {
        Self {
            tx,
            identity,
            org_check,
        }
    }

    #[must_use]
    pub fn tx_id(&self) -> &str {
        self.tx.tx_id()
    }

    #[must_use]
    pub fn now(&self) -> LedgerTime {
        self.tx.header().now()
    }

    pub fn caller_org(&self) -> Result<OrgId> {
        self.identity.caller_org()
    }

    /// Require that the caller submits through a peer of its own
    /// organization, unless the check is bypassed. Returns the caller org.
    ///
    /// # Errors
    /// Returns `Unauthorized` when caller and host organizations differ.
    pub fn authorize(&self) -> Result<OrgId> {
        let caller = self.identity.caller_org()?;
        match self.org_check {
            OrgCheck::Enforce => {
                let host = self.identity.host_org()?;
                if caller != host {
                    return Err(DataMarketError::Unauthorized {
                        caller,
                        required: host,
                    });
                }
            }
            OrgCheck::Bypass { justification } => {
                warn!(
                    tx_id = %self.tx_id(),
                    caller = %caller,
                    justification = %justification,
                    "host organization check bypassed"
                );
            }
        }
        Ok(caller)
    }

    /// Require that the caller belongs to `required`.
    ///
    /// # Errors
    /// Returns `Unauthorized` otherwise.
    pub fn require_org(&self, required: &OrgId) -> Result<()> {
        let caller = self.identity.caller_org()?;
        if &caller != required {
            return Err(DataMarketError::Unauthorized {
                caller,
                required: required.clone(),
            });
        }
        Ok(())
    }

    /// Require that the caller belongs to one of `allowed`.
    ///
    /// # Errors
    /// Returns `Unauthorized` naming the first allowed org otherwise.
    pub fn require_any_org(&self, allowed: &[&OrgId]) -> Result<()> {
        let caller = self.identity.caller_org()?;
        if allowed.iter().any(|org| **org == caller) {
            return Ok(());
        }
        Err(DataMarketError::Unauthorized {
            caller,
            required: allowed.first().map(|o| (*o).clone()).unwrap_or_default(),
        })
    }

    /// Give back the transaction for commit.
    #[must_use]
    pub fn into_transaction(self) -> Transaction<'a> {
        self.tx
    }
}
