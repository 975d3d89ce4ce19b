//! Receipts returned to callers of mutating operations.

use serde::{Deserialize, Serialize};

use crate::Costs;

/// What a committed invocation produced.
///
/// Every mutating operation returns one receipt. Settlement operations also
/// carry the `Costs` they wrote and its digest so callers can verify the
/// split without another read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Ledger transaction id.
    #[serde(rename = "txId")]
    pub tx_id: String,
    /// Human-readable outcome.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costs: Option<Costs>,
    /// [`Costs::digest`] of `costs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costs_digest: Option<String>,
    /// Ledger height after commit. Unchanged by invocations that wrote nothing.
    pub commit_height: u64,
}

impl Receipt {
    #[must_use]
    pub fn new(tx_id: impl Into<String>, message: impl Into<String>, commit_height: u64) -> Self {
        Self {
            tx_id: tx_id.into(),
            message: message.into(),
            costs: None,
            costs_digest: None,
            commit_height,
        }
    }

    /// Attach the settlement record, computing its digest.
    #[must_use]
    pub fn with_costs(mut self, costs: Costs) -> Self {
        self.costs_digest = Some(costs.digest());
        self.costs = Some(costs);
        self
    }
}
