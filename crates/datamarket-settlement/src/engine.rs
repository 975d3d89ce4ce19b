//! The settlement engine and what a settlement produces.
//!
//! Each settlement path lives in its own module as an `impl SettlementEngine`
//! block; this module holds the shared tail that persists the [`Costs`]
//! record and audits it.

use datamarket_ledger::TxContext;
use datamarket_types::{Costs, EngineConfig, Escrow, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::conservation::FundsAudit;

/// Outcome of one settlement: the persisted split, its audit, and a
/// human-readable verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub costs: Costs,
    pub audit: FundsAudit,
    pub message: String,
}

/// Computes and persists settlements under one [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct SettlementEngine {
    config: EngineConfig,
}

impl SettlementEngine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Persist `costs` (which must be new), audit it against the escrow as
    /// it was before settling, and log the split.
    pub(crate) fn finish(
        &self,
        ctx: &mut TxContext<'_>,
        before: &Escrow,
        costs: Costs,
        message: impl Into<String>,
    ) -> Result<Settlement> {
        ctx.tx.insert_new(&costs)?;
        let audit = FundsAudit::for_settlement(before, &costs);
        audit.report(&costs);
        let message = message.into();
        info!(
            tx_id = %ctx.tx_id(),
            costs = %costs.id,
            kind = %costs.kind,
            escrow = %costs.escrow_id,
            provider_reimbursement = %costs.provider_reimbursement,
            consumer_refund = %costs.consumer_refund,
            retained = %audit.retained,
            "{message}"
        );
        Ok(Settlement {
            costs,
            audit,
            message,
        })
    }
}
