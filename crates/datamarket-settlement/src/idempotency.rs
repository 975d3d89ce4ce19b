//! At-most-once settlement guard.
//!
//! An escrow counts as settled as soon as any [`Costs`] record references it,
//! directly by escrow id or through its agreement. [`settle_once`] runs that
//! lookup inside the settling transaction: the queries land in the read set,
//! so of two racing settlements of the same escrow only the first commits and
//! the second fails with `CommitConflict`. A later attempt sees the record
//! and fails with [`DataMarketError::AlreadySettled`].

use datamarket_ledger::{Field, Query, TxContext};
use datamarket_types::{
    AgreementId, CostId, Costs, DataAgreement, DataMarketError, DocType, Escrow, EscrowId, Result,
};
use tracing::warn;

/// What a settlement settles: an escrow, and its agreement once there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementKey {
    pub escrow_id: EscrowId,
    pub agreement_id: Option<AgreementId>,
}

impl SettlementKey {
    #[must_use]
    pub fn for_escrow(escrow: &Escrow) -> Self {
        Self {
            escrow_id: escrow.id.clone(),
            agreement_id: escrow.agreement_id.clone(),
        }
    }

    #[must_use]
    pub fn for_agreement(agreement: &DataAgreement) -> Self {
        Self {
            escrow_id: agreement.escrow_id.clone(),
            agreement_id: Some(agreement.id.clone()),
        }
    }
}

/// The `Costs` record already covering `key`, if any.
pub fn existing_settlement(ctx: &mut TxContext<'_>, key: &SettlementKey) -> Result<Option<Costs>> {
    let by_escrow = Query::new(DocType::Costs).where_eq(Field::EscrowId, key.escrow_id.as_str());
    if let Some(costs) = ctx.tx.select::<Costs>(&by_escrow)?.into_iter().next() {
        return Ok(Some(costs));
    }
    let Some(agreement_id) = &key.agreement_id else {
        return Ok(None);
    };
    let by_agreement = Query::new(DocType::Costs).where_eq(Field::Agreement, agreement_id.as_str());
    Ok(ctx.tx.select::<Costs>(&by_agreement)?.into_iter().next())
}

/// Run `settle` unless `key` is already settled.
///
/// # Errors
/// [`DataMarketError::AlreadySettled`] if a `Costs` record covers `key`;
/// otherwise whatever `settle` returns.
pub fn settle_once<'a, T>(
    ctx: &mut TxContext<'a>,
    key: &SettlementKey,
    settle: impl FnOnce(&mut TxContext<'a>) -> Result<T>,
) -> Result<T> {
    if let Some(costs) = existing_settlement(ctx, key)? {
        warn!(
            tx_id = %ctx.tx_id(),
            escrow = %key.escrow_id,
            costs = %costs.id,
            kind = %costs.kind,
            "refusing to settle an escrow twice"
        );
        return Err(DataMarketError::AlreadySettled {
            key: key.escrow_id.to_string(),
        });
    }
    settle(ctx)
}

/// Reject a cost id that coincides with one of the ids it was derived from
/// or that the caller supplied empty.
pub fn check_cost_id(cost_id: &CostId, sources: &[&str]) -> Result<()> {
    if cost_id.is_empty() {
        return Err(DataMarketError::malformed("cost id is empty"));
    }
    if sources.contains(&cost_id.as_str()) {
        return Err(DataMarketError::DuplicateRecord {
            key: cost_id.to_string(),
        });
    }
    Ok(())
}
