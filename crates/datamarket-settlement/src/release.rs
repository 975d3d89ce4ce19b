//! Scheduled release of an active escrow.
//!
//! At the end date the escrow pays out in full and expires. Before it, only
//! the price is split by elapsed time; the deposits stay held and the escrow
//! and agreement are left as they are.

use datamarket_ledger::TxContext;
use datamarket_types::{
    CostId, Costs, DataAgreement, DataMarketError, DataOffer, DocType, Escrow, EscrowStatus,
    OfferRequest, Result, SettlementKind,
};

use crate::{
    engine::{Settlement, SettlementEngine},
    idempotency::{SettlementKey, check_cost_id, settle_once},
    proration::{Proration, ends_at},
    revocation::full_term_split,
};

impl SettlementEngine {
    /// Release `escrow_id`, recording the split under the caller-chosen `cost_id`.
    ///
    /// # Errors
    /// - `NotFound` for an unknown escrow
    /// - `AlreadySettled` if the escrow already has a `Costs` record
    /// - `InvalidTransition` unless the escrow is ACTIVE
    /// - `Unauthorized` unless the caller belongs to the provider's or consumer's org
    /// - `MalformedInput` / `DuplicateRecord` for an empty or taken cost id
    pub fn release_escrow(
        &self,
        ctx: &mut TxContext<'_>,
        escrow_id: &str,
        cost_id: &str,
    ) -> Result<Settlement> {
        ctx.authorize()?;
        let mut escrow: Escrow = ctx.tx.require(escrow_id)?;

        settle_once(ctx, &SettlementKey::for_escrow(&escrow), |ctx| {
            if escrow.status != EscrowStatus::Active {
                return Err(DataMarketError::InvalidTransition {
                    doc_type: DocType::Escrow,
                    key: escrow.id.to_string(),
                    from: escrow.status.to_string(),
                    to: "RELEASED".into(),
                });
            }
            let request: OfferRequest = ctx.tx.require(escrow.request_id.as_str())?;
            let offer: DataOffer = ctx.tx.require(escrow.offer_id.as_str())?;
            ctx.require_any_org(&[&offer.owner_org, &request.owner_org])?;

            let cost_id = CostId::from(cost_id);
            check_cost_id(&cost_id, &[escrow.id.as_str(), escrow.request_id.as_str()])?;

            let now = ctx.now();
            let handling = self.config().date_handling;
            let before = escrow.clone();

            if ends_at(&escrow.end_date, now, handling)? {
                escrow.mark_expired()?;
                ctx.tx.store(&escrow)?;
                if let Some(agreement_id) = &escrow.agreement_id {
                    let mut agreement: DataAgreement = ctx.tx.require(agreement_id.as_str())?;
                    agreement.deactivate()?;
                    ctx.tx.store(&agreement)?;
                }
                let (provider, consumer) = full_term_split(&before);
                let costs = Costs::for_escrow(
                    cost_id,
                    SettlementKind::FullTerm,
                    &escrow,
                    provider,
                    consumer,
                    now,
                );
                return self.finish(ctx, &before, costs, "escrow released at term");
            }

            let p = Proration::compute(
                &escrow.start_date,
                &escrow.end_date,
                request.price,
                now,
                handling,
            )?;
            let costs = Costs::for_escrow(
                cost_id,
                SettlementKind::InterimRelease,
                &escrow,
                p.consumed_share(),
                p.remaining_share(),
                now,
            );
            self.finish(ctx, &before, costs, "interim release computed; deposits stay held")
        })
    }
}
