//! Early termination of an agreement by either party.
//!
//! The party that walks away forfeits its deposit to the other side; the
//! price is split by elapsed time. Revoking in the agreement's last minute
//! settles it as a full term instead.
//!
//! | revoker  | provider gets             | consumer gets                      |
//! |----------|---------------------------|------------------------------------|
//! | provider | consumed share            | pDep + remaining share + cDep      |
//! | consumer | pDep + consumed share     | remaining share + cDep             |
//! | at term  | round2(pDep + payment)    | cDep                               |

use datamarket_ledger::TxContext;
use datamarket_types::{
    Costs, DataAgreement, DataOffer, Escrow, EscrowStatus, OfferRequest, Result, SettlementKind,
    money::round2,
};
use rust_decimal::Decimal;

use crate::{
    engine::{Settlement, SettlementEngine},
    idempotency::{SettlementKey, check_cost_id, settle_once},
    proration::{Proration, ends_at},
};

/// Split at term: the provider collects its deposit and the payment, the
/// consumer its deposit. Returns `(provider_reimbursement, consumer_refund)`.
pub(crate) fn full_term_split(escrow: &Escrow) -> (Decimal, Decimal) {
    (
        round2(escrow.provider_deposit + escrow.consumer_payment),
        escrow.consumer_deposit,
    )
}

impl SettlementEngine {
    /// Revoke an agreement on behalf of the provider (`is_provider`) or the
    /// consumer.
    ///
    /// # Errors
    /// - `NotFound` for an unknown agreement (or its escrow, request, offer)
    /// - `AlreadySettled` if the escrow already has a `Costs` record
    /// - `Unauthorized` unless the caller belongs to the revoking party's org
    /// - `InvalidTransition` if the escrow is not ACTIVE or the agreement is inactive
    /// - `DateParse` for unparseable escrow dates under strict handling
    pub fn revoke_agreement(
        &self,
        ctx: &mut TxContext<'_>,
        agreement_id: &str,
        is_provider: bool,
    ) -> Result<Settlement> {
        ctx.authorize()?;
        let mut agreement: DataAgreement = ctx.tx.require(agreement_id)?;

        settle_once(ctx, &SettlementKey::for_agreement(&agreement), |ctx| {
            let mut escrow: Escrow = ctx.tx.require(agreement.escrow_id.as_str())?;
            let request: OfferRequest = ctx.tx.require(agreement.request_id.as_str())?;
            if is_provider {
                let offer: DataOffer = ctx.tx.require(agreement.offer_id.as_str())?;
                ctx.require_org(&offer.owner_org)?;
            } else {
                ctx.require_org(&request.owner_org)?;
            }

            let cost_id = self.config().id_scheme.revocation_cost_id(&escrow.id)?;
            check_cost_id(&cost_id, &[escrow.id.as_str()])?;

            let now = ctx.now();
            let handling = self.config().date_handling;
            let before = escrow.clone();
            let at_term =
                escrow.status == EscrowStatus::Active && ends_at(&escrow.end_date, now, handling)?;

            let (kind, provider_reimbursement, consumer_refund, message) = if at_term {
                escrow.mark_expired()?;
                let (provider, consumer) = full_term_split(&before);
                (SettlementKind::FullTerm, provider, consumer, "agreement ran to term")
            } else {
                let p = Proration::compute(
                    &escrow.start_date,
                    &escrow.end_date,
                    request.price,
                    now,
                    handling,
                )?;
                escrow.mark_revoked()?;
                if is_provider {
                    (
                        SettlementKind::Revoked,
                        p.consumed_share(),
                        escrow.provider_deposit + p.remaining_share() + escrow.consumer_deposit,
                        "agreement revoked by provider",
                    )
                } else {
                    (
                        SettlementKind::Revoked,
                        escrow.provider_deposit + p.consumed_share(),
                        p.remaining_share() + escrow.consumer_deposit,
                        "agreement revoked by consumer",
                    )
                }
            };

            agreement.deactivate()?;
            ctx.tx.store(&agreement)?;
            ctx.tx.store(&escrow)?;

            let costs = Costs::for_escrow(
                cost_id,
                kind,
                &escrow,
                provider_reimbursement,
                consumer_refund,
                now,
            );
            self.finish(ctx, &before, costs, message)
        })
    }
}
