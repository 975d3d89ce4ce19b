//! Provider declines a pending request: the consumer gets everything back.

use datamarket_ingress::PendingDecision;
use datamarket_ledger::TxContext;
use datamarket_types::{Costs, Result, SettlementKind, money::round2};
use rust_decimal::Decimal;

use crate::{
    engine::{Settlement, SettlementEngine},
    idempotency::{SettlementKey, check_cost_id, settle_once},
};

impl SettlementEngine {
    /// Reject a CREATED request. Request and escrow become REJECTED and the
    /// consumer is refunded deposit plus payment.
    ///
    /// # Errors
    /// Everything [`PendingDecision::load`] returns, `AlreadySettled` if the
    /// escrow already has a `Costs` record, and `DuplicateRecord` if the
    /// derived cost id collides.
    pub fn reject_offer_request(
        &self,
        ctx: &mut TxContext<'_>,
        offer_id: &str,
        request_id: &str,
    ) -> Result<Settlement> {
        let PendingDecision {
            mut request,
            mut escrow,
            ..
        } = PendingDecision::load(ctx, offer_id, request_id)?;

        settle_once(ctx, &SettlementKey::for_escrow(&escrow), |ctx| {
            let cost_id = self.config().id_scheme.rejection_cost_id(&request.id)?;
            check_cost_id(&cost_id, &[request.id.as_str(), escrow.id.as_str()])?;

            let before = escrow.clone();
            request.mark_rejected()?;
            escrow.mark_rejected()?;
            ctx.tx.store(&request)?;
            ctx.tx.store(&escrow)?;

            let costs = Costs::for_escrow(
                cost_id,
                SettlementKind::Rejected,
                &escrow,
                Decimal::ZERO,
                round2(escrow.consumer_deposit + escrow.consumer_payment),
                ctx.now(),
            );
            self.finish(ctx, &before, costs, "offer request rejected")
        })
    }
}

#[cfg(test)]
mod tests {
    use datamarket_types::{DataMarketError, Escrow, EscrowStatus, OfferRequest, RequestStatus};

    use super::*;
    use crate::fixture::{Harness, REQUEST_ID};

    #[test]
    fn rejection_refunds_consumer_in_full() {
        let h = Harness::with_request();
        let s = h
            .run("Org1MSP", "2024-03-01 07:45", |ctx| {
                h.engine.reject_offer_request(ctx, "o-1", REQUEST_ID)
            })
            .unwrap();
        assert_eq!(s.costs.kind, SettlementKind::Rejected);
        assert_eq!(s.costs.provider_reimbursement, Decimal::ZERO);
        assert_eq!(s.costs.consumer_refund, Decimal::new(350, 0));
        assert!(s.costs.agreement_id.is_none());
        assert!(s.audit.is_balanced());

        let escrow: Escrow = h.get(h.escrow_id().as_str());
        assert_eq!(escrow.status, EscrowStatus::Rejected);
        assert!(escrow.released);
        let request: OfferRequest = h.get(REQUEST_ID);
        assert_eq!(request.status, RequestStatus::Rejected);
    }

    #[test]
    fn only_offer_owner_may_reject() {
        let h = Harness::with_request();
        let err = h
            .run("Org2MSP", "2024-03-01 07:45", |ctx| {
                h.engine.reject_offer_request(ctx, "o-1", REQUEST_ID)
            })
            .unwrap_err();
        assert!(matches!(err, DataMarketError::Unauthorized { .. }));
    }

    #[test]
    fn cannot_reject_twice_or_after_acceptance() {
        let h = Harness::with_request();
        h.run("Org1MSP", "2024-03-01 07:45", |ctx| {
            h.engine.reject_offer_request(ctx, "o-1", REQUEST_ID)
        })
        .unwrap();
        let err = h
            .run("Org1MSP", "2024-03-01 07:46", |ctx| {
                h.engine.reject_offer_request(ctx, "o-1", REQUEST_ID)
            })
            .unwrap_err();
        assert!(matches!(err, DataMarketError::InvalidTransition { .. }));

        let h = Harness::with_agreement();
        let err = h
            .run("Org1MSP", "2024-03-01 07:50", |ctx| {
                h.engine.reject_offer_request(ctx, "o-1", REQUEST_ID)
            })
            .unwrap_err();
        assert!(matches!(err, DataMarketError::InvalidTransition { .. }));
    }
}
