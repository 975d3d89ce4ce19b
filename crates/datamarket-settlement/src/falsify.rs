//! Data-falsification dispute.
//!
//! The consumer names the hashes of the data it received. Every claimed hash
//! that does not appear among the provider's logged hash values counts as
//! falsified. A single falsified hash substantiates the claim.

use std::fmt;

use datamarket_ingress::require_log;
use datamarket_ledger::TxContext;
use datamarket_types::{
    CostId, Costs, DataAgreement, DataMarketError, Escrow, OfferRequest, Result, SettlementKind,
    money::round2,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    engine::{Settlement, SettlementEngine},
    idempotency::{SettlementKey, check_cost_id, settle_once},
    proration::Proration,
};

/// How a falsification verdict splits the escrow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FalsifyPolicy {
    /// Price split by elapsed time; the losing side forfeits both deposits.
    #[default]
    Prorated,
    /// The winning side takes both deposits and the whole price.
    AllOrNothing,
}

impl fmt::Display for FalsifyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prorated => write!(f, "PRORATED"),
            Self::AllOrNothing => write!(f, "ALL_OR_NOTHING"),
        }
    }
}

/// A consumer's falsification claim against one agreement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FalsifyClaim<'c> {
    pub offer_id: &'c str,
    pub agreement_id: &'c str,
    pub claimed_hashes: &'c [String],
    pub cost_id: &'c str,
    pub policy: FalsifyPolicy,
}

/// `(provider_reimbursement, consumer_refund)` for a verdict.
fn split(
    policy: FalsifyPolicy,
    substantiated: bool,
    agreement: &DataAgreement,
    proration: &Proration,
) -> (Decimal, Decimal) {
    let deposits = agreement.provider_deposit + agreement.consumer_deposit;
    match (policy, substantiated) {
        (FalsifyPolicy::Prorated, false) => (
            round2(deposits + proration.consumed_hours * proration.price_per_hour),
            proration.remaining_share(),
        ),
        (FalsifyPolicy::Prorated, true) => (
            proration.consumed_share(),
            round2(deposits + proration.remaining_hours * proration.price_per_hour),
        ),
        (FalsifyPolicy::AllOrNothing, false) => (round2(deposits + agreement.price), Decimal::ZERO),
        (FalsifyPolicy::AllOrNothing, true) => (Decimal::ZERO, round2(deposits + agreement.price)),
    }
}

impl SettlementEngine {
    /// Settle a falsification claim. Escrow becomes REVOKED and the agreement
    /// inactive whatever the verdict.
    ///
    /// # Errors
    /// - `MalformedInput` for an empty hash list or an agreement on another offer
    /// - `NotFound` for an unknown agreement or a missing hash log
    /// - `AlreadySettled` if the escrow already has a `Costs` record
    /// - `Unauthorized` unless the caller belongs to the consumer's org
    pub fn falsify_claim(&self, ctx: &mut TxContext<'_>, claim: &FalsifyClaim<'_>) -> Result<Settlement> {
        ctx.authorize()?;
        if claim.claimed_hashes.is_empty() {
            return Err(DataMarketError::malformed("no hashes claimed"));
        }
        let mut agreement: DataAgreement = ctx.tx.require(claim.agreement_id)?;
        if agreement.offer_id.as_str() != claim.offer_id {
            return Err(DataMarketError::malformed(format!(
                "agreement {} is on offer {}, not {}",
                agreement.id, agreement.offer_id, claim.offer_id
            )));
        }

        settle_once(ctx, &SettlementKey::for_agreement(&agreement), |ctx| {
            let log = require_log(ctx, &agreement.offer_id)?;
            let request: OfferRequest = ctx.tx.require(agreement.request_id.as_str())?;
            ctx.require_org(&request.owner_org)?;
            let mut escrow: Escrow = ctx.tx.require(agreement.escrow_id.as_str())?;

            let cost_id = CostId::from(claim.cost_id);
            check_cost_id(&cost_id, &[escrow.id.as_str(), agreement.id.as_str()])?;

            let falsified = claim
                .claimed_hashes
                .iter()
                .filter(|hash| !log.contains_value(hash))
                .count();
            let substantiated = falsified > 0;

            let now = ctx.now();
            let proration = Proration::compute(
                &agreement.start_date,
                &agreement.end_date,
                request.price,
                now,
                self.config().date_handling,
            )?;
            let (provider, consumer) = split(claim.policy, substantiated, &agreement, &proration);

            let before = escrow.clone();
            escrow.mark_revoked()?;
            agreement.deactivate()?;
            ctx.tx.store(&escrow)?;
            ctx.tx.store(&agreement)?;

            let mut costs = Costs::for_escrow(
                cost_id,
                SettlementKind::FalsifyClaim,
                &escrow,
                provider,
                consumer,
                now,
            );
            costs.falsify_count = Some(u32::try_from(falsified).unwrap_or(u32::MAX));
            let message = if substantiated {
                format!("valid falsify claim: {falsified} hash(es) not logged ({})", claim.policy)
            } else {
                format!("wrong falsify claim: all hashes logged ({})", claim.policy)
            };
            self.finish(ctx, &before, costs, message)
        })
    }
}
