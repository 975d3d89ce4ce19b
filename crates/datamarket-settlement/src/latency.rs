//! Delivery-latency dispute.
//!
//! The delivery proofs linked to the agreement are walked in log order; each
//! gap between consecutive proofs longer than the configured threshold is a
//! late delivery. Both outcomes accrue per pair:
//!
//! ```text
//! late pair:    provider += consumed share           consumer += round2(deposits + remaining*pph)
//! on-time pair: provider += round2(deposits + consumed*pph)   consumer += remaining share
//! ```
//!
//! The claim settles on the late totals if any pair was late, otherwise on
//! the on-time totals. With more than two proofs the totals compound.

use datamarket_ingress::require_log;
use datamarket_ledger::TxContext;
use datamarket_types::{
    CostId, Costs, DataAgreement, DataMarketError, Escrow, OfferRequest, Result, SettlementKind,
    constants::{MIN_LATENCY_ENTRIES, NO_OLDER_RECORD_MESSAGE},
    money::round2,
};
use rust_decimal::Decimal;
use tracing::info;

use crate::{
    engine::{Settlement, SettlementEngine},
    idempotency::{SettlementKey, check_cost_id, settle_once},
    proration::{Proration, gap_hours},
};

/// Result of a latency claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatencyVerdict {
    /// The claim was decided and the escrow settled.
    Settled(Settlement),
    /// Fewer than two linked proofs; nothing was written.
    InsufficientHistory { linked: usize },
}

impl LatencyVerdict {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Settled(s) => &s.message,
            Self::InsufficientHistory { .. } => NO_OLDER_RECORD_MESSAGE,
        }
    }

    #[must_use]
    pub fn settlement(&self) -> Option<&Settlement> {
        match self {
            Self::Settled(s) => Some(s),
            Self::InsufficientHistory { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
struct Totals {
    provider: Decimal,
    consumer: Decimal,
}

impl SettlementEngine {
    /// Settle a latency claim against `agreement_id`.
    ///
    /// # Errors
    /// - `MalformedInput` if the agreement is on another offer
    /// - `NotFound` for an unknown agreement or a missing hash log
    /// - `AlreadySettled` if the escrow already has a `Costs` record
    /// - `Unauthorized` unless the caller belongs to the consumer's org
    /// - `DateParse` for unparseable proof or agreement dates under strict handling
    pub fn latency_claim(
        &self,
        ctx: &mut TxContext<'_>,
        offer_id: &str,
        agreement_id: &str,
        cost_id: &str,
    ) -> Result<LatencyVerdict> {
        ctx.authorize()?;
        let mut agreement: DataAgreement = ctx.tx.require(agreement_id)?;
        if agreement.offer_id.as_str() != offer_id {
            return Err(DataMarketError::malformed(format!(
                "agreement {} is on offer {}, not {offer_id}",
                agreement.id, agreement.offer_id
            )));
        }

        settle_once(ctx, &SettlementKey::for_agreement(&agreement), |ctx| {
            let log = require_log(ctx, &agreement.offer_id)?;
            let request: OfferRequest = ctx.tx.require(agreement.request_id.as_str())?;
            ctx.require_org(&request.owner_org)?;

            let entries = log.entries_linked_to(&agreement.linked_hashes);
            if entries.len() < MIN_LATENCY_ENTRIES {
                info!(
                    tx_id = %ctx.tx_id(),
                    agreement = %agreement.id,
                    linked = entries.len(),
                    "{NO_OLDER_RECORD_MESSAGE}"
                );
                return Ok(LatencyVerdict::InsufficientHistory {
                    linked: entries.len(),
                });
            }

            let mut escrow: Escrow = ctx.tx.require(agreement.escrow_id.as_str())?;
            let cost_id = CostId::from(cost_id);
            check_cost_id(&cost_id, &[escrow.id.as_str(), agreement.id.as_str()])?;

            let now = ctx.now();
            let handling = self.config().date_handling;
            let threshold = self.config().latency_threshold_hours;
            let p = Proration::compute(
                &agreement.start_date,
                &agreement.end_date,
                request.price,
                now,
                handling,
            )?;
            let deposits = agreement.provider_deposit + agreement.consumer_deposit;

            let mut late_count = 0u32;
            let mut late = Totals::default();
            let mut on_time = Totals::default();
            for pair in entries.windows(2) {
                let gap = gap_hours(&pair[0].entry_date, &pair[1].entry_date, handling)?;
                if gap > threshold {
                    late_count += 1;
                    late.provider += p.consumed_share();
                    late.consumer += round2(deposits + p.remaining_hours * p.price_per_hour);
                } else {
                    on_time.provider += round2(deposits + p.consumed_hours * p.price_per_hour);
                    on_time.consumer += p.remaining_share();
                }
            }
            let (totals, message) = if late_count == 0 {
                (on_time, "false latency claim: every delivery was on time".to_string())
            } else {
                (late, format!("valid latency claim: {late_count} late delivery gap(s)"))
            };

            let before = escrow.clone();
            escrow.mark_revoked()?;
            agreement.deactivate()?;
            ctx.tx.store(&escrow)?;
            ctx.tx.store(&agreement)?;

            let mut costs = Costs::for_escrow(
                cost_id,
                SettlementKind::LatencyClaim,
                &escrow,
                totals.provider,
                totals.consumer,
                now,
            );
            costs.latency_count = Some(late_count);
            self.finish(ctx, &before, costs, message)
                .map(LatencyVerdict::Settled)
        })
    }
}
