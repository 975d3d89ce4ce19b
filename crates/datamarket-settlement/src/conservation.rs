//! Funds conservation check run after every settlement.
//!
//! ```text
//! held == disbursed + retained
//! ```
//!
//! `held` is what the escrow had pledged before settling, `disbursed` what the
//! [`Costs`] record pays out and `retained` what stays in the escrow (only
//! deposits after an interim release). Rounded proration and the compounding
//! latency totals can legitimately break the equation, so an imbalance is
//! reported, not refused.

use datamarket_types::{Costs, DataMarketError, Escrow, Result, SettlementKind};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Held / disbursed / retained totals for one settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsAudit {
    pub held: Decimal,
    pub disbursed: Decimal,
    pub retained: Decimal,
}

impl FundsAudit {
    /// Audit `costs` against the escrow as it was before settling.
    #[must_use]
    pub fn for_settlement(before: &Escrow, costs: &Costs) -> Self {
        let retained = match costs.kind {
            SettlementKind::InterimRelease => before.deposits(),
            _ => Decimal::ZERO,
        };
        Self {
            held: before.committed(),
            disbursed: costs.disbursed(),
            retained,
        }
    }

    /// `held - disbursed - retained`. Positive means funds are left unaccounted
    /// for, negative means more is paid out than was held.
    #[must_use]
    pub fn imbalance(&self) -> Decimal {
        self.held - self.disbursed - self.retained
    }

    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.imbalance().is_zero()
    }

    /// # Errors
    /// Returns [`DataMarketError::ConservationViolation`] if the totals do not add up.
    pub fn verify(&self) -> Result<()> {
        if self.is_balanced() {
            return Ok(());
        }
        Err(DataMarketError::ConservationViolation {
            held: self.held,
            disbursed: self.disbursed,
            retained: self.retained,
        })
    }

    /// Log a warning for `costs` if the audit does not balance.
    pub fn report(&self, costs: &Costs) {
        if let Err(err) = self.verify() {
            warn!(
                costs = %costs.id,
                escrow = %costs.escrow_id,
                kind = %costs.kind,
                imbalance = %self.imbalance(),
                error = %err,
                "settlement does not conserve escrow funds"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use datamarket_types::{
        AgreementId, CostId, DocType, EscrowId, EscrowStatus, LedgerTime, OfferId, RequestId,
    };

    use super::*;

    fn escrow(status: EscrowStatus) -> Escrow {
        Escrow {
            doc_type: DocType::Escrow,
            id: EscrowId::from("e-1"),
            consumer: "bob".into(),
            provider: "alice".into(),
            provider_deposit: Decimal::new(50, 0),
            consumer_deposit: Decimal::new(50, 0),
            consumer_payment: Decimal::new(300, 0),
            released: false,
            status,
            start_date: "2024-03-01 08:00".into(),
            end_date: "2024-03-01 18:00".into(),
            request_id: RequestId::from("r-1"),
            offer_id: OfferId::from("o-1"),
            agreement_id: Some(AgreementId::from("a-1")),
        }
    }

    fn costs(kind: SettlementKind, provider: i64, consumer: i64) -> Costs {
        Costs::for_escrow(
            CostId::from("c-1"),
            kind,
            &escrow(EscrowStatus::Active),
            Decimal::new(provider, 0),
            Decimal::new(consumer, 0),
            LedgerTime::parse("2024-03-01 12:00").unwrap(),
        )
    }

    #[test]
    fn revocation_balances() {
        let audit = FundsAudit::for_settlement(
            &escrow(EscrowStatus::Active),
            &costs(SettlementKind::Revoked, 170, 230),
        );
        assert_eq!(audit.held, Decimal::new(400, 0));
        assert!(audit.verify().is_ok());
    }

    #[test]
    fn interim_release_retains_deposits() {
        let audit = FundsAudit::for_settlement(
            &escrow(EscrowStatus::Active),
            &costs(SettlementKind::InterimRelease, 120, 180),
        );
        assert_eq!(audit.retained, Decimal::new(100, 0));
        assert!(audit.is_balanced());
    }

    #[test]
    fn rejection_counts_consumer_funds_only() {
        let audit = FundsAudit::for_settlement(
            &escrow(EscrowStatus::Created),
            &costs(SettlementKind::Rejected, 0, 350),
        );
        assert_eq!(audit.held, Decimal::new(350, 0));
        assert!(audit.is_balanced());
    }

    #[test]
    fn overpayment_is_a_violation() {
        let audit = FundsAudit::for_settlement(
            &escrow(EscrowStatus::Active),
            &costs(SettlementKind::LatencyClaim, 240, 460),
        );
        assert_eq!(audit.imbalance(), Decimal::new(-300, 0));
        let err = audit.verify().unwrap_err();
        assert!(matches!(err, DataMarketError::ConservationViolation { .. }));
        assert!(err.to_string().starts_with("DM_ERR_401"));
    }
}
