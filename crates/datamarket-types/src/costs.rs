//! Terminal settlement records.
//!
//! A [`Costs`] document is written exactly once per escrow, when the escrow's
//! funds are split between provider and consumer. Its existence is what stops
//! a second settlement.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{AgreementId, CostId, DocType, Escrow, EscrowId, LedgerTime, Record, RequestId};

/// Which settlement path produced a [`Costs`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementKind {
    /// Provider declined the request.
    Rejected,
    /// One party ended the agreement early.
    Revoked,
    /// Agreement ran to its end date.
    FullTerm,
    /// Release before the end date; deposits stay held.
    InterimRelease,
    /// Consumer disputed delivered data.
    FalsifyClaim,
    /// Consumer disputed delivery cadence.
    LatencyClaim,
}

impl std::fmt::Display for SettlementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected => write!(f, "REJECTED"),
            Self::Revoked => write!(f, "REVOKED"),
            Self::FullTerm => write!(f, "FULL_TERM"),
            Self::InterimRelease => write!(f, "INTERIM_RELEASE"),
            Self::FalsifyClaim => write!(f, "FALSIFY_CLAIM"),
            Self::LatencyClaim => write!(f, "LATENCY_CLAIM"),
        }
    }
}

/// How an escrow's funds were split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Costs {
    #[serde(rename = "docType")]
    pub doc_type: DocType,
    pub id: CostId,
    pub kind: SettlementKind,
    #[serde(rename = "agreement", default, skip_serializing_if = "Option::is_none")]
    pub agreement_id: Option<AgreementId>,
    pub escrow_id: EscrowId,
    #[serde(rename = "offer_request_id")]
    pub request_id: RequestId,
    #[serde(rename = "dataProvider")]
    pub provider: String,
    #[serde(rename = "dataConsumer")]
    pub consumer: String,
    #[serde(rename = "providerReimbursement")]
    pub provider_reimbursement: Decimal,
    #[serde(rename = "consumerRefund")]
    pub consumer_refund: Decimal,
    #[serde(rename = "falsifyCount", default, skip_serializing_if = "Option::is_none")]
    pub falsify_count: Option<u32>,
    #[serde(rename = "latencyCount", default, skip_serializing_if = "Option::is_none")]
    pub latency_count: Option<u32>,
    #[serde(rename = "createdAt")]
    pub created_at: LedgerTime,
}

impl Record for Costs {
    const DOC_TYPE: DocType = DocType::Costs;

    fn key(&self) -> &str {
        self.id.as_str()
    }

    fn doc_type(&self) -> DocType {
        self.doc_type
    }
}

impl Costs {
    /// A settlement of `escrow` with the parties taken from it.
    #[must_use]
    pub fn for_escrow(
        id: CostId,
        kind: SettlementKind,
        escrow: &Escrow,
        provider_reimbursement: Decimal,
        consumer_refund: Decimal,
        created_at: LedgerTime,
    ) -> Self {
        Self {
            doc_type: DocType::Costs,
            id,
            kind,
            agreement_id: escrow.agreement_id.clone(),
            escrow_id: escrow.id.clone(),
            request_id: escrow.request_id.clone(),
            provider: escrow.provider.clone(),
            consumer: escrow.consumer.clone(),
            provider_reimbursement,
            consumer_refund,
            falsify_count: None,
            latency_count: None,
            created_at,
        }
    }

    /// Total paid out to both parties.
    #[must_use]
    pub fn disbursed(&self) -> Decimal {
        self.provider_reimbursement + self.consumer_refund
    }

    /// Hex SHA-256 over a canonical encoding of the settlement.
    ///
    /// Format: `"datamarket:costs:v1:" || id || 0x00 || escrow_id || 0x00 ||
    /// agreement_id || 0x00 || kind || 0x00 || provider_reimbursement || 0x00 ||
    /// consumer_refund || 0x00 || falsify_count || 0x00 || latency_count || 0x00 || created_at`
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"datamarket:costs:v1:");
        let count = |c: Option<u32>| c.map(|n| n.to_string()).unwrap_or_default();
        let fields = [
            self.id.to_string(),
            self.escrow_id.to_string(),
            self.agreement_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            self.kind.to_string(),
            self.provider_reimbursement.normalize().to_string(),
            self.consumer_refund.normalize().to_string(),
            count(self.falsify_count),
            count(self.latency_count),
            self.created_at.to_string(),
        ];
        for field in &fields {
            hasher.update(field.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EscrowStatus, OfferId};

    fn escrow() -> Escrow {
        Escrow {
            doc_type: DocType::Escrow,
            id: EscrowId::from("e-1"),
            consumer: "bob".into(),
            provider: "alice".into(),
            provider_deposit: Decimal::new(50, 0),
            consumer_deposit: Decimal::new(50, 0),
            consumer_payment: Decimal::new(300, 0),
            released: true,
            status: EscrowStatus::Revoked,
            start_date: "2024-03-01 08:00".into(),
            end_date: "2024-03-01 18:00".into(),
            request_id: RequestId::from("r-1"),
            offer_id: OfferId::from("o-1"),
            agreement_id: Some(AgreementId::from("a-1")),
        }
    }

    fn costs() -> Costs {
        Costs::for_escrow(
            CostId::from("c-1"),
            SettlementKind::Revoked,
            &escrow(),
            Decimal::new(170, 0),
            Decimal::new(230, 0),
            LedgerTime::parse("2024-03-01 12:00").unwrap(),
        )
    }

    #[test]
    fn parties_come_from_escrow() {
        let c = costs();
        assert_eq!(c.provider, "alice");
        assert_eq!(c.consumer, "bob");
        assert_eq!(c.agreement_id, Some(AgreementId::from("a-1")));
        assert_eq!(c.disbursed(), Decimal::new(400, 0));
    }

    #[test]
    fn digest_is_stable_and_scale_insensitive() {
        let a = costs();
        let mut b = costs();
        b.provider_reimbursement = Decimal::new(17000, 2);
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn digest_changes_with_amounts() {
        let a = costs();
        let mut b = costs();
        b.consumer_refund = Decimal::new(23001, 2);
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn wire_names() {
        let mut c = costs();
        c.latency_count = Some(1);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["docType"], "cost");
        assert_eq!(json["agreement"], "a-1");
        assert_eq!(json["providerReimbursement"], "170");
        assert_eq!(json["latencyCount"], 1);
        assert!(json.get("falsifyCount").is_none());
        assert_eq!(json["createdAt"], "2024-03-01 12:00");
        assert_eq!(json["kind"], "REVOKED");
    }
}
