//! # Escrow: funds held between request and settlement
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐  accept   ┌────────┐  end reached   ┌─────────┐
//!   │ CREATED ├──────────▶│ ACTIVE ├───────────────▶│ EXPIRED │
//!   └────┬────┘           └───┬────┘                └─────────┘
//!        │ reject             │ revoke / dispute
//!        ▼                    ▼
//!   ┌──────────┐          ┌─────────┐
//!   │ REJECTED │          │ REVOKED │
//!   └──────────┘          └─────────┘
//! ```
//!
//! Terminal states always carry `released = true`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AgreementId, DataMarketError, DocType, EscrowId, OfferId, OfferRequest, Record, RequestId,
    Result,
};

/// Lifecycle state of an [`Escrow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EscrowStatus {
    /// Funds are pledged; the provider has not answered yet.
    Created,
    /// An agreement is running against these funds.
    Active,
    /// Ran to its end date and paid out in full.
    Expired,
    /// Ended early by a party or a dispute.
    Revoked,
    /// The provider declined the request.
    Rejected,
}

impl EscrowStatus {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Active | Self::Rejected)
                | (Self::Active, Self::Expired | Self::Revoked)
        )
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Revoked | Self::Rejected)
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Revoked => write!(f, "REVOKED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Funds held for one request: the provider's deposit, the consumer's
/// deposit and the consumer's payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    #[serde(rename = "docType")]
    pub doc_type: DocType,
    pub id: EscrowId,
    pub consumer: String,
    pub provider: String,
    #[serde(rename = "providerDeposit")]
    pub provider_deposit: Decimal,
    #[serde(rename = "consumerDeposit")]
    pub consumer_deposit: Decimal,
    #[serde(rename = "consumerPayment")]
    pub consumer_payment: Decimal,
    pub released: bool,
    pub status: EscrowStatus,
    #[serde(rename = "startDate", default)]
    pub start_date: String,
    #[serde(rename = "endDate", default)]
    pub end_date: String,
    #[serde(rename = "offer_request_id")]
    pub request_id: RequestId,
    pub offer_id: OfferId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement_id: Option<AgreementId>,
}

impl Record for Escrow {
    const DOC_TYPE: DocType = DocType::Escrow;

    fn key(&self) -> &str {
        self.id.as_str()
    }

    fn doc_type(&self) -> DocType {
        self.doc_type
    }
}

impl Escrow {
    /// A CREATED escrow for a freshly admitted request. The consumer pays
    /// the request price; dates are filled in on acceptance.
    #[must_use]
    pub fn for_request(id: EscrowId, request: &OfferRequest) -> Self {
        Self {
            doc_type: DocType::Escrow,
            id,
            consumer: request.consumer.clone(),
            provider: request.provider.clone(),
            provider_deposit: request.provider_deposit,
            consumer_deposit: request.consumer_deposit,
            consumer_payment: request.price,
            released: false,
            status: EscrowStatus::Created,
            start_date: String::new(),
            end_date: String::new(),
            request_id: request.id.clone(),
            offer_id: request.offer_id.clone(),
            agreement_id: None,
        }
    }

    /// Everything held: both deposits plus the payment.
    #[must_use]
    pub fn total_held(&self) -> Decimal {
        self.provider_deposit + self.consumer_deposit + self.consumer_payment
    }

    /// Combined deposits of both parties.
    #[must_use]
    pub fn deposits(&self) -> Decimal {
        self.provider_deposit + self.consumer_deposit
    }

    /// Funds actually pledged. The provider's deposit only counts once the
    /// request has been accepted.
    #[must_use]
    pub fn committed(&self) -> Decimal {
        match self.status {
            EscrowStatus::Created => self.consumer_deposit + self.consumer_payment,
            _ => self.total_held(),
        }
    }

    /// CREATED → ACTIVE.
    ///
    /// # Errors
    /// Returns `InvalidTransition` from any other state.
    pub fn mark_active(&mut self, agreement_id: AgreementId) -> Result<()> {
        self.transition(EscrowStatus::Active)?;
        self.agreement_id = Some(agreement_id);
        Ok(())
    }

    /// CREATED → REJECTED, released.
    ///
    /// # Errors
    /// Returns `InvalidTransition` from any other state.
    pub fn mark_rejected(&mut self) -> Result<()> {
        self.transition(EscrowStatus::Rejected)?;
        self.released = true;
        Ok(())
    }

    /// ACTIVE → EXPIRED, released.
    ///
    /// # Errors
    /// Returns `InvalidTransition` from any other state.
    pub fn mark_expired(&mut self) -> Result<()> {
        self.transition(EscrowStatus::Expired)?;
        self.released = true;
        Ok(())
    }

    /// ACTIVE → REVOKED, released.
    ///
    /// # Errors
    /// Returns `InvalidTransition` from any other state.
    pub fn mark_revoked(&mut self) -> Result<()> {
        self.transition(EscrowStatus::Revoked)?;
        self.released = true;
        Ok(())
    }

    fn transition(&mut self, target: EscrowStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(DataMarketError::InvalidTransition {
                doc_type: DocType::Escrow,
                key: self.id.to_string(),
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        self.status = target;
        Ok(())
    }
}
