//! Offer requests: a consumer's bid for an offer's data window.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AgreementId, DataMarketError, DataOffer, DocType, EscrowId, OfferId, OrgId, Record, RequestId,
    Result,
};

/// Lifecycle of an [`OfferRequest`].
///
/// `Created → Active` on acceptance, `Created → Rejected` on rejection.
/// Both targets are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Created,
    Active,
    Rejected,
}

impl RequestStatus {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Created, Self::Active | Self::Rejected))
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// What a consumer submits to `CreateOfferRequest`.
///
/// Provider, provider deposit, status, owner org and escrow id are filled
/// in by admission; anything the caller sends for them is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRequestPayload {
    #[serde(rename = "offer_request_id")]
    pub request_id: RequestId,
    pub offer_id: OfferId,
    #[serde(rename = "dataConsumer")]
    pub consumer: String,
    pub price: Decimal,
    #[serde(rename = "cDeposit", default)]
    pub consumer_deposit: Decimal,
    #[serde(rename = "startDate", default)]
    pub start_date: String,
    #[serde(rename = "endDate", default)]
    pub end_date: String,
}

impl OfferRequestPayload {
    /// Parse a JSON payload, rejecting empty identifiers and negative amounts.
    pub fn from_json(payload: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(payload)
            .map_err(|e| DataMarketError::malformed(format!("offer request payload: {e}")))?;
        if parsed.request_id.is_empty() {
            return Err(DataMarketError::malformed("offer_request_id is empty"));
        }
        if parsed.offer_id.is_empty() {
            return Err(DataMarketError::malformed("offer_id is empty"));
        }
        if parsed.price.is_sign_negative() || parsed.consumer_deposit.is_sign_negative() {
            return Err(DataMarketError::malformed(
                "price and deposit must not be negative",
            ));
        }
        Ok(parsed)
    }
}

/// A consumer's request against a [`DataOffer`], stored under its request id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRequest {
    #[serde(rename = "docType")]
    pub doc_type: DocType,
    #[serde(rename = "offer_request_id")]
    pub id: RequestId,
    pub offer_id: OfferId,
    #[serde(rename = "dataConsumer")]
    pub consumer: String,
    #[serde(rename = "dataProvider")]
    pub provider: String,
    pub price: Decimal,
    #[serde(rename = "pDeposit")]
    pub provider_deposit: Decimal,
    #[serde(rename = "cDeposit")]
    pub consumer_deposit: Decimal,
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    pub status: RequestStatus,
    /// Consumer's organization.
    pub owner_org: OrgId,
    pub escrow_id: EscrowId,
    /// The offer as it stood when the request was made.
    #[serde(rename = "offer_details")]
    pub offer_snapshot: DataOffer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement_id: Option<AgreementId>,
}

impl Record for OfferRequest {
    const DOC_TYPE: DocType = DocType::OfferRequest;

    fn key(&self) -> &str {
        self.id.as_str()
    }

    fn doc_type(&self) -> DocType {
        self.doc_type
    }
}

impl OfferRequest {
    /// Build a CREATED request from a consumer payload and the offer it targets.
    #[must_use]
    pub fn admit(
        payload: OfferRequestPayload,
        offer: &DataOffer,
        owner_org: OrgId,
        escrow_id: EscrowId,
    ) -> Self {
        Self {
            doc_type: DocType::OfferRequest,
            id: payload.request_id,
            offer_id: payload.offer_id,
            consumer: payload.consumer,
            provider: offer.creator.clone(),
            price: payload.price,
            provider_deposit: offer.deposit,
            consumer_deposit: payload.consumer_deposit,
            start_date: payload.start_date,
            end_date: payload.end_date,
            status: RequestStatus::Created,
            owner_org,
            escrow_id,
            offer_snapshot: offer.clone(),
            agreement_id: None,
        }
    }

    /// Move to ACTIVE and link the agreement.
    ///
    /// # Errors
    /// Returns `InvalidTransition` unless the request is CREATED.
    pub fn mark_accepted(&mut self, agreement_id: AgreementId) -> Result<()> {
        self.transition(RequestStatus::Active)?;
        self.agreement_id = Some(agreement_id);
        Ok(())
    }

    /// Move to REJECTED.
    ///
    /// # Errors
    /// Returns `InvalidTransition` unless the request is CREATED.
    pub fn mark_rejected(&mut self) -> Result<()> {
        self.transition(RequestStatus::Rejected)
    }

    fn transition(&mut self, target: RequestStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(DataMarketError::InvalidTransition {
                doc_type: DocType::OfferRequest,
                key: self.id.to_string(),
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        self.status = target;
        Ok(())
    }
}
