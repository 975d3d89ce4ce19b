//! Data agreements: the running contract between provider and consumer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AgreementId, DataMarketError, DocType, EscrowId, HashId, OfferId, OfferRequest, Record,
    RequestId, Result,
};

/// An accepted request. `state` is the active flag: it starts `true` and
/// flips to `false` exactly once, when the agreement is settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAgreement {
    #[serde(rename = "docType")]
    pub doc_type: DocType,
    pub id: AgreementId,
    #[serde(rename = "dataProvider")]
    pub provider: String,
    #[serde(rename = "dataConsumer")]
    pub consumer: String,
    pub escrow_id: EscrowId,
    #[serde(rename = "offer_request_id")]
    pub request_id: RequestId,
    pub offer_id: OfferId,
    pub start_date: String,
    pub end_date: String,
    /// Offer price at acceptance time.
    pub price: Decimal,
    #[serde(rename = "providerDeposit")]
    pub provider_deposit: Decimal,
    #[serde(rename = "consumerDeposit")]
    pub consumer_deposit: Decimal,
    pub state: bool,
    /// Delivery proofs appended to the offer's log while this agreement was active.
    #[serde(rename = "offer_data_hash_id", default)]
    pub linked_hashes: Vec<HashId>,
}

impl Record for DataAgreement {
    const DOC_TYPE: DocType = DocType::DataAgreement;

    fn key(&self) -> &str {
        self.id.as_str()
    }

    fn doc_type(&self) -> DocType {
        self.doc_type
    }
}

impl DataAgreement {
    /// A fresh, active agreement for an accepted request.
    #[must_use]
    pub fn from_request(id: AgreementId, request: &OfferRequest, offer_price: Decimal) -> Self {
        Self {
            doc_type: DocType::DataAgreement,
            id,
            provider: request.provider.clone(),
            consumer: request.consumer.clone(),
            escrow_id: request.escrow_id.clone(),
            request_id: request.id.clone(),
            offer_id: request.offer_id.clone(),
            start_date: request.start_date.clone(),
            end_date: request.end_date.clone(),
            price: offer_price,
            provider_deposit: request.provider_deposit,
            consumer_deposit: request.consumer_deposit,
            state: true,
            linked_hashes: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state
    }

    /// Flip the active flag off.
    ///
    /// # Errors
    /// Returns `InvalidTransition` if the agreement is already inactive.
    pub fn deactivate(&mut self) -> Result<()> {
        if !self.state {
            return Err(DataMarketError::InvalidTransition {
                doc_type: DocType::DataAgreement,
                key: self.id.to_string(),
                from: "INACTIVE".into(),
                to: "INACTIVE".into(),
            });
        }
        self.state = false;
        Ok(())
    }

    /// Record a delivery proof against this agreement.
    pub fn link_hash(&mut self, hash_id: HashId) {
        self.linked_hashes.push(hash_id);
    }
}
