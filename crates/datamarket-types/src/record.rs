//! Document discriminators and the [`Record`] trait shared by every
//! persisted entity.

use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// The `docType` discriminator stored on every ledger document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocType {
    #[serde(rename = "dataoffer")]
    DataOffer,
    #[serde(rename = "offerRequest")]
    OfferRequest,
    #[serde(rename = "escrow")]
    Escrow,
    #[serde(rename = "data_agreement")]
    DataAgreement,
    #[serde(rename = "offer_data_hash")]
    OfferDataHash,
    #[serde(rename = "data_hash_value")]
    DataHashValue,
    #[serde(rename = "cost")]
    Costs,
}

impl DocType {
    /// The wire value of the discriminator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataOffer => "dataoffer",
            Self::OfferRequest => "offerRequest",
            Self::Escrow => "escrow",
            Self::DataAgreement => "data_agreement",
            Self::OfferDataHash => "offer_data_hash",
            Self::DataHashValue => "data_hash_value",
            Self::Costs => "cost",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document that lives under its own key in the world state.
pub trait Record: Serialize + DeserializeOwned {
    /// Discriminator written to the `docType` field.
    const DOC_TYPE: DocType;

    /// The world-state key this record is stored under.
    fn key(&self) -> &str;

    /// Discriminator actually carried by this instance. Differs from
    /// [`Record::DOC_TYPE`] only when a key holds a document of another kind.
    fn doc_type(&self) -> DocType;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_type_wire_values_match_serde() {
        for dt in [
            DocType::DataOffer,
            DocType::OfferRequest,
            DocType::Escrow,
            DocType::DataAgreement,
            DocType::OfferDataHash,
            DocType::DataHashValue,
            DocType::Costs,
        ] {
            let json = serde_json::to_string(&dt).unwrap();
            assert_eq!(json, format!("\"{}\"", dt.as_str()));
        }
    }
}
