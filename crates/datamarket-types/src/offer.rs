//! Data offers: a provider's listing of a data feed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{DocType, OfferId, OrgId, Record};

/// A provider's listing.
///
/// Created by the provider; price/terms and the active flag are mutated only
/// by the creator's organization. Offers are never deleted, only
/// deactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataOffer {
    #[serde(rename = "docType")]
    pub doc_type: DocType,
    pub id: OfferId,
    /// User that published the offer; becomes the provider on requests.
    pub creator: String,
    /// Organization of the creator, stamped by the ledger on insert.
    #[serde(default)]
    pub owner_org: OrgId,
    #[serde(default)]
    pub data_owner: String,
    #[serde(default)]
    pub equipment: String,
    #[serde(rename = "monitered_asset", default)]
    pub monitored_asset: String,
    #[serde(default)]
    pub processing_level: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub journey_uid: String,
    pub price: Decimal,
    pub deposit: Decimal,
    #[serde(default)]
    pub depart_time: String,
    #[serde(default)]
    pub arrival_time: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Record for DataOffer {
    const DOC_TYPE: DocType = DocType::DataOffer;

    fn key(&self) -> &str {
        self.id.as_str()
    }

    fn doc_type(&self) -> DocType {
        self.doc_type
    }
}

impl DataOffer {
    /// Copy the provider-editable terms of `update` onto this offer,
    /// keeping identity, creator and owner organization.
    pub fn apply_update(&mut self, update: DataOffer) {
        self.data_owner = update.data_owner;
        self.equipment = update.equipment;
        self.monitored_asset = update.monitored_asset;
        self.processing_level = update.processing_level;
        self.operator = update.operator;
        self.journey_uid = update.journey_uid;
        self.price = update.price;
        self.deposit = update.deposit;
        self.depart_time = update.depart_time;
        self.arrival_time = update.arrival_time;
        self.is_active = update.is_active;
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl DataOffer {
    pub fn dummy(id: &str, creator: &str, owner_org: &str, price: Decimal, deposit: Decimal) -> Self {
        Self {
            doc_type: DocType::DataOffer,
            id: OfferId::from(id),
            creator: creator.to_string(),
            owner_org: OrgId::from(owner_org),
            data_owner: creator.to_string(),
            equipment: "gps-tracker".to_string(),
            monitored_asset: "train-42".to_string(),
            processing_level: "raw".to_string(),
            operator: "rail-co".to_string(),
            journey_uid: "J-1".to_string(),
            price,
            deposit,
            depart_time: "2024-03-01 08:00".to_string(),
            arrival_time: "2024-03-01 18:00".to_string(),
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_names() {
        let offer = DataOffer::dummy("o-1", "alice", "Org1MSP", Decimal::new(300, 0), Decimal::new(50, 0));
        let json = serde_json::to_value(&offer).unwrap();
        assert_eq!(json["docType"], "dataoffer");
        assert_eq!(json["monitered_asset"], "train-42");
        assert_eq!(json["owner_org"], "Org1MSP");
        assert_eq!(json["price"], "300");
    }

    #[test]
    fn missing_optional_fields_default() {
        let offer: DataOffer = serde_json::from_str(
            r#"{"docType":"dataoffer","id":"o-2","creator":"bob","price":"10.50","deposit":"2"}"#,
        )
        .unwrap();
        assert!(offer.is_active);
        assert!(offer.owner_org.is_empty());
        assert_eq!(offer.price, Decimal::new(1050, 2));
    }

    #[test]
    fn apply_update_keeps_identity() {
        let mut offer = DataOffer::dummy("o-1", "alice", "Org1MSP", Decimal::new(300, 0), Decimal::new(50, 0));
        let mut update = DataOffer::dummy("o-1", "mallory", "Org9MSP", Decimal::new(400, 0), Decimal::new(60, 0));
        update.is_active = false;
        offer.apply_update(update);
        assert_eq!(offer.creator, "alice");
        assert_eq!(offer.owner_org, OrgId::from("Org1MSP"));
        assert_eq!(offer.price, Decimal::new(400, 0));
        assert!(!offer.is_active);
    }
}
