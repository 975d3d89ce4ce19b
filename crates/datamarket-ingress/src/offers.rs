//! Offer publication and maintenance.
//!
//! Offers are keyed by their id. The publishing organization is stamped
//! from the caller identity and is the only organization allowed to change
//! the offer afterwards.

use datamarket_ledger::{Field, Query, TxContext};
use datamarket_types::{DataMarketError, DataOffer, DocType, Result};
use serde_json::Value;
use tracing::info;

/// Decode a client-supplied offer document. The `docType` is forced;
/// `owner_org` is overwritten by the caller's organization later.
fn parse_offer(payload: &str) -> Result<DataOffer> {
    let mut doc: Value = serde_json::from_str(payload)
        .map_err(|e| DataMarketError::malformed(format!("offer payload: {e}")))?;
    let Some(obj) = doc.as_object_mut() else {
        return Err(DataMarketError::malformed("offer payload is not an object"));
    };
    obj.insert("docType".into(), Value::from(DocType::DataOffer.as_str()));
    let offer: DataOffer = serde_json::from_value(doc)
        .map_err(|e| DataMarketError::malformed(format!("offer payload: {e}")))?;
    if offer.id.is_empty() {
        return Err(DataMarketError::malformed("offer id is empty"));
    }
    if offer.price.is_sign_negative() || offer.deposit.is_sign_negative() {
        return Err(DataMarketError::malformed(
            "offer price and deposit must not be negative",
        ));
    }
    Ok(offer)
}

/// Publish a new offer owned by the caller's organization.
///
/// # Errors
/// `MalformedInput` for an unreadable payload, `DuplicateRecord` if the id
/// is taken.
pub fn insert_offer(ctx: &mut TxContext<'_>, payload: &str) -> Result<DataOffer> {
    let caller = ctx.authorize()?;
    let mut offer = parse_offer(payload)?;
    offer.owner_org = caller;
    ctx.tx.insert_new(&offer)?;
    info!(
        tx_id = %ctx.tx_id(),
        offer = %offer.id,
        creator = %offer.creator,
        price = %offer.price,
        deposit = %offer.deposit,
        "offer published"
    );
    Ok(offer)
}

/// Replace an offer's terms. Identity, creator and owner organization are kept.
///
/// # Errors
/// `NotFound` for an unknown offer, `Unauthorized` unless the caller belongs
/// to the offer's owner organization.
pub fn update_offer(ctx: &mut TxContext<'_>, payload: &str) -> Result<DataOffer> {
    ctx.authorize()?;
    let update = parse_offer(payload)?;
    let mut offer: DataOffer = ctx.tx.require(update.id.as_str())?;
    ctx.require_org(&offer.owner_org)?;
    offer.apply_update(update);
    ctx.tx.store(&offer)?;
    info!(
        tx_id = %ctx.tx_id(),
        offer = %offer.id,
        active = offer.is_active,
        "offer updated"
    );
    Ok(offer)
}

pub fn get_offer(ctx: &mut TxContext<'_>, offer_id: &str) -> Result<DataOffer> {
    ctx.tx.require(offer_id)
}

/// All offers, or only those published by `creator`.
pub fn list_offers(ctx: &mut TxContext<'_>, creator: Option<&str>) -> Result<Vec<DataOffer>> {
    let mut query = Query::new(DocType::DataOffer);
    if let Some(creator) = creator.filter(|c| !c.is_empty()) {
        query = query.where_eq(Field::Creator, creator);
    }
    ctx.tx.select(&query)
}
