//! Delivery-hash log: append-only proof of what a provider delivered and when.
//!
//! Each offer has at most one [`OfferDataHash`] log, located by querying on
//! the offer id. Every entry appended while an agreement on the offer is
//! active is also linked to that agreement, which is what the dispute paths
//! later consult.

use datamarket_ledger::{Field, Query, TxContext};
use datamarket_types::{
    AgreementId, DataAgreement, DataHash, DataMarketError, DataOffer, DateHandling, DocType,
    EngineConfig, HashId, HashLogId, LedgerTime, OfferDataHash, OfferId, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A delivery proof as submitted by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryProof {
    pub offer_id: OfferId,
    pub hash_id: HashId,
    pub hash: String,
    pub filename: String,
    /// `YYYY-MM-DD HH:MM`.
    pub entry_date: String,
    /// Key for the log if this proof creates it. Defaults to
    /// [`OfferDataHash::default_id`].
    #[serde(default)]
    pub log_id: Option<HashLogId>,
}

/// Where a proof ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    pub log_id: HashLogId,
    pub created_log: bool,
    pub linked_agreements: Vec<AgreementId>,
}

/// The single log for `offer_id`, if one exists.
///
/// # Errors
/// Returns `Internal` when more than one log references the offer.
pub fn find_log(ctx: &mut TxContext<'_>, offer_id: &OfferId) -> Result<Option<OfferDataHash>> {
    let query = Query::new(DocType::OfferDataHash).where_eq(Field::OfferId, offer_id.as_str());
    let mut logs: Vec<OfferDataHash> = ctx.tx.select(&query)?;
    match logs.len() {
        0 => Ok(None),
        1 => Ok(logs.pop()),
        n => Err(DataMarketError::Internal(format!(
            "{n} delivery-hash logs reference offer {offer_id}"
        ))),
    }
}

/// Like [`find_log`] but absence is `NotFound`.
pub fn require_log(ctx: &mut TxContext<'_>, offer_id: &OfferId) -> Result<OfferDataHash> {
    find_log(ctx, offer_id)?
        .ok_or_else(|| DataMarketError::not_found(DocType::OfferDataHash, offer_id.as_str()))
}

/// Append a delivery proof to the offer's log and link it to every active
/// agreement on the offer.
///
/// # Errors
/// - `NotFound` for an unknown offer
/// - `Unauthorized` unless the caller belongs to the offer's owner org
/// - `MalformedInput` for an empty hash id, `DateParse` for a bad entry date (strict)
/// - `DuplicateRecord` if the hash id is already logged
/// - `Internal` if the offer has more than one log
pub fn append_delivery_hash(
    ctx: &mut TxContext<'_>,
    config: &EngineConfig,
    proof: DeliveryProof,
) -> Result<AppendOutcome> {
    ctx.authorize()?;
    let offer: DataOffer = ctx.tx.require(proof.offer_id.as_str())?;
    ctx.require_org(&offer.owner_org)?;
    if proof.hash_id.is_empty() {
        return Err(DataMarketError::malformed("hash id is empty"));
    }
    if let Err(err) = LedgerTime::parse(&proof.entry_date) {
        match config.date_handling {
            DateHandling::Strict => return Err(err),
            DateHandling::Lenient => warn!(
                hash = %proof.hash_id,
                entry_date = %proof.entry_date,
                "logging delivery proof with unparseable entry date"
            ),
        }
    }

    let (mut log, created_log) = match find_log(ctx, &offer.id)? {
        Some(log) => (log, false),
        None => {
            let id = proof
                .log_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| OfferDataHash::default_id(&offer.id));
            if ctx.tx.exists(id.as_str())? {
                return Err(DataMarketError::DuplicateRecord { key: id.to_string() });
            }
            (OfferDataHash::new(id, offer.id.clone(), offer.creator.clone()), true)
        }
    };
    log.append(DataHash::new(
        proof.hash_id.clone(),
        proof.hash,
        proof.filename,
        proof.entry_date,
    ))?;
    ctx.tx.store(&log)?;

    let active = Query::new(DocType::DataAgreement)
        .where_eq(Field::OfferId, offer.id.as_str())
        .where_eq(Field::State, true);
    let agreements: Vec<DataAgreement> = ctx.tx.select(&active)?;
    let mut linked_agreements = Vec::with_capacity(agreements.len());
    for mut agreement in agreements {
        agreement.link_hash(proof.hash_id.clone());
        ctx.tx.store(&agreement)?;
        linked_agreements.push(agreement.id);
    }

    info!(
        tx_id = %ctx.tx_id(),
        offer = %offer.id,
        log = %log.id,
        hash = %proof.hash_id,
        entries = log.entries.len(),
        linked = linked_agreements.len(),
        "delivery proof logged"
    );
    Ok(AppendOutcome {
        log_id: log.id,
        created_log,
        linked_agreements,
    })
}

/// An agreement together with the log entries linked to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementHashes {
    pub agreement: DataAgreement,
    pub hashes: Vec<DataHash>,
}

/// Read model: an agreement and its delivery proofs, in log order.
pub fn agreement_hashes(ctx: &mut TxContext<'_>, agreement_id: &str) -> Result<AgreementHashes> {
    let agreement: DataAgreement = ctx.tx.require(agreement_id)?;
    let hashes = match find_log(ctx, &agreement.offer_id)? {
        Some(log) => log
            .entries_linked_to(&agreement.linked_hashes)
            .into_iter()
            .cloned()
            .collect(),
        None => Vec::new(),
    };
    Ok(AgreementHashes { agreement, hashes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{Harness, proof};

    #[test]
    fn first_proof_creates_log() {
        let h = Harness::with_offer();
        let out = h
            .run("Org1MSP", "2024-03-01 08:00", |ctx| {
                append_delivery_hash(ctx, &h.config, proof("h-1", "2024-03-01 08:00"))
            })
            .unwrap();
        assert!(out.created_log);
        assert_eq!(out.log_id.as_str(), "offer_data_hash:o-1");
        assert!(out.linked_agreements.is_empty());

        let out = h
            .run("Org1MSP", "2024-03-01 08:05", |ctx| {
                append_delivery_hash(ctx, &h.config, proof("h-2", "2024-03-01 08:05"))
            })
            .unwrap();
        assert!(!out.created_log);
        let log = h
            .run("Org1MSP", "2024-03-01 08:06", |ctx| require_log(ctx, &OfferId::from("o-1")))
            .unwrap();
        assert_eq!(log.entries.len(), 2);
    }

    #[test]
    fn caller_supplied_log_id_is_used_on_creation() {
        let h = Harness::with_offer();
        let mut p = proof("h-1", "2024-03-01 08:00");
        p.log_id = Some(HashLogId::from("journey-log-7"));
        let out = h
            .run("Org1MSP", "2024-03-01 08:00", |ctx| append_delivery_hash(ctx, &h.config, p))
            .unwrap();
        assert_eq!(out.log_id.as_str(), "journey-log-7");
    }

    #[test]
    fn proofs_link_to_active_agreements_only() {
        let h = Harness::with_agreement();
        let out = h
            .run("Org1MSP", "2024-03-01 08:00", |ctx| {
                append_delivery_hash(ctx, &h.config, proof("h-1", "2024-03-01 08:00"))
            })
            .unwrap();
        assert_eq!(out.linked_agreements.len(), 1);

        let view = h
            .run("Org1MSP", "2024-03-01 08:01", |ctx| {
                agreement_hashes(ctx, out.linked_agreements[0].as_str())
            })
            .unwrap();
        assert_eq!(view.hashes.len(), 1);
        assert_eq!(view.agreement.linked_hashes, vec![HashId::from("h-1")]);

        h.deactivate_agreement(out.linked_agreements[0].as_str());
        let out = h
            .run("Org1MSP", "2024-03-01 08:05", |ctx| {
                append_delivery_hash(ctx, &h.config, proof("h-2", "2024-03-01 08:05"))
            })
            .unwrap();
        assert!(out.linked_agreements.is_empty());
    }

    #[test]
    fn duplicate_hash_id_rejected() {
        let h = Harness::with_offer();
        h.run("Org1MSP", "2024-03-01 08:00", |ctx| {
            append_delivery_hash(ctx, &h.config, proof("h-1", "2024-03-01 08:00"))
        })
        .unwrap();
        let err = h
            .run("Org1MSP", "2024-03-01 08:01", |ctx| {
                append_delivery_hash(ctx, &h.config, proof("h-1", "2024-03-01 08:01"))
            })
            .unwrap_err();
        assert!(matches!(err, DataMarketError::DuplicateRecord { .. }));
    }

    #[test]
    fn rejects_foreign_org_unknown_offer_and_bad_date() {
        let h = Harness::with_offer();
        let err = h
            .run("Org2MSP", "2024-03-01 08:00", |ctx| {
                append_delivery_hash(ctx, &h.config, proof("h-1", "2024-03-01 08:00"))
            })
            .unwrap_err();
        assert!(matches!(err, DataMarketError::Unauthorized { .. }));

        let mut p = proof("h-1", "2024-03-01 08:00");
        p.offer_id = OfferId::from("nope");
        let err = h
            .run("Org1MSP", "2024-03-01 08:00", |ctx| append_delivery_hash(ctx, &h.config, p))
            .unwrap_err();
        assert!(matches!(err, DataMarketError::NotFound { .. }));

        let err = h
            .run("Org1MSP", "2024-03-01 08:00", |ctx| {
                append_delivery_hash(ctx, &h.config, proof("h-1", "08:00 today"))
            })
            .unwrap_err();
        assert!(matches!(err, DataMarketError::DateParse { .. }));
    }

    #[test]
    fn two_logs_for_one_offer_is_internal() {
        let h = Harness::with_offer();
        h.run("Org1MSP", "2024-03-01 08:00", |ctx| {
            for id in ["l-1", "l-2"] {
                let log = OfferDataHash::new(HashLogId::from(id), OfferId::from("o-1"), "alice".into());
                ctx.tx.store(&log)?;
            }
            Ok(())
        })
        .unwrap();
        let err = h
            .run("Org1MSP", "2024-03-01 08:01", |ctx| {
                append_delivery_hash(ctx, &h.config, proof("h-1", "2024-03-01 08:01"))
            })
            .unwrap_err();
        assert!(matches!(err, DataMarketError::Internal(_)));
    }
}
