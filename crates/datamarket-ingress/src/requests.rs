//! Offer requests, escrow creation and acceptance.
//!
//! ## Flow
//!
//! ```text
//! CreateOfferRequest ─▶ OfferRequest(CREATED) + Escrow(CREATED)
//! AcceptOfferRequest ─▶ OfferRequest(ACTIVE) + Escrow(ACTIVE) + DataAgreement(state=true)
//! ```
//!
//! Rejection is a settlement (it writes a `Costs` record) and lives in
//! `datamarket-settlement`; it shares [`PendingDecision`] with acceptance.

use datamarket_ledger::TxContext;
use datamarket_types::{
    DataAgreement, DataMarketError, DataOffer, DateHandling, DocType, EngineConfig, Escrow,
    LedgerTime, OfferRequest, OfferRequestPayload, RequestStatus, Result,
};
use tracing::{info, warn};

/// Check a request's `[start, end]` window.
///
/// # Errors
/// Under `Strict`, `DateParse` for an unparseable bound and `MalformedInput`
/// unless `end` is after `start`. `Lenient` only logs.
pub fn validate_window(start: &str, end: &str, handling: DateHandling) -> Result<()> {
    let parsed = LedgerTime::parse(start).and_then(|s| LedgerTime::parse(end).map(|e| (s, e)));
    let problem = match parsed {
        Ok((s, e)) if e > s => return Ok(()),
        Ok(_) => DataMarketError::malformed(format!(
            "endDate {end:?} must be after startDate {start:?}"
        )),
        Err(err) => err,
    };
    match handling {
        DateHandling::Strict => Err(problem),
        DateHandling::Lenient => {
            warn!(start, end, error = %problem, "accepting request window under lenient date handling");
            Ok(())
        }
    }
}

/// Admit a consumer's request: persist a CREATED request and its CREATED escrow.
///
/// # Errors
/// - `MalformedInput` for an unreadable payload or bad window
/// - `NotFound` if the offer does not exist, `OfferInactive` if it is deactivated
/// - `DuplicateRecord` if the request or derived escrow key is taken
pub fn create_offer_request(
    ctx: &mut TxContext<'_>,
    config: &EngineConfig,
    payload: &str,
) -> Result<(OfferRequest, Escrow)> {
    let caller = ctx.authorize()?;
    let payload = OfferRequestPayload::from_json(payload)?;
    if payload.consumer.trim().is_empty() {
        return Err(DataMarketError::malformed("dataConsumer is empty"));
    }

    let offer: DataOffer = ctx.tx.require(payload.offer_id.as_str())?;
    if !offer.is_active {
        return Err(DataMarketError::OfferInactive(offer.id.to_string()));
    }
    validate_window(&payload.start_date, &payload.end_date, config.date_handling)?;

    let escrow_id = config.id_scheme.escrow_id(&payload.request_id)?;
    if escrow_id.as_str() == payload.request_id.as_str() {
        return Err(DataMarketError::DuplicateRecord {
            key: escrow_id.to_string(),
        });
    }

    let request = OfferRequest::admit(payload, &offer, caller, escrow_id.clone());
    let escrow = Escrow::for_request(escrow_id, &request);
    ctx.tx.insert_new(&request)?;
    ctx.tx.insert_new(&escrow)?;

    info!(
        tx_id = %ctx.tx_id(),
        request = %request.id,
        escrow = %escrow.id,
        offer = %offer.id,
        held = %escrow.total_held(),
        "offer request admitted"
    );
    Ok((request, escrow))
}

/// An offer, a CREATED request against it, and the request's escrow, loaded
/// and checked for a provider decision.
#[derive(Debug, Clone)]
pub struct PendingDecision {
    pub offer: DataOffer,
    pub request: OfferRequest,
    pub escrow: Escrow,
}

impl PendingDecision {
    /// Load the triple and verify that the caller owns the offer.
    ///
    /// # Errors
    /// - `NotFound` for a missing offer, request or escrow
    /// - `MalformedInput` if the request targets another offer
    /// - `InvalidTransition` if the request was already decided
    /// - `Unauthorized` unless the caller belongs to the offer's owner org
    pub fn load(ctx: &mut TxContext<'_>, offer_id: &str, request_id: &str) -> Result<Self> {
        ctx.authorize()?;
        let offer: DataOffer = ctx.tx.require(offer_id)?;
        let request: OfferRequest = ctx.tx.require(request_id)?;
        let escrow: Escrow = ctx.tx.require(request.escrow_id.as_str())?;
        if request.offer_id != offer.id {
            return Err(DataMarketError::malformed(format!(
                "request {} targets offer {}, not {}",
                request.id, request.offer_id, offer.id
            )));
        }
        if !request.status.can_transition_to(RequestStatus::Active) {
            return Err(DataMarketError::InvalidTransition {
                doc_type: DocType::OfferRequest,
                key: request.id.to_string(),
                from: request.status.to_string(),
                to: "ACTIVE|REJECTED".into(),
            });
        }
        ctx.require_org(&offer.owner_org)?;
        Ok(Self {
            offer,
            request,
            escrow,
        })
    }
}

/// Accept a CREATED request: activate request and escrow and open the agreement.
///
/// # Errors
/// Everything [`PendingDecision::load`] returns, plus `DuplicateRecord` if
/// the derived agreement key collides.
pub fn accept_offer_request(
    ctx: &mut TxContext<'_>,
    config: &EngineConfig,
    offer_id: &str,
    request_id: &str,
) -> Result<DataAgreement> {
    let PendingDecision {
        offer,
        mut request,
        mut escrow,
    } = PendingDecision::load(ctx, offer_id, request_id)?;

    let agreement_id = config.id_scheme.agreement_id(&request.id)?;
    if agreement_id.as_str() == request.id.as_str() {
        return Err(DataMarketError::DuplicateRecord {
            key: agreement_id.to_string(),
        });
    }

    request.mark_accepted(agreement_id.clone())?;
    escrow.mark_active(agreement_id.clone())?;
    escrow.start_date.clone_from(&request.start_date);
    escrow.end_date.clone_from(&request.end_date);
    escrow.provider_deposit = offer.deposit;

    let agreement = DataAgreement::from_request(agreement_id, &request, offer.price);
    ctx.tx.insert_new(&agreement)?;
    ctx.tx.store(&request)?;
    ctx.tx.store(&escrow)?;

    info!(
        tx_id = %ctx.tx_id(),
        agreement = %agreement.id,
        escrow = %escrow.id,
        start = %agreement.start_date,
        end = %agreement.end_date,
        price = %agreement.price,
        "offer request accepted"
    );
    Ok(agreement)
}

/// Admit and accept in one transaction.
pub fn create_and_accept_offer_request(
    ctx: &mut TxContext<'_>,
    config: &EngineConfig,
    payload: &str,
) -> Result<(OfferRequest, DataAgreement)> {
    let (request, _) = create_offer_request(ctx, config, payload)?;
    let agreement = accept_offer_request(ctx, config, request.offer_id.as_str(), request.id.as_str())?;
    let request = ctx.tx.require(request.id.as_str())?;
    Ok((request, agreement))
}

#[cfg(test)]
mod tests {
    use datamarket_types::{EscrowStatus, IdScheme, ids::rotate_left};
    use rust_decimal::Decimal;

    use super::*;
    use crate::fixture::{Harness, request_payload};

    #[test]
    fn window_checks() {
        validate_window("2024-03-01 08:00", "2024-03-01 18:00", DateHandling::Strict).unwrap();
        assert!(matches!(
            validate_window("2024-03-01 18:00", "2024-03-01 08:00", DateHandling::Strict).unwrap_err(),
            DataMarketError::MalformedInput { .. }
        ));
        assert!(matches!(
            validate_window("soon", "2024-03-01 08:00", DateHandling::Strict).unwrap_err(),
            DataMarketError::DateParse { .. }
        ));
        validate_window("soon", "later", DateHandling::Lenient).unwrap();
    }

    #[test]
    fn create_persists_request_and_escrow() {
        let h = Harness::with_offer();
        let (request, escrow) = h
            .run("Org2MSP", "2024-03-01 07:30", |ctx| {
                create_offer_request(ctx, &h.config, &request_payload("REQ-0001-consumer"))
            })
            .unwrap();
        assert_eq!(request.status, RequestStatus::Created);
        assert_eq!(request.owner_org.as_str(), "Org2MSP");
        assert_eq!(request.provider, "alice");
        assert_eq!(escrow.id.as_str(), rotate_left("REQ-0001-consumer", 5));
        assert_eq!(escrow.status, EscrowStatus::Created);
        assert_eq!(escrow.consumer_payment, Decimal::new(300, 0));
        assert_eq!(escrow.total_held(), Decimal::new(400, 0));
    }

    #[test]
    fn create_against_missing_or_inactive_offer() {
        let h = Harness::new();
        let err = h
            .run("Org2MSP", "2024-03-01 07:30", |ctx| {
                create_offer_request(ctx, &h.config, &request_payload("REQ-0001-consumer"))
            })
            .unwrap_err();
        assert!(matches!(err, DataMarketError::NotFound { doc_type: DocType::DataOffer, .. }));

        let h = Harness::with_offer();
        h.deactivate_offer();
        let err = h
            .run("Org2MSP", "2024-03-01 07:30", |ctx| {
                create_offer_request(ctx, &h.config, &request_payload("REQ-0001-consumer"))
            })
            .unwrap_err();
        assert!(matches!(err, DataMarketError::OfferInactive(_)));
    }

    #[test]
    fn create_twice_is_duplicate() {
        let h = Harness::with_offer();
        h.run("Org2MSP", "2024-03-01 07:30", |ctx| {
            create_offer_request(ctx, &h.config, &request_payload("REQ-0001-consumer"))
        })
        .unwrap();
        let err = h
            .run("Org2MSP", "2024-03-01 07:31", |ctx| {
                create_offer_request(ctx, &h.config, &request_payload("REQ-0001-consumer"))
            })
            .unwrap_err();
        assert!(matches!(err, DataMarketError::DuplicateRecord { .. }));
    }

    #[test]
    fn self_rotating_request_id_is_refused() {
        let h = Harness::with_offer();
        let err = h
            .run("Org2MSP", "2024-03-01 07:30", |ctx| {
                create_offer_request(ctx, &h.config, &request_payload("abcde"))
            })
            .unwrap_err();
        assert!(matches!(err, DataMarketError::DuplicateRecord { .. }));

        let mut h = Harness::with_offer();
        h.config.id_scheme = IdScheme::Namespaced;
        let (_, escrow) = h
            .run("Org2MSP", "2024-03-01 07:30", |ctx| {
                create_offer_request(ctx, &h.config, &request_payload("abcde"))
            })
            .unwrap();
        assert_eq!(escrow.id.as_str(), "escrow:abcde");
    }

    #[test]
    fn accept_activates_everything() {
        let h = Harness::with_offer();
        h.run("Org2MSP", "2024-03-01 07:30", |ctx| {
            create_offer_request(ctx, &h.config, &request_payload("REQ-0001-consumer"))
        })
        .unwrap();
        let agreement = h
            .run("Org1MSP", "2024-03-01 07:45", |ctx| {
                accept_offer_request(ctx, &h.config, "o-1", "REQ-0001-consumer")
            })
            .unwrap();
        assert!(agreement.state);
        assert_eq!(agreement.price, Decimal::new(300, 0));
        assert_eq!(agreement.id.as_str(), rotate_left("REQ-0001-consumer", 10));

        let (request, escrow) = h
            .run("Org1MSP", "2024-03-01 07:46", |ctx| {
                let request: OfferRequest = ctx.tx.require("REQ-0001-consumer")?;
                let escrow: Escrow = ctx.tx.require(request.escrow_id.as_str())?;
                Ok((request, escrow))
            })
            .unwrap();
        assert_eq!(request.status, RequestStatus::Active);
        assert_eq!(request.agreement_id.as_ref(), Some(&agreement.id));
        assert_eq!(escrow.status, EscrowStatus::Active);
        assert_eq!(escrow.start_date, "2024-03-01 08:00");
        assert_eq!(escrow.end_date, "2024-03-01 18:00");
    }

    #[test]
    fn only_offer_owner_may_accept_and_only_once() {
        let h = Harness::with_offer();
        h.run("Org2MSP", "2024-03-01 07:30", |ctx| {
            create_offer_request(ctx, &h.config, &request_payload("REQ-0001-consumer"))
        })
        .unwrap();
        let err = h
            .run("Org2MSP", "2024-03-01 07:45", |ctx| {
                accept_offer_request(ctx, &h.config, "o-1", "REQ-0001-consumer")
            })
            .unwrap_err();
        assert!(matches!(err, DataMarketError::Unauthorized { .. }));

        h.run("Org1MSP", "2024-03-01 07:45", |ctx| {
            accept_offer_request(ctx, &h.config, "o-1", "REQ-0001-consumer")
        })
        .unwrap();
        let err = h
            .run("Org1MSP", "2024-03-01 07:46", |ctx| {
                accept_offer_request(ctx, &h.config, "o-1", "REQ-0001-consumer")
            })
            .unwrap_err();
        assert!(matches!(err, DataMarketError::InvalidTransition { .. }));
    }

    #[test]
    fn create_and_accept_in_one_transaction() {
        let h = Harness::with_offer();
        let height_before = h.height();
        let (request, agreement) = h
            .run("Org1MSP", "2024-03-01 07:30", |ctx| {
                create_and_accept_offer_request(ctx, &h.config, &request_payload("REQ-0001-consumer"))
            })
            .unwrap();
        assert_eq!(request.status, RequestStatus::Active);
        assert_eq!(request.agreement_id, Some(agreement.id));
        assert_eq!(h.height(), height_before + 1);
    }
}
