//! # datamarket-ingress
//!
//! **Admission plane**: everything that happens before money moves.
//!
//! 1. **offers**: providers publish and maintain [`DataOffer`](datamarket_types::DataOffer)s
//! 2. **requests**: consumers request an offer; an escrow is opened for the
//!    request; the provider accepts it and a data agreement starts
//! 3. **hash_log**: providers append delivery proofs, linked to every active
//!    agreement on the offer
//!
//! ## Flow
//!
//! ```text
//! InsertDataOffer → CreateOfferRequest → AcceptOfferRequest → AppendDeliveryHash*
//!                                                          ↘ (settlement crate)
//! ```
//!
//! Every function runs inside the caller's [`TxContext`](datamarket_ledger::TxContext)
//! and only stages writes; the caller commits.

pub mod hash_log;
pub mod offers;
pub mod requests;

pub use hash_log::{
    AgreementHashes, AppendOutcome, DeliveryProof, agreement_hashes, append_delivery_hash,
    find_log, require_log,
};
pub use offers::{get_offer, insert_offer, list_offers, update_offer};
pub use requests::{
    PendingDecision, accept_offer_request, create_and_accept_offer_request, create_offer_request,
    validate_window,
};

#[cfg(test)]
pub(crate) mod fixture {
    use datamarket_ledger::{
        MemoryLedger, StaticIdentity, Transaction, TxContext, TxHeader, WorldState,
    };
    use datamarket_types::{
        DataAgreement, DataOffer, EngineConfig, HashId, LedgerTime, OfferId, OrgId, Result,
    };
    use rust_decimal::Decimal;

    use crate::{DeliveryProof, accept_offer_request, create_offer_request};

    pub struct Harness {
        pub ledger: MemoryLedger,
        pub config: EngineConfig,
    }

    impl Harness {
        pub fn new() -> Self {
            Self {
                ledger: MemoryLedger::new(),
                config: EngineConfig::default(),
            }
        }

        /// Offer `o-1` by alice (Org1MSP): price 300, deposit 50.
        pub fn with_offer() -> Self {
            let h = Self::new();
            h.run("Org1MSP", "2024-03-01 07:00", |ctx| {
                let offer = DataOffer::dummy(
                    "o-1",
                    "alice",
                    "Org1MSP",
                    Decimal::new(300, 0),
                    Decimal::new(50, 0),
                );
                ctx.tx.store(&offer)
            })
            .unwrap();
            h
        }

        /// [`with_offer`](Self::with_offer) plus an accepted request from bob (Org2MSP).
        pub fn with_agreement() -> Self {
            let h = Self::with_offer();
            h.run("Org2MSP", "2024-03-01 07:30", |ctx| {
                create_offer_request(ctx, &h.config, &request_payload("REQ-0001-consumer"))
            })
            .unwrap();
            h.run("Org1MSP", "2024-03-01 07:45", |ctx| {
                accept_offer_request(ctx, &h.config, "o-1", "REQ-0001-consumer")
            })
            .unwrap();
            h
        }

        /// Run `f` as `org` at ledger time `at` and commit.
        pub fn run<T>(
            &self,
            org: &str,
            at: &str,
            f: impl FnOnce(&mut TxContext<'_>) -> Result<T>,
        ) -> Result<T> {
            let identity = StaticIdentity::local(org);
            let header = TxHeader::new(OrgId::from(org), LedgerTime::parse(at)?.to_datetime());
            let mut ctx = TxContext::new(
                Transaction::begin(&self.ledger, header),
                &identity,
                &self.config.org_check,
            );
            let out = f(&mut ctx)?;
            ctx.into_transaction().commit()?;
            Ok(out)
        }

        pub fn height(&self) -> u64 {
            self.ledger.height().unwrap()
        }

        pub fn deactivate_offer(&self) {
            self.run("Org1MSP", "2024-03-01 07:10", |ctx| {
                let mut offer: DataOffer = ctx.tx.require("o-1")?;
                offer.is_active = false;
                ctx.tx.store(&offer)
            })
            .unwrap();
        }

        pub fn deactivate_agreement(&self, id: &str) {
            self.run("Org1MSP", "2024-03-01 08:02", |ctx| {
                let mut agreement: DataAgreement = ctx.tx.require(id)?;
                agreement.deactivate()?;
                ctx.tx.store(&agreement)
            })
            .unwrap();
        }
    }

    /// bob asks for `o-1` at price 300 with a 50 deposit, 08:00 to 18:00.
    pub fn request_payload(request_id: &str) -> String {
        serde_json::json!({
            "offer_request_id": request_id,
            "offer_id": "o-1",
            "dataConsumer": "bob",
            "price": "300",
            "cDeposit": "50",
            "startDate": "2024-03-01 08:00",
            "endDate": "2024-03-01 18:00",
        })
        .to_string()
    }

    pub fn proof(hash_id: &str, entry_date: &str) -> DeliveryProof {
        DeliveryProof {
            offer_id: OfferId::from("o-1"),
            hash_id: HashId::from(hash_id),
            hash: format!("sha256:{hash_id}"),
            filename: format!("{hash_id}.csv"),
            entry_date: entry_date.to_string(),
            log_id: None,
        }
    }
}
