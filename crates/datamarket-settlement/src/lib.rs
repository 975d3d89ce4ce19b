//! # datamarket-settlement
//!
//! **Finality plane**: every way an escrow's funds leave it.
//!
//! ## Architecture
//!
//! Each path runs inside the caller's [`TxContext`](datamarket_ledger::TxContext) and:
//! 1. Checks idempotency ([`settle_once`]): no second `Costs` record per escrow
//! 2. Authorizes the party the path belongs to
//! 3. Computes the split, prorating the price by elapsed time where needed
//! 4. Moves escrow and agreement to their terminal state
//! 5. Writes the `Costs` record and audits it ([`FundsAudit`])
//!
//! ## Paths
//!
//! - **Rejection**: provider declines a pending request
//! - **Revocation**: either party ends an agreement early
//! - **Release**: scheduled payout, in full at the end date or interim before it
//! - **Falsify claim**: consumer disputes the delivered data ([`FalsifyPolicy`])
//! - **Latency claim**: consumer disputes the delivery cadence ([`LatencyVerdict`])

pub mod conservation;
pub mod engine;
pub mod falsify;
pub mod idempotency;
pub mod latency;
pub mod proration;
pub mod rejection;
pub mod release;
pub mod revocation;

pub use conservation::FundsAudit;
pub use engine::{Settlement, SettlementEngine};
pub use falsify::{FalsifyClaim, FalsifyPolicy};
pub use idempotency::{SettlementKey, existing_settlement, settle_once};
pub use latency::LatencyVerdict;
pub use proration::Proration;

#[cfg(test)]
pub(crate) mod fixture {
    use datamarket_ingress::{
        DeliveryProof, accept_offer_request, append_delivery_hash, create_offer_request,
        insert_offer,
    };
    use datamarket_ledger::{
        MemoryLedger, StaticIdentity, Transaction, TxContext, TxHeader, WorldState,
    };
    use datamarket_types::{
        AgreementId, EngineConfig, EscrowId, HashId, LedgerTime, OfferId, OrgId, Record,
        RequestId, Result,
    };

    use crate::SettlementEngine;

    pub const REQUEST_ID: &str = "REQ-0001-consumer";

    const OFFER: &str = r#"{
        "id": "o-1", "creator": "alice", "price": "300", "deposit": "50",
        "depart_time": "2024-03-01 08:00", "arrival_time": "2024-03-01 18:00"
    }"#;

    /// Ledger plus engine. alice publishes `o-1` from Org1MSP; bob requests
    /// it from Org2MSP for 08:00 to 18:00 at 300 with a 50 deposit.
    pub struct Harness {
        pub ledger: MemoryLedger,
        pub engine: SettlementEngine,
    }

    impl Harness {
        /// Offer and a CREATED request.
        pub fn with_request() -> Self {
            Self::build(EngineConfig::default())
        }

        /// Offer and an accepted request with an active agreement.
        pub fn with_agreement() -> Self {
            Self::with_config(EngineConfig::default())
        }

        pub fn with_config(config: EngineConfig) -> Self {
            let h = Self::build(config);
            h.accept();
            h
        }

        fn build(config: EngineConfig) -> Self {
            let h = Self {
                ledger: MemoryLedger::new(),
                engine: SettlementEngine::new(config),
            };
            h.run("Org1MSP", "2024-03-01 07:00", |ctx| insert_offer(ctx, OFFER))
                .unwrap();
            let payload = serde_json::json!({
                "offer_request_id": REQUEST_ID,
                "offer_id": "o-1",
                "dataConsumer": "bob",
                "price": "300",
                "cDeposit": "50",
                "startDate": "2024-03-01 08:00",
                "endDate": "2024-03-01 18:00",
            })
            .to_string();
            h.run("Org2MSP", "2024-03-01 07:30", |ctx| {
                create_offer_request(ctx, h.engine.config(), &payload)
            })
            .unwrap();
            h
        }

        pub fn accept(&self) {
            self.run("Org1MSP", "2024-03-01 07:45", |ctx| {
                accept_offer_request(ctx, self.engine.config(), "o-1", REQUEST_ID)
            })
            .unwrap();
        }

        /// alice logs delivery proof `hash_id` (hash `sha256:<hash_id>`) at `at`.
        pub fn log(&self, hash_id: &str, at: &str) {
            let proof = DeliveryProof {
                offer_id: OfferId::from("o-1"),
                hash_id: HashId::from(hash_id),
                hash: format!("sha256:{hash_id}"),
                filename: format!("{hash_id}.csv"),
                entry_date: at.to_string(),
                log_id: None,
            };
            self.run("Org1MSP", at, |ctx| {
                append_delivery_hash(ctx, self.engine.config(), proof)
            })
            .unwrap();
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
                &self.engine.config().org_check,
            );
            let out = f(&mut ctx)?;
            ctx.into_transaction().commit()?;
            Ok(out)
        }

        pub fn get<T: Record>(&self, key: &str) -> T {
            self.run("Org1MSP", "2024-03-01 23:59", |ctx| ctx.tx.require(key))
                .unwrap()
        }

        pub fn height(&self) -> u64 {
            self.ledger.height().unwrap()
        }

        pub fn escrow_id(&self) -> EscrowId {
            self.engine
                .config()
                .id_scheme
                .escrow_id(&RequestId::from(REQUEST_ID))
                .unwrap()
        }

        pub fn agreement_id(&self) -> AgreementId {
            self.engine
                .config()
                .id_scheme
                .agreement_id(&RequestId::from(REQUEST_ID))
                .unwrap()
        }
    }
}
