//! The contract facade.
//!
//! [`DataMarket`] owns the world state and the settlement engine. Each
//! mutating method opens one transaction, runs one admission or settlement
//! operation inside it, commits, and answers with a [`Receipt`]. A failed
//! operation commits nothing.

use chrono::{DateTime, Utc};
use datamarket_ingress::{
    AgreementHashes, DeliveryProof, accept_offer_request, agreement_hashes,
    append_delivery_hash, create_and_accept_offer_request, create_offer_request, get_offer,
    insert_offer, list_offers, update_offer,
};
use datamarket_ledger::{IdentityProvider, Transaction, TxContext, TxHeader, WorldState};
use datamarket_settlement::{FalsifyClaim, Settlement, SettlementEngine};
use datamarket_types::{
    Costs, DataAgreement, DataOffer, EngineConfig, Escrow, OfferRequest, Receipt, Result,
};
use tracing::{info, info_span, warn};

use crate::views::{self, PartyFilter};

/// Who is invoking, and when.
#[derive(Clone, Copy)]
pub struct Invocation<'i> {
    pub identity: &'i dyn IdentityProvider,
    pub timestamp: DateTime<Utc>,
}

impl<'i> Invocation<'i> {
    #[must_use]
    pub fn new(identity: &'i dyn IdentityProvider, timestamp: DateTime<Utc>) -> Self {
        Self {
            identity,
            timestamp,
        }
    }

    fn header(&self) -> Result<TxHeader> {
        Ok(TxHeader::new(self.identity.caller_org()?, self.timestamp))
    }
}

/// What an operation hands back before commit.
struct Outcome {
    message: String,
    costs: Option<Costs>,
}

impl Outcome {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            costs: None,
        }
    }
}

impl From<Settlement> for Outcome {
    fn from(s: Settlement) -> Self {
        Self {
            message: s.message,
            costs: Some(s.costs),
        }
    }
}

/// Data marketplace contract over a world state `S`.
pub struct DataMarket<S: WorldState> {
    store: S,
    engine: SettlementEngine,
}

impl<S: WorldState> DataMarket<S> {
    /// # Errors
    /// `Configuration` if `config` does not validate.
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            engine: SettlementEngine::new(config),
        })
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    fn execute(
        &self,
        inv: &Invocation<'_>,
        operation: &'static str,
        f: impl FnOnce(&SettlementEngine, &mut TxContext<'_>) -> Result<Outcome>,
    ) -> Result<Receipt> {
        let header = inv.header()?;
        let tx_id = header.tx_id.clone();
        let span = info_span!("invoke", operation, tx_id = %tx_id);
        let _entered = span.enter();

        let mut ctx = TxContext::new(
            Transaction::begin(&self.store, header),
            inv.identity,
            &self.engine.config().org_check,
        );
        let outcome = f(&self.engine, &mut ctx).inspect_err(|e| warn!(error = %e, "invocation failed"))?;
        let height = ctx
            .into_transaction()
            .commit()
            .inspect_err(|e| warn!(error = %e, "commit failed"))?;
        info!(height, message = %outcome.message, "invocation committed");

        let receipt = Receipt::new(tx_id, outcome.message, height);
        Ok(match outcome.costs {
            Some(costs) => receipt.with_costs(costs),
            None => receipt,
        })
    }

    /// Run `f` in a transaction that is never committed.
    fn read<T>(
        &self,
        inv: &Invocation<'_>,
        f: impl FnOnce(&mut TxContext<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut ctx = TxContext::new(
            Transaction::begin(&self.store, inv.header()?),
            inv.identity,
            &self.engine.config().org_check,
        );
        f(&mut ctx)
    }

    // ------------------------------------------------------------------
    // Offers
    // ------------------------------------------------------------------

    pub fn insert_offer(&self, inv: &Invocation<'_>, payload: &str) -> Result<Receipt> {
        self.execute(inv, "InsertDataOffer", |_, ctx| {
            let offer = insert_offer(ctx, payload)?;
            Ok(Outcome::message(format!("Offer ID: {}", offer.id)))
        })
    }

    pub fn update_offer(&self, inv: &Invocation<'_>, payload: &str) -> Result<Receipt> {
        self.execute(inv, "UpdateDataOffer", |_, ctx| {
            let offer = update_offer(ctx, payload)?;
            Ok(Outcome::message(format!("Offer ID: {} updated", offer.id)))
        })
    }

    pub fn get_offer(&self, inv: &Invocation<'_>, offer_id: &str) -> Result<DataOffer> {
        self.read(inv, |ctx| get_offer(ctx, offer_id))
    }

    pub fn list_offers(&self, inv: &Invocation<'_>, creator: Option<&str>) -> Result<Vec<DataOffer>> {
        self.read(inv, |ctx| list_offers(ctx, creator))
    }

    // ------------------------------------------------------------------
    // Requests and acceptance
    // ------------------------------------------------------------------

    pub fn create_offer_request(&self, inv: &Invocation<'_>, payload: &str) -> Result<Receipt> {
        self.execute(inv, "CreateOfferRequest", |engine, ctx| {
            let (request, escrow) = create_offer_request(ctx, engine.config(), payload)?;
            Ok(Outcome::message(format!(
                "Offer Request ID: {}, Escrow ID: {}",
                request.id, escrow.id
            )))
        })
    }

    /// Accept the request, or reject it and refund the consumer.
    pub fn accept_offer_request(
        &self,
        inv: &Invocation<'_>,
        offer_id: &str,
        request_id: &str,
        is_accepted: bool,
    ) -> Result<Receipt> {
        self.execute(inv, "AcceptOfferRequest", |engine, ctx| {
            if is_accepted {
                let agreement = accept_offer_request(ctx, engine.config(), offer_id, request_id)?;
                Ok(Outcome::message(format!("Agreement ID: {}", agreement.id)))
            } else {
                engine
                    .reject_offer_request(ctx, offer_id, request_id)
                    .map(Outcome::from)
            }
        })
    }

    pub fn create_and_accept_offer_request(
        &self,
        inv: &Invocation<'_>,
        payload: &str,
    ) -> Result<Receipt> {
        self.execute(inv, "CreateAndAcceptOfferRequest", |engine, ctx| {
            let (request, agreement) = create_and_accept_offer_request(ctx, engine.config(), payload)?;
            Ok(Outcome::message(format!(
                "Offer Request ID: {}, Agreement ID: {}",
                request.id, agreement.id
            )))
        })
    }

    pub fn get_offer_request(&self, inv: &Invocation<'_>, request_id: &str) -> Result<OfferRequest> {
        self.read(inv, |ctx| views::offer_request(ctx, request_id))
    }

    pub fn get_offer_requests_by_offer(
        &self,
        inv: &Invocation<'_>,
        offer_id: &str,
    ) -> Result<Vec<OfferRequest>> {
        self.read(inv, |ctx| views::offer_requests_by_offer(ctx, offer_id))
    }

    pub fn get_escrow(&self, inv: &Invocation<'_>, escrow_id: &str) -> Result<Escrow> {
        self.read(inv, |ctx| views::escrow(ctx, escrow_id))
    }

    pub fn get_agreement(&self, inv: &Invocation<'_>, agreement_id: &str) -> Result<DataAgreement> {
        self.read(inv, |ctx| views::agreement(ctx, agreement_id))
    }

    pub fn agreements_for_party(
        &self,
        inv: &Invocation<'_>,
        filter: &PartyFilter,
    ) -> Result<Vec<DataAgreement>> {
        self.read(inv, |ctx| views::agreements_for_party(ctx, filter))
    }

    // ------------------------------------------------------------------
    // Delivery proofs
    // ------------------------------------------------------------------

    pub fn append_delivery_hash(&self, inv: &Invocation<'_>, proof: DeliveryProof) -> Result<Receipt> {
        self.execute(inv, "InsertDataHash", |engine, ctx| {
            let hash_id = proof.hash_id.clone();
            let out = append_delivery_hash(ctx, engine.config(), proof)?;
            Ok(Outcome::message(format!(
                "Hash {hash_id} logged to {}, linked to {} agreement(s)",
                out.log_id,
                out.linked_agreements.len()
            )))
        })
    }

    pub fn agreement_hashes(&self, inv: &Invocation<'_>, agreement_id: &str) -> Result<AgreementHashes> {
        self.read(inv, |ctx| agreement_hashes(ctx, agreement_id))
    }

    // ------------------------------------------------------------------
    // Settlement
    // ------------------------------------------------------------------

    pub fn revoke_agreement(
        &self,
        inv: &Invocation<'_>,
        agreement_id: &str,
        is_provider: bool,
    ) -> Result<Receipt> {
        self.execute(inv, "RevokeAgreement", |engine, ctx| {
            engine
                .revoke_agreement(ctx, agreement_id, is_provider)
                .map(Outcome::from)
        })
    }

    pub fn release_escrow(&self, inv: &Invocation<'_>, escrow_id: &str, cost_id: &str) -> Result<Receipt> {
        self.execute(inv, "ReleaseEscrow", |engine, ctx| {
            engine
                .release_escrow(ctx, escrow_id, cost_id)
                .map(Outcome::from)
        })
    }

    pub fn falsify_claim(&self, inv: &Invocation<'_>, claim: &FalsifyClaim<'_>) -> Result<Receipt> {
        self.execute(inv, "FalsifyClaim", |engine, ctx| {
            engine.falsify_claim(ctx, claim).map(Outcome::from)
        })
    }

    /// A claim with too little history commits nothing and carries no costs.
    pub fn latency_claim(
        &self,
        inv: &Invocation<'_>,
        offer_id: &str,
        agreement_id: &str,
        cost_id: &str,
    ) -> Result<Receipt> {
        self.execute(inv, "LatencyClaim", |engine, ctx| {
            let verdict = engine.latency_claim(ctx, offer_id, agreement_id, cost_id)?;
            Ok(Outcome {
                message: verdict.message().to_string(),
                costs: verdict.settlement().map(|s| s.costs.clone()),
            })
        })
    }

    pub fn costs_for_party(&self, inv: &Invocation<'_>, filter: &PartyFilter) -> Result<Vec<Costs>> {
        self.read(inv, |ctx| views::costs_for_party(ctx, filter))
    }
}
