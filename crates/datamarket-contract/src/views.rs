//! Read models over the world state.
//!
//! Nothing here authorizes or writes; the facade runs these in a
//! transaction it never commits.

use std::collections::BTreeMap;

use datamarket_ledger::{Field, Query, TxContext};
use datamarket_types::{
    Costs, DataAgreement, DataMarketError, DocType, Escrow, OfferRequest, Record, Result,
};
use serde::{Deserialize, Serialize};

/// How the provider and consumer predicates of a [`PartyFilter`] combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyMatch {
    /// Records where either party matches.
    #[default]
    Any,
    /// Records where both parties match.
    All,
}

impl PartyMatch {
    /// Parse a selector operator: `$or` (or empty) and `$and`.
    pub fn from_operator(op: &str) -> Result<Self> {
        match op.trim() {
            "" | "$or" => Ok(Self::Any),
            "$and" => Ok(Self::All),
            other => Err(DataMarketError::malformed(format!(
                "unknown party operator {other:?}, expected $or or $and"
            ))),
        }
    }
}

/// Select records by provider and/or consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyFilter {
    pub provider: Option<String>,
    pub consumer: Option<String>,
    #[serde(default)]
    pub mode: PartyMatch,
}

impl PartyFilter {
    /// Build a filter, treating blank names as absent.
    #[must_use]
    pub fn new(provider: &str, consumer: &str, mode: PartyMatch) -> Self {
        let name = |s: &str| (!s.trim().is_empty()).then(|| s.to_string());
        Self {
            provider: name(provider),
            consumer: name(consumer),
            mode,
        }
    }

    fn queries(&self, doc_type: DocType) -> Result<Vec<Query>> {
        let base = Query::new(doc_type);
        Ok(match (&self.provider, &self.consumer, self.mode) {
            (None, None, _) => {
                return Err(DataMarketError::malformed(
                    "party filter needs a provider or a consumer",
                ));
            }
            (Some(p), None, _) => vec![base.where_eq(Field::DataProvider, p.as_str())],
            (None, Some(c), _) => vec![base.where_eq(Field::DataConsumer, c.as_str())],
            (Some(p), Some(c), PartyMatch::All) => vec![
                base.where_eq(Field::DataProvider, p.as_str())
                    .where_eq(Field::DataConsumer, c.as_str()),
            ],
            (Some(p), Some(c), PartyMatch::Any) => vec![
                base.clone().where_eq(Field::DataProvider, p.as_str()),
                base.where_eq(Field::DataConsumer, c.as_str()),
            ],
        })
    }
}

fn select_for_party<T: Record>(ctx: &mut TxContext<'_>, filter: &PartyFilter) -> Result<Vec<T>> {
    let mut found = BTreeMap::new();
    for query in filter.queries(T::DOC_TYPE)? {
        for record in ctx.tx.select::<T>(&query)? {
            found.insert(record.key().to_string(), record);
        }
    }
    Ok(found.into_values().collect())
}

pub fn offer_request(ctx: &mut TxContext<'_>, request_id: &str) -> Result<OfferRequest> {
    ctx.tx.require(request_id)
}

/// Every request made against `offer_id`.
pub fn offer_requests_by_offer(ctx: &mut TxContext<'_>, offer_id: &str) -> Result<Vec<OfferRequest>> {
    ctx.tx
        .select(&Query::new(DocType::OfferRequest).where_eq(Field::OfferId, offer_id))
}

pub fn escrow(ctx: &mut TxContext<'_>, escrow_id: &str) -> Result<Escrow> {
    ctx.tx.require(escrow_id)
}

pub fn agreement(ctx: &mut TxContext<'_>, agreement_id: &str) -> Result<DataAgreement> {
    ctx.tx.require(agreement_id)
}

pub fn agreements_for_party(
    ctx: &mut TxContext<'_>,
    filter: &PartyFilter,
) -> Result<Vec<DataAgreement>> {
    select_for_party(ctx, filter)
}

pub fn costs_for_party(ctx: &mut TxContext<'_>, filter: &PartyFilter) -> Result<Vec<Costs>> {
    select_for_party(ctx, filter)
}
