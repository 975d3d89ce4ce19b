//! Typed structured-filter queries over ledger documents.
//!
//! A [`Query`] is a document type plus field equality predicates. Stores
//! that speak CouchDB selectors compile it with [`Query::to_selector`];
//! in-memory stores evaluate it with [`Query::matches`].

use std::fmt;

use datamarket_types::DocType;
use serde_json::{Map, Value, json};

/// Queryable document fields, by their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    OfferId,
    OfferRequestId,
    EscrowId,
    /// The agreement link on a `Costs` record.
    Agreement,
    Creator,
    DataProvider,
    DataConsumer,
    /// Active flag of an agreement.
    State,
    Status,
}

impl Field {
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::OfferId => "offer_id",
            Self::OfferRequestId => "offer_request_id",
            Self::EscrowId => "escrow_id",
            Self::Agreement => "agreement",
            Self::Creator => "creator",
            Self::DataProvider => "dataProvider",
            Self::DataConsumer => "dataConsumer",
            Self::State => "state",
            Self::Status => "status",
        }
    }
}

/// `docType == doc_type AND field_1 == value_1 AND ...`
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    doc_type: DocType,
    predicates: Vec<(Field, Value)>,
}

impl Query {
    #[must_use]
    pub fn new(doc_type: DocType) -> Self {
        Self {
            doc_type,
            predicates: Vec::new(),
        }
    }

    /// Add an equality predicate. A later predicate on the same field
    /// replaces the earlier one.
    #[must_use]
    pub fn where_eq(mut self, field: Field, value: impl Into<Value>) -> Self {
        let value = value.into();
        if let Some(slot) = self.predicates.iter_mut().find(|(f, _)| *f == field) {
            slot.1 = value;
        } else {
            self.predicates.push((field, value));
        }
        self
    }

    #[must_use]
    pub fn doc_type(&self) -> DocType {
        self.doc_type
    }

    /// Whether `doc` satisfies every predicate.
    #[must_use]
    pub fn matches(&self, doc: &Value) -> bool {
        doc.get("docType").and_then(Value::as_str) == Some(self.doc_type.as_str())
            && self
                .predicates
                .iter()
                .all(|(field, value)| doc.get(field.wire_name()) == Some(value))
    }

    /// CouchDB-style selector document.
    #[must_use]
    pub fn to_selector(&self) -> Value {
        let mut selector = Map::new();
        selector.insert("docType".into(), Value::from(self.doc_type.as_str()));
        for (field, value) in &self.predicates {
            selector.insert(field.wire_name().into(), value.clone());
        }
        json!({ "selector": selector })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_selector())
    }
}
