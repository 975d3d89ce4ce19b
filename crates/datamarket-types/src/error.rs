//! Error types for the DataMarket settlement core.
//!
//! All errors use the `DM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Record / input errors
//! - 2xx: Authorization errors
//! - 3xx: Lifecycle (state machine) errors
//! - 4xx: Settlement errors
//! - 5xx: Time errors
//! - 6xx: Ledger errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{DocType, OrgId};

/// Central error enum for all DataMarket operations.
#[derive(Debug, Error)]
pub enum DataMarketError {
    // =================================================================
    // Record / Input Errors (1xx)
    // =================================================================
    /// A referenced offer, request, escrow, agreement or log is absent.
    #[error("DM_ERR_100: {doc_type} not found: {key}")]
    NotFound { doc_type: DocType, key: String },

    /// A record already exists under the key an operation wants to create.
    #[error("DM_ERR_101: Record already exists: {key}")]
    DuplicateRecord { key: String },

    /// The payload failed structural parsing or a required field is missing.
    #[error("DM_ERR_102: Malformed input: {reason}")]
    MalformedInput { reason: String },

    // =================================================================
    // Authorization Errors (2xx)
    // =================================================================
    /// The caller's organization does not match the required organization.
    #[error("DM_ERR_200: Unauthorized: caller org {caller} is not {required}")]
    Unauthorized { caller: OrgId, required: OrgId },

    // =================================================================
    // Lifecycle Errors (3xx)
    // =================================================================
    /// A record is not in a state that allows the requested transition.
    #[error("DM_ERR_300: Invalid transition for {doc_type} {key}: {from} -> {to}")]
    InvalidTransition {
        doc_type: DocType,
        key: String,
        from: String,
        to: String,
    },

    /// The offer has been deactivated by its creator.
    #[error("DM_ERR_301: Offer is inactive: {0}")]
    OfferInactive(String),

    // =================================================================
    // Settlement Errors (4xx)
    // =================================================================
    /// A `Costs` record already exists for the escrow/agreement.
    #[error("DM_ERR_400: Already settled: {key}")]
    AlreadySettled { key: String },

    /// The funds disbursed by a settlement do not add up to the funds held.
    #[error("DM_ERR_401: Funds conservation violated: held {held}, disbursed {disbursed}, retained {retained}")]
    ConservationViolation {
        held: Decimal,
        disbursed: Decimal,
        retained: Decimal,
    },

    // =================================================================
    // Time Errors (5xx)
    // =================================================================
    /// A date/time string does not follow `YYYY-MM-DD HH:MM`.
    #[error("DM_ERR_500: Cannot parse date {value:?}: {reason}")]
    DateParse { value: String, reason: String },

    // =================================================================
    // Ledger Errors (6xx)
    // =================================================================
    /// Another transaction changed a key this transaction read.
    #[error("DM_ERR_600: Commit conflict on {key}")]
    CommitConflict { key: String },

    /// The transaction id was already committed.
    #[error("DM_ERR_601: Duplicate transaction id: {0}")]
    DuplicateTransaction(String),

    /// The backing store failed.
    #[error("DM_ERR_602: Storage error: {0}")]
    Storage(String),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("DM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("DM_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("DM_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl DataMarketError {
    /// Shorthand for [`DataMarketError::NotFound`].
    pub fn not_found(doc_type: DocType, key: impl Into<String>) -> Self {
        Self::NotFound {
            doc_type,
            key: key.into(),
        }
    }

    /// Shorthand for [`DataMarketError::MalformedInput`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            reason: reason.into(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, DataMarketError>;

impl From<serde_json::Error> for DataMarketError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = DataMarketError::not_found(DocType::Escrow, "abc");
        let msg = format!("{err}");
        assert!(msg.starts_with("DM_ERR_100"), "Got: {msg}");
        assert!(msg.contains("escrow"));
        assert!(msg.contains("abc"));
    }

    #[test]
    fn unauthorized_names_both_orgs() {
        let err = DataMarketError::Unauthorized {
            caller: OrgId::from("Org2MSP"),
            required: OrgId::from("Org1MSP"),
        };
        let msg = format!("{err}");
        assert!(msg.contains("DM_ERR_200"));
        assert!(msg.contains("Org2MSP"));
        assert!(msg.contains("Org1MSP"));
    }

    #[test]
    fn all_errors_have_dm_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(DataMarketError::malformed("bad json")),
            Box::new(DataMarketError::AlreadySettled { key: "e1".into() }),
            Box::new(DataMarketError::CommitConflict { key: "k".into() }),
            Box::new(DataMarketError::DateParse {
                value: "yesterday".into(),
                reason: "input contains invalid characters".into(),
            }),
            Box::new(DataMarketError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("DM_ERR_"),
                "Error missing DM_ERR_ prefix: {msg}"
            );
        }
    }

    #[test]
    fn serde_json_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: DataMarketError = parse.unwrap_err().into();
        assert!(matches!(err, DataMarketError::Serialization(_)));
    }
}
