//! Identifiers used throughout DataMarket.
//!
//! Every identifier is an opaque string on the wire. The newtypes keep an
//! escrow id from being passed where an agreement id is expected; they
//! serialize transparently.
//!
//! Escrow, agreement and settlement ids are *derived* from the request id
//! so that any party can compute them without a lookup and without a
//! central counter. [`IdScheme`] selects how.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{DataMarketError, Result};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a provider's [`DataOffer`](crate::DataOffer).
    OfferId
);
string_id!(
    /// Identifier of a consumer's [`OfferRequest`](crate::OfferRequest).
    RequestId
);
string_id!(
    /// Identifier of an [`Escrow`](crate::Escrow), derived from the request id.
    EscrowId
);
string_id!(
    /// Identifier of a [`DataAgreement`](crate::DataAgreement), derived from the request id.
    AgreementId
);
string_id!(
    /// Identifier of a terminal [`Costs`](crate::Costs) record.
    CostId
);
string_id!(
    /// Identifier of one delivery proof inside an offer's hash log.
    HashId
);
string_id!(
    /// Identifier of an offer's [`OfferDataHash`](crate::OfferDataHash) log.
    HashLogId
);
string_id!(
    /// Membership-service organization id (e.g. `Org1MSP`).
    OrgId
);

// ---------------------------------------------------------------------------
// Id derivation
// ---------------------------------------------------------------------------

/// Left-rotation offset for escrow ids.
pub const ESCROW_ROTATION: usize = 5;
/// Left-rotation offset for agreement ids (and rejection cost ids).
pub const AGREEMENT_ROTATION: usize = 10;
/// Left-rotation offset applied to the escrow id for revocation cost ids.
pub const REVOCATION_COST_ROTATION: usize = 4;

/// How derived identifiers are computed from a request id.
///
/// `Rotation` reproduces the identifiers already present on deployed
/// ledgers. Rotating variable-length ids by a fixed offset is not injective
/// (`"abcde"` rotates onto itself), so callers must check derived keys for
/// collisions before writing. `Namespaced` prefixes the source id, which is
/// injective by construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdScheme {
    #[default]
    Rotation,
    Namespaced,
}

impl IdScheme {
    pub fn escrow_id(self, request_id: &RequestId) -> Result<EscrowId> {
        self.derive(request_id.as_str(), ESCROW_ROTATION, "escrow:")
            .map(EscrowId)
    }

    pub fn agreement_id(self, request_id: &RequestId) -> Result<AgreementId> {
        self.derive(request_id.as_str(), AGREEMENT_ROTATION, "agreement:")
            .map(AgreementId)
    }

    /// Cost id written when a provider rejects a request.
    pub fn rejection_cost_id(self, request_id: &RequestId) -> Result<CostId> {
        self.derive(request_id.as_str(), AGREEMENT_ROTATION, "costs:rejected:")
            .map(CostId)
    }

    /// Cost id written when either party revokes an agreement.
    pub fn revocation_cost_id(self, escrow_id: &EscrowId) -> Result<CostId> {
        self.derive(escrow_id.as_str(), REVOCATION_COST_ROTATION, "costs:revoked:")
            .map(CostId)
    }

    fn derive(self, source: &str, rotation: usize, prefix: &str) -> Result<String> {
        if source.trim().is_empty() {
            return Err(DataMarketError::malformed(
                "cannot derive an identifier from an empty id",
            ));
        }
        Ok(match self {
            Self::Rotation => rotate_left(source, rotation),
            Self::Namespaced => format!("{prefix}{source}"),
        })
    }
}

impl fmt::Display for IdScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rotation => write!(f, "ROTATION"),
            Self::Namespaced => write!(f, "NAMESPACED"),
        }
    }
}

/// Rotate `s` left by `n` characters (modulo its length).
#[must_use]
pub fn rotate_left(s: &str, n: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    let n = n % chars.len();
    chars[n..].iter().chain(&chars[..n]).collect()
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl RequestId {
    /// Random 16-character alphanumeric request id.
    pub fn random() -> Self {
        use rand::Rng;
        let id: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
