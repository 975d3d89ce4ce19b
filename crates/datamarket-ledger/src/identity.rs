//! Organization identity of the caller and of the hosting peer.

use datamarket_types::{OrgId, Result};

/// Supplies membership-service organization ids.
pub trait IdentityProvider: Send + Sync {
    /// Organization of the client that submitted the invocation.
    fn caller_org(&self) -> Result<OrgId>;

    /// Organization of the peer executing the invocation.
    fn host_org(&self) -> Result<OrgId>;
}

/// Fixed caller/host pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity {
    caller: OrgId,
    host: OrgId,
}

impl StaticIdentity {
    #[must_use]
    pub fn new(caller: impl Into<OrgId>, host: impl Into<OrgId>) -> Self {
        Self {
            caller: caller.into(),
            host: host.into(),
        }
    }

    /// A caller submitting through a peer of its own organization.
    #[must_use]
    pub fn local(org: impl Into<OrgId>) -> Self {
        let org = org.into();
        Self {
            caller: org.clone(),
            host: org,
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn caller_org(&self) -> Result<OrgId> {
        Ok(self.caller.clone())
    }

    fn host_org(&self) -> Result<OrgId> {
        Ok(self.host.clone())
    }
}
