//! # datamarket-ledger
//!
//! The world-state layer under the DataMarket contract.
//!
//! - [`WorldState`]: versioned key/value store with structured queries and
//!   atomic read/write-set commits
//! - [`Query`] / [`Field`]: typed equality filters, compiled to CouchDB selectors
//! - [`Transaction`]: read-your-writes view of one invocation, all-or-nothing commit
//! - [`MemoryLedger`]: in-memory MVCC implementation used by tests and the CLI
//! - [`IdentityProvider`] / [`StaticIdentity`]: caller and host organizations
//! - [`TxContext`] / [`TxHeader`]: per-invocation context and authorization

pub mod context;
pub mod identity;
pub mod memory;
pub mod query;
pub mod store;
pub mod transaction;

pub use context::*;
pub use identity::*;
pub use memory::*;
pub use query::*;
pub use store::*;
pub use transaction::*;
