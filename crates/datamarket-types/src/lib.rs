//! # datamarket-types
//!
//! Shared types, errors, and configuration for the **DataMarket** settlement core.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`OfferId`], [`RequestId`], [`EscrowId`], [`AgreementId`], [`CostId`], [`HashId`], [`HashLogId`], [`OrgId`], and [`IdScheme`] for derived ids
//! - **Records**: [`DataOffer`], [`OfferRequest`], [`Escrow`], [`DataAgreement`], [`OfferDataHash`], [`Costs`], all implementing [`Record`]
//! - **Primitives**: [`LedgerTime`] (minute-resolution UTC) and the 2-place money helpers in [`money`]
//! - **Receipts**: [`Receipt`]
//! - **Configuration**: [`EngineConfig`], [`DateHandling`], [`OrgCheck`]
//! - **Errors**: [`DataMarketError`] with `DM_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod agreement;
pub mod config;
pub mod constants;
pub mod costs;
pub mod data_hash;
pub mod error;
pub mod escrow;
pub mod ids;
pub mod ledger_time;
pub mod money;
pub mod offer;
pub mod receipt;
pub mod record;
pub mod request;

pub use agreement::*;
pub use config::*;
pub use costs::*;
pub use data_hash::*;
pub use error::*;
pub use escrow::*;
pub use ids::*;
pub use ledger_time::*;
pub use offer::*;
pub use receipt::*;
pub use record::*;
pub use request::*;

// `money` and `constants` are accessed by path
// (e.g. `datamarket_types::money::round2`).
