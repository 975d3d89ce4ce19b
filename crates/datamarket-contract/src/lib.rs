//! # datamarket-contract
//!
//! **Invocation plane**: how clients reach the admission and settlement
//! planes.
//!
//! - [`DataMarket`]: typed facade; one transaction and one [`Receipt`](datamarket_types::Receipt)
//!   per mutating call, with a tracing span carrying the tx id
//! - [`invoke`]: function-name dispatcher taking string arguments
//! - [`replay`]: runs a JSON [`Script`] of invocations, used by the
//!   `datamarket` binary
//! - [`views`]: read models, including party queries

pub mod dispatch;
pub mod market;
pub mod script;
pub mod views;

pub use dispatch::invoke;
pub use market::{DataMarket, Invocation};
pub use script::{Script, Step, StepOutcome, replay};
pub use views::{PartyFilter, PartyMatch};
