//! COVAULT Multisig Module
//!
//! Implements the quorum-gated shared account:
//! - Owner registry with threshold invariants
//! - Append-only transaction ledger
//! - Approval tracking and quorum-gated execution
//! - Privileged self-call path for administrative actions

pub mod transaction;
pub mod registry;
pub mod events;
pub mod selfcall;
pub mod vault;
pub mod executor;

pub use transaction::*;
pub use registry::*;
pub use events::*;
pub use selfcall::*;
pub use vault::*;
pub use executor::*;
