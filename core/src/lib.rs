//! COVAULT Core Library
//!
//! Core types, traits, and abstractions for the COVAULT quorum-gated
//! shared account ledger. This crate provides the foundation for the
//! multisig engine and any host integrations built on top of it.

pub mod types;
pub mod traits;
pub mod error;
pub mod config;

pub use types::*;
pub use traits::*;
pub use error::*;
pub use config::*;
