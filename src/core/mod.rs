//! Core modules for the Stablecash protocol.
//!
//! This module contains the fundamental building blocks:
//! - Strongly-typed share, token and native amounts
//! - Share classes and exchangeable assets
//! - The share ledger and its mint capability
//! - Configuration and protocol parameters

pub mod amount;
pub mod config;
pub mod ledger;
pub mod share;

pub use amount::*;
pub use config::*;
pub use ledger::*;
pub use share::*;
