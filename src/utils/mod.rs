//! Utility modules for the Stablecash protocol.
//!
//! This module contains shared utilities used across the protocol:
//! - Account addresses and hashes
//! - Fixed-point and curve arithmetic
//! - Constants

pub mod address;
pub mod constants;
pub mod math;

pub use address::*;
pub use constants::*;
pub use math::*;
