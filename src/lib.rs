//! # Stablecash Protocol
//!
//! A dual-share elastic value unit. Two base share classes, mShare and
//! bShare, are bound by the curve invariant `sqrt(M² + B²)`. Holders trade
//! one class for the other along that curve, and each share class is also
//! held as a scaled token whose balance grows with a continuously
//! compounding scale factor. New invariant is sold for native currency in
//! back-to-back auctions whose issuance halves on a fixed schedule.
//!
//! ## Architecture
//!
//! - **Core**: Amounts, share classes, the share ledger and configuration
//! - **Protocol**: The simulated deployment: orchestrator, scaled token
//!   view, auction house, exchange facade, events and the seeded simulator
//! - **Utils**: Fixed-point math, addresses and constants
//! - **CLI**: Operator tooling over a protocol snapshot on disk
//!
//! ## Example
//!
//! ```rust,ignore
//! use stablecash::prelude::*;
//!
//! let mut state = ProtocolState::genesis(&ProtocolConfig::default())?;
//! state.fund(alice, NativeAmount::from_units(10))?;
//! state.bid(alice, NativeAmount::from_units(1))?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod cli;
pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        amount::{NativeAmount, ShareAmount, TokenAmount},
        config::{GenesisConfig, ProtocolConfig, ProtocolParams},
        ledger::{MintCapability, ShareLedger},
        share::{Asset, ShareClass},
    };
    pub use crate::error::{Error, Result};
    pub use crate::protocol::{
        auction::{Auction, Prize, Settlement},
        exchange::TokenExchange,
        orchestrator::ShareExchange,
        state::{ProtocolState, ProtocolStatus},
    };
    pub use crate::utils::{
        address::{Address, Hash},
        constants::ONE,
    };
}

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name
pub const PROTOCOL_NAME: &str = "Stablecash";
