//! Protocol module - the simulated deployment and its entry points.
//!
//! `ProtocolState` hosts the share ledgers, the orchestrator, the auction
//! house and the native currency ledger. Each submodule adds its entry
//! points to it; every mutating entry point is all-or-nothing.

pub mod auction;
pub mod events;
pub mod exchange;
pub mod native;
pub mod orchestrator;
pub mod scaled;
pub mod simulation;
pub mod state;

pub use auction::{invariant_issuance, Auction, AuctionStatus, Prize, Settlement};
pub use events::*;
pub use exchange::TokenExchange;
pub use native::NativeLedger;
pub use orchestrator::{compound, interest_rate, Orchestrator, ShareExchange};
pub use scaled::ScaledView;
pub use simulation::{Simulation, SimulationConfig, SimulationReport};
pub use state::{ProtocolState, ProtocolStatus};
