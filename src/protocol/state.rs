//! Protocol state - the simulated host of every component.
//!
//! `ProtocolState` owns the share ledgers, the orchestrator, the current
//! auction, the native ledger, the clock and the event log. Every public
//! mutating entry point runs as a transaction: it operates on a staged copy
//! that replaces the live state only when the whole call succeeds.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::core::amount::{NativeAmount, ShareAmount, TokenAmount};
use crate::core::config::{ProtocolConfig, ProtocolParams};
use crate::core::ledger::SharePair;
use crate::core::share::ShareClass;
use crate::error::{Error, Result};
use crate::protocol::auction::{invariant_issuance, Auction};
use crate::protocol::events::{AuctionCreatedEvent, EventLog, ProtocolEvent};
use crate::protocol::native::NativeLedger;
use crate::protocol::orchestrator::Orchestrator;
use crate::utils::address::{system, Address, Hash};
use crate::utils::constants::ONE;

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete protocol state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolState {
    pub(crate) params: ProtocolParams,
    pub(crate) now: u64,
    pub(crate) shares: SharePair,
    pub(crate) orchestrator: Orchestrator,
    pub(crate) auction: Auction,
    pub(crate) native: NativeLedger,
    pub(crate) events: EventLog,
}

impl ProtocolState {
    /// Deploy the protocol: mint the genesis shares and open auction 1
    pub fn genesis(config: &ProtocolConfig) -> Result<Self> {
        config.validate()?;
        let params = config.params.clone();
        let genesis = &config.genesis;

        let (mut shares, m_capability, b_capability) = SharePair::new(system::orchestrator());
        shares
            .ledger_mut(ShareClass::M)
            .mint(&m_capability, genesis.holder, ShareAmount::new(genesis.m_supply))?;
        shares
            .ledger_mut(ShareClass::B)
            .mint(&b_capability, genesis.holder, ShareAmount::new(genesis.b_supply))?;

        let orchestrator = Orchestrator::new(m_capability, b_capability, genesis.time);
        let first = Auction::open(
            1,
            genesis.time,
            params.auction_duration,
            invariant_issuance(&params, 1),
        );

        let mut state = Self {
            params,
            now: genesis.time,
            shares,
            orchestrator,
            auction: first,
            native: NativeLedger::new(),
            events: EventLog::new(),
        };
        state.emit_share_transfer(
            ShareClass::M,
            Address::ZERO,
            genesis.holder,
            ShareAmount::new(genesis.m_supply),
        );
        state.emit_share_transfer(
            ShareClass::B,
            Address::ZERO,
            genesis.holder,
            ShareAmount::new(genesis.b_supply),
        );
        state.emit_auction_created();

        info!(
            holder = %genesis.holder,
            m_supply = %ShareAmount::new(genesis.m_supply),
            b_supply = %ShareAmount::new(genesis.b_supply),
            time = genesis.time,
            "protocol deployed"
        );
        Ok(state)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CLOCK
    // ═══════════════════════════════════════════════════════════════════════════

    /// Current time
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Move the clock to `time`; it never runs backwards
    pub fn set_time(&mut self, time: u64) -> Result<()> {
        if time < self.now {
            return Err(Error::TimeTravel {
                now: self.now,
                requested: time,
            });
        }
        self.now = time;
        Ok(())
    }

    /// Move the clock forward by `seconds`, returning the new time
    pub fn advance_time(&mut self, seconds: u64) -> Result<u64> {
        let time = self.now.checked_add(seconds).ok_or(Error::Overflow {
            operation: "advance clock".into(),
        })?;
        self.now = time;
        Ok(time)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Economic parameters
    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    /// Both share ledgers
    pub fn shares(&self) -> &SharePair {
        &self.shares
    }

    /// Share balance of an account
    pub fn share_balance(&self, class: ShareClass, owner: &Address) -> ShareAmount {
        self.shares.ledger(class).balance_of(owner)
    }

    /// Orchestrator state
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Native currency ledger
    pub fn native(&self) -> &NativeLedger {
        &self.native
    }

    /// Native balance of an account
    pub fn native_balance(&self, owner: &Address) -> NativeAmount {
        self.native.balance_of(owner)
    }

    /// Committed events
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // NATIVE CURRENCY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Credit native currency to an account (simulator faucet)
    pub fn fund(&mut self, to: Address, amount: NativeAmount) -> Result<()> {
        self.transact("fund", |state| state.native.fund(to, amount))
    }

    /// Move native currency between accounts
    pub fn transfer_native(
        &mut self,
        from: Address,
        to: Address,
        amount: NativeAmount,
    ) -> Result<()> {
        self.transact("transfer_native", |state| state.native.transfer(from, to, amount))
    }

    /// Make an account refuse (or accept again) incoming native payments
    pub fn set_rejects_payments(&mut self, account: Address, rejects: bool) {
        self.native.set_rejects_payments(account, rejects);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSACTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Run `op` against a staged copy and commit it only on success.
    ///
    /// Events emitted by the staged copy are appended to the live log on commit
    /// and dropped on failure.
    pub(crate) fn transact<T, F>(&mut self, operation: &'static str, op: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let log = std::mem::take(&mut self.events);
        let mut staged = self.clone();
        self.events = log;

        match op(&mut staged) {
            Ok(value) => {
                let emitted = std::mem::take(&mut staged.events);
                staged.events = std::mem::take(&mut self.events);
                staged.events.merge(emitted);
                *self = staged;
                Ok(value)
            }
            Err(e) => {
                warn!(operation, error = %e, code = e.code(), "transaction reverted");
                Err(e)
            }
        }
    }

    pub(crate) fn emit(&mut self, event: ProtocolEvent) {
        self.events.push(event);
    }

    pub(crate) fn emit_auction_created(&mut self) {
        let auction = &self.auction;
        let event = ProtocolEvent::AuctionCreated(AuctionCreatedEvent {
            number: auction.number(),
            invariant_amount: auction.invariant_amount(),
            start_time: auction.start_time(),
            end_time: auction.end_time(),
            timestamp: self.now,
        });
        self.emit(event);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTEGRITY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Check the structural invariants of the whole state
    pub fn verify_invariants(&self) -> Result<()> {
        if !self.shares.verify_supply_invariants() {
            return Err(Error::InvariantViolation(
                "share balances do not sum to total supply".into(),
            ));
        }
        if self.orchestrator.scale_factor() < ONE {
            return Err(Error::InvariantViolation("scale factor below 1.0".into()));
        }
        if self.orchestrator.time_of_last_update() > self.now {
            return Err(Error::InvariantViolation(
                "scale factor updated in the future".into(),
            ));
        }
        Ok(())
    }

    /// SHA-256 over the bincode encoding of the state, excluding the event log
    pub fn state_hash(&self) -> Result<Hash> {
        let essential = (
            &self.params,
            self.now,
            &self.shares,
            &self.orchestrator,
            &self.auction,
            &self.native,
        );
        let bytes =
            bincode::serialize(&essential).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Hash::sha256(&bytes))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PERSISTENCE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from JSON and check integrity
    pub fn from_json(json: &str) -> Result<Self> {
        let state: Self =
            serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))?;
        state.verify_invariants()?;
        Ok(state)
    }

    /// Write a snapshot to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Storage(e.to_string()))?;
        }
        std::fs::write(path, json).map_err(|e| Error::Storage(e.to_string()))
    }

    /// Read a snapshot from disk
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| Error::Storage(e.to_string()))?;
        Self::from_json(&json)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STATUS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Read-only overview of the protocol at the current time
    pub fn status(&self) -> Result<ProtocolStatus> {
        let scale_factor = self.projected_scale_factor()?;
        Ok(ProtocolStatus {
            now: self.now,
            scale_factor,
            interest_rate: self.interest_rate()?,
            m_share_supply: self.shares.supply(ShareClass::M),
            b_share_supply: self.shares.supply(ShareClass::B),
            m_token_supply: self.token(ShareClass::M).total_supply()?,
            b_token_supply: self.token(ShareClass::B).total_supply()?,
            invariant: self.shares.invariant()?,
            auction: self.auction.clone(),
            auction_open: self.auction.is_open(self.now),
            events_recorded: self.events.total(),
            state_hash: self.state_hash()?,
        })
    }
}

/// Snapshot of headline protocol figures
#[derive(Debug, Clone, Serialize)]
pub struct ProtocolStatus {
    /// Current time
    pub now: u64,
    /// Scale factor projected to `now`
    pub scale_factor: u128,
    /// Annual interest rate at 18 decimals
    pub interest_rate: u128,
    /// mShare total supply
    pub m_share_supply: ShareAmount,
    /// bShare total supply
    pub b_share_supply: ShareAmount,
    /// mToken total supply
    pub m_token_supply: TokenAmount,
    /// bToken total supply
    pub b_token_supply: TokenAmount,
    /// Curve invariant
    pub invariant: u128,
    /// Current auction
    pub auction: Auction,
    /// Whether the current auction accepts bids
    pub auction_open: bool,
    /// Events ever recorded
    pub events_recorded: u64,
    /// State hash
    pub state_hash: Hash,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GenesisConfig;

    fn test_state() -> ProtocolState {
        let config = ProtocolConfig::new(
            ProtocolParams::default(),
            GenesisConfig::new(Address::from_label("genesis"), 1_050 * ONE, 1_000 * ONE, 1_000),
        );
        ProtocolState::genesis(&config).unwrap()
    }

    #[test]
    fn test_genesis() {
        let state = test_state();
        let holder = Address::from_label("genesis");

        assert_eq!(state.now(), 1_000);
        assert_eq!(state.share_balance(ShareClass::M, &holder), ShareAmount::from_units(1_050));
        assert_eq!(state.share_balance(ShareClass::B, &holder), ShareAmount::from_units(1_000));
        assert_eq!(state.orchestrator().scale_factor(), ONE);
        let types: Vec<_> = state.events().events().iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec!["ShareTransfer", "ShareTransfer", "AuctionCreated"]);
        assert!(state.verify_invariants().is_ok());
    }

    #[test]
    fn test_genesis_rejects_invalid_config() {
        let mut config = ProtocolConfig::default();
        config.genesis.b_supply = 0;
        assert!(ProtocolState::genesis(&config).is_err());
    }

    #[test]
    fn test_clock_never_runs_backwards() {
        let mut state = test_state();
        assert_eq!(state.advance_time(50).unwrap(), 1_050);
        assert!(matches!(state.set_time(1_000), Err(Error::TimeTravel { .. })));
        assert!(state.set_time(2_000).is_ok());
    }

    #[test]
    fn test_transact_rolls_back() {
        let mut state = test_state();
        let alice = Address::from_label("alice");
        let before = state.state_hash().unwrap();
        let events_before = state.events().len();

        let result: Result<()> = state.transact("test", |s| {
            s.native.fund(alice, NativeAmount::from_units(5))?;
            s.emit_auction_created();
            Err(Error::ZeroAmount)
        });

        assert!(result.is_err());
        assert_eq!(state.state_hash().unwrap(), before);
        assert_eq!(state.events().len(), events_before);
        assert!(state.native_balance(&alice).is_zero());
    }

    #[test]
    fn test_transact_commits_events() {
        let mut state = test_state();
        let events_before = state.events().len();
        state
            .transact("test", |s| {
                s.emit_auction_created();
                Ok(())
            })
            .unwrap();
        assert_eq!(state.events().len(), events_before + 1);
    }

    #[test]
    fn test_state_hash_deterministic() {
        let a = test_state();
        let b = test_state();
        assert_eq!(a.state_hash().unwrap(), b.state_hash().unwrap());

        let mut c = test_state();
        c.fund(Address::from_label("alice"), NativeAmount::from_units(1)).unwrap();
        assert_ne!(a.state_hash().unwrap(), c.state_hash().unwrap());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = test_state();
        state.fund(Address::from_label("alice"), NativeAmount::from_units(3)).unwrap();
        state.save(&path).unwrap();

        let loaded = ProtocolState::load(&path).unwrap();
        assert_eq!(loaded.state_hash().unwrap(), state.state_hash().unwrap());
        assert_eq!(loaded.events().len(), state.events().len());
    }

    #[test]
    fn test_status() {
        let state = test_state();
        let status = state.status().unwrap();
        assert_eq!(status.scale_factor, ONE);
        assert!(status.auction_open);
        assert_eq!(status.m_token_supply, TokenAmount::from_units(1_050));
        // (1050 - 1000) / 1000
        assert_eq!(status.interest_rate, ONE / 20);
    }
}
