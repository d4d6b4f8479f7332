//! Share ledger.
//!
//! Each share class is a plain fungible balance sheet:
//! - Total supply and per-holder balances
//! - Minting gated by a capability issued once at construction
//! - Holder-initiated burn and transfer

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::amount::ShareAmount;
use crate::core::share::ShareClass;
use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::math::invariant;

// ═══════════════════════════════════════════════════════════════════════════════
// MINT CAPABILITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Authority to mint one share class.
///
/// Only [`ShareLedger::new`] creates one, and a ledger accepts only the
/// capability it issued. It is not `Clone`: the only other copies are the
/// crate's staged transaction state and snapshots restored from disk.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintCapability {
    class: ShareClass,
    minter: Address,
}

impl MintCapability {
    /// Copy for a staged transaction; the stage replaces or is dropped
    pub(crate) fn stage(&self) -> Self {
        Self {
            class: self.class,
            minter: self.minter,
        }
    }

    /// Share class this capability mints
    pub fn class(&self) -> ShareClass {
        self.class
    }

    /// Component holding the capability
    pub fn minter(&self) -> Address {
        self.minter
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARE LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Balances of one share class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLedger {
    class: ShareClass,
    total_supply: ShareAmount,
    balances: BTreeMap<Address, ShareAmount>,
    minter: Address,
}

impl ShareLedger {
    /// Create an empty ledger and the single capability allowed to mint into it
    pub fn new(class: ShareClass, minter: Address) -> (Self, MintCapability) {
        let ledger = Self {
            class,
            total_supply: ShareAmount::ZERO,
            balances: BTreeMap::new(),
            minter,
        };
        (ledger, MintCapability { class, minter })
    }

    /// Share class of this ledger
    pub fn class(&self) -> ShareClass {
        self.class
    }

    /// Get total supply
    pub fn total_supply(&self) -> ShareAmount {
        self.total_supply
    }

    /// Get balance of an address
    pub fn balance_of(&self, owner: &Address) -> ShareAmount {
        self.balances.get(owner).copied().unwrap_or(ShareAmount::ZERO)
    }

    /// Mint new shares. Zero is a no-op.
    pub fn mint(
        &mut self,
        capability: &MintCapability,
        to: Address,
        amount: ShareAmount,
    ) -> Result<()> {
        if capability.class != self.class || capability.minter != self.minter {
            return Err(Error::Unauthorized(format!(
                "{} cannot mint {}",
                capability.minter,
                self.class.share_symbol()
            )));
        }
        if amount.is_zero() {
            return Ok(());
        }

        let new_supply = self.total_supply.checked_add(amount).ok_or(Error::Overflow {
            operation: format!("{} mint total supply", self.class.share_symbol()),
        })?;
        let new_balance = self.balance_of(&to).checked_add(amount).ok_or(Error::Overflow {
            operation: format!("{} mint balance", self.class.share_symbol()),
        })?;

        self.balances.insert(to, new_balance);
        self.total_supply = new_supply;
        debug!(class = %self.class, to = %to.short(), amount = %amount, "shares minted");
        Ok(())
    }

    /// Burn shares held by `from`. Zero is a no-op.
    pub fn burn(&mut self, from: Address, amount: ShareAmount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let remaining = self.debit(from, amount)?;
        self.store(from, remaining);
        self.total_supply = self.total_supply.saturating_sub(amount);
        debug!(class = %self.class, from = %from.short(), amount = %amount, "shares burned");
        Ok(())
    }

    /// Transfer shares between accounts
    pub fn transfer(&mut self, from: Address, to: Address, amount: ShareAmount) -> Result<()> {
        let remaining = self.debit(from, amount)?;
        if from == to || amount.is_zero() {
            return Ok(());
        }
        self.store(from, remaining);

        let to_balance = self.balance_of(&to).checked_add(amount).ok_or(Error::Overflow {
            operation: format!("{} transfer balance", self.class.share_symbol()),
        })?;
        self.balances.insert(to, to_balance);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Get number of holders with a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// All non-zero balances in address order
    pub fn balances(&self) -> impl Iterator<Item = (&Address, &ShareAmount)> {
        self.balances.iter()
    }

    /// Verify supply invariant (total_supply == sum of all balances)
    pub fn verify_supply_invariant(&self) -> bool {
        let sum = self
            .balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(b.raw()));
        sum == Some(self.total_supply.raw())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL
    // ═══════════════════════════════════════════════════════════════════════════

    fn debit(&self, from: Address, amount: ShareAmount) -> Result<ShareAmount> {
        let balance = self.balance_of(&from);
        balance.checked_sub(amount).ok_or_else(|| Error::InsufficientBalance {
            asset: self.class.share_symbol().into(),
            required: amount.raw(),
            available: balance.raw(),
        })
    }

    fn store(&mut self, owner: Address, balance: ShareAmount) {
        if balance.is_zero() {
            self.balances.remove(&owner);
        } else {
            self.balances.insert(owner, balance);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARE PAIR
// ═══════════════════════════════════════════════════════════════════════════════

/// The two ledgers bound together by the sum-of-squares invariant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePair {
    m: ShareLedger,
    b: ShareLedger,
}

impl SharePair {
    /// Create both ledgers, minted by `minter`
    pub fn new(minter: Address) -> (Self, MintCapability, MintCapability) {
        let (m, m_cap) = ShareLedger::new(ShareClass::M, minter);
        let (b, b_cap) = ShareLedger::new(ShareClass::B, minter);
        (Self { m, b }, m_cap, b_cap)
    }

    /// Ledger of a class
    pub fn ledger(&self, class: ShareClass) -> &ShareLedger {
        match class {
            ShareClass::M => &self.m,
            ShareClass::B => &self.b,
        }
    }

    /// Mutable ledger of a class
    pub fn ledger_mut(&mut self, class: ShareClass) -> &mut ShareLedger {
        match class {
            ShareClass::M => &mut self.m,
            ShareClass::B => &mut self.b,
        }
    }

    /// Total supply of a class
    pub fn supply(&self, class: ShareClass) -> ShareAmount {
        self.ledger(class).total_supply()
    }

    /// Current invariant `floor(sqrt(M² + B²))`
    pub fn invariant(&self) -> Result<u128> {
        invariant(self.m.total_supply().raw(), self.b.total_supply().raw())
    }

    /// Supply invariant of both ledgers
    pub fn verify_supply_invariants(&self) -> bool {
        self.m.verify_supply_invariant() && self.b.verify_supply_invariant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    fn minter() -> Address {
        Address::from_label("minter")
    }

    #[test]
    fn test_mint() {
        let (mut ledger, cap) = ShareLedger::new(ShareClass::M, minter());
        ledger.mint(&cap, alice(), ShareAmount::from_units(1000)).unwrap();

        assert_eq!(ledger.balance_of(&alice()), ShareAmount::from_units(1000));
        assert_eq!(ledger.total_supply(), ShareAmount::from_units(1000));
    }

    #[test]
    fn test_mint_rejects_foreign_capability() {
        let (mut m_ledger, _) = ShareLedger::new(ShareClass::M, minter());
        let (_, b_cap) = ShareLedger::new(ShareClass::B, minter());
        let (_, rogue_cap) = ShareLedger::new(ShareClass::M, alice());

        let result = m_ledger.mint(&b_cap, alice(), ShareAmount::from_units(1));
        assert!(matches!(result, Err(Error::Unauthorized(_))));
        let result = m_ledger.mint(&rogue_cap, alice(), ShareAmount::from_units(1));
        assert!(matches!(result, Err(Error::Unauthorized(_))));
        assert!(m_ledger.total_supply().is_zero());
    }

    #[test]
    fn test_burn() {
        let (mut ledger, cap) = ShareLedger::new(ShareClass::B, minter());
        ledger.mint(&cap, alice(), ShareAmount::from_units(1000)).unwrap();
        ledger.burn(alice(), ShareAmount::from_units(400)).unwrap();

        assert_eq!(ledger.balance_of(&alice()), ShareAmount::from_units(600));
        assert_eq!(ledger.total_supply(), ShareAmount::from_units(600));
    }

    #[test]
    fn test_burn_insufficient_balance() {
        let (mut ledger, cap) = ShareLedger::new(ShareClass::B, minter());
        ledger.mint(&cap, alice(), ShareAmount::from_units(100)).unwrap();
        let result = ledger.burn(alice(), ShareAmount::from_units(200));

        assert!(matches!(result, Err(Error::InsufficientBalance { .. })));
        assert_eq!(ledger.total_supply(), ShareAmount::from_units(100));
    }

    #[test]
    fn test_transfer() {
        let (mut ledger, cap) = ShareLedger::new(ShareClass::M, minter());
        ledger.mint(&cap, alice(), ShareAmount::from_units(1000)).unwrap();
        ledger.transfer(alice(), bob(), ShareAmount::from_units(300)).unwrap();

        assert_eq!(ledger.balance_of(&alice()), ShareAmount::from_units(700));
        assert_eq!(ledger.balance_of(&bob()), ShareAmount::from_units(300));
        assert_eq!(ledger.total_supply(), ShareAmount::from_units(1000));
    }

    #[test]
    fn test_self_transfer_still_checks_balance() {
        let (mut ledger, cap) = ShareLedger::new(ShareClass::M, minter());
        ledger.mint(&cap, alice(), ShareAmount::from_units(1)).unwrap();
        assert!(ledger.transfer(alice(), alice(), ShareAmount::from_units(1)).is_ok());
        assert!(ledger.transfer(alice(), alice(), ShareAmount::from_units(2)).is_err());
        assert_eq!(ledger.balance_of(&alice()), ShareAmount::from_units(1));
    }

    #[test]
    fn test_supply_invariant_and_holders() {
        let (mut ledger, cap) = ShareLedger::new(ShareClass::M, minter());
        ledger.mint(&cap, alice(), ShareAmount::from_units(1000)).unwrap();
        ledger.mint(&cap, bob(), ShareAmount::from_units(500)).unwrap();
        assert_eq!(ledger.holder_count(), 2);

        ledger.transfer(bob(), alice(), ShareAmount::from_units(500)).unwrap();
        assert_eq!(ledger.holder_count(), 1);
        ledger.burn(alice(), ShareAmount::from_units(100)).unwrap();

        assert!(ledger.verify_supply_invariant());
    }

    #[test]
    fn test_pair_invariant() {
        let (mut pair, m_cap, b_cap) = SharePair::new(minter());
        pair.ledger_mut(ShareClass::M).mint(&m_cap, alice(), ShareAmount::from_units(3)).unwrap();
        pair.ledger_mut(ShareClass::B).mint(&b_cap, alice(), ShareAmount::from_units(4)).unwrap();

        assert_eq!(pair.invariant().unwrap(), ShareAmount::from_units(5).raw());
        assert!(pair.verify_supply_invariants());
    }
}
