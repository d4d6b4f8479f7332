//! Native currency ledger.
//!
//! Bids are paid in the simulator's native currency. Accounts can be marked
//! as refusing incoming payments, which is how a failing refund is modelled.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::amount::NativeAmount;
use crate::error::{Error, Result};
use crate::utils::address::Address;

/// Native balances of every account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NativeLedger {
    balances: BTreeMap<Address, NativeAmount>,
    rejecting: BTreeSet<Address>,
}

impl NativeLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Get balance of an address
    pub fn balance_of(&self, owner: &Address) -> NativeAmount {
        self.balances.get(owner).copied().unwrap_or(NativeAmount::ZERO)
    }

    /// Sum of all balances
    pub fn total(&self) -> NativeAmount {
        NativeAmount::new(
            self.balances
                .values()
                .fold(0u128, |acc, b| acc.saturating_add(b.raw())),
        )
    }

    /// Credit new currency to an account (faucet)
    pub fn fund(&mut self, to: Address, amount: NativeAmount) -> Result<()> {
        let balance = self.balance_of(&to).checked_add(amount).ok_or(Error::Overflow {
            operation: "native fund".into(),
        })?;
        self.balances.insert(to, balance);
        Ok(())
    }

    /// Move currency between accounts
    pub fn transfer(&mut self, from: Address, to: Address, amount: NativeAmount) -> Result<()> {
        if self.rejecting.contains(&to) {
            return Err(Error::PaymentRejected(to.to_hex()));
        }
        let available = self.balance_of(&from);
        let remaining = available.checked_sub(amount).ok_or(Error::InsufficientBalance {
            asset: "native".into(),
            required: amount.raw(),
            available: available.raw(),
        })?;
        if from == to {
            return Ok(());
        }
        self.balances.insert(from, remaining);
        self.fund(to, amount)
    }

    /// Toggle whether an account refuses incoming payments
    pub fn set_rejects_payments(&mut self, account: Address, rejects: bool) {
        if rejects {
            self.rejecting.insert(account);
        } else {
            self.rejecting.remove(&account);
        }
    }

    /// Whether an account refuses incoming payments
    pub fn rejects_payments(&self, account: &Address) -> bool {
        self.rejecting.contains(account)
    }
}
