//! Scaled token view.
//!
//! mToken and bToken are views over the share ledgers: a token balance is
//! the share balance times the scale factor. Moving tokens moves the
//! equivalent shares, rounded against the sender.

use tracing::debug;

use crate::core::amount::{ShareAmount, TokenAmount};
use crate::core::share::ShareClass;
use crate::error::Result;
use crate::protocol::events::{ProtocolEvent, ShareTransferEvent, TokenTransferEvent};
use crate::protocol::state::ProtocolState;
use crate::utils::address::Address;
use crate::utils::constants::ONE;
use crate::utils::math::{mul_div, mul_div_up};

// ═══════════════════════════════════════════════════════════════════════════════
// CONVERSIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Token value of shares, rounded down
pub fn shares_to_tokens(shares: ShareAmount, scale_factor: u128) -> Result<TokenAmount> {
    mul_div(shares.raw(), scale_factor, ONE).map(TokenAmount::new)
}

/// Token value of shares, rounded up (what a debit of these shares costs)
pub fn shares_to_tokens_up(shares: ShareAmount, scale_factor: u128) -> Result<TokenAmount> {
    mul_div_up(shares.raw(), scale_factor, ONE).map(TokenAmount::new)
}

/// Shares credited for a token amount, rounded down
pub fn tokens_to_shares_down(tokens: TokenAmount, scale_factor: u128) -> Result<ShareAmount> {
    mul_div(tokens.raw(), ONE, scale_factor).map(ShareAmount::new)
}

/// Shares debited for a token amount, rounded up
pub fn tokens_to_shares_up(tokens: TokenAmount, scale_factor: u128) -> Result<ShareAmount> {
    mul_div_up(tokens.raw(), ONE, scale_factor).map(ShareAmount::new)
}

// ═══════════════════════════════════════════════════════════════════════════════
// READ VIEW
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only token view of one share class
#[derive(Debug, Clone, Copy)]
pub struct ScaledView<'a> {
    state: &'a ProtocolState,
    class: ShareClass,
}

impl<'a> ScaledView<'a> {
    /// Share class behind the view
    pub fn class(&self) -> ShareClass {
        self.class
    }

    /// Token symbol
    pub fn symbol(&self) -> &'static str {
        self.class.token_symbol()
    }

    /// Scale factor projected to the current time
    pub fn scale_factor(&self) -> Result<u128> {
        self.state.projected_scale_factor()
    }

    /// Token total supply
    pub fn total_supply(&self) -> Result<TokenAmount> {
        shares_to_tokens(self.state.shares.supply(self.class), self.scale_factor()?)
    }

    /// Token balance of an account
    pub fn balance_of(&self, owner: &Address) -> Result<TokenAmount> {
        shares_to_tokens(self.state.share_balance(self.class, owner), self.scale_factor()?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

impl ProtocolState {
    /// Token view of a share class
    pub fn token(&self, class: ShareClass) -> ScaledView<'_> {
        ScaledView { state: self, class }
    }

    /// Transfer tokens; returns the shares moved
    pub fn transfer_tokens(
        &mut self,
        class: ShareClass,
        from: Address,
        to: Address,
        amount: TokenAmount,
    ) -> Result<ShareAmount> {
        self.transact("transfer_tokens", |state| {
            let scale_factor = state.refresh_scale_factor(from)?;
            let shares = tokens_to_shares_up(amount, scale_factor)?;
            state.shares.ledger_mut(class).transfer(from, to, shares)?;
            state.emit_token_transfer(class, from, to, amount, shares);
            Ok(shares)
        })
    }

    /// Burn tokens held by `from`; returns the shares burned
    pub fn burn_tokens(
        &mut self,
        class: ShareClass,
        from: Address,
        amount: TokenAmount,
    ) -> Result<ShareAmount> {
        self.transact("burn_tokens", |state| {
            let scale_factor = state.refresh_scale_factor(from)?;
            let shares = tokens_to_shares_up(amount, scale_factor)?;
            state.shares.ledger_mut(class).burn(from, shares)?;
            state.emit_token_transfer(class, from, Address::ZERO, amount, shares);
            Ok(shares)
        })
    }

    /// Transfer base shares directly
    pub fn transfer_shares(
        &mut self,
        class: ShareClass,
        from: Address,
        to: Address,
        amount: ShareAmount,
    ) -> Result<()> {
        self.transact("transfer_shares", |state| {
            state.refresh_scale_factor(from)?;
            state.shares.ledger_mut(class).transfer(from, to, amount)?;
            state.emit_share_transfer(class, from, to, amount);
            Ok(())
        })
    }

    /// Burn base shares held by `from`
    pub fn burn_shares(
        &mut self,
        class: ShareClass,
        from: Address,
        amount: ShareAmount,
    ) -> Result<()> {
        self.transact("burn_shares", |state| {
            state.refresh_scale_factor(from)?;
            state.shares.ledger_mut(class).burn(from, amount)?;
            state.emit_share_transfer(class, from, Address::ZERO, amount);
            Ok(())
        })
    }

    pub(crate) fn emit_share_transfer(
        &mut self,
        class: ShareClass,
        from: Address,
        to: Address,
        amount: ShareAmount,
    ) {
        debug!(
            share = class.share_symbol(),
            from = %from.short(),
            to = %to.short(),
            amount = %amount,
            "shares moved"
        );
        self.emit(ProtocolEvent::ShareTransfer(ShareTransferEvent {
            class,
            from,
            to,
            amount,
            timestamp: self.now,
        }));
    }

    fn emit_token_transfer(
        &mut self,
        class: ShareClass,
        from: Address,
        to: Address,
        amount: TokenAmount,
        shares: ShareAmount,
    ) {
        debug!(
            token = class.token_symbol(),
            from = %from.short(),
            to = %to.short(),
            amount = %amount,
            shares = %shares,
            "tokens moved"
        );
        self.emit(ProtocolEvent::TokenTransfer(TokenTransferEvent {
            class,
            from,
            to,
            amount,
            shares,
            timestamp: self.now,
        }));
    }
}
