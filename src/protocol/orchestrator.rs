//! Orchestrator - interest rate, scale factor and the curve exchange.
//!
//! The orchestrator holds both mint capabilities. Its scale factor compounds
//! lazily: it is brought forward at the start of every mutating call, and
//! read-only queries use the projection without storing it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::amount::ShareAmount;
use crate::core::ledger::MintCapability;
use crate::core::share::{Asset, ShareClass};
use crate::error::{Error, Result};
use crate::protocol::events::{ProtocolEvent, ScaleFactorUpdatedEvent, SharesExchangedEvent};
use crate::protocol::state::ProtocolState;
use crate::utils::address::{system, Address};
use crate::utils::constants::ONE;
use crate::utils::math::{exp, mul_div, safe_sub, sqrt, square, sum_of_squares};

// ═══════════════════════════════════════════════════════════════════════════════
// ORCHESTRATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Scale factor bookkeeping and minting authority
#[derive(Debug, Serialize, Deserialize)]
pub struct Orchestrator {
    scale_factor: u128,
    time_of_last_update: u64,
    m_capability: MintCapability,
    b_capability: MintCapability,
}

impl Clone for Orchestrator {
    fn clone(&self) -> Self {
        Self {
            scale_factor: self.scale_factor,
            time_of_last_update: self.time_of_last_update,
            m_capability: self.m_capability.stage(),
            b_capability: self.b_capability.stage(),
        }
    }
}

impl Orchestrator {
    pub(crate) fn new(
        m_capability: MintCapability,
        b_capability: MintCapability,
        now: u64,
    ) -> Self {
        Self {
            scale_factor: ONE,
            time_of_last_update: now,
            m_capability,
            b_capability,
        }
    }

    /// Scale factor as of the last update
    pub fn scale_factor(&self) -> u128 {
        self.scale_factor
    }

    /// Time of the last update
    pub fn time_of_last_update(&self) -> u64 {
        self.time_of_last_update
    }

    pub(crate) fn capability(&self, class: ShareClass) -> &MintCapability {
        match class {
            ShareClass::M => &self.m_capability,
            ShareClass::B => &self.b_capability,
        }
    }
}

/// Result of a curve exchange, in shares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareExchange {
    /// Class burned from the payer
    pub input: ShareClass,
    /// Class minted to the recipient
    pub output: ShareClass,
    /// Shares burned
    pub amount_in: ShareAmount,
    /// Shares minted
    pub amount_out: ShareAmount,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RATE AND COMPOUNDING
// ═══════════════════════════════════════════════════════════════════════════════

/// Annual rate `(M - B) / B`, floored at zero
pub fn interest_rate(m_supply: ShareAmount, b_supply: ShareAmount) -> Result<u128> {
    let (m, b) = (m_supply.raw(), b_supply.raw());
    if m <= b || b == 0 {
        return Ok(0);
    }
    mul_div(m - b, ONE, b)
}

/// `scale_factor × e^(rate × elapsed / seconds_per_year)`
pub fn compound(
    scale_factor: u128,
    rate: u128,
    elapsed: u64,
    seconds_per_year: u64,
) -> Result<u128> {
    if elapsed == 0 || rate == 0 {
        return Ok(scale_factor);
    }
    let exponent = mul_div(rate, elapsed as u128, seconds_per_year as u128)?;
    let growth = exp(exponent)?;
    mul_div(scale_factor, growth, ONE)
}

// ═══════════════════════════════════════════════════════════════════════════════
// CURVE QUOTES
// ═══════════════════════════════════════════════════════════════════════════════

/// Output for an exact input: `sqrt(inv² - (s_in - in)²) - s_out`, rounded down
pub fn amount_out(amount_in: u128, supply_in: u128, supply_out: u128) -> Result<u128> {
    if amount_in > supply_in {
        return Err(Error::InvalidExchange(format!(
            "input {} exceeds supply {}",
            amount_in, supply_in
        )));
    }
    let inv2 = sum_of_squares(supply_in, supply_out)?;
    let remaining = square(supply_in - amount_in);
    safe_sub(sqrt(inv2 - remaining), supply_out)
}

/// Input for an exact output: `s_in - sqrt(inv² - (s_out + out)²)`, rounded up
pub fn amount_in(amount_out: u128, supply_in: u128, supply_out: u128) -> Result<u128> {
    let inv2 = sum_of_squares(supply_in, supply_out)?;
    let new_out = supply_out.checked_add(amount_out).ok_or(Error::Overflow {
        operation: "exchange output supply".into(),
    })?;
    let new_out2 = square(new_out);
    if new_out2 > inv2 {
        return Err(Error::InvalidExchange(format!(
            "output {} leaves the curve",
            amount_out
        )));
    }
    safe_sub(supply_in, sqrt(inv2 - new_out2))
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

impl ProtocolState {
    /// Current annual interest rate
    pub fn interest_rate(&self) -> Result<u128> {
        interest_rate(self.shares.supply(ShareClass::M), self.shares.supply(ShareClass::B))
    }

    /// Scale factor as it would be after an update at the current time
    pub fn projected_scale_factor(&self) -> Result<u128> {
        let elapsed = self.now.saturating_sub(self.orchestrator.time_of_last_update);
        compound(
            self.orchestrator.scale_factor,
            self.interest_rate()?,
            elapsed,
            self.params.seconds_per_year,
        )
    }

    /// Compound the scale factor up to now
    pub fn update_scale_factor(&mut self, caller: Address) -> Result<u128> {
        self.transact("update_scale_factor", |state| state.refresh_scale_factor(caller))
    }

    pub(crate) fn refresh_scale_factor(&mut self, caller: Address) -> Result<u128> {
        let elapsed = self.now.saturating_sub(self.orchestrator.time_of_last_update);
        if elapsed == 0 {
            return Ok(self.orchestrator.scale_factor);
        }

        let scale_factor = self.projected_scale_factor()?;
        self.orchestrator.scale_factor = scale_factor;
        self.orchestrator.time_of_last_update = self.now;
        self.emit(ProtocolEvent::ScaleFactorUpdated(ScaleFactorUpdatedEvent {
            caller,
            scale_factor,
            timestamp: self.now,
        }));
        debug!(caller = %caller.short(), scale_factor, elapsed, "scale factor updated");
        Ok(scale_factor)
    }

    /// Exact-input quote against current supplies
    pub fn quote_amount_out(
        &self,
        input: ShareClass,
        amount_in: ShareAmount,
    ) -> Result<ShareAmount> {
        amount_out(
            amount_in.raw(),
            self.shares.supply(input).raw(),
            self.shares.supply(input.opposite()).raw(),
        )
        .map(ShareAmount::new)
    }

    /// Exact-output quote against current supplies
    pub fn quote_amount_in(
        &self,
        input: ShareClass,
        amount_out: ShareAmount,
    ) -> Result<ShareAmount> {
        amount_in(
            amount_out.raw(),
            self.shares.supply(input).raw(),
            self.shares.supply(input.opposite()).raw(),
        )
        .map(ShareAmount::new)
    }

    /// Burn one share class from `payer` and mint the other to `recipient`
    /// along the invariant curve.
    ///
    /// Give exactly one of `in_amount` / `out_amount` to have the other
    /// computed; give both to request a specific trade that must not leave
    /// the curve.
    pub fn exchange_shares(
        &mut self,
        payer: Address,
        input: Asset,
        output: Asset,
        in_amount: ShareAmount,
        out_amount: ShareAmount,
        recipient: Address,
    ) -> Result<ShareExchange> {
        self.transact("exchange_shares", |state| {
            state.exchange_shares_inner(payer, input, output, in_amount, out_amount, recipient)
        })
    }

    pub(crate) fn exchange_shares_inner(
        &mut self,
        payer: Address,
        input: Asset,
        output: Asset,
        in_amount: ShareAmount,
        out_amount: ShareAmount,
        recipient: Address,
    ) -> Result<ShareExchange> {
        if in_amount.is_zero() && out_amount.is_zero() {
            return Err(Error::MissingInputOutput);
        }
        let (in_class, out_class) = match (input, output) {
            (Asset::Share(a), Asset::Share(b)) if a != b => (a, b),
            _ => {
                return Err(Error::InvalidTokenPair {
                    input: input.to_string(),
                    output: output.to_string(),
                })
            }
        };
        if recipient == system::m_share()
            || recipient == system::b_share()
            || recipient == system::orchestrator()
        {
            return Err(Error::InvalidRecipient(recipient.to_hex()));
        }

        self.refresh_scale_factor(payer)?;

        let supply_in = self.shares.supply(in_class).raw();
        let supply_out = self.shares.supply(out_class).raw();
        let inv2 = sum_of_squares(supply_in, supply_out)?;

        let (amount_in_raw, amount_out_raw) = match (in_amount.is_zero(), out_amount.is_zero()) {
            (true, false) => {
                let charged = amount_in(out_amount.raw(), supply_in, supply_out)?;
                (charged, out_amount.raw())
            }
            (false, true) => {
                let paid = amount_out(in_amount.raw(), supply_in, supply_out)?;
                (in_amount.raw(), paid)
            }
            _ => {
                let (a_in, a_out) = (in_amount.raw(), out_amount.raw());
                let valid = a_in <= supply_in
                    && supply_out
                        .checked_add(a_out)
                        .map(|new_out| sum_of_squares(supply_in - a_in, new_out))
                        .transpose()?
                        .map_or(false, |after| after <= inv2);
                if !valid {
                    return Err(Error::InvalidExchange(format!(
                        "{} in for {} out leaves the curve",
                        a_in, a_out
                    )));
                }
                (a_in, a_out)
            }
        };
        let amount_in = ShareAmount::new(amount_in_raw);
        let amount_out = ShareAmount::new(amount_out_raw);

        self.shares.ledger_mut(in_class).burn(payer, amount_in)?;
        let capability = self.orchestrator.capability(out_class);
        self.shares
            .ledger_mut(out_class)
            .mint(capability, recipient, amount_out)?;

        let after = sum_of_squares(
            self.shares.supply(in_class).raw(),
            self.shares.supply(out_class).raw(),
        )?;
        if after > inv2 {
            return Err(Error::InvariantViolation(format!(
                "exchange raised the invariant: {} > {}",
                after, inv2
            )));
        }

        self.emit(ProtocolEvent::SharesExchanged(SharesExchangedEvent {
            payer,
            recipient,
            input: in_class,
            output: out_class,
            amount_in,
            amount_out,
            timestamp: self.now,
        }));
        info!(
            payer = %payer.short(),
            input = in_class.share_symbol(),
            output = out_class.share_symbol(),
            amount_in = %amount_in,
            amount_out = %amount_out,
            "shares exchanged"
        );

        Ok(ShareExchange {
            input: in_class,
            output: out_class,
            amount_in,
            amount_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{GenesisConfig, ProtocolConfig, ProtocolParams};
    use crate::utils::constants::SECONDS_PER_YEAR;
    use crate::utils::math::invariant;

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn state_with(m: u128, b: u128) -> ProtocolState {
        let config = ProtocolConfig::new(
            ProtocolParams::default(),
            GenesisConfig::new(alice(), m, b, 0),
        );
        ProtocolState::genesis(&config).unwrap()
    }

    const M: Asset = Asset::Share(ShareClass::M);
    const B: Asset = Asset::Share(ShareClass::B);

    #[test]
    fn test_staged_copy_mints_with_same_authority() {
        let mut state = state_with(1_000 * ONE, 1_000 * ONE);
        let staged = state.orchestrator().clone();
        for class in [ShareClass::M, ShareClass::B] {
            assert_eq!(staged.capability(class), state.orchestrator().capability(class));
        }

        // Minting through the staged copy commits like any other exchange
        state
            .exchange_shares(alice(), M, B, ShareAmount::from_units(10), ShareAmount::ZERO, alice())
            .unwrap();
        assert!(state.verify_invariants().is_ok());
    }

    #[test]
    fn test_interest_rate_formula() {
        let rate =
            interest_rate(ShareAmount::from_units(1_500), ShareAmount::from_units(1_000)).unwrap();
        assert_eq!(rate, ONE / 2);
    }

    #[test]
    fn test_interest_rate_floor() {
        assert_eq!(
            interest_rate(ShareAmount::from_units(900), ShareAmount::from_units(1_000)).unwrap(),
            0
        );
        assert_eq!(interest_rate(ShareAmount::from_units(1), ShareAmount::ZERO).unwrap(), 0);
    }

    #[test]
    fn test_compound_one_year() {
        // 5% for a full year compounds to e^0.05
        let sf = compound(ONE, ONE / 20, SECONDS_PER_YEAR, SECONDS_PER_YEAR).unwrap();
        assert_eq!(sf, exp(ONE / 20).unwrap());
        assert_eq!(compound(ONE, ONE / 20, 0, SECONDS_PER_YEAR).unwrap(), ONE);
    }

    #[test]
    fn test_update_scale_factor_exact_formula() {
        let mut state = state_with(1_050 * ONE, 1_000 * ONE);
        state.advance_time(86_400).unwrap();

        let rate = state.interest_rate().unwrap();
        let exponent = mul_div(rate, 86_400, SECONDS_PER_YEAR as u128).unwrap();
        let expected = mul_div(ONE, exp(exponent).unwrap(), ONE).unwrap();

        assert_eq!(state.projected_scale_factor().unwrap(), expected);
        assert_eq!(state.update_scale_factor(alice()).unwrap(), expected);
        assert_eq!(state.orchestrator().scale_factor(), expected);
        assert_eq!(state.orchestrator().time_of_last_update(), 86_400);
        assert_eq!(state.events().last().unwrap().event_type(), "ScaleFactorUpdated");
    }

    #[test]
    fn test_update_scale_factor_idempotent_at_same_time() {
        let mut state = state_with(1_050 * ONE, 1_000 * ONE);
        state.advance_time(1_000).unwrap();
        let first = state.update_scale_factor(alice()).unwrap();
        let events = state.events().len();
        let second = state.update_scale_factor(alice()).unwrap();

        assert_eq!(first, second);
        assert_eq!(state.events().len(), events);
    }

    #[test]
    fn test_scale_factor_flat_when_b_dominates() {
        let mut state = state_with(1_000 * ONE, 2_000 * ONE);
        state.advance_time(SECONDS_PER_YEAR).unwrap();
        assert_eq!(state.update_scale_factor(alice()).unwrap(), ONE);
    }

    #[test]
    fn test_quotes() {
        // 3-4-5 triangle: burning all 3 M yields 1 B
        assert_eq!(amount_out(3 * ONE, 3 * ONE, 4 * ONE).unwrap(), ONE);
        assert_eq!(amount_in(ONE, 3 * ONE, 4 * ONE).unwrap(), 3 * ONE);
        assert!(matches!(amount_out(4 * ONE, 3 * ONE, 4 * ONE), Err(Error::InvalidExchange(_))));
        assert!(matches!(amount_in(ONE + 1, 3 * ONE, 4 * ONE), Err(Error::InvalidExchange(_))));
    }

    #[test]
    fn test_exchange_exact_output() {
        let mut state = state_with(1_000 * ONE, 2_000 * ONE);
        let result = state
            .exchange_shares(
                alice(),
                M,
                B,
                ShareAmount::ZERO,
                ShareAmount::from_units(200),
                alice(),
            )
            .unwrap();

        assert_eq!(result.amount_in, ShareAmount::from_units(600));
        assert_eq!(state.shares().supply(ShareClass::M), ShareAmount::from_units(400));
        assert_eq!(state.shares().supply(ShareClass::B), ShareAmount::from_units(2_200));
    }

    #[test]
    fn test_exchange_exact_input_never_raises_invariant() {
        let mut state = state_with(1_050 * ONE, 1_000 * ONE);
        let before = state.shares().invariant().unwrap();
        let result = state
            .exchange_shares(
                alice(),
                B,
                M,
                ShareAmount::new(123_456_789_012_345_678),
                ShareAmount::ZERO,
                alice(),
            )
            .unwrap();

        assert!(!result.amount_out.is_zero());
        assert!(state.shares().invariant().unwrap() <= before);
        assert_eq!(state.events().last().unwrap().event_type(), "SharesExchanged");
    }

    #[test]
    fn test_exchange_both_amounts() {
        let mut state = state_with(3 * ONE, 4 * ONE);
        // On the curve exactly
        assert!(state
            .exchange_shares(
                alice(),
                M,
                B,
                ShareAmount::new(3 * ONE),
                ShareAmount::new(ONE),
                alice(),
            )
            .is_ok());
        assert_eq!(invariant(0, 5 * ONE).unwrap(), state.shares().invariant().unwrap());

        // Asking for one unit more leaves the curve
        let mut state = state_with(3 * ONE, 4 * ONE);
        let result = state.exchange_shares(
            alice(),
            M,
            B,
            ShareAmount::new(3 * ONE),
            ShareAmount::new(ONE + 1),
            alice(),
        );
        assert!(matches!(result, Err(Error::InvalidExchange(_))));
    }

    #[test]
    fn test_exchange_validation_order() {
        let mut state = state_with(1_000 * ONE, 1_000 * ONE);
        let zero = ShareAmount::ZERO;
        let one = ShareAmount::from_units(1);

        assert_eq!(
            state.exchange_shares(alice(), M, B, zero, zero, alice()),
            Err(Error::MissingInputOutput)
        );
        assert!(matches!(
            state.exchange_shares(alice(), M, M, one, zero, alice()),
            Err(Error::InvalidTokenPair { .. })
        ));
        assert!(matches!(
            state.exchange_shares(alice(), Asset::Token(ShareClass::M), B, one, zero, alice()),
            Err(Error::InvalidTokenPair { .. })
        ));
        for bad in [system::m_share(), system::b_share(), system::orchestrator()] {
            assert!(matches!(
                state.exchange_shares(alice(), M, B, one, zero, bad),
                Err(Error::InvalidRecipient(_))
            ));
        }
    }

    #[test]
    fn test_exchange_insufficient_balance_reverts() {
        let mut state = state_with(1_000 * ONE, 1_000 * ONE);
        let bob = Address::from_label("bob");
        let before = state.state_hash().unwrap();

        let result =
            state.exchange_shares(bob, M, B, ShareAmount::from_units(1), ShareAmount::ZERO, bob);
        assert!(matches!(result, Err(Error::InsufficientBalance { .. })));
        assert_eq!(state.state_hash().unwrap(), before);
    }
}
