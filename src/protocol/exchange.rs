//! Exchange facade.
//!
//! Deadline and slippage bounded entry points over the orchestrator's curve
//! exchange, for base shares and for scaled tokens.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::amount::{ShareAmount, TokenAmount};
use crate::core::share::{Asset, ShareClass};
use crate::error::{Error, Result};
use crate::protocol::orchestrator::ShareExchange;
use crate::protocol::scaled::{
    shares_to_tokens, shares_to_tokens_up, tokens_to_shares_down, tokens_to_shares_up,
};
use crate::protocol::state::ProtocolState;
use crate::utils::address::Address;

/// Result of a token exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenExchange {
    /// Tokens debited, rounded up from the shares burned
    pub amount_in: TokenAmount,
    /// Tokens credited, rounded down from the shares minted
    pub amount_out: TokenAmount,
    /// The underlying share exchange
    pub shares: ShareExchange,
}

impl ProtocolState {
    fn check_deadline(&self, deadline: u64) -> Result<()> {
        if self.now > deadline {
            return Err(Error::Expired {
                deadline,
                now: self.now,
            });
        }
        Ok(())
    }

    /// Burn exactly `amount_in` shares for at least `min_out` of the other class
    #[allow(clippy::too_many_arguments)]
    pub fn exchange_exact_shares_for_shares(
        &mut self,
        payer: Address,
        input: Asset,
        output: Asset,
        amount_in: ShareAmount,
        min_out: ShareAmount,
        recipient: Address,
        deadline: u64,
    ) -> Result<ShareExchange> {
        self.transact("exchange_exact_shares_for_shares", |state| {
            state.check_deadline(deadline)?;
            let result = state.exchange_shares_inner(
                payer,
                input,
                output,
                amount_in,
                ShareAmount::ZERO,
                recipient,
            )?;
            if result.amount_out < min_out {
                return Err(Error::InsufficientOutputAmount {
                    minimum: min_out.raw(),
                    actual: result.amount_out.raw(),
                });
            }
            Ok(result)
        })
    }

    /// Receive exactly `amount_out` shares for at most `max_in` of the other class
    #[allow(clippy::too_many_arguments)]
    pub fn exchange_shares_for_exact_shares(
        &mut self,
        payer: Address,
        input: Asset,
        output: Asset,
        amount_out: ShareAmount,
        max_in: ShareAmount,
        recipient: Address,
        deadline: u64,
    ) -> Result<ShareExchange> {
        self.transact("exchange_shares_for_exact_shares", |state| {
            state.check_deadline(deadline)?;
            let result = state.exchange_shares_inner(
                payer,
                input,
                output,
                ShareAmount::ZERO,
                amount_out,
                recipient,
            )?;
            if result.amount_in > max_in {
                return Err(Error::ExcessiveInputAmount {
                    maximum: max_in.raw(),
                    actual: result.amount_in.raw(),
                });
            }
            Ok(result)
        })
    }

    /// Spend exactly `amount_in` tokens for at least `min_out` of the other token
    #[allow(clippy::too_many_arguments)]
    pub fn exchange_exact_tokens_for_tokens(
        &mut self,
        payer: Address,
        input: Asset,
        output: Asset,
        amount_in: TokenAmount,
        min_out: TokenAmount,
        recipient: Address,
        deadline: u64,
    ) -> Result<TokenExchange> {
        self.transact("exchange_exact_tokens_for_tokens", |state| {
            state.check_deadline(deadline)?;
            let (in_class, out_class) = token_pair(input, output)?;
            let scale_factor = state.refresh_scale_factor(payer)?;

            let shares_in = tokens_to_shares_up(amount_in, scale_factor)?;
            debug!(tokens = %amount_in, shares = %shares_in, "token input converted");
            let shares = state.exchange_shares_inner(
                payer,
                Asset::Share(in_class),
                Asset::Share(out_class),
                shares_in,
                ShareAmount::ZERO,
                recipient,
            )?;

            let result = TokenExchange {
                amount_in: shares_to_tokens_up(shares.amount_in, scale_factor)?,
                amount_out: shares_to_tokens(shares.amount_out, scale_factor)?,
                shares,
            };
            if result.amount_out < min_out {
                return Err(Error::InsufficientOutputAmount {
                    minimum: min_out.raw(),
                    actual: result.amount_out.raw(),
                });
            }
            Ok(result)
        })
    }

    /// Receive `amount_out` tokens for at most `max_in` of the other token
    #[allow(clippy::too_many_arguments)]
    pub fn exchange_tokens_for_exact_tokens(
        &mut self,
        payer: Address,
        input: Asset,
        output: Asset,
        amount_out: TokenAmount,
        max_in: TokenAmount,
        recipient: Address,
        deadline: u64,
    ) -> Result<TokenExchange> {
        self.transact("exchange_tokens_for_exact_tokens", |state| {
            state.check_deadline(deadline)?;
            let (in_class, out_class) = token_pair(input, output)?;
            let scale_factor = state.refresh_scale_factor(payer)?;

            let shares_out = tokens_to_shares_down(amount_out, scale_factor)?;
            debug!(tokens = %amount_out, shares = %shares_out, "token output converted");
            let shares = state.exchange_shares_inner(
                payer,
                Asset::Share(in_class),
                Asset::Share(out_class),
                ShareAmount::ZERO,
                shares_out,
                recipient,
            )?;

            let result = TokenExchange {
                amount_in: shares_to_tokens_up(shares.amount_in, scale_factor)?,
                amount_out: shares_to_tokens(shares.amount_out, scale_factor)?,
                shares,
            };
            if result.amount_in > max_in {
                return Err(Error::ExcessiveInputAmount {
                    maximum: max_in.raw(),
                    actual: result.amount_in.raw(),
                });
            }
            Ok(result)
        })
    }
}

/// Both assets must be distinct scaled tokens
fn token_pair(input: Asset, output: Asset) -> Result<(ShareClass, ShareClass)> {
    match (input, output) {
        (Asset::Token(a), Asset::Token(b)) if a != b => Ok((a, b)),
        _ => Err(Error::InvalidTokenPair {
            input: input.to_string(),
            output: output.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{GenesisConfig, ProtocolConfig, ProtocolParams};
    use crate::utils::constants::ONE;

    const M_SHARE: Asset = Asset::Share(ShareClass::M);
    const B_SHARE: Asset = Asset::Share(ShareClass::B);
    const M_TOKEN: Asset = Asset::Token(ShareClass::M);
    const B_TOKEN: Asset = Asset::Token(ShareClass::B);

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    fn state() -> ProtocolState {
        let config = ProtocolConfig::new(
            ProtocolParams::default(),
            GenesisConfig::new(alice(), 1_000 * ONE, 2_000 * ONE, 0),
        );
        ProtocolState::genesis(&config).unwrap()
    }

    fn grown_state() -> ProtocolState {
        let config = ProtocolConfig::new(
            ProtocolParams::default(),
            GenesisConfig::new(alice(), 2_000 * ONE, 1_000 * ONE, 0),
        );
        let mut state = ProtocolState::genesis(&config).unwrap();
        state.advance_time(90 * 86_400).unwrap();
        state
    }

    #[test]
    fn test_expired_deadline() {
        let mut state = state();
        state.advance_time(100).unwrap();
        let result = state.exchange_exact_shares_for_shares(
            alice(),
            M_SHARE,
            B_SHARE,
            ShareAmount::from_units(1),
            ShareAmount::ZERO,
            alice(),
            99,
        );
        assert_eq!(result, Err(Error::Expired { deadline: 99, now: 100 }));

        // The deadline itself is still valid
        assert!(state
            .exchange_exact_shares_for_shares(
                alice(),
                M_SHARE,
                B_SHARE,
                ShareAmount::from_units(1),
                ShareAmount::ZERO,
                alice(),
                100,
            )
            .is_ok());
    }

    #[test]
    fn test_exact_output_with_max_input() {
        let mut state = state();
        let result = state
            .exchange_shares_for_exact_shares(
                alice(),
                M_SHARE,
                B_SHARE,
                ShareAmount::from_units(200),
                ShareAmount::from_units(600),
                bob(),
                0,
            )
            .unwrap();
        assert_eq!(result.amount_in, ShareAmount::from_units(600));
        assert_eq!(state.share_balance(ShareClass::B, &bob()), ShareAmount::from_units(200));
    }

    #[test]
    fn test_excessive_input_reverts() {
        let mut state = state();
        let before = state.state_hash().unwrap();
        let result = state.exchange_shares_for_exact_shares(
            alice(),
            M_SHARE,
            B_SHARE,
            ShareAmount::from_units(200),
            ShareAmount::new(600 * ONE - 1),
            bob(),
            0,
        );
        assert!(matches!(result, Err(Error::ExcessiveInputAmount { .. })));
        assert_eq!(state.state_hash().unwrap(), before);
    }

    #[test]
    fn test_insufficient_output_reverts() {
        let mut state = state();
        let quote = state
            .quote_amount_out(ShareClass::B, ShareAmount::from_units(10))
            .unwrap();
        let events = state.events().len();

        let result = state.exchange_exact_shares_for_shares(
            alice(),
            B_SHARE,
            M_SHARE,
            ShareAmount::from_units(10),
            ShareAmount::new(quote.raw() + 1),
            alice(),
            0,
        );
        assert!(matches!(result, Err(Error::InsufficientOutputAmount { .. })));
        assert_eq!(state.events().len(), events);

        let ok = state
            .exchange_exact_shares_for_shares(
                alice(),
                B_SHARE,
                M_SHARE,
                ShareAmount::from_units(10),
                quote,
                alice(),
                0,
            )
            .unwrap();
        assert_eq!(ok.amount_out, quote);
    }

    #[test]
    fn test_token_variants_require_tokens() {
        let mut state = state();
        let result = state.exchange_exact_tokens_for_tokens(
            alice(),
            M_SHARE,
            B_TOKEN,
            TokenAmount::from_units(1),
            TokenAmount::ZERO,
            alice(),
            0,
        );
        assert!(matches!(result, Err(Error::InvalidTokenPair { .. })));

        let result = state.exchange_tokens_for_exact_tokens(
            alice(),
            M_TOKEN,
            M_TOKEN,
            TokenAmount::from_units(1),
            TokenAmount::from_units(10),
            alice(),
            0,
        );
        assert!(matches!(result, Err(Error::InvalidTokenPair { .. })));
    }

    #[test]
    fn test_exact_tokens_for_tokens_uses_scaled_amounts() {
        let mut state = grown_state();
        let amount_in = TokenAmount::from_units(100);
        let result = state
            .exchange_exact_tokens_for_tokens(
                alice(),
                M_TOKEN,
                B_TOKEN,
                amount_in,
                TokenAmount::ZERO,
                bob(),
                90 * 86_400,
            )
            .unwrap();

        let sf = state.orchestrator().scale_factor();
        assert!(sf > ONE);
        assert_eq!(result.shares.amount_in, tokens_to_shares_up(amount_in, sf).unwrap());
        // Debit rounding never charges less than requested, nor more than one share's worth extra
        assert!(result.amount_in >= amount_in);
        assert!(result.amount_in.raw() - amount_in.raw() <= sf / ONE + 1);
        assert_eq!(state.token(ShareClass::B).balance_of(&bob()).unwrap(), result.amount_out);
    }

    #[test]
    fn test_tokens_for_exact_tokens_bounds_input() {
        let mut state = grown_state();
        let amount_out = TokenAmount::from_units(50);

        let mut quoted = state.clone();
        let quote = quoted
            .exchange_tokens_for_exact_tokens(
                alice(),
                M_TOKEN,
                B_TOKEN,
                amount_out,
                TokenAmount::new(u128::MAX),
                bob(),
                u64::MAX,
            )
            .unwrap();
        // Credit rounding never pays more than requested
        let sf = quoted.orchestrator().scale_factor();
        assert!(quote.amount_out <= amount_out);
        assert!(amount_out.raw() - quote.amount_out.raw() <= sf / ONE + 1);

        let tight = TokenAmount::new(quote.amount_in.raw() - 1);
        assert!(matches!(
            state.exchange_tokens_for_exact_tokens(
                alice(),
                M_TOKEN,
                B_TOKEN,
                amount_out,
                tight,
                bob(),
                u64::MAX
            ),
            Err(Error::ExcessiveInputAmount { .. })
        ));
        let done = state
            .exchange_tokens_for_exact_tokens(
                alice(),
                M_TOKEN,
                B_TOKEN,
                amount_out,
                quote.amount_in,
                bob(),
                u64::MAX,
            )
            .unwrap();
        assert_eq!(done, quote);
    }
}
