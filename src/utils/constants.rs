//! Protocol constants and magic numbers.
//!
//! All protocol-wide constants are defined here for easy auditing and modification.

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED-POINT CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Decimal places of every share, token and native amount
pub const DECIMALS: u8 = 18;

/// 1.0 in 18-decimal fixed point
pub const ONE: u128 = 1_000_000_000_000_000_000;

// ═══════════════════════════════════════════════════════════════════════════════
// TIME CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Seconds in a 365-day year, the compounding base of the interest rate
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Seconds in a day
pub const SECONDS_PER_DAY: u64 = 86_400;

// ═══════════════════════════════════════════════════════════════════════════════
// AUCTION CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of one auction (one day)
pub const AUCTION_DURATION: u64 = SECONDS_PER_DAY;

/// Invariant issuance offered by the first auction (1000 units)
pub const INITIAL_ISSUANCE: u128 = 1_000 * ONE;

/// Auctions between issuance halvings (four years of daily auctions)
pub const AUCTIONS_PER_HALVING: u64 = 1_460;

/// Minimum raise over the standing bid, in percent
pub const MIN_BID_INCREMENT_PERCENTAGE: u128 = 1;

// ═══════════════════════════════════════════════════════════════════════════════
// GENESIS CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// mShare supply minted at genesis
pub const GENESIS_M_SUPPLY: u128 = 1_050_000 * ONE;

/// bShare supply minted at genesis
pub const GENESIS_B_SUPPLY: u128 = 1_000_000 * ONE;

/// Maximum number of events retained in the in-memory log
pub const MAX_RETAINED_EVENTS: usize = 10_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halving_period_is_four_years_of_auctions() {
        assert_eq!(AUCTIONS_PER_HALVING * AUCTION_DURATION, 4 * 365 * SECONDS_PER_DAY);
        assert_eq!(SECONDS_PER_YEAR, 365 * SECONDS_PER_DAY);
    }

    #[test]
    fn test_one_matches_decimals() {
        assert_eq!(ONE, 10u128.pow(u32::from(DECIMALS)));
    }

    #[test]
    fn test_genesis_rate_is_positive() {
        assert!(GENESIS_M_SUPPLY > GENESIS_B_SUPPLY);
    }
}
