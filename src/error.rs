//! Error types for the Stablecash protocol.
//!
//! Every failing entry point returns one of these variants and leaves the
//! protocol state untouched.

use thiserror::Error;

/// Result type alias for Stablecash operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Stablecash protocol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Exchange Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Neither an input nor an output amount was supplied
    #[error("Missing input or output amount")]
    MissingInputOutput,

    /// The asset pair is not a valid exchange pair
    #[error("Invalid token pair: {input} -> {output}")]
    InvalidTokenPair {
        /// Input asset
        input: String,
        /// Output asset
        output: String,
    },

    /// Recipient is one of the protocol's own ledgers
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Requested trade would leave the curve
    #[error("Invalid exchange: {0}")]
    InvalidExchange(String),

    /// Deadline has passed
    #[error("Expired: deadline {deadline}, now {now}")]
    Expired {
        /// Caller-supplied deadline
        deadline: u64,
        /// Current time
        now: u64,
    },

    /// Output amount below the caller's minimum
    #[error("Insufficient output amount: minimum {minimum}, actual {actual}")]
    InsufficientOutputAmount {
        /// Caller-supplied minimum
        minimum: u128,
        /// Amount the trade would produce
        actual: u128,
    },

    /// Input amount above the caller's maximum
    #[error("Excessive input amount: maximum {maximum}, actual {actual}")]
    ExcessiveInputAmount {
        /// Caller-supplied maximum
        maximum: u128,
        /// Amount the trade would charge
        actual: u128,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Auction Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Bid is zero or below the minimum increment over the standing bid
    #[error("Insufficient bid: offered {offered}, minimum {minimum}")]
    InsufficientBid {
        /// Amount offered
        offered: u128,
        /// Smallest acceptable amount
        minimum: u128,
    },

    /// Auction no longer accepts bids
    #[error("Auction {number} has ended")]
    AuctionEnded {
        /// Auction number
        number: u64,
    },

    /// Auction cannot be settled yet
    #[error("Auction {number} has not ended: ends at {end_time}, now {now}")]
    AuctionNotEnded {
        /// Auction number
        number: u64,
        /// Scheduled end time
        end_time: u64,
        /// Current time
        now: u64,
    },

    /// Refund of the displaced bid could not be delivered
    #[error("Refund of {amount} to {recipient} failed")]
    RefundFailed {
        /// Displaced bidder
        recipient: String,
        /// Refund amount
        amount: u128,
    },

    /// Both share supplies are zero, so issuance has nothing to be proportional to
    #[error("Auction {number} cannot issue: no shares outstanding")]
    NoSharesOutstanding {
        /// Auction number
        number: u64,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Ledger Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Account holds less than the requested amount
    #[error("Insufficient {asset} balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Asset being debited
        asset: String,
        /// Required amount
        required: u128,
        /// Available amount
        available: u128,
    },

    /// Account refuses incoming native payments
    #[error("Payment rejected by {0}")]
    PaymentRejected(String),

    /// Mint attempted without the ledger's capability
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    // ═══════════════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Amount is zero
    #[error("Amount cannot be zero")]
    ZeroAmount,

    /// Overflow in calculation
    #[error("Arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    /// Underflow in calculation
    #[error("Arithmetic underflow in {operation}")]
    Underflow {
        /// Operation that underflowed
        operation: String,
    },

    /// Simulator clock cannot run backwards
    #[error("Time cannot move backwards: now {now}, requested {requested}")]
    TimeTravel {
        /// Current time
        now: u64,
        /// Requested time
        requested: u64,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Protocol Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Invariant violation detected
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // ═══════════════════════════════════════════════════════════════════
    // Serialization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Returns true if the caller can retry with different inputs
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InsufficientOutputAmount { .. }
                | Error::ExcessiveInputAmount { .. }
                | Error::Expired { .. }
                | Error::InsufficientBid { .. }
                | Error::AuctionNotEnded { .. }
                | Error::InsufficientBalance { .. }
                | Error::RefundFailed { .. }
        )
    }

    /// Returns true if this is a critical error requiring immediate attention
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::InvariantViolation(_) | Error::Overflow { .. } | Error::Underflow { .. }
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Exchange errors: 1xxx
            Error::MissingInputOutput => 1001,
            Error::InvalidTokenPair { .. } => 1002,
            Error::InvalidRecipient(_) => 1003,
            Error::InvalidExchange(_) => 1004,
            Error::Expired { .. } => 1005,
            Error::InsufficientOutputAmount { .. } => 1006,
            Error::ExcessiveInputAmount { .. } => 1007,

            // Auction errors: 2xxx
            Error::InsufficientBid { .. } => 2001,
            Error::AuctionEnded { .. } => 2002,
            Error::AuctionNotEnded { .. } => 2003,
            Error::RefundFailed { .. } => 2004,
            Error::NoSharesOutstanding { .. } => 2005,

            // Ledger errors: 3xxx
            Error::InsufficientBalance { .. } => 3001,
            Error::PaymentRejected(_) => 3002,
            Error::Unauthorized(_) => 3003,

            // Validation errors: 5xxx
            Error::InvalidParameter { .. } => 5001,
            Error::ZeroAmount => 5002,
            Error::Overflow { .. } => 5003,
            Error::Underflow { .. } => 5004,
            Error::TimeTravel { .. } => 5005,

            // Protocol errors: 6xxx
            Error::InvariantViolation(_) => 6001,

            // Serialization errors: 7xxx
            Error::Serialization(_) => 7001,
            Error::Deserialization(_) => 7002,

            // Internal errors: 9xxx
            Error::Storage(_) => 9001,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_unique() {
        let codes = vec![
            Error::MissingInputOutput.code(),
            Error::InvalidTokenPair { input: "".into(), output: "".into() }.code(),
            Error::InvalidRecipient("".into()).code(),
            Error::InvalidExchange("".into()).code(),
            Error::Expired { deadline: 0, now: 0 }.code(),
            Error::InsufficientOutputAmount { minimum: 0, actual: 0 }.code(),
            Error::ExcessiveInputAmount { maximum: 0, actual: 0 }.code(),
            Error::InsufficientBid { offered: 0, minimum: 0 }.code(),
            Error::AuctionEnded { number: 0 }.code(),
            Error::AuctionNotEnded { number: 0, end_time: 0, now: 0 }.code(),
            Error::RefundFailed { recipient: "".into(), amount: 0 }.code(),
            Error::NoSharesOutstanding { number: 0 }.code(),
            Error::InsufficientBalance { asset: "".into(), required: 0, available: 0 }.code(),
            Error::PaymentRejected("".into()).code(),
            Error::Unauthorized("".into()).code(),
            Error::ZeroAmount.code(),
            Error::TimeTravel { now: 0, requested: 0 }.code(),
            Error::InvariantViolation("".into()).code(),
            Error::Storage("".into()).code(),
        ];

        let mut unique_codes = codes.clone();
        unique_codes.sort();
        unique_codes.dedup();

        assert_eq!(codes.len(), unique_codes.len(), "Error codes must be unique");
    }

    #[test]
    fn test_error_display() {
        let err = Error::InsufficientOutputAmount {
            minimum: 1000,
            actual: 500,
        };
        assert!(err.to_string().contains("1000"));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::InsufficientBid { offered: 1, minimum: 2 }.is_recoverable());
        assert!(!Error::InvariantViolation("test".into()).is_recoverable());
    }

    #[test]
    fn test_is_critical() {
        assert!(Error::InvariantViolation("test".into()).is_critical());
        assert!(Error::Overflow { operation: "test".into() }.is_critical());
        assert!(!Error::AuctionEnded { number: 1 }.is_critical());
    }
}
