//! Strongly-typed amounts.
//!
//! Shares and tokens are both 18-decimal integers but are never
//! interchangeable: converting between them goes through the scale factor.

use serde::{Deserialize, Serialize};

use crate::utils::constants::{DECIMALS, ONE};

/// Render an 18-decimal raw value as a decimal string, trimming trailing zeros
pub fn format_units(raw: u128) -> String {
    let whole = raw / ONE;
    let frac = raw % ONE;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", frac, width = DECIMALS as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

macro_rules! fixed_amount {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u128);

        impl $name {
            /// Zero amount
            pub const ZERO: Self = Self(0);

            /// Create from a raw 18-decimal value
            pub const fn new(raw: u128) -> Self {
                Self(raw)
            }

            /// Create from whole units
            pub const fn from_units(units: u128) -> Self {
                Self(units * ONE)
            }

            /// Raw 18-decimal value
            pub const fn raw(&self) -> u128 {
                self.0
            }

            /// Check if zero
            pub fn is_zero(&self) -> bool {
                self.0 == 0
            }

            /// Checked addition
            pub fn checked_add(self, other: Self) -> Option<Self> {
                self.0.checked_add(other.0).map(Self)
            }

            /// Checked subtraction
            pub fn checked_sub(self, other: Self) -> Option<Self> {
                self.0.checked_sub(other.0).map(Self)
            }

            /// Saturating subtraction
            pub fn saturating_sub(self, other: Self) -> Self {
                Self(self.0.saturating_sub(other.0))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", format_units(self.0))
            }
        }

        impl From<u128> for $name {
            fn from(raw: u128) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u128 {
            fn from(amount: $name) -> Self {
                amount.0
            }
        }
    };
}

fixed_amount!(
    /// Amount of a base share (mShare or bShare)
    ShareAmount
);

fixed_amount!(
    /// Amount of a scaled token (mToken or bToken), `shares × scaleFactor`
    TokenAmount
);

fixed_amount!(
    /// Amount of the simulator's native currency, used for auction bids
    NativeAmount
);
