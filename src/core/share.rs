//! Share classes and exchangeable assets.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::utils::address::{system, Address};

/// One of the two base share classes bound by the invariant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShareClass {
    /// mShare, the interest-bearing side when its supply exceeds bShare
    M,
    /// bShare
    B,
}

impl ShareClass {
    /// Both classes in canonical order
    pub const ALL: [ShareClass; 2] = [ShareClass::M, ShareClass::B];

    /// The other class
    pub fn opposite(self) -> Self {
        match self {
            ShareClass::M => ShareClass::B,
            ShareClass::B => ShareClass::M,
        }
    }

    /// Symbol of the base share
    pub fn share_symbol(self) -> &'static str {
        match self {
            ShareClass::M => "mShare",
            ShareClass::B => "bShare",
        }
    }

    /// Symbol of the scaled token
    pub fn token_symbol(self) -> &'static str {
        match self {
            ShareClass::M => "mToken",
            ShareClass::B => "bToken",
        }
    }

    /// Address of the base share ledger
    pub fn share_address(self) -> Address {
        match self {
            ShareClass::M => system::m_share(),
            ShareClass::B => system::b_share(),
        }
    }

    /// Address of the scaled token view
    pub fn token_address(self) -> Address {
        match self {
            ShareClass::M => system::m_token(),
            ShareClass::B => system::b_token(),
        }
    }
}

impl fmt::Display for ShareClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareClass::M => write!(f, "M"),
            ShareClass::B => write!(f, "B"),
        }
    }
}

/// An asset accepted by the exchange entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    /// A base share
    Share(ShareClass),
    /// A scaled token
    Token(ShareClass),
}

impl Asset {
    /// Share class backing the asset
    pub fn class(self) -> ShareClass {
        match self {
            Asset::Share(class) | Asset::Token(class) => class,
        }
    }

    /// Whether this is a scaled token
    pub fn is_token(self) -> bool {
        matches!(self, Asset::Token(_))
    }

    /// Symbol used in output and errors
    pub fn symbol(self) -> &'static str {
        match self {
            Asset::Share(class) => class.share_symbol(),
            Asset::Token(class) => class.token_symbol(),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl std::str::FromStr for Asset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mshare" | "m-share" => Ok(Asset::Share(ShareClass::M)),
            "bshare" | "b-share" => Ok(Asset::Share(ShareClass::B)),
            "mtoken" | "m-token" | "m" => Ok(Asset::Token(ShareClass::M)),
            "btoken" | "b-token" | "b" => Ok(Asset::Token(ShareClass::B)),
            _ => Err(Error::InvalidParameter {
                name: "asset".into(),
                reason: format!("unknown asset {}", s),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite() {
        assert_eq!(ShareClass::M.opposite(), ShareClass::B);
        assert_eq!(ShareClass::B.opposite().opposite(), ShareClass::B);
    }

    #[test]
    fn test_asset_parsing() {
        assert_eq!("mShare".parse::<Asset>().unwrap(), Asset::Share(ShareClass::M));
        assert_eq!("btoken".parse::<Asset>().unwrap(), Asset::Token(ShareClass::B));
        assert!("xShare".parse::<Asset>().is_err());
    }

    #[test]
    fn test_asset_symbols() {
        assert_eq!(Asset::Token(ShareClass::M).to_string(), "mToken");
        assert_eq!(Asset::Share(ShareClass::B).class(), ShareClass::B);
        assert!(Asset::Token(ShareClass::B).is_token());
    }
}
