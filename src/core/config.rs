//! Protocol configuration and parameters.
//!
//! This module defines all configurable parameters for the Stablecash protocol.
//! Parameters are divided into:
//! - Economic: fixed for the lifetime of a deployment
//! - Genesis: the initial share allocation and clock

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::address::{system, Address};
use crate::utils::constants::*;

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Economic parameters (set at deployment)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolParams {
    /// Protocol version
    pub version: String,

    /// Seconds in the compounding year of the interest rate
    pub seconds_per_year: u64,

    /// Length of each auction in seconds
    pub auction_duration: u64,

    /// Invariant issuance of the first auction
    pub initial_issuance: u128,

    /// Auctions between issuance halvings
    pub auctions_per_halving: u64,

    /// Minimum raise over the standing bid, in percent
    pub min_bid_increment_percentage: u128,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            seconds_per_year: SECONDS_PER_YEAR,
            auction_duration: AUCTION_DURATION,
            initial_issuance: INITIAL_ISSUANCE,
            auctions_per_halving: AUCTIONS_PER_HALVING,
            min_bid_increment_percentage: MIN_BID_INCREMENT_PERCENTAGE,
        }
    }
}

impl ProtocolParams {
    /// Override the auction duration (for testing)
    pub fn with_auction_duration(mut self, seconds: u64) -> Self {
        self.auction_duration = seconds;
        self
    }

    /// Override the halving schedule (for testing)
    pub fn with_halving(mut self, initial_issuance: u128, auctions_per_halving: u64) -> Self {
        self.initial_issuance = initial_issuance;
        self.auctions_per_halving = auctions_per_halving;
        self
    }

    /// Validate parameters are consistent
    pub fn validate(&self) -> Result<()> {
        if self.seconds_per_year == 0 {
            return Err(invalid("seconds_per_year", "must be greater than 0"));
        }
        if self.auction_duration == 0 {
            return Err(invalid("auction_duration", "must be greater than 0"));
        }
        if self.initial_issuance == 0 {
            return Err(invalid("initial_issuance", "must be greater than 0"));
        }
        if self.auctions_per_halving == 0 {
            return Err(invalid("auctions_per_halving", "must be greater than 0"));
        }
        if self.min_bid_increment_percentage > 100 {
            return Err(invalid("min_bid_increment_percentage", "must be at most 100"));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GENESIS
// ═══════════════════════════════════════════════════════════════════════════════

/// Initial allocation and clock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Receiver of the genesis shares
    pub holder: Address,

    /// mShare supply minted at genesis
    pub m_supply: u128,

    /// bShare supply minted at genesis
    pub b_supply: u128,

    /// Unix time of deployment
    pub time: u64,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            holder: system::auction_house(),
            m_supply: GENESIS_M_SUPPLY,
            b_supply: GENESIS_B_SUPPLY,
            time: 0,
        }
    }
}

impl GenesisConfig {
    /// Genesis with explicit supplies
    pub fn new(holder: Address, m_supply: u128, b_supply: u128, time: u64) -> Self {
        Self {
            holder,
            m_supply,
            b_supply,
            time,
        }
    }

    /// Validate the allocation
    pub fn validate(&self) -> Result<()> {
        if self.m_supply == 0 || self.b_supply == 0 {
            return Err(invalid("genesis supply", "both share supplies must be non-zero"));
        }
        crate::utils::math::sum_of_squares(self.m_supply, self.b_supply)?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete deployment configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Economic parameters
    pub params: ProtocolParams,

    /// Genesis allocation
    pub genesis: GenesisConfig,
}

impl ProtocolConfig {
    /// Create a new protocol configuration
    pub fn new(params: ProtocolParams, genesis: GenesisConfig) -> Self {
        Self { params, genesis }
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Storage(e.to_string()))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| Error::Deserialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Storage(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| Error::Storage(e.to_string()))
    }

    /// Defaults overridden by `STABLECASH_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = env_parse("STABLECASH_AUCTION_DURATION")? {
            config.params.auction_duration = v;
        }
        if let Some(v) = env_parse("STABLECASH_INITIAL_ISSUANCE")? {
            config.params.initial_issuance = v;
        }
        if let Some(v) = env_parse("STABLECASH_AUCTIONS_PER_HALVING")? {
            config.params.auctions_per_halving = v;
        }
        if let Some(v) = env_parse("STABLECASH_MIN_BID_INCREMENT")? {
            config.params.min_bid_increment_percentage = v;
        }
        if let Ok(holder) = std::env::var("STABLECASH_GENESIS_HOLDER") {
            config.genesis.holder = Address::parse(&holder);
        }
        if let Some(v) = env_parse("STABLECASH_GENESIS_TIME")? {
            config.genesis.time = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        self.genesis.validate()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn invalid(name: &str, reason: &str) -> Error {
    Error::InvalidParameter {
        name: name.into(),
        reason: reason.into(),
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| invalid(key, &format!("cannot parse {:?}", raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ProtocolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.params.auction_duration, 86_400);
        assert_eq!(config.genesis.holder, system::auction_house());
    }

    #[test]
    fn test_params_validation() {
        let params = ProtocolParams::default().with_auction_duration(0);
        assert!(params.validate().is_err());

        let params = ProtocolParams::default().with_halving(0, 10);
        assert!(params.validate().is_err());

        let mut params = ProtocolParams::default();
        params.min_bid_increment_percentage = 101;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_genesis_requires_both_supplies() {
        let genesis = GenesisConfig::new(Address::from_label("alice"), ONE, 0, 0);
        assert!(genesis.validate().is_err());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = ProtocolConfig::new(
            ProtocolParams::default().with_auction_duration(3_600),
            GenesisConfig::new(Address::from_label("alice"), 10 * ONE, 20 * ONE, 1_700_000_000),
        );
        config.save(&path).unwrap();

        assert_eq!(ProtocolConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ProtocolConfig =
            serde_json::from_str(r#"{"params": {"auction_duration": 60}}"#).unwrap();
        assert_eq!(config.params.auction_duration, 60);
        assert_eq!(config.params.auctions_per_halving, AUCTIONS_PER_HALVING);
        assert_eq!(config.genesis.m_supply, GENESIS_M_SUPPLY);
    }
}
