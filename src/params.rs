//! # Params — Network Consensus Parameters
//!
//! The constants the proof-of-work engine needs from the consensus layer:
//! the admissible chain-length window, block spacing for retargeting, and
//! the activation height from which chain links past the first are checked
//! with the strict test instead of Fermat only.
//!
//! Presets exist for main, test and regression-test networks; any field can
//! be overridden from the `[consensus]` section of the config file.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::primality::PrimalityMode;
use crate::target::{self, FRACTIONAL_MASK};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[serde(alias = "mainnet")]
    #[value(alias = "mainnet")]
    Main,
    #[serde(alias = "testnet")]
    #[value(alias = "testnet")]
    Test,
    Regtest,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Main => write!(f, "main"),
            Network::Test => write!(f, "test"),
            Network::Regtest => write!(f, "regtest"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub network: Network,
    /// Shortest chain length any target may require.
    pub min_length: u32,
    /// Chain length of the genesis target.
    pub initial_length: u32,
    /// Longest chain length any target may require.
    pub max_length: u32,
    /// Desired block spacing in seconds.
    pub target_spacing: i64,
    /// Retarget averaging window in seconds.
    pub target_timespan: i64,
    /// Blocks below this height accept Fermat-only chains.
    pub strict_primality_height: u64,
}

impl ConsensusParams {
    pub fn mainnet() -> Self {
        ConsensusParams {
            network: Network::Main,
            min_length: 6,
            initial_length: 7,
            max_length: 99,
            target_spacing: 60,
            target_timespan: 7 * 24 * 60 * 60,
            strict_primality_height: 0,
        }
    }

    pub fn testnet() -> Self {
        ConsensusParams {
            network: Network::Test,
            min_length: 2,
            initial_length: 4,
            ..Self::mainnet()
        }
    }

    pub fn regtest() -> Self {
        ConsensusParams {
            network: Network::Regtest,
            min_length: 2,
            initial_length: 2,
            ..Self::mainnet()
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Main => Self::mainnet(),
            Network::Test => Self::testnet(),
            Network::Regtest => Self::regtest(),
        }
    }

    /// Easiest admissible target word.
    pub fn target_limit(&self) -> u32 {
        target::from_length(self.min_length)
    }

    pub fn target_initial(&self) -> u32 {
        target::from_length(self.initial_length)
    }

    /// Hardest admissible target word.
    pub fn target_ceiling(&self) -> u32 {
        target::from_length(self.max_length) | FRACTIONAL_MASK
    }

    /// Retarget interval in blocks (at least 1).
    pub fn retarget_interval(&self) -> i64 {
        (self.target_timespan / self.target_spacing.max(1)).max(1)
    }

    /// Primality mode required for a block at `height`.
    pub fn primality_mode(&self, height: u64) -> PrimalityMode {
        if height < self.strict_primality_height {
            PrimalityMode::FermatOnly
        } else {
            PrimalityMode::Strict
        }
    }
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_window() {
        let params = ConsensusParams::mainnet();
        assert_eq!(params.target_limit(), 0x06000000);
        assert_eq!(params.target_initial(), 0x07000000);
        assert_eq!(params.target_ceiling(), 0x63ffffff);
        assert_eq!(params.retarget_interval(), 10_080);
    }

    #[test]
    fn test_networks_start_easier() {
        assert_eq!(ConsensusParams::testnet().target_limit(), 0x02000000);
        assert_eq!(ConsensusParams::testnet().target_initial(), 0x04000000);
        assert_eq!(ConsensusParams::regtest().target_initial(), 0x02000000);
        assert_eq!(ConsensusParams::for_network(Network::Regtest).network, Network::Regtest);
    }

    #[test]
    fn primality_mode_by_height() {
        let mut params = ConsensusParams::mainnet();
        assert_eq!(params.primality_mode(0), PrimalityMode::Strict);
        params.strict_primality_height = 100;
        assert_eq!(params.primality_mode(99), PrimalityMode::FermatOnly);
        assert_eq!(params.primality_mode(100), PrimalityMode::Strict);
    }

    #[test]
    fn zero_spacing_does_not_divide_by_zero() {
        let params = ConsensusParams {
            target_spacing: 0,
            target_timespan: 0,
            ..ConsensusParams::mainnet()
        };
        assert_eq!(params.retarget_interval(), 1);
    }

    #[test]
    fn network_names() {
        let parsed: Network = serde_json::from_str("\"testnet\"").unwrap();
        assert_eq!(parsed, Network::Test);
        assert_eq!(serde_json::to_string(&Network::Main).unwrap(), "\"main\"");
        assert_eq!(Network::Regtest.to_string(), "regtest");
    }
}
