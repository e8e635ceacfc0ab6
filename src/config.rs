//! TOML configuration file.
//!
//! ```toml
//! network = "test"
//!
//! [miner]
//! sieve_size = 500000
//! trial_division_limit = 1000
//!
//! [consensus]
//! min_length = 3
//! strict_primality_height = 120000
//! ```
//!
//! Every key is optional. Consensus values start from the network preset and
//! only the keys present in `[consensus]` replace it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::miner::MinerConfig;
use crate::params::{ConsensusParams, Network};
use crate::sieve::MAX_SIEVE_SIZE;
use crate::target::LENGTH_LIMIT;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub network: Option<Network>,
    pub miner: MinerConfig,
    pub consensus: ConsensusOverrides,
}

/// The `[consensus]` section: per-field overrides of the network preset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsensusOverrides {
    pub min_length: Option<u32>,
    pub initial_length: Option<u32>,
    pub max_length: Option<u32>,
    pub target_spacing: Option<i64>,
    pub target_timespan: Option<i64>,
    pub strict_primality_height: Option<u64>,
}

impl ConsensusOverrides {
    fn apply(&self, params: &mut ConsensusParams) {
        if let Some(v) = self.min_length {
            params.min_length = v;
        }
        if let Some(v) = self.initial_length {
            params.initial_length = v;
        }
        if let Some(v) = self.max_length {
            params.max_length = v;
        }
        if let Some(v) = self.target_spacing {
            params.target_spacing = v;
        }
        if let Some(v) = self.target_timespan {
            params.target_timespan = v;
        }
        if let Some(v) = self.strict_primality_height {
            params.strict_primality_height = v;
        }
    }
}

impl Config {
    /// Resolve consensus parameters. An explicit `network` (from the CLI)
    /// wins over the file's; with neither, mainnet.
    pub fn consensus_params(&self, network: Option<Network>) -> Result<ConsensusParams> {
        let network = network.or(self.network).unwrap_or(Network::Main);
        let mut params = ConsensusParams::for_network(network);
        self.consensus.apply(&mut params);
        validate_consensus(&params)?;
        Ok(params)
    }
}

/// Parse and validate a configuration from TOML text.
pub fn parse_toml(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse a configuration file.
pub fn load(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    parse_toml(&content).with_context(|| format!("invalid config file {}", path.display()))
}

/// Load `path` if given, otherwise defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load(path),
        None => Ok(Config::default()),
    }
}

fn validate_config(config: &Config) -> Result<()> {
    let miner = &config.miner;
    if miner.sieve_size == 0 || miner.sieve_size > MAX_SIEVE_SIZE {
        anyhow::bail!(
            "miner.sieve_size must be in 1..={}, got {}",
            MAX_SIEVE_SIZE,
            miner.sieve_size
        );
    }
    if miner.max_rounds == Some(0) {
        anyhow::bail!("miner.max_rounds must be at least 1 when set");
    }
    config.consensus_params(None)?;
    Ok(())
}

fn validate_consensus(params: &ConsensusParams) -> Result<()> {
    anyhow::ensure!(params.min_length >= 1, "consensus.min_length must be at least 1");
    anyhow::ensure!(
        params.min_length <= params.initial_length && params.initial_length <= params.max_length,
        "consensus lengths must satisfy min <= initial <= max, got {} / {} / {}",
        params.min_length,
        params.initial_length,
        params.max_length
    );
    anyhow::ensure!(
        params.max_length < LENGTH_LIMIT,
        "consensus.max_length must be below {}",
        LENGTH_LIMIT
    );
    anyhow::ensure!(params.target_spacing > 0, "consensus.target_spacing must be positive");
    anyhow::ensure!(
        params.target_timespan >= params.target_spacing,
        "consensus.target_timespan must be at least target_spacing"
    );
    Ok(())
}
