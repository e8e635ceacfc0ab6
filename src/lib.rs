//! Prime-chain proof-of-work: difficulty encoding, chain sieving and
//! testing, header validation, retargeting and a multi-worker miner.
//!
//! Dependency order: `target` → `chain` → `prime_table` → `primality` →
//! `sieve` → `validate` → `tuner` → `miner`. `params`, `header` and `error`
//! are leaves shared by all of them.

pub mod chain;
pub mod config;
pub mod error;
pub mod header;
pub mod miner;
pub mod params;
pub mod primality;
pub mod prime_table;
pub mod progress;
pub mod sieve;
pub mod target;
pub mod tuner;
pub mod validate;

pub use chain::{ChainLengths, ChainType, PerChain};
pub use error::{PowError, Result};
pub use header::HeaderHash;
pub use miner::{
    mine_parallel, mine_probable_prime_chain, CancelToken, MinedChain, MinerConfig, MiningContext,
    MiningOutcome, MiningStats, MiningWork,
};
pub use params::{ConsensusParams, Network};
pub use primality::PrimalityMode;
pub use prime_table::PrimeTable;
pub use validate::{check_proof_of_work, ProofOfWork};
