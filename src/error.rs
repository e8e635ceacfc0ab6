//! # Error — Proof-of-Work Error Taxonomy
//!
//! Every failure the engine can report is a variant of [`PowError`]. None of
//! them is fatal to the hosting process:
//!
//! - **Encoding** (`LengthOutOfRange`, `FractionalDifficultyOutOfRange`,
//!   `UnknownChainType`, `InvalidHeaderHash`): a malformed difficulty word or
//!   header field. The caller rejects the header or retarget result.
//! - **Range** (`TargetOutOfRange`, `HeaderHashBelowLimit`,
//!   `OriginOutOfRange`): structurally valid values outside the admissible
//!   window. Surfaced as a validation rejection.
//! - **Chain** (`ChainTooShort`, `FermatMismatch`, `NotNormalized`): the
//!   claimed chain does not satisfy the target. `ChainTooShort` is the
//!   frequent, expected outcome while mining and is never logged as an error.
//!
//! Cancellation of a mining attempt is not an error; it is reported as
//! [`crate::miner::MiningOutcome::Cancelled`].

use thiserror::Error;

use crate::chain::ChainLengths;

pub type Result<T> = std::result::Result<T, PowError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PowError {
    /// Integer chain length does not fit in the 8-bit length field.
    #[error("invalid chain length {0} (must be below 255)")]
    LengthOutOfRange(u32),

    /// Fractional difficulty outside [2^32, 2^56].
    #[error("fractional difficulty {0:#018x} out of range")]
    FractionalDifficultyOutOfRange(u64),

    #[error("prime table bound {0} contains no primes")]
    EmptyPrimeTable(u32),

    #[error("unknown prime chain type {0}")]
    UnknownChainType(u8),

    #[error("invalid block header hash: {0}")]
    InvalidHeaderHash(String),

    #[error("invalid target word {0:?}")]
    InvalidTarget(String),

    /// Target length outside the network's [min, max] window.
    #[error("invalid chain length target {target} (allowed lengths {min}..={max})")]
    TargetOutOfRange { target: String, min: u32, max: u32 },

    #[error("block header hash under limit")]
    HeaderHashBelowLimit,

    /// Chain origin outside [2^255, 2^2000 - 1].
    #[error("prime chain origin of {bits} bits outside admissible range")]
    OriginOutOfRange { bits: u32 },

    #[error("prime chain too short: target {target}, lengths {lengths}")]
    ChainTooShort {
        target: String,
        lengths: ChainLengths,
    },

    /// Strict and Fermat-only chain tests disagree.
    #[error("Fermat double check failed: lengths {strict} vs Fermat {fermat}")]
    FermatMismatch {
        strict: ChainLengths,
        fermat: ChainLengths,
    },

    /// Halving the multiplier yields a longer chain.
    #[error("prime chain multiplier not normalized: lengths {lengths}, halved {halved}")]
    NotNormalized {
        lengths: ChainLengths,
        halved: ChainLengths,
    },
}

impl PowError {
    /// True for the outcomes a miner treats as "keep searching".
    pub fn is_chain_failure(&self) -> bool {
        matches!(
            self,
            PowError::ChainTooShort { .. }
                | PowError::FermatMismatch { .. }
                | PowError::NotNormalized { .. }
        )
    }
}
