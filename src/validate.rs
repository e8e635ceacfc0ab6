//! # Validate — Prime Chain Proof-of-Work Check
//!
//! The consensus-side counterpart of the miner. Given a header hash, the
//! target word and the claimed multiplier, [`check_proof_of_work`] rebuilds
//! the chain origin and verifies that one of the three shapes meets the
//! target. It is pure and touches no shared state, so any number of
//! validation threads may call it concurrently.
//!
//! Check order:
//!
//! 1. target length within the network window
//! 2. origin `hash × multiplier` within [2^255, 2^2000 − 1]
//! 3. header hash at least 2^255
//! 4. grow all three chains in the requested mode
//! 5. pick bi-twin, then Cunningham 1, then Cunningham 2
//! 6. strict mode only: Fermat-only lengths must be identical
//! 7. the multiplier must be normalized (halving it must not give a longer
//!    chain)
//!
//! Steps 1–3 are also available alone as [`check_block_header_integrity`].

use rug::Integer;
use serde::{Serialize, Serializer};

use crate::chain::{ChainLengths, ChainType};
use crate::error::{PowError, Result};
use crate::header::{HeaderHash, HEADER_HASH_LIMIT_BITS};
use crate::params::ConsensusParams;
use crate::primality::{grow_chain, PrimalityMode};
use crate::target;

/// Origins must be at least 2^255 ...
pub const PRIME_MIN_BITS: u32 = HEADER_HASH_LIMIT_BITS + 1;
/// ... and at most 2^2000 − 1.
pub const PRIME_MAX_BITS: u32 = 2000;

/// Accepted proof-of-work with diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProofOfWork {
    pub chain_type: ChainType,
    /// Length word of the selected shape.
    pub chain_length: u32,
    pub lengths: ChainLengths,
    #[serde(serialize_with = "serialize_decimal")]
    pub origin: Integer,
}

impl ProofOfWork {
    /// e.g. `TWN04.2a3de0`
    pub fn chain_name(&self) -> String {
        self.chain_type.chain_name(self.chain_length)
    }
}

pub(crate) fn serialize_decimal<S: Serializer>(value: &Integer, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

/// `hash × multiplier`.
pub fn chain_origin(header_hash: &HeaderHash, multiplier: &Integer) -> Integer {
    header_hash.to_integer() * multiplier
}

/// True if `origin` lies in [2^255, 2^2000 − 1].
pub fn origin_in_range(origin: &Integer) -> bool {
    let bits = origin.significant_bits();
    *origin > 0 && (PRIME_MIN_BITS..=PRIME_MAX_BITS).contains(&bits)
}

/// Target length within the network window.
pub fn check_target_range(bits: u32, params: &ConsensusParams) -> Result<()> {
    let length = target::decode_length(bits);
    if length < params.min_length || length > params.max_length {
        return Err(PowError::TargetOutOfRange {
            target: target::format_target(bits),
            min: params.min_length,
            max: params.max_length,
        });
    }
    Ok(())
}

/// Header hashes below 2^255 predate no valid block and are rejected.
pub fn check_v02_compatibility(header_hash: &HeaderHash) -> Result<()> {
    if !header_hash.meets_limit() {
        return Err(PowError::HeaderHashBelowLimit);
    }
    Ok(())
}

/// Structural and range checks only; no primality tests.
pub fn check_block_header_integrity(
    header_hash: &HeaderHash,
    bits: u32,
    multiplier: &Integer,
    params: &ConsensusParams,
) -> Result<Integer> {
    check_target_range(bits, params)?;
    let origin = chain_origin(header_hash, multiplier);
    if !origin_in_range(&origin) {
        return Err(PowError::OriginOutOfRange {
            bits: origin.significant_bits(),
        });
    }
    check_v02_compatibility(header_hash)?;
    Ok(origin)
}

/// First shape in scan order whose length meets `bits`.
pub fn select_chain(lengths: &ChainLengths, bits: u32) -> Option<ChainType> {
    ChainType::SCAN_ORDER
        .into_iter()
        .find(|&chain_type| lengths[chain_type] >= bits)
}

/// Full proof-of-work check for a header.
pub fn check_proof_of_work(
    header_hash: &HeaderHash,
    bits: u32,
    multiplier: &Integer,
    params: &ConsensusParams,
    mode: PrimalityMode,
) -> Result<ProofOfWork> {
    let origin = check_block_header_integrity(header_hash, bits, multiplier, params)?;

    let lengths = grow_chain(&origin, mode);
    let chain_type = select_chain(&lengths, bits).ok_or_else(|| PowError::ChainTooShort {
        target: target::format_target(bits),
        lengths,
    })?;

    if mode == PrimalityMode::Strict {
        let fermat = grow_chain(&origin, PrimalityMode::FermatOnly);
        if fermat != lengths {
            return Err(PowError::FermatMismatch {
                strict: lengths,
                fermat,
            });
        }
    }

    if multiplier.is_even() && origin.is_divisible_u(4) {
        let halved = grow_chain(&Integer::from(&origin >> 1), mode);
        if halved.longest() > lengths.longest() {
            return Err(PowError::NotNormalized { lengths, halved });
        }
    }

    Ok(ProofOfWork {
        chain_type,
        chain_length: lengths[chain_type],
        lengths,
        origin,
    })
}
