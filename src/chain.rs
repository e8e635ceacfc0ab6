//! # Chain — Prime Chain Shapes
//!
//! Three chain shapes are recognised, each grown from a chain origin `o`:
//!
//! | Shape | Wire code | Elements |
//! |-------|-----------|----------|
//! | Cunningham chain, first kind | 1 | o−1, 2o−1, 4o−1, … |
//! | Cunningham chain, second kind | 2 | o+1, 2o+1, 4o+1, … |
//! | Bi-twin chain | 3 | o−1, o+1, 2o−1, 2o+1, … |
//!
//! Per-shape data (composite bitmaps in the sieve, measured lengths in the
//! primality tester) lives in a [`PerChain`], a three-slot array indexed by
//! [`ChainType`], so adding a shape means adding a variant rather than
//! another named field everywhere.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::error::{PowError, Result};
use crate::target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainType {
    Cunningham1,
    Cunningham2,
    BiTwin,
}

impl ChainType {
    /// All shapes in sieve scan order (rarest first).
    pub const SCAN_ORDER: [ChainType; 3] = [
        ChainType::BiTwin,
        ChainType::Cunningham1,
        ChainType::Cunningham2,
    ];

    pub const ALL: [ChainType; 3] = [
        ChainType::Cunningham1,
        ChainType::Cunningham2,
        ChainType::BiTwin,
    ];

    /// Wire code stored in the header's proof-of-work field.
    pub fn code(self) -> u8 {
        match self {
            ChainType::Cunningham1 => 1,
            ChainType::Cunningham2 => 2,
            ChainType::BiTwin => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(ChainType::Cunningham1),
            2 => Ok(ChainType::Cunningham2),
            3 => Ok(ChainType::BiTwin),
            other => Err(PowError::UnknownChainType(other)),
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            ChainType::Cunningham1 => "1CC",
            ChainType::Cunningham2 => "2CC",
            ChainType::BiTwin => "TWN",
        }
    }

    /// Human-readable chain name, e.g. `TWN04.2a3de0`.
    pub fn chain_name(self, length: u32) -> String {
        format!("{}{}", self.short_name(), target::format_target(length))
    }

    fn slot(self) -> usize {
        match self {
            ChainType::Cunningham1 => 0,
            ChainType::Cunningham2 => 1,
            ChainType::BiTwin => 2,
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainType::Cunningham1 => write!(f, "cunningham1"),
            ChainType::Cunningham2 => write!(f, "cunningham2"),
            ChainType::BiTwin => write!(f, "bitwin"),
        }
    }
}

/// One value per chain shape, indexed by [`ChainType`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerChain<T>([T; 3]);

impl<T> PerChain<T> {
    pub fn new(cunningham1: T, cunningham2: T, bi_twin: T) -> Self {
        PerChain([cunningham1, cunningham2, bi_twin])
    }

    pub fn from_fn(mut f: impl FnMut(ChainType) -> T) -> Self {
        PerChain([
            f(ChainType::Cunningham1),
            f(ChainType::Cunningham2),
            f(ChainType::BiTwin),
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChainType, &T)> {
        ChainType::ALL.into_iter().zip(self.0.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ChainType, &mut T)> {
        ChainType::ALL.into_iter().zip(self.0.iter_mut())
    }
}

impl<T> Index<ChainType> for PerChain<T> {
    type Output = T;

    fn index(&self, chain_type: ChainType) -> &T {
        &self.0[chain_type.slot()]
    }
}

impl<T> IndexMut<ChainType> for PerChain<T> {
    fn index_mut(&mut self, chain_type: ChainType) -> &mut T {
        &mut self.0[chain_type.slot()]
    }
}

/// Measured 8.24 chain length words for the three shapes of one origin.
pub type ChainLengths = PerChain<u32>;

impl PerChain<u32> {
    /// Longest of the three length words.
    pub fn longest(&self) -> u32 {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// True if any shape meets the target word.
    pub fn meets(&self, target_bits: u32) -> bool {
        self.0.iter().any(|&length| length >= target_bits)
    }

    /// Longest integer chain length (fraction dropped).
    pub fn longest_integer(&self) -> u32 {
        target::decode_length(self.longest())
    }
}

impl fmt::Display for PerChain<u32> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} {} {})",
            target::format_target(self[ChainType::Cunningham1]),
            target::format_target(self[ChainType::Cunningham2]),
            target::format_target(self[ChainType::BiTwin]),
        )
    }
}
