//! # Header — Block Header Hash
//!
//! The proof-of-work is keyed to the 256-bit hash of the block header
//! (excluding the proof-of-work field itself). Bytes are stored in
//! little-endian integer order, matching the usual `uint256` convention, and
//! rendered as hex most-significant byte first.

use rug::integer::Order;
use rug::Integer;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{PowError, Result};

/// Header hashes below 2^255 are never valid proof-of-work keys.
pub const HEADER_HASH_LIMIT_BITS: u32 = 255;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeaderHash([u8; 32]);

impl HeaderHash {
    /// Wrap raw digest bytes (little-endian integer order).
    pub fn from_le_bytes(bytes: [u8; 32]) -> Self {
        HeaderHash(bytes)
    }

    /// Double SHA-256 of a serialized block header.
    pub fn from_header_bytes(header: &[u8]) -> Self {
        let first = Sha256::digest(header);
        let second = Sha256::digest(first);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&second);
        HeaderHash(bytes)
    }

    /// Parse 64 hex digits, most significant byte first.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim().trim_start_matches("0x");
        if s.len() != 64 {
            return Err(PowError::InvalidHeaderHash(format!(
                "expected 64 hex digits, got {}",
                s.len()
            )));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| PowError::InvalidHeaderHash(e.to_string()))?;
        bytes.reverse();
        Ok(HeaderHash(bytes))
    }

    /// Build from an integer; fails if it does not fit in 256 bits.
    pub fn from_integer(value: &Integer) -> Result<Self> {
        if *value < 0 || value.significant_bits() > 256 {
            return Err(PowError::InvalidHeaderHash(format!(
                "value of {} bits does not fit in 256 bits",
                value.significant_bits()
            )));
        }
        let digits = value.to_digits::<u8>(Order::Lsf);
        let mut bytes = [0u8; 32];
        bytes[..digits.len()].copy_from_slice(&digits);
        Ok(HeaderHash(bytes))
    }

    pub fn as_le_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_integer(&self) -> Integer {
        Integer::from_digits(&self.0, Order::Lsf)
    }

    pub fn to_hex(&self) -> String {
        let mut be = self.0;
        be.reverse();
        hex::encode(be)
    }

    /// Most significant bit set, i.e. hash >= 2^255.
    pub fn meets_limit(&self) -> bool {
        self.0[31] & 0x80 != 0
    }
}

impl fmt::Display for HeaderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for HeaderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeaderHash({})", self.to_hex())
    }
}

impl FromStr for HeaderHash {
    type Err = PowError;

    fn from_str(s: &str) -> Result<Self> {
        HeaderHash::from_hex(s)
    }
}

impl Serialize for HeaderHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HeaderHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        HeaderHash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
