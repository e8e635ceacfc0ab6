//! # Target — Prime Chain Difficulty Encoding
//!
//! A proof-of-work target (and equally a measured chain length) is a 32-bit
//! word in 8.24 fixed point:
//!
//! ```text
//!  31        24 23                        0
//! +------------+---------------------------+
//! |   length   |    fractional length      |
//! +------------+---------------------------+
//! ```
//!
//! The integer part is the number of chain links required; the fractional
//! part refines it below one link. Because both targets and lengths use the
//! same format, "chain meets target" is a plain `u32` comparison.
//!
//! ## Fractional Difficulty
//!
//! Retargeting works on the *fractional difficulty*
//! `fd = 2^56 / (2^24 − frac)`, which maps the fraction monotonically onto
//! `[2^32, 2^56]`. Multiplying `fd` by a ratio scales the expected work
//! within one chain length. When `fd` passes a threshold the length steps
//! up and `fd` is divided by [`WORK_TRANSITION_RATIO`], the approximate work
//! multiple of one additional chain link; stepping down mirrors this.

use rug::Integer;

use crate::error::{PowError, Result};
use crate::params::ConsensusParams;

pub const FRACTIONAL_BITS: u32 = 24;
pub const FRACTIONAL_MASK: u32 = (1 << FRACTIONAL_BITS) - 1;
pub const LENGTH_MASK: u32 = !FRACTIONAL_MASK;

pub const FRACTIONAL_DIFFICULTY_MAX: u64 = 1 << (FRACTIONAL_BITS + 32);
pub const FRACTIONAL_DIFFICULTY_MIN: u64 = 1 << 32;
pub const FRACTIONAL_DIFFICULTY_THRESHOLD: u64 = 1 << (8 + 32);

/// Approximate work ratio between chain length L+1 and L.
pub const WORK_TRANSITION_RATIO: u64 = 32;

/// Largest integer length the 8-bit field accepts.
pub const LENGTH_LIMIT: u32 = 0xff;

pub fn decode_length(bits: u32) -> u32 {
    (bits & LENGTH_MASK) >> FRACTIONAL_BITS
}

pub fn decode_fractional(bits: u32) -> u32 {
    bits & FRACTIONAL_MASK
}

/// Word with the given integer length and zero fraction.
pub fn encode_length(length: u32) -> Result<u32> {
    with_length(0, length)
}

/// Replace the integer length of `bits`, keeping its fraction.
pub fn with_length(bits: u32, length: u32) -> Result<u32> {
    if length >= LENGTH_LIMIT {
        return Err(PowError::LengthOutOfRange(length));
    }
    Ok((bits & FRACTIONAL_MASK) | (length << FRACTIONAL_BITS))
}

/// Word for a constant length known to be in range.
pub const fn from_length(length: u32) -> u32 {
    length << FRACTIONAL_BITS
}

/// Fractional difficulty of a 24-bit fraction: 2^56 / (2^24 − frac).
pub fn fractional_as_difficulty(fractional: u32) -> u64 {
    let fractional = (fractional & FRACTIONAL_MASK) as u64;
    FRACTIONAL_DIFFICULTY_MAX / ((1u64 << FRACTIONAL_BITS) - fractional)
}

pub fn fractional_difficulty(bits: u32) -> u64 {
    fractional_as_difficulty(decode_fractional(bits))
}

/// Inverse of [`fractional_as_difficulty`]; the result has zero length.
pub fn encode_fractional_difficulty(fractional_difficulty: u64) -> Result<u32> {
    with_fractional_difficulty(0, fractional_difficulty)
}

/// Replace the fraction of `bits` with the one encoding `fractional_difficulty`.
pub fn with_fractional_difficulty(bits: u32, fractional_difficulty: u64) -> Result<u32> {
    if !(FRACTIONAL_DIFFICULTY_MIN..=FRACTIONAL_DIFFICULTY_MAX).contains(&fractional_difficulty) {
        return Err(PowError::FractionalDifficultyOutOfRange(fractional_difficulty));
    }
    let inverse = FRACTIONAL_DIFFICULTY_MAX / fractional_difficulty;
    if inverse > (1u64 << FRACTIONAL_BITS) {
        return Err(PowError::FractionalDifficultyOutOfRange(fractional_difficulty));
    }
    let fractional = ((1u64 << FRACTIONAL_BITS) - inverse) as u32;
    Ok((bits & LENGTH_MASK) | fractional)
}

/// `LL.FFFFFF` hex rendering used in logs and chain names.
pub fn format_target(bits: u32) -> String {
    format!("{:02x}.{:06x}", decode_length(bits), decode_fractional(bits))
}

/// Parse either `LL.FFFFFF` (as produced by [`format_target`]) or a plain
/// hex word such as `0x07000000`.
pub fn parse_target(s: &str) -> Result<u32> {
    let s = s.trim();
    let invalid = || PowError::InvalidTarget(s.to_string());
    if let Some((length, fraction)) = s.split_once('.') {
        let length = u32::from_str_radix(length, 16).map_err(|_| invalid())?;
        let fraction = u32::from_str_radix(fraction, 16).map_err(|_| invalid())?;
        if fraction > FRACTIONAL_MASK {
            return Err(invalid());
        }
        return with_length(fraction, length);
    }
    u32::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|_| invalid())
}

/// Display difficulty: length plus fraction as a float. Not consensus-relevant.
pub fn difficulty(bits: u32) -> f64 {
    bits as f64 / (1u64 << FRACTIONAL_BITS) as f64
}

/// Compute the next target from the previous one and the last block spacing.
///
/// The fractional difficulty moves exponentially toward the target spacing:
/// `fd' = fd · (interval+1)·spacing / ((interval−1)·spacing + 2·actual)`.
/// The integer length changes by at most one per call, and the result stays
/// within `[params.target_limit(), params.target_ceiling()]`.
pub fn next_target(
    bits: u32,
    interval: i64,
    target_spacing: i64,
    actual_spacing: i64,
    params: &ConsensusParams,
) -> Result<u32> {
    let interval = interval.max(1);
    let target_spacing = target_spacing.max(1);
    let actual_spacing = actual_spacing.max(1);

    let mut length = decode_length(bits);
    let fd = fractional_difficulty(bits);

    let mut scaled = Integer::from(fd);
    scaled *= Integer::from(interval + 1) * target_spacing;
    let denominator =
        Integer::from(interval - 1) * target_spacing + Integer::from(actual_spacing) * 2;
    scaled /= denominator;
    let scaled = scaled.clamp(
        &Integer::from(FRACTIONAL_DIFFICULTY_MIN),
        &Integer::from(FRACTIONAL_DIFFICULTY_MAX),
    );
    let mut fd_next = scaled.to_u64().unwrap_or(FRACTIONAL_DIFFICULTY_MAX);

    if fd_next > FRACTIONAL_DIFFICULTY_THRESHOLD {
        if length < params.max_length {
            length += 1;
            fd_next = (fd_next / WORK_TRANSITION_RATIO).max(FRACTIONAL_DIFFICULTY_MIN);
        } else {
            fd_next = FRACTIONAL_DIFFICULTY_THRESHOLD;
        }
    } else if fd_next == FRACTIONAL_DIFFICULTY_MIN && length > params.min_length {
        length -= 1;
        fd_next = (FRACTIONAL_DIFFICULTY_MIN * WORK_TRANSITION_RATIO)
            .min(FRACTIONAL_DIFFICULTY_THRESHOLD);
    }

    let next = with_fractional_difficulty(with_length(0, length)?, fd_next)?;
    Ok(next.clamp(params.target_limit(), params.target_ceiling()))
}

/// Exponential moving estimate of the work-transition point to a longer chain.
///
/// `chain_length` is the length of the newest block's chain. A longer chain
/// than the target pulls the estimate toward the next length (weighted by
/// the current fractional difficulty); otherwise it decays toward the
/// current length.
pub fn estimate_work_transition(prev_work_transition: u32, bits: u32, chain_length: u32) -> u32 {
    const INTERVAL: u128 = 500;
    let work_transition = prev_work_transition as u128;
    let ceiling = from_length(decode_length(bits).saturating_add(1).min(LENGTH_LIMIT - 1)) as u128;
    let floor = from_length(decode_length(bits)) as u128;
    let fd = fractional_difficulty(bits) as u128;

    let next = if decode_length(chain_length) > decode_length(bits) {
        let weight = ((INTERVAL - 1) * fd) >> 32;
        (work_transition * weight + 2 * ceiling) / (weight + 2)
    } else {
        ((INTERVAL - 1) * work_transition + 2 * floor) / (INTERVAL + 1)
    };
    u32::try_from(next).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_and_fraction_fields() {
        assert_eq!(decode_length(0x07123456), 7);
        assert_eq!(decode_fractional(0x07123456), 0x123456);
        assert_eq!(encode_length(7), Ok(0x07000000));
        assert_eq!(with_length(0x07123456, 9), Ok(0x09123456));
        assert_eq!(encode_length(254), Ok(0xfe000000));
        assert_eq!(encode_length(255), Err(PowError::LengthOutOfRange(255)));
        assert_eq!(from_length(6), 0x06000000);
    }

    #[test]
    fn fractional_difficulty_bounds() {
        assert_eq!(fractional_as_difficulty(0), FRACTIONAL_DIFFICULTY_MIN);
        assert_eq!(fractional_as_difficulty(FRACTIONAL_MASK), FRACTIONAL_DIFFICULTY_MAX);
        // frac = 2^23 halves the denominator
        assert_eq!(fractional_as_difficulty(0x800000), 1 << 33);
        assert_eq!(fractional_difficulty(0x06800000), 1 << 33);
    }

    #[test]
    fn fractional_difficulty_inverse() {
        assert_eq!(encode_fractional_difficulty(1 << 32), Ok(0));
        assert_eq!(encode_fractional_difficulty(1 << 33), Ok(0x800000));
        assert_eq!(encode_fractional_difficulty(1 << 37), Ok(0xf80000));
        assert_eq!(encode_fractional_difficulty(1 << 56), Ok(FRACTIONAL_MASK));
        assert_eq!(
            with_fractional_difficulty(0x07abcdef, 1 << 33),
            Ok(0x07800000)
        );
    }

    #[test]
    fn fractional_difficulty_out_of_range() {
        assert_eq!(
            encode_fractional_difficulty((1 << 32) - 1),
            Err(PowError::FractionalDifficultyOutOfRange((1 << 32) - 1))
        );
        assert_eq!(
            encode_fractional_difficulty((1 << 56) + 1),
            Err(PowError::FractionalDifficultyOutOfRange((1 << 56) + 1))
        );
    }

    #[test]
    fn format_and_parse() {
        assert_eq!(format_target(0x042a3de0), "04.2a3de0");
        assert_eq!(parse_target("04.2a3de0"), Ok(0x042a3de0));
        assert_eq!(parse_target("0x07000000"), Ok(0x07000000));
        assert_eq!(parse_target("07000000"), Ok(0x07000000));
        assert!(parse_target("ff.000000").is_err());
        assert!(parse_target("04.1000000").is_err());
        assert!(parse_target("nope").is_err());
    }

    #[test]
    fn display_difficulty_is_monotonic() {
        assert_eq!(difficulty(0x07000000), 7.0);
        assert_eq!(difficulty(0x07800000), 7.5);
        let mut prev = difficulty(0);
        for bits in (0..0x20000000u32).step_by(0x00345679) {
            let d = difficulty(bits);
            assert!(d >= prev);
            prev = d;
        }
    }

    #[test]
    fn on_time_block_at_whole_length_steps_down() {
        // fd stays at the minimum, so the length drops by one and the
        // fraction restarts at MIN * 32 = 2^37.
        let params = ConsensusParams::mainnet();
        let next = next_target(0x07000000, 10080, 60, 60, &params).unwrap();
        assert_eq!(next, 0x06f80000);
    }

    #[test]
    fn never_steps_below_minimum_length() {
        let params = ConsensusParams::mainnet();
        let next = next_target(params.target_limit(), 10080, 60, 60, &params).unwrap();
        assert_eq!(next, params.target_limit());
        let slow = next_target(params.target_limit(), 10080, 60, 100_000, &params).unwrap();
        assert_eq!(slow, params.target_limit());
    }

    #[test]
    fn fast_blocks_raise_fraction() {
        let params = ConsensusParams::mainnet();
        let next = next_target(0x07800000, 10080, 60, 1, &params).unwrap();
        assert_eq!(decode_length(next), 7);
        assert!(next > 0x07800000);
    }

    #[test]
    fn slow_blocks_lower_fraction() {
        let params = ConsensusParams::mainnet();
        let next = next_target(0x07800000, 10080, 60, 600, &params).unwrap();
        assert_eq!(decode_length(next), 7);
        assert!(next < 0x07800000);
    }

    #[test]
    fn crossing_threshold_steps_length_up_once() {
        // A short interval amplifies the adjustment past the threshold.
        let params = ConsensusParams::mainnet();
        let bits = with_fractional_difficulty(from_length(7), FRACTIONAL_DIFFICULTY_THRESHOLD).unwrap();
        let next = next_target(bits, 2, 60, 1, &params).unwrap();
        assert_eq!(decode_length(next), 8);
        assert!(fractional_difficulty(next) >= FRACTIONAL_DIFFICULTY_MIN);
    }

    #[test]
    fn capped_at_maximum_length() {
        let params = ConsensusParams::mainnet();
        let top = params.target_ceiling();
        let next = next_target(top, 2, 60, 1, &params).unwrap();
        assert_eq!(decode_length(next), params.max_length);
        assert!(next <= top);
    }

    #[test]
    fn work_transition_moves_toward_floor_or_ceiling() {
        let bits = 0x07000000;
        let start = 0x07000000;
        let shorter = estimate_work_transition(start, bits, 0x07100000);
        assert_eq!(shorter, start);
        let longer = estimate_work_transition(start, bits, 0x08000000);
        assert!(longer > start && longer <= 0x08000000);
        let decayed = estimate_work_transition(0x07800000, bits, 0x06000000);
        assert!(decayed < 0x07800000 && decayed >= 0x07000000);
    }
}
