//! # Primality — Chain Link Tests and Chain Growth
//!
//! Probable-primality primitives for chain links, and the incremental chain
//! test that measures all three shapes for one origin.
//!
//! ## Tests
//!
//! | Test | Residue | Passes when |
//! |------|---------|-------------|
//! | Fermat | r = 2^(n−1) mod n | r = 1 |
//! | Euler–Lagrange–Lifchitz | r = 2^((n−1)/2) mod n | depends on kind and n mod 8 |
//!
//! The Euler–Lagrange–Lifchitz conditions follow from 2 being a quadratic
//! residue mod n exactly when n ≡ ±1 (mod 8):
//!
//! | Kind | n mod 8 | Required r |
//! |------|---------|------------|
//! | first (N → 2N+1) | 7 | 1 |
//! | first | 3 | n − 1 |
//! | second (N → 2N−1) | 5 | n − 1 |
//! | second | 1 | 1 |
//!
//! Any other residue fails with no fractional credit.
//!
//! ## Fractional Credit
//!
//! A failing link contributes a fractional length from its Fermat residue r:
//! `((n − r) << 24) / n`. The closer r is to n, the smaller the credit.
//! The first link of every chain always uses the Fermat test; later links
//! use the test selected by [`PrimalityMode`].

use rug::Integer;
use serde::{Deserialize, Serialize};

use crate::chain::{ChainLengths, ChainType};
use crate::prime_table::PrimeTable;
use crate::target::{self, FRACTIONAL_BITS, LENGTH_LIMIT, LENGTH_MASK};

/// Which test extends a chain past its first link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimalityMode {
    FermatOnly,
    Strict,
}

/// Outcome of testing one chain link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkResult {
    Prime,
    /// `fractional` is the 24-bit credit (0 when none applies).
    Composite { fractional: u32 },
}

impl LinkResult {
    pub fn is_prime(self) -> bool {
        matches!(self, LinkResult::Prime)
    }
}

/// Growth rule of a one-sided Cunningham chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CunninghamKind {
    /// N → 2N + 1, started from origin − 1.
    First,
    /// N → 2N − 1, started from origin + 1.
    Second,
}

impl CunninghamKind {
    fn advance(self, n: &mut Integer) {
        *n <<= 1;
        match self {
            CunninghamKind::First => *n += 1,
            CunninghamKind::Second => *n -= 1,
        }
    }
}

/// Mining-side trial division applied ahead of the probable-prime tests.
///
/// Only link `k` with `2k + 1 < target_length` is trial divided: such a link
/// cannot decide whether any shape reaches the target, so the lengths that
/// matter are identical to the unfiltered test.
#[derive(Debug, Clone, Copy)]
pub struct TrialDivision<'t> {
    pub table: &'t PrimeTable,
    pub limit: u32,
    pub target_length: u32,
}

impl TrialDivision<'_> {
    fn applies_to(&self, link: u32) -> bool {
        2 * link + 1 < self.target_length
    }
}

/// False iff a table prime `<= limit` properly divides `candidate`.
pub fn trial_divide(candidate: &Integer, limit: u32, table: &PrimeTable) -> bool {
    table
        .primes()
        .iter()
        .take_while(|&&p| p <= limit)
        .all(|&p| !candidate.is_divisible_u(p) || *candidate == p)
}

/// Base-2 Fermat probable-prime test.
pub fn fermat_test(candidate: &Integer) -> bool {
    fermat_link(candidate).is_prime()
}

pub fn fermat_link(candidate: &Integer) -> LinkResult {
    if *candidate <= 1 {
        return LinkResult::Composite { fractional: 0 };
    }
    let exponent = Integer::from(candidate - 1u32);
    match Integer::from(2).pow_mod(&exponent, candidate) {
        Ok(r) if r == 1 => LinkResult::Prime,
        Ok(r) => LinkResult::Composite {
            fractional: fractional_credit(candidate, &r),
        },
        Err(_) => LinkResult::Composite { fractional: 0 },
    }
}

/// Euler–Lagrange–Lifchitz test for a link at `position` in a chain of `kind`.
/// Position 0 falls back to the Fermat test.
pub fn euler_lagrange_lifchitz_test(candidate: &Integer, kind: CunninghamKind, position: u32) -> bool {
    euler_lagrange_lifchitz_link(candidate, kind, position).is_prime()
}

pub fn euler_lagrange_lifchitz_link(candidate: &Integer, kind: CunninghamKind, position: u32) -> LinkResult {
    if position == 0 {
        return fermat_link(candidate);
    }
    if *candidate <= 2 {
        return LinkResult::Composite { fractional: 0 };
    }
    let exponent = Integer::from(candidate - 1u32) >> 1;
    let Ok(r) = Integer::from(2).pow_mod(&exponent, candidate) else {
        return LinkResult::Composite { fractional: 0 };
    };
    let minus_one = Integer::from(candidate - 1u32);
    let passed = match (kind, candidate.mod_u(8)) {
        (CunninghamKind::First, 7) | (CunninghamKind::Second, 1) => r == 1,
        (CunninghamKind::First, 3) | (CunninghamKind::Second, 5) => r == minus_one,
        _ => return LinkResult::Composite { fractional: 0 },
    };
    if passed {
        return LinkResult::Prime;
    }
    // r^2 is the Fermat residue
    let fermat_residue = r.square() % candidate;
    LinkResult::Composite {
        fractional: fractional_credit(candidate, &fermat_residue),
    }
}

/// `((n − r) << 24) / n`, or 0 when that does not fit in 24 bits.
fn fractional_credit(n: &Integer, r: &Integer) -> u32 {
    let mut credit = Integer::from(n - r);
    credit <<= FRACTIONAL_BITS;
    credit /= n;
    match credit.to_u32() {
        Some(f) if f < (1 << FRACTIONAL_BITS) => f,
        _ => 0,
    }
}

/// Trial division followed by the Fermat test.
pub fn probable_primality_test_with_trial_division(candidate: &Integer, limit: u32, table: &PrimeTable) -> bool {
    trial_divide(candidate, limit, table) && fermat_test(candidate)
}

/// Grow one Cunningham chain from `start` and return its 8.24 length word.
pub fn cunningham_chain_length(
    start: &Integer,
    kind: CunninghamKind,
    mode: PrimalityMode,
    trial: Option<&TrialDivision<'_>>,
) -> u32 {
    let mut length: u32 = 0;
    let mut n = start.clone();
    let mut position = 0;
    loop {
        let filtered = trial.is_some_and(|t| {
            t.applies_to(position) && !trial_divide(&n, t.limit, t.table)
        });
        let result = if filtered {
            LinkResult::Composite { fractional: 0 }
        } else if mode == PrimalityMode::FermatOnly {
            fermat_link(&n)
        } else {
            euler_lagrange_lifchitz_link(&n, kind, position)
        };
        match result {
            LinkResult::Prime => {
                length += 1 << FRACTIONAL_BITS;
                if target::decode_length(length) >= LENGTH_LIMIT - 1 {
                    return length;
                }
            }
            LinkResult::Composite { fractional } => {
                return (length & LENGTH_MASK) | fractional;
            }
        }
        kind.advance(&mut n);
        position += 1;
    }
}

/// Bi-twin length from its two one-sided constituents.
///
/// A bi-twin chain may end on an unpaired first-kind link, so when the
/// first-kind chain is longer the result is `2·L2 + 1` links carrying the
/// second-kind fraction; otherwise `2·L1` links carrying the first-kind one.
/// The sum saturates at `u32::MAX` rather than wrapping.
pub fn bi_twin_length(cunningham1: u32, cunningham2: u32) -> u32 {
    let l1 = target::decode_length(cunningham1);
    let l2 = target::decode_length(cunningham2);
    if l1 > l2 {
        cunningham2.saturating_add(target::from_length(l2 + 1))
    } else {
        cunningham1.saturating_add(target::from_length(l1))
    }
}

/// Measure all three shapes for `origin`.
pub fn grow_chain(origin: &Integer, mode: PrimalityMode) -> ChainLengths {
    grow_chain_with(origin, mode, None)
}

pub fn grow_chain_with(origin: &Integer, mode: PrimalityMode, trial: Option<TrialDivision<'_>>) -> ChainLengths {
    let c1 = cunningham_chain_length(
        &Integer::from(origin - 1u32),
        CunninghamKind::First,
        mode,
        trial.as_ref(),
    );
    let c2 = cunningham_chain_length(
        &Integer::from(origin + 1u32),
        CunninghamKind::Second,
        mode,
        trial.as_ref(),
    );
    let mut lengths = ChainLengths::default();
    lengths[ChainType::Cunningham1] = c1;
    lengths[ChainType::Cunningham2] = c2;
    lengths[ChainType::BiTwin] = bi_twin_length(c1, c2);
    lengths
}
