//! # Prime Table — Small Primes and Primorials
//!
//! An ascending table of every prime up to a fixed bound, generated once with
//! a wheel-30 sieve of Eratosthenes. The sieve weaves from it, trial division
//! reads from it, and primorials (`p# = 2·3·5·…·p`) are built from it.
//!
//! ## Algorithm: Wheel-30 Sieve
//!
//! Only integers coprime to 30 = 2·3·5 are tracked (8 residues per 30), so a
//! block of 30 consecutive integers packs into one byte. For the process-wide
//! table bound of one million this is ~33 KB of scratch space.
//!
//! The table is immutable after construction; [`PrimeTable::global`] hands
//! out a shared reference that any number of workers can read concurrently.

use rug::Integer;
use std::sync::OnceLock;

use crate::error::{PowError, Result};

/// Bound of the process-wide prime table.
pub const PRIME_TABLE_LIMIT: u32 = 1_000_000;

const RESIDUES: [u32; 8] = [1, 7, 11, 13, 17, 19, 23, 29];

/// Residue mod 30 → bit index within a wheel byte (255 = not coprime to 30).
const RESIDUE_BIT: [u8; 30] = [
    255, 0, 255, 255, 255, 255, 255, 1, 255, 255, 255, 2, 255, 3, 255, 255, 255, 4, 255, 5, 255,
    255, 255, 6, 255, 255, 255, 255, 255, 7,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimeTable {
    primes: Vec<u32>,
    bound: u32,
}

impl PrimeTable {
    /// All primes `<= bound`. A bound below 2 yields no primes and is an error.
    pub fn generate(bound: u32) -> Result<Self> {
        let primes = wheel_sieve(bound);
        if primes.is_empty() {
            return Err(PowError::EmptyPrimeTable(bound));
        }
        Ok(PrimeTable { primes, bound })
    }

    /// Shared table up to [`PRIME_TABLE_LIMIT`], built on first use.
    pub fn global() -> &'static PrimeTable {
        static TABLE: OnceLock<PrimeTable> = OnceLock::new();
        TABLE.get_or_init(|| PrimeTable {
            primes: wheel_sieve(PRIME_TABLE_LIMIT),
            bound: PRIME_TABLE_LIMIT,
        })
    }

    pub fn primes(&self) -> &[u32] {
        &self.primes
    }

    pub fn len(&self) -> usize {
        self.primes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }

    pub fn bound(&self) -> u32 {
        self.bound
    }

    /// Prime at table index `index` (0 → 2).
    pub fn get(&self, index: usize) -> Option<u32> {
        self.primes.get(index).copied()
    }

    pub fn largest(&self) -> u32 {
        self.primes.last().copied().unwrap_or(0)
    }

    /// Table index of `p` if it is a table prime.
    pub fn index_of(&self, p: u32) -> Option<usize> {
        self.primes.binary_search(&p).ok()
    }

    /// Smallest table prime strictly greater than `p`.
    pub fn next_prime(&self, p: u32) -> Option<u32> {
        let idx = self.primes.partition_point(|&q| q <= p);
        self.primes.get(idx).copied()
    }

    /// Largest table prime strictly less than `p`.
    pub fn previous_prime(&self, p: u32) -> Option<u32> {
        if p > self.bound.saturating_add(1) {
            return None;
        }
        let idx = self.primes.partition_point(|&q| q < p);
        idx.checked_sub(1).map(|i| self.primes[i])
    }

    /// `p#`: product of all table primes `<= p`.
    pub fn primorial(&self, p: u32) -> Integer {
        let mut result = Integer::from(1);
        for &q in self.primes.iter().take_while(|&&q| q <= p) {
            result *= q;
        }
        result
    }

    /// Smallest primorial `>= bound`, walking the table upward from 2.
    pub fn primorial_at_least(&self, bound: &Integer) -> Option<Integer> {
        let mut result = Integer::from(1);
        for &p in &self.primes {
            result *= p;
            if result >= *bound {
                return Some(result);
            }
        }
        None
    }

    /// Render `origin` as `cofactor*p#` where `p#` is the largest primorial
    /// dividing it. Origins not divisible by 2 render as the plain number.
    pub fn primorial_form(&self, origin: &Integer) -> String {
        if *origin == 0 {
            return "0".to_string();
        }
        let mut cofactor = origin.clone();
        let mut last = None;
        for &p in &self.primes {
            if !cofactor.is_divisible_u(p) {
                break;
            }
            cofactor.div_exact_u_mut(p);
            last = Some(p);
        }
        match last {
            Some(p) => format!("{}*{}#", cofactor, p),
            None => cofactor.to_string(),
        }
    }
}

/// Wheel-30 sieve returning all primes `<= limit` in ascending order.
fn wheel_sieve(limit: u32) -> Vec<u32> {
    if limit < 7 {
        return [2, 3, 5].into_iter().filter(|&p| p <= limit).collect();
    }

    let limit = limit as usize;
    let segments = limit / 30 + 1;
    // bit set = still considered prime
    let mut wheel = vec![0xFFu8; segments];
    let sqrt_limit = (limit as f64).sqrt() as usize + 1;

    for seg in 0..segments {
        if seg * 30 > sqrt_limit {
            break;
        }
        for (bit, &r) in RESIDUES.iter().enumerate() {
            let n = seg * 30 + r as usize;
            if n < 7 || n > sqrt_limit || wheel[seg] & (1 << bit) == 0 {
                continue;
            }
            let mut m = n * n;
            while m <= limit {
                let idx = RESIDUE_BIT[m % 30];
                if idx != 255 {
                    wheel[m / 30] &= !(1 << idx);
                }
                m += 2 * n;
            }
        }
    }

    let mut primes = Vec::with_capacity(estimate_prime_count(limit));
    primes.extend_from_slice(&[2, 3, 5]);
    for (seg, &byte) in wheel.iter().enumerate() {
        if byte == 0 {
            continue;
        }
        for (bit, &r) in RESIDUES.iter().enumerate() {
            let n = seg * 30 + r as usize;
            if byte & (1 << bit) != 0 && n > 5 && n <= limit {
                primes.push(n as u32);
            }
        }
    }
    primes
}

fn estimate_prime_count(n: usize) -> usize {
    if n < 10 {
        return 4;
    }
    let nf = n as f64;
    (1.3 * nf / nf.ln()) as usize
}
