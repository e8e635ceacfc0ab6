//! # Tuner — Per-Worker Sieve/Test Balance
//!
//! Each mining worker owns one [`MinerTuner`]. After every sieve round it
//! compares what weaving one more prime costs with what that prime saves in
//! primality tests, and moves the weave depth (an index into the prime
//! table) by one step toward the cheaper side.
//!
//! - weave cost > composites flagged × average test cost → weave less
//! - otherwise → weave more
//!
//! The tuner never sees another worker's measurements.

use crate::prime_table::PrimeTable;

/// Smallest prime whose primorial may serve as the fixed multiplier.
pub const PRIMORIAL_MULTIPLIER_MIN: u32 = 7;

/// Starting weave depth (prime table index).
pub const SIEVE_WEAVE_INITIAL: usize = 1000;

/// e^γ, the Mertens' theorem constant.
const MERTENS_E_GAMMA: f64 = 1.781_072_417_990_198;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerTuner {
    shrink: bool,
    candidate_count: u64,
    sieve_ready_us: i64,
    primality_test_cost_us: i64,
    weave_depth: usize,
    table_len: usize,
}

impl MinerTuner {
    pub fn new(table: &PrimeTable) -> Self {
        let mut tuner = MinerTuner {
            shrink: true,
            candidate_count: 0,
            sieve_ready_us: 0,
            primality_test_cost_us: 0,
            weave_depth: SIEVE_WEAVE_INITIAL,
            table_len: table.len(),
        };
        tuner.weave_depth = tuner.bound_depth(SIEVE_WEAVE_INITIAL);
        tuner
    }

    fn bound_depth(&self, depth: usize) -> usize {
        depth.clamp(1, self.table_len.saturating_sub(1).max(1))
    }

    /// Cost of weaving the last prime against the tests it saved.
    pub fn record_weave_cost(&mut self, cost_us: i64, composites: u64) {
        let saved = (composites as i64).saturating_mul(self.primality_test_cost_us);
        self.shrink = cost_us > saved;
    }

    pub fn record_sieve_ready(&mut self, candidates: u64, timestamp_us: i64) {
        self.candidate_count = candidates;
        self.sieve_ready_us = timestamp_us;
    }

    /// Close the round: average test cost over the candidates of the round.
    /// Rounds with no candidates or a non-increasing clock are ignored.
    pub fn record_tests_done(&mut self, timestamp_us: i64) {
        if timestamp_us > self.sieve_ready_us && self.candidate_count > 0 {
            self.primality_test_cost_us =
                (timestamp_us - self.sieve_ready_us) / self.candidate_count as i64;
        }
    }

    /// Move the weave depth one table index in the hinted direction.
    pub fn adjust_weave_depth(&mut self) {
        let next = if self.shrink {
            self.weave_depth.saturating_sub(1)
        } else {
            self.weave_depth + 1
        };
        self.weave_depth = self.bound_depth(next);
    }

    pub fn weave_depth(&self) -> usize {
        self.weave_depth
    }

    pub fn set_weave_depth(&mut self, depth: usize) {
        self.weave_depth = self.bound_depth(depth);
    }

    /// Prime at the current weave depth.
    pub fn weave_optimal_prime(&self, table: &PrimeTable) -> u32 {
        table.get(self.weave_depth).unwrap_or_else(|| table.largest())
    }

    pub fn primality_test_cost(&self) -> i64 {
        self.primality_test_cost_us
    }

    pub fn shrink_hint(&self) -> bool {
        self.shrink
    }
}

/// Probability that one chain element of a sieved candidate is prime.
///
/// A random integer near `x` is prime with probability `1/ln x`; surviving a
/// sieve up to `weave_prime` raises that by `∏(1 − 1/p)⁻¹ ≈ e^γ·ln(weave_prime)`
/// (Mertens). Origins are `hash · primorial · m` with the hash ~2^256 and `m`
/// averaging half the sieve size.
pub fn estimate_candidate_prime_probability(
    table: &PrimeTable,
    primorial_prime: u32,
    weave_prime: u32,
    sieve_size: usize,
) -> f64 {
    let log_hash = 256.0 * std::f64::consts::LN_2;
    let log_fixed: f64 = table
        .primes()
        .iter()
        .take_while(|&&p| p <= primorial_prime)
        .map(|&p| (p as f64).ln())
        .sum();
    let log_multiplier = ((sieve_size / 2).max(1) as f64).ln();
    let log_origin = log_hash + log_fixed + log_multiplier;
    (MERTENS_E_GAMMA * (weave_prime.max(2) as f64).ln() / log_origin).min(1.0)
}
