//! # Miner — Prime Chain Search Orchestration
//!
//! Searches for a multiplier whose chain origin `hash × multiplier` meets a
//! target, composing the [`Sieve`], the chain tests and the [`MinerTuner`].
//!
//! ## Round Structure
//!
//! ```text
//! Idle → BuildingSieve → Scanning → (Testing → Scanning)* → Found | Exhausted | Cancelled
//! ```
//!
//! Each round fixes a primorial `p#`, derives the fixed multiplier
//! `p# / gcd(p#, hash)`, rekeys the sieve to the next unused window of
//! variable multipliers for that primorial, weaves to the tuner's depth and
//! tests every surviving candidate. A candidate whose lengths meet the
//! target is re-validated exactly as consensus would before it is reported.
//!
//! ## Primorial Schedule
//!
//! After each drained round the primorial prime moves one table step:
//!
//! - no prime hit, or no candidates left → up
//! - every index survived the sieve → down
//! - otherwise keep the direction, and reverse it if the expected time per
//!   prime hit got worse than in the previous round
//!
//! It never drops below [`PRIMORIAL_MULTIPLIER_MIN`] and never rises so far
//! that origins could exceed 2^2000.
//!
//! ## Concurrency
//!
//! A [`MiningContext`] belongs to exactly one worker. [`mine_parallel`]
//! builds one per rayon worker and gives each a disjoint lane of windows;
//! the only shared state is the [`CancelToken`] and the [`Progress`]
//! atomics. Cancellation is polled before every candidate and while
//! weaving.

use rayon::prelude::*;
use rug::Integer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use crate::chain::{ChainLengths, ChainType};
use crate::error::Result;
use crate::header::HeaderHash;
use crate::params::ConsensusParams;
use crate::primality::{grow_chain_with, PrimalityMode, TrialDivision};
use crate::prime_table::PrimeTable;
use crate::progress::Progress;
use crate::sieve::{Sieve, MAX_SIEVE_SIZE};
use crate::target;
use crate::tuner::{estimate_candidate_prime_probability, MinerTuner, PRIMORIAL_MULTIPLIER_MIN};
use crate::validate::{self, serialize_decimal, PRIME_MAX_BITS};

/// Miner settings, loadable from the `[miner]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinerConfig {
    /// Candidate indices per sieve round.
    pub sieve_size: usize,
    /// Trial-division bound for early chain links (0 disables it).
    pub trial_division_limit: u32,
    /// Stop after this many rounds; `None` mines until found or cancelled.
    pub max_rounds: Option<u64>,
    /// Wall-clock limit for weaving one sieve.
    pub sieve_round_limit_ms: u64,
    /// Starting primorial prime.
    pub primorial_prime: u32,
    /// Starting weave depth override (prime table index).
    pub weave_depth: Option<usize>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        MinerConfig {
            sieve_size: MAX_SIEVE_SIZE,
            trial_division_limit: 0,
            max_rounds: None,
            sieve_round_limit_ms: 3000,
            primorial_prime: PRIMORIAL_MULTIPLIER_MIN,
            weave_depth: None,
        }
    }
}

/// One header to mine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningWork {
    pub header_hash: HeaderHash,
    pub bits: u32,
    pub mode: PrimalityMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningState {
    Idle,
    BuildingSieve,
    Scanning,
    Testing,
    Found,
    Exhausted,
    Cancelled,
}

impl fmt::Display for MiningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MiningState::Idle => "idle",
            MiningState::BuildingSieve => "building_sieve",
            MiningState::Scanning => "scanning",
            MiningState::Testing => "testing",
            MiningState::Found => "found",
            MiningState::Exhausted => "exhausted",
            MiningState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Counters for one mining attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MiningStats {
    pub rounds: u64,
    pub tests: u64,
    pub primes_hit: u64,
    pub candidates: u64,
    /// Longest length word measured.
    pub best_length: u32,
    pub primorial_prime: u32,
    pub weave_depth: usize,
}

impl MiningStats {
    fn merge(&mut self, other: &MiningStats) {
        self.rounds += other.rounds;
        self.tests += other.tests;
        self.primes_hit += other.primes_hit;
        self.candidates += other.candidates;
        self.best_length = self.best_length.max(other.best_length);
        self.primorial_prime = self.primorial_prime.max(other.primorial_prime);
        self.weave_depth = self.weave_depth.max(other.weave_depth);
    }
}

/// A validated chain for the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinedChain {
    pub header_hash: HeaderHash,
    pub bits: u32,
    /// Full multiplier to embed in the header: fixed × variable.
    #[serde(serialize_with = "serialize_decimal")]
    pub multiplier: Integer,
    pub chain_type: ChainType,
    pub chain_length: u32,
    pub lengths: ChainLengths,
    #[serde(serialize_with = "serialize_decimal")]
    pub origin: Integer,
    pub stats: MiningStats,
}

impl MinedChain {
    pub fn chain_name(&self) -> String {
        self.chain_type.chain_name(self.chain_length)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningOutcome {
    Found(MinedChain),
    Exhausted(MiningStats),
    Cancelled,
}

/// Cooperative cancellation flag. A child token is cancelled with its
/// parent, but cancelling the child leaves the parent untouched.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<AtomicBool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Arc::clone(&self.flag)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self
                .parent
                .as_ref()
                .is_some_and(|p| p.load(Ordering::Relaxed))
    }
}

/// Primorial step state kept across rounds.
#[derive(Debug, Clone)]
struct PrimorialSchedule {
    prime: u32,
    increasing: bool,
    last_cost: Option<f64>,
    /// Next window counter per primorial prime (reset for every header).
    windows: HashMap<u32, u64>,
}

impl PrimorialSchedule {
    fn new(table: &PrimeTable, prime: u32) -> Self {
        let prime = if table.index_of(prime).is_some() {
            prime.max(PRIMORIAL_MULTIPLIER_MIN)
        } else {
            table
                .previous_prime(prime)
                .unwrap_or(PRIMORIAL_MULTIPLIER_MIN)
                .max(PRIMORIAL_MULTIPLIER_MIN)
        };
        PrimorialSchedule {
            prime,
            increasing: true,
            last_cost: None,
            windows: HashMap::new(),
        }
    }

    fn next_window(&mut self) -> u64 {
        let counter = self.windows.entry(self.prime).or_insert(0);
        let window = *counter;
        *counter += 1;
        window
    }

    fn step(&mut self, table: &PrimeTable, header_bits: u32, up: bool) {
        if up {
            if let Some(next) = table.next_prime(self.prime) {
                // hash bits + p# bits + 64-bit variable multiplier
                let bits = header_bits + table.primorial(next).significant_bits() + 64;
                if bits <= PRIME_MAX_BITS {
                    self.prime = next;
                }
            }
        } else if let Some(previous) = table.previous_prime(self.prime) {
            if previous >= PRIMORIAL_MULTIPLIER_MIN {
                self.prime = previous;
            }
        }
    }

    fn after_round(&mut self, table: &PrimeTable, header_bits: u32, round: &RoundReport) {
        if round.primes_hit == 0 || round.candidates == 0 {
            self.step(table, header_bits, true);
        } else if round.candidates >= round.capacity as u64 {
            self.step(table, header_bits, false);
        } else {
            let cost = round.elapsed_us as f64 / round.primes_hit as f64;
            if self.last_cost.is_some_and(|last| cost > last) {
                self.increasing = !self.increasing;
            }
            self.last_cost = Some(cost);
            let up = self.increasing;
            self.step(table, header_bits, up);
        }
    }
}

struct RoundReport {
    candidates: u64,
    capacity: usize,
    primes_hit: u64,
    elapsed_us: i64,
}

/// Exclusive per-worker mining state.
pub struct MiningContext<'t> {
    table: &'t PrimeTable,
    config: MinerConfig,
    tuner: MinerTuner,
    schedule: PrimorialSchedule,
    sieve: Option<Sieve<'t>>,
    lane: u64,
    lanes: u64,
    epoch: Instant,
    state: MiningState,
}

impl<'t> MiningContext<'t> {
    pub fn new(table: &'t PrimeTable, config: MinerConfig) -> Self {
        let mut tuner = MinerTuner::new(table);
        if let Some(depth) = config.weave_depth {
            tuner.set_weave_depth(depth);
        }
        let schedule = PrimorialSchedule::new(table, config.primorial_prime);
        MiningContext {
            table,
            config,
            tuner,
            schedule,
            sieve: None,
            lane: 0,
            lanes: 1,
            epoch: Instant::now(),
            state: MiningState::Idle,
        }
    }

    /// Restrict this context to windows `lane, lane + lanes, …`.
    pub fn with_lane(mut self, lane: u64, lanes: u64) -> Self {
        self.lanes = lanes.max(1);
        self.lane = lane % self.lanes;
        self
    }

    pub fn tuner(&self) -> &MinerTuner {
        &self.tuner
    }

    pub fn primorial_prime(&self) -> u32 {
        self.schedule.prime
    }

    pub fn state(&self) -> MiningState {
        self.state
    }

    fn transition(&mut self, next: MiningState) {
        if self.state != next {
            trace!(from = %self.state, to = %next, "mining state");
            self.state = next;
        }
    }

    fn now_us(&self) -> i64 {
        self.epoch.elapsed().as_micros() as i64
    }

    fn finish(&mut self, state: MiningState, outcome: MiningOutcome) -> Result<MiningOutcome> {
        self.transition(state);
        self.transition(MiningState::Idle);
        Ok(outcome)
    }
}

/// Mine one header on the calling thread until a chain is found, the round
/// budget is spent, or `cancel` fires.
pub fn mine_probable_prime_chain(
    ctx: &mut MiningContext<'_>,
    work: &MiningWork,
    params: &ConsensusParams,
    cancel: &CancelToken,
    progress: &Progress,
) -> Result<MiningOutcome> {
    validate::check_target_range(work.bits, params)?;
    validate::check_v02_compatibility(&work.header_hash)?;

    let table = ctx.table;
    let hash_integer = work.header_hash.to_integer();
    let hash_bits = hash_integer.significant_bits();
    let capacity = ctx.config.sieve_size.clamp(1, MAX_SIEVE_SIZE);
    let round_limit = Duration::from_millis(ctx.config.sieve_round_limit_ms);
    let trial = (ctx.config.trial_division_limit > 0).then(|| TrialDivision {
        table,
        limit: ctx.config.trial_division_limit,
        target_length: target::decode_length(work.bits),
    });
    ctx.schedule.windows.clear();
    let mut stats = MiningStats::default();
    progress.set_current(format!(
        "{} @ {}",
        target::format_target(work.bits),
        work.header_hash
    ));

    loop {
        if cancel.is_cancelled() {
            return ctx.finish(MiningState::Cancelled, MiningOutcome::Cancelled);
        }
        if ctx.config.max_rounds.is_some_and(|max| stats.rounds >= max) {
            stats.primorial_prime = ctx.schedule.prime;
            stats.weave_depth = ctx.tuner.weave_depth();
            return ctx.finish(MiningState::Exhausted, MiningOutcome::Exhausted(stats));
        }

        // ── Build ───────────────────────────────────────────────────
        ctx.transition(MiningState::BuildingSieve);
        let round_start = ctx.now_us();
        let primorial = table.primorial(ctx.schedule.prime);
        let gcd = Integer::from(primorial.gcd_ref(&hash_integer));
        let fixed_multiplier = primorial / gcd;
        let window = ctx.schedule.next_window() * ctx.lanes + ctx.lane;
        let window_start = window * capacity as u64;

        if ctx.sieve.as_ref().is_some_and(|s| s.capacity() != capacity) {
            ctx.sieve = None;
        }
        let sieve = ctx.sieve.get_or_insert_with(|| {
            Sieve::new(table, capacity, work.bits, work.header_hash, &fixed_multiplier)
        });
        sieve.set_target(work.bits);
        sieve.reset(work.header_hash, &fixed_multiplier, window_start);
        let depth = ctx.tuner.weave_depth();
        sieve.set_weave_depth(depth);

        let weave_start = Instant::now();
        while sieve.primes_woven() + 1 < depth {
            if sieve.primes_woven() % 64 == 0
                && (cancel.is_cancelled() || weave_start.elapsed() > round_limit)
            {
                break;
            }
            if !sieve.weave() {
                break;
            }
        }
        if cancel.is_cancelled() {
            return ctx.finish(MiningState::Cancelled, MiningOutcome::Cancelled);
        }
        // Time the last prime against the composites it removed.
        let before = sieve.candidate_count() as u64;
        let last_start = Instant::now();
        if sieve.weave() {
            let cost = last_start.elapsed().as_micros() as i64;
            let after = sieve.candidate_count() as u64;
            ctx.tuner.record_weave_cost(cost, before.saturating_sub(after));
        }
        let candidates = sieve.candidate_count() as u64;
        let fixed_factor = sieve.fixed_factor().clone();
        let woven = sieve.primes_woven();
        let weave_prime = sieve.weaved_prime().unwrap_or(2);
        let sieve_ready = ctx.epoch.elapsed().as_micros() as i64;
        ctx.tuner.record_sieve_ready(candidates, sieve_ready);
        debug!(
            round = stats.rounds,
            primorial = ctx.schedule.prime,
            window,
            woven,
            candidates,
            link_probability = estimate_candidate_prime_probability(table, ctx.schedule.prime, weave_prime, capacity),
            "sieve ready"
        );

        // ── Scan ────────────────────────────────────────────────────
        ctx.transition(MiningState::Scanning);
        let mut round_hits = 0u64;
        loop {
            if cancel.is_cancelled() {
                return ctx.finish(MiningState::Cancelled, MiningOutcome::Cancelled);
            }
            let next = ctx.sieve.as_mut().and_then(|s| s.next_candidate());
            let Some((variable, _)) = next else {
                break;
            };
            ctx.transition(MiningState::Testing);
            let origin = Integer::from(&fixed_factor * variable);
            let lengths = grow_chain_with(&origin, work.mode, trial);
            stats.tests += 1;
            progress.tests.fetch_add(1, Ordering::Relaxed);
            if lengths.longest_integer() >= 1 {
                round_hits += 1;
                progress.primes_hit.fetch_add(1, Ordering::Relaxed);
            }
            stats.best_length = stats.best_length.max(lengths.longest());
            progress.record_length(lengths.longest());

            if lengths.meets(work.bits) {
                let multiplier = Integer::from(&fixed_multiplier * variable);
                match validate::check_proof_of_work(&work.header_hash, work.bits, &multiplier, params, work.mode) {
                    Ok(proof) => {
                        stats.rounds += 1;
                        stats.primes_hit += round_hits;
                        stats.candidates += candidates;
                        stats.primorial_prime = ctx.schedule.prime;
                        stats.weave_depth = ctx.tuner.weave_depth();
                        progress.found.fetch_add(1, Ordering::Relaxed);
                        let mined = MinedChain {
                            header_hash: work.header_hash,
                            bits: work.bits,
                            multiplier,
                            chain_type: proof.chain_type,
                            chain_length: proof.chain_length,
                            lengths: proof.lengths,
                            origin: proof.origin,
                            stats,
                        };
                        info!(
                            chain = %mined.chain_name(),
                            primorial = ctx.schedule.prime,
                            tests = mined.stats.tests,
                            "prime chain found"
                        );
                        return ctx.finish(MiningState::Found, MiningOutcome::Found(mined));
                    }
                    Err(e) if e.is_chain_failure() => {
                        debug!(error = %e, "candidate rejected by validation");
                    }
                    Err(e) => return Err(e),
                }
            }
            ctx.transition(MiningState::Scanning);
        }

        // ── Tune ────────────────────────────────────────────────────
        let done = ctx.now_us();
        ctx.tuner.record_tests_done(done);
        ctx.tuner.adjust_weave_depth();
        let report = RoundReport {
            candidates,
            capacity,
            primes_hit: round_hits,
            elapsed_us: done - round_start,
        };
        ctx.schedule.after_round(table, hash_bits, &report);

        stats.rounds += 1;
        stats.primes_hit += round_hits;
        stats.candidates += candidates;
        progress.rounds.fetch_add(1, Ordering::Relaxed);
        debug!(
            round = stats.rounds,
            primes_hit = round_hits,
            test_cost_us = ctx.tuner.primality_test_cost(),
            next_depth = ctx.tuner.weave_depth(),
            next_primorial = ctx.schedule.prime,
            "sieve round drained"
        );
    }
}

/// Mine one header on `workers` rayon workers, each with its own context
/// and window lane. The first chain found cancels the others.
pub fn mine_parallel(
    work: &MiningWork,
    params: &ConsensusParams,
    config: &MinerConfig,
    workers: usize,
    cancel: &CancelToken,
    progress: &Progress,
) -> Result<MiningOutcome> {
    let workers = workers.max(1) as u64;
    let table = PrimeTable::global();
    let siblings = cancel.child();

    let outcomes: Vec<Result<MiningOutcome>> = (0..workers)
        .into_par_iter()
        .map(|lane| {
            let mut ctx = MiningContext::new(table, config.clone()).with_lane(lane, workers);
            let outcome = mine_probable_prime_chain(&mut ctx, work, params, &siblings, progress);
            if matches!(outcome, Ok(MiningOutcome::Found(_))) {
                siblings.cancel();
            }
            outcome
        })
        .collect();

    let mut exhausted: Option<MiningStats> = None;
    let mut cancelled = false;
    let mut first_error = None;
    for outcome in outcomes {
        match outcome {
            Ok(MiningOutcome::Found(mined)) => return Ok(MiningOutcome::Found(mined)),
            Ok(MiningOutcome::Exhausted(stats)) => {
                exhausted.get_or_insert_with(MiningStats::default).merge(&stats);
            }
            Ok(MiningOutcome::Cancelled) => cancelled = true,
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }
    match exhausted {
        Some(stats) if !cancelled => Ok(MiningOutcome::Exhausted(stats)),
        _ => Ok(MiningOutcome::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PowError;

    const FIXTURE_HASH: &str = "9e2feb89414c343c1027c4d1c386bbc4cd613e30d8f16adf91b7584a2265b1f5";

    fn work(bits: u32) -> MiningWork {
        MiningWork {
            header_hash: HeaderHash::from_hex(FIXTURE_HASH).unwrap(),
            bits,
            mode: PrimalityMode::Strict,
        }
    }

    fn small_config() -> MinerConfig {
        MinerConfig {
            sieve_size: 20_000,
            weave_depth: Some(200),
            ..MinerConfig::default()
        }
    }

    #[test]
    fn finds_short_chain_and_it_validates() {
        let params = ConsensusParams::testnet();
        let mut ctx = MiningContext::new(PrimeTable::global(), small_config());
        let progress = Progress::new();
        let work = work(0x02000000);
        let outcome = mine_probable_prime_chain(&mut ctx, &work, &params, &CancelToken::new(), &progress).unwrap();
        let MiningOutcome::Found(mined) = outcome else {
            panic!("expected a chain, got {:?}", outcome);
        };
        assert!(mined.chain_length >= 0x02000000);
        let proof = validate::check_proof_of_work(&work.header_hash, work.bits, &mined.multiplier, &params, work.mode).unwrap();
        assert_eq!(proof.chain_type, mined.chain_type);
        assert_eq!(proof.origin, mined.origin);
        assert!(mined.stats.tests >= 1);
        assert_eq!(progress.found.load(Ordering::Relaxed), 1);
        assert_eq!(ctx.state(), MiningState::Idle);
    }

    #[test]
    fn cancelled_before_start() {
        let params = ConsensusParams::testnet();
        let mut ctx = MiningContext::new(PrimeTable::global(), small_config());
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = mine_probable_prime_chain(&mut ctx, &work(0x02000000), &params, &cancel, &Progress::new()).unwrap();
        assert_eq!(outcome, MiningOutcome::Cancelled);
    }

    #[test]
    fn cancel_during_scan_stops_within_one_test() {
        let params = ConsensusParams::testnet();
        let config = MinerConfig {
            weave_depth: Some(5),
            ..small_config()
        };
        let cancel = CancelToken::new();
        let progress = Progress::new();
        let handle = {
            let cancel = cancel.clone();
            let progress = Arc::clone(&progress);
            std::thread::spawn(move || {
                let mut ctx = MiningContext::new(PrimeTable::global(), config);
                let outcome = mine_probable_prime_chain(&mut ctx, &work(0x0a000000), &params, &cancel, &progress);
                (outcome, ctx.state())
            })
        };

        let deadline = Instant::now() + Duration::from_secs(60);
        while progress.tests.load(Ordering::Relaxed) < 100 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        let before = progress.tests.load(Ordering::Relaxed);
        assert!(before > 0, "scan never started");
        cancel.cancel();
        let (outcome, state) = handle.join().unwrap();
        let after = progress.tests.load(Ordering::Relaxed);

        assert_eq!(outcome.unwrap(), MiningOutcome::Cancelled);
        assert_eq!(state, MiningState::Cancelled);
        assert!(after - before <= 2, "{} tests ran after cancel", after - before);
    }

    #[test]
    fn round_budget_exhausts() {
        let params = ConsensusParams::testnet();
        // a shallow weave leaves candidates; a length-5 chain in two small
        // windows is out of reach
        let config = MinerConfig {
            sieve_size: 2_000,
            max_rounds: Some(2),
            weave_depth: Some(5),
            ..small_config()
        };
        let mut ctx = MiningContext::new(PrimeTable::global(), config);
        let outcome =
            mine_probable_prime_chain(&mut ctx, &work(0x05000000), &params, &CancelToken::new(), &Progress::new()).unwrap();
        let MiningOutcome::Exhausted(stats) = outcome else {
            panic!("expected exhaustion, got {:?}", outcome);
        };
        assert_eq!(stats.rounds, 2);
        assert!(stats.tests > 0);
        assert!(stats.primorial_prime >= PRIMORIAL_MULTIPLIER_MIN);
    }

    #[test]
    fn rejects_bad_work() {
        let params = ConsensusParams::mainnet();
        let mut ctx = MiningContext::new(PrimeTable::global(), small_config());
        let err = mine_probable_prime_chain(&mut ctx, &work(0x02000000), &params, &CancelToken::new(), &Progress::new())
            .unwrap_err();
        assert!(matches!(err, PowError::TargetOutOfRange { .. }));

        let low = MiningWork {
            header_hash: HeaderHash::from_integer(&Integer::from(12345)).unwrap(),
            ..work(0x07000000)
        };
        let err = mine_probable_prime_chain(&mut ctx, &low, &params, &CancelToken::new(), &Progress::new()).unwrap_err();
        assert_eq!(err, PowError::HeaderHashBelowLimit);
    }

    #[test]
    fn child_token_follows_parent_only() {
        let parent = CancelToken::new();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn schedule_steps_and_respects_floor() {
        let table = PrimeTable::global();
        let mut schedule = PrimorialSchedule::new(table, 2);
        assert_eq!(schedule.prime, PRIMORIAL_MULTIPLIER_MIN);
        let saturated = RoundReport {
            candidates: 100,
            capacity: 100,
            primes_hit: 5,
            elapsed_us: 1000,
        };
        schedule.after_round(table, 256, &saturated);
        assert_eq!(schedule.prime, PRIMORIAL_MULTIPLIER_MIN);

        let barren = RoundReport {
            candidates: 50,
            capacity: 100,
            primes_hit: 0,
            elapsed_us: 1000,
        };
        schedule.after_round(table, 256, &barren);
        assert_eq!(schedule.prime, 11);
        schedule.after_round(table, 256, &saturated);
        assert_eq!(schedule.prime, 7);
    }

    #[test]
    fn schedule_reverses_when_cost_rises() {
        let table = PrimeTable::global();
        let mut schedule = PrimorialSchedule::new(table, 13);
        let round = |hits| RoundReport {
            candidates: 50,
            capacity: 100,
            primes_hit: hits,
            elapsed_us: 1000,
        };
        schedule.after_round(table, 256, &round(10));
        assert_eq!(schedule.prime, 17);
        // fewer hits for the same time: cost rose, so turn around
        schedule.after_round(table, 256, &round(5));
        assert_eq!(schedule.prime, 13);
    }

    #[test]
    fn schedule_caps_origin_size() {
        let table = PrimeTable::global();
        let mut schedule = PrimorialSchedule::new(table, 7);
        let barren = RoundReport {
            candidates: 0,
            capacity: 100,
            primes_hit: 0,
            elapsed_us: 1,
        };
        for _ in 0..1000 {
            schedule.after_round(table, 256, &barren);
        }
        let bits = 256 + table.primorial(schedule.prime).significant_bits() + 64;
        assert!(bits <= PRIME_MAX_BITS);
        let next = table.next_prime(schedule.prime).unwrap();
        assert!(256 + table.primorial(next).significant_bits() + 64 > PRIME_MAX_BITS);
    }

    #[test]
    fn lanes_use_disjoint_windows() {
        let table = PrimeTable::global();
        let mut a = MiningContext::new(table, small_config()).with_lane(0, 2);
        let mut b = MiningContext::new(table, small_config()).with_lane(1, 2);
        let wa: Vec<u64> = (0..3).map(|_| a.schedule.next_window() * a.lanes + a.lane).collect();
        let wb: Vec<u64> = (0..3).map(|_| b.schedule.next_window() * b.lanes + b.lane).collect();
        assert_eq!(wa, vec![0, 2, 4]);
        assert_eq!(wb, vec![1, 3, 5]);
    }

    #[test]
    fn config_defaults_and_toml() {
        let config: MinerConfig = toml::from_str("sieve_size = 5000\nmax_rounds = 3").unwrap();
        assert_eq!(config.sieve_size, 5000);
        assert_eq!(config.max_rounds, Some(3));
        assert_eq!(config.primorial_prime, PRIMORIAL_MULTIPLIER_MIN);
        assert!(toml::from_str::<MinerConfig>("sieve = 1").is_err());
    }
}
