//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Contains the
//! execution logic for each subcommand and the rayon configuration.

use anyhow::{Context, Result};
use primechain::config::{self, Config};
use primechain::progress::Progress;
use primechain::{
    check_proof_of_work, mine_parallel, target, CancelToken, ConsensusParams, HeaderHash,
    MiningOutcome, MiningWork, PrimeTable,
};
use rug::Integer;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use super::Cli;

pub struct MineArgs<'a> {
    pub hash: Option<&'a str>,
    pub header: Option<&'a str>,
    pub bits: &'a str,
    pub height: Option<u64>,
    pub max_rounds: Option<u64>,
    pub sieve_size: Option<usize>,
    pub trial_division_limit: Option<u32>,
    pub progress_interval: u64,
}

fn load_context(cli: &Cli) -> Result<(Config, ConsensusParams)> {
    let config = config::load_or_default(cli.config.as_deref())?;
    let params = config.consensus_params(cli.network)?;
    Ok((config, params))
}

fn parse_bits(bits: &str) -> Result<u32> {
    target::parse_target(bits).with_context(|| format!("parsing target {:?}", bits))
}

fn parse_integer(value: &str, what: &str) -> Result<Integer> {
    value
        .trim()
        .parse::<Integer>()
        .with_context(|| format!("{} must be a decimal integer, got {:?}", what, value))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Mining ──────────────────────────────────────────────────────

pub fn run_mine(cli: &Cli, args: &MineArgs<'_>) -> Result<()> {
    let (mut config, params) = load_context(cli)?;
    if let Some(max_rounds) = args.max_rounds {
        config.miner.max_rounds = Some(max_rounds);
    }
    if let Some(sieve_size) = args.sieve_size {
        config.miner.sieve_size = sieve_size;
    }
    if let Some(limit) = args.trial_division_limit {
        config.miner.trial_division_limit = limit;
    }

    let header_hash = match (args.hash, args.header) {
        (Some(hash), _) => HeaderHash::from_hex(hash)?,
        (None, Some(header)) => {
            let bytes = hex::decode(header.trim()).context("decoding --header hex")?;
            HeaderHash::from_header_bytes(&bytes)
        }
        (None, None) => anyhow::bail!("one of --hash or --header is required"),
    };
    let bits = parse_bits(args.bits)?;
    let mode = params.primality_mode(args.height.unwrap_or(u64::MAX));
    let work = MiningWork {
        header_hash,
        bits,
        mode,
    };

    let workers = rayon::current_num_threads();
    info!(
        network = %params.network,
        target = %target::format_target(bits),
        hash = %header_hash,
        workers,
        sieve_size = config.miner.sieve_size,
        "primechain mining"
    );

    let progress = Progress::new();
    let reporter_handle = progress.start_reporter(Duration::from_secs(args.progress_interval.max(1)));
    let cancel = CancelToken::new();
    let outcome = mine_parallel(&work, &params, &config.miner, workers, &cancel, &progress);
    progress.stop();
    let _ = reporter_handle.join();

    match outcome? {
        MiningOutcome::Found(mined) => {
            if cli.json {
                print_json(&mined)?;
            } else {
                println!("chain:      {}", mined.chain_name());
                println!("multiplier: {}", mined.multiplier);
                println!("origin:     {}", PrimeTable::global().primorial_form(&mined.origin));
                println!("lengths:    {}", mined.lengths);
                println!("tests:      {}", mined.stats.tests);
            }
            Ok(())
        }
        MiningOutcome::Exhausted(stats) => {
            if cli.json {
                print_json(&serde_json::json!({ "found": false, "stats": stats }))?;
            }
            anyhow::bail!(
                "no chain found after {} rounds ({} tests, best {})",
                stats.rounds,
                stats.tests,
                target::format_target(stats.best_length)
            )
        }
        MiningOutcome::Cancelled => anyhow::bail!("mining cancelled"),
    }
}

// ── Validation ──────────────────────────────────────────────────

pub fn run_verify(cli: &Cli, hash: &str, bits: &str, multiplier: &str, height: Option<u64>) -> Result<()> {
    let (_, params) = load_context(cli)?;
    let header_hash = HeaderHash::from_hex(hash)?;
    let bits = parse_bits(bits)?;
    let multiplier = parse_integer(multiplier, "multiplier")?;
    let mode = params.primality_mode(height.unwrap_or(u64::MAX));

    match check_proof_of_work(&header_hash, bits, &multiplier, &params, mode) {
        Ok(proof) => {
            if cli.json {
                print_json(&serde_json::json!({ "valid": true, "proof": proof }))?;
            } else {
                println!("valid:   {}", proof.chain_name());
                println!("lengths: {}", proof.lengths);
                println!("origin:  {}", PrimeTable::global().primorial_form(&proof.origin));
            }
            Ok(())
        }
        Err(e) => {
            if cli.json {
                print_json(&serde_json::json!({ "valid": false, "error": e.to_string() }))?;
            }
            Err(anyhow::Error::new(e).context("proof of work rejected"))
        }
    }
}

// ── Difficulty ──────────────────────────────────────────────────

#[derive(Serialize)]
struct TargetReport {
    bits: String,
    word: String,
    difficulty: f64,
}

impl TargetReport {
    fn new(bits: u32) -> Self {
        TargetReport {
            bits: target::format_target(bits),
            word: format!("{:#010x}", bits),
            difficulty: target::difficulty(bits),
        }
    }
}

pub fn run_next_target(
    cli: &Cli,
    bits: &str,
    actual_spacing: i64,
    interval: Option<i64>,
    target_spacing: Option<i64>,
) -> Result<()> {
    let (_, params) = load_context(cli)?;
    let bits = parse_bits(bits)?;
    let interval = interval.unwrap_or_else(|| params.retarget_interval());
    let target_spacing = target_spacing.unwrap_or(params.target_spacing);
    let next = target::next_target(bits, interval, target_spacing, actual_spacing, &params)?;

    if cli.json {
        print_json(&serde_json::json!({
            "previous": TargetReport::new(bits),
            "next": TargetReport::new(next),
        }))
    } else {
        println!("{} -> {}", target::format_target(bits), target::format_target(next));
        Ok(())
    }
}

pub fn run_difficulty(cli: &Cli, bits: &str) -> Result<()> {
    let report = TargetReport::new(parse_bits(bits)?);
    if cli.json {
        print_json(&report)
    } else {
        println!("{} {:.6}", report.bits, report.difficulty);
        Ok(())
    }
}

pub fn run_primorial_form(cli: &Cli, origin: &str) -> Result<()> {
    let origin = parse_integer(origin, "origin")?;
    let form = PrimeTable::global().primorial_form(&origin);
    if cli.json {
        print_json(&serde_json::json!({ "origin": origin.to_string(), "form": form }))
    } else {
        println!("{}", form);
        Ok(())
    }
}

// ── Rayon ───────────────────────────────────────────────────────

pub fn configure_rayon(threads: Option<usize>) {
    let num_threads = threads.unwrap_or(0);
    if num_threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
        {
            warn!(error = %e, "Could not configure rayon thread pool");
        }
    }
}
