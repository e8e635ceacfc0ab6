//! # Main — CLI Entry Point
//!
//! Routes subcommands to the proof-of-work engine. Shared concerns live
//! here: logging setup, `.env` loading, the config file and the rayon pool.
//!
//! ## Subcommands
//!
//! - `mine`: search a multiplier for a header hash and target.
//! - `verify`: full proof-of-work check of `(hash, bits, multiplier)`.
//! - `next-target`: retarget from an observed block spacing.
//! - `difficulty`: render a target word as a difficulty.
//! - `primorial-form`: render an origin as `cofactor*p#`.
//!
//! ## Global Options
//!
//! - `--network` / `PRIMECHAIN_NETWORK`: consensus preset (default main).
//! - `--config` / `PRIMECHAIN_CONFIG`: TOML file with `[miner]` and
//!   `[consensus]` sections.
//! - `--threads`: rayon pool size (defaults to all logical cores).
//! - `--json`: machine-readable output on stdout.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use primechain::Network;

#[derive(Parser)]
#[command(name = "primechain", about = "Mine and verify prime-chain proofs of work")]
struct Cli {
    /// Consensus network preset
    #[arg(long, env = "PRIMECHAIN_NETWORK", value_enum, global = true)]
    network: Option<Network>,

    /// TOML configuration file
    #[arg(long, env = "PRIMECHAIN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Number of rayon worker threads (defaults to all logical cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a prime chain on a block header
    Mine {
        /// Header hash, 64 hex digits most significant first
        #[arg(long, required_unless_present = "header", conflicts_with = "header")]
        hash: Option<String>,
        /// Serialized header (hex); hashed with double SHA-256
        #[arg(long)]
        header: Option<String>,
        /// Target as `LL.FFFFFF` or a hex word
        #[arg(long)]
        bits: String,
        /// Block height, selects the primality mode
        #[arg(long)]
        height: Option<u64>,
        /// Stop after this many sieve rounds
        #[arg(long)]
        max_rounds: Option<u64>,
        /// Candidates per sieve round
        #[arg(long)]
        sieve_size: Option<usize>,
        /// Trial-division bound for early chain links (0 disables)
        #[arg(long)]
        trial_division_limit: Option<u32>,
        /// Seconds between progress log lines
        #[arg(long, default_value_t = 30)]
        progress_interval: u64,
    },
    /// Check a proof of work
    Verify {
        /// Header hash, 64 hex digits most significant first
        #[arg(long)]
        hash: String,
        /// Target as `LL.FFFFFF` or a hex word
        #[arg(long)]
        bits: String,
        /// Decimal multiplier from the header
        #[arg(long)]
        multiplier: String,
        /// Block height, selects the primality mode
        #[arg(long)]
        height: Option<u64>,
    },
    /// Compute the target following a block
    NextTarget {
        /// Current target
        #[arg(long)]
        bits: String,
        /// Observed spacing of the last block, seconds
        #[arg(long, allow_hyphen_values = true)]
        actual_spacing: i64,
        /// Retarget interval in blocks (defaults to the network's)
        #[arg(long)]
        interval: Option<i64>,
        /// Desired spacing in seconds (defaults to the network's)
        #[arg(long)]
        target_spacing: Option<i64>,
    },
    /// Show the difficulty of a target
    Difficulty {
        /// Target as `LL.FFFFFF` or a hex word
        bits: String,
    },
    /// Render an origin as `cofactor*p#`
    PrimorialForm {
        /// Decimal origin
        origin: String,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // LOG_FORMAT=json for log shippers, human-readable otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    cli::configure_rayon(cli.threads);

    match &cli.command {
        Commands::Mine {
            hash,
            header,
            bits,
            height,
            max_rounds,
            sieve_size,
            trial_division_limit,
            progress_interval,
        } => {
            let args = cli::MineArgs {
                hash: hash.as_deref(),
                header: header.as_deref(),
                bits,
                height: *height,
                max_rounds: *max_rounds,
                sieve_size: *sieve_size,
                trial_division_limit: *trial_division_limit,
                progress_interval: *progress_interval,
            };
            cli::run_mine(&cli, &args)
        }
        Commands::Verify {
            hash,
            bits,
            multiplier,
            height,
        } => cli::run_verify(&cli, hash, bits, multiplier, *height),
        Commands::NextTarget {
            bits,
            actual_spacing,
            interval,
            target_spacing,
        } => cli::run_next_target(&cli, bits, *actual_spacing, *interval, *target_spacing),
        Commands::Difficulty { bits } => cli::run_difficulty(&cli, bits),
        Commands::PrimorialForm { origin } => cli::run_primorial_form(&cli, origin),
    }
}
