//! # Main: CLI Entry Point
//!
//! Two subcommands share one binary:
//!
//! - `check <start> <iterations> <coefficients>...` scans a fixed recurrence
//!   over an index range and prints every counterexample.
//! - `find <iterations> <coefficients>...` walks coefficient vectors from the
//!   given one onward and reports those whose first pseudoprime is large.
//!
//! ## Global Options
//!
//! - `--mr-rounds`: Miller–Rabin iterations for the primality oracle (default 25).
//! - `--threads`: Rayon thread pool size (default: all cores; 1 = sequential).
//! - `--wide`: use 128-bit words instead of 64-bit.
//! - `--checkpoint`: JSON file for resumable search state.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cfinite::params::{
    CheckConfig, FindConfig, DEFAULT_MAX_COEFF, DEFAULT_REPORT_LIMIT, DEFAULT_SEARCH_LIMIT,
};
use cfinite::DEFAULT_MR_ROUNDS;

use cli::SearchOptions;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "cfinite",
    version,
    about = "Compute C-finite sequences and hunt for pseudoprimes of Perrin-style primality tests"
)]
struct Cli {
    /// Miller-Rabin rounds for the primality oracle
    #[arg(long, global = true, default_value_t = DEFAULT_MR_ROUNDS)]
    mr_rounds: u32,

    /// Number of rayon worker threads (defaults to all logical cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Use 128-bit words for matrix entries, indices and coefficients
    #[arg(long, global = true)]
    wide: bool,

    /// Path to checkpoint file for resuming searches
    #[arg(long, global = true)]
    checkpoint: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the pseudoprimes of a Perrin-style primality test.
    ///
    /// Try: cfinite check 1 500000 0 1 1
    Check {
        /// First index to check (0 starts at 1)
        start: u128,
        /// Number of indices to check
        iterations: u128,
        /// Recurrence coefficients c0 c1 ... (the order is their count)
        #[arg(required = true, num_args = 1..)]
        coefficients: Vec<u128>,
    },
    /// Find good Perrin-style primality tests by brute-force searching over coefficients.
    ///
    /// The search begins with the given list and continues through lists of the
    /// same length whose entries are between 0 and --max-coeff.
    /// Try: cfinite find 1000 0 0 0
    Find {
        /// Number of coefficient vectors to try
        iterations: u64,
        /// Initial coefficient vector (the order is its length)
        #[arg(required = true, num_args = 1..)]
        coefficients: Vec<u128>,
        /// Search for pseudoprimes up to this index
        #[arg(short = 's', long, default_value_t = DEFAULT_SEARCH_LIMIT as u128)]
        search_limit: u128,
        /// Report vectors whose first pseudoprime exceeds this
        #[arg(short = 'r', long, default_value_t = DEFAULT_REPORT_LIMIT as u128)]
        report_limit: u128,
        /// Largest possible coefficient
        #[arg(short = 'm', long, default_value_t = DEFAULT_MAX_COEFF as u128)]
        max_coeff: u128,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // LOG_FORMAT=json for machine-readable logs, human-readable otherwise
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    cli::configure_rayon(cli.threads);

    let opts = SearchOptions {
        mr_rounds: cli.mr_rounds,
        checkpoint: cli.checkpoint,
    };
    match cli.command {
        Commands::Check {
            start,
            iterations,
            coefficients,
        } => {
            if cli.wide {
                let config = CheckConfig::<u128>::new(start, iterations, &coefficients)?;
                cli::run_check(&config, &opts)
            } else {
                let config = CheckConfig::<u64>::new(start, iterations, &coefficients)?;
                cli::run_check(&config, &opts)
            }
        }
        Commands::Find {
            iterations,
            coefficients,
            search_limit,
            report_limit,
            max_coeff,
        } => {
            if cli.wide {
                let config = FindConfig::<u128>::new(
                    iterations,
                    &coefficients,
                    max_coeff,
                    search_limit,
                    report_limit,
                )?;
                cli::run_find(&config, &opts)
            } else {
                let config = FindConfig::<u64>::new(
                    iterations,
                    &coefficients,
                    max_coeff,
                    search_limit,
                    report_limit,
                )?;
                cli::run_find(&config, &opts)
            }
        }
    }
}
