//! # CLI Execution Functions
//!
//! Converts parsed arguments into validated configs, prints the run banner
//! and timestamps, and drives the checker or finder with a stdout sink and a
//! background progress reporter.

use anyhow::{Context, Result};
use cfinite::params::{CheckConfig, FindConfig};
use cfinite::progress::Progress;
use cfinite::report::{format_coefficients, timestamp, StdoutSink};
use cfinite::word::Word;
use cfinite::{checker, finder, RugOracle};
use std::fmt::Display;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Options shared by both subcommands.
pub struct SearchOptions {
    pub mr_rounds: u32,
    pub checkpoint: Option<PathBuf>,
}

fn say(line: impl Display) -> Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", line)
        .and_then(|()| out.flush())
        .context("writing to stdout")
}

pub fn run_check<W: Word>(config: &CheckConfig<W>, opts: &SearchOptions) -> Result<()> {
    let oracle = RugOracle {
        mr_rounds: opts.mr_rounds,
    };

    say(timestamp())?;
    say(format_args!(
        "ptc: checking terms {} to {}",
        config.start(),
        config.end()
    ))?;
    info!(params = %config.search_params(), threads = rayon::current_num_threads(), "check starting");

    let progress = Progress::new();
    let reporter = progress.start_reporter();
    let result = checker::run(
        config,
        &oracle,
        &mut StdoutSink,
        &progress,
        opts.checkpoint.as_deref(),
    );
    progress.stop();
    let _ = reporter.join();
    progress.print_status();

    let summary = result?;
    info!(
        evaluated = %summary.evaluated,
        counterexamples = summary.counterexamples,
        "check complete"
    );
    say(timestamp())
}

pub fn run_find<W: Word>(config: &FindConfig<W>, opts: &SearchOptions) -> Result<()> {
    let oracle = RugOracle {
        mr_rounds: opts.mr_rounds,
    };

    say(timestamp())?;
    say(format_args!(
        "ptf: checking {} recurrences starting from {}",
        config.iterations(),
        format_coefficients(config.coefficients())
    ))?;
    say(format_args!("MAX_COEFF is {}", config.max_coeff()))?;
    say(format_args!("SEARCH_LIMIT is {}", config.search_limit()))?;
    say(format_args!("REPORT_LIMIT is {}", config.report_limit()))?;
    info!(params = %config.search_params(), threads = rayon::current_num_threads(), "find starting");

    let progress = Progress::new();
    let reporter = progress.start_reporter();
    let result = finder::run(
        config,
        &oracle,
        &mut StdoutSink,
        &progress,
        opts.checkpoint.as_deref(),
    );
    progress.stop();
    let _ = reporter.join();
    progress.print_status();

    let summary = result?;
    info!(
        evaluated = summary.evaluated,
        reported = summary.reported,
        skipped = summary.skipped,
        exhausted = summary.exhausted,
        "find complete"
    );
    say(timestamp())
}

/// Configure the global rayon pool. `None` uses all logical cores.
pub fn configure_rayon(threads: Option<usize>) {
    let result = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.unwrap_or(0))
        .build_global();
    match result {
        Ok(()) => {
            if let Some(n) = threads {
                info!(threads = n, "rayon thread pool configured");
            }
        }
        Err(e) => {
            warn!(error = %e, "could not configure rayon thread pool");
        }
    }
}
