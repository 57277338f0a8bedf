//! # Checker: Scan One Recurrence for Pseudoprimes
//!
//! For every index `k` in `[max(start, 1), start + iterations)` the checker
//! evaluates `term(k) mod k` and compares it with `c[0] mod k`. Primes always
//! satisfy this congruence; an index that satisfies it but fails the
//! primality oracle is a counterexample. For the Perrin coefficients
//! `[0, 1, 1]` the first one is 271441 = 521².
//!
//! ## Blocks
//!
//! The range is cut into blocks that end on multiples of
//! [`CHECK_PROGRESS_INTERVAL`], so a progress marker can only fall on a block's
//! first index. Each block is evaluated in parallel with one [`Scratch`] per
//! rayon worker; results are collected in index order and emitted before the
//! next block starts, so the output matches a sequential scan line for line.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::info;

use crate::checkpoint::{self, Checkpoint};
use crate::params::CheckConfig;
use crate::progress::Progress;
use crate::recurrence::{Recurrence, Scratch};
use crate::report::{Event, ReportSink};
use crate::word::Word;
use crate::PrimalityOracle;

/// A `checking term` marker is emitted for indices divisible by this.
pub const CHECK_PROGRESS_INTERVAL: u64 = 100_000;

const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckSummary {
    /// Indices evaluated by this run (excluding any resumed prefix).
    pub evaluated: u128,
    pub counterexamples: u64,
}

/// End of the block that starts at `index`: the next multiple of `interval`,
/// capped at `end`.
fn block_end<W: Word>(index: W, end: W, interval: W) -> W {
    match (index - index % interval).checked_add(interval) {
        Some(next) => next.min(end),
        None => end,
    }
}

fn resume_index<W: Word>(config: &CheckConfig<W>, path: &Path) -> Option<W> {
    match checkpoint::load_matching(path, &config.search_params())? {
        Checkpoint::Check { next_index, .. } => {
            let next: W = next_index.parse().ok()?;
            (next >= config.first_index() && next <= config.end()).then_some(next)
        }
        Checkpoint::Find { .. } => None,
    }
}

pub fn run<W: Word>(
    config: &CheckConfig<W>,
    oracle: &dyn PrimalityOracle,
    sink: &mut dyn ReportSink,
    progress: &Progress,
    checkpoint_path: Option<&Path>,
) -> Result<CheckSummary> {
    let rec = Recurrence::new(config.coefficients())?;
    let order = rec.order();
    let interval = W::from_u64(CHECK_PROGRESS_INTERVAL);

    let mut index = match checkpoint_path.and_then(|p| resume_index(config, p)) {
        Some(next) => {
            info!(next_index = %next, "resuming check from checkpoint");
            next
        }
        None => config.first_index(),
    };

    let mut summary = CheckSummary::default();
    let mut last_checkpoint = Instant::now();

    while index < config.end() {
        let end = block_end(index, config.end(), interval);
        let len = (end - index).to_u128() as u64;

        if index % interval == W::ZERO {
            sink.emit(Event::CheckProgress {
                index: index.to_u128(),
            })
            .context("writing progress marker")?;
        }
        progress.set_current(format!("terms [{}..{})", index, end));

        let found: Vec<u128> = (0..len)
            .into_par_iter()
            .map_init(
                || Scratch::new(order),
                |scratch, offset| {
                    let k = index + W::from_u64(offset);
                    (rec.satisfies_congruence(k, scratch) && !oracle.is_probably_prime(k.to_u128()))
                        .then(|| k.to_u128())
                },
            )
            .flatten()
            .collect();

        progress.tested.fetch_add(len, Ordering::Relaxed);
        progress.found.fetch_add(found.len() as u64, Ordering::Relaxed);
        summary.evaluated += len as u128;
        summary.counterexamples += found.len() as u64;
        for k in found {
            sink.emit(Event::Counterexample { index: k })
                .context("writing counterexample")?;
        }

        index = end;

        if let Some(path) = checkpoint_path {
            if last_checkpoint.elapsed() >= CHECKPOINT_INTERVAL {
                checkpoint::save(
                    path,
                    &Checkpoint::Check {
                        next_index: index.to_string(),
                        search_params: config.search_params(),
                    },
                )?;
                info!(next_index = %index, "checkpoint saved");
                last_checkpoint = Instant::now();
            }
        }
    }

    if let Some(path) = checkpoint_path {
        checkpoint::clear(path);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    //! Tests for the range checker driver.
    //!
    //! Uses an exact trial-division oracle so counterexample lists are fully
    //! determined: the order-1 recurrence `[2]` turns the congruence into the
    //! base-2 Fermat test, whose pseudoprimes below 2000 are well known.
    //! Also covers block alignment of progress markers, the index-1 edge
    //! case, thread-count independence of the output, and that a failing
    //! sink aborts the scan.

    use super::*;
    use crate::report::EventLog;
    use std::io;

    /// Exact primality by trial division, for small test ranges.
    struct TrialDivision;

    impl PrimalityOracle for TrialDivision {
        fn is_probably_prime(&self, n: u128) -> bool {
            if n < 2 {
                return false;
            }
            (2..).take_while(|d| d * d <= n).all(|d| n % d != 0)
        }
    }

    fn check(start: u128, iterations: u128, coeffs: &[u128]) -> (CheckSummary, EventLog) {
        let config = CheckConfig::<u64>::new(start, iterations, coeffs).unwrap();
        let mut log = EventLog::new();
        let progress = Progress::new();
        let summary = run(&config, &TrialDivision, &mut log, &progress, None).unwrap();
        (summary, log)
    }

    /// Accepts `limit` events, then fails every write like a closed pipe.
    struct BrokenPipe {
        limit: usize,
        attempts: usize,
    }

    impl ReportSink for BrokenPipe {
        fn emit(&mut self, _event: Event) -> io::Result<()> {
            self.attempts += 1;
            if self.attempts > self.limit {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            Ok(())
        }
    }

    // ── Block Layout ────────────────────────────────────────────────

    #[test]
    fn block_ends_on_interval_multiples() {
        assert_eq!(block_end(1u64, 1_000_000, 100_000), 100_000);
        assert_eq!(block_end(100_000u64, 1_000_000, 100_000), 200_000);
        assert_eq!(block_end(150_000u64, 160_000, 100_000), 160_000);
        assert_eq!(block_end(u64::MAX - 5, u64::MAX, 100_000), u64::MAX);
    }

    // ── Counterexamples ─────────────────────────────────────────────

    #[test]
    fn perrin_has_no_counterexamples_below_ten_thousand() {
        // Index 1 satisfies the congruence trivially and is not prime.
        let (summary, log) = check(2, 9_998, &[0, 1, 1]);
        assert_eq!(summary.evaluated, 9_998);
        assert!(log.counterexamples().is_empty());
    }

    #[test]
    fn start_zero_begins_at_one() {
        let (summary, log) = check(0, 5, &[0, 1, 1]);
        assert_eq!(summary.evaluated, 4);
        assert_eq!(log.counterexamples(), vec![1]);
    }

    // ── Output Stream ───────────────────────────────────────────────

    #[test]
    fn progress_markers_precede_their_index() {
        let (_, log) = check(99_990, 100_020, &[0, 1, 1]);
        let markers: Vec<String> = log
            .lines()
            .into_iter()
            .filter(|l| l.starts_with("checking term"))
            .collect();
        assert_eq!(markers, vec!["checking term 100000", "checking term 200000"]);
    }

    #[test]
    fn fermat_style_recurrence_flags_carmichael_numbers() {
        // Order 1 with c = [2]: term(k) = 2^k, so the congruence is
        // 2^k ≡ 2 (mod k) and counterexamples are base-2 Fermat pseudoprimes.
        let (_, log) = check(2, 2_000, &[2]);
        assert_eq!(log.counterexamples(), vec![341, 561, 645, 1105, 1387, 1729, 1905]);
    }

    #[test]
    fn single_thread_pool_matches_default_pool() {
        let config = CheckConfig::<u64>::new(2, 3_000, &[2]).unwrap();
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let mut sequential = EventLog::new();
        pool.install(|| run(&config, &TrialDivision, &mut sequential, &Progress::new(), None))
            .unwrap();
        let mut parallel = EventLog::new();
        run(&config, &TrialDivision, &mut parallel, &Progress::new(), None).unwrap();
        assert_eq!(sequential.events, parallel.events);
    }

    #[test]
    fn empty_range_evaluates_nothing() {
        let (summary, log) = check(10, 0, &[0, 1, 1]);
        assert_eq!(summary, CheckSummary::default());
        assert!(log.events.is_empty());
    }

    #[test]
    fn write_failure_stops_the_scan() {
        // [2] over 2..2002 yields seven counterexamples; the third write fails.
        let config = CheckConfig::<u64>::new(2, 2_000, &[2]).unwrap();
        let mut sink = BrokenPipe {
            limit: 2,
            attempts: 0,
        };
        let result = run(&config, &TrialDivision, &mut sink, &Progress::new(), None);
        let err = result.unwrap_err();
        assert_eq!(sink.attempts, 3, "no writes after the failed one");
        assert_eq!(
            err.downcast_ref::<io::Error>().map(|e| e.kind()),
            Some(io::ErrorKind::BrokenPipe)
        );
    }
}
