//! # Finder: Search Coefficient Space for Good Tests
//!
//! Walks coefficient vectors in lexicographic order with an [`Odometer`] and,
//! for each, finds the smallest index above the order that satisfies the
//! recurrence congruence but is not prime. Vectors whose first pseudoprime
//! exceeds the report limit are candidate primality tests and are reported.
//!
//! Work is processed in batches of up to [`FIND_PROGRESS_INTERVAL`] vectors.
//! Each rayon worker keeps its own [`Recurrence`] (re-populated per vector)
//! and [`Scratch`]; batch results are emitted in enumeration order.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::checkpoint::{self, Checkpoint};
use crate::odometer::{Advance, Odometer};
use crate::params::FindConfig;
use crate::progress::Progress;
use crate::recurrence::{Recurrence, Scratch};
use crate::report::{format_coefficients, widen, Event, ReportSink};
use crate::word::Word;
use crate::PrimalityOracle;

/// A `checking recurrence` marker is emitted every this many vectors.
pub const FIND_PROGRESS_INTERVAL: u64 = 1_000;

const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FirstPseudoprime<W> {
    Found(W),
    /// Nothing up to and including the search limit.
    NoneUpTo(W),
}

impl<W: Word> FirstPseudoprime<W> {
    /// The reported value: the pseudoprime, or the search limit as a sentinel.
    pub fn value(self) -> W {
        match self {
            FirstPseudoprime::Found(k) | FirstPseudoprime::NoneUpTo(k) => k,
        }
    }
}

/// Smallest `k` in `order+1 ..= limit` with `term(k) ≡ c[0] (mod k)` that the
/// oracle says is not prime.
pub fn first_pseudoprime<W: Word>(
    rec: &Recurrence<W>,
    scratch: &mut Scratch<W>,
    oracle: &dyn PrimalityOracle,
    limit: W,
) -> FirstPseudoprime<W> {
    let mut k = W::from_u64(rec.order() as u64) + W::ONE;
    while k <= limit {
        if rec.satisfies_congruence(k, scratch) && !oracle.is_probably_prime(k.to_u128()) {
            return FirstPseudoprime::Found(k);
        }
        if k == limit {
            break;
        }
        k = k + W::ONE;
    }
    FirstPseudoprime::NoneUpTo(limit)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FindSummary {
    /// Vectors evaluated by this run (excluding any resumed prefix).
    pub evaluated: u64,
    pub reported: u64,
    pub skipped: u64,
    /// The odometer ran past its most significant digit.
    pub exhausted: bool,
}

enum Outcome<W> {
    Scanned(FirstPseudoprime<W>),
    Skipped(String),
}

fn resume_state<W: Word>(config: &FindConfig<W>, path: &Path) -> Option<(u64, Vec<W>)> {
    match checkpoint::load_matching(path, &config.search_params())? {
        Checkpoint::Find {
            count,
            coefficients,
            ..
        } => {
            let coeffs = coefficients
                .iter()
                .map(|c| c.parse::<W>().ok())
                .collect::<Option<Vec<W>>>()?;
            (coeffs.len() == config.order() && count <= config.iterations())
                .then_some((count, coeffs))
        }
        Checkpoint::Check { .. } => None,
    }
}

pub fn run<W: Word>(
    config: &FindConfig<W>,
    oracle: &dyn PrimalityOracle,
    sink: &mut dyn ReportSink,
    progress: &Progress,
    checkpoint_path: Option<&Path>,
) -> Result<FindSummary> {
    let template = Recurrence::<W>::with_order(config.order())?;
    let order = config.order();

    let (mut count, start) = match checkpoint_path.and_then(|p| resume_state(config, p)) {
        Some((count, coeffs)) => {
            info!(count, coefficients = %format_coefficients(&coeffs), "resuming find from checkpoint");
            (count, coeffs)
        }
        None => (0, config.coefficients().to_vec()),
    };
    let mut odometer = Odometer::new(start, config.max_coeff());

    let mut summary = FindSummary::default();
    let mut last_checkpoint = Instant::now();

    while count < config.iterations() && !summary.exhausted {
        let batch_end = (count / FIND_PROGRESS_INTERVAL + 1)
            .saturating_mul(FIND_PROGRESS_INTERVAL)
            .min(config.iterations());

        let mut batch: Vec<Vec<W>> = Vec::new();
        while count + (batch.len() as u64) < batch_end {
            batch.push(odometer.current().to_vec());
            if odometer.advance() == Advance::Exhausted {
                summary.exhausted = true;
                break;
            }
        }

        if count % FIND_PROGRESS_INTERVAL == 0 {
            sink.emit(Event::FindProgress { count })
                .context("writing progress marker")?;
        }
        progress.set_current(format!(
            "{} +{} vectors",
            format_coefficients(&batch[0]),
            batch.len()
        ));

        let outcomes: Vec<Outcome<W>> = batch
            .par_iter()
            .map_init(
                || (template.clone(), Scratch::new(order)),
                |(rec, scratch), coeffs| match rec.set_coefficients(coeffs) {
                    Ok(()) => {
                        Outcome::Scanned(first_pseudoprime(rec, scratch, oracle, config.search_limit()))
                    }
                    Err(e) => Outcome::Skipped(e.to_string()),
                },
            )
            .collect();

        for (coeffs, outcome) in batch.iter().zip(outcomes) {
            match outcome {
                Outcome::Scanned(first) if first.value() > config.report_limit() => {
                    sink.emit(Event::Report {
                        pseudoprime: first.value().to_u128(),
                        coefficients: widen(coeffs),
                    })
                    .context("writing report")?;
                    summary.reported += 1;
                    progress.found.fetch_add(1, Ordering::Relaxed);
                }
                Outcome::Scanned(_) => {}
                Outcome::Skipped(reason) => {
                    warn!(coefficients = %format_coefficients(coeffs), %reason, "skipping vector");
                    summary.skipped += 1;
                }
            }
        }

        count += batch.len() as u64;
        summary.evaluated += batch.len() as u64;
        progress.tested.fetch_add(batch.len() as u64, Ordering::Relaxed);

        if summary.exhausted {
            sink.emit(Event::OrderBarrier {
                coefficients: widen(odometer.current()),
            })
            .context("writing order barrier notice")?;
            break;
        }

        if let Some(path) = checkpoint_path {
            if last_checkpoint.elapsed() >= CHECKPOINT_INTERVAL {
                checkpoint::save(
                    path,
                    &Checkpoint::Find {
                        count,
                        coefficients: odometer.current().iter().map(|c| c.to_string()).collect(),
                        search_params: config.search_params(),
                    },
                )?;
                info!(count, "checkpoint saved");
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
    //! Tests for the coefficient finder driver and its per-vector scan.
    //!
    //! The order-1 vector `[2]` is the base-2 Fermat test (first pseudoprime
    //! 341) and `[0, 1, 1]` is Perrin (nothing below 271441), which pins both
    //! the found and sentinel paths of `first_pseudoprime`. The driver tests
    //! cover odometer exhaustion, report thresholds, batch progress markers,
    //! overflow skipping, thread-count independence, and write failures.

    use super::*;
    use crate::report::EventLog;
    use crate::RugOracle;
    use std::io;

    fn find(
        iterations: u64,
        coeffs: &[u128],
        max_coeff: u128,
        search_limit: u128,
        report_limit: u128,
    ) -> (FindSummary, EventLog) {
        let config =
            FindConfig::<u64>::new(iterations, coeffs, max_coeff, search_limit, report_limit)
                .unwrap();
        let mut log = EventLog::new();
        let summary = run(&config, &RugOracle::default(), &mut log, &Progress::new(), None).unwrap();
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

    // ── First Pseudoprime ───────────────────────────────────────────

    #[test]
    fn first_pseudoprime_of_fermat_base_two_is_341() {
        let rec = Recurrence::<u64>::new(&[2]).unwrap();
        let mut scratch = Scratch::new(1);
        assert_eq!(
            first_pseudoprime(&rec, &mut scratch, &RugOracle::default(), 10_000),
            FirstPseudoprime::Found(341)
        );
    }

    #[test]
    fn search_limit_is_the_sentinel() {
        let rec = Recurrence::<u64>::new(&[0, 1, 1]).unwrap();
        let mut scratch = Scratch::new(3);
        let first = first_pseudoprime(&rec, &mut scratch, &RugOracle::default(), 5_000);
        assert_eq!(first, FirstPseudoprime::NoneUpTo(5_000));
        assert_eq!(first.value(), 5_000);
    }

    #[test]
    fn limit_below_scan_start_finds_nothing() {
        let rec = Recurrence::<u64>::new(&[0, 1, 1]).unwrap();
        let mut scratch = Scratch::new(3);
        assert_eq!(
            first_pseudoprime(&rec, &mut scratch, &RugOracle::default(), 2),
            FirstPseudoprime::NoneUpTo(2)
        );
    }

    // ── Enumeration ─────────────────────────────────────────────────

    #[test]
    fn order_two_max_one_hits_the_barrier() {
        let (summary, log) = find(10, &[0, 0], 1, 50, 0);
        let vectors: Vec<Vec<u128>> = log.reports().into_iter().map(|(_, c)| c).collect();
        assert_eq!(vectors, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
        assert_eq!(log.lines().last().unwrap(), "hit order barrier at [2, 0]");
        assert_eq!(log.lines()[0], "checking recurrence 0");
        assert!(summary.exhausted);
        assert_eq!(summary.evaluated, 4);
    }

    #[test]
    fn iteration_budget_stops_before_the_barrier() {
        let (summary, log) = find(3, &[0, 0], 1, 50, 0);
        assert_eq!(summary.evaluated, 3);
        assert!(!summary.exhausted);
        assert!(!log.lines().iter().any(|l| l.starts_with("hit order barrier")));
    }

    // ── Reporting ───────────────────────────────────────────────────

    #[test]
    fn only_vectors_above_report_limit_are_reported() {
        // [2] is the base-2 Fermat test (first pseudoprime 341); [0, 1, 1]
        // is Perrin, with nothing below the search limit.
        let (_, log) = find(1, &[2], 9, 1_000, 340);
        assert_eq!(log.reports(), vec![(341, vec![2])]);
        let (_, log) = find(1, &[2], 9, 1_000, 341);
        assert!(log.reports().is_empty());
        let (_, log) = find(1, &[0, 1, 1], 1, 2_000, 1_999);
        assert_eq!(log.reports(), vec![(2_000, vec![0, 1, 1])]);
    }

    #[test]
    fn progress_markers_every_thousand_vectors() {
        let (summary, log) = find(2_500, &[0, 0, 0, 0], 9, 10, 100);
        assert_eq!(summary.evaluated, 2_500);
        let markers: Vec<String> = log
            .lines()
            .into_iter()
            .filter(|l| l.starts_with("checking recurrence"))
            .collect();
        assert_eq!(
            markers,
            vec!["checking recurrence 0", "checking recurrence 1000", "checking recurrence 2000"]
        );
    }

    #[test]
    fn overflowing_vectors_are_skipped_not_fatal() {
        let big = u64::MAX as u128;
        let (summary, log) = find(1, &[big, big, 1], big, 100, 0);
        assert_eq!(summary.skipped, 1);
        assert!(log.reports().is_empty());
    }

    // ── Output Stream ───────────────────────────────────────────────

    #[test]
    fn single_thread_pool_matches_default_pool() {
        // 2500 vectors span three batches; report_limit 0 reports every one.
        let config = FindConfig::<u64>::new(2_500, &[0, 0, 0, 0], 9, 40, 0).unwrap();
        let oracle = RugOracle::default();
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let mut sequential = EventLog::new();
        pool.install(|| run(&config, &oracle, &mut sequential, &Progress::new(), None))
            .unwrap();
        let mut parallel = EventLog::new();
        run(&config, &oracle, &mut parallel, &Progress::new(), None).unwrap();
        assert_eq!(sequential.reports().len(), 2_500);
        assert_eq!(sequential.events, parallel.events);
    }

    #[test]
    fn write_failure_stops_the_search() {
        // Marker, then reports for [0, 0] and [0, 1]; the second report fails.
        let config = FindConfig::<u64>::new(4, &[0, 0], 1, 50, 0).unwrap();
        let mut sink = BrokenPipe {
            limit: 2,
            attempts: 0,
        };
        let result = run(&config, &RugOracle::default(), &mut sink, &Progress::new(), None);
        let err = result.unwrap_err();
        assert_eq!(sink.attempts, 3, "no writes after the failed one");
        assert_eq!(
            err.downcast_ref::<io::Error>().map(|e| e.kind()),
            Some(io::ErrorKind::BrokenPipe)
        );
    }
}
