//! # Report: Line-Oriented Search Output
//!
//! Search drivers never print directly. They emit [`Event`]s into a
//! [`ReportSink`]; the binary uses [`StdoutSink`], tests use [`EventLog`].
//! The `Display` form of each event is the exact stdout line:
//!
//! | Event | Line |
//! |-------|------|
//! | `CheckProgress` | `checking term 300000` |
//! | `FindProgress` | `checking recurrence 2000` |
//! | `Counterexample` | `counterexample: 271441` |
//! | `Report` | `report: 1000001 [0, 1, 1]` |
//! | `OrderBarrier` | `hit order barrier at [10, 0, 0]` |

use std::fmt;
use std::io::{self, Write};

use crate::word::Word;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    CheckProgress { index: u128 },
    FindProgress { count: u64 },
    Counterexample { index: u128 },
    Report { pseudoprime: u128, coefficients: Vec<u128> },
    OrderBarrier { coefficients: Vec<u128> },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::CheckProgress { index } => write!(f, "checking term {}", index),
            Event::FindProgress { count } => write!(f, "checking recurrence {}", count),
            Event::Counterexample { index } => write!(f, "counterexample: {}", index),
            Event::Report {
                pseudoprime,
                coefficients,
            } => write!(f, "report: {} {}", pseudoprime, format_coefficients(coefficients)),
            Event::OrderBarrier { coefficients } => {
                write!(f, "hit order barrier at {}", format_coefficients(coefficients))
            }
        }
    }
}

/// Destination for search output. A failed write ends the search.
pub trait ReportSink {
    fn emit(&mut self, event: Event) -> io::Result<()>;
}

/// Writes each event as a line on stdout and flushes.
#[derive(Default)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn emit(&mut self, event: Event) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", event)?;
        out.flush()
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counterexamples(&self) -> Vec<u128> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Counterexample { index } => Some(*index),
                _ => None,
            })
            .collect()
    }

    pub fn reports(&self) -> Vec<(u128, Vec<u128>)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Report {
                    pseudoprime,
                    coefficients,
                } => Some((*pseudoprime, coefficients.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn lines(&self) -> Vec<String> {
        self.events.iter().map(|e| e.to_string()).collect()
    }
}

impl ReportSink for EventLog {
    fn emit(&mut self, event: Event) -> io::Result<()> {
        self.events.push(event);
        Ok(())
    }
}

/// `[a, b, c]`
pub fn format_coefficients<T: fmt::Display>(coefficients: &[T]) -> String {
    let inner: Vec<String> = coefficients.iter().map(|c| c.to_string()).collect();
    format!("[{}]", inner.join(", "))
}

pub fn widen<W: Word>(values: &[W]) -> Vec<u128> {
    values.iter().map(|v| v.to_u128()).collect()
}

/// Local time in ISO 8601 with numeric offset, e.g. `2024-03-01T12:00:00+0000`.
pub fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%z")
        .to_string()
}

#[cfg(test)]
mod tests {
    //! Tests for report line formatting, the in-memory event log, and the
    //! run timestamp.
    //!
    //! The `Display` strings are the program's stdout contract; scripts that
    //! post-process a search grep for `counterexample:` and `report:` lines,
    //! so each variant is pinned exactly here.

    use super::*;

    // ── Line Formats ────────────────────────────────────────────────

    #[test]
    fn event_lines() {
        assert_eq!(
            Event::Counterexample { index: 271441 }.to_string(),
            "counterexample: 271441"
        );
        assert_eq!(
            Event::Report {
                pseudoprime: 100_000_000,
                coefficients: vec![0, 1, 1]
            }
            .to_string(),
            "report: 100000000 [0, 1, 1]"
        );
        assert_eq!(
            Event::OrderBarrier {
                coefficients: vec![2, 0]
            }
            .to_string(),
            "hit order barrier at [2, 0]"
        );
        assert_eq!(
            Event::CheckProgress { index: 100000 }.to_string(),
            "checking term 100000"
        );
        assert_eq!(
            Event::FindProgress { count: 0 }.to_string(),
            "checking recurrence 0"
        );
    }

    #[test]
    fn single_coefficient_formatting() {
        assert_eq!(format_coefficients(&[7u64]), "[7]");
    }

    // ── Timestamps ──────────────────────────────────────────────────

    #[test]
    fn timestamp_is_iso8601() {
        let ts = timestamp();
        assert!(
            chrono::DateTime::parse_from_str(&ts, "%Y-%m-%dT%H:%M:%S%z").is_ok(),
            "unparseable timestamp {}",
            ts
        );
    }

    // ── Event Log ───────────────────────────────────────────────────

    #[test]
    fn event_log_filters() {
        let mut log = EventLog::new();
        log.emit(Event::CheckProgress { index: 100000 }).unwrap();
        log.emit(Event::Counterexample { index: 5 }).unwrap();
        log.emit(Event::Report {
            pseudoprime: 9,
            coefficients: vec![1],
        })
        .unwrap();
        assert_eq!(log.counterexamples(), vec![5]);
        assert_eq!(log.reports(), vec![(9, vec![1])]);
        assert_eq!(log.lines()[0], "checking term 100000");
    }
}
