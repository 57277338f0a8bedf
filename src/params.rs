//! # Params: Validated Search Configuration
//!
//! CLI values arrive as `u128` and are narrowed once into the run's word
//! width. The resulting `CheckConfig` / `FindConfig` are immutable and passed
//! by reference into the search drivers; nothing else carries coefficient or
//! order state.

use anyhow::{bail, Result};

use crate::recurrence::newton_initial_terms;
use crate::report::format_coefficients;
use crate::word::Word;

pub const DEFAULT_SEARCH_LIMIT: u64 = 100_000_000;
pub const DEFAULT_REPORT_LIMIT: u64 = 100_000;
pub const DEFAULT_MAX_COEFF: u64 = 9;

fn narrow<W: Word>(name: &str, value: u128) -> Result<W> {
    match W::try_from_u128(value) {
        Some(v) => Ok(v),
        None => bail!(
            "{} = {} does not fit in {}-bit words (rerun with --wide)",
            name,
            value,
            W::BITS
        ),
    }
}

fn narrow_all<W: Word>(coefficients: &[u128]) -> Result<Vec<W>> {
    if coefficients.is_empty() {
        bail!("at least one coefficient is required");
    }
    coefficients
        .iter()
        .enumerate()
        .map(|(i, &c)| narrow(&format!("coefficient {}", i), c))
        .collect()
}

/// Range checker: scan `[max(start, 1), start + iterations)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckConfig<W> {
    start: W,
    iterations: W,
    end: W,
    coefficients: Vec<W>,
}

impl<W: Word> CheckConfig<W> {
    pub fn new(start: u128, iterations: u128, coefficients: &[u128]) -> Result<Self> {
        let coefficients = narrow_all(coefficients)?;
        if let Err(e) = newton_initial_terms(&coefficients) {
            bail!("{} (rerun with --wide)", e);
        }
        let start: W = narrow("start", start)?;
        let iterations: W = narrow("iterations", iterations)?;
        let Some(end) = start.checked_add(iterations) else {
            bail!(
                "start + iterations ({} + {}) overflows {}-bit words (rerun with --wide)",
                start,
                iterations,
                W::BITS
            );
        };
        Ok(CheckConfig {
            start,
            iterations,
            end,
            coefficients,
        })
    }

    pub fn start(&self) -> W {
        self.start
    }

    pub fn iterations(&self) -> W {
        self.iterations
    }

    /// First index actually evaluated; index 0 is never checked.
    pub fn first_index(&self) -> W {
        self.start.max(W::ONE)
    }

    /// Exclusive end of the scan.
    pub fn end(&self) -> W {
        self.end
    }

    pub fn order(&self) -> usize {
        self.coefficients.len()
    }

    pub fn coefficients(&self) -> &[W] {
        &self.coefficients
    }

    pub fn search_params(&self) -> String {
        serde_json::json!({
            "mode": "check",
            "start": self.start.to_string(),
            "iterations": self.iterations.to_string(),
            "coefficients": format_coefficients(&self.coefficients),
            "word_bits": W::BITS,
        })
        .to_string()
    }
}

/// Coefficient finder: walk `iterations` vectors from `coefficients` onward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FindConfig<W> {
    iterations: u64,
    coefficients: Vec<W>,
    max_coeff: W,
    search_limit: W,
    report_limit: W,
}

impl<W: Word> FindConfig<W> {
    pub fn new(
        iterations: u64,
        coefficients: &[u128],
        max_coeff: u128,
        search_limit: u128,
        report_limit: u128,
    ) -> Result<Self> {
        Ok(FindConfig {
            iterations,
            coefficients: narrow_all(coefficients)?,
            max_coeff: narrow("max-coeff", max_coeff)?,
            search_limit: narrow("search-limit", search_limit)?,
            report_limit: narrow("report-limit", report_limit)?,
        })
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn order(&self) -> usize {
        self.coefficients.len()
    }

    /// The first vector of the walk.
    pub fn coefficients(&self) -> &[W] {
        &self.coefficients
    }

    pub fn max_coeff(&self) -> W {
        self.max_coeff
    }

    pub fn search_limit(&self) -> W {
        self.search_limit
    }

    pub fn report_limit(&self) -> W {
        self.report_limit
    }

    pub fn search_params(&self) -> String {
        serde_json::json!({
            "mode": "find",
            "iterations": self.iterations,
            "coefficients": format_coefficients(&self.coefficients),
            "max_coeff": self.max_coeff.to_string(),
            "search_limit": self.search_limit.to_string(),
            "report_limit": self.report_limit.to_string(),
            "word_bits": W::BITS,
        })
        .to_string()
    }
}
