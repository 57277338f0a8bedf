//! # Checkpoint: Resumable Search State
//!
//! Long scans (a finder run with the default search limit evaluates up to
//! 10^8 terms per coefficient vector) can be resumed from a JSON checkpoint.
//!
//! ## Format
//!
//! A SHA-256 checksum is stored next to the JSON data and verified on load.
//! Writes go to a `.tmp` file that is renamed into place, and up to three
//! generations are kept so a corrupt newest file falls back to an older one.
//!
//! Indices and coefficients are stored as decimal strings because 128-bit
//! values do not fit a JSON number. Each variant records the run's
//! `search_params` JSON; a checkpoint is only resumed by a run with identical
//! parameters.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Number of backup generations to keep.
const GENERATIONS: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Checkpoint {
    Check {
        /// First index not yet evaluated.
        next_index: String,
        search_params: String,
    },
    Find {
        /// Number of vectors already evaluated.
        count: u64,
        /// Next vector to evaluate.
        coefficients: Vec<String>,
        search_params: String,
    },
}

impl Checkpoint {
    pub fn search_params(&self) -> &str {
        match self {
            Checkpoint::Check { search_params, .. } | Checkpoint::Find { search_params, .. } => {
                search_params
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CheckpointEnvelope {
    checksum: String,
    data: serde_json::Value,
}

fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Path for generation `gen` (0 = current, 1 = .1, 2 = .2).
fn generation_path(base: &Path, gen: usize) -> PathBuf {
    if gen == 0 {
        base.to_path_buf()
    } else {
        let mut p = base.as_os_str().to_os_string();
        p.push(format!(".{}", gen));
        PathBuf::from(p)
    }
}

/// Save with checksum, rotating current → .1 → .2.
pub fn save(path: &Path, checkpoint: &Checkpoint) -> Result<()> {
    for gen in (1..GENERATIONS).rev() {
        let src = generation_path(path, gen - 1);
        let dst = generation_path(path, gen);
        if src.exists() {
            let _ = fs::rename(&src, &dst);
        }
    }

    let data = serde_json::to_value(checkpoint)?;
    let checksum = sha256_hex(&serde_json::to_string_pretty(&data)?);
    let json = serde_json::to_string_pretty(&CheckpointEnvelope { checksum, data })?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Load the newest valid checkpoint, falling back to older generations.
pub fn load(path: &Path) -> Option<Checkpoint> {
    for gen in 0..GENERATIONS {
        let p = generation_path(path, gen);
        if let Some(cp) = load_single(&p) {
            if gen > 0 {
                warn!(generation = gen, path = %p.display(), "recovered older checkpoint");
            }
            return Some(cp);
        }
    }
    None
}

/// Load the newest valid checkpoint only if it belongs to a run with the
/// same parameters.
pub fn load_matching(path: &Path, search_params: &str) -> Option<Checkpoint> {
    let cp = load(path)?;
    if cp.search_params() == search_params {
        Some(cp)
    } else {
        warn!(path = %path.display(), "ignoring checkpoint from a run with different parameters");
        None
    }
}

fn load_single(path: &Path) -> Option<Checkpoint> {
    let raw = fs::read_to_string(path).ok()?;
    let envelope: CheckpointEnvelope = serde_json::from_str(&raw).ok()?;

    let expected = sha256_hex(&serde_json::to_string_pretty(&envelope.data).ok()?);
    if expected != envelope.checksum {
        warn!(
            path = %path.display(),
            expected = &expected[..12],
            "checkpoint integrity check failed"
        );
        return None;
    }

    serde_json::from_value(envelope.data).ok()
}

/// Remove the checkpoint, its generations, and any leftover `.tmp` file.
pub fn clear(path: &Path) {
    for gen in 0..GENERATIONS {
        let _ = fs::remove_file(generation_path(path, gen));
    }
    let _ = fs::remove_file(path.with_extension("tmp"));
}
