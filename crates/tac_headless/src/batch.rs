//! Batch replay verification.
//!
//! Verifies many replay files in parallel using rayon. Each replay is
//! loaded, every response is applied to its initial map and the final
//! state hash is compared with the recorded one.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tac_core::replay::Replay;
use tracing::{debug, info, warn};

/// Configuration for a batch run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Replay files to verify
    pub replays: Vec<PathBuf>,
    /// Maximum parallel verifications (0 = use rayon default)
    pub parallel: u32,
}

impl BatchConfig {
    /// Config for the given replay files
    pub fn new(replays: Vec<PathBuf>) -> Self {
        Self {
            replays,
            ..Default::default()
        }
    }

    /// Collect every `*.json` file in a directory, sorted by name
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let mut replays: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        replays.sort();
        Ok(Self::new(replays))
    }

    /// Set parallelism
    pub fn with_parallel(mut self, parallel: u32) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Outcome of verifying one replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Replay file
    pub path: PathBuf,
    /// Name stored in the replay
    pub name: String,
    /// Number of responses
    pub responses: usize,
    /// Hash recorded in the replay
    pub expected_hash: u64,
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Replay file
    pub path: PathBuf,
    /// What went wrong
    pub message: String,
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Verified replays
    pub verified: Vec<ReplayReport>,
    /// Replays that failed to load, apply or match
    pub errors: Vec<BatchError>,
    /// Total runtime
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Whether every replay verified
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Verify a single replay file
pub fn verify_replay(path: &Path) -> Result<ReplayReport, BatchError> {
    let error = |message: String| BatchError {
        path: path.to_path_buf(),
        message,
    };
    let replay = Replay::load(path).map_err(|e| error(e.to_string()))?;
    replay.verify().map_err(|e| error(e.to_string()))?;
    debug!(path = %path.display(), responses = replay.len(), "replay verified");
    Ok(ReplayReport {
        path: path.to_path_buf(),
        name: replay.name,
        responses: replay.responses.len(),
        expected_hash: replay.final_hash,
    })
}

/// Run a batch of verifications
pub fn run_batch(config: &BatchConfig) -> BatchResults {
    let start = Instant::now();
    info!("Starting batch verification: {} replays", config.replays.len());

    if config.parallel > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<ReplayReport, BatchError>> = config
        .replays
        .par_iter()
        .map(|path| {
            let result = verify_replay(path);
            if let Err(e) = &result {
                warn!("Replay {} failed: {}", e.path.display(), e.message);
            }
            result
        })
        .collect();

    let (verified, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let verified: Vec<ReplayReport> = verified.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} verified, {} failed in {:.1}s",
        verified.len(),
        errors.len(),
        duration_seconds
    );

    BatchResults {
        verified,
        errors,
        duration_seconds,
    }
}
