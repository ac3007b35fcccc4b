//! Content validation.
//!
//! Checks map snapshots, effects files and campaign graphs the way the
//! kernel would load them, and reports everything it finds instead of
//! stopping at the first problem.
//!
//! A data directory is classified by file name:
//! - `*.effects.json` - effects, checked against the sibling `*.json` map
//! - `*.campaign.json` - campaign graph, checked against the maps present
//! - any other `*.json` - map snapshot

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tac_core::campaign::Campaign;
use tac_core::effects::{migrate_game_end_dialogue, Effects};
use tac_core::error::GameError;
use tac_core::map::MapState;
use thiserror::Error;
use tracing::{debug, info, warn};

const EFFECTS_SUFFIX: &str = ".effects.json";
const CAMPAIGN_SUFFIX: &str = ".campaign.json";
const MAP_SUFFIX: &str = ".json";

/// Error type for validation.
#[derive(Error, Debug)]
pub enum ValidateError {
    /// Failed to read a file or directory.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File or directory.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The content is not valid JSON for its kind.
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The content breaks a kernel invariant.
    #[error(transparent)]
    Game(#[from] GameError),
    /// The content is well-formed but inconsistent.
    #[error("{0}")]
    Invalid(String),
}

/// Kind of a content file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    /// Map snapshot.
    Map,
    /// Effects.
    Effects,
    /// Campaign graph.
    Campaign,
}

impl ContentKind {
    /// Classify a file by name. Non-JSON files are `None`.
    pub fn of(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(EFFECTS_SUFFIX) {
            Some(Self::Effects)
        } else if name.ends_with(CAMPAIGN_SUFFIX) {
            Some(Self::Campaign)
        } else if name.ends_with(MAP_SUFFIX) {
            Some(Self::Map)
        } else {
            None
        }
    }
}

/// One problem found during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    /// File the problem is in.
    pub path: PathBuf,
    /// Description.
    pub message: String,
}

/// Result of validating a directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Number of files checked.
    pub checked: usize,
    /// Problems that make content unloadable.
    pub errors: Vec<Finding>,
    /// Content the kernel would change on load.
    pub warnings: Vec<Finding>,
}

impl ValidationReport {
    /// Whether no errors were found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: &Path, message: impl Into<String>) {
        let finding = Finding {
            path: path.to_path_buf(),
            message: message.into(),
        };
        warn!(path = %finding.path.display(), message = %finding.message, "invalid content");
        self.errors.push(finding);
    }

    fn warning(&mut self, path: &Path, message: impl Into<String>) {
        self.warnings.push(Finding {
            path: path.to_path_buf(),
            message: message.into(),
        });
    }
}

fn read(path: &Path) -> Result<String, ValidateError> {
    std::fs::read_to_string(path).map_err(|source| ValidateError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate a map snapshot.
pub fn validate_map_file(path: &Path) -> Result<MapState, ValidateError> {
    let map = MapState::from_json(&read(path)?)?;
    debug!(path = %path.display(), size = %map.size(), "map valid");
    Ok(map)
}

/// Load effects and check them against the map they belong to.
///
/// Returns the effects and the notices the playtest preparation would
/// produce.
pub fn validate_effects_file(
    path: &Path,
    map: Option<&MapState>,
) -> Result<(Effects, Vec<String>), ValidateError> {
    let effects = Effects::from_json(&read(path)?)?;
    if let Some(map) = map {
        check_effect_positions(&effects, map)?;
    }
    let (_, notices) = migrate_game_end_dialogue(&effects);
    Ok((effects, notices.iter().map(ToString::to_string).collect()))
}

/// Fail when an effect references a field outside the map.
pub fn check_effect_positions(effects: &Effects, map: &MapState) -> Result<(), ValidateError> {
    let size = map.size();
    for (trigger, list) in effects.iter() {
        for (index, effect) in list.iter().enumerate() {
            let inside = effect.map_positions(|position| size.contains(position).then_some(position));
            if inside.as_ref() != Some(effect) {
                return Err(ValidateError::Invalid(format!(
                    "effect {index} of {trigger} references fields outside the {size} map"
                )));
            }
        }
    }
    Ok(())
}

/// Load and validate a campaign graph.
pub fn validate_campaign_file(path: &Path) -> Result<Campaign, ValidateError> {
    Ok(Campaign::from_json(&read(path)?)?)
}

/// Levels of the campaign that have no map among `maps`.
pub fn missing_levels<'a>(campaign: &'a Campaign, maps: &BTreeSet<String>) -> Vec<&'a str> {
    campaign
        .reachable()
        .into_iter()
        .filter(|map_id| !maps.contains(*map_id))
        .collect()
}

/// Validate every content file in a directory.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport, ValidateError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(|source| ValidateError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|file| ContentKind::of(file).is_some())
        .collect();
    files.sort();

    let mut report = ValidationReport::default();
    let mut maps = BTreeSet::new();

    for file in files
        .iter()
        .filter(|file| ContentKind::of(file) == Some(ContentKind::Map))
    {
        report.checked += 1;
        match validate_map_file(file) {
            Ok(_) => {
                if let Some(id) = file_id(file, MAP_SUFFIX) {
                    maps.insert(id);
                }
            }
            Err(e) => report.error(file, e.to_string()),
        }
    }

    for file in &files {
        match ContentKind::of(file) {
            Some(ContentKind::Effects) => {
                report.checked += 1;
                let map = file_id(file, EFFECTS_SUFFIX)
                    .filter(|id| maps.contains(id))
                    .and_then(|id| validate_map_file(&path.join(format!("{id}{MAP_SUFFIX}"))).ok());
                if map.is_none() {
                    report.warning(file, "no valid map next to these effects");
                }
                match validate_effects_file(file, map.as_ref()) {
                    Ok((_, notices)) => {
                        for notice in notices {
                            report.warning(file, notice);
                        }
                    }
                    Err(e) => report.error(file, e.to_string()),
                }
            }
            Some(ContentKind::Campaign) => {
                report.checked += 1;
                match validate_campaign_file(file) {
                    Ok(campaign) => {
                        for level in missing_levels(&campaign, &maps) {
                            report.error(file, format!("level '{level}' has no map"));
                        }
                    }
                    Err(e) => report.error(file, e.to_string()),
                }
            }
            _ => {}
        }
    }

    info!(
        checked = report.checked,
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validated {}",
        path.display()
    );
    Ok(report)
}

fn file_id(path: &Path, suffix: &str) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(suffix).map(str::to_owned)
}
