//! Session configuration.
//!
//! A session file names the map and effects to load and how the runner
//! reports progress. Paths are resolved relative to the session file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tac_core::effects::{prepare_effects, Effects, Trigger};
use tac_core::error::GameError;
use tac_core::map::{MapState, PlayerId};
use tac_core::session::Game;
use thiserror::Error;
use tracing::{info, warn};

/// Error type for session configuration.
#[derive(Error, Debug)]
pub enum SessionConfigError {
    /// File not found.
    #[error("Session file not found: {0}")]
    FileNotFound(String),
    /// Failed to read a file.
    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse session: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Failed to parse a JSON map or effects file.
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    /// The loaded content is not playable.
    #[error("Invalid game content: {0}")]
    Game(#[from] GameError),
}

/// Output options for the runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOptions {
    /// Output the full state after every accepted step.
    #[serde(default)]
    pub auto_state: bool,
    /// Write a replay here when the runner quits.
    #[serde(default)]
    pub replay: Option<PathBuf>,
}

/// A complete session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session name, used for replays.
    pub name: String,
    /// Map snapshot (JSON).
    pub map: PathBuf,
    /// Effects file (JSON).
    #[serde(default)]
    pub effects: Option<PathBuf>,
    /// Player whose view the runner reports. `None` reports everything.
    #[serde(default)]
    pub viewer: Option<PlayerId>,
    /// Effect to playtest as `(trigger, index)`. Any other value prepares
    /// the effects for a regular playtest.
    #[serde(default)]
    pub playtest: Option<(String, usize)>,
    /// Output options.
    #[serde(default)]
    pub output: OutputOptions,
}

impl SessionConfig {
    /// Session for a map without effects.
    pub fn for_map(map: impl Into<PathBuf>) -> Self {
        Self {
            name: "session".to_string(),
            map: map.into(),
            effects: None,
            viewer: None,
            playtest: None,
            output: OutputOptions::default(),
        }
    }

    /// Load a session from a RON file. Relative paths inside are resolved
    /// against the file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SessionConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SessionConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_ron_str(&contents)?;
        if let Some(base) = path.parent() {
            config.resolve(base);
        }
        Ok(config)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, SessionConfigError> {
        let config: SessionConfig = ron::from_str(ron)?;
        Ok(config)
    }

    fn resolve(&mut self, base: &Path) {
        let join = |path: &PathBuf| {
            if path.is_relative() {
                base.join(path)
            } else {
                path.clone()
            }
        };
        self.map = join(&self.map);
        self.effects = self.effects.as_ref().map(join);
        self.output.replay = self.output.replay.as_ref().map(join);
    }

    /// Read the map file.
    pub fn load_map(&self) -> Result<MapState, SessionConfigError> {
        let json = std::fs::read_to_string(&self.map)?;
        Ok(MapState::from_json(&json)?)
    }

    /// Read and prepare the effects file.
    pub fn load_effects(&self) -> Result<Effects, SessionConfigError> {
        let Some(path) = &self.effects else {
            return Ok(Effects::new());
        };
        let json = std::fs::read_to_string(path)?;
        let effects = Effects::from_json(&json)?;
        let scenario = match &self.playtest {
            Some((trigger, index)) => Some((trigger.parse::<Trigger>()?, *index)),
            None => None,
        };
        let prepared = prepare_effects(
            &effects,
            scenario.as_ref().map(|(trigger, index)| (trigger, *index)),
        )?;
        for notice in &prepared.notices {
            warn!(%notice, "effects prepared for playtest");
        }
        Ok(prepared.effects)
    }

    /// Build the game session.
    pub fn build_game(&self) -> Result<Game, SessionConfigError> {
        let map = self.load_map()?;
        let effects = self.load_effects()?;
        info!(
            name = %self.name,
            size = %map.size(),
            players = map.players().len(),
            "loaded session"
        );
        Ok(Game::new(map, effects)?)
    }
}
