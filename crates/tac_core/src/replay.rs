//! Replay files.
//!
//! A replay stores the initial map and every response applied after it.
//! Because application is deterministic, folding the responses onto the
//! initial map recreates the game at any point, and the final state hash
//! detects divergence.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::{apply, ActionResponse};
use crate::error::{GameError, Result};
use crate::map::MapState;
use crate::session::Game;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Responses between stored snapshots while playing back.
const CHECKPOINT_INTERVAL: usize = 64;

/// Complete replay data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Map or scenario name.
    pub name: String,
    /// Map before the first response.
    pub initial: MapState,
    /// Responses in application order.
    pub responses: Vec<ActionResponse>,
    /// Hash of the map after the last response.
    pub final_hash: u64,
}

impl Replay {
    /// Start an empty replay.
    #[must_use]
    pub fn new(name: impl Into<String>, initial: MapState) -> Self {
        let final_hash = initial.state_hash();
        Self {
            version: REPLAY_VERSION,
            name: name.into(),
            initial,
            responses: Vec::new(),
            final_hash,
        }
    }

    /// Capture a session's log.
    #[must_use]
    pub fn from_game(name: impl Into<String>, game: &Game) -> Self {
        Self {
            version: REPLAY_VERSION,
            name: name.into(),
            initial: game.initial().clone(),
            responses: game.log().to_vec(),
            final_hash: game.state_hash(),
        }
    }

    /// Append responses.
    pub fn record(&mut self, responses: &[ActionResponse]) {
        self.responses.extend_from_slice(responses);
    }

    /// Set the expected final hash.
    pub fn finalize(&mut self, final_hash: u64) {
        self.final_hash = final_hash;
    }

    /// Number of responses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Whether no responses were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON, checking the format version and the initial map.
    pub fn from_json(json: &str) -> Result<Self> {
        let replay: Self = serde_json::from_str(json)?;
        if replay.version != REPLAY_VERSION {
            return Err(GameError::InvalidState(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }
        replay.initial.validate()?;
        Ok(replay)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json)
            .map_err(|e| GameError::InvalidState(format!("Failed to write replay file: {e}")))
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading, parsing or the version check fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read replay file: {e}")))?;
        Self::from_json(&json)
    }

    /// Apply every response and check the final hash.
    ///
    /// # Errors
    /// Returns the first rejected response's error, or
    /// [`GameError::DesyncDetected`] when the hashes differ.
    pub fn verify(&self) -> Result<MapState> {
        let mut map = self.initial.clone();
        for response in &self.responses {
            map = apply(&map, response)?;
        }
        let local_hash = map.state_hash();
        if local_hash != self.final_hash {
            return Err(GameError::DesyncDetected {
                index: self.responses.len(),
                local_hash,
                remote_hash: self.final_hash,
            });
        }
        Ok(map)
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    map: MapState,
    position: usize,
    /// Snapshots at every multiple of the checkpoint interval.
    checkpoints: Vec<MapState>,
}

impl ReplayPlayer {
    /// Create a player positioned before the first response.
    #[must_use]
    pub fn new(replay: Replay) -> Self {
        let map = replay.initial.clone();
        Self {
            checkpoints: vec![map.clone()],
            replay,
            map,
            position: 0,
        }
    }

    /// Apply the next response. Returns whether more remain.
    ///
    /// # Errors
    /// Returns an error if the response does not apply.
    pub fn advance(&mut self) -> Result<bool> {
        let Some(response) = self.replay.responses.get(self.position) else {
            return Ok(false);
        };
        self.map = apply(&self.map, response)?;
        self.position += 1;
        if self.position % CHECKPOINT_INTERVAL == 0
            && self.checkpoints.len() == self.position / CHECKPOINT_INTERVAL
        {
            self.checkpoints.push(self.map.clone());
        }
        Ok(!self.is_finished())
    }

    /// Move to the state after `target` responses, clamped to the end.
    ///
    /// # Errors
    /// Returns an error if a response on the way does not apply.
    pub fn seek(&mut self, target: usize) -> Result<()> {
        let target = target.min(self.replay.responses.len());
        if target < self.position {
            let checkpoint = (target / CHECKPOINT_INTERVAL).min(self.checkpoints.len() - 1);
            self.map = self.checkpoints[checkpoint].clone();
            self.position = checkpoint * CHECKPOINT_INTERVAL;
        }
        while self.position < target {
            self.advance()?;
        }
        debug!(position = self.position, "replay seek");
        Ok(())
    }

    /// Number of responses applied.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Map at the current position.
    #[must_use]
    pub const fn map(&self) -> &MapState {
        &self.map
    }

    /// The replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Whether every response was applied.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.position >= self.replay.responses.len()
    }

    /// The response that will be applied next.
    #[must_use]
    pub fn next_response(&self) -> Option<&ActionResponse> {
        self.replay.responses.get(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::effects::Effects;
    use crate::map::{Player, PlayerId, Unit};
    use crate::registry::tile::PLAIN;
    use crate::registry::unit::INFANTRY;
    use crate::vector::{SizeVector, Vector};

    fn played() -> Game {
        let map = MapState::new(
            SizeVector::new(6, 6),
            PLAIN,
            vec![Player::new(PlayerId(1), 1, 0), Player::new(PlayerId(2), 2, 0)],
        )
        .unwrap()
        .place_unit(Vector::new(1, 1), Unit::create(INFANTRY, PlayerId(1)).unwrap())
        .unwrap()
        .place_unit(Vector::new(6, 6), Unit::create(INFANTRY, PlayerId(2)).unwrap())
        .unwrap();
        let mut game = Game::new(map, Effects::new()).unwrap();
        game.start().unwrap();
        for _ in 0..40 {
            game.act(&Action::EndTurn).unwrap();
        }
        game.act(&Action::Move {
            from: Vector::new(1, 1),
            to: Vector::new(2, 2),
            complete: false,
        })
        .unwrap();
        game
    }

    #[test]
    fn test_replay_verify() {
        let game = played();
        let replay = Replay::from_game("duel", &game);
        assert_eq!(replay.len(), 42);
        assert_eq!(replay.verify().unwrap(), *game.map());

        let mut tampered = replay.clone();
        tampered.finalize(replay.final_hash.wrapping_add(1));
        assert!(matches!(
            tampered.verify(),
            Err(GameError::DesyncDetected { index: 42, .. })
        ));
    }

    #[test]
    fn test_replay_save_load() {
        let replay = Replay::from_game("duel", &played());
        let file = tempfile::NamedTempFile::new().unwrap();
        replay.save(file.path()).unwrap();
        let loaded = Replay::load(file.path()).unwrap();
        assert_eq!(loaded, replay);
    }

    #[test]
    fn test_version_mismatch() {
        let mut replay = Replay::new("empty", played().initial().clone());
        replay.version = 99;
        let json = replay.to_json().unwrap();
        assert!(Replay::from_json(&json).is_err());
    }

    #[test]
    fn test_player_seek() {
        let game = played();
        let replay = Replay::from_game("duel", &game);
        let mut player = ReplayPlayer::new(replay.clone());
        player.seek(replay.len()).unwrap();
        assert!(player.is_finished());
        assert_eq!(player.map(), game.map());

        player.seek(3).unwrap();
        assert_eq!(player.position(), 3);
        let expected = crate::action::apply_all(&replay.initial, &replay.responses[..3]).unwrap();
        assert_eq!(player.map(), &expected);

        player.seek(0).unwrap();
        assert_eq!(player.map(), &replay.initial);
        assert!(player.advance().unwrap());
        assert_eq!(player.next_response(), replay.responses.get(1));
    }
}
