//! Headless game runner implementation.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use tac_core::action::ActionResponse;
use tac_core::error::GameError;
use tac_core::map::{MapState, PlayerId};
use tac_core::replay::Replay;
use tac_core::session::Game;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::protocol::{Command, Response};
use crate::session_config::{SessionConfig, SessionConfigError};

/// Error type for the runner loop.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Reading commands or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The session could not be loaded.
    #[error(transparent)]
    Config(#[from] SessionConfigError),
    /// The game rejected a step.
    #[error("Game error: {0}")]
    Game(#[from] GameError),
}

/// Configuration for the headless runner.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Session name, used for replays.
    pub name: String,
    /// Player whose view is reported.
    pub viewer: Option<PlayerId>,
    /// Output state after every accepted step.
    pub auto_state: bool,
    /// Replay written when the runner quits.
    pub replay: Option<PathBuf>,
}

impl From<&SessionConfig> for HeadlessConfig {
    fn from(config: &SessionConfig) -> Self {
        Self {
            name: config.name.clone(),
            viewer: config.viewer,
            auto_state: config.output.auto_state,
            replay: config.output.replay.clone(),
        }
    }
}

/// Headless game runner.
///
/// Reads JSON commands line by line and writes one or more JSON lines per
/// command. A rejected command produces an `error` line and leaves the
/// session unchanged.
pub struct HeadlessRunner {
    config: HeadlessConfig,
    game: Game,
    started: Vec<ActionResponse>,
    announced_end: bool,
}

impl HeadlessRunner {
    /// Create a runner and start the game.
    pub fn new(mut game: Game, config: HeadlessConfig) -> Result<Self, RunnerError> {
        let started = game.start()?;
        Ok(Self {
            config,
            game,
            started,
            announced_end: false,
        })
    }

    /// Create a runner from a session file.
    pub fn from_session(config: &SessionConfig) -> Result<Self, RunnerError> {
        let game = config.build_game()?;
        Self::new(game, HeadlessConfig::from(config))
    }

    /// The running game.
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Lines announcing the session: `ready` and the start responses.
    pub fn greeting(&mut self) -> Vec<Response> {
        let mut out = vec![Response::ready(self.game.initial())];
        let started = std::mem::take(&mut self.started);
        self.push_step(&mut out, self.game.initial().clone(), &started);
        out
    }

    /// Handle one command. Returns the output lines and whether to quit.
    pub fn handle(&mut self, command: Command) -> (Vec<Response>, bool) {
        let name = command.name();
        let mut out = Vec::new();
        match command {
            Command::Act { action } => {
                let before = self.game.map().clone();
                match self.game.act(&action) {
                    Ok(responses) => self.push_step(&mut out, before, &responses),
                    Err(e) => {
                        debug!(action = action.name(), error = %e, "action rejected");
                        out.push(Response::error(e.to_string(), Some(name)));
                    }
                }
            }
            Command::Apply { responses } => {
                let before = self.game.map().clone();
                match self.game.apply_remote(&responses) {
                    Ok(()) => self.push_step(&mut out, before, &responses),
                    Err(e) => out.push(Response::error(e.to_string(), Some(name))),
                }
            }
            Command::Query { viewer } => {
                let viewer = viewer.or(self.config.viewer);
                out.push(self.state(viewer));
            }
            Command::Hash => out.push(Response::StateHash {
                position: self.game.log().len(),
                hash: self.game.state_hash(),
            }),
            Command::Log => out.push(Response::Log {
                responses: self.game.log().to_vec(),
            }),
            Command::Save { path } => match self.save(Path::new(&path)) {
                Ok(responses) => out.push(Response::Saved { path, responses }),
                Err(e) => out.push(Response::error(e.to_string(), Some(name))),
            },
            Command::Quit => {
                if let Some(path) = self.config.replay.clone() {
                    if let Err(e) = self.save(&path) {
                        warn!(path = %path.display(), error = %e, "failed to write replay");
                    }
                }
                out.push(Response::Bye);
                return (out, true);
            }
        }
        (out, false)
    }

    /// Read commands until `quit` or the end of the input.
    pub fn run<R: BufRead, W: Write>(mut self, input: R, mut output: W) -> Result<(), RunnerError> {
        for response in self.greeting() {
            output.write_all(response.to_json_line().as_bytes())?;
        }
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (responses, quit) = match Command::from_json(trimmed) {
                Ok(command) => self.handle(command),
                Err(e) => (vec![Response::error(format!("Invalid command: {e}"), None)], false),
            };
            for response in responses {
                output.write_all(response.to_json_line().as_bytes())?;
            }
            output.flush()?;
            if quit {
                return Ok(());
            }
        }

        info!(responses = self.game.log().len(), "input closed");
        if let Some(path) = self.config.replay.clone() {
            self.save(&path)?;
        }
        Ok(())
    }

    /// Run on stdin and stdout.
    pub fn run_stdio(self) -> Result<(), RunnerError> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run(stdin.lock(), stdout.lock())
    }

    fn push_step(&mut self, out: &mut Vec<Response>, before: MapState, responses: &[ActionResponse]) {
        let responses = match self.config.viewer {
            Some(viewer) => match Game::dim_for(&before, viewer, responses) {
                Ok(dimmed) => dimmed,
                Err(e) => {
                    warn!(error = %e, "could not dim responses");
                    Vec::new()
                }
            },
            None => responses.to_vec(),
        };
        out.push(Response::Responses {
            responses,
            hash: self.game.state_hash(),
        });
        if self.config.auto_state {
            out.push(self.state(self.config.viewer));
        }
        if self.game.is_finished() && !self.announced_end {
            self.announced_end = true;
            let map = self.game.map();
            info!(round = map.round(), "game over");
            out.push(Response::GameOver {
                round: map.round(),
                survivors: map.active().to_vec(),
            });
        }
    }

    fn state(&self, viewer: Option<PlayerId>) -> Response {
        let map = match viewer {
            Some(viewer) => self.game.view(viewer),
            None => self.game.map().clone(),
        };
        Response::State {
            round: map.round(),
            current_player: map.current_player(),
            finished: self.game.is_finished(),
            hash: self.game.state_hash(),
            map,
        }
    }

    fn save(&self, path: &Path) -> Result<usize, RunnerError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let replay = Replay::from_game(self.config.name.clone(), &self.game);
        replay.save(path)?;
        info!(path = %path.display(), responses = replay.len(), "replay written");
        Ok(replay.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tac_core::effects::Effects;
    use tac_core::map::{Player, Unit};
    use tac_core::registry::tile::PLAIN;
    use tac_core::registry::unit::INFANTRY;
    use tac_core::vector::{SizeVector, Vector};

    fn duel() -> Game {
        let map = MapState::new(
            SizeVector::new(5, 5),
            PLAIN,
            vec![Player::new(PlayerId(1), 1, 0), Player::new(PlayerId(2), 2, 0)],
        )
        .unwrap()
        .place_unit(Vector::new(1, 1), Unit::create(INFANTRY, PlayerId(1)).unwrap())
        .unwrap()
        .place_unit(Vector::new(5, 5), Unit::create(INFANTRY, PlayerId(2)).unwrap())
        .unwrap();
        Game::new(map, Effects::new()).unwrap()
    }

    fn lines(output: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8_lossy(output)
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_run_session() {
        let runner = HeadlessRunner::new(duel(), HeadlessConfig::default()).unwrap();
        let input = concat!(
            r#"{"cmd":"act","action":{"type":"Move","from":[1,1],"to":[2,1]}}"#,
            "\n",
            r#"{"cmd":"act","action":{"type":"Move","from":[5,5],"to":[4,5]}}"#,
            "\n",
            "not json\n",
            r#"{"cmd":"hash"}"#,
            "\n",
            r#"{"cmd":"quit"}"#,
            "\n",
            r#"{"cmd":"hash"}"#,
            "\n",
        );
        let mut output = Vec::new();
        runner.run(input.as_bytes(), &mut output).unwrap();

        let lines = lines(&output);
        let types: Vec<&str> = lines
            .iter()
            .map(|line| line["type"].as_str().unwrap())
            .collect();
        assert_eq!(
            types,
            vec!["ready", "responses", "responses", "error", "error", "state_hash", "bye"]
        );
        assert_eq!(lines[2]["responses"][0]["type"], "Move");
        assert_eq!(lines[3]["cmd"], "act");
        assert_eq!(lines[5]["position"], 2);
    }

    #[test]
    fn test_apply_remote_responses() {
        let mut leader = HeadlessRunner::new(duel(), HeadlessConfig::default()).unwrap();
        let mut follower = HeadlessRunner::new(duel(), HeadlessConfig::default()).unwrap();
        let (out, _) = leader.handle(
            Command::from_json(r#"{"cmd":"act","action":{"type":"EndTurn"}}"#).unwrap(),
        );
        let Response::Responses { responses, hash } = &out[0] else {
            panic!("expected responses, got {out:?}");
        };
        let (out, quit) = follower.handle(Command::Apply {
            responses: responses.clone(),
        });
        assert!(!quit);
        assert!(matches!(&out[0], Response::Responses { hash: h, .. } if h == hash));
        assert_eq!(follower.game().state_hash(), leader.game().state_hash());
    }

    #[test]
    fn test_fog_viewer_state() {
        let game = duel();
        let config = tac_core::map::Configuration {
            fog: true,
            ..game.map().config().clone()
        };
        let game = Game::new(game.map().with_config(config), Effects::new()).unwrap();
        let mut runner = HeadlessRunner::new(
            game,
            HeadlessConfig {
                viewer: Some(PlayerId(1)),
                ..HeadlessConfig::default()
            },
        )
        .unwrap();
        let (out, _) = runner.handle(Command::Query { viewer: None });
        let Response::State { map, .. } = &out[0] else {
            panic!("expected state, got {out:?}");
        };
        assert!(map.unit_at(Vector::new(1, 1)).is_some());
        assert!(map.unit_at(Vector::new(5, 5)).is_none());
    }

    #[test]
    fn test_save_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replays").join("duel.json");
        let mut runner = HeadlessRunner::new(
            duel(),
            HeadlessConfig {
                name: "duel".into(),
                replay: Some(path.clone()),
                ..HeadlessConfig::default()
            },
        )
        .unwrap();
        runner.handle(Command::from_json(r#"{"cmd":"act","action":{"type":"EndTurn"}}"#).unwrap());
        let (out, quit) = runner.handle(Command::Quit);
        assert!(quit);
        assert_eq!(out, vec![Response::Bye]);

        let replay = Replay::load(&path).unwrap();
        assert_eq!(replay.name, "duel");
        assert_eq!(replay.verify().unwrap(), *runner.game().map());
    }
}
