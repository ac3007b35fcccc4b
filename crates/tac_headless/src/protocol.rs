//! JSON protocol for headless game communication.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from a controller (player, AI or peer)
//! **Output (stdout):** Action responses and state snapshots
//!
//! # Protocol Flow
//!
//! 1. Runner loads the map, starts the game and outputs `ready` followed by
//!    the start responses
//! 2. The controller sends `act` commands with player intents, or `apply`
//!    commands with responses decided elsewhere
//! 3. Runner outputs the responses of every accepted step, dimmed for the
//!    configured viewer
//! 4. After a `GameEnd` response, outputs `game_over`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","size":{"width":10,"height":10},"players":2,"hash":123}
//! <- {"type":"responses","responses":[{"type":"Start"}],"hash":123}
//! -> {"cmd":"act","action":{"type":"Move","from":[2,3],"to":[3,4]}}
//! <- {"type":"responses","responses":[{"type":"Move",...}],"hash":456}
//! -> {"cmd":"act","action":{"type":"EndTurn"}}
//! <- {"type":"responses","responses":[{"type":"EndTurn",...}],"hash":789}
//! -> {"cmd":"hash"}
//! <- {"type":"state_hash","position":3,"hash":789}
//! ```

use serde::{Deserialize, Serialize};
use tac_core::action::{Action, ActionResponse};
use tac_core::map::{MapState, PlayerId};
use tac_core::vector::SizeVector;

/// Protocol version reported in `ready`.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Execute a player intent for the current player.
    Act { action: Action },

    /// Apply responses computed by an authoritative peer.
    Apply { responses: Vec<ActionResponse> },

    /// Output the current map, masked for `viewer` when fog is on.
    Query {
        #[serde(default)]
        viewer: Option<PlayerId>,
    },

    /// Output the state hash (for determinism verification).
    Hash,

    /// Output every response applied so far.
    Log,

    /// Save the session as a replay file.
    Save { path: String },

    /// Quit the runner.
    Quit,
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Messages sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        version: String,
        size: SizeVector,
        players: usize,
        hash: u64,
    },

    /// Error processing a command. The session is unchanged.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// Responses of an accepted step.
    Responses {
        responses: Vec<ActionResponse>,
        hash: u64,
    },

    /// Current map.
    State {
        map: MapState,
        round: u32,
        current_player: PlayerId,
        finished: bool,
        hash: u64,
    },

    /// State hash for determinism verification.
    StateHash { position: usize, hash: u64 },

    /// Every response applied so far.
    Log { responses: Vec<ActionResponse> },

    /// A replay file was written.
    Saved { path: String, responses: usize },

    /// The game has ended.
    GameOver {
        round: u32,
        survivors: Vec<PlayerId>,
    },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(map: &MapState) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            size: map.size(),
            players: map.players().len(),
            hash: map.state_hash(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Command name, echoed in error lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Act { .. } => "act",
            Self::Apply { .. } => "apply",
            Self::Query { .. } => "query",
            Self::Hash => "hash",
            Self::Log => "log",
            Self::Save { .. } => "save",
            Self::Quit => "quit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tac_core::vector::Vector;

    #[test]
    fn test_parse_act_command() {
        let json = r#"{"cmd":"act","action":{"type":"Move","from":[2,3],"to":[3,4]}}"#;
        let cmd = Command::from_json(json).unwrap();
        assert_eq!(
            cmd,
            Command::Act {
                action: Action::Move {
                    from: Vector::new(2, 3),
                    to: Vector::new(3, 4),
                    complete: false,
                }
            }
        );
        assert_eq!(cmd.name(), "act");
    }

    #[test]
    fn test_parse_query_without_viewer() {
        let cmd = Command::from_json(r#"{"cmd":"query"}"#).unwrap();
        assert_eq!(cmd, Command::Query { viewer: None });
        let cmd = Command::from_json(r#"{"cmd":"query","viewer":2}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Query {
                viewer: Some(PlayerId(2))
            }
        );
    }

    #[test]
    fn test_parse_apply_command() {
        let json = r#"{"cmd":"apply","responses":[{"type":"Start"},{"type":"BeginGame"}]}"#;
        let cmd = Command::from_json(json).unwrap();
        assert_eq!(
            cmd,
            Command::Apply {
                responses: vec![ActionResponse::Start, ActionResponse::BeginGame]
            }
        );
    }

    #[test]
    fn test_serialize_responses() {
        let resp = Response::Responses {
            responses: vec![ActionResponse::Start],
            hash: 12345,
        };
        let json = resp.to_json_line();
        assert!(json.ends_with('\n'));
        assert!(json.contains(r#""type":"responses""#));
        assert!(json.contains(r#"{"type":"Start"}"#));
        assert!(json.contains(r#""hash":12345"#));
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Command::from_json(r#"{"cmd":"tick","count":60}"#).is_err());
    }
}
