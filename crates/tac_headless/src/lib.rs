//! Headless game runner for AI controllers and CI verification.
//!
//! This crate provides a headless runner that can be controlled via
//! JSON commands on stdin, with action responses on stdout. This enables:
//!
//! - **AI and peer control**: A controller plays the game without a client
//! - **CI verification**: Automated testing of game logic and determinism
//! - **Replay verification**: Check that replays reproduce their final hash
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (act, apply, query, etc.)
//! - **stdout**: Responses and state (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command and response reference.
//!
//! # Example
//!
//! ```bash
//! # Run a session
//! cargo run -p tac_headless -- run --session sessions/skirmish.ron
//!
//! # Run a bare map
//! echo '{"cmd":"hash"}' | cargo run -p tac_headless -- run --map maps/duel.json
//!
//! # Verify every replay in a directory
//! cargo run -p tac_headless -- verify --dir replays/
//! ```

pub mod batch;
pub mod protocol;
pub mod runner;
pub mod session_config;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner, RunnerError};
pub use session_config::{SessionConfig, SessionConfigError};
