//! # Tactics Core
//!
//! Deterministic simulation kernel for a turn-based tactics game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO in the rules (replays read and write files, nothing else does)
//! - No randomness
//! - No floating-point math (uses fixed-point)
//!
//! Every state change is an [`ActionResponse`](action::ActionResponse)
//! applied to an immutable [`MapState`](map::MapState). This enables:
//! - Undo by keeping old snapshots
//! - Replays and lockstep peers that only exchange responses
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`registry`] - Static tile, unit, building and skill catalogs
//! - [`map`] - Map state, entities, players and configuration
//! - [`action`] - Intents, responses and their application
//! - [`movement`], [`combat`], [`economy`] - Rules used by the executor
//! - [`objectives`], [`effects`] - Win conditions and scripted triggers
//! - [`session`], [`replay`] - Running and recording games
//! - [`history`], [`resize`], [`campaign`] - Editor support
//! - [`vision`] - Fog of war
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod action;
pub mod campaign;
pub mod combat;
pub mod economy;
pub mod effects;
pub mod error;
pub mod history;
pub mod map;
pub mod math;
pub mod movement;
pub mod objectives;
pub mod performance;
pub mod registry;
pub mod replay;
pub mod resize;
pub mod session;
pub mod vector;
pub mod vision;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::action::{apply, apply_all, execute_action, Action, ActionResponse};
    pub use crate::campaign::{Campaign, NextLevel};
    pub use crate::effects::{
        fire, prepare_effects, Condition, Effect, EffectAction, Effects, Trigger,
    };
    pub use crate::error::{GameError, Result};
    pub use crate::history::{History, HistoryLabel};
    pub use crate::map::{
        Building, Configuration, DynamicPlayerId, MapState, Objective, ObjectiveKind, Player,
        PlayerId, Unit,
    };
    pub use crate::math::Fixed;
    pub use crate::registry::{BuildingId, Skill, TileId, UnitId};
    pub use crate::replay::{Replay, ReplayPlayer};
    pub use crate::resize::{resize_effects, resize_map, ResizeOrigin};
    pub use crate::session::Game;
    pub use crate::vector::{SizeVector, Vector};
}
