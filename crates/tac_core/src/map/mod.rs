//! Battlefield state: entity instances, players, configuration and the
//! [`MapState`] snapshot that holds them.

pub mod building;
pub mod config;
pub mod map_state;
pub mod objective;
pub mod player;
pub mod unit;

pub use building::Building;
pub use config::{Biome, Configuration, PerformanceExpectation, PerformanceStyle, PerformanceStyleType};
pub use map_state::{Layer, MapState, MAX_SIZE, MIN_SIZE};
pub use objective::{Objective, ObjectiveKind, Reward};
pub use player::{AiBehavior, DynamicPlayerId, Player, PlayerId, PlayerStatistics};
pub use unit::{Unit, MAX_HEALTH};
