//! Error types for the tactics kernel.
//!
//! Validation and structural failures are returned as [`GameError`] values.
//! Invariant violations (a fatal registry accessor missing, a corrupted
//! snapshot) panic instead, since continuing would desynchronize the state
//! from its event log.

use thiserror::Error;

use crate::map::player::PlayerId;
use crate::vector::Vector;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all kernel errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Unknown building registry id.
    #[error("Unknown building id: {0}")]
    UnknownBuilding(u16),

    /// Unknown unit registry id.
    #[error("Unknown unit id: {0}")]
    UnknownUnit(u16),

    /// Unknown tile registry id.
    #[error("Unknown tile id: {0}")]
    UnknownTile(u16),

    /// Unknown skill id.
    #[error("Unknown skill id: {0}")]
    UnknownSkill(u8),

    /// Player is not part of the map.
    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),

    /// Position lies outside the map.
    #[error("Position {0} is out of bounds")]
    OutOfBounds(Vector),

    /// A unit already occupies the position.
    #[error("Position {0} is already occupied by a unit")]
    UnitOccupied(Vector),

    /// A building already occupies the position.
    #[error("Position {0} is already occupied by a building")]
    BuildingOccupied(Vector),

    /// No unit at the position.
    #[error("No unit at {0}")]
    NoUnit(Vector),

    /// No building at the position.
    #[error("No building at {0}")]
    NoBuilding(Vector),

    /// The entity cannot be placed on the tile.
    #[error("{entity} cannot be placed on {tile} at {position}")]
    IllegalPlacement {
        /// Name of the entity being placed.
        entity: &'static str,
        /// Name of the tile at the position.
        tile: &'static str,
        /// Target position.
        position: Vector,
    },

    /// The player cannot pay for the transition.
    #[error("Insufficient funds for player {player}: need {required}, have {available}")]
    InsufficientFunds {
        /// Spending player.
        player: PlayerId,
        /// Amount required.
        required: u32,
        /// Amount available.
        available: u32,
    },

    /// The player does not have enough charge to activate a power.
    #[error("Insufficient charge for player {player}: need {required}, have {available}")]
    InsufficientCharge {
        /// Activating player.
        player: PlayerId,
        /// Charge required.
        required: u32,
        /// Charge available.
        available: u32,
    },

    /// The path is longer than the unit's remaining fuel.
    #[error("Insufficient fuel: need {required}, have {available}")]
    InsufficientFuel {
        /// Fuel required.
        required: u32,
        /// Fuel available.
        available: u32,
    },

    /// Entry has infinite cost and has not been unlocked.
    #[error("{0} cannot be built by normal means")]
    Unbuildable(&'static str),

    /// Entry is excluded by the map's content restrictions.
    #[error("{0} is restricted on this map")]
    Restricted(&'static str),

    /// Building limit reached for the player.
    #[error("Player {player} cannot own more than {limit} {building}")]
    BuildingLimit {
        /// Building name.
        building: &'static str,
        /// Configured limit.
        limit: u8,
        /// Owning player.
        player: PlayerId,
    },

    /// Transition requested by a player whose turn it is not.
    #[error("It is player {expected}'s turn, not player {actual}'s")]
    NotCurrentPlayer {
        /// Player whose turn it is.
        expected: PlayerId,
        /// Player that attempted the transition.
        actual: PlayerId,
    },

    /// The entity at the position belongs to someone else.
    #[error("Entity at {position} is not owned by player {player}")]
    NotOwner {
        /// Position of the entity.
        position: Vector,
        /// Player attempting to use it.
        player: PlayerId,
    },

    /// The entity already acted this turn.
    #[error("Entity at {0} has already completed its turn")]
    AlreadyCompleted(Vector),

    /// The unit already moved this turn.
    #[error("Unit at {0} has already moved this turn")]
    AlreadyMoved(Vector),

    /// The transition breaks a game rule.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Carrier cannot take the unit.
    #[error("Unit cannot be transported by the carrier at {0}")]
    CannotTransport(Vector),

    /// The player already owns the maximum number of skills.
    #[error("Player {player} already owns {limit} skills")]
    SkillLimit {
        /// Buying player.
        player: PlayerId,
        /// Skill cap.
        limit: usize,
    },

    /// The game has already ended.
    #[error("The game is over")]
    GameOver,

    /// Campaign graph contains a cycle.
    #[error("Campaign cycle detected at level '{0}'")]
    CampaignCycle(String),

    /// Campaign references a level that does not exist.
    #[error("Unknown campaign level '{0}'")]
    UnknownLevel(String),

    /// The level already continues to the target.
    #[error("Level '{from}' already continues to '{to}'")]
    DuplicateLevel {
        /// Parent level.
        from: String,
        /// Child level.
        to: String,
    },

    /// Requested map size is not allowed.
    #[error("Invalid map size {width}x{height}")]
    InvalidSize {
        /// Requested width.
        width: i32,
        /// Requested height.
        height: i32,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Snapshot or log could not be (de)serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Local replay diverged from the authoritative hash.
    #[error("Desync detected after {index} responses: local hash {local_hash}, remote hash {remote_hash}")]
    DesyncDetected {
        /// Number of responses applied.
        index: usize,
        /// Local state hash.
        local_hash: u64,
        /// Authoritative state hash.
        remote_hash: u64,
    },
}

impl From<serde_json::Error> for GameError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
