//! Players, teams and symbolic player references.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::registry::Skill;

/// Charge needed for one power bar.
pub const CHARGE_PER_BAR: u32 = 100;
/// Maximum number of power bars a player can hold.
pub const MAX_CHARGES: u32 = 10;
/// Maximum charge a player can hold.
pub const MAX_CHARGE: u32 = CHARGE_PER_BAR * MAX_CHARGES;

/// Concrete player identifier. `0` is the neutral player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// The neutral player owning unclaimed buildings and rescuable units.
    pub const NEUTRAL: Self = Self(0);

    /// Whether this is the neutral player.
    #[must_use]
    pub const fn is_neutral(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Player reference as written by map authors.
///
/// Effects are authored before anyone knows whose turn it will be, so they
/// may refer to players relative to the current player. On the wire the
/// symbolic forms are negative numbers: `-1` self, `-2` opponent, `-3` team.
/// Resolution to a [`PlayerId`] happens immediately before a response is
/// produced; symbolic ids never appear inside a `MapState`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum DynamicPlayerId {
    /// A concrete player.
    Player(PlayerId),
    /// The player whose turn it is.
    Current,
    /// The first opponent of the current player in turn order.
    Opponent,
    /// The first teammate of the current player, or the current player.
    Team,
}

impl TryFrom<i8> for DynamicPlayerId {
    type Error = GameError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Current),
            -2 => Ok(Self::Opponent),
            -3 => Ok(Self::Team),
            id if id >= 0 => Ok(Self::Player(PlayerId(id as u8))),
            other => Err(GameError::InvalidState(format!(
                "invalid dynamic player id {other}"
            ))),
        }
    }
}

impl From<DynamicPlayerId> for i8 {
    fn from(value: DynamicPlayerId) -> Self {
        match value {
            DynamicPlayerId::Player(PlayerId(id)) => id as i8,
            DynamicPlayerId::Current => -1,
            DynamicPlayerId::Opponent => -2,
            DynamicPlayerId::Team => -3,
        }
    }
}

impl From<PlayerId> for DynamicPlayerId {
    fn from(id: PlayerId) -> Self {
        Self::Player(id)
    }
}

/// Behavior of a computer-controlled player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiBehavior {
    /// Seeks out enemies.
    Attack,
    /// Holds position near own buildings.
    Defense,
    /// Does not move units.
    Stay,
    /// Never attacks.
    Passive,
}

/// Per-player counters used by objectives and performance scoring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStatistics {
    /// Buildings captured.
    pub captured: u32,
    /// Units created.
    pub created_units: u32,
    /// Buildings created.
    pub created_buildings: u32,
    /// Total damage dealt.
    pub damage: u32,
    /// Enemy units destroyed.
    pub destroyed_units: u32,
    /// Enemy buildings destroyed.
    pub destroyed_buildings: u32,
    /// Own units lost.
    pub lost_units: u32,
    /// Own buildings lost.
    pub lost_buildings: u32,
    /// Units destroyed with a single attack from full health.
    pub one_shots: u32,
    /// Neutral units rescued.
    pub rescued_units: u32,
}

impl PlayerStatistics {
    /// Component-wise sum, used for team totals.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            captured: self.captured + other.captured,
            created_units: self.created_units + other.created_units,
            created_buildings: self.created_buildings + other.created_buildings,
            damage: self.damage + other.damage,
            destroyed_units: self.destroyed_units + other.destroyed_units,
            destroyed_buildings: self.destroyed_buildings + other.destroyed_buildings,
            lost_units: self.lost_units + other.lost_units,
            lost_buildings: self.lost_buildings + other.lost_buildings,
            one_shots: self.one_shots + other.one_shots,
            rescued_units: self.rescued_units + other.rescued_units,
        }
    }
}

/// A participant of the game.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    /// Identifier.
    pub id: PlayerId,
    /// Team the player belongs to.
    pub team: u8,
    /// Current funds.
    #[serde(default)]
    pub funds: u32,
    /// Owned skills.
    #[serde(default)]
    pub skills: BTreeSet<Skill>,
    /// Powers activated this turn.
    #[serde(default)]
    pub active_skills: BTreeSet<Skill>,
    /// Power charge.
    #[serde(default)]
    pub charge: u32,
    /// Present for computer-controlled players.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiBehavior>,
    /// Remaining turn time in milliseconds, when a clock is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u32>,
    /// Counters.
    #[serde(default)]
    pub stats: PlayerStatistics,
}

impl Player {
    /// Create a human player.
    #[must_use]
    pub fn new(id: PlayerId, team: u8, funds: u32) -> Self {
        Self {
            id,
            team,
            funds,
            skills: BTreeSet::new(),
            active_skills: BTreeSet::new(),
            charge: 0,
            ai: None,
            time: None,
            stats: PlayerStatistics::default(),
        }
    }

    /// Create a computer-controlled player.
    #[must_use]
    pub fn bot(id: PlayerId, team: u8, funds: u32, behavior: AiBehavior) -> Self {
        Self {
            ai: Some(behavior),
            ..Self::new(id, team, funds)
        }
    }

    /// Whether the player is computer-controlled.
    #[must_use]
    pub const fn is_bot(&self) -> bool {
        self.ai.is_some()
    }

    /// Full power bars available.
    #[must_use]
    pub const fn charges(&self) -> u32 {
        self.charge / CHARGE_PER_BAR
    }

    /// Return a copy with modified statistics.
    #[must_use]
    pub fn with_stats(mut self, update: impl FnOnce(&mut PlayerStatistics)) -> Self {
        update(&mut self.stats);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_player_id_wire_format() {
        let ids = [
            DynamicPlayerId::Player(PlayerId(2)),
            DynamicPlayerId::Current,
            DynamicPlayerId::Opponent,
            DynamicPlayerId::Team,
        ];
        let json = serde_json::to_string(&ids).unwrap();
        assert_eq!(json, "[2,-1,-2,-3]");
        let back: Vec<DynamicPlayerId> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ids);
        assert!(serde_json::from_str::<DynamicPlayerId>("-7").is_err());
    }

    #[test]
    fn test_charges() {
        let mut player = Player::new(PlayerId(1), 1, 0);
        player.charge = CHARGE_PER_BAR * 2 + 40;
        assert_eq!(player.charges(), 2);
    }

    #[test]
    fn test_player_defaults_when_deserializing() {
        let player: Player = serde_json::from_str(r#"{"id":1,"team":1}"#).unwrap();
        assert_eq!(player.funds, 0);
        assert!(player.skills.is_empty());
        assert!(!player.is_bot());
    }

    #[test]
    fn test_merge_statistics() {
        let a = PlayerStatistics {
            captured: 2,
            lost_units: 1,
            ..PlayerStatistics::default()
        };
        let b = PlayerStatistics {
            captured: 3,
            damage: 40,
            ..PlayerStatistics::default()
        };
        let total = a.merge(b);
        assert_eq!(total.captured, 5);
        assert_eq!(total.lost_units, 1);
        assert_eq!(total.damage, 40);
    }
}
