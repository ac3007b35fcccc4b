//! Player intents and the state transitions they produce.
//!
//! An [`Action`] is what a player asks for. [`execute_action`] validates it
//! against a [`MapState`](crate::map::MapState) and turns it into the
//! [`ActionResponse`]s that describe what happened. Only responses are
//! applied, stored and replayed.

pub mod apply;
pub mod execute;
pub mod response;

use serde::{Deserialize, Serialize};

use crate::registry::{BuildingId, Skill, UnitId};
use crate::vector::Vector;

pub use apply::{apply, apply_all};
pub use execute::execute_action;
pub use response::{ActionResponse, TurnPlayer};

/// A player intent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    /// Move a unit along the cheapest path.
    Move {
        /// Unit field.
        from: Vector,
        /// Target field.
        to: Vector,
        /// End the unit's turn after moving.
        #[serde(default)]
        complete: bool,
    },
    /// Attack a unit.
    AttackUnit {
        /// Attacker field.
        from: Vector,
        /// Defender field.
        to: Vector,
    },
    /// Attack a building.
    AttackBuilding {
        /// Attacker field.
        from: Vector,
        /// Building field.
        to: Vector,
    },
    /// Start or finish capturing the building under the unit.
    Capture {
        /// Unit field.
        from: Vector,
    },
    /// Refill adjacent own units.
    Supply {
        /// Supplier field.
        from: Vector,
    },
    /// Produce a unit at a building.
    CreateUnit {
        /// Building field.
        from: Vector,
        /// Spawn field.
        to: Vector,
        /// Unit type.
        id: UnitId,
    },
    /// Unload a carried unit.
    DropUnit {
        /// Carrier field.
        from: Vector,
        /// Index into the carrier's cargo.
        index: usize,
        /// Adjacent target field.
        to: Vector,
    },
    /// Build on the builder's field.
    CreateBuilding {
        /// Builder field.
        from: Vector,
        /// Building type.
        id: BuildingId,
    },
    /// Lay rail track on the builder's field.
    CreateTracks {
        /// Builder field.
        from: Vector,
    },
    /// Pack up a deployed unit.
    Fold {
        /// Unit field.
        from: Vector,
    },
    /// Deploy a unit.
    Unfold {
        /// Unit field.
        from: Vector,
    },
    /// End a unit's turn.
    CompleteUnit {
        /// Unit field.
        from: Vector,
    },
    /// End a building's turn.
    CompleteBuilding {
        /// Building field.
        from: Vector,
    },
    /// Hand over to the next player.
    EndTurn,
    /// Buy a skill at a building that sells them.
    BuySkill {
        /// Building field.
        from: Vector,
        /// Skill to buy.
        skill: Skill,
    },
    /// Spend charge on a power.
    ActivatePower {
        /// Power skill.
        skill: Skill,
        /// Field the power targets, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Vector>,
    },
    /// Heal an adjacent unit.
    Heal {
        /// Healer field.
        from: Vector,
        /// Patient field.
        to: Vector,
    },
    /// Take over an adjacent neutral unit.
    Rescue {
        /// Rescuer field.
        from: Vector,
        /// Neutral unit field.
        to: Vector,
    },
    /// Damage an adjacent enemy unit.
    Sabotage {
        /// Saboteur field.
        from: Vector,
        /// Target field.
        to: Vector,
    },
    /// Exchange two adjacent own units that have not acted yet.
    Swap {
        /// First unit field.
        source: Vector,
        /// Second unit field.
        target: Vector,
    },
}

impl Action {
    /// Variant name, identical to the JSON `type` tag.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Move { .. } => "Move",
            Self::AttackUnit { .. } => "AttackUnit",
            Self::AttackBuilding { .. } => "AttackBuilding",
            Self::Capture { .. } => "Capture",
            Self::Supply { .. } => "Supply",
            Self::CreateUnit { .. } => "CreateUnit",
            Self::DropUnit { .. } => "DropUnit",
            Self::CreateBuilding { .. } => "CreateBuilding",
            Self::CreateTracks { .. } => "CreateTracks",
            Self::Fold { .. } => "Fold",
            Self::Unfold { .. } => "Unfold",
            Self::CompleteUnit { .. } => "CompleteUnit",
            Self::CompleteBuilding { .. } => "CompleteBuilding",
            Self::EndTurn => "EndTurn",
            Self::BuySkill { .. } => "BuySkill",
            Self::ActivatePower { .. } => "ActivatePower",
            Self::Heal { .. } => "Heal",
            Self::Rescue { .. } => "Rescue",
            Self::Sabotage { .. } => "Sabotage",
            Self::Swap { .. } => "Swap",
        }
    }
}
