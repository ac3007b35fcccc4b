//! The closed set of state transitions.
//!
//! An [`ActionResponse`] describes one completed change to a [`MapState`].
//! Responses are what gets persisted, replayed and sent over the wire; the
//! JSON form carries a `type` discriminator.
//!
//! [`MapState`]: crate::map::MapState

use serde::{Deserialize, Serialize};

use crate::map::{Building, Player, PlayerId, Reward, Unit};
use crate::registry::{BuildingId, Skill, UnitId};
use crate::vector::Vector;

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

/// Funds of a player at a turn boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnPlayer {
    /// Funds after the turn change.
    pub funds: u32,
    /// Player.
    pub player: PlayerId,
}

/// One completed game-state transition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionResponse {
    /// Session start marker.
    Start,
    /// The first turn begins.
    BeginGame,
    /// A unit moved along a path.
    Move {
        /// Start field.
        from: Vector,
        /// Target field.
        to: Vector,
        /// Fuel left after the move.
        fuel: u32,
        /// Walked fields, excluding the start.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Vec<Vector>>,
        /// The unit cannot act anymore this turn.
        #[serde(default, skip_serializing_if = "is_false")]
        completed: bool,
    },
    /// A unit attacked another unit.
    AttackUnit {
        /// Attacker field.
        from: Vector,
        /// Defender field.
        to: Vector,
        /// The defender fired back.
        has_counter_attack: bool,
        /// Attacker owner.
        player_a: PlayerId,
        /// Defender owner.
        player_b: PlayerId,
        /// Attacker after combat, absent when destroyed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit_a: Option<Unit>,
        /// Defender after combat, absent when destroyed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit_b: Option<Unit>,
        /// Attacker owner's charge after combat.
        charge_a: u32,
        /// Defender owner's charge after combat.
        charge_b: u32,
    },
    /// A unit attacked a building.
    AttackBuilding {
        /// Attacker field.
        from: Vector,
        /// Building field.
        to: Vector,
        /// A unit on the building fired back.
        has_counter_attack: bool,
        /// Attacker owner.
        player_a: PlayerId,
        /// Building owner before the attack.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_b: Option<PlayerId>,
        /// Building after the attack, absent when a structure collapsed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        building: Option<Building>,
        /// Attacker after combat, absent when destroyed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit_a: Option<Unit>,
        /// Unit standing on the building after combat.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit_c: Option<Unit>,
        /// Owner of the unit standing on the building.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_c: Option<PlayerId>,
        /// Attacker owner's charge after combat.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        charge_a: Option<u32>,
        /// Building owner's charge after combat.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        charge_b: Option<u32>,
        /// Charge of the owner of the unit on the building.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        charge_c: Option<u32>,
    },
    /// A unit captured, or started capturing, the building it stands on.
    Capture {
        /// Field of the unit and building.
        from: Vector,
        /// The building after the capture finished.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        building: Option<Building>,
        /// Previous owner when the capture finished.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player: Option<PlayerId>,
    },
    /// A supply unit refilled adjacent units.
    Supply {
        /// Supplier field.
        from: Vector,
        /// Supplier owner.
        player: PlayerId,
    },
    /// A building produced a unit.
    CreateUnit {
        /// Building field.
        from: Vector,
        /// Field the unit appears on.
        to: Vector,
        /// New unit.
        unit: Unit,
        /// Produced without paying.
        #[serde(default, skip_serializing_if = "is_false")]
        free: bool,
    },
    /// A carrier unloaded a unit.
    DropUnit {
        /// Carrier field.
        from: Vector,
        /// Index into the carrier's cargo.
        index: usize,
        /// Adjacent target field.
        to: Vector,
    },
    /// A unit constructed a building on its field.
    CreateBuilding {
        /// Builder field.
        from: Vector,
        /// Building type.
        building: BuildingId,
        /// Built without paying.
        #[serde(default, skip_serializing_if = "is_false")]
        free: bool,
    },
    /// A unit laid rail tracks on its field.
    CreateTracks {
        /// Builder field.
        from: Vector,
    },
    /// A deployable unit packed up.
    Fold {
        /// Unit field.
        from: Vector,
    },
    /// A deployable unit deployed.
    Unfold {
        /// Unit field.
        from: Vector,
    },
    /// A unit ended its turn.
    CompleteUnit {
        /// Unit field.
        from: Vector,
    },
    /// A building ended its turn.
    CompleteBuilding {
        /// Building field.
        from: Vector,
    },
    /// The turn passed to the next player.
    EndTurn {
        /// Player ending the turn.
        current: TurnPlayer,
        /// Player beginning the turn.
        next: TurnPlayer,
        /// Round after the turn change.
        round: u32,
        /// Fields of the next player's units that get resupplied.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        supply: Option<Vec<Vector>>,
        /// The turn ran out of time; funds and round stay unchanged.
        #[serde(default, skip_serializing_if = "is_false")]
        miss: bool,
    },
    /// Narrative text.
    Message {
        /// Text.
        message: String,
        /// Speaker.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player: Option<PlayerId>,
    },
    /// Narrative text spoken by a unit portrait.
    CharacterMessage {
        /// Text.
        message: String,
        /// Speaker's player.
        player: PlayerId,
        /// Portrait unit type.
        unit_id: UnitId,
        /// Portrait variant.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variant: Option<u8>,
    },
    /// A batch of entities appeared.
    Spawn {
        /// Units by field.
        units: Vec<(Vector, Unit)>,
        /// Buildings by field.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        buildings: Option<Vec<(Vector, Building)>>,
        /// Players joining the game.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        players: Option<Vec<Player>>,
    },
    /// A medic healed an adjacent unit.
    Heal {
        /// Healer field.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Vector>,
        /// Healed unit field.
        to: Vector,
    },
    /// A neutral unit joined a player.
    Rescue {
        /// Rescuer field.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Vector>,
        /// Rescued unit field.
        to: Vector,
        /// New owner.
        player: PlayerId,
    },
    /// A saboteur damaged an adjacent unit.
    Sabotage {
        /// Saboteur field.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Vector>,
        /// Target field.
        to: Vector,
    },
    /// The current player changed without a turn change.
    SetPlayer {
        /// New current player.
        player: PlayerId,
    },
    /// A player received a reward.
    ReceiveReward {
        /// Receiver.
        player: PlayerId,
        /// Reward.
        reward: Reward,
        /// Skills granted permanently stay active across turns.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        permanent: Option<bool>,
    },
    /// A player bought a skill.
    BuySkill {
        /// Selling building field.
        from: Vector,
        /// Buyer.
        player: PlayerId,
        /// Skill.
        skill: Skill,
    },
    /// The current player activated a power.
    ActivatePower {
        /// Skill whose power is activated.
        skill: Skill,
        /// Activated without spending charge.
        #[serde(default, skip_serializing_if = "is_false")]
        free: bool,
        /// Targeted field for powers that need one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Vector>,
        /// Units replaced by the power.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        units: Option<Vec<(Vector, Unit)>>,
    },
    /// A hidden objective became visible.
    SecretDiscovered {
        /// Objective id.
        objective_id: u8,
        /// Player who discovered it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to_player: Option<PlayerId>,
    },
    /// Funds changed by an amount.
    IncreaseFunds {
        /// Player.
        player: PlayerId,
        /// Signed change.
        funds: i32,
    },
    /// Charge changed by a number of power bars.
    IncreaseCharge {
        /// Player.
        player: PlayerId,
        /// Signed change in bars.
        charges: i32,
    },
    /// Two units exchanged positions.
    Swap {
        /// First field.
        source: Vector,
        /// Unit moving from the first to the second field.
        source_unit: Unit,
        /// Second field.
        target: Vector,
        /// Unit moving from the second to the first field, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_unit: Option<Unit>,
    },
    /// A player's clock was set.
    SetPlayerTime {
        /// Player.
        player: PlayerId,
        /// Remaining time in milliseconds.
        time: u32,
    },
    /// The game ended.
    GameEnd {
        /// Objective that decided the game.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        objective_id: Option<u8>,
        /// Winner, absent for a draw.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to_player: Option<PlayerId>,
    },
    /// A player completed an optional objective.
    OptionalObjective {
        /// Objective id.
        objective_id: u8,
        /// Player who completed it.
        to_player: PlayerId,
    },
    /// A player was eliminated.
    PlayerLost {
        /// Player.
        player: PlayerId,
    },
    /// A unit appeared from the fog.
    HiddenMove {
        /// Field the unit appeared on.
        to: Vector,
        /// The unit.
        unit: Unit,
    },
    /// A unit disappeared into the fog.
    HiddenRemove {
        /// Field the unit left.
        from: Vector,
    },
    /// A visible unit was attacked from the fog.
    HiddenTargetAttackUnit {
        /// Defender field.
        to: Vector,
        /// Defender after combat, absent when destroyed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit_b: Option<Unit>,
        /// Defender owner.
        player_b: PlayerId,
        /// Defender owner's charge after combat.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        charge_b: Option<u32>,
    },
}

impl ActionResponse {
    /// Wire name of the variant.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::BeginGame => "BeginGame",
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
            Self::EndTurn { .. } => "EndTurn",
            Self::Message { .. } => "Message",
            Self::CharacterMessage { .. } => "CharacterMessage",
            Self::Spawn { .. } => "Spawn",
            Self::Heal { .. } => "Heal",
            Self::Rescue { .. } => "Rescue",
            Self::Sabotage { .. } => "Sabotage",
            Self::SetPlayer { .. } => "SetPlayer",
            Self::ReceiveReward { .. } => "ReceiveReward",
            Self::BuySkill { .. } => "BuySkill",
            Self::ActivatePower { .. } => "ActivatePower",
            Self::SecretDiscovered { .. } => "SecretDiscovered",
            Self::IncreaseFunds { .. } => "IncreaseFunds",
            Self::IncreaseCharge { .. } => "IncreaseCharge",
            Self::Swap { .. } => "Swap",
            Self::SetPlayerTime { .. } => "SetPlayerTime",
            Self::GameEnd { .. } => "GameEnd",
            Self::OptionalObjective { .. } => "OptionalObjective",
            Self::PlayerLost { .. } => "PlayerLost",
            Self::HiddenMove { .. } => "HiddenMove",
            Self::HiddenRemove { .. } => "HiddenRemove",
            Self::HiddenTargetAttackUnit { .. } => "HiddenTargetAttackUnit",
        }
    }

    /// Whether the response only carries narrative and never changes state.
    #[must_use]
    pub const fn is_narrative(&self) -> bool {
        matches!(self, Self::Message { .. } | Self::CharacterMessage { .. })
    }

    /// Parse a response from JSON.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the response.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
