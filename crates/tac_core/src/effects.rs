//! Scripted scenario effects.
//!
//! Map authors attach [`Effect`]s to [`Trigger`]s. When a trigger fires,
//! every eligible effect turns its actions into responses with symbolic
//! player references resolved against the current player. The whole batch
//! is applied atomically: if any response is rejected, neither the map nor
//! the effect list changes.
//!
//! Effects serialize as a JSON object keyed by trigger string:
//!
//! ```json
//! {"Start": [{"actions": [{"type": "Message", "message": "Go!"}]}]}
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};

use crate::action::{apply_all, ActionResponse};
use crate::error::{GameError, Result};
use crate::map::{DynamicPlayerId, MapState, PlayerId, Reward, Unit};
use crate::registry::UnitId;
use crate::vector::Vector;

/// Hook point at which effects may fire.
///
/// Triggers serialize as their display string. A custom name that reads as
/// a built-in trigger cannot be serialized; build custom triggers with
/// [`Trigger::custom`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum Trigger {
    /// The game starts.
    Start,
    /// The game ended.
    GameEnd,
    /// A turn ended.
    EndTurn,
    /// An objective was completed.
    Objective(u8),
    /// Fired explicitly by name.
    Custom(String),
}

const OBJECTIVE_PREFIX: &str = "Objective:";

impl Trigger {
    /// A custom trigger. Names that parse as a built-in trigger are
    /// rejected.
    pub fn custom(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        match name.parse::<Self>()? {
            Self::Custom(name) => Ok(Self::Custom(name)),
            reserved => Err(GameError::InvalidState(format!(
                "'{reserved}' is a reserved trigger name"
            ))),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("Start"),
            Self::GameEnd => f.write_str("GameEnd"),
            Self::EndTurn => f.write_str("EndTurn"),
            Self::Objective(id) => write!(f, "{OBJECTIVE_PREFIX}{id}"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

impl FromStr for Trigger {
    type Err = GameError;

    fn from_str(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(GameError::InvalidState("empty trigger name".into()));
        }
        Ok(match value {
            "Start" => Self::Start,
            "GameEnd" => Self::GameEnd,
            "EndTurn" => Self::EndTurn,
            other => match other
                .strip_prefix(OBJECTIVE_PREFIX)
                .and_then(|id| id.parse().ok())
            {
                Some(id) => Self::Objective(id),
                None => Self::Custom(other.to_owned()),
            },
        })
    }
}

impl TryFrom<String> for Trigger {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl Serialize for Trigger {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if let Self::Custom(name) = self {
            if Self::custom(name.as_str()).is_err() {
                return Err(S::Error::custom(format!("invalid custom trigger '{name}'")));
            }
        }
        serializer.collect_str(self)
    }
}

/// A predicate over the map that gates an effect.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Condition {
    /// The objective was completed, by the player if given.
    ObjectiveCompleted {
        /// Objective id.
        objective_id: u8,
        /// Player that must have completed it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player: Option<DynamicPlayerId>,
    },
    /// It is the player's turn.
    CurrentPlayer {
        /// Expected player.
        player: DynamicPlayerId,
    },
    /// The round lies within the inclusive range.
    Round {
        /// First round.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<u32>,
        /// Last round.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<u32>,
    },
    /// A unit of the player stands on the field.
    UnitOwnedBy {
        /// Field.
        position: Vector,
        /// Owner.
        player: DynamicPlayerId,
    },
    /// The building on the field belongs to the player.
    BuildingOwnedBy {
        /// Field.
        position: Vector,
        /// Owner.
        player: DynamicPlayerId,
    },
}

impl Condition {
    /// Whether the condition holds on the map.
    #[must_use]
    pub fn holds(&self, map: &MapState) -> bool {
        let resolve = |player| resolve_player(map, player).ok();
        match self {
            Self::ObjectiveCompleted {
                objective_id,
                player,
            } => map
                .config()
                .objectives
                .get(objective_id)
                .is_some_and(|objective| match player {
                    None => !objective.completed.is_empty(),
                    Some(player) => {
                        resolve(*player).is_some_and(|id| objective.completed.contains(&id))
                    }
                }),
            Self::CurrentPlayer { player } => resolve(*player) == Some(map.current_player()),
            Self::Round { min, max } => {
                let round = map.round();
                min.map_or(true, |min| round >= min) && max.map_or(true, |max| round <= max)
            }
            Self::UnitOwnedBy { position, player } => map
                .unit_at(*position)
                .is_some_and(|unit| resolve(*player) == Some(unit.player)),
            Self::BuildingOwnedBy { position, player } => map
                .building_at(*position)
                .is_some_and(|building| resolve(*player) == Some(building.player)),
        }
    }

    fn position(&self) -> Option<Vector> {
        match self {
            Self::UnitOwnedBy { position, .. } | Self::BuildingOwnedBy { position, .. } => {
                Some(*position)
            }
            _ => None,
        }
    }

    fn with_position(&self, position: Vector) -> Self {
        let mut condition = self.clone();
        if let Self::UnitOwnedBy { position: p, .. } | Self::BuildingOwnedBy { position: p, .. } =
            &mut condition
        {
            *p = position;
        }
        condition
    }
}

/// Something an effect does when it fires.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EffectAction {
    /// Show a message.
    Message {
        /// Text.
        message: String,
        /// Speaker.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player: Option<DynamicPlayerId>,
    },
    /// Show a message spoken by a unit character.
    CharacterMessage {
        /// Text.
        message: String,
        /// Speaker's player.
        player: DynamicPlayerId,
        /// Speaker's unit type.
        unit_id: UnitId,
        /// Portrait variant.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variant: Option<u8>,
    },
    /// Place units.
    Spawn {
        /// Units with their fields.
        units: Vec<(Vector, Unit)>,
        /// Owner override for every unit.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player: Option<DynamicPlayerId>,
    },
    /// Change funds.
    IncreaseFunds {
        /// Receiving player.
        player: DynamicPlayerId,
        /// Delta.
        funds: i32,
    },
    /// Change charge, in bars.
    IncreaseCharge {
        /// Receiving player.
        player: DynamicPlayerId,
        /// Delta in bars.
        charges: i32,
    },
    /// Hand out a reward.
    ReceiveReward {
        /// Receiving player.
        player: DynamicPlayerId,
        /// Reward.
        reward: Reward,
        /// Skills last for the rest of the game unless `false`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        permanent: Option<bool>,
    },
}

impl EffectAction {
    /// Whether the action only shows text.
    #[must_use]
    pub const fn is_dialogue(&self) -> bool {
        matches!(self, Self::Message { .. } | Self::CharacterMessage { .. })
    }

    /// Turn the action into a response for the map.
    pub fn to_response(&self, map: &MapState) -> Result<ActionResponse> {
        Ok(match self {
            Self::Message { message, player } => ActionResponse::Message {
                message: message.clone(),
                player: player.map(|player| resolve_player(map, player)).transpose()?,
            },
            Self::CharacterMessage {
                message,
                player,
                unit_id,
                variant,
            } => ActionResponse::CharacterMessage {
                message: message.clone(),
                player: resolve_player(map, *player)?,
                unit_id: *unit_id,
                variant: *variant,
            },
            Self::Spawn { units, player } => {
                let owner = player.map(|player| resolve_player(map, player)).transpose()?;
                ActionResponse::Spawn {
                    units: units
                        .iter()
                        .map(|(position, unit)| {
                            let unit = match owner {
                                Some(owner) => unit.clone().with_player(owner),
                                None => unit.clone(),
                            };
                            (*position, unit)
                        })
                        .collect(),
                    buildings: None,
                    players: None,
                }
            }
            Self::IncreaseFunds { player, funds } => ActionResponse::IncreaseFunds {
                player: resolve_player(map, *player)?,
                funds: *funds,
            },
            Self::IncreaseCharge { player, charges } => ActionResponse::IncreaseCharge {
                player: resolve_player(map, *player)?,
                charges: *charges,
            },
            Self::ReceiveReward {
                player,
                reward,
                permanent,
            } => ActionResponse::ReceiveReward {
                player: resolve_player(map, *player)?,
                reward: reward.clone(),
                permanent: *permanent,
            },
        })
    }
}

/// How often an effect may fire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occurrence {
    /// Removed after firing.
    #[default]
    Once,
    /// Fires every time the trigger does.
    Always,
}

/// Trigger-gated list of actions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Effect {
    /// Actions in order.
    pub actions: Vec<EffectAction>,
    /// All must hold for the effect to fire.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Firing frequency.
    #[serde(default)]
    pub occurrence: Occurrence,
}

impl Effect {
    /// A one-shot effect without conditions.
    #[must_use]
    pub fn new(actions: Vec<EffectAction>) -> Self {
        Self {
            actions,
            conditions: Vec::new(),
            occurrence: Occurrence::Once,
        }
    }

    /// Whether all conditions hold.
    #[must_use]
    pub fn is_eligible(&self, map: &MapState) -> bool {
        self.conditions.iter().all(|condition| condition.holds(map))
    }

    /// Whether every action only shows text.
    #[must_use]
    pub fn is_dialogue_only(&self) -> bool {
        !self.actions.is_empty() && self.actions.iter().all(EffectAction::is_dialogue)
    }

    /// Remap every referenced position. Spawned units that fall off the map
    /// are dropped; an effect whose condition falls off the map, or that
    /// loses all of its actions, is dropped entirely.
    #[must_use]
    pub fn map_positions(&self, remap: impl Fn(Vector) -> Option<Vector>) -> Option<Self> {
        let mut conditions = Vec::with_capacity(self.conditions.len());
        for condition in &self.conditions {
            conditions.push(match condition.position() {
                Some(position) => condition.with_position(remap(position)?),
                None => condition.clone(),
            });
        }
        let actions: Vec<EffectAction> = self
            .actions
            .iter()
            .filter_map(|action| match action {
                EffectAction::Spawn { units, player } => {
                    let units: Vec<(Vector, Unit)> = units
                        .iter()
                        .filter_map(|(position, unit)| Some((remap(*position)?, unit.clone())))
                        .collect();
                    (!units.is_empty()).then(|| EffectAction::Spawn {
                        units,
                        player: *player,
                    })
                }
                other => Some(other.clone()),
            })
            .collect();
        if actions.is_empty() && !self.actions.is_empty() {
            return None;
        }
        Some(Self {
            actions,
            conditions,
            occurrence: self.occurrence,
        })
    }
}

/// Effects of a map, keyed by trigger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Effects(Arc<BTreeMap<Trigger, Vec<Effect>>>);

impl Effects {
    /// No effects.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Effects registered for the trigger.
    #[must_use]
    pub fn get(&self, trigger: &Trigger) -> &[Effect] {
        self.0.get(trigger).map_or(&[], Vec::as_slice)
    }

    /// All triggers with their effects in trigger order.
    pub fn iter(&self) -> impl Iterator<Item = (&Trigger, &[Effect])> {
        self.0.iter().map(|(trigger, effects)| (trigger, effects.as_slice()))
    }

    /// Whether no trigger has an effect.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    /// Replace the effects of a trigger. An empty list removes the trigger.
    #[must_use]
    pub fn with(&self, trigger: Trigger, effects: Vec<Effect>) -> Self {
        let mut next = self.clone();
        let inner = Arc::make_mut(&mut next.0);
        if effects.is_empty() {
            inner.remove(&trigger);
        } else {
            inner.insert(trigger, effects);
        }
        next
    }

    /// Append an effect to a trigger.
    #[must_use]
    pub fn push(&self, trigger: Trigger, effect: Effect) -> Self {
        let mut list = self.get(&trigger).to_vec();
        list.push(effect);
        self.with(trigger, list)
    }
}

impl FromIterator<(Trigger, Vec<Effect>)> for Effects {
    fn from_iter<I: IntoIterator<Item = (Trigger, Vec<Effect>)>>(iter: I) -> Self {
        Self(Arc::new(
            iter.into_iter()
                .filter(|(_, effects)| !effects.is_empty())
                .collect(),
        ))
    }
}

/// Resolve a symbolic player reference against the map's current player.
pub fn resolve_player(map: &MapState, player: DynamicPlayerId) -> Result<PlayerId> {
    let current = map.current_player();
    let in_turn_order = || {
        let active = map.active();
        let start = active.iter().position(|id| *id == current).unwrap_or(0);
        active
            .iter()
            .cycle()
            .skip(start + 1)
            .take(active.len())
            .copied()
            .collect::<Vec<_>>()
    };
    match player {
        DynamicPlayerId::Player(id) => Ok(id),
        DynamicPlayerId::Current => Ok(current),
        DynamicPlayerId::Opponent => in_turn_order()
            .into_iter()
            .find(|id| map.is_opponent(current, *id))
            .ok_or_else(|| GameError::InvalidState(format!("player {current} has no opponent"))),
        DynamicPlayerId::Team => Ok(in_turn_order()
            .into_iter()
            .find(|id| *id != current && map.is_teammate(current, *id))
            .unwrap_or(current)),
    }
}

/// Result of firing a trigger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fired {
    /// Map after every response was applied.
    pub map: MapState,
    /// Effects with fired one-shot effects removed.
    pub effects: Effects,
    /// Responses in firing order.
    pub responses: Vec<ActionResponse>,
}

/// Fire every eligible effect of the trigger.
pub fn fire(map: &MapState, effects: &Effects, trigger: &Trigger) -> Result<Fired> {
    let mut responses = Vec::new();
    let mut remaining = Vec::new();
    let mut fired = 0usize;
    for effect in effects.get(trigger) {
        if !effect.is_eligible(map) {
            remaining.push(effect.clone());
            continue;
        }
        for action in &effect.actions {
            responses.push(action.to_response(map)?);
        }
        fired += 1;
        if effect.occurrence == Occurrence::Always {
            remaining.push(effect.clone());
        }
    }
    let next = apply_all(map, &responses).map_err(|error| {
        warn!(%trigger, %error, "rejected effect batch");
        error
    })?;
    if fired > 0 {
        debug!(%trigger, fired, responses = responses.len(), "fired effects");
    }
    Ok(Fired {
        map: next,
        effects: effects.with(trigger.clone(), remaining),
        responses,
    })
}

/// A content change made while preparing effects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationNotice {
    /// Trigger the effect was taken from.
    pub trigger: Trigger,
    /// Description of the change.
    pub message: String,
}

impl fmt::Display for MigrationNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.trigger, self.message)
    }
}

/// Move dialogue-only `GameEnd` effects to `Start`.
///
/// Dialogue cannot be shown after the game ended, so such effects would
/// never be seen. Each moved effect loses its conditions and produces a
/// notice.
#[must_use]
pub fn migrate_game_end_dialogue(effects: &Effects) -> (Effects, Vec<MigrationNotice>) {
    let (dialogue, kept): (Vec<Effect>, Vec<Effect>) = effects
        .get(&Trigger::GameEnd)
        .iter()
        .cloned()
        .partition(Effect::is_dialogue_only);
    if dialogue.is_empty() {
        return (effects.clone(), Vec::new());
    }
    let mut start = effects.get(&Trigger::Start).to_vec();
    let mut notices = Vec::with_capacity(dialogue.len());
    for effect in dialogue {
        let notice = MigrationNotice {
            trigger: Trigger::GameEnd,
            message: format!(
                "moved {} dialogue action(s) to Start",
                effect.actions.len()
            ),
        };
        warn!(%notice, "migrated effect");
        notices.push(notice);
        start.push(Effect {
            conditions: Vec::new(),
            ..effect
        });
    }
    let migrated = effects
        .with(Trigger::GameEnd, kept)
        .with(Trigger::Start, start);
    (migrated, notices)
}

/// Effects ready for a playtest, plus the response to begin with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedEffects {
    /// Effects to run the playtest with.
    pub effects: Effects,
    /// `Start` when no start effect is left to begin the game.
    pub last_action: Option<ActionResponse>,
    /// Changes made to the effects.
    pub notices: Vec<MigrationNotice>,
}

/// Prepare effects for a playtest.
///
/// Dialogue-only `GameEnd` effects are first moved to `Start`. With a
/// scenario under test (`Some((trigger, index))`) that effect runs at
/// `Start` without its conditions; the index refers to the effects as
/// given. Otherwise character dialogue is stripped from `Start` effects;
/// effects left without actions are removed.
pub fn prepare_effects(
    effects: &Effects,
    scenario: Option<(&Trigger, usize)>,
) -> Result<PreparedEffects> {
    let (migrated, mut notices) = migrate_game_end_dialogue(effects);
    if let Some((trigger, index)) = scenario {
        let effect = effects.get(trigger).get(index).ok_or_else(|| {
            GameError::InvalidState(format!("no effect {index} for trigger {trigger}"))
        })?;
        let effects = if *trigger == Trigger::Start {
            migrated
        } else {
            migrated.with(
                Trigger::Start,
                vec![Effect {
                    conditions: Vec::new(),
                    ..effect.clone()
                }],
            )
        };
        return Ok(PreparedEffects {
            effects,
            last_action: None,
            notices,
        });
    }

    let start: Vec<Effect> = migrated
        .get(&Trigger::Start)
        .iter()
        .filter_map(|effect| {
            let actions: Vec<EffectAction> = effect
                .actions
                .iter()
                .filter(|action| !matches!(action, EffectAction::CharacterMessage { .. }))
                .cloned()
                .collect();
            let stripped = effect.actions.len() - actions.len();
            if stripped > 0 {
                notices.push(MigrationNotice {
                    trigger: Trigger::Start,
                    message: format!("stripped {stripped} character message(s)"),
                });
            }
            (!actions.is_empty()).then(|| Effect {
                actions,
                ..effect.clone()
            })
        })
        .collect();
    let last_action = start.is_empty().then_some(ActionResponse::Start);
    Ok(PreparedEffects {
        effects: migrated.with(Trigger::Start, start),
        last_action,
        notices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{Objective, ObjectiveKind, Player};
    use crate::registry::tile::PLAIN;
    use crate::registry::unit::INFANTRY;
    use crate::vector::SizeVector;

    fn map() -> MapState {
        MapState::new(
            SizeVector::new(5, 5),
            PLAIN,
            vec![
                Player::new(PlayerId(1), 1, 100),
                Player::new(PlayerId(2), 2, 100),
                Player::new(PlayerId(3), 1, 100),
            ],
        )
        .unwrap()
    }

    fn message(text: &str) -> EffectAction {
        EffectAction::Message {
            message: text.into(),
            player: None,
        }
    }

    fn funds(player: DynamicPlayerId, funds: i32) -> EffectAction {
        EffectAction::IncreaseFunds { player, funds }
    }

    #[test]
    fn test_trigger_strings() {
        for (text, trigger) in [
            ("Start", Trigger::Start),
            ("GameEnd", Trigger::GameEnd),
            ("EndTurn", Trigger::EndTurn),
            ("Objective:3", Trigger::Objective(3)),
            ("Ambush", Trigger::Custom("Ambush".into())),
        ] {
            assert_eq!(text.parse::<Trigger>().unwrap(), trigger);
            assert_eq!(trigger.to_string(), text);
        }
        assert!("".parse::<Trigger>().is_err());
    }

    #[test]
    fn test_custom_trigger_rejects_reserved_names() {
        assert_eq!(Trigger::custom("Ambush").unwrap(), Trigger::Custom("Ambush".into()));
        for reserved in ["Start", "GameEnd", "EndTurn", "Objective:2", ""] {
            assert!(Trigger::custom(reserved).is_err(), "{reserved}");
        }
        let effects = Effects::new().push(
            Trigger::Custom("Start".into()),
            Effect::new(vec![message("Hello")]),
        );
        assert!(effects.to_json().is_err());
        let effects = Effects::new().push(
            Trigger::custom("Objective:x").unwrap(),
            Effect::new(vec![message("Hello")]),
        );
        assert_eq!(Effects::from_json(&effects.to_json().unwrap()).unwrap(), effects);
    }

    #[test]
    fn test_effects_json_round_trip() {
        let effects = Effects::new()
            .push(Trigger::Start, Effect::new(vec![message("Hello")]))
            .push(
                Trigger::Objective(1),
                Effect {
                    actions: vec![funds(DynamicPlayerId::Current, 100)],
                    conditions: vec![Condition::Round {
                        min: Some(2),
                        max: None,
                    }],
                    occurrence: Occurrence::Always,
                },
            );
        let json = effects.to_json().unwrap();
        assert!(json.starts_with(r#"{"Start":"#));
        assert!(json.contains(r#""Objective:1":"#));
        assert_eq!(Effects::from_json(&json).unwrap(), effects);
    }

    #[test]
    fn test_resolve_player() {
        let map = map();
        assert_eq!(resolve_player(&map, DynamicPlayerId::Current).unwrap(), PlayerId(1));
        assert_eq!(resolve_player(&map, DynamicPlayerId::Opponent).unwrap(), PlayerId(2));
        assert_eq!(resolve_player(&map, DynamicPlayerId::Team).unwrap(), PlayerId(3));
        assert_eq!(
            resolve_player(&map, DynamicPlayerId::Player(PlayerId(2))).unwrap(),
            PlayerId(2)
        );
    }

    #[test]
    fn test_fire_removes_once_effects() {
        let effects = Effects::new()
            .push(Trigger::Start, Effect::new(vec![funds(DynamicPlayerId::Current, 50)]))
            .push(
                Trigger::Start,
                Effect {
                    occurrence: Occurrence::Always,
                    ..Effect::new(vec![funds(DynamicPlayerId::Opponent, 10)])
                },
            );
        let fired = fire(&map(), &effects, &Trigger::Start).unwrap();
        assert_eq!(fired.responses.len(), 2);
        assert_eq!(fired.map.player(PlayerId(1)).unwrap().funds, 150);
        assert_eq!(fired.map.player(PlayerId(2)).unwrap().funds, 110);
        assert_eq!(fired.effects.get(&Trigger::Start).len(), 1);

        let again = fire(&fired.map, &fired.effects, &Trigger::Start).unwrap();
        assert_eq!(again.map.player(PlayerId(2)).unwrap().funds, 120);
        assert_eq!(again.effects, fired.effects);
    }

    #[test]
    fn test_fire_is_atomic() {
        let effects = Effects::new().push(
            Trigger::Custom("Tax".into()),
            Effect::new(vec![
                funds(DynamicPlayerId::Current, 50),
                funds(DynamicPlayerId::Current, -500),
            ]),
        );
        let map = map();
        let result = fire(&map, &effects, &Trigger::Custom("Tax".into()));
        assert!(matches!(result, Err(GameError::InsufficientFunds { .. })));
        assert_eq!(map.player(PlayerId(1)).unwrap().funds, 100);
    }

    #[test]
    fn test_conditions_gate_effects() {
        let mut config = map().config().clone();
        let mut objective = Objective::new(ObjectiveKind::Survival { rounds: 3 });
        objective.completed.insert(PlayerId(2));
        config.objectives.insert(1, objective);
        let map = map()
            .with_config(config)
            .place_unit(Vector::new(2, 2), Unit::create(INFANTRY, PlayerId(1)).unwrap())
            .unwrap();

        let holds = |condition: Condition| condition.holds(&map);
        assert!(holds(Condition::ObjectiveCompleted {
            objective_id: 1,
            player: None
        }));
        assert!(!holds(Condition::ObjectiveCompleted {
            objective_id: 1,
            player: Some(DynamicPlayerId::Current)
        }));
        assert!(holds(Condition::CurrentPlayer {
            player: DynamicPlayerId::Player(PlayerId(1))
        }));
        assert!(!holds(Condition::Round {
            min: Some(2),
            max: None
        }));
        assert!(holds(Condition::UnitOwnedBy {
            position: Vector::new(2, 2),
            player: DynamicPlayerId::Current
        }));
        assert!(!holds(Condition::BuildingOwnedBy {
            position: Vector::new(2, 2),
            player: DynamicPlayerId::Current
        }));
    }

    #[test]
    fn test_spawn_resolves_owner() {
        let action = EffectAction::Spawn {
            units: vec![(
                Vector::new(3, 3),
                Unit::create(INFANTRY, PlayerId::NEUTRAL).unwrap(),
            )],
            player: Some(DynamicPlayerId::Opponent),
        };
        let ActionResponse::Spawn { units, .. } = action.to_response(&map()).unwrap() else {
            panic!("expected a spawn response");
        };
        assert_eq!(units[0].1.player, PlayerId(2));
    }

    #[test]
    fn test_migrate_game_end_dialogue() {
        let effects = Effects::new()
            .push(Trigger::GameEnd, Effect::new(vec![message("Well done")]))
            .push(
                Trigger::GameEnd,
                Effect::new(vec![message("Bonus"), funds(DynamicPlayerId::Current, 10)]),
            );
        let (migrated, notices) = migrate_game_end_dialogue(&effects);
        assert_eq!(notices.len(), 1);
        assert_eq!(migrated.get(&Trigger::GameEnd).len(), 1);
        assert_eq!(migrated.get(&Trigger::Start)[0].actions, vec![message("Well done")]);

        let (unchanged, none) = migrate_game_end_dialogue(&migrated);
        assert_eq!(unchanged, migrated);
        assert!(none.is_empty());
    }

    #[test]
    fn test_prepare_effects() {
        let character = EffectAction::CharacterMessage {
            message: "Hi".into(),
            player: DynamicPlayerId::Current,
            unit_id: INFANTRY,
            variant: None,
        };
        let effects = Effects::new().push(Trigger::Start, Effect::new(vec![character]));
        let prepared = prepare_effects(&effects, None).unwrap();
        assert!(prepared.effects.get(&Trigger::Start).is_empty());
        assert_eq!(prepared.last_action, Some(ActionResponse::Start));
        assert_eq!(prepared.notices.len(), 1);

        let scenario = Effect {
            conditions: vec![Condition::Round {
                min: Some(5),
                max: None,
            }],
            ..Effect::new(vec![message("Later")])
        };
        let effects = effects.push(Trigger::EndTurn, scenario);
        let prepared = prepare_effects(&effects, Some((&Trigger::EndTurn, 0))).unwrap();
        let start = prepared.effects.get(&Trigger::Start);
        assert_eq!(start.len(), 1);
        assert!(start[0].conditions.is_empty());
        assert_eq!(prepared.last_action, None);
    }

    #[test]
    fn test_prepare_effects_moves_game_end_dialogue() {
        let effects = Effects::new()
            .push(Trigger::GameEnd, Effect::new(vec![message("bye")]))
            .push(
                Trigger::GameEnd,
                Effect::new(vec![message("Bonus"), funds(DynamicPlayerId::Current, 10)]),
            );
        let prepared = prepare_effects(&effects, None).unwrap();
        assert_eq!(prepared.effects.get(&Trigger::GameEnd).len(), 1);
        assert_eq!(
            prepared.effects.get(&Trigger::Start)[0].actions,
            vec![message("bye")]
        );
        assert_eq!(prepared.last_action, None);
        assert_eq!(prepared.notices.len(), 1);
        assert_eq!(prepared.notices[0].trigger, Trigger::GameEnd);

        let scenario = prepare_effects(&effects, Some((&Trigger::GameEnd, 1))).unwrap();
        assert_eq!(scenario.notices.len(), 1);
        assert_eq!(scenario.effects.get(&Trigger::GameEnd).len(), 1);
        assert_eq!(
            scenario.effects.get(&Trigger::Start)[0].actions,
            vec![message("Bonus"), funds(DynamicPlayerId::Current, 10)]
        );
    }
}
