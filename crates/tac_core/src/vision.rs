//! Fog of war.
//!
//! With fog enabled a player sees the fields within vision range of the
//! units and buildings their team owns. Concealing tiles hide whatever
//! stands on them unless a friendly entity is adjacent. Buildings are
//! always known; only units are masked.
//!
//! [`dim_response`] rewrites a response for a viewer so that it applies to
//! that viewer's masked map.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::action::ActionResponse;
use crate::map::{MapState, PlayerId, Unit};
use crate::registry::BuildingBehaviors;
use crate::vector::Vector;

/// Vision of an ordinary owned building.
pub const BUILDING_VISION: u32 = 1;
/// Vision of a building with radar.
pub const RADAR_VISION: u32 = 4;

/// Visible fields for a viewer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Vision {
    /// No fog, or a spectator.
    All,
    /// Only these fields.
    Fields(BTreeSet<Vector>),
}

impl Vision {
    /// Whether the field is visible.
    #[must_use]
    pub fn contains(&self, position: Vector) -> bool {
        match self {
            Self::All => true,
            Self::Fields(fields) => fields.contains(&position),
        }
    }
}

/// Compute what `viewer` can see. The neutral player stands for a spectator
/// and sees everything.
#[must_use]
pub fn visible_positions(map: &MapState, viewer: PlayerId) -> Vision {
    if !map.config().fog || viewer.is_neutral() {
        return Vision::All;
    }
    let friendly = |owner: PlayerId| owner == viewer || map.is_teammate(viewer, owner);
    let mut sources: Vec<(Vector, u32)> = map
        .units()
        .filter(|(_, unit)| friendly(unit.player))
        .map(|(position, unit)| (position, u32::from(unit.info().vision)))
        .collect();
    sources.extend(
        map.buildings()
            .filter(|(_, building)| friendly(building.player))
            .map(|(position, building)| {
                let radar = building
                    .info()
                    .behaviors
                    .contains(BuildingBehaviors::RADAR);
                (position, if radar { RADAR_VISION } else { BUILDING_VISION })
            }),
    );

    let fields = map
        .size()
        .positions()
        .filter(|position| {
            let concealed = map
                .tile_info_at(*position)
                .is_some_and(|tile| tile.conceals);
            sources.iter().any(|(source, range)| {
                let distance = source.distance(*position);
                if concealed {
                    distance <= 1
                } else {
                    distance <= *range
                }
            })
        })
        .collect();
    Vision::Fields(fields)
}

/// The map as `viewer` knows it: units outside vision are removed.
#[must_use]
pub fn mask_map(map: &MapState, viewer: PlayerId) -> MapState {
    let vision = visible_positions(map, viewer);
    if vision == Vision::All {
        return map.clone();
    }
    let mut masked = map.clone();
    Arc::make_mut(&mut masked.units).retain(|position, _| vision.contains(*position));
    masked
}

/// Rewrite a response for `viewer`. `map` is the authoritative state before
/// the response is applied. `None` means the viewer learns nothing.
#[must_use]
pub fn dim_response(
    map: &MapState,
    viewer: PlayerId,
    response: &ActionResponse,
) -> Option<ActionResponse> {
    let vision = visible_positions(map, viewer);
    if vision == Vision::All {
        return Some(response.clone());
    }
    let sees = |position: &Vector| vision.contains(*position);
    let visible_if = |position: &Vector| sees(position).then(|| response.clone());

    match response {
        ActionResponse::Move {
            from, to, fuel, ..
        } => match (sees(from), sees(to)) {
            (true, true) => Some(response.clone()),
            (true, false) => Some(ActionResponse::HiddenRemove { from: *from }),
            (false, true) => {
                let unit = arriving_unit(map, *from, *fuel)?;
                // A unit entering a visible transport is not shown.
                if map.unit_at(*to).is_some() {
                    return None;
                }
                Some(ActionResponse::HiddenMove { to: *to, unit })
            }
            (false, false) => None,
        },
        ActionResponse::AttackUnit {
            from,
            to,
            player_b,
            unit_b,
            charge_b,
            ..
        } => match (sees(from), sees(to)) {
            (true, true) => Some(response.clone()),
            (false, true) => Some(ActionResponse::HiddenTargetAttackUnit {
                to: *to,
                unit_b: unit_b.clone(),
                player_b: *player_b,
                charge_b: Some(*charge_b),
            }),
            _ => None,
        },
        ActionResponse::AttackBuilding { from, .. }
        | ActionResponse::Capture { from, .. }
        | ActionResponse::Supply { from, .. }
        | ActionResponse::CreateBuilding { from, .. }
        | ActionResponse::CreateTracks { from }
        | ActionResponse::Fold { from }
        | ActionResponse::Unfold { from }
        | ActionResponse::CompleteUnit { from } => visible_if(from),
        ActionResponse::CreateUnit { to, .. }
        | ActionResponse::Heal { to, .. }
        | ActionResponse::Rescue { to, .. }
        | ActionResponse::Sabotage { to, .. } => visible_if(to),
        ActionResponse::DropUnit { from, index, to } => match (sees(from), sees(to)) {
            (true, true) => Some(response.clone()),
            (true, false) => None,
            (false, true) => {
                let unit = map
                    .unit_at(*from)?
                    .transports
                    .get(*index)?
                    .clone()
                    .complete();
                Some(ActionResponse::HiddenMove { to: *to, unit })
            }
            (false, false) => None,
        },
        ActionResponse::Swap { source, target, .. } => {
            (sees(source) && sees(target)).then(|| response.clone())
        }
        ActionResponse::Spawn {
            units,
            buildings,
            players,
        } => {
            let units: Vec<(Vector, Unit)> = units
                .iter()
                .filter(|(position, _)| sees(position))
                .cloned()
                .collect();
            Some(ActionResponse::Spawn {
                units,
                buildings: buildings.clone(),
                players: players.clone(),
            })
        }
        ActionResponse::ActivatePower {
            skill,
            free,
            from,
            units,
        } => Some(ActionResponse::ActivatePower {
            skill: *skill,
            free: *free,
            from: *from,
            units: units.as_ref().map(|units| {
                units
                    .iter()
                    .filter(|(position, _)| sees(position))
                    .cloned()
                    .collect()
            }),
        }),
        ActionResponse::EndTurn {
            current,
            next,
            round,
            supply,
            miss,
        } => {
            let supply: Option<Vec<Vector>> = supply
                .as_ref()
                .map(|positions| positions.iter().copied().filter(|p| sees(p)).collect())
                .filter(|positions: &Vec<Vector>| !positions.is_empty());
            Some(ActionResponse::EndTurn {
                current: *current,
                next: *next,
                round: *round,
                supply,
                miss: *miss,
            })
        }
        ActionResponse::Start
        | ActionResponse::BeginGame
        | ActionResponse::CompleteBuilding { .. }
        | ActionResponse::Message { .. }
        | ActionResponse::CharacterMessage { .. }
        | ActionResponse::SetPlayer { .. }
        | ActionResponse::ReceiveReward { .. }
        | ActionResponse::BuySkill { .. }
        | ActionResponse::SecretDiscovered { .. }
        | ActionResponse::IncreaseFunds { .. }
        | ActionResponse::IncreaseCharge { .. }
        | ActionResponse::SetPlayerTime { .. }
        | ActionResponse::GameEnd { .. }
        | ActionResponse::OptionalObjective { .. }
        | ActionResponse::PlayerLost { .. }
        | ActionResponse::HiddenMove { .. }
        | ActionResponse::HiddenRemove { .. }
        | ActionResponse::HiddenTargetAttackUnit { .. } => Some(response.clone()),
    }
}

fn arriving_unit(map: &MapState, from: Vector, fuel: u32) -> Option<Unit> {
    let mut unit = map.unit_at(from)?.clone();
    unit.fuel = fuel;
    unit.moved = true;
    unit.capturing = false;
    Some(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{apply, apply_all, execute_action, Action};
    use crate::map::Player;
    use crate::registry::tile::{FOREST, PLAIN};
    use crate::registry::unit::INFANTRY;
    use crate::vector::SizeVector;

    fn foggy() -> MapState {
        let map = MapState::new(
            SizeVector::new(10, 3),
            PLAIN,
            vec![Player::new(PlayerId(1), 1, 0), Player::new(PlayerId(2), 2, 0)],
        )
        .unwrap()
        .set_tile(Vector::new(3, 2), FOREST)
        .unwrap()
        .place_unit(Vector::new(1, 2), Unit::create(INFANTRY, PlayerId(1)).unwrap())
        .unwrap()
        .place_unit(Vector::new(3, 2), Unit::create(INFANTRY, PlayerId(2)).unwrap())
        .unwrap()
        .place_unit(Vector::new(9, 2), Unit::create(INFANTRY, PlayerId(2)).unwrap())
        .unwrap();
        let mut config = map.config().clone();
        config.fog = true;
        map.with_config(config)
    }

    #[test]
    fn test_no_fog_sees_everything() {
        let map = foggy();
        let mut config = map.config().clone();
        config.fog = false;
        let clear = map.with_config(config);
        assert_eq!(visible_positions(&clear, PlayerId(1)), Vision::All);
        assert_eq!(visible_positions(&map, PlayerId::NEUTRAL), Vision::All);
    }

    #[test]
    fn test_vision_and_concealment() {
        let vision = visible_positions(&foggy(), PlayerId(1));
        assert!(vision.contains(Vector::new(2, 2)));
        assert!(vision.contains(Vector::new(1, 1)));
        // Forest two fields away hides its occupant.
        assert!(!vision.contains(Vector::new(3, 2)));
        assert!(!vision.contains(Vector::new(9, 2)));
    }

    #[test]
    fn test_mask_map() {
        let masked = mask_map(&foggy(), PlayerId(1));
        assert_eq!(masked.units().count(), 1);
        assert!(masked.unit_at(Vector::new(1, 2)).is_some());
        let enemy = mask_map(&foggy(), PlayerId(2));
        assert_eq!(enemy.units().count(), 3);
    }

    #[test]
    fn test_move_out_of_the_fog() {
        let start = foggy();
        let map = apply_all(&start, &execute_action(&start, &Action::EndTurn).unwrap()).unwrap();
        assert_eq!(map.current_player(), PlayerId(2));
        let response = ActionResponse::Move {
            from: Vector::new(9, 2),
            to: Vector::new(2, 1),
            fuel: 44,
            path: None,
            completed: false,
        };
        let dimmed = dim_response(&map, PlayerId(1), &response).unwrap();
        let ActionResponse::HiddenMove { to, unit } = &dimmed else {
            panic!("expected a hidden move, got {dimmed:?}");
        };
        assert_eq!(*to, Vector::new(2, 1));
        assert_eq!(unit.fuel, 44);
        let viewed = apply(&mask_map(&map, PlayerId(1)), &dimmed).unwrap();
        let actual = apply(&map, &response).unwrap();
        assert_eq!(
            viewed.unit_at(Vector::new(2, 1)),
            actual.unit_at(Vector::new(2, 1))
        );
    }

    #[test]
    fn test_move_into_the_fog() {
        let map = foggy()
            .place_unit(Vector::new(2, 1), Unit::create(INFANTRY, PlayerId(2)).unwrap())
            .unwrap();
        let response = ActionResponse::Move {
            from: Vector::new(2, 1),
            to: Vector::new(8, 1),
            fuel: 44,
            path: None,
            completed: false,
        };
        assert_eq!(
            dim_response(&map, PlayerId(1), &response),
            Some(ActionResponse::HiddenRemove {
                from: Vector::new(2, 1)
            })
        );
        let hidden = ActionResponse::CompleteUnit {
            from: Vector::new(9, 2),
        };
        assert_eq!(dim_response(&map, PlayerId(1), &hidden), None);
        assert_eq!(dim_response(&map, PlayerId(2), &hidden), Some(hidden));
    }

    #[test]
    fn test_attack_from_the_fog() {
        let map = foggy();
        let wounded = Unit::create(INFANTRY, PlayerId(1)).unwrap().with_health(40);
        let response = ActionResponse::AttackUnit {
            from: Vector::new(3, 2),
            to: Vector::new(1, 2),
            has_counter_attack: false,
            player_a: PlayerId(2),
            player_b: PlayerId(1),
            unit_a: Some(Unit::create(INFANTRY, PlayerId(2)).unwrap()),
            unit_b: Some(wounded.clone()),
            charge_a: 10,
            charge_b: 20,
        };
        let dimmed = dim_response(&map, PlayerId(1), &response).unwrap();
        assert_eq!(
            dimmed,
            ActionResponse::HiddenTargetAttackUnit {
                to: Vector::new(1, 2),
                unit_b: Some(wounded.clone()),
                player_b: PlayerId(1),
                charge_b: Some(20),
            }
        );
        let next = apply(&mask_map(&map, PlayerId(1)), &dimmed).unwrap();
        assert_eq!(next.unit_at(Vector::new(1, 2)), Some(&wounded));
    }
}
