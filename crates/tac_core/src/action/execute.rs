//! Turning player intents into responses.
//!
//! The executor computes everything a response carries (paths, fuel,
//! combat results, income) and then checks the responses by applying them
//! to a scratch copy, so a returned list is always applicable to the map it
//! was computed from.

use tracing::debug;

use super::apply::apply_all;
use super::response::{ActionResponse, TurnPlayer};
use super::Action;
use crate::combat::{resolve_building_attack, resolve_unit_attack};
use crate::economy::{income, supply_positions};
use crate::error::{GameError, Result};
use crate::map::{MapState, Unit};
use crate::movement::find_path;
use crate::registry::skill::PowerEffect;
use crate::registry::Skill;
use crate::vector::Vector;

/// Validate an intent and produce its responses.
pub fn execute_action(map: &MapState, action: &Action) -> Result<Vec<ActionResponse>> {
    let responses = responses_for(map, action)?;
    apply_all(map, &responses)?;
    debug!(
        action = action.name(),
        responses = responses.len(),
        "executed action"
    );
    Ok(responses)
}

fn responses_for(map: &MapState, action: &Action) -> Result<Vec<ActionResponse>> {
    use ActionResponse as R;
    let player = map.current_player();
    Ok(match action {
        Action::Move { from, to, complete } => vec![plan_move(map, *from, *to, *complete)?],
        Action::AttackUnit { from, to } => vec![resolve_unit_attack(map, *from, *to)?],
        Action::AttackBuilding { from, to } => vec![resolve_building_attack(map, *from, *to)?],
        Action::Capture { from } => vec![plan_capture(map, *from)?],
        Action::Supply { from } => vec![R::Supply {
            from: *from,
            player,
        }],
        Action::CreateUnit { from, to, id } => vec![R::CreateUnit {
            from: *from,
            to: *to,
            unit: Unit::create(*id, player)?,
            free: false,
        }],
        Action::DropUnit { from, index, to } => vec![R::DropUnit {
            from: *from,
            index: *index,
            to: *to,
        }],
        Action::CreateBuilding { from, id } => vec![R::CreateBuilding {
            from: *from,
            building: *id,
            free: false,
        }],
        Action::CreateTracks { from } => vec![R::CreateTracks { from: *from }],
        Action::Fold { from } => vec![R::Fold { from: *from }],
        Action::Unfold { from } => vec![R::Unfold { from: *from }],
        Action::CompleteUnit { from } => vec![R::CompleteUnit { from: *from }],
        Action::CompleteBuilding { from } => vec![R::CompleteBuilding { from: *from }],
        Action::EndTurn => vec![plan_end_turn(map)?],
        Action::BuySkill { from, skill } => vec![R::BuySkill {
            from: *from,
            player,
            skill: *skill,
        }],
        Action::ActivatePower { skill, from } => vec![plan_power(map, *skill, *from)?],
        Action::Heal { from, to } => vec![R::Heal {
            from: Some(*from),
            to: *to,
        }],
        Action::Rescue { from, to } => vec![R::Rescue {
            from: Some(*from),
            to: *to,
            player,
        }],
        Action::Sabotage { from, to } => vec![R::Sabotage {
            from: Some(*from),
            to: *to,
        }],
        Action::Swap { source, target } => plan_swap(map, *source, *target)?,
    })
}

fn plan_move(map: &MapState, from: Vector, to: Vector, complete: bool) -> Result<ActionResponse> {
    let unit = map.unit_at(from).ok_or(GameError::NoUnit(from))?;
    if unit.moved {
        return Err(GameError::AlreadyMoved(from));
    }
    let (path, cost) = find_path(map, from, to)?;
    let fuel = unit
        .fuel
        .checked_sub(cost)
        .ok_or(GameError::InsufficientFuel {
            required: cost,
            available: unit.fuel,
        })?;
    Ok(ActionResponse::Move {
        from,
        to,
        fuel,
        path: Some(path),
        completed: complete,
    })
}

fn plan_capture(map: &MapState, from: Vector) -> Result<ActionResponse> {
    let unit = map.unit_at(from).ok_or(GameError::NoUnit(from))?;
    let building = map.building_at(from).ok_or(GameError::NoBuilding(from))?;
    if !unit.capturing {
        return Ok(ActionResponse::Capture {
            from,
            building: None,
            player: None,
        });
    }
    Ok(ActionResponse::Capture {
        from,
        building: Some(building.clone().with_player(unit.player)),
        player: Some(building.player),
    })
}

fn plan_end_turn(map: &MapState) -> Result<ActionResponse> {
    let current = map.player_or_err(map.current_player())?;
    let (next_id, wrapped) = map
        .next_player()
        .ok_or_else(|| GameError::InvalidState("no player to hand over to".into()))?;
    let next = map.player_or_err(next_id)?;
    let funds = next.funds.saturating_add(income(map, next_id));
    let supply = supply_positions(map, next_id);
    Ok(ActionResponse::EndTurn {
        current: TurnPlayer {
            funds: current.funds,
            player: current.id,
        },
        next: TurnPlayer {
            funds,
            player: next_id,
        },
        round: map.round() + u32::from(wrapped),
        supply: (!supply.is_empty()).then_some(supply),
        miss: false,
    })
}

fn plan_power(map: &MapState, skill: Skill, from: Option<Vector>) -> Result<ActionResponse> {
    let player = map.current_player();
    let power = skill
        .info()
        .power
        .as_ref()
        .ok_or_else(|| GameError::InvalidAction(format!("{skill} has no power")))?;
    let units: Vec<(Vector, Unit)> = match power.effect {
        PowerEffect::None => Vec::new(),
        PowerEffect::HealAll(amount) => map
            .units_of(player)
            .filter(|(_, unit)| unit.is_damaged())
            .map(|(position, unit)| {
                let healed = unit
                    .clone()
                    .with_health(i32::from(unit.health) + i32::from(amount));
                (position, healed)
            })
            .collect(),
        PowerEffect::Resupply => map
            .units_of(player)
            .map(|(position, unit)| (position, unit.clone().refill()))
            .collect(),
    };
    Ok(ActionResponse::ActivatePower {
        skill,
        free: false,
        from,
        units: (!units.is_empty()).then_some(units),
    })
}

fn plan_swap(map: &MapState, source: Vector, target: Vector) -> Result<Vec<ActionResponse>> {
    let player = map.current_player();
    let mut pair = Vec::with_capacity(2);
    for position in [source, target] {
        let unit = map.unit_at(position).ok_or(GameError::NoUnit(position))?;
        if unit.player != player {
            return Err(GameError::NotOwner { position, player });
        }
        if unit.moved || unit.completed {
            return Err(GameError::AlreadyCompleted(position));
        }
        pair.push(unit.clone());
    }
    if source.distance(target) != 1 {
        return Err(GameError::InvalidAction(format!(
            "{target} is not adjacent to {source}"
        )));
    }
    let target_unit = pair.pop();
    let source_unit = pair
        .pop()
        .ok_or_else(|| GameError::InvalidState("swap pair is incomplete".into()))?;
    Ok(vec![
        ActionResponse::Swap {
            source,
            source_unit,
            target,
            target_unit,
        },
        ActionResponse::CompleteUnit { from: target },
        ActionResponse::CompleteUnit { from: source },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::apply;
    use crate::map::{Building, Player, PlayerId};
    use crate::registry::building::{FACTORY, HOUSE, HQ};
    use crate::registry::tile::{CONSTRUCTION_SITE, PLAIN};
    use crate::registry::unit::{INFANTRY, JEEP, SMALL_TANK};
    use crate::vector::SizeVector;

    fn map() -> MapState {
        MapState::new(
            SizeVector::new(6, 6),
            PLAIN,
            vec![
                Player::new(PlayerId(1), 1, 300),
                Player::new(PlayerId(2), 2, 150),
            ],
        )
        .unwrap()
    }

    fn unit(id: crate::registry::UnitId, player: u8) -> Unit {
        Unit::create(id, PlayerId(player)).unwrap()
    }

    fn run(map: &MapState, action: Action) -> MapState {
        let responses = execute_action(map, &action).unwrap();
        apply_all(map, &responses).unwrap()
    }

    #[test]
    fn test_move_spends_fuel_along_path() {
        let map = map().place_unit(Vector::new(1, 1), unit(INFANTRY, 1)).unwrap();
        let action = Action::Move {
            from: Vector::new(1, 1),
            to: Vector::new(3, 1),
            complete: false,
        };
        let responses = execute_action(&map, &action).unwrap();
        assert_eq!(
            responses,
            vec![ActionResponse::Move {
                from: Vector::new(1, 1),
                to: Vector::new(3, 1),
                fuel: 48,
                path: Some(vec![Vector::new(2, 1), Vector::new(3, 1)]),
                completed: false,
            }]
        );
        let next = apply(&map, &responses[0]).unwrap();
        let moved = next.unit_at(Vector::new(3, 1)).unwrap();
        assert!(moved.moved);
        assert_eq!(moved.fuel, 48);

        let onwards = Action::Move {
            from: Vector::new(3, 1),
            to: Vector::new(5, 1),
            complete: false,
        };
        assert_eq!(
            execute_action(&next, &onwards),
            Err(GameError::AlreadyMoved(Vector::new(3, 1)))
        );
    }

    #[test]
    fn test_move_of_foreign_unit_is_rejected() {
        let map = map().place_unit(Vector::new(1, 1), unit(INFANTRY, 2)).unwrap();
        let action = Action::Move {
            from: Vector::new(1, 1),
            to: Vector::new(2, 1),
            complete: false,
        };
        assert!(matches!(
            execute_action(&map, &action),
            Err(GameError::NotOwner { .. })
        ));
    }

    #[test]
    fn test_create_unit_and_funds() {
        let map = map()
            .set_tile(Vector::new(1, 1), CONSTRUCTION_SITE)
            .unwrap()
            .place_building(Vector::new(1, 1), Building::create(FACTORY, PlayerId(1)).unwrap())
            .unwrap();
        let action = Action::CreateUnit {
            from: Vector::new(1, 1),
            to: Vector::new(1, 2),
            id: SMALL_TANK,
        };
        let next = run(&map, action.clone());
        assert_eq!(next.player(PlayerId(1)).unwrap().funds, 50);
        assert_eq!(next.unit_at(Vector::new(1, 2)).unwrap().id, SMALL_TANK);
        assert!(matches!(
            execute_action(&next, &action),
            Err(GameError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn test_end_turn_pays_income_and_wraps_round() {
        let map = map()
            .set_tile(Vector::new(2, 2), CONSTRUCTION_SITE)
            .unwrap()
            .place_building(Vector::new(1, 1), Building::create(HQ, PlayerId(1)).unwrap())
            .unwrap()
            .place_building(Vector::new(2, 2), Building::create(HOUSE, PlayerId(2)).unwrap())
            .unwrap();
        let after_first = run(&map, Action::EndTurn);
        assert_eq!(after_first.current_player(), PlayerId(2));
        assert_eq!(after_first.round(), 1);
        assert_eq!(after_first.player(PlayerId(2)).unwrap().funds, 250);

        let after_second = run(&after_first, Action::EndTurn);
        assert_eq!(after_second.current_player(), PlayerId(1));
        assert_eq!(after_second.round(), 2);
        assert_eq!(after_second.player(PlayerId(1)).unwrap().funds, 300);
    }

    #[test]
    fn test_capture_takes_two_steps() {
        let map = map()
            .set_tile(Vector::new(2, 2), CONSTRUCTION_SITE)
            .unwrap()
            .place_building(Vector::new(2, 2), Building::create(HOUSE, PlayerId(2)).unwrap())
            .unwrap()
            .place_unit(Vector::new(2, 2), unit(INFANTRY, 1))
            .unwrap();
        let capture = Action::Capture {
            from: Vector::new(2, 2),
        };
        let started = run(&map, capture.clone());
        assert!(started.unit_at(Vector::new(2, 2)).unwrap().capturing);
        assert_eq!(started.building_at(Vector::new(2, 2)).unwrap().player, PlayerId(2));

        let round_trip = run(&run(&started, Action::EndTurn), Action::EndTurn);
        let captured = run(&round_trip, capture);
        assert_eq!(captured.building_at(Vector::new(2, 2)).unwrap().player, PlayerId(1));
        assert_eq!(captured.player(PlayerId(1)).unwrap().stats.captured, 1);
    }

    #[test]
    fn test_swap_exchanges_units_and_completes_them() {
        let pair = map()
            .place_unit(Vector::new(1, 1), unit(INFANTRY, 1))
            .unwrap()
            .place_unit(Vector::new(2, 1), unit(JEEP, 1))
            .unwrap();
        let next = run(
            &pair,
            Action::Swap {
                source: Vector::new(1, 1),
                target: Vector::new(2, 1),
            },
        );
        assert_eq!(next.unit_at(Vector::new(1, 1)).unwrap().id, JEEP);
        assert_eq!(next.unit_at(Vector::new(2, 1)).unwrap().id, INFANTRY);
        assert!(next.unit_at(Vector::new(1, 1)).unwrap().completed);
        assert!(next.unit_at(Vector::new(2, 1)).unwrap().completed);

        let far = map()
            .place_unit(Vector::new(1, 1), unit(INFANTRY, 1))
            .unwrap()
            .place_unit(Vector::new(3, 1), unit(INFANTRY, 1))
            .unwrap();
        assert!(execute_action(
            &far,
            &Action::Swap {
                source: Vector::new(1, 1),
                target: Vector::new(3, 1),
            }
        )
        .is_err());
    }

    #[test]
    fn test_field_medic_heals_damaged_units() {
        let map = map()
            .modify_player(PlayerId(1), |p| {
                p.skills.insert(Skill::FieldMedic);
                p.charge = 200;
            })
            .unwrap()
            .place_unit(Vector::new(1, 1), unit(INFANTRY, 1).with_health(30))
            .unwrap()
            .place_unit(Vector::new(3, 3), unit(INFANTRY, 1))
            .unwrap();
        let next = run(
            &map,
            Action::ActivatePower {
                skill: Skill::FieldMedic,
                from: None,
            },
        );
        assert_eq!(next.unit_at(Vector::new(1, 1)).unwrap().health, 80);
        let player = next.player(PlayerId(1)).unwrap();
        assert_eq!(player.charge, 0);
        assert!(player.active_skills.contains(&Skill::FieldMedic));
    }
}
