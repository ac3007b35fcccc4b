//! Objective evaluation.
//!
//! After every action the session asks [`check_objectives`] which players
//! were eliminated, which optional objectives were reached and whether the
//! game is over. The answer is a list of responses; evaluation itself never
//! changes the map.

use std::collections::BTreeSet;

use tracing::debug;

use crate::action::{apply, ActionResponse};
use crate::error::Result;
use crate::map::{MapState, Objective, ObjectiveKind, PlayerId};

/// Whether the player still has a way to fight: a unit or a building that
/// produces units.
#[must_use]
pub fn can_continue(map: &MapState, player: PlayerId) -> bool {
    map.units_of(player).next().is_some()
        || map
            .buildings_of(player)
            .any(|(_, building)| building.info().can_build_units())
}

/// Whether the player reached the objective on this map.
#[must_use]
pub fn is_achieved(map: &MapState, objective: &Objective, player: PlayerId) -> bool {
    let Some(team) = map.team_of(player) else {
        return false;
    };
    let on_team = |owner: PlayerId| map.team_of(owner) == Some(team) && !owner.is_neutral();
    match &objective.kind {
        ObjectiveKind::Default => {
            let teams = remaining_teams(map);
            teams.len() == 1 && teams.contains(&team)
        }
        ObjectiveKind::CaptureAmount { amount } => map.team_statistics(team).captured >= *amount,
        ObjectiveKind::DestroyAmount { amount } => {
            map.team_statistics(team).destroyed_units >= *amount
        }
        ObjectiveKind::CaptureLabel { label } => all_owned(
            map.buildings()
                .filter(|(_, building)| building.label.is_some_and(|l| label.contains(&l)))
                .map(|(_, building)| building.player),
            on_team,
        ),
        ObjectiveKind::RescueLabel { label } => all_owned(
            map.units()
                .filter(|(_, unit)| unit.label.is_some_and(|l| label.contains(&l)))
                .map(|(_, unit)| unit.player),
            on_team,
        ),
        ObjectiveKind::DestroyLabel { label } => !map.units().any(|(_, unit)| {
            unit.label.is_some_and(|l| label.contains(&l)) && map.is_opponent(player, unit.player)
        }),
        ObjectiveKind::Survival { rounds } => map.round() > *rounds,
    }
}

fn all_owned(owners: impl Iterator<Item = PlayerId>, on_team: impl Fn(PlayerId) -> bool) -> bool {
    let mut any = false;
    for owner in owners {
        if !on_team(owner) {
            return false;
        }
        any = true;
    }
    any
}

fn push(
    working: &mut MapState,
    responses: &mut Vec<ActionResponse>,
    response: ActionResponse,
) -> Result<()> {
    *working = apply(working, &response)?;
    responses.push(response);
    Ok(())
}

fn remaining_teams(map: &MapState) -> BTreeSet<u8> {
    map.active()
        .iter()
        .filter_map(|player| map.team_of(*player))
        .collect()
}

/// Responses that follow from the current state: eliminations, reached
/// objectives with their rewards, and the end of the game.
pub fn check_objectives(map: &MapState) -> Result<Vec<ActionResponse>> {
    let mut working = map.clone();
    let mut responses = Vec::new();

    let active: Vec<PlayerId> = working.active().to_vec();
    for player in active {
        if remaining_teams(&working).len() <= 1 {
            break;
        }
        if !can_continue(&working, player) {
            debug!(%player, "player eliminated");
            push(&mut working, &mut responses, ActionResponse::PlayerLost { player })?;
        }
    }

    let objectives: Vec<(u8, Objective)> = working
        .config()
        .objectives
        .iter()
        .map(|(id, objective)| (*id, objective.clone()))
        .collect();
    for (id, objective) in &objectives {
        if matches!(objective.kind, ObjectiveKind::Default) {
            continue;
        }
        for player in working.active().to_vec() {
            let current = working
                .config()
                .objectives
                .get(id)
                .cloned()
                .unwrap_or_else(|| objective.clone());
            if !current.applies_to(player)
                || current.completed.contains(&player)
                || !is_achieved(&working, &current, player)
            {
                continue;
            }
            if current.hidden {
                push(
                    &mut working,
                    &mut responses,
                    ActionResponse::SecretDiscovered {
                        objective_id: *id,
                        to_player: Some(player),
                    },
                )?;
            }
            if !current.optional {
                push(
                    &mut working,
                    &mut responses,
                    ActionResponse::GameEnd {
                        objective_id: Some(*id),
                        to_player: Some(player),
                    },
                )?;
                return Ok(responses);
            }
            push(
                &mut working,
                &mut responses,
                ActionResponse::OptionalObjective {
                    objective_id: *id,
                    to_player: player,
                },
            )?;
            if let Some(reward) = &current.reward {
                push(
                    &mut working,
                    &mut responses,
                    ActionResponse::ReceiveReward {
                        player,
                        reward: reward.clone(),
                        permanent: None,
                    },
                )?;
            }
        }
    }

    if remaining_teams(map).len() > 1 && remaining_teams(&working).len() == 1 {
        let winner = working.active().first().copied();
        let default_id = working
            .config()
            .objectives
            .iter()
            .find(|(_, objective)| matches!(objective.kind, ObjectiveKind::Default))
            .map(|(id, _)| *id);
        push(
            &mut working,
            &mut responses,
            ActionResponse::GameEnd {
                objective_id: default_id.filter(|_| winner.is_some()),
                to_player: winner,
            },
        )?;
    }
    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::apply_all;
    use crate::map::{Building, Player, Reward, Unit};
    use crate::registry::building::{FACTORY, HOUSE};
    use crate::registry::tile::{CONSTRUCTION_SITE, PLAIN};
    use crate::registry::unit::INFANTRY;
    use crate::vector::{SizeVector, Vector};

    fn map() -> MapState {
        MapState::new(
            SizeVector::new(5, 5),
            PLAIN,
            vec![Player::new(PlayerId(1), 1, 0), Player::new(PlayerId(2), 2, 0)],
        )
        .unwrap()
        .place_unit(Vector::new(1, 1), Unit::create(INFANTRY, PlayerId(1)).unwrap())
        .unwrap()
        .place_unit(Vector::new(5, 5), Unit::create(INFANTRY, PlayerId(2)).unwrap())
        .unwrap()
    }

    fn with_objective(map: &MapState, id: u8, objective: Objective) -> MapState {
        let mut config = map.config().clone();
        config.objectives.insert(id, objective);
        map.with_config(config)
    }

    #[test]
    fn test_nothing_to_report() {
        assert!(check_objectives(&map()).unwrap().is_empty());
    }

    #[test]
    fn test_elimination_ends_the_game() {
        let map = map().remove(Vector::new(5, 5), crate::map::Layer::Unit).unwrap();
        let responses = check_objectives(&map).unwrap();
        assert_eq!(
            responses,
            vec![
                ActionResponse::PlayerLost {
                    player: PlayerId(2)
                },
                ActionResponse::GameEnd {
                    objective_id: Some(0),
                    to_player: Some(PlayerId(1)),
                },
            ]
        );
        let next = apply_all(&map, &responses).unwrap();
        assert_eq!(next.active(), &[PlayerId(1)]);
    }

    #[test]
    fn test_factory_keeps_player_alive() {
        let map = map()
            .remove(Vector::new(5, 5), crate::map::Layer::Unit)
            .unwrap()
            .set_tile(Vector::new(4, 4), CONSTRUCTION_SITE)
            .unwrap()
            .place_building(Vector::new(4, 4), Building::create(FACTORY, PlayerId(2)).unwrap())
            .unwrap();
        assert!(check_objectives(&map).unwrap().is_empty());
    }

    #[test]
    fn test_optional_objective_rewards_once() {
        let objective = Objective::new(ObjectiveKind::Survival { rounds: 2 })
            .optional(Some(Reward::Funds { amount: 500 }))
            .hidden();
        let mut map = with_objective(&map(), 1, objective);
        map.round = 3;
        let responses = check_objectives(&map).unwrap();
        assert_eq!(responses.len(), 5);
        assert!(matches!(
            responses[0],
            ActionResponse::SecretDiscovered {
                objective_id: 1,
                to_player: Some(PlayerId(1))
            }
        ));
        let next = apply_all(&map, &responses).unwrap();
        assert_eq!(next.player(PlayerId(1)).unwrap().funds, 500);
        assert_eq!(next.player(PlayerId(2)).unwrap().funds, 500);
        assert!(check_objectives(&next).unwrap().is_empty());
    }

    #[test]
    fn test_mandatory_label_objective_ends_game() {
        let objective = Objective::new(ObjectiveKind::CaptureLabel {
            label: BTreeSet::from([4]),
        });
        let house = Building::create(HOUSE, PlayerId::NEUTRAL)
            .unwrap()
            .with_label(Some(4));
        let map = with_objective(&map(), 2, objective)
            .set_tile(Vector::new(3, 3), CONSTRUCTION_SITE)
            .unwrap()
            .place_building(Vector::new(3, 3), house.clone())
            .unwrap();
        assert!(check_objectives(&map).unwrap().is_empty());

        let captured = map
            .remove(Vector::new(3, 3), crate::map::Layer::Building)
            .unwrap()
            .place_building(Vector::new(3, 3), house.with_player(PlayerId(1)))
            .unwrap();
        assert_eq!(
            check_objectives(&captured).unwrap(),
            vec![ActionResponse::GameEnd {
                objective_id: Some(2),
                to_player: Some(PlayerId(1)),
            }]
        );
    }

    #[test]
    fn test_destroy_label_and_amount() {
        let mut target = Unit::create(INFANTRY, PlayerId(2)).unwrap();
        target.label = Some(1);
        let map = map().place_unit(Vector::new(3, 3), target).unwrap();
        let objective = Objective::new(ObjectiveKind::DestroyLabel {
            label: BTreeSet::from([1]),
        });
        assert!(!is_achieved(&map, &objective, PlayerId(1)));
        let cleared = map.remove(Vector::new(3, 3), crate::map::Layer::Unit).unwrap();
        assert!(is_achieved(&cleared, &objective, PlayerId(1)));

        let amount = Objective::new(ObjectiveKind::DestroyAmount { amount: 1 });
        assert!(!is_achieved(&map, &amount, PlayerId(1)));
        let scored = map
            .modify_player(PlayerId(1), |p| p.stats.destroyed_units = 1)
            .unwrap();
        assert!(is_achieved(&scored, &amount, PlayerId(1)));
    }
}
