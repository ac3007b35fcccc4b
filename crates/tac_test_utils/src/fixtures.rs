//! Test fixtures and helpers.
//!
//! Pre-built maps, sessions and action scripts for consistent testing.

use tac_core::action::Action;
use tac_core::effects::Effects;
use tac_core::map::{Building, MapState, Player, PlayerId, Unit};
use tac_core::registry::building::{FACTORY, HOUSE, HQ};
use tac_core::registry::tile::{CONSTRUCTION_SITE, FOREST, PLAIN, STREET};
use tac_core::registry::unit::{INFANTRY, JEEP, SMALL_TANK};
use tac_core::session::Game;
use tac_core::vector::{SizeVector, Vector};

/// Two players on a 5x5 plain, one infantry each in opposite corners.
///
/// # Panics
///
/// Panics if the fixture no longer satisfies the map invariants.
#[must_use]
pub fn duel_map() -> MapState {
    MapState::new(
        SizeVector::new(5, 5),
        PLAIN,
        vec![Player::new(PlayerId(1), 1, 0), Player::new(PlayerId(2), 2, 0)],
    )
    .and_then(|map| map.place_unit(Vector::new(1, 1), unit(INFANTRY, 1)))
    .and_then(|map| map.place_unit(Vector::new(5, 5), unit(INFANTRY, 2)))
    .expect("duel fixture is valid")
}

/// A 10x10 map with headquarters, factories, houses, a road and a forest
/// line. Player 1 starts with 300 funds, player 2 with 150.
///
/// # Panics
///
/// Panics if the fixture no longer satisfies the map invariants.
#[must_use]
pub fn skirmish_map() -> MapState {
    let mut map = MapState::new(
        SizeVector::new(10, 10),
        PLAIN,
        vec![
            Player::new(PlayerId(1), 1, 300),
            Player::new(PlayerId(2), 2, 150),
        ],
    )
    .expect("valid size");
    for x in 1..=10 {
        map = map.set_tile(Vector::new(x, 5), STREET).expect("in bounds");
    }
    for y in 2..=4 {
        map = map.set_tile(Vector::new(5, y), FOREST).expect("in bounds");
    }
    for position in [Vector::new(2, 2), Vector::new(9, 9)] {
        map = map.set_tile(position, CONSTRUCTION_SITE).expect("in bounds");
    }
    for position in [Vector::new(3, 8), Vector::new(8, 3)] {
        map = map.set_tile(position, CONSTRUCTION_SITE).expect("in bounds");
    }
    map.place_building(Vector::new(1, 1), building(HQ, 1))
        .and_then(|map| map.place_building(Vector::new(10, 10), building(HQ, 2)))
        .and_then(|map| map.place_building(Vector::new(2, 2), building(FACTORY, 1)))
        .and_then(|map| map.place_building(Vector::new(9, 9), building(FACTORY, 2)))
        .and_then(|map| map.place_building(Vector::new(3, 8), building(HOUSE, 0)))
        .and_then(|map| map.place_building(Vector::new(8, 3), building(HOUSE, 1)))
        .and_then(|map| map.place_unit(Vector::new(2, 3), unit(INFANTRY, 1)))
        .and_then(|map| map.place_unit(Vector::new(3, 5), unit(JEEP, 1)))
        .and_then(|map| map.place_unit(Vector::new(9, 8), unit(INFANTRY, 2)))
        .and_then(|map| map.place_unit(Vector::new(8, 5), unit(SMALL_TANK, 2)))
        .expect("skirmish fixture is valid")
}

/// A started session on the given map without effects.
///
/// # Panics
///
/// Panics if the map is invalid or the start is rejected.
#[must_use]
pub fn started_game(map: MapState) -> Game {
    let mut game = Game::new(map, Effects::new()).expect("valid map");
    game.start().expect("game starts");
    game
}

/// A fixed script of actions for the skirmish map. Some actions are
/// rejected on purpose so harnesses also cover the error path.
#[must_use]
pub fn skirmish_script() -> Vec<Action> {
    vec![
        Action::Move {
            from: Vector::new(2, 3),
            to: Vector::new(3, 4),
            complete: false,
        },
        Action::Move {
            from: Vector::new(3, 5),
            to: Vector::new(7, 5),
            complete: false,
        },
        Action::CreateUnit {
            from: Vector::new(2, 2),
            to: Vector::new(2, 3),
            id: INFANTRY,
        },
        // Rejected: the factory already produced this turn.
        Action::CreateUnit {
            from: Vector::new(2, 2),
            to: Vector::new(2, 1),
            id: INFANTRY,
        },
        Action::EndTurn,
        Action::AttackUnit {
            from: Vector::new(8, 5),
            to: Vector::new(7, 5),
        },
        Action::Move {
            from: Vector::new(9, 8),
            to: Vector::new(8, 7),
            complete: true,
        },
        Action::EndTurn,
        Action::Move {
            from: Vector::new(3, 4),
            to: Vector::new(3, 7),
            complete: false,
        },
        Action::EndTurn,
        Action::EndTurn,
        Action::Move {
            from: Vector::new(3, 7),
            to: Vector::new(3, 8),
            complete: false,
        },
        Action::Capture {
            from: Vector::new(3, 8),
        },
        Action::EndTurn,
    ]
}

/// Play a script, ignoring rejected actions. Returns the number of
/// accepted actions.
pub fn play_script(game: &mut Game, script: &[Action]) -> usize {
    script
        .iter()
        .filter(|action| game.act(action).is_ok())
        .count()
}

fn unit(id: tac_core::registry::UnitId, player: u8) -> Unit {
    Unit::create(id, PlayerId(player)).expect("registered unit")
}

fn building(id: tac_core::registry::BuildingId, player: u8) -> Building {
    Building::create(id, PlayerId(player)).expect("registered building")
}
