//! Income and turn-start provisioning.
//!
//! At the start of a turn a player earns the funds of every owned building,
//! scaled by the map's income multiplier and by a bonus per owned power
//! station. Units next to an own supply unit are refilled.

use std::collections::BTreeSet;

use crate::map::{MapState, PlayerId};
use crate::math::scale;
use crate::registry::building::POWER_STATION;
use crate::registry::UnitAbilities;
use crate::vector::Vector;

/// Income bonus per owned power station, in percent.
pub const POWER_STATION_BONUS: i32 = 30;

/// Funds the player earns at the start of a turn.
#[must_use]
pub fn income(map: &MapState, player: PlayerId) -> u32 {
    if player.is_neutral() {
        return 0;
    }
    let mut base = 0u32;
    let mut stations = 0i32;
    for (_, building) in map.buildings_of(player) {
        base = base.saturating_add(building.info().funds);
        if building.id == POWER_STATION {
            stations += 1;
        }
    }
    let multiplied = base.saturating_mul(map.config().multiplier);
    scale(multiplied, 100 + POWER_STATION_BONUS * stations)
}

/// Fields of the player's units that stand next to one of the player's
/// supply units.
#[must_use]
pub fn supply_positions(map: &MapState, player: PlayerId) -> Vec<Vector> {
    let suppliers: Vec<Vector> = map
        .units_of(player)
        .filter(|(_, unit)| unit.info().has_ability(UnitAbilities::SUPPLY))
        .map(|(position, _)| position)
        .collect();
    let positions: BTreeSet<Vector> = suppliers
        .iter()
        .flat_map(|position| position.adjacent())
        .filter(|position| {
            map.unit_at(*position)
                .is_some_and(|unit| unit.player == player)
        })
        .collect();
    positions.into_iter().collect()
}
