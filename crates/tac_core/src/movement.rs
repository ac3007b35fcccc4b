//! Reachability and path finding on the tile grid.
//!
//! Movement is Dijkstra over the four orthogonal neighbours with the
//! per-movement-type tile costs from the tile registry. The budget is the
//! smaller of the unit's radius and its fuel. Units of other teams and
//! inaccessible buildings block; own and allied units can be passed but not
//! stopped on, except for an own carrier with free space.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use crate::error::{GameError, Result};
use crate::map::{MapState, Unit};
use crate::vector::Vector;

/// Fields a unit can reach this turn, with the cheapest cost of each.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reachable {
    start: Vector,
    costs: BTreeMap<Vector, u32>,
    previous: BTreeMap<Vector, Vector>,
}

impl Reachable {
    /// Whether the unit can end its move on the field.
    #[must_use]
    pub fn contains(&self, position: Vector) -> bool {
        self.costs.contains_key(&position)
    }

    /// Cheapest cost to the field.
    #[must_use]
    pub fn cost(&self, position: Vector) -> Option<u32> {
        self.costs.get(&position).copied()
    }

    /// Reachable fields in position order, excluding the start.
    pub fn positions(&self) -> impl Iterator<Item = Vector> + '_ {
        self.costs.keys().copied().filter(move |p| *p != self.start)
    }

    /// Walked fields to a target, excluding the start.
    #[must_use]
    pub fn path(&self, to: Vector) -> Option<Vec<Vector>> {
        if !self.contains(to) {
            return None;
        }
        let mut path = vec![to];
        let mut current = to;
        while let Some(previous) = self.previous.get(&current) {
            if *previous == self.start {
                break;
            }
            path.push(*previous);
            current = *previous;
        }
        path.reverse();
        Some(path)
    }
}

fn can_pass(map: &MapState, unit: &Unit, position: Vector) -> Option<u32> {
    let info = unit.info();
    let cost = map.tile_info_at(position)?.cost(info.movement_type)?;
    if let Some(building) = map.building_at(position) {
        if !building.info().is_accessible_by(info) {
            return None;
        }
    }
    if let Some(other) = map.unit_at(position) {
        if other.player != unit.player && !map.is_teammate(other.player, unit.player) {
            return None;
        }
    }
    Some(u32::from(cost))
}

fn can_stop(map: &MapState, unit: &Unit, position: Vector) -> bool {
    match map.unit_at(position) {
        None => true,
        Some(other) => other.player == unit.player && other.can_load(unit),
    }
}

/// All fields the unit at `from` can move to.
pub fn reachable(map: &MapState, from: Vector) -> Result<Reachable> {
    let unit = map.unit_at(from).ok_or(GameError::NoUnit(from))?;
    let budget = u32::from(unit.info().radius).min(unit.fuel);

    let mut best: BTreeMap<Vector, u32> = BTreeMap::from([(from, 0)]);
    let mut previous = BTreeMap::new();
    let mut open = BinaryHeap::from([Reverse((0u32, from))]);

    while let Some(Reverse((cost, position))) = open.pop() {
        if best.get(&position).is_some_and(|known| *known < cost) {
            continue;
        }
        for neighbour in position.adjacent() {
            let Some(step) = can_pass(map, unit, neighbour) else {
                continue;
            };
            let total = cost + step;
            if total > budget {
                continue;
            }
            if best.get(&neighbour).map_or(true, |known| total < *known) {
                best.insert(neighbour, total);
                previous.insert(neighbour, position);
                open.push(Reverse((total, neighbour)));
            }
        }
    }

    let costs = best
        .into_iter()
        .filter(|(position, _)| *position == from || can_stop(map, unit, *position))
        .collect();
    Ok(Reachable {
        start: from,
        costs,
        previous,
    })
}

/// Cheapest path of the unit at `from` to `to` and its cost.
pub fn find_path(map: &MapState, from: Vector, to: Vector) -> Result<(Vec<Vector>, u32)> {
    let reachable = reachable(map, from)?;
    match (reachable.path(to), reachable.cost(to)) {
        (Some(path), Some(cost)) if to != from => Ok((path, cost)),
        _ => Err(GameError::InvalidAction(format!(
            "{to} cannot be reached from {from}"
        ))),
    }
}
