//! Changing map dimensions.
//!
//! Edges listed in the origin set are the ones that move: growing with
//! `Left` adds columns on the left and shifts everything right, shrinking
//! with `Top` cuts rows off the top. Edges not listed stay put, so the
//! default is to grow or shrink at the bottom and right. Entities pushed off
//! the map are dropped, and growing back never brings them back.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::effects::Effects;
use crate::error::{GameError, Result};
use crate::map::map_state::check_size;
use crate::map::MapState;
use crate::registry::tile::tile_info;
use crate::registry::TileId;
use crate::vector::{SizeVector, Vector};

/// Edge of the map that moves when resizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResizeOrigin {
    /// Top edge.
    Top,
    /// Right edge.
    Right,
    /// Bottom edge.
    Bottom,
    /// Left edge.
    Left,
}

/// Maps old positions to positions on a resized map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Remap {
    size: SizeVector,
    dx: i32,
    dy: i32,
}

impl Remap {
    /// Remapping from `from` to `to` with the given moving edges.
    #[must_use]
    pub fn new(from: SizeVector, to: SizeVector, origin: &BTreeSet<ResizeOrigin>) -> Self {
        let dx = if origin.contains(&ResizeOrigin::Left) {
            to.width - from.width
        } else {
            0
        };
        let dy = if origin.contains(&ResizeOrigin::Top) {
            to.height - from.height
        } else {
            0
        };
        Self { size: to, dx, dy }
    }

    /// New position of an old one, `None` when it falls off the map.
    #[must_use]
    pub fn apply(&self, position: Vector) -> Option<Vector> {
        let moved = position.offset(self.dx, self.dy);
        self.size.contains(moved).then_some(moved)
    }

    /// Old position a new one was taken from, if any.
    fn source(&self, position: Vector) -> Vector {
        position.offset(-self.dx, -self.dy)
    }
}

fn remap_layer<T: Clone>(layer: &BTreeMap<Vector, T>, remap: &Remap) -> BTreeMap<Vector, T> {
    layer
        .iter()
        .filter_map(|(position, value)| Some((remap.apply(*position)?, value.clone())))
        .collect()
}

/// Resize a map. New fields are filled with `fill`.
pub fn resize_map(
    map: &MapState,
    size: SizeVector,
    origin: &BTreeSet<ResizeOrigin>,
    fill: TileId,
) -> Result<MapState> {
    check_size(size)?;
    tile_info(fill).ok_or(GameError::UnknownTile(fill.0))?;
    let old = map.size();
    if old == size {
        return Ok(map.clone());
    }
    let remap = Remap::new(old, size, origin);
    let tiles: Vec<TileId> = size
        .positions()
        .map(|position| map.tile_at(remap.source(position)).unwrap_or(fill))
        .collect();

    let mut next = map.clone();
    next.size = size;
    next.tiles = Arc::new(tiles);
    next.units = Arc::new(remap_layer(&map.units, &remap));
    next.buildings = Arc::new(remap_layer(&map.buildings, &remap));
    debug!(
        width = size.width,
        height = size.height,
        units = next.units.len(),
        buildings = next.buildings.len(),
        "resized map"
    );
    Ok(next)
}

/// Remap every position referenced by the effects for a resize.
#[must_use]
pub fn resize_effects(
    effects: &Effects,
    from: SizeVector,
    to: SizeVector,
    origin: &BTreeSet<ResizeOrigin>,
) -> Effects {
    let remap = Remap::new(from, to, origin);
    effects
        .iter()
        .map(|(trigger, list)| {
            let list = list
                .iter()
                .filter_map(|effect| effect.map_positions(|position| remap.apply(position)))
                .collect();
            (trigger.clone(), list)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{Condition, Effect, EffectAction, Trigger};
    use crate::map::{DynamicPlayerId, Player, PlayerId, Unit};
    use crate::registry::tile::{FOREST, PLAIN};
    use crate::registry::unit::INFANTRY;

    fn map() -> MapState {
        MapState::new(
            SizeVector::new(10, 10),
            PLAIN,
            vec![Player::new(PlayerId(1), 1, 0)],
        )
        .unwrap()
        .set_tile(Vector::new(10, 10), FOREST)
        .unwrap()
        .place_unit(Vector::new(2, 2), Unit::create(INFANTRY, PlayerId(1)).unwrap())
        .unwrap()
        .place_unit(Vector::new(9, 9), Unit::create(INFANTRY, PlayerId(1)).unwrap())
        .unwrap()
    }

    #[test]
    fn test_shrink_at_bottom_right() {
        let small = resize_map(&map(), SizeVector::new(6, 6), &BTreeSet::new(), PLAIN).unwrap();
        assert_eq!(small.size(), SizeVector::new(6, 6));
        assert!(small.unit_at(Vector::new(2, 2)).is_some());
        assert_eq!(small.units().count(), 1);
        small.validate().unwrap();
    }

    #[test]
    fn test_shrink_at_top_left() {
        let origin = BTreeSet::from([ResizeOrigin::Top, ResizeOrigin::Left]);
        let small = resize_map(&map(), SizeVector::new(6, 6), &origin, PLAIN).unwrap();
        assert!(small.unit_at(Vector::new(5, 5)).is_some());
        assert_eq!(small.units().count(), 1);
        assert_eq!(small.tile_at(Vector::new(6, 6)), Some(FOREST));
    }

    #[test]
    fn test_growing_back_does_not_restore() {
        let small = resize_map(&map(), SizeVector::new(6, 6), &BTreeSet::new(), PLAIN).unwrap();
        let grown = resize_map(&small, SizeVector::new(10, 10), &BTreeSet::new(), PLAIN).unwrap();
        assert_eq!(grown.units().count(), 1);
        assert_eq!(grown.tile_at(Vector::new(10, 10)), Some(PLAIN));
    }

    #[test]
    fn test_invalid_sizes() {
        for size in [SizeVector::new(0, 5), SizeVector::new(5, 51)] {
            assert!(matches!(
                resize_map(&map(), size, &BTreeSet::new(), PLAIN),
                Err(GameError::InvalidSize { .. })
            ));
        }
    }

    #[test]
    fn test_resize_effects() {
        let spawn = |positions: &[(i32, i32)]| EffectAction::Spawn {
            units: positions
                .iter()
                .map(|(x, y)| {
                    (
                        Vector::new(*x, *y),
                        Unit::create(INFANTRY, PlayerId(1)).unwrap(),
                    )
                })
                .collect(),
            player: None,
        };
        let guarded = Effect {
            conditions: vec![Condition::UnitOwnedBy {
                position: Vector::new(8, 8),
                player: DynamicPlayerId::Current,
            }],
            ..Effect::new(vec![spawn(&[(1, 1)])])
        };
        let effects = Effects::new()
            .push(Trigger::Start, Effect::new(vec![spawn(&[(1, 1), (7, 7)])]))
            .push(Trigger::Start, Effect::new(vec![spawn(&[(9, 9)])]))
            .push(Trigger::EndTurn, guarded);
        let origin = BTreeSet::new();
        let resized = resize_effects(
            &effects,
            SizeVector::new(10, 10),
            SizeVector::new(6, 6),
            &origin,
        );
        let start = resized.get(&Trigger::Start);
        assert_eq!(start.len(), 1);
        assert_eq!(start[0].actions, vec![spawn(&[(1, 1)])]);
        assert!(resized.get(&Trigger::EndTurn).is_empty());
    }
}
