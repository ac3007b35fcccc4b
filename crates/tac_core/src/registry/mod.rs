//! Static entity registries.
//!
//! Every building, unit, tile and skill is described by a `'static` entry
//! in a const table. Registry ids are part of the wire format: entries are
//! only ever appended, never renumbered or reordered.
//!
//! Each registry offers the same surface:
//! - `*_info(id)` returns `Option` for the user-input path
//! - `*_info_or_panic(id)` is fatal on a miss, for ids the kernel already
//!   validated
//! - `all_*()` returns entries in display order (`sort`, then id)
//! - `filter_*` and `map_*` walk the display order

pub mod building;
pub mod skill;
pub mod tile;
pub mod unit;

use serde::{Deserialize, Serialize};

pub use building::{BuildingBehaviors, BuildingId, BuildingInfo};
pub use skill::{PowerEffect, Skill, SkillInfo};
pub use tile::{TileId, TileInfo};
pub use unit::{UnitAbilities, UnitId, UnitInfo, Weapon};

/// Broad classification shared by units and buildings.
///
/// Used for damage tables, production and healing rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    /// Infantry.
    Soldier,
    /// Wheeled and tracked vehicles.
    Ground,
    /// Indirect fire vehicles.
    Artillery,
    /// Trains.
    Rail,
    /// Aircraft.
    Air,
    /// Naval units.
    Ship,
    /// Units that cross land and sea.
    Amphibious,
    /// Regular buildings.
    Building,
    /// Obstacles such as barriers and wrecks.
    Structure,
    /// Buildings that cannot be attacked.
    Invincible,
}

impl EntityType {
    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// Set of [`EntityType`]s, used by production, healing and transport rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct EntityTypes(u16);

impl EntityTypes {
    /// Empty set.
    pub const NONE: Self = Self(0);

    /// Set containing a single type.
    #[must_use]
    pub const fn of(entity_type: EntityType) -> Self {
        Self(entity_type.bit())
    }

    /// Add a type to the set.
    #[must_use]
    pub const fn with(self, entity_type: EntityType) -> Self {
        Self(self.0 | entity_type.bit())
    }

    /// Check membership.
    #[must_use]
    pub const fn contains(self, entity_type: EntityType) -> bool {
        self.0 & entity_type.bit() != 0
    }

    /// Whether the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// How a unit moves across tiles. Indexes the tile movement cost table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MovementType {
    /// On foot.
    Soldier,
    /// Wheels.
    Tires,
    /// Tracks.
    Tread,
    /// Rails only.
    Rail,
    /// Flying.
    Air,
    /// Water only.
    Ship,
    /// Land and shallow water.
    Amphibious,
}

impl MovementType {
    /// Number of movement types.
    pub const COUNT: usize = 7;

    /// Column in the tile cost table.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Order entries by their display sort key, then by id.
fn display_order<T>(entries: &'static [T], key: impl Fn(&T) -> (u8, u16)) -> Vec<&'static T> {
    let mut sorted: Vec<&'static T> = entries.iter().collect();
    sorted.sort_by_key(|entry| key(*entry));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_types_set() {
        let set = EntityTypes::of(EntityType::Ground).with(EntityType::Artillery);
        assert!(set.contains(EntityType::Ground));
        assert!(set.contains(EntityType::Artillery));
        assert!(!set.contains(EntityType::Air));
        assert!(EntityTypes::NONE.is_empty());
    }
}
