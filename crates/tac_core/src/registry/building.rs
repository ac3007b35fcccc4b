//! Building catalog.
//!
//! Buildings generate funds, produce units, heal units standing on them and
//! sell skills. A building with an infinite cost (`cost: None`) cannot be
//! built by normal means; some become available once a player owns a skill
//! that unlocks them.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::skill::{building_cost_percent, has_unlocked_building, unlocked_building_cost, Skill};
use super::tile::{
    TileId, AIRFIELD, BRIDGE, CAMPSITE, CONSTRUCTION_SITE, DEEP_SEA, PATH, PIER, PLAIN,
    RAIL_BRIDGE, RAIL_TRACK, SEA, SHIPYARD_CONSTRUCTION_SITE, STREET,
};
use super::unit::{UnitId, UnitInfo, SABOTEUR};
use super::{display_order, EntityType, EntityTypes};
use crate::math::scale;

/// Base income of a house.
pub const MIN_FUNDS: u32 = 100;

/// Stable building identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingId(pub u16);

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability flags of a building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct BuildingBehaviors(u8);

impl BuildingBehaviors {
    /// No behaviors.
    pub const NONE: Self = Self(0);
    /// Heals units of its heal types at the start of the owner's turn.
    pub const HEAL: Self = Self(1 << 0);
    /// Extends vision.
    pub const RADAR: Self = Self(1 << 1);
    /// Sells skills.
    pub const SELL_SKILLS: Self = Self(1 << 2);

    /// Combine behaviors.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check whether all behaviors in `other` are present.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Configuration of a building type.
#[derive(Debug)]
pub struct BuildingInfo {
    /// Stable identifier.
    pub id: BuildingId,
    /// Display name.
    pub name: &'static str,
    /// Display sort key.
    pub sort: u8,
    /// Base cost; `None` is infinite.
    cost: Option<u32>,
    /// Defense percent for the building itself.
    pub defense: u8,
    /// Funds generated at the start of each of the owner's turns.
    pub funds: u32,
    /// Maximum number a single player can own, 0 for unlimited.
    pub limit: u8,
    /// Entity type, `Building` unless structure or invincible.
    pub entity_type: EntityType,
    /// Capabilities.
    pub behaviors: BuildingBehaviors,
    /// Unit types healed by the `HEAL` behavior.
    pub heal_types: EntityTypes,
    /// Unit types this building produces.
    pub unit_types: EntityTypes,
    /// Individual units produced in addition to `unit_types`.
    pub units: &'static [UnitId],
    /// Units excluded from production.
    pub restricted_units: &'static [UnitId],
    /// Tiles a unit can construct the building on during play.
    pub place_on: &'static [TileId],
    /// Tiles the building can be placed on in the editor.
    pub editor_place_on: &'static [TileId],
    /// Whether units can enter the field.
    pub accessible: bool,
    /// Extra attack percent for the owner's units while owned.
    pub attack_bonus: i32,
}

impl BuildingInfo {
    const fn new(id: u16, name: &'static str, sort: u8, defense: u8) -> Self {
        Self {
            id: BuildingId(id),
            name,
            sort,
            cost: Some(0),
            defense,
            funds: 0,
            limit: 0,
            entity_type: EntityType::Building,
            behaviors: BuildingBehaviors::NONE,
            heal_types: EntityTypes::NONE,
            unit_types: EntityTypes::NONE,
            units: &[],
            restricted_units: &[],
            place_on: &[],
            editor_place_on: &[],
            accessible: true,
            attack_bonus: 0,
        }
    }

    const fn cost(mut self, cost: u32) -> Self {
        self.cost = Some(cost);
        self
    }

    const fn infinite_cost(mut self) -> Self {
        self.cost = None;
        self
    }

    const fn funds(mut self, funds: u32) -> Self {
        self.funds = funds;
        self
    }

    const fn limit(mut self, limit: u8) -> Self {
        self.limit = limit;
        self
    }

    const fn structure(mut self, editor_place_on: &'static [TileId]) -> Self {
        self.entity_type = EntityType::Structure;
        self.accessible = false;
        self.sort = 10;
        self.editor_place_on = editor_place_on;
        self
    }

    const fn invincible(mut self) -> Self {
        self.entity_type = EntityType::Invincible;
        self
    }

    const fn behaviors(mut self, behaviors: BuildingBehaviors) -> Self {
        self.behaviors = behaviors;
        self
    }

    const fn heals(mut self, heal_types: EntityTypes) -> Self {
        self.behaviors = self.behaviors.union(BuildingBehaviors::HEAL);
        self.heal_types = heal_types;
        self
    }

    const fn produces(mut self, unit_types: EntityTypes) -> Self {
        self.unit_types = unit_types;
        self.restricted_units = SPECIAL_UNITS;
        self
    }

    const fn produces_units(mut self, units: &'static [UnitId]) -> Self {
        self.units = units;
        self
    }

    const fn place_on(mut self, tiles: &'static [TileId]) -> Self {
        self.place_on = tiles;
        self
    }

    const fn editor_place_on(mut self, tiles: &'static [TileId]) -> Self {
        self.editor_place_on = tiles;
        self
    }

    const fn attack_bonus(mut self, percent: i32) -> Self {
        self.attack_bonus = percent;
        self
    }

    /// Base cost, `None` if infinite.
    #[must_use]
    pub const fn base_cost(&self) -> Option<u32> {
        self.cost
    }

    /// Cost for a player with the given skills.
    ///
    /// A player without skills pays the base cost. Skills may unlock a
    /// normally infinite building and apply discounts. `None` means the
    /// building cannot be bought.
    #[must_use]
    pub fn cost_for(&self, skills: &BTreeSet<Skill>) -> Option<u32> {
        if skills.is_empty() {
            return self.cost;
        }
        let base = self.cost.or_else(|| unlocked_building_cost(self, skills))?;
        Some(scale(base, building_cost_percent(skills)))
    }

    /// Whether a unit can construct the building on the tile.
    #[must_use]
    pub fn can_be_created_on(&self, tile: TileId) -> bool {
        self.place_on.contains(&tile)
    }

    /// Whether the building can be placed on the tile by the editor or a spawn.
    #[must_use]
    pub fn can_be_placed_on(&self, tile: TileId) -> bool {
        self.place_on.contains(&tile) || self.editor_place_on.contains(&tile)
    }

    /// Whether the building produces the unit.
    #[must_use]
    pub fn can_build(&self, unit: &UnitInfo) -> bool {
        (self.unit_types.contains(unit.entity_type) || self.units.contains(&unit.id))
            && !self.restricted_units.contains(&unit.id)
    }

    /// Whether the building produces anything at all.
    #[must_use]
    pub fn can_build_units(&self) -> bool {
        !self.unit_types.is_empty() || !self.units.is_empty()
    }

    /// Whether the building heals the unit at turn start.
    #[must_use]
    pub fn can_heal(&self, unit: &UnitInfo) -> bool {
        self.behaviors.contains(BuildingBehaviors::HEAL) && self.heal_types.contains(unit.entity_type)
    }

    /// Whether the building has a behavior.
    #[must_use]
    pub const fn has_behavior(&self, behavior: BuildingBehaviors) -> bool {
        self.behaviors.contains(behavior)
    }

    /// Whether the building is an obstacle rather than a regular building.
    #[must_use]
    pub fn is_structure(&self) -> bool {
        self.entity_type == EntityType::Structure
    }

    /// Whether the building is the HQ.
    #[must_use]
    pub fn is_hq(&self) -> bool {
        self.id == HQ
    }

    /// Whether the unit can enter the field. Units the building produces or
    /// heals can always stand on it.
    #[must_use]
    pub fn is_accessible_by(&self, unit: &UnitInfo) -> bool {
        self.accessible
            && (unit.can_access_buildings() || self.can_build(unit) || self.can_heal(unit))
    }
}

const SPECIAL_UNITS: &[UnitId] = &[SABOTEUR];
const SOLDIERS: EntityTypes = EntityTypes::of(EntityType::Soldier);
const BUILD_SITES: &[TileId] = &[CONSTRUCTION_SITE];
const HQ_SITES: &[TileId] = &[PLAIN, CONSTRUCTION_SITE];
const BARRIER_TILES: &[TileId] = &[PLAIN, STREET, BRIDGE, RAIL_TRACK, RAIL_BRIDGE, PATH, PIER];
const WRECK_TILES: &[TileId] = &[PLAIN, STREET];
const SEA_BARRIER_TILES: &[TileId] = &[SEA, DEEP_SEA];

/// Headquarters.
pub const HQ: BuildingId = BuildingId(1);
/// House.
pub const HOUSE: BuildingId = BuildingId(2);
/// Factory.
pub const FACTORY: BuildingId = BuildingId(3);
/// Airbase.
pub const AIRBASE: BuildingId = BuildingId(4);
/// Shipyard.
pub const SHIPYARD: BuildingId = BuildingId(5);
/// Vertical barrier.
pub const VERTICAL_BARRIER: BuildingId = BuildingId(6);
/// Horizontal barrier.
pub const HORIZONTAL_BARRIER: BuildingId = BuildingId(7);
/// Crashed airplane.
pub const CRASHED_AIRPLANE: BuildingId = BuildingId(8);
/// Research lab.
pub const RESEARCH_LAB: BuildingId = BuildingId(9);
/// Radar station.
pub const RADAR_STATION: BuildingId = BuildingId(10);
/// Power station.
pub const POWER_STATION: BuildingId = BuildingId(11);
/// Barracks.
pub const BARRACKS: BuildingId = BuildingId(12);
/// Shelter.
pub const SHELTER: BuildingId = BuildingId(13);
/// Destroyed house.
pub const DESTROYED_HOUSE: BuildingId = BuildingId(14);
/// Bar.
pub const BAR: BuildingId = BuildingId(15);
/// Oil rig.
pub const OIL_RIG: BuildingId = BuildingId(16);
/// Repair shop.
pub const REPAIR_SHOP: BuildingId = BuildingId(17);
/// Medbay.
pub const MEDBAY: BuildingId = BuildingId(18);
/// Spawn platform.
pub const SPAWN_PLATFORM: BuildingId = BuildingId(19);
/// Destroyed super tank.
pub const DESTROYED_SUPER_TANK: BuildingId = BuildingId(20);
/// Vertical sea barrier.
pub const VERTICAL_SEA_BARRIER: BuildingId = BuildingId(21);
/// Horizontal sea barrier.
pub const HORIZONTAL_SEA_BARRIER: BuildingId = BuildingId(22);

// The order of buildings must not be changed.
static BUILDINGS: [BuildingInfo; 22] = [
    BuildingInfo::new(1, "HQ", 1, 40)
        .invincible()
        .limit(1)
        .produces(SOLDIERS)
        .editor_place_on(HQ_SITES),
    BuildingInfo::new(2, "House", 2, 10)
        .cost(100)
        .funds(MIN_FUNDS)
        .place_on(BUILD_SITES),
    BuildingInfo::new(3, "Factory", 3, 10)
        .cost(250)
        .produces(
            EntityTypes::of(EntityType::Ground)
                .with(EntityType::Artillery)
                .with(EntityType::Rail),
        )
        .place_on(BUILD_SITES),
    BuildingInfo::new(4, "Airbase", 3, 20)
        .cost(200)
        .heals(EntityTypes::of(EntityType::Air))
        .produces(EntityTypes::of(EntityType::Air))
        .place_on(&[AIRFIELD]),
    BuildingInfo::new(5, "Shipyard", 5, 20)
        .cost(300)
        .produces(EntityTypes::of(EntityType::Ship).with(EntityType::Amphibious))
        .place_on(&[SHIPYARD_CONSTRUCTION_SITE]),
    BuildingInfo::new(6, "Barrier", 10, 30).structure(BARRIER_TILES),
    BuildingInfo::new(7, "Barrier", 10, 30).structure(BARRIER_TILES),
    BuildingInfo::new(8, "Crashed Airplane", 10, 50).structure(WRECK_TILES),
    BuildingInfo::new(9, "Research Lab", 4, 60)
        .infinite_cost()
        .behaviors(BuildingBehaviors::SELL_SKILLS)
        .attack_bonus(10)
        .place_on(BUILD_SITES),
    BuildingInfo::new(10, "Radar Station", 4, 30)
        .cost(500)
        .behaviors(BuildingBehaviors::RADAR)
        .place_on(BUILD_SITES),
    BuildingInfo::new(11, "Power Station", 4, 30)
        .infinite_cost()
        .place_on(BUILD_SITES),
    BuildingInfo::new(12, "Barracks", 2, 20)
        .cost(150)
        .produces(SOLDIERS)
        .place_on(BUILD_SITES),
    BuildingInfo::new(13, "Shelter", 4, 40)
        .cost(200)
        .funds(MIN_FUNDS / 2)
        .heals(SOLDIERS)
        .place_on(&[CAMPSITE]),
    BuildingInfo::new(14, "Destroyed House", 10, 40).structure(HQ_SITES),
    BuildingInfo::new(15, "Bar", 3, 40)
        .infinite_cost()
        .funds(MIN_FUNDS * 3)
        .produces_units(SPECIAL_UNITS)
        .place_on(BUILD_SITES),
    BuildingInfo::new(16, "Oil Rig", 5, 20)
        .cost(200)
        .funds(MIN_FUNDS * 2)
        .place_on(&[SHIPYARD_CONSTRUCTION_SITE]),
    BuildingInfo::new(17, "Repair Shop", 4, 30)
        .cost(300)
        .funds(MIN_FUNDS * 3 / 2)
        .heals(
            EntityTypes::of(EntityType::Ground)
                .with(EntityType::Artillery)
                .with(EntityType::Amphibious),
        )
        .place_on(BUILD_SITES),
    BuildingInfo::new(18, "Medbay", 4, 50)
        .cost(200)
        .heals(SOLDIERS)
        .place_on(BUILD_SITES),
    BuildingInfo::new(19, "Spawn Platform", 2, 20)
        .cost(150)
        .produces(SOLDIERS)
        .place_on(BUILD_SITES),
    BuildingInfo::new(20, "Destroyed Super Tank", 10, 50).structure(WRECK_TILES),
    BuildingInfo::new(21, "Sea Barrier", 10, 30).structure(SEA_BARRIER_TILES),
    BuildingInfo::new(22, "Sea Barrier", 10, 30).structure(SEA_BARRIER_TILES),
];

/// Look up a building, `None` for unknown ids.
#[must_use]
pub fn building_info(id: BuildingId) -> Option<&'static BuildingInfo> {
    (id.0 as usize)
        .checked_sub(1)
        .and_then(|index| BUILDINGS.get(index))
}

/// Look up a building that is known to exist.
///
/// # Panics
///
/// Panics if the id is not registered.
#[must_use]
pub fn building_info_or_panic(id: BuildingId) -> &'static BuildingInfo {
    building_info(id).unwrap_or_else(|| {
        panic!("building_info_or_panic: Could not find building with id '{id}'.")
    })
}

/// All buildings in display order.
#[must_use]
pub fn all_buildings() -> &'static [&'static BuildingInfo] {
    static ORDER: OnceLock<Vec<&'static BuildingInfo>> = OnceLock::new();
    ORDER.get_or_init(|| display_order(&BUILDINGS, |info| (info.sort, info.id.0)))
}

/// Buildings matching a predicate, in display order.
pub fn filter_buildings(predicate: impl Fn(&BuildingInfo) -> bool) -> Vec<&'static BuildingInfo> {
    all_buildings()
        .iter()
        .copied()
        .filter(|info| predicate(info))
        .collect()
}

/// Map over all buildings in display order.
pub fn map_buildings<T>(f: impl FnMut(&'static BuildingInfo) -> T) -> Vec<T> {
    all_buildings().iter().copied().map(f).collect()
}

/// Buildings available to a player with the given skills, in display order.
///
/// Includes every building with a finite base cost plus normally infinite
/// buildings one of the skills unlocks.
#[must_use]
pub fn buildings_with_content_restriction(skills: &BTreeSet<Skill>) -> Vec<&'static BuildingInfo> {
    filter_buildings(|info| info.base_cost().is_some() || has_unlocked_building(info, skills))
}

/// Map over [`buildings_with_content_restriction`].
pub fn map_buildings_with_content_restriction<T>(
    f: impl FnMut(&'static BuildingInfo) -> T,
    skills: &BTreeSet<Skill>,
) -> Vec<T> {
    buildings_with_content_restriction(skills)
        .into_iter()
        .map(f)
        .collect()
}
