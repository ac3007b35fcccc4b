//! Unit catalog.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::skill::{unit_cost_percent, Skill};
use super::{display_order, EntityType, EntityTypes, MovementType};
use crate::math::scale;

/// Stable unit identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u16);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability flags of a unit.
///
/// # Example
///
/// ```
/// use tac_core::registry::UnitAbilities;
///
/// let abilities = UnitAbilities::CAPTURE.union(UnitAbilities::HEAL);
/// assert!(abilities.contains(UnitAbilities::HEAL));
/// assert!(!abilities.contains(UnitAbilities::SUPPLY));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct UnitAbilities(u16);

impl UnitAbilities {
    /// No abilities.
    pub const NONE: Self = Self(0);
    /// Can capture buildings.
    pub const CAPTURE: Self = Self(1 << 0);
    /// Can construct buildings.
    pub const CREATE_BUILDINGS: Self = Self(1 << 1);
    /// Can lay rail tracks.
    pub const CREATE_TRACKS: Self = Self(1 << 2);
    /// Can enter building fields.
    pub const ACCESS_BUILDINGS: Self = Self(1 << 3);
    /// Can attack after moving in the same turn.
    pub const MOVE_AND_ACT: Self = Self(1 << 4);
    /// Refills adjacent units.
    pub const SUPPLY: Self = Self(1 << 5);
    /// Heals adjacent units.
    pub const HEAL: Self = Self(1 << 6);
    /// Converts adjacent neutral units.
    pub const RESCUE: Self = Self(1 << 7);
    /// Cripples adjacent enemy units.
    pub const SABOTAGE: Self = Self(1 << 8);
    /// Must unfold before attacking.
    pub const UNFOLD: Self = Self(1 << 9);

    /// Combine abilities.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check whether all abilities in `other` are present.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A unit's weapon.
#[derive(Debug)]
pub struct Weapon {
    /// Minimum and maximum attack distance.
    pub range: (u8, u8),
    /// Base damage per target type. Missing types cannot be attacked.
    pub damage: &'static [(EntityType, u8)],
    /// Whether each attack consumes one ammo.
    pub uses_ammo: bool,
}

impl Weapon {
    /// Base damage against a target type.
    #[must_use]
    pub fn damage_against(&self, target: EntityType) -> Option<u8> {
        self.damage
            .iter()
            .find(|(entity_type, _)| *entity_type == target)
            .map(|(_, damage)| *damage)
    }

    /// Whether the distance lies within the weapon's range.
    #[must_use]
    pub const fn in_range(&self, distance: u32) -> bool {
        distance >= self.range.0 as u32 && distance <= self.range.1 as u32
    }

    /// Whether this is a direct, adjacent-only weapon.
    #[must_use]
    pub const fn is_direct(&self) -> bool {
        self.range.0 == 1
    }
}

/// Transport capacity.
#[derive(Debug)]
pub struct Transport {
    /// Maximum number of carried units.
    pub limit: u8,
    /// Types that can be carried.
    pub types: EntityTypes,
}

/// Configuration of a unit type.
#[derive(Debug)]
pub struct UnitInfo {
    /// Stable identifier.
    pub id: UnitId,
    /// Display name.
    pub name: &'static str,
    /// Display sort key.
    pub sort: u8,
    cost: Option<u32>,
    /// Classification.
    pub entity_type: EntityType,
    /// Movement rules.
    pub movement_type: MovementType,
    /// Movement points per turn.
    pub radius: u8,
    /// Vision range.
    pub vision: u8,
    /// Maximum fuel.
    pub fuel: u32,
    /// Maximum ammo, `None` for unlimited.
    pub ammo: Option<u8>,
    /// Armor percent.
    pub defense: u8,
    /// Capabilities.
    pub abilities: UnitAbilities,
    /// Weapon, if the unit can attack.
    pub weapon: Option<Weapon>,
    /// Transport capacity, if the unit can carry others.
    pub transport: Option<Transport>,
}

impl UnitInfo {
    const fn new(
        id: u16,
        name: &'static str,
        sort: u8,
        entity_type: EntityType,
        movement_type: MovementType,
        radius: u8,
        vision: u8,
        fuel: u32,
    ) -> Self {
        Self {
            id: UnitId(id),
            name,
            sort,
            cost: None,
            entity_type,
            movement_type,
            radius,
            vision,
            fuel,
            ammo: None,
            defense: 0,
            abilities: UnitAbilities::NONE,
            weapon: None,
            transport: None,
        }
    }

    const fn cost(mut self, cost: u32) -> Self {
        self.cost = Some(cost);
        self
    }

    const fn defense(mut self, defense: u8) -> Self {
        self.defense = defense;
        self
    }

    const fn abilities(mut self, abilities: UnitAbilities) -> Self {
        self.abilities = abilities;
        self
    }

    const fn weapon(
        mut self,
        range: (u8, u8),
        ammo: Option<u8>,
        damage: &'static [(EntityType, u8)],
    ) -> Self {
        self.ammo = ammo;
        self.weapon = Some(Weapon {
            range,
            damage,
            uses_ammo: ammo.is_some(),
        });
        self
    }

    const fn transports(mut self, limit: u8, types: EntityTypes) -> Self {
        self.transport = Some(Transport { limit, types });
        self
    }

    /// Base cost, `None` if infinite.
    #[must_use]
    pub const fn base_cost(&self) -> Option<u32> {
        self.cost
    }

    /// Cost for a player with the given skills. A player without skills
    /// pays the base cost.
    #[must_use]
    pub fn cost_for(&self, skills: &BTreeSet<Skill>) -> Option<u32> {
        let base = self.cost?;
        if skills.is_empty() {
            return Some(base);
        }
        Some(scale(base, unit_cost_percent(skills)))
    }

    /// Whether the unit has the ability.
    #[must_use]
    pub const fn has_ability(&self, ability: UnitAbilities) -> bool {
        self.abilities.contains(ability)
    }

    /// Whether the unit can enter building fields.
    #[must_use]
    pub const fn can_access_buildings(&self) -> bool {
        self.has_ability(UnitAbilities::ACCESS_BUILDINGS)
    }

    /// Whether the unit can carry the other unit type at all.
    #[must_use]
    pub fn can_transport(&self, other: &UnitInfo) -> bool {
        self.transport
            .as_ref()
            .is_some_and(|transport| transport.types.contains(other.entity_type))
    }

    /// Whether the unit is a flying unit (ignores tile cover).
    #[must_use]
    pub fn is_air(&self) -> bool {
        self.entity_type == EntityType::Air
    }
}

use EntityType::{Air, Amphibious, Artillery, Building, Ground, Rail, Ship, Soldier, Structure};

const SOLDIER_ABILITIES: UnitAbilities = UnitAbilities::ACCESS_BUILDINGS.union(UnitAbilities::MOVE_AND_ACT);
const VEHICLE_ABILITIES: UnitAbilities = UnitAbilities::ACCESS_BUILDINGS.union(UnitAbilities::MOVE_AND_ACT);

/// Pioneer.
pub const PIONEER: UnitId = UnitId(1);
/// Infantry.
pub const INFANTRY: UnitId = UnitId(2);
/// Sniper.
pub const SNIPER: UnitId = UnitId(3);
/// Jeep.
pub const JEEP: UnitId = UnitId(4);
/// Small tank.
pub const SMALL_TANK: UnitId = UnitId(5);
/// Heavy tank.
pub const HEAVY_TANK: UnitId = UnitId(6);
/// Artillery.
pub const ARTILLERY: UnitId = UnitId(7);
/// Anti air.
pub const ANTI_AIR: UnitId = UnitId(8);
/// Supply train.
pub const SUPPLY_TRAIN: UnitId = UnitId(9);
/// Helicopter.
pub const HELICOPTER: UnitId = UnitId(10);
/// Fighter jet.
pub const FIGHTER_JET: UnitId = UnitId(11);
/// Transport ship.
pub const TRANSPORT_SHIP: UnitId = UnitId(12);
/// Frigate.
pub const FRIGATE: UnitId = UnitId(13);
/// Medic.
pub const MEDIC: UnitId = UnitId(14);
/// Saboteur, produced only by bars.
pub const SABOTEUR: UnitId = UnitId(15);
/// Commander, narrative only.
pub const COMMANDER: UnitId = UnitId(16);
/// Hovercraft.
pub const HOVERCRAFT: UnitId = UnitId(17);

// The order of units must not be changed.
static UNITS: [UnitInfo; 17] = [
    UnitInfo::new(1, "Pioneer", 1, Soldier, MovementType::Soldier, 3, 2, 40)
        .cost(150)
        .defense(5)
        .abilities(
            SOLDIER_ABILITIES
                .union(UnitAbilities::CAPTURE)
                .union(UnitAbilities::CREATE_BUILDINGS)
                .union(UnitAbilities::CREATE_TRACKS)
                .union(UnitAbilities::RESCUE),
        )
        .weapon(
            (1, 1),
            None,
            &[(Soldier, 35), (Ground, 10), (Artillery, 15), (Amphibious, 10), (Building, 10), (Structure, 10)],
        ),
    UnitInfo::new(2, "Infantry", 1, Soldier, MovementType::Soldier, 3, 2, 50)
        .cost(150)
        .defense(10)
        .abilities(SOLDIER_ABILITIES.union(UnitAbilities::CAPTURE))
        .weapon(
            (1, 1),
            None,
            &[
                (Soldier, 55),
                (Ground, 15),
                (Artillery, 25),
                (Rail, 10),
                (Air, 10),
                (Amphibious, 15),
                (Building, 15),
                (Structure, 15),
            ],
        ),
    UnitInfo::new(3, "Sniper", 2, Soldier, MovementType::Soldier, 2, 3, 40)
        .cost(250)
        .defense(5)
        .abilities(SOLDIER_ABILITIES.union(UnitAbilities::UNFOLD))
        .weapon(
            (1, 2),
            Some(6),
            &[(Soldier, 85), (Ground, 15), (Artillery, 30), (Air, 15), (Amphibious, 15), (Building, 10)],
        ),
    UnitInfo::new(4, "Jeep", 3, Ground, MovementType::Tires, 6, 3, 60)
        .cost(200)
        .defense(10)
        .abilities(VEHICLE_ABILITIES)
        .transports(1, EntityTypes::of(Soldier)),
    UnitInfo::new(5, "Small Tank", 3, Ground, MovementType::Tread, 5, 2, 60)
        .cost(250)
        .defense(20)
        .abilities(VEHICLE_ABILITIES)
        .weapon(
            (1, 1),
            Some(8),
            &[
                (Soldier, 65),
                (Ground, 55),
                (Artillery, 60),
                (Rail, 40),
                (Ship, 10),
                (Amphibious, 45),
                (Building, 30),
                (Structure, 30),
            ],
        ),
    UnitInfo::new(6, "Heavy Tank", 3, Ground, MovementType::Tread, 4, 2, 50)
        .cost(600)
        .defense(35)
        .abilities(VEHICLE_ABILITIES)
        .weapon(
            (1, 1),
            Some(6),
            &[
                (Soldier, 90),
                (Ground, 85),
                (Artillery, 85),
                (Rail, 60),
                (Ship, 25),
                (Amphibious, 70),
                (Building, 55),
                (Structure, 55),
            ],
        ),
    UnitInfo::new(7, "Artillery", 4, Artillery, MovementType::Tread, 4, 2, 50)
        .cost(450)
        .defense(10)
        .abilities(UnitAbilities::ACCESS_BUILDINGS)
        .weapon(
            (2, 3),
            Some(6),
            &[
                (Soldier, 90),
                (Ground, 70),
                (Artillery, 75),
                (Rail, 60),
                (Ship, 50),
                (Amphibious, 65),
                (Building, 45),
                (Structure, 45),
            ],
        ),
    UnitInfo::new(8, "Anti Air", 4, Ground, MovementType::Tires, 5, 2, 50)
        .cost(350)
        .defense(15)
        .abilities(VEHICLE_ABILITIES)
        .weapon(
            (1, 1),
            Some(9),
            &[(Soldier, 75), (Ground, 25), (Artillery, 40), (Air, 100), (Amphibious, 25)],
        ),
    UnitInfo::new(9, "Supply Train", 5, Rail, MovementType::Rail, 7, 2, 80)
        .cost(300)
        .defense(20)
        .abilities(UnitAbilities::MOVE_AND_ACT.union(UnitAbilities::SUPPLY))
        .transports(2, EntityTypes::of(Soldier)),
    UnitInfo::new(10, "Helicopter", 6, Air, MovementType::Air, 6, 3, 60)
        .cost(400)
        .defense(10)
        .abilities(UnitAbilities::MOVE_AND_ACT)
        .weapon(
            (1, 1),
            Some(6),
            &[
                (Soldier, 75),
                (Ground, 55),
                (Artillery, 65),
                (Rail, 40),
                (Air, 65),
                (Ship, 25),
                (Amphibious, 50),
                (Building, 25),
                (Structure, 25),
            ],
        ),
    UnitInfo::new(11, "Fighter Jet", 6, Air, MovementType::Air, 8, 4, 70)
        .cost(500)
        .defense(15)
        .abilities(UnitAbilities::MOVE_AND_ACT)
        .weapon((1, 1), Some(6), &[(Air, 100)]),
    UnitInfo::new(12, "Transport Ship", 7, Ship, MovementType::Ship, 6, 3, 80)
        .cost(300)
        .defense(20)
        .abilities(UnitAbilities::MOVE_AND_ACT)
        .transports(
            2,
            EntityTypes::of(Soldier).with(Ground).with(Artillery),
        ),
    UnitInfo::new(13, "Frigate", 7, Ship, MovementType::Ship, 5, 4, 80)
        .cost(600)
        .defense(30)
        .abilities(UnitAbilities::MOVE_AND_ACT)
        .weapon(
            (1, 2),
            Some(8),
            &[
                (Soldier, 45),
                (Ground, 40),
                (Artillery, 45),
                (Air, 45),
                (Ship, 70),
                (Amphibious, 60),
                (Building, 30),
                (Structure, 30),
            ],
        ),
    UnitInfo::new(14, "Medic", 2, Soldier, MovementType::Soldier, 3, 2, 40)
        .cost(200)
        .defense(5)
        .abilities(SOLDIER_ABILITIES.union(UnitAbilities::HEAL)),
    UnitInfo::new(15, "Saboteur", 2, Soldier, MovementType::Soldier, 4, 3, 40)
        .cost(250)
        .defense(5)
        .abilities(
            SOLDIER_ABILITIES
                .union(UnitAbilities::CAPTURE)
                .union(UnitAbilities::SABOTAGE),
        )
        .weapon((1, 1), None, &[(Soldier, 40), (Ground, 10)]),
    UnitInfo::new(16, "Commander", 8, Soldier, MovementType::Soldier, 4, 3, 60)
        .defense(20)
        .abilities(SOLDIER_ABILITIES.union(UnitAbilities::CAPTURE))
        .weapon(
            (1, 1),
            None,
            &[(Soldier, 70), (Ground, 30), (Artillery, 30), (Amphibious, 30), (Building, 20), (Structure, 20)],
        ),
    UnitInfo::new(17, "Hovercraft", 7, Amphibious, MovementType::Amphibious, 5, 2, 50)
        .cost(350)
        .defense(15)
        .abilities(VEHICLE_ABILITIES)
        .weapon(
            (1, 1),
            Some(6),
            &[(Soldier, 60), (Ground, 40), (Artillery, 45), (Ship, 35), (Amphibious, 45)],
        ),
];

/// Look up a unit, `None` for unknown ids.
#[must_use]
pub fn unit_info(id: UnitId) -> Option<&'static UnitInfo> {
    (id.0 as usize)
        .checked_sub(1)
        .and_then(|index| UNITS.get(index))
}

/// Look up a unit that is known to exist.
///
/// # Panics
///
/// Panics if the id is not registered.
#[must_use]
pub fn unit_info_or_panic(id: UnitId) -> &'static UnitInfo {
    unit_info(id).unwrap_or_else(|| panic!("unit_info_or_panic: Could not find unit with id '{id}'."))
}

/// All units in display order.
#[must_use]
pub fn all_units() -> &'static [&'static UnitInfo] {
    static ORDER: OnceLock<Vec<&'static UnitInfo>> = OnceLock::new();
    ORDER.get_or_init(|| display_order(&UNITS, |info| (info.sort, info.id.0)))
}

/// Units matching a predicate, in display order.
pub fn filter_units(predicate: impl Fn(&UnitInfo) -> bool) -> Vec<&'static UnitInfo> {
    all_units().iter().copied().filter(|info| predicate(info)).collect()
}

/// Map over all units in display order.
pub fn map_units<T>(f: impl FnMut(&'static UnitInfo) -> T) -> Vec<T> {
    all_units().iter().copied().map(f).collect()
}

/// Units that can be bought and are not blocklisted, in display order.
#[must_use]
pub fn units_with_content_restriction(blocklist: &BTreeSet<UnitId>) -> Vec<&'static UnitInfo> {
    filter_units(|info| info.base_cost().is_some() && !blocklist.contains(&info.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_match_positions() {
        for (index, info) in UNITS.iter().enumerate() {
            assert_eq!(info.id.0 as usize, index + 1, "{} is out of order", info.name);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(unit_info(SMALL_TANK).map(|info| info.name), Some("Small Tank"));
        assert!(unit_info(UnitId(0)).is_none());
    }

    #[test]
    #[should_panic(expected = "Could not find unit")]
    fn test_lookup_or_panic() {
        let _ = unit_info_or_panic(UnitId(1000));
    }

    #[test]
    fn test_cost_for() {
        let tank = unit_info_or_panic(SMALL_TANK);
        assert_eq!(tank.cost_for(&BTreeSet::new()), Some(250));
        assert_eq!(tank.cost_for(&BTreeSet::from([Skill::UnitDiscount])), Some(200));
        assert_eq!(tank.cost_for(&BTreeSet::from([Skill::AttackIncrease])), Some(250));
        assert_eq!(unit_info_or_panic(COMMANDER).cost_for(&BTreeSet::new()), None);
    }

    #[test]
    fn test_weapons() {
        let artillery = unit_info_or_panic(ARTILLERY);
        let weapon = artillery.weapon.as_ref().unwrap();
        assert!(!weapon.in_range(1));
        assert!(weapon.in_range(3));
        assert!(!weapon.is_direct());
        assert_eq!(weapon.damage_against(Air), None);
        assert_eq!(
            unit_info_or_panic(ANTI_AIR).weapon.as_ref().unwrap().damage_against(Air),
            Some(100)
        );
    }

    #[test]
    fn test_transport_rules() {
        let jeep = unit_info_or_panic(JEEP);
        assert!(jeep.can_transport(unit_info_or_panic(INFANTRY)));
        assert!(!jeep.can_transport(unit_info_or_panic(SMALL_TANK)));
        assert!(!unit_info_or_panic(SMALL_TANK).can_transport(unit_info_or_panic(INFANTRY)));
    }

    #[test]
    fn test_content_restriction() {
        let units = units_with_content_restriction(&BTreeSet::from([SNIPER]));
        assert!(units.iter().all(|info| info.id != SNIPER && info.id != COMMANDER));
    }
}
