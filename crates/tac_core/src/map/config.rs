//! Per-map game configuration.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::objective::{Objective, ObjectiveKind};
use crate::math::{option_fixed_serde, Fixed};
use crate::registry::building::{OIL_RIG, SHIPYARD};
use crate::registry::{BuildingId, BuildingInfo, EntityType, Skill, UnitId, UnitInfo};

/// Visual theme of a map. Some biomes restrict content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    /// Default.
    #[default]
    Grassland,
    /// Desert.
    Desert,
    /// Snow.
    Snow,
    /// Swamp.
    Swamp,
    /// Space station; no naval or rail content.
    Spaceship,
    /// Volcano; no naval content.
    Volcano,
}

impl Biome {
    /// Whether the biome forbids the unit type.
    #[must_use]
    pub fn restricts_unit(self, info: &UnitInfo) -> bool {
        match self {
            Self::Spaceship => matches!(
                info.entity_type,
                EntityType::Ship | EntityType::Amphibious | EntityType::Rail
            ),
            Self::Volcano => info.entity_type == EntityType::Ship,
            _ => false,
        }
    }

    /// Whether the biome forbids the building type.
    #[must_use]
    pub fn restricts_building(self, info: &BuildingInfo) -> bool {
        match self {
            Self::Spaceship | Self::Volcano => info.id == SHIPYARD || info.id == OIL_RIG,
            _ => false,
        }
    }
}

/// Which statistic the style expectation measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerformanceStyleType {
    /// At most this many own units lost.
    LostUnits,
    /// At least this many buildings captured.
    CapturedBuildings,
    /// At least this many one-shot kills.
    OneShots,
}

/// Style expectation of a map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerformanceStyle {
    /// Measured statistic.
    pub kind: PerformanceStyleType,
    /// Threshold.
    pub value: u32,
}

/// Expectations a player is scored against when winning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceExpectation {
    /// Win in at most this many rounds.
    pub pace: Option<u32>,
    /// Minimum ratio of destroyed to lost units.
    #[serde(with = "option_fixed_serde")]
    pub power: Option<Fixed>,
    /// Style threshold.
    pub style: Option<PerformanceStyle>,
}

impl PerformanceExpectation {
    /// Whether any expectation is configured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pace.is_none() && self.power.is_none() && self.style.is_none()
    }
}

/// Game rules and content restrictions of a map.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Theme.
    pub biome: Biome,
    /// Objectives by stable id.
    pub objectives: BTreeMap<u8, Objective>,
    /// Buildings that cannot be built.
    pub blocklisted_buildings: BTreeSet<BuildingId>,
    /// Units that cannot be built.
    pub blocklisted_units: BTreeSet<UnitId>,
    /// Skills that cannot be bought.
    pub blocklisted_skills: BTreeSet<Skill>,
    /// Fog of war.
    pub fog: bool,
    /// Income multiplier.
    pub multiplier: u32,
    /// Funds every player starts with.
    pub seed_capital: u32,
    /// Scoring expectations.
    pub performance: PerformanceExpectation,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            biome: Biome::default(),
            objectives: BTreeMap::from([(0, Objective::new(ObjectiveKind::Default))]),
            blocklisted_buildings: BTreeSet::new(),
            blocklisted_units: BTreeSet::new(),
            blocklisted_skills: BTreeSet::new(),
            fog: false,
            multiplier: 1,
            seed_capital: 0,
            performance: PerformanceExpectation::default(),
        }
    }
}

impl Configuration {
    /// Whether the unit is neither blocklisted nor excluded by the biome.
    #[must_use]
    pub fn allows_unit(&self, info: &UnitInfo) -> bool {
        !self.blocklisted_units.contains(&info.id) && !self.biome.restricts_unit(info)
    }

    /// Whether the building is neither blocklisted nor excluded by the biome.
    #[must_use]
    pub fn allows_building(&self, info: &BuildingInfo) -> bool {
        !self.blocklisted_buildings.contains(&info.id) && !self.biome.restricts_building(info)
    }

    /// Whether the skill can be bought.
    #[must_use]
    pub fn allows_skill(&self, skill: Skill) -> bool {
        !self.blocklisted_skills.contains(&skill)
    }
}
