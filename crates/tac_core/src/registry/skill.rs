//! Skill catalog.
//!
//! Skills are bought at buildings that sell them and stay with the player
//! for the rest of the game. Passive modifiers always apply; a skill with a
//! [`Power`] can additionally be activated by spending charge, which adds the
//! power modifiers until the player's next turn begins.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::building::{BuildingId, BuildingInfo, BAR, POWER_STATION, RESEARCH_LAB};
use crate::error::GameError;

/// Maximum number of skills a player can own.
pub const MAX_SKILLS: usize = 4;

/// A skill. The discriminant is the stable wire id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Skill {
    /// +10% attack.
    AttackIncrease = 1,
    /// +10% defense.
    DefenseIncrease = 2,
    /// Units cost 20% less.
    UnitDiscount = 3,
    /// Buildings cost 20% less.
    BuildingDiscount = 4,
    /// Research labs become buildable.
    UnlockResearchLab = 5,
    /// Power stations become buildable.
    UnlockPowerStation = 6,
    /// Bars become buildable.
    UnlockBar = 7,
    /// Power: heal every own unit.
    FieldMedic = 8,
    /// Power: resupply every own unit.
    Quartermaster = 9,
    /// Power: large attack boost.
    Blitz = 10,
}

impl Skill {
    /// Stable numeric id.
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Registry entry for the skill.
    #[must_use]
    pub fn info(self) -> &'static SkillInfo {
        // Discriminants are 1-based and contiguous.
        &SKILLS[self as usize - 1]
    }
}

impl TryFrom<u8> for Skill {
    type Error = GameError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Ok(match id {
            1 => Self::AttackIncrease,
            2 => Self::DefenseIncrease,
            3 => Self::UnitDiscount,
            4 => Self::BuildingDiscount,
            5 => Self::UnlockResearchLab,
            6 => Self::UnlockPowerStation,
            7 => Self::UnlockBar,
            8 => Self::FieldMedic,
            9 => Self::Quartermaster,
            10 => Self::Blitz,
            _ => return Err(GameError::UnknownSkill(id)),
        })
    }
}

impl From<Skill> for u8 {
    fn from(skill: Skill) -> Self {
        skill.id()
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().name)
    }
}

/// What an activated power does to the player's units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerEffect {
    /// Only modifiers change.
    None,
    /// Heal every own unit by the amount.
    HealAll(u8),
    /// Refill fuel and ammo of every own unit.
    Resupply,
}

/// Activatable part of a skill.
#[derive(Debug)]
pub struct Power {
    /// Charge bars consumed on activation.
    pub charges: u8,
    /// Additional attack percent while active.
    pub attack: i32,
    /// Additional defense percent while active.
    pub defense: i32,
    /// Immediate effect on units.
    pub effect: PowerEffect,
}

/// Configuration of a skill.
#[derive(Debug)]
pub struct SkillInfo {
    /// The skill.
    pub skill: Skill,
    /// Display name.
    pub name: &'static str,
    /// Display sort key.
    pub sort: u8,
    /// Price at a skill-selling building.
    pub cost: u32,
    /// Passive attack percent.
    pub attack: i32,
    /// Passive defense percent.
    pub defense: i32,
    /// Unit cost in percent of the base price.
    pub unit_cost: i32,
    /// Building cost in percent of the base price.
    pub building_cost: i32,
    /// Buildings made available, with the price they are sold for.
    pub unlocks: &'static [(BuildingId, u32)],
    /// Activatable power.
    pub power: Option<Power>,
}

impl SkillInfo {
    const fn new(skill: Skill, name: &'static str, sort: u8, cost: u32) -> Self {
        Self {
            skill,
            name,
            sort,
            cost,
            attack: 0,
            defense: 0,
            unit_cost: 100,
            building_cost: 100,
            unlocks: &[],
            power: None,
        }
    }

    const fn attack(mut self, attack: i32) -> Self {
        self.attack = attack;
        self
    }

    const fn defense(mut self, defense: i32) -> Self {
        self.defense = defense;
        self
    }

    const fn unit_cost(mut self, percent: i32) -> Self {
        self.unit_cost = percent;
        self
    }

    const fn building_cost(mut self, percent: i32) -> Self {
        self.building_cost = percent;
        self
    }

    const fn unlocks(mut self, unlocks: &'static [(BuildingId, u32)]) -> Self {
        self.unlocks = unlocks;
        self
    }

    const fn power(mut self, charges: u8, attack: i32, defense: i32, effect: PowerEffect) -> Self {
        self.power = Some(Power {
            charges,
            attack,
            defense,
            effect,
        });
        self
    }
}

// The order of skills must not be changed.
static SKILLS: [SkillInfo; 10] = [
    SkillInfo::new(Skill::AttackIncrease, "Attack Increase", 1, 300)
        .attack(10)
        .power(3, 20, 0, PowerEffect::None),
    SkillInfo::new(Skill::DefenseIncrease, "Defense Increase", 1, 300)
        .defense(10)
        .power(3, 0, 20, PowerEffect::None),
    SkillInfo::new(Skill::UnitDiscount, "Unit Discount", 2, 500).unit_cost(80),
    SkillInfo::new(Skill::BuildingDiscount, "Building Discount", 2, 400).building_cost(80),
    SkillInfo::new(Skill::UnlockResearchLab, "Research", 3, 600)
        .unlocks(&[(RESEARCH_LAB, 1000)]),
    SkillInfo::new(Skill::UnlockPowerStation, "Power Grid", 3, 600)
        .unlocks(&[(POWER_STATION, 600)]),
    SkillInfo::new(Skill::UnlockBar, "Night Life", 3, 500).unlocks(&[(BAR, 500)]),
    SkillInfo::new(Skill::FieldMedic, "Field Medic", 4, 400).power(
        2,
        0,
        0,
        PowerEffect::HealAll(50),
    ),
    SkillInfo::new(Skill::Quartermaster, "Quartermaster", 4, 300).power(
        1,
        0,
        0,
        PowerEffect::Resupply,
    ),
    SkillInfo::new(Skill::Blitz, "Blitz", 5, 800).power(4, 30, -10, PowerEffect::None),
];

/// Look up a skill by id, `None` for unknown ids.
#[must_use]
pub fn skill_info(id: u8) -> Option<&'static SkillInfo> {
    Skill::try_from(id).ok().map(Skill::info)
}

/// Look up a skill that is known to exist.
///
/// # Panics
///
/// Panics if the id is not registered.
#[must_use]
pub fn skill_info_or_panic(id: u8) -> &'static SkillInfo {
    skill_info(id)
        .unwrap_or_else(|| panic!("skill_info_or_panic: Could not find skill with id '{id}'."))
}

/// All skills in display order.
#[must_use]
pub fn all_skills() -> &'static [&'static SkillInfo] {
    static ORDER: OnceLock<Vec<&'static SkillInfo>> = OnceLock::new();
    ORDER.get_or_init(|| super::display_order(&SKILLS, |info| (info.sort, info.skill.id() as u16)))
}

/// Skills matching a predicate, in display order.
pub fn filter_skills(predicate: impl Fn(&SkillInfo) -> bool) -> Vec<&'static SkillInfo> {
    all_skills().iter().copied().filter(|info| predicate(info)).collect()
}

/// Map over all skills in display order.
pub fn map_skills<T>(f: impl FnMut(&'static SkillInfo) -> T) -> Vec<T> {
    all_skills().iter().copied().map(f).collect()
}

/// Skills that are not blocklisted, in display order.
#[must_use]
pub fn skills_with_content_restriction(blocklist: &BTreeSet<Skill>) -> Vec<&'static SkillInfo> {
    filter_skills(|info| !blocklist.contains(&info.skill))
}

/// Total attack percent from passive skills and active powers.
#[must_use]
pub fn attack_bonus(skills: &BTreeSet<Skill>, active: &BTreeSet<Skill>) -> i32 {
    let passive: i32 = skills.iter().map(|skill| skill.info().attack).sum();
    let powers: i32 = active
        .iter()
        .filter_map(|skill| skill.info().power.as_ref())
        .map(|power| power.attack)
        .sum();
    passive + powers
}

/// Total defense percent from passive skills and active powers.
#[must_use]
pub fn defense_bonus(skills: &BTreeSet<Skill>, active: &BTreeSet<Skill>) -> i32 {
    let passive: i32 = skills.iter().map(|skill| skill.info().defense).sum();
    let powers: i32 = active
        .iter()
        .filter_map(|skill| skill.info().power.as_ref())
        .map(|power| power.defense)
        .sum();
    passive + powers
}

/// Lowest unit cost percent granted by the skills.
#[must_use]
pub fn unit_cost_percent(skills: &BTreeSet<Skill>) -> i32 {
    skills
        .iter()
        .map(|skill| skill.info().unit_cost)
        .min()
        .unwrap_or(100)
}

/// Lowest building cost percent granted by the skills.
#[must_use]
pub fn building_cost_percent(skills: &BTreeSet<Skill>) -> i32 {
    skills
        .iter()
        .map(|skill| skill.info().building_cost)
        .min()
        .unwrap_or(100)
}

/// Price of a normally unbuildable building once one of the skills unlocks it.
#[must_use]
pub fn unlocked_building_cost(building: &BuildingInfo, skills: &BTreeSet<Skill>) -> Option<u32> {
    skills
        .iter()
        .flat_map(|skill| skill.info().unlocks.iter())
        .filter(|(id, _)| *id == building.id)
        .map(|(_, cost)| *cost)
        .min()
}

/// Whether one of the skills unlocks the building.
#[must_use]
pub fn has_unlocked_building(building: &BuildingInfo, skills: &BTreeSet<Skill>) -> bool {
    unlocked_building_cost(building, skills).is_some()
}
