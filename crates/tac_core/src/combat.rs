//! Damage resolution.
//!
//! Damage is computed with fixed-point math from:
//! - the attacker's weapon table against the target's entity type
//! - the attacker's remaining health
//! - attack bonuses from skills, active powers and owned research labs
//! - defense from tile cover (not for aircraft), the unit itself and skills
//!
//! The result of a fight is expressed as an `AttackUnit` or
//! `AttackBuilding` response; nothing here touches the map.

use std::collections::BTreeMap;

use crate::action::ActionResponse;
use crate::error::{GameError, Result};
use crate::map::player::MAX_CHARGE;
use crate::map::{MapState, PlayerId, Unit, MAX_HEALTH};
use crate::math::Fixed;
use crate::registry::skill::{attack_bonus as skill_attack, defense_bonus as skill_defense};
use crate::registry::{EntityType, UnitAbilities};
use crate::vector::Vector;

/// Damage a unit on a collapsing building takes.
pub const COLLAPSE_DAMAGE: u8 = 20;

/// Damage dealt by a weapon.
///
/// `base * health% * (100 + attack)% * (100 - defense)%`, rounded down and
/// clamped to `0..=100`.
#[must_use]
pub fn calculate_damage(base: u8, attacker_health: u8, attack: i32, defense: i32) -> u8 {
    // One division at the end keeps whole results exact.
    let numerator = i64::from(base)
        * i64::from(attacker_health)
        * i64::from((100 + attack).clamp(0, 500))
        * i64::from((100 - defense).clamp(0, 100));
    let damage = Fixed::from_num(numerator) / Fixed::from_num(1_000_000);
    damage
        .floor()
        .to_num::<i32>()
        .clamp(0, i32::from(MAX_HEALTH)) as u8
}

/// Attack percent of a player: skills, active powers and research labs.
#[must_use]
pub fn attack_bonus(map: &MapState, player: PlayerId) -> i32 {
    let Some(owner) = map.player(player) else {
        return 0;
    };
    let buildings: i32 = map
        .buildings_of(player)
        .map(|(_, building)| building.info().attack_bonus)
        .sum();
    skill_attack(&owner.skills, &owner.active_skills) + buildings
}

/// Defense percent of a unit at a position.
#[must_use]
pub fn defense(map: &MapState, position: Vector, unit: &Unit) -> i32 {
    let info = unit.info();
    let cover = if info.is_air() {
        0
    } else {
        let tile = map
            .tile_info_at(position)
            .map_or(0, |tile| i32::from(tile.cover));
        let building = map
            .building_at(position)
            .map_or(0, |building| i32::from(building.info().defense));
        tile.max(building)
    };
    let skills = map
        .player(unit.player)
        .map_or(0, |owner| skill_defense(&owner.skills, &owner.active_skills));
    cover + i32::from(info.defense) + skills
}

/// Base damage of a unit's weapon against an entity type, if it can fire.
///
/// Units that need to deploy must be unfolded, units that cannot move and
/// act must not have moved, and ammo must be left.
#[must_use]
pub fn base_damage(unit: &Unit, target: EntityType) -> Option<u8> {
    let info = unit.info();
    let weapon = info.weapon.as_ref()?;
    if weapon.uses_ammo && unit.ammo.unwrap_or(0) == 0 {
        return None;
    }
    if info.has_ability(UnitAbilities::UNFOLD) && !unit.unfolded {
        return None;
    }
    if unit.moved && !info.has_ability(UnitAbilities::MOVE_AND_ACT) {
        return None;
    }
    weapon.damage_against(target)
}

/// Whether the unit at `from` can fire at an entity of `target` type at `to`.
#[must_use]
pub fn can_attack(unit: &Unit, from: Vector, to: Vector, target: EntityType) -> bool {
    let in_range = unit
        .info()
        .weapon
        .as_ref()
        .is_some_and(|weapon| weapon.in_range(from.distance(to)));
    in_range && base_damage(unit, target).is_some()
}

fn fire(unit: &Unit) -> Unit {
    let mut fired = unit.clone();
    if fired.info().weapon.as_ref().is_some_and(|weapon| weapon.uses_ammo) {
        fired.ammo = fired.ammo.map(|ammo| ammo.saturating_sub(1));
    }
    fired
}

fn can_counter(defender: &Unit, attacker: &Unit, distance: u32) -> bool {
    distance == 1
        && defender
            .info()
            .weapon
            .as_ref()
            .is_some_and(|weapon| weapon.is_direct())
        && base_damage(defender, attacker.info().entity_type).is_some()
}

/// Running charge totals of the players involved in a fight.
struct Charges(BTreeMap<PlayerId, u32>);

impl Charges {
    fn new(map: &MapState, players: &[PlayerId]) -> Self {
        Self(
            players
                .iter()
                .map(|id| (*id, map.player(*id).map_or(0, |player| player.charge)))
                .collect(),
        )
    }

    fn add(&mut self, player: PlayerId, amount: u32) {
        if player.is_neutral() {
            return;
        }
        if let Some(charge) = self.0.get_mut(&player) {
            *charge = (*charge + amount).min(MAX_CHARGE);
        }
    }

    /// Record a hit: the attacker gains the damage, the victim twice as much.
    fn hit(&mut self, attacker: PlayerId, victim: PlayerId, damage: u8) {
        self.add(attacker, u32::from(damage));
        self.add(victim, 2 * u32::from(damage));
    }

    fn get(&self, player: PlayerId) -> u32 {
        self.0.get(&player).copied().unwrap_or(0)
    }
}

fn attacker_at(map: &MapState, from: Vector) -> Result<&Unit> {
    let attacker = map.unit_at(from).ok_or(GameError::NoUnit(from))?;
    if attacker.player != map.current_player() {
        return Err(GameError::NotOwner {
            position: from,
            player: map.current_player(),
        });
    }
    if attacker.completed {
        return Err(GameError::AlreadyCompleted(from));
    }
    Ok(attacker)
}

/// Resolve an attack of the unit at `from` on the unit at `to`.
pub fn resolve_unit_attack(map: &MapState, from: Vector, to: Vector) -> Result<ActionResponse> {
    let attacker = attacker_at(map, from)?;
    let defender = map.unit_at(to).ok_or(GameError::NoUnit(to))?;
    if !map.is_opponent(attacker.player, defender.player) {
        return Err(GameError::InvalidAction(format!("the unit at {to} is not an enemy")));
    }
    let defender_type = defender.info().entity_type;
    if !can_attack(attacker, from, to, defender_type) {
        return Err(GameError::InvalidAction(format!(
            "{} cannot attack the unit at {to}",
            attacker.info().name
        )));
    }
    let (player_a, player_b) = (attacker.player, defender.player);
    let mut charges = Charges::new(map, &[player_a, player_b]);

    let base = base_damage(attacker, defender_type).unwrap_or(0);
    let damage = calculate_damage(
        base,
        attacker.health,
        attack_bonus(map, player_a),
        defense(map, to, defender),
    );
    charges.hit(player_a, player_b, damage);
    let mut unit_a = fire(attacker).complete();
    let unit_b = defender.clone().with_health(i32::from(defender.health) - i32::from(damage));
    let unit_b = (unit_b.health > 0).then_some(unit_b);

    let mut has_counter_attack = false;
    let unit_b = match unit_b {
        Some(survivor) if can_counter(&survivor, &unit_a, from.distance(to)) => {
            has_counter_attack = true;
            let base = base_damage(&survivor, unit_a.info().entity_type).unwrap_or(0);
            let counter = calculate_damage(
                base,
                survivor.health,
                attack_bonus(map, player_b),
                defense(map, from, &unit_a),
            );
            charges.hit(player_b, player_a, counter);
            let health = i32::from(unit_a.health) - i32::from(counter);
            unit_a = unit_a.with_health(health);
            Some(fire(&survivor))
        }
        other => other,
    };
    let unit_a = (unit_a.health > 0).then_some(unit_a);

    Ok(ActionResponse::AttackUnit {
        from,
        to,
        has_counter_attack,
        player_a,
        player_b,
        unit_a,
        unit_b,
        charge_a: charges.get(player_a),
        charge_b: charges.get(player_b),
    })
}

/// Resolve an attack of the unit at `from` on the building at `to`.
pub fn resolve_building_attack(map: &MapState, from: Vector, to: Vector) -> Result<ActionResponse> {
    let attacker = attacker_at(map, from)?;
    let building = map.building_at(to).ok_or(GameError::NoBuilding(to))?;
    let info = building.info();
    if info.entity_type == EntityType::Invincible
        || building.player == attacker.player
        || map.is_teammate(attacker.player, building.player)
    {
        return Err(GameError::InvalidAction(format!(
            "the building at {to} cannot be attacked"
        )));
    }
    if !can_attack(attacker, from, to, info.entity_type) {
        return Err(GameError::InvalidAction(format!(
            "{} cannot attack {}",
            attacker.info().name,
            info.name
        )));
    }
    let player_a = attacker.player;
    let owner = building.player;
    let occupant = map.unit_at(to);
    let mut involved = vec![player_a, owner];
    involved.extend(occupant.map(|unit| unit.player));
    let mut charges = Charges::new(map, &involved);

    let base = base_damage(attacker, info.entity_type).unwrap_or(0);
    let damage = calculate_damage(
        base,
        attacker.health,
        attack_bonus(map, player_a),
        i32::from(info.defense),
    );
    charges.hit(player_a, owner, damage);
    let mut unit_a = fire(attacker).complete();
    let remaining = i32::from(building.health) - i32::from(damage);
    let destroyed = remaining <= 0;
    let building_after = if !destroyed {
        Some(building.clone().with_health(remaining))
    } else if info.is_structure() {
        None
    } else {
        Some(
            building
                .clone()
                .with_player(PlayerId::NEUTRAL)
                .with_health(i32::from(MAX_HEALTH))
                .recover(),
        )
    };

    let mut has_counter_attack = false;
    let mut player_c = None;
    let mut unit_c = None;
    if let Some(occupant) = occupant {
        let mut survivor = occupant.clone();
        let mut affected = false;
        if destroyed {
            let health = i32::from(survivor.health) - i32::from(COLLAPSE_DAMAGE);
            survivor = survivor.with_health(health);
            affected = true;
        }
        if survivor.health > 0
            && map.is_opponent(player_a, survivor.player)
            && can_counter(&survivor, &unit_a, from.distance(to))
        {
            has_counter_attack = true;
            affected = true;
            let base = base_damage(&survivor, unit_a.info().entity_type).unwrap_or(0);
            let counter = calculate_damage(
                base,
                survivor.health,
                attack_bonus(map, survivor.player),
                defense(map, from, &unit_a),
            );
            charges.hit(survivor.player, player_a, counter);
            let health = i32::from(unit_a.health) - i32::from(counter);
            unit_a = unit_a.with_health(health);
            survivor = fire(&survivor);
        }
        if affected {
            player_c = Some(survivor.player);
            unit_c = (survivor.health > 0).then_some(survivor);
        }
    }
    let unit_a = (unit_a.health > 0).then_some(unit_a);

    Ok(ActionResponse::AttackBuilding {
        from,
        to,
        has_counter_attack,
        player_a,
        player_b: Some(owner),
        building: building_after,
        unit_a,
        unit_c,
        player_c,
        charge_a: Some(charges.get(player_a)),
        charge_b: (!owner.is_neutral()).then(|| charges.get(owner)),
        charge_c: player_c.map(|player| charges.get(player)),
    })
}
