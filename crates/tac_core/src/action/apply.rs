//! Pure application of [`ActionResponse`]s to a [`MapState`].
//!
//! `apply` either returns the successor state or an error; the input state
//! is never touched, so a rejected response leaves nothing behind. Every
//! variant has exactly one arm below.

use tracing::trace;

use super::response::{ActionResponse, TurnPlayer};
use crate::error::{GameError, Result};
use crate::map::{
    Building, Layer, MapState, Player, PlayerId, PlayerStatistics, Reward, Unit, MAX_HEALTH,
};
use crate::map::player::{CHARGE_PER_BAR, MAX_CHARGE};
use crate::registry::building::building_info;
use crate::registry::skill::MAX_SKILLS;
use crate::registry::unit::unit_info;
use crate::registry::{BuildingBehaviors, BuildingId, EntityType, Skill, UnitAbilities};
use crate::vector::Vector;

/// Health restored by a medic.
pub const HEAL_AMOUNT: i32 = 50;
/// Health restored by a healing building at the start of a turn.
pub const BUILDING_HEAL_AMOUNT: i32 = 20;

/// Apply one response.
pub fn apply(map: &MapState, response: &ActionResponse) -> Result<MapState> {
    let next = apply_response(map, response)?;
    #[cfg(feature = "debug-validation")]
    next.validate()?;
    trace!(response = response.name(), "applied response");
    Ok(next)
}

/// Apply a list of responses in order. Either all of them apply or the
/// first error is returned.
pub fn apply_all<'a>(
    map: &MapState,
    responses: impl IntoIterator<Item = &'a ActionResponse>,
) -> Result<MapState> {
    responses
        .into_iter()
        .try_fold(map.clone(), |state, response| apply(&state, response))
}

fn apply_response(map: &MapState, response: &ActionResponse) -> Result<MapState> {
    use ActionResponse as R;
    match response {
        R::Start | R::BeginGame | R::Message { .. } | R::CharacterMessage { .. } => Ok(map.clone()),
        R::Move {
            from,
            to,
            fuel,
            path,
            completed,
        } => apply_move(map, *from, *to, *fuel, path.as_deref(), *completed),
        R::AttackUnit {
            from,
            to,
            has_counter_attack: _,
            player_a,
            player_b,
            unit_a,
            unit_b,
            charge_a,
            charge_b,
        } => apply_attack_unit(
            map,
            *from,
            *to,
            (*player_a, unit_a.as_ref(), *charge_a),
            (*player_b, unit_b.as_ref(), *charge_b),
        ),
        R::AttackBuilding {
            from,
            to,
            player_a,
            player_b,
            building,
            unit_a,
            unit_c,
            player_c,
            charge_a,
            charge_b,
            charge_c,
            ..
        } => apply_attack_building(
            map,
            *from,
            *to,
            BuildingAttack {
                player_a: *player_a,
                player_b: *player_b,
                building: building.as_ref(),
                unit_a: unit_a.as_ref(),
                unit_c: unit_c.as_ref(),
                player_c: *player_c,
                charge_a: *charge_a,
                charge_b: *charge_b,
                charge_c: *charge_c,
            },
        ),
        R::Capture {
            from,
            building,
            player,
        } => apply_capture(map, *from, building.as_ref(), *player),
        R::Supply { from, player } => apply_supply(map, *from, *player),
        R::CreateUnit {
            from,
            to,
            unit,
            free,
        } => apply_create_unit(map, *from, *to, unit, *free),
        R::DropUnit { from, index, to } => apply_drop_unit(map, *from, *index, *to),
        R::CreateBuilding {
            from,
            building,
            free,
        } => apply_create_building(map, *from, *building, *free),
        R::CreateTracks { from } => apply_create_tracks(map, *from),
        R::Fold { from } => apply_fold(map, *from, false),
        R::Unfold { from } => apply_fold(map, *from, true),
        R::CompleteUnit { from } => {
            let unit = own_unit(map, *from)?.clone();
            Ok(map.with_unit(*from, unit.complete()))
        }
        R::CompleteBuilding { from } => {
            let building = own_building(map, *from)?.clone();
            Ok(map.with_building(*from, building.complete()))
        }
        R::EndTurn {
            current,
            next,
            round,
            supply,
            miss,
        } => apply_end_turn(map, *current, *next, *round, supply.as_deref(), *miss),
        R::Spawn {
            units,
            buildings,
            players,
        } => apply_spawn(map, units, buildings.as_deref(), players.as_deref()),
        R::Heal { from, to } => apply_heal(map, *from, *to),
        R::Rescue { from, to, player } => apply_rescue(map, *from, *to, *player),
        R::Sabotage { from, to } => apply_sabotage(map, *from, *to),
        R::SetPlayer { player } => {
            if !map.active.contains(player) {
                return Err(GameError::UnknownPlayer(*player));
            }
            let mut next = map.clone();
            next.current_player = *player;
            Ok(next)
        }
        R::ReceiveReward {
            player,
            reward,
            permanent,
        } => apply_reward(map, *player, reward, permanent.unwrap_or(true)),
        R::BuySkill {
            from,
            player,
            skill,
        } => apply_buy_skill(map, *from, *player, *skill),
        R::ActivatePower {
            skill,
            free,
            from: _,
            units,
        } => apply_activate_power(map, *skill, *free, units.as_deref()),
        R::SecretDiscovered { objective_id, .. } => {
            let mut next = map.clone();
            let objective = next
                .config
                .objectives
                .get_mut(objective_id)
                .ok_or_else(|| unknown_objective(*objective_id))?;
            objective.hidden = false;
            Ok(next)
        }
        R::IncreaseFunds { player, funds } => apply_increase_funds(map, *player, *funds),
        R::IncreaseCharge { player, charges } => apply_increase_charge(map, *player, *charges),
        R::Swap {
            source,
            source_unit,
            target,
            target_unit,
        } => apply_swap(map, *source, source_unit, *target, target_unit.as_ref()),
        R::SetPlayerTime { player, time } => map.modify_player(*player, |p| p.time = Some(*time)),
        R::GameEnd {
            objective_id,
            to_player,
        } => {
            let mut next = map.clone();
            if let (Some(id), Some(player)) = (objective_id, to_player) {
                next.config
                    .objectives
                    .get_mut(id)
                    .ok_or_else(|| unknown_objective(*id))?
                    .completed
                    .insert(*player);
            }
            Ok(next)
        }
        R::OptionalObjective {
            objective_id,
            to_player,
        } => {
            map.player_or_err(*to_player)?;
            let mut next = map.clone();
            let objective = next
                .config
                .objectives
                .get_mut(objective_id)
                .ok_or_else(|| unknown_objective(*objective_id))?;
            if !objective.optional || !objective.completed.insert(*to_player) {
                return Err(GameError::InvalidAction(format!(
                    "objective {objective_id} cannot be completed by player {to_player}"
                )));
            }
            Ok(next)
        }
        R::PlayerLost { player } => apply_player_lost(map, *player),
        R::HiddenMove { to, unit } => {
            unit_info(unit.id).ok_or(GameError::UnknownUnit(unit.id.0))?;
            if !map.contains(*to) {
                return Err(GameError::OutOfBounds(*to));
            }
            Ok(map.with_unit(*to, unit.clone()))
        }
        R::HiddenRemove { from } => Ok(map.without_unit(*from)),
        R::HiddenTargetAttackUnit {
            to,
            unit_b,
            player_b,
            charge_b,
        } => {
            map.unit_at(*to).ok_or(GameError::NoUnit(*to))?;
            let next = match unit_b {
                Some(unit) => map.with_unit(*to, unit.clone()),
                None => map.without_unit(*to),
            };
            match charge_b {
                Some(charge) => set_charge(&next, *player_b, *charge),
                None => Ok(next),
            }
        }
    }
}

// ----------------------------------------------------------------------
// Ownership helpers
// ----------------------------------------------------------------------

fn own_unit(map: &MapState, position: Vector) -> Result<&Unit> {
    let unit = map.unit_at(position).ok_or(GameError::NoUnit(position))?;
    if unit.player == map.current_player {
        Ok(unit)
    } else {
        Err(GameError::NotOwner {
            position,
            player: map.current_player,
        })
    }
}

fn active_unit(map: &MapState, position: Vector) -> Result<&Unit> {
    let unit = own_unit(map, position)?;
    if unit.completed {
        return Err(GameError::AlreadyCompleted(position));
    }
    Ok(unit)
}

fn own_building(map: &MapState, position: Vector) -> Result<&Building> {
    let building = map
        .building_at(position)
        .ok_or(GameError::NoBuilding(position))?;
    if building.player == map.current_player {
        Ok(building)
    } else {
        Err(GameError::NotOwner {
            position,
            player: map.current_player,
        })
    }
}

fn check_current(map: &MapState, player: PlayerId) -> Result<()> {
    if player == map.current_player {
        Ok(())
    } else {
        Err(GameError::NotCurrentPlayer {
            expected: map.current_player,
            actual: player,
        })
    }
}

fn require_ability(unit: &Unit, ability: UnitAbilities, what: &str) -> Result<()> {
    if unit.info().has_ability(ability) {
        Ok(())
    } else {
        Err(GameError::InvalidAction(format!(
            "{} cannot {what}",
            unit.info().name
        )))
    }
}

fn require_adjacent(from: Vector, to: Vector) -> Result<()> {
    if from.distance(to) == 1 {
        Ok(())
    } else {
        Err(GameError::InvalidAction(format!("{to} is not adjacent to {from}")))
    }
}

fn unknown_objective(id: u8) -> GameError {
    GameError::InvalidAction(format!("unknown objective {id}"))
}

fn same_unit(expected: &Unit, actual: &Unit) -> bool {
    expected.id == actual.id && expected.player == actual.player
}

fn record(
    map: &MapState,
    player: PlayerId,
    update: impl FnOnce(&mut PlayerStatistics),
) -> Result<MapState> {
    if player.is_neutral() {
        return Ok(map.clone());
    }
    map.modify_player(player, |p| update(&mut p.stats))
}

fn set_charge(map: &MapState, player: PlayerId, charge: u32) -> Result<MapState> {
    if player.is_neutral() {
        return Ok(map.clone());
    }
    map.modify_player(player, |p| p.charge = charge.min(MAX_CHARGE))
}

fn pay(map: &MapState, player: PlayerId, cost: u32) -> Result<MapState> {
    map.modify_player(player, |p| p.funds -= cost)
}

fn check_funds(player: &Player, cost: u32) -> Result<()> {
    if player.funds < cost {
        Err(GameError::InsufficientFunds {
            player: player.id,
            required: cost,
            available: player.funds,
        })
    } else {
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Unit actions
// ----------------------------------------------------------------------

fn apply_move(
    map: &MapState,
    from: Vector,
    to: Vector,
    fuel: u32,
    path: Option<&[Vector]>,
    completed: bool,
) -> Result<MapState> {
    let unit = active_unit(map, from)?;
    if unit.moved {
        return Err(GameError::AlreadyMoved(from));
    }
    if fuel > unit.fuel {
        return Err(GameError::InsufficientFuel {
            required: fuel,
            available: unit.fuel,
        });
    }
    if let Some(path) = path {
        let mut previous = from;
        for step in path {
            require_adjacent(previous, *step)?;
            previous = *step;
        }
        if previous != to {
            return Err(GameError::InvalidAction(format!("path does not end at {to}")));
        }
    }
    let mut moved = unit.clone();
    moved.fuel = fuel;
    moved.moved = true;
    moved.capturing = false;
    moved.completed = completed;
    if from == to {
        return Ok(map.with_unit(from, moved));
    }
    let without = map.without_unit(from);
    match map.unit_at(to) {
        Some(carrier) if carrier.player == moved.player && carrier.can_load(&moved) => {
            without.load_unit(to, moved.complete())
        }
        _ => without.place_unit(to, moved),
    }
}

fn apply_attack_unit(
    map: &MapState,
    from: Vector,
    to: Vector,
    (player_a, unit_a, charge_a): (PlayerId, Option<&Unit>, u32),
    (player_b, unit_b, charge_b): (PlayerId, Option<&Unit>, u32),
) -> Result<MapState> {
    check_current(map, player_a)?;
    let attacker = active_unit(map, from)?;
    let defender = map.unit_at(to).ok_or(GameError::NoUnit(to))?;
    if defender.player != player_b || !map.is_opponent(player_a, player_b) {
        return Err(GameError::InvalidAction(format!(
            "player {player_a} cannot attack the unit at {to}"
        )));
    }
    if unit_a.is_some_and(|unit| !same_unit(attacker, unit))
        || unit_b.is_some_and(|unit| !same_unit(defender, unit))
    {
        return Err(GameError::InvalidAction("combat result changes unit identity".into()));
    }
    let damage = u32::from(defender.health.saturating_sub(unit_b.map_or(0, |unit| unit.health)));
    let one_shot = unit_b.is_none() && defender.health == MAX_HEALTH;

    let mut next = match unit_a {
        Some(unit) => map.with_unit(from, unit.clone()),
        None => map.without_unit(from),
    };
    next = match unit_b {
        Some(unit) => next.with_unit(to, unit.clone()),
        None => next.without_unit(to),
    };
    next = record(&next, player_a, |stats| {
        stats.damage += damage;
        if unit_b.is_none() {
            stats.destroyed_units += 1;
        }
        if unit_a.is_none() {
            stats.lost_units += 1;
        }
        if one_shot {
            stats.one_shots += 1;
        }
    })?;
    next = record(&next, player_b, |stats| {
        if unit_b.is_none() {
            stats.lost_units += 1;
        }
        if unit_a.is_none() {
            stats.destroyed_units += 1;
        }
    })?;
    let next = set_charge(&next, player_a, charge_a)?;
    set_charge(&next, player_b, charge_b)
}

struct BuildingAttack<'a> {
    player_a: PlayerId,
    player_b: Option<PlayerId>,
    building: Option<&'a Building>,
    unit_a: Option<&'a Unit>,
    unit_c: Option<&'a Unit>,
    player_c: Option<PlayerId>,
    charge_a: Option<u32>,
    charge_b: Option<u32>,
    charge_c: Option<u32>,
}

fn apply_attack_building(
    map: &MapState,
    from: Vector,
    to: Vector,
    attack: BuildingAttack<'_>,
) -> Result<MapState> {
    check_current(map, attack.player_a)?;
    let attacker = active_unit(map, from)?;
    let target = map.building_at(to).ok_or(GameError::NoBuilding(to))?;
    let info = target.info();
    if info.entity_type == EntityType::Invincible
        || target.player == attack.player_a
        || map.is_teammate(attack.player_a, target.player)
        || attack.player_b.is_some_and(|player| player != target.player)
    {
        return Err(GameError::InvalidAction(format!(
            "player {} cannot attack the building at {to}",
            attack.player_a
        )));
    }
    if attack.unit_a.is_some_and(|unit| !same_unit(attacker, unit))
        || attack.building.is_some_and(|building| building.id != target.id)
    {
        return Err(GameError::InvalidAction("combat result changes entity identity".into()));
    }
    if attack.building.is_none() && !info.is_structure() {
        return Err(GameError::InvalidAction(format!(
            "{} cannot collapse",
            info.name
        )));
    }
    let owner = target.player;
    let destroyed = match attack.building {
        None => true,
        Some(building) => building.player.is_neutral() && !owner.is_neutral(),
    };

    let mut next = match attack.unit_a {
        Some(unit) => map.with_unit(from, unit.clone()),
        None => map.without_unit(from),
    };
    next = match attack.building {
        Some(building) => next.with_building(to, building.clone()),
        None => next.without_building(to),
    };
    if let Some(player_c) = attack.player_c {
        let occupant = map.unit_at(to).ok_or(GameError::NoUnit(to))?;
        if occupant.player != player_c
            || attack.unit_c.is_some_and(|unit| !same_unit(occupant, unit))
        {
            return Err(GameError::InvalidAction(format!(
                "unit at {to} does not belong to player {player_c}"
            )));
        }
        next = match attack.unit_c {
            Some(unit) => next.with_unit(to, unit.clone()),
            None => {
                let lost = record(&next.without_unit(to), player_c, |stats| {
                    stats.lost_units += 1;
                })?;
                record(&lost, attack.player_a, |stats| stats.destroyed_units += 1)?
            }
        };
    } else if attack.unit_c.is_some() {
        return Err(GameError::InvalidAction("unit_c requires player_c".into()));
    }

    next = record(&next, attack.player_a, |stats| {
        if destroyed {
            stats.destroyed_buildings += 1;
        }
        if attack.unit_a.is_none() {
            stats.lost_units += 1;
        }
    })?;
    if destroyed {
        next = record(&next, owner, |stats| stats.lost_buildings += 1)?;
    }
    if let Some(charge) = attack.charge_a {
        next = set_charge(&next, attack.player_a, charge)?;
    }
    if let Some(charge) = attack.charge_b {
        next = set_charge(&next, owner, charge)?;
    }
    if let (Some(charge), Some(player)) = (attack.charge_c, attack.player_c) {
        next = set_charge(&next, player, charge)?;
    }
    Ok(next)
}

fn apply_capture(
    map: &MapState,
    from: Vector,
    building: Option<&Building>,
    previous: Option<PlayerId>,
) -> Result<MapState> {
    let unit = active_unit(map, from)?;
    require_ability(unit, UnitAbilities::CAPTURE, "capture")?;
    let target = map.building_at(from).ok_or(GameError::NoBuilding(from))?;
    let player = map.current_player;
    if target.player == player
        || map.is_teammate(player, target.player)
        || target.info().is_structure()
    {
        return Err(GameError::InvalidAction(format!(
            "the building at {from} cannot be captured"
        )));
    }
    let mut capturer = unit.clone().complete();
    let Some(building) = building else {
        capturer.capturing = true;
        return Ok(map.with_unit(from, capturer));
    };
    if building.id != target.id
        || building.player != player
        || previous.is_some_and(|previous| previous != target.player)
    {
        return Err(GameError::InvalidAction(format!(
            "capture result at {from} does not match the map"
        )));
    }
    capturer.capturing = false;
    let next = map
        .with_unit(from, capturer)
        .with_building(from, building.clone().recover());
    let next = record(&next, player, |stats| stats.captured += 1)?;
    record(&next, target.player, |stats| stats.lost_buildings += 1)
}

fn apply_supply(map: &MapState, from: Vector, player: PlayerId) -> Result<MapState> {
    check_current(map, player)?;
    let supplier = active_unit(map, from)?;
    require_ability(supplier, UnitAbilities::SUPPLY, "supply")?;
    let next = map.with_unit(from, supplier.clone().complete());
    let adjacent = from.adjacent();
    Ok(next.map_units(|position, unit| {
        (adjacent.contains(&position) && unit.player == player).then(|| unit.clone().refill())
    }))
}

fn apply_create_unit(
    map: &MapState,
    from: Vector,
    to: Vector,
    unit: &Unit,
    free: bool,
) -> Result<MapState> {
    let building = own_building(map, from)?;
    let info = unit_info(unit.id).ok_or(GameError::UnknownUnit(unit.id.0))?;
    let player = map.player_or_err(map.current_player)?;
    if unit.player != player.id {
        return Err(GameError::InvalidAction(format!(
            "player {} cannot create units for player {}",
            player.id, unit.player
        )));
    }
    let cost = if free {
        0
    } else {
        let cost = info
            .cost_for(&player.skills)
            .ok_or(GameError::Unbuildable(info.name))?;
        check_funds(player, cost)?;
        cost
    };
    if building.completed {
        return Err(GameError::AlreadyCompleted(from));
    }
    if !map.config.allows_unit(info) {
        return Err(GameError::Restricted(info.name));
    }
    if !building.info().can_build(info) {
        return Err(GameError::InvalidAction(format!(
            "{} cannot produce {}",
            building.info().name,
            info.name
        )));
    }
    if from.distance(to) > 1 {
        return Err(GameError::InvalidAction(format!("{to} is too far from {from}")));
    }
    let mut created = unit.clone();
    created.moved = true;
    created.completed = true;
    let next = map
        .place_unit(to, created)?
        .with_building(from, building.clone().complete());
    let next = pay(&next, player.id, cost)?;
    record(&next, player.id, |stats| stats.created_units += 1)
}

fn apply_drop_unit(map: &MapState, from: Vector, index: usize, to: Vector) -> Result<MapState> {
    let carrier = active_unit(map, from)?;
    require_adjacent(from, to)?;
    if index >= carrier.transports.len() {
        return Err(GameError::InvalidAction(format!(
            "no transported unit at index {index}"
        )));
    }
    let mut carrier = carrier.clone();
    let mut cargo = carrier.transports.remove(index);
    cargo.moved = true;
    cargo.completed = true;
    map.with_unit(from, carrier.complete()).place_unit(to, cargo)
}

fn apply_create_building(
    map: &MapState,
    from: Vector,
    building: BuildingId,
    free: bool,
) -> Result<MapState> {
    let builder = own_unit(map, from)?;
    require_ability(builder, UnitAbilities::CREATE_BUILDINGS, "create buildings")?;
    let info = building_info(building).ok_or(GameError::UnknownBuilding(building.0))?;
    let player = map.player_or_err(map.current_player)?;
    let cost = if free {
        0
    } else {
        let cost = info
            .cost_for(&player.skills)
            .ok_or(GameError::Unbuildable(info.name))?;
        check_funds(player, cost)?;
        cost
    };
    if builder.completed {
        return Err(GameError::AlreadyCompleted(from));
    }
    if !map.config.allows_building(info) {
        return Err(GameError::Restricted(info.name));
    }
    if info.limit > 0 {
        let owned = map
            .buildings_of(player.id)
            .filter(|(_, existing)| existing.id == info.id)
            .count();
        if owned >= usize::from(info.limit) {
            return Err(GameError::BuildingLimit {
                building: info.name,
                limit: info.limit,
                player: player.id,
            });
        }
    }
    let tile = map
        .tile_info_at(from)
        .ok_or(GameError::OutOfBounds(from))?;
    if !info.can_be_created_on(tile.id) {
        return Err(GameError::IllegalPlacement {
            entity: info.name,
            tile: tile.name,
            position: from,
        });
    }
    let next = map
        .place_building(from, Building::from_info(info, player.id).complete())?
        .with_unit(from, builder.clone().complete());
    let next = pay(&next, player.id, cost)?;
    record(&next, player.id, |stats| stats.created_buildings += 1)
}

fn apply_create_tracks(map: &MapState, from: Vector) -> Result<MapState> {
    let builder = active_unit(map, from)?;
    require_ability(builder, UnitAbilities::CREATE_TRACKS, "create tracks")?;
    if map.building_at(from).is_some() {
        return Err(GameError::BuildingOccupied(from));
    }
    let tile = map
        .tile_info_at(from)
        .ok_or(GameError::OutOfBounds(from))?;
    let tracks = tile.tracks().ok_or(GameError::IllegalPlacement {
        entity: "Rail Track",
        tile: tile.name,
        position: from,
    })?;
    map.with_unit(from, builder.clone().complete())
        .set_tile(from, tracks)
}

fn apply_fold(map: &MapState, from: Vector, unfold: bool) -> Result<MapState> {
    let unit = active_unit(map, from)?;
    require_ability(unit, UnitAbilities::UNFOLD, "unfold")?;
    if unit.unfolded == unfold {
        return Err(GameError::InvalidAction(format!(
            "unit at {from} is already {}",
            if unfold { "unfolded" } else { "folded" }
        )));
    }
    let mut toggled = unit.clone().complete();
    toggled.unfolded = unfold;
    Ok(map.with_unit(from, toggled))
}

fn apply_heal(map: &MapState, from: Option<Vector>, to: Vector) -> Result<MapState> {
    let mut next = map.clone();
    if let Some(from) = from {
        let healer = active_unit(map, from)?;
        require_ability(healer, UnitAbilities::HEAL, "heal")?;
        require_adjacent(from, to)?;
        let target = map.unit_at(to).ok_or(GameError::NoUnit(to))?;
        if target.player != healer.player && !map.is_teammate(target.player, healer.player) {
            return Err(GameError::InvalidAction(format!("cannot heal the unit at {to}")));
        }
        next = next.with_unit(from, healer.clone().complete());
    }
    let target = map.unit_at(to).ok_or(GameError::NoUnit(to))?;
    let healed = target
        .clone()
        .with_health(i32::from(target.health) + HEAL_AMOUNT);
    Ok(next.with_unit(to, healed))
}

fn apply_rescue(
    map: &MapState,
    from: Option<Vector>,
    to: Vector,
    player: PlayerId,
) -> Result<MapState> {
    map.player_or_err(player)?;
    let mut next = map.clone();
    if let Some(from) = from {
        let rescuer = active_unit(map, from)?;
        require_ability(rescuer, UnitAbilities::RESCUE, "rescue")?;
        require_adjacent(from, to)?;
        if rescuer.player != player {
            return Err(GameError::InvalidAction(format!(
                "player {} cannot rescue for player {player}",
                rescuer.player
            )));
        }
        next = next.with_unit(from, rescuer.clone().complete());
    }
    let target = map.unit_at(to).ok_or(GameError::NoUnit(to))?;
    if !target.player.is_neutral() {
        return Err(GameError::InvalidAction(format!("the unit at {to} is not neutral")));
    }
    let rescued = target.clone().with_player(player).complete();
    let next = next.with_unit(to, rescued);
    record(&next, player, |stats| stats.rescued_units += 1)
}

fn apply_sabotage(map: &MapState, from: Option<Vector>, to: Vector) -> Result<MapState> {
    let target = map.unit_at(to).ok_or(GameError::NoUnit(to))?;
    let mut next = map.clone();
    if let Some(from) = from {
        let saboteur = active_unit(map, from)?;
        require_ability(saboteur, UnitAbilities::SABOTAGE, "sabotage")?;
        require_adjacent(from, to)?;
        if !map.is_opponent(saboteur.player, target.player) {
            return Err(GameError::InvalidAction(format!("cannot sabotage the unit at {to}")));
        }
        next = next.with_unit(from, saboteur.clone().complete());
    }
    let damaged = target
        .clone()
        .with_health((i32::from(target.health) / 2).max(1));
    Ok(next.with_unit(to, damaged))
}

fn swappable(map: &MapState, position: Vector) -> Result<&Unit> {
    let unit = active_unit(map, position)?;
    if unit.moved {
        return Err(GameError::AlreadyMoved(position));
    }
    Ok(unit)
}

fn apply_swap(
    map: &MapState,
    source: Vector,
    source_unit: &Unit,
    target: Vector,
    target_unit: Option<&Unit>,
) -> Result<MapState> {
    require_adjacent(source, target)?;
    let at_source = swappable(map, source)?;
    let at_target = match target_unit {
        Some(_) => Some(swappable(map, target)?),
        None => map.unit_at(target),
    };
    let matches = same_unit(at_source, source_unit)
        && match (at_target, target_unit) {
            (Some(actual), Some(expected)) => same_unit(actual, expected),
            (None, None) => true,
            _ => false,
        };
    if !matches {
        return Err(GameError::InvalidAction(format!(
            "swap between {source} and {target} does not match the map"
        )));
    }
    let cleared = map.without_unit(source).without_unit(target);
    let next = cleared.place_unit(target, at_source.clone())?;
    match at_target {
        Some(unit) => next.place_unit(source, unit.clone()),
        None => Ok(next),
    }
}

// ----------------------------------------------------------------------
// Turn flow and players
// ----------------------------------------------------------------------

fn apply_end_turn(
    map: &MapState,
    current: TurnPlayer,
    next_player: TurnPlayer,
    round: u32,
    supply: Option<&[Vector]>,
    miss: bool,
) -> Result<MapState> {
    check_current(map, current.player)?;
    if !map.active.contains(&next_player.player) {
        return Err(GameError::UnknownPlayer(next_player.player));
    }
    let (expected, wrapped) = map
        .next_player()
        .ok_or_else(|| GameError::InvalidState("no player to hand over to".into()))?;
    if next_player.player != expected {
        return Err(GameError::InvalidAction(format!(
            "turn passes to player {expected}, not {}",
            next_player.player
        )));
    }
    let expected_round = if miss {
        map.round
    } else {
        map.round + u32::from(wrapped)
    };
    if round != expected_round {
        return Err(GameError::InvalidAction(format!(
            "turn hand-over expects round {expected_round}, got {round}"
        )));
    }
    let mut next = map.clone();
    if !miss {
        next = next.modify_player(current.player, |p| p.funds = current.funds)?;
        next = next.modify_player(next_player.player, |p| p.funds = next_player.funds)?;
        next.round = round;
    }

    let ending = current.player;
    next = next
        .map_units(|_, unit| (unit.player == ending).then(|| unit.clone().recover()))
        .map_buildings(|_, building| {
            (building.player == ending).then(|| building.clone().recover())
        });

    let beginning = next_player.player;
    let buildings = next.buildings.clone();
    next = next.map_units(|position, unit| {
        if unit.player != beginning || !unit.is_damaged() {
            return None;
        }
        let building = buildings.get(&position)?;
        (building.player == beginning && building.info().can_heal(unit.info())).then(|| {
            unit.clone()
                .with_health(i32::from(unit.health) + BUILDING_HEAL_AMOUNT)
        })
    });
    if let Some(positions) = supply {
        for position in positions {
            let unit = next.unit_at(*position).ok_or(GameError::NoUnit(*position))?;
            if unit.player != beginning {
                return Err(GameError::NotOwner {
                    position: *position,
                    player: beginning,
                });
            }
            let refilled = unit.clone().refill();
            next = next.with_unit(*position, refilled);
        }
    }
    next = next.modify_player(beginning, |p| p.active_skills.clear())?;
    next.current_player = beginning;
    Ok(next)
}

fn apply_spawn(
    map: &MapState,
    units: &[(Vector, Unit)],
    buildings: Option<&[(Vector, Building)]>,
    players: Option<&[Player]>,
) -> Result<MapState> {
    let mut next = map.clone();
    for player in players.unwrap_or_default() {
        next = next.add_player(player.clone())?;
    }
    for (position, building) in buildings.unwrap_or_default() {
        next = next.place_building(*position, building.clone())?;
    }
    for (position, unit) in units {
        next = next.place_unit(*position, unit.clone())?;
    }
    Ok(next)
}

fn apply_reward(
    map: &MapState,
    player: PlayerId,
    reward: &Reward,
    permanent: bool,
) -> Result<MapState> {
    let existing = map.player_or_err(player)?;
    match reward {
        Reward::Funds { amount } => {
            let funds = existing
                .funds
                .checked_add(*amount)
                .ok_or_else(|| GameError::InvalidAction("funds overflow".into()))?;
            map.modify_player(player, |p| p.funds = funds)
        }
        Reward::Skill { skill } => map.modify_player(player, |p| {
            if permanent {
                p.skills.insert(*skill);
            } else {
                p.active_skills.insert(*skill);
            }
        }),
    }
}

fn apply_buy_skill(map: &MapState, from: Vector, player: PlayerId, skill: Skill) -> Result<MapState> {
    check_current(map, player)?;
    let buyer = map.player_or_err(player)?;
    let info = skill.info();
    check_funds(buyer, info.cost)?;
    let building = own_building(map, from)?;
    if !building.info().has_behavior(BuildingBehaviors::SELL_SKILLS) {
        return Err(GameError::InvalidAction(format!(
            "{} does not sell skills",
            building.info().name
        )));
    }
    if building.completed {
        return Err(GameError::AlreadyCompleted(from));
    }
    if !map.config.allows_skill(skill) {
        return Err(GameError::Restricted(info.name));
    }
    if buyer.skills.contains(&skill) {
        return Err(GameError::InvalidAction(format!(
            "player {player} already owns {skill}"
        )));
    }
    if buyer.skills.len() >= MAX_SKILLS {
        return Err(GameError::SkillLimit {
            player,
            limit: MAX_SKILLS,
        });
    }
    let next = map.with_building(from, building.clone().complete());
    next.modify_player(player, |p| {
        p.funds -= info.cost;
        p.skills.insert(skill);
    })
}

fn apply_activate_power(
    map: &MapState,
    skill: Skill,
    free: bool,
    units: Option<&[(Vector, Unit)]>,
) -> Result<MapState> {
    let player = map.player_or_err(map.current_player)?;
    let power = skill.info().power.as_ref().ok_or_else(|| {
        GameError::InvalidAction(format!("{skill} has no power"))
    })?;
    if !free && !player.skills.contains(&skill) {
        return Err(GameError::InvalidAction(format!(
            "player {} does not own {skill}",
            player.id
        )));
    }
    if player.active_skills.contains(&skill) {
        return Err(GameError::InvalidAction(format!("{skill} is already active")));
    }
    let required = u32::from(power.charges) * CHARGE_PER_BAR;
    if !free && player.charge < required {
        return Err(GameError::InsufficientCharge {
            player: player.id,
            required,
            available: player.charge,
        });
    }
    let mut next = map.modify_player(player.id, |p| {
        if !free {
            p.charge -= required;
        }
        p.active_skills.insert(skill);
    })?;
    for (position, unit) in units.unwrap_or_default() {
        let existing = next.unit_at(*position).ok_or(GameError::NoUnit(*position))?;
        if !same_unit(existing, unit) {
            return Err(GameError::InvalidAction(format!(
                "power result at {position} does not match the map"
            )));
        }
        next = next.with_unit(*position, unit.clone());
    }
    Ok(next)
}

fn apply_increase_funds(map: &MapState, player: PlayerId, delta: i32) -> Result<MapState> {
    let existing = map.player_or_err(player)?;
    let funds = i64::from(existing.funds) + i64::from(delta);
    if funds < 0 {
        return Err(GameError::InsufficientFunds {
            player,
            required: delta.unsigned_abs(),
            available: existing.funds,
        });
    }
    let funds =
        u32::try_from(funds).map_err(|_| GameError::InvalidAction("funds overflow".into()))?;
    map.modify_player(player, |p| p.funds = funds)
}

fn apply_increase_charge(map: &MapState, player: PlayerId, charges: i32) -> Result<MapState> {
    let existing = map.player_or_err(player)?;
    let delta = i64::from(charges) * i64::from(CHARGE_PER_BAR);
    let charge = i64::from(existing.charge) + delta;
    if charge < 0 {
        return Err(GameError::InsufficientCharge {
            player,
            required: u32::try_from(-delta).unwrap_or(u32::MAX),
            available: existing.charge,
        });
    }
    let charge = u32::try_from(charge.min(i64::from(MAX_CHARGE))).unwrap_or(MAX_CHARGE);
    map.modify_player(player, |p| p.charge = charge)
}

fn apply_player_lost(map: &MapState, player: PlayerId) -> Result<MapState> {
    if !map.active.contains(&player) {
        return Err(GameError::UnknownPlayer(player));
    }
    if map.active.len() == 1 {
        return Err(GameError::InvalidAction("the last player cannot lose".into()));
    }
    let mut next = map.clone();
    if next.current_player == player {
        if let Some((successor, _)) = next.next_player() {
            next.current_player = successor;
        }
    }
    next.active.retain(|id| *id != player);
    let lost: Vec<Vector> = next.units_of(player).map(|(position, _)| position).collect();
    for position in lost {
        next = next.remove(position, Layer::Unit)?;
    }
    Ok(next.map_buildings(|_, building| {
        (building.player == player).then(|| building.clone().with_player(PlayerId::NEUTRAL))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{Objective, ObjectiveKind};
    use crate::registry::building::{FACTORY, HOUSE, HQ, RESEARCH_LAB};
    use crate::registry::tile::{CONSTRUCTION_SITE, PLAIN, RAIL_TRACK};
    use crate::registry::unit::{INFANTRY, JEEP, MEDIC, PIONEER, SMALL_TANK, SNIPER};
    use crate::vector::SizeVector;

    fn base() -> MapState {
        MapState::new(
            SizeVector::new(6, 6),
            PLAIN,
            vec![
                Player::new(PlayerId(1), 1, 300),
                Player::new(PlayerId(2), 2, 100),
            ],
        )
        .unwrap()
    }

    fn unit(id: crate::registry::UnitId, player: u8) -> Unit {
        Unit::create(id, PlayerId(player)).unwrap()
    }

    fn with_factory() -> MapState {
        base()
            .set_tile(Vector::new(2, 2), CONSTRUCTION_SITE)
            .unwrap()
            .place_building(Vector::new(2, 2), Building::create(FACTORY, PlayerId(1)).unwrap())
            .unwrap()
    }

    #[test]
    fn test_markers_do_not_change_state() {
        let map = base();
        assert_eq!(apply(&map, &ActionResponse::Start).unwrap(), map);
        assert_eq!(apply(&map, &ActionResponse::BeginGame).unwrap(), map);
    }

    #[test]
    fn test_move_sets_fuel_and_flags() {
        let map = base().place_unit(Vector::new(1, 1), unit(INFANTRY, 1)).unwrap();
        let next = apply(
            &map,
            &ActionResponse::Move {
                from: Vector::new(1, 1),
                to: Vector::new(1, 3),
                fuel: 48,
                path: Some(vec![Vector::new(1, 2), Vector::new(1, 3)]),
                completed: false,
            },
        )
        .unwrap();
        let moved = next.unit_at(Vector::new(1, 3)).unwrap();
        assert_eq!(moved.fuel, 48);
        assert!(moved.moved);
        assert!(next.unit_at(Vector::new(1, 1)).is_none());

        let again = ActionResponse::Move {
            from: Vector::new(1, 3),
            to: Vector::new(1, 5),
            fuel: 46,
            path: Some(vec![Vector::new(1, 4), Vector::new(1, 5)]),
            completed: false,
        };
        assert_eq!(
            apply(&next, &again),
            Err(GameError::AlreadyMoved(Vector::new(1, 3)))
        );
    }

    #[test]
    fn test_move_rejects_broken_path_and_foreign_units() {
        let map = base()
            .place_unit(Vector::new(1, 1), unit(INFANTRY, 1))
            .unwrap()
            .place_unit(Vector::new(4, 4), unit(INFANTRY, 2))
            .unwrap();
        let broken = ActionResponse::Move {
            from: Vector::new(1, 1),
            to: Vector::new(1, 3),
            fuel: 48,
            path: Some(vec![Vector::new(1, 3)]),
            completed: false,
        };
        assert!(matches!(apply(&map, &broken), Err(GameError::InvalidAction(_))));
        let foreign = ActionResponse::Move {
            from: Vector::new(4, 4),
            to: Vector::new(4, 5),
            fuel: 49,
            path: None,
            completed: false,
        };
        assert_eq!(
            apply(&map, &foreign),
            Err(GameError::NotOwner {
                position: Vector::new(4, 4),
                player: PlayerId(1)
            })
        );
    }

    #[test]
    fn test_move_onto_carrier_loads() {
        let map = base()
            .place_unit(Vector::new(1, 1), unit(INFANTRY, 1))
            .unwrap()
            .place_unit(Vector::new(1, 2), unit(JEEP, 1))
            .unwrap();
        let next = apply(
            &map,
            &ActionResponse::Move {
                from: Vector::new(1, 1),
                to: Vector::new(1, 2),
                fuel: 49,
                path: None,
                completed: false,
            },
        )
        .unwrap();
        assert!(next.unit_at(Vector::new(1, 1)).is_none());
        assert_eq!(next.unit_at(Vector::new(1, 2)).unwrap().transports.len(), 1);
    }

    #[test]
    fn test_create_unit_pays_and_marks_building() {
        let map = with_factory();
        let response = ActionResponse::CreateUnit {
            from: Vector::new(2, 2),
            to: Vector::new(2, 2),
            unit: unit(SMALL_TANK, 1),
            free: false,
        };
        let next = apply(&map, &response).unwrap();
        assert_eq!(next.player(PlayerId(1)).unwrap().funds, 50);
        assert!(next.building_at(Vector::new(2, 2)).unwrap().completed);
        assert_eq!(next.player(PlayerId(1)).unwrap().stats.created_units, 1);
        // Funds are checked before the building-used check.
        assert_eq!(
            apply(&next, &response),
            Err(GameError::InsufficientFunds {
                player: PlayerId(1),
                required: 250,
                available: 50
            })
        );
    }

    #[test]
    fn test_create_unit_free_and_restricted() {
        let map = with_factory();
        let free = ActionResponse::CreateUnit {
            from: Vector::new(2, 2),
            to: Vector::new(2, 3),
            unit: unit(SMALL_TANK, 1),
            free: true,
        };
        let next = apply(&map, &free).unwrap();
        assert_eq!(next.player(PlayerId(1)).unwrap().funds, 300);

        let mut config = map.config().clone();
        config.blocklisted_units.insert(SMALL_TANK);
        let restricted = map.with_config(config);
        assert_eq!(
            apply(&restricted, &free),
            Err(GameError::Restricted("Small Tank"))
        );
        let infantry = ActionResponse::CreateUnit {
            from: Vector::new(2, 2),
            to: Vector::new(2, 2),
            unit: unit(INFANTRY, 1),
            free: true,
        };
        assert!(matches!(apply(&map, &infantry), Err(GameError::InvalidAction(_))));
    }

    #[test]
    fn test_create_building_checks_tile_and_funds() {
        let map = base()
            .set_tile(Vector::new(3, 3), CONSTRUCTION_SITE)
            .unwrap()
            .place_unit(Vector::new(3, 3), unit(PIONEER, 1))
            .unwrap()
            .place_unit(Vector::new(1, 1), unit(PIONEER, 1))
            .unwrap();
        let house = ActionResponse::CreateBuilding {
            from: Vector::new(3, 3),
            building: HOUSE,
            free: false,
        };
        let next = apply(&map, &house).unwrap();
        assert_eq!(next.building_at(Vector::new(3, 3)).unwrap().id, HOUSE);
        assert_eq!(next.player(PlayerId(1)).unwrap().funds, 200);

        let on_plain = ActionResponse::CreateBuilding {
            from: Vector::new(1, 1),
            building: HOUSE,
            free: false,
        };
        assert!(matches!(
            apply(&map, &on_plain),
            Err(GameError::IllegalPlacement { .. })
        ));
        let lab = ActionResponse::CreateBuilding {
            from: Vector::new(3, 3),
            building: RESEARCH_LAB,
            free: false,
        };
        assert_eq!(apply(&map, &lab), Err(GameError::Unbuildable("Research Lab")));
    }

    #[test]
    fn test_create_tracks() {
        let map = base().place_unit(Vector::new(2, 2), unit(PIONEER, 1)).unwrap();
        let next = apply(&map, &ActionResponse::CreateTracks { from: Vector::new(2, 2) }).unwrap();
        assert_eq!(next.tile_at(Vector::new(2, 2)), Some(RAIL_TRACK));
        assert!(next.unit_at(Vector::new(2, 2)).unwrap().completed);
    }

    #[test]
    fn test_end_turn() {
        let mut map = base()
            .place_unit(Vector::new(1, 1), unit(INFANTRY, 1).complete())
            .unwrap();
        map.round = 3;
        let end_turn = ActionResponse::EndTurn {
            current: TurnPlayer {
                funds: 300,
                player: PlayerId(1),
            },
            next: TurnPlayer {
                funds: 150,
                player: PlayerId(2),
            },
            round: 3,
            supply: None,
            miss: false,
        };
        let next = apply(&map, &end_turn).unwrap();
        assert_eq!(next.current_player(), PlayerId(2));
        assert_eq!(next.round(), 3);
        assert_eq!(next.player(PlayerId(2)).unwrap().funds, 150);
        assert!(!next.unit_at(Vector::new(1, 1)).unwrap().completed);
        assert_eq!(
            apply(&next, &end_turn),
            Err(GameError::NotCurrentPlayer {
                expected: PlayerId(2),
                actual: PlayerId(1)
            })
        );
    }

    #[test]
    fn test_end_turn_miss_keeps_funds_and_round() {
        let map = base();
        let next = apply(
            &map,
            &ActionResponse::EndTurn {
                current: TurnPlayer {
                    funds: 999,
                    player: PlayerId(1),
                },
                next: TurnPlayer {
                    funds: 999,
                    player: PlayerId(2),
                },
                round: 1,
                supply: None,
                miss: true,
            },
        )
        .unwrap();
        assert_eq!(next.current_player(), PlayerId(2));
        assert_eq!(next.round(), 1);
        assert_eq!(next.player(PlayerId(1)).unwrap().funds, 300);
    }

    #[test]
    fn test_end_turn_follows_turn_order() {
        let map = base();
        let end_turn = |next: u8, round: u32, miss: bool| ActionResponse::EndTurn {
            current: TurnPlayer {
                funds: 300,
                player: PlayerId(1),
            },
            next: TurnPlayer {
                funds: 99_999,
                player: PlayerId(next),
            },
            round,
            supply: None,
            miss,
        };

        assert!(matches!(
            apply(&map, &end_turn(1, 1, false)),
            Err(GameError::InvalidAction(_))
        ));
        assert!(matches!(
            apply(&map, &end_turn(2, 0, false)),
            Err(GameError::InvalidAction(_))
        ));
        assert!(matches!(
            apply(&map, &end_turn(2, 2, false)),
            Err(GameError::InvalidAction(_))
        ));
        assert!(matches!(
            apply(&map, &end_turn(2, 7, true)),
            Err(GameError::InvalidAction(_))
        ));

        let handed = apply(&map, &end_turn(2, 1, false)).unwrap();
        let back = ActionResponse::EndTurn {
            current: TurnPlayer {
                funds: 99_999,
                player: PlayerId(2),
            },
            next: TurnPlayer {
                funds: 300,
                player: PlayerId(1),
            },
            round: 2,
            supply: None,
            miss: false,
        };
        let wrapped = apply(&handed, &back).unwrap();
        assert_eq!(wrapped.current_player(), PlayerId(1));
        assert_eq!(wrapped.round(), 2);
    }

    #[test]
    fn test_attack_unit_records_statistics() {
        let map = base()
            .place_unit(Vector::new(1, 1), unit(SMALL_TANK, 1))
            .unwrap()
            .place_unit(Vector::new(1, 2), unit(INFANTRY, 2))
            .unwrap();
        let next = apply(
            &map,
            &ActionResponse::AttackUnit {
                from: Vector::new(1, 1),
                to: Vector::new(1, 2),
                has_counter_attack: false,
                player_a: PlayerId(1),
                player_b: PlayerId(2),
                unit_a: Some(unit(SMALL_TANK, 1).complete()),
                unit_b: None,
                charge_a: 100,
                charge_b: 200,
            },
        )
        .unwrap();
        assert!(next.unit_at(Vector::new(1, 2)).is_none());
        let attacker = next.player(PlayerId(1)).unwrap();
        assert_eq!(attacker.stats.destroyed_units, 1);
        assert_eq!(attacker.stats.one_shots, 1);
        assert_eq!(attacker.stats.damage, 100);
        assert_eq!(attacker.charge, 100);
        assert_eq!(next.player(PlayerId(2)).unwrap().stats.lost_units, 1);
        assert_eq!(next.player(PlayerId(2)).unwrap().charge, 200);
    }

    #[test]
    fn test_attack_building_neutralizes_and_structures_collapse() {
        let map = base()
            .set_tile(Vector::new(2, 2), CONSTRUCTION_SITE)
            .unwrap()
            .place_building(Vector::new(2, 2), Building::create(HOUSE, PlayerId(2)).unwrap())
            .unwrap()
            .place_unit(Vector::new(2, 1), unit(SMALL_TANK, 1))
            .unwrap();
        let next = apply(
            &map,
            &ActionResponse::AttackBuilding {
                from: Vector::new(2, 1),
                to: Vector::new(2, 2),
                has_counter_attack: false,
                player_a: PlayerId(1),
                player_b: Some(PlayerId(2)),
                building: Some(Building::create(HOUSE, PlayerId::NEUTRAL).unwrap()),
                unit_a: Some(unit(SMALL_TANK, 1).complete()),
                unit_c: None,
                player_c: None,
                charge_a: None,
                charge_b: None,
                charge_c: None,
            },
        )
        .unwrap();
        assert!(next.building_at(Vector::new(2, 2)).unwrap().player.is_neutral());
        assert_eq!(next.player(PlayerId(1)).unwrap().stats.destroyed_buildings, 1);
        assert_eq!(next.player(PlayerId(2)).unwrap().stats.lost_buildings, 1);

        let collapse_house = ActionResponse::AttackBuilding {
            from: Vector::new(2, 1),
            to: Vector::new(2, 2),
            has_counter_attack: false,
            player_a: PlayerId(1),
            player_b: None,
            building: None,
            unit_a: Some(unit(SMALL_TANK, 1).complete()),
            unit_c: None,
            player_c: None,
            charge_a: None,
            charge_b: None,
            charge_c: None,
        };
        assert!(matches!(
            apply(&map, &collapse_house),
            Err(GameError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_hq_cannot_be_attacked() {
        let map = base()
            .place_building(Vector::new(2, 2), Building::create(HQ, PlayerId(2)).unwrap())
            .unwrap()
            .place_unit(Vector::new(2, 1), unit(SMALL_TANK, 1))
            .unwrap();
        let attack = ActionResponse::AttackBuilding {
            from: Vector::new(2, 1),
            to: Vector::new(2, 2),
            has_counter_attack: false,
            player_a: PlayerId(1),
            player_b: Some(PlayerId(2)),
            building: Some(Building::create(HQ, PlayerId(2)).unwrap().with_health(50)),
            unit_a: None,
            unit_c: None,
            player_c: None,
            charge_a: None,
            charge_b: None,
            charge_c: None,
        };
        assert!(matches!(apply(&map, &attack), Err(GameError::InvalidAction(_))));
    }

    #[test]
    fn test_capture_two_steps() {
        let map = base()
            .set_tile(Vector::new(2, 2), CONSTRUCTION_SITE)
            .unwrap()
            .place_building(Vector::new(2, 2), Building::create(HOUSE, PlayerId(2)).unwrap())
            .unwrap()
            .place_unit(Vector::new(2, 2), unit(INFANTRY, 1))
            .unwrap();
        let start = apply(
            &map,
            &ActionResponse::Capture {
                from: Vector::new(2, 2),
                building: None,
                player: None,
            },
        )
        .unwrap();
        assert!(start.unit_at(Vector::new(2, 2)).unwrap().capturing);

        let mut ready = start.clone();
        ready = ready.with_unit(
            Vector::new(2, 2),
            start.unit_at(Vector::new(2, 2)).unwrap().clone().recover(),
        );
        let done = apply(
            &ready,
            &ActionResponse::Capture {
                from: Vector::new(2, 2),
                building: Some(Building::create(HOUSE, PlayerId(1)).unwrap()),
                player: Some(PlayerId(2)),
            },
        )
        .unwrap();
        assert_eq!(done.building_at(Vector::new(2, 2)).unwrap().player, PlayerId(1));
        assert_eq!(done.player(PlayerId(1)).unwrap().stats.captured, 1);
    }

    #[test]
    fn test_fold_and_unfold() {
        let map = base().place_unit(Vector::new(1, 1), unit(SNIPER, 1)).unwrap();
        let unfolded = apply(&map, &ActionResponse::Unfold { from: Vector::new(1, 1) }).unwrap();
        assert!(unfolded.unit_at(Vector::new(1, 1)).unwrap().unfolded);
        assert!(matches!(
            apply(&map, &ActionResponse::Fold { from: Vector::new(1, 1) }),
            Err(GameError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_heal_and_sabotage() {
        let map = base()
            .place_unit(Vector::new(1, 1), unit(MEDIC, 1))
            .unwrap()
            .place_unit(Vector::new(1, 2), unit(INFANTRY, 1).with_health(30))
            .unwrap();
        let healed = apply(
            &map,
            &ActionResponse::Heal {
                from: Some(Vector::new(1, 1)),
                to: Vector::new(1, 2),
            },
        )
        .unwrap();
        assert_eq!(healed.unit_at(Vector::new(1, 2)).unwrap().health, 80);

        let sabotaged = apply(
            &map,
            &ActionResponse::Sabotage {
                from: None,
                to: Vector::new(1, 2),
            },
        )
        .unwrap();
        assert_eq!(sabotaged.unit_at(Vector::new(1, 2)).unwrap().health, 15);
    }

    #[test]
    fn test_rescue_requires_neutral_target() {
        let map = base()
            .place_unit(Vector::new(1, 1), unit(PIONEER, 1))
            .unwrap()
            .place_unit(Vector::new(1, 2), unit(INFANTRY, 0))
            .unwrap();
        let next = apply(
            &map,
            &ActionResponse::Rescue {
                from: Some(Vector::new(1, 1)),
                to: Vector::new(1, 2),
                player: PlayerId(1),
            },
        )
        .unwrap();
        assert_eq!(next.unit_at(Vector::new(1, 2)).unwrap().player, PlayerId(1));
        assert_eq!(next.player(PlayerId(1)).unwrap().stats.rescued_units, 1);
    }

    #[test]
    fn test_increase_funds_rejects_negative_result() {
        let map = base();
        let next = apply(
            &map,
            &ActionResponse::IncreaseFunds {
                player: PlayerId(1),
                funds: -200,
            },
        )
        .unwrap();
        assert_eq!(next.player(PlayerId(1)).unwrap().funds, 100);
        assert_eq!(
            apply(
                &next,
                &ActionResponse::IncreaseFunds {
                    player: PlayerId(1),
                    funds: -200
                }
            ),
            Err(GameError::InsufficientFunds {
                player: PlayerId(1),
                required: 200,
                available: 100
            })
        );
    }

    #[test]
    fn test_increase_charge_caps() {
        let next = apply(
            &base(),
            &ActionResponse::IncreaseCharge {
                player: PlayerId(1),
                charges: 50,
            },
        )
        .unwrap();
        assert_eq!(next.player(PlayerId(1)).unwrap().charge, MAX_CHARGE);
        assert!(apply(
            &base(),
            &ActionResponse::IncreaseCharge {
                player: PlayerId(1),
                charges: -1
            }
        )
        .is_err());
    }

    #[test]
    fn test_swap_keeps_fuel() {
        let mut tank = unit(SMALL_TANK, 1);
        tank.fuel = 12;
        let map = base()
            .place_unit(Vector::new(1, 1), tank.clone())
            .unwrap()
            .place_unit(Vector::new(1, 2), unit(INFANTRY, 1))
            .unwrap();
        let next = apply(
            &map,
            &ActionResponse::Swap {
                source: Vector::new(1, 1),
                source_unit: unit(SMALL_TANK, 1),
                target: Vector::new(1, 2),
                target_unit: Some(unit(INFANTRY, 1)),
            },
        )
        .unwrap();
        assert_eq!(next.unit_at(Vector::new(1, 2)).unwrap().fuel, 12);
        assert_eq!(next.unit_at(Vector::new(1, 1)).unwrap().id, INFANTRY);
    }

    #[test]
    fn test_swap_requires_adjacent_unmoved_own_units() {
        let map = base()
            .place_unit(Vector::new(1, 1), unit(INFANTRY, 1))
            .unwrap()
            .place_unit(Vector::new(1, 2), unit(INFANTRY, 2))
            .unwrap()
            .place_unit(Vector::new(2, 1), unit(INFANTRY, 1))
            .unwrap()
            .place_unit(Vector::new(6, 6), unit(INFANTRY, 2))
            .unwrap();
        let swap = |target: Vector, player: u8| ActionResponse::Swap {
            source: Vector::new(1, 1),
            source_unit: unit(INFANTRY, 1),
            target,
            target_unit: Some(unit(INFANTRY, player)),
        };

        assert!(matches!(
            apply(&map, &swap(Vector::new(6, 6), 2)),
            Err(GameError::InvalidAction(_))
        ));
        assert_eq!(
            apply(&map, &swap(Vector::new(1, 2), 2)),
            Err(GameError::NotOwner {
                position: Vector::new(1, 2),
                player: PlayerId(1)
            })
        );

        let mut moved = unit(INFANTRY, 1);
        moved.moved = true;
        let after_move = map.with_unit(Vector::new(2, 1), moved);
        assert_eq!(
            apply(&after_move, &swap(Vector::new(2, 1), 1)),
            Err(GameError::AlreadyMoved(Vector::new(2, 1)))
        );
        assert!(apply(&map, &swap(Vector::new(2, 1), 1)).is_ok());
    }

    #[test]
    fn test_player_lost() {
        let map = base()
            .place_unit(Vector::new(1, 1), unit(INFANTRY, 2))
            .unwrap()
            .place_building(Vector::new(6, 6), Building::create(HQ, PlayerId(2)).unwrap())
            .unwrap();
        let next = apply(&map, &ActionResponse::PlayerLost { player: PlayerId(2) }).unwrap();
        assert_eq!(next.active(), &[PlayerId(1)]);
        assert!(next.unit_at(Vector::new(1, 1)).is_none());
        assert!(next.building_at(Vector::new(6, 6)).unwrap().player.is_neutral());
        assert!(apply(&next, &ActionResponse::PlayerLost { player: PlayerId(1) }).is_err());
    }

    #[test]
    fn test_buy_skill_and_activate_power() {
        let map = base()
            .set_tile(Vector::new(2, 2), CONSTRUCTION_SITE)
            .unwrap()
            .place_building(Vector::new(2, 2), Building::create(RESEARCH_LAB, PlayerId(1)).unwrap())
            .unwrap();
        let bought = apply(
            &map,
            &ActionResponse::BuySkill {
                from: Vector::new(2, 2),
                player: PlayerId(1),
                skill: Skill::AttackIncrease,
            },
        )
        .unwrap();
        assert_eq!(bought.player(PlayerId(1)).unwrap().funds, 0);
        assert!(bought.player(PlayerId(1)).unwrap().skills.contains(&Skill::AttackIncrease));

        let power = ActionResponse::ActivatePower {
            skill: Skill::AttackIncrease,
            free: false,
            from: None,
            units: None,
        };
        assert!(matches!(
            apply(&bought, &power),
            Err(GameError::InsufficientCharge { .. })
        ));
        let charged = bought.modify_player(PlayerId(1), |p| p.charge = 300).unwrap();
        let active = apply(&charged, &power).unwrap();
        let player = active.player(PlayerId(1)).unwrap();
        assert_eq!(player.charge, 0);
        assert!(player.active_skills.contains(&Skill::AttackIncrease));
    }

    #[test]
    fn test_optional_objective_and_secret() {
        let mut config = base().config().clone();
        config.objectives.insert(
            1,
            Objective::new(ObjectiveKind::CaptureAmount { amount: 1 })
                .optional(None)
                .hidden(),
        );
        let map = base().with_config(config);
        let discovered = apply(
            &map,
            &ActionResponse::SecretDiscovered {
                objective_id: 1,
                to_player: Some(PlayerId(1)),
            },
        )
        .unwrap();
        assert!(!discovered.config().objectives[&1].hidden);
        let done = ActionResponse::OptionalObjective {
            objective_id: 1,
            to_player: PlayerId(1),
        };
        let completed = apply(&discovered, &done).unwrap();
        assert!(completed.config().objectives[&1].completed.contains(&PlayerId(1)));
        assert!(apply(&completed, &done).is_err());
    }

    #[test]
    fn test_apply_all_is_atomic() {
        let map = with_factory();
        let responses = vec![
            ActionResponse::CreateUnit {
                from: Vector::new(2, 2),
                to: Vector::new(2, 2),
                unit: unit(SMALL_TANK, 1),
                free: false,
            },
            ActionResponse::CompleteUnit {
                from: Vector::new(5, 5),
            },
        ];
        assert_eq!(
            apply_all(&map, &responses),
            Err(GameError::NoUnit(Vector::new(5, 5)))
        );
    }
}
