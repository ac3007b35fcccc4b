//! The battlefield snapshot.
//!
//! [`MapState`] is an immutable value. Every mutator borrows the current
//! state and returns a new one; the layers are `Arc`-shared and only copied
//! when a mutator actually changes them, so old snapshots stay valid and
//! cheap to keep around for undo and replay.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::building::Building;
use super::config::Configuration;
use super::player::{Player, PlayerId, PlayerStatistics};
use super::unit::Unit;
use crate::error::{GameError, Result};
use crate::registry::building::building_info;
use crate::registry::tile::{tile_info, tile_info_or_panic};
use crate::registry::unit::unit_info;
use crate::registry::{TileId, TileInfo};
use crate::vector::{vector_map, SizeVector, Vector};

/// Smallest allowed edge length.
pub const MIN_SIZE: i32 = 1;
/// Largest allowed edge length.
pub const MAX_SIZE: i32 = 50;

/// Placement layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Units.
    Unit,
    /// Buildings.
    Building,
}

/// Complete snapshot of one battlefield.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapState {
    pub(crate) size: SizeVector,
    pub(crate) tiles: Arc<Vec<TileId>>,
    #[serde(with = "vector_map")]
    pub(crate) buildings: Arc<BTreeMap<Vector, Building>>,
    #[serde(with = "vector_map")]
    pub(crate) units: Arc<BTreeMap<Vector, Unit>>,
    pub(crate) players: Vec<Player>,
    pub(crate) active: Vec<PlayerId>,
    pub(crate) current_player: PlayerId,
    pub(crate) round: u32,
    #[serde(default)]
    pub(crate) config: Configuration,
}

impl MapState {
    /// Create a map filled with one tile type.
    ///
    /// Players are sorted by id and all become active; the first player
    /// starts in round 1.
    pub fn new(size: SizeVector, fill: TileId, mut players: Vec<Player>) -> Result<Self> {
        check_size(size)?;
        tile_info(fill).ok_or(GameError::UnknownTile(fill.0))?;
        players.sort_by_key(|player| player.id);
        if players.is_empty() {
            return Err(GameError::InvalidState("a map needs at least one player".into()));
        }
        if players.iter().any(|player| player.id.is_neutral()) {
            return Err(GameError::InvalidState("the neutral player cannot be listed".into()));
        }
        if players.windows(2).any(|w| w[0].id == w[1].id) {
            return Err(GameError::InvalidState("duplicate player ids".into()));
        }
        let active: Vec<PlayerId> = players.iter().map(|player| player.id).collect();
        Ok(Self {
            size,
            tiles: Arc::new(vec![fill; size.area()]),
            buildings: Arc::default(),
            units: Arc::default(),
            current_player: active[0],
            active,
            players,
            round: 1,
            config: Configuration::default(),
        })
    }

    /// Parse a snapshot and check its invariants.
    pub fn from_json(json: &str) -> Result<Self> {
        let map: Self = serde_json::from_str(json)?;
        map.validate()?;
        Ok(map)
    }

    /// Serialize the snapshot.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Hash of the complete snapshot.
    ///
    /// Identical states produce identical hashes within one build, which is
    /// what replay verification and lockstep peers compare.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    // ------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------

    /// Map dimensions.
    #[must_use]
    pub const fn size(&self) -> SizeVector {
        self.size
    }

    /// Whether the position is on the map.
    #[must_use]
    pub const fn contains(&self, position: Vector) -> bool {
        self.size.contains(position)
    }

    /// Tile id at a position.
    #[must_use]
    pub fn tile_at(&self, position: Vector) -> Option<TileId> {
        self.size.index(position).map(|index| self.tiles[index])
    }

    /// Tile entry at a position.
    #[must_use]
    pub fn tile_info_at(&self, position: Vector) -> Option<&'static TileInfo> {
        self.tile_at(position).map(tile_info_or_panic)
    }

    /// Unit at a position.
    #[must_use]
    pub fn unit_at(&self, position: Vector) -> Option<&Unit> {
        self.units.get(&position)
    }

    /// Building at a position.
    #[must_use]
    pub fn building_at(&self, position: Vector) -> Option<&Building> {
        self.buildings.get(&position)
    }

    /// All units in position order.
    pub fn units(&self) -> impl Iterator<Item = (Vector, &Unit)> {
        self.units.iter().map(|(position, unit)| (*position, unit))
    }

    /// All buildings in position order.
    pub fn buildings(&self) -> impl Iterator<Item = (Vector, &Building)> {
        self.buildings
            .iter()
            .map(|(position, building)| (*position, building))
    }

    /// Units owned by a player.
    pub fn units_of(&self, player: PlayerId) -> impl Iterator<Item = (Vector, &Unit)> {
        self.units().filter(move |(_, unit)| unit.player == player)
    }

    /// Buildings owned by a player.
    pub fn buildings_of(&self, player: PlayerId) -> impl Iterator<Item = (Vector, &Building)> {
        self.buildings()
            .filter(move |(_, building)| building.player == player)
    }

    /// All players, sorted by id.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Look up a player.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players
            .binary_search_by_key(&id, |player| player.id)
            .ok()
            .map(|index| &self.players[index])
    }

    /// Look up a player, failing with [`GameError::UnknownPlayer`].
    pub fn player_or_err(&self, id: PlayerId) -> Result<&Player> {
        self.player(id).ok_or(GameError::UnknownPlayer(id))
    }

    /// Players still in the game, in turn order.
    #[must_use]
    pub fn active(&self) -> &[PlayerId] {
        &self.active
    }

    /// Whose turn it is.
    #[must_use]
    pub const fn current_player(&self) -> PlayerId {
        self.current_player
    }

    /// Round counter, starting at 1.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Game configuration.
    #[must_use]
    pub const fn config(&self) -> &Configuration {
        &self.config
    }

    /// Team of a player.
    #[must_use]
    pub fn team_of(&self, player: PlayerId) -> Option<u8> {
        self.player(player).map(|player| player.team)
    }

    /// Players grouped by team.
    #[must_use]
    pub fn teams(&self) -> BTreeMap<u8, Vec<PlayerId>> {
        let mut teams: BTreeMap<u8, Vec<PlayerId>> = BTreeMap::new();
        for player in &self.players {
            teams.entry(player.team).or_default().push(player.id);
        }
        teams
    }

    /// Aggregated statistics of a team.
    #[must_use]
    pub fn team_statistics(&self, team: u8) -> PlayerStatistics {
        self.players
            .iter()
            .filter(|player| player.team == team)
            .fold(PlayerStatistics::default(), |total, player| {
                total.merge(player.stats)
            })
    }

    /// Whether two players fight each other. Neutral is nobody's opponent.
    #[must_use]
    pub fn is_opponent(&self, a: PlayerId, b: PlayerId) -> bool {
        if a == b || a.is_neutral() || b.is_neutral() {
            return false;
        }
        self.team_of(a) != self.team_of(b)
    }

    /// Whether two players are on the same team.
    #[must_use]
    pub fn is_teammate(&self, a: PlayerId, b: PlayerId) -> bool {
        !a.is_neutral() && !b.is_neutral() && self.team_of(a) == self.team_of(b)
    }

    /// The active player after the current one and whether the turn order
    /// wrapped around, starting a new round.
    #[must_use]
    pub fn next_player(&self) -> Option<(PlayerId, bool)> {
        let first = *self.active.first()?;
        let next = self
            .active
            .iter()
            .copied()
            .find(|player| *player > self.current_player);
        Some(next.map_or((first, true), |player| (player, false)))
    }

    // ------------------------------------------------------------------
    // Mutation primitives. Each returns a new state.
    // ------------------------------------------------------------------

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(&self, config: Configuration) -> Self {
        let mut next = self.clone();
        next.config = config;
        next
    }

    /// Change the tile at a position. A unit standing there must still be
    /// able to stand on the new tile.
    pub fn set_tile(&self, position: Vector, tile: TileId) -> Result<Self> {
        let index = self
            .size
            .index(position)
            .ok_or(GameError::OutOfBounds(position))?;
        let info = tile_info(tile).ok_or(GameError::UnknownTile(tile.0))?;
        if let Some(unit) = self.unit_at(position) {
            let unit_info = unit.info();
            if !info.is_passable(unit_info.movement_type) {
                return Err(GameError::IllegalPlacement {
                    entity: unit_info.name,
                    tile: info.name,
                    position,
                });
            }
        }
        let mut next = self.clone();
        Arc::make_mut(&mut next.tiles)[index] = tile;
        Ok(next)
    }

    /// Place a unit on a free field.
    pub fn place_unit(&self, position: Vector, unit: Unit) -> Result<Self> {
        self.check_unit_placement(position, &unit)?;
        if self.units.contains_key(&position) {
            return Err(GameError::UnitOccupied(position));
        }
        let mut next = self.clone();
        Arc::make_mut(&mut next.units).insert(position, unit);
        Ok(next)
    }

    /// Place a building on a field without a building.
    pub fn place_building(&self, position: Vector, building: Building) -> Result<Self> {
        if !self.contains(position) {
            return Err(GameError::OutOfBounds(position));
        }
        let info = building_info(building.id).ok_or(GameError::UnknownBuilding(building.id.0))?;
        self.check_owner(building.player)?;
        if self.buildings.contains_key(&position) {
            return Err(GameError::BuildingOccupied(position));
        }
        let tile = self.tile_info_at(position).ok_or(GameError::OutOfBounds(position))?;
        if !info.can_be_placed_on(tile.id) {
            return Err(GameError::IllegalPlacement {
                entity: info.name,
                tile: tile.name,
                position,
            });
        }
        if let Some(unit) = self.unit_at(position) {
            if !info.is_accessible_by(unit.info()) {
                return Err(GameError::IllegalPlacement {
                    entity: info.name,
                    tile: tile.name,
                    position,
                });
            }
        }
        let mut next = self.clone();
        Arc::make_mut(&mut next.buildings).insert(position, building);
        Ok(next)
    }

    /// Remove the entity of a layer at a position.
    pub fn remove(&self, position: Vector, layer: Layer) -> Result<Self> {
        let mut next = self.clone();
        match layer {
            Layer::Unit => {
                if !self.units.contains_key(&position) {
                    return Err(GameError::NoUnit(position));
                }
                Arc::make_mut(&mut next.units).remove(&position);
            }
            Layer::Building => {
                if !self.buildings.contains_key(&position) {
                    return Err(GameError::NoBuilding(position));
                }
                Arc::make_mut(&mut next.buildings).remove(&position);
            }
        }
        Ok(next)
    }

    /// Move the entity of a layer to another position, re-checking placement.
    pub fn move_entity(&self, from: Vector, to: Vector, layer: Layer) -> Result<Self> {
        if from == to {
            return Ok(self.clone());
        }
        match layer {
            Layer::Unit => {
                let unit = self.unit_at(from).ok_or(GameError::NoUnit(from))?.clone();
                self.remove(from, Layer::Unit)?.place_unit(to, unit)
            }
            Layer::Building => {
                let building = self
                    .building_at(from)
                    .ok_or(GameError::NoBuilding(from))?
                    .clone();
                self.remove(from, Layer::Building)?
                    .place_building(to, building)
            }
        }
    }

    /// Put a unit into the carrier at a position.
    pub fn load_unit(&self, carrier: Vector, unit: Unit) -> Result<Self> {
        let transporter = self.unit_at(carrier).ok_or(GameError::NoUnit(carrier))?;
        if transporter.player != unit.player || !transporter.can_load(&unit) {
            return Err(GameError::CannotTransport(carrier));
        }
        let loaded = transporter.clone().load(unit);
        Ok(self.with_unit(carrier, loaded))
    }

    /// Replace a player record with the same id.
    pub fn update_player(&self, player: Player) -> Result<Self> {
        let index = self
            .players
            .binary_search_by_key(&player.id, |existing| existing.id)
            .map_err(|_| GameError::UnknownPlayer(player.id))?;
        let mut next = self.clone();
        next.players[index] = player;
        Ok(next)
    }

    /// Apply a change to a player record.
    pub fn modify_player(&self, id: PlayerId, f: impl FnOnce(&mut Player)) -> Result<Self> {
        let mut player = self.player_or_err(id)?.clone();
        f(&mut player);
        self.update_player(player)
    }

    /// Add a player that joins mid-game. Existing ids are left untouched.
    pub fn add_player(&self, player: Player) -> Result<Self> {
        if player.id.is_neutral() {
            return Err(GameError::InvalidState("the neutral player cannot join".into()));
        }
        if self.player(player.id).is_some() {
            return Ok(self.clone());
        }
        let mut next = self.clone();
        next.active.push(player.id);
        next.active.sort();
        next.players.push(player);
        next.players.sort_by_key(|player| player.id);
        Ok(next)
    }

    // ------------------------------------------------------------------
    // Crate-internal writers used by response application. They assume the
    // caller already validated positions and ownership.
    // ------------------------------------------------------------------

    pub(crate) fn with_unit(&self, position: Vector, unit: Unit) -> Self {
        let mut next = self.clone();
        Arc::make_mut(&mut next.units).insert(position, unit);
        next
    }

    pub(crate) fn with_building(&self, position: Vector, building: Building) -> Self {
        let mut next = self.clone();
        Arc::make_mut(&mut next.buildings).insert(position, building);
        next
    }

    pub(crate) fn without_unit(&self, position: Vector) -> Self {
        let mut next = self.clone();
        Arc::make_mut(&mut next.units).remove(&position);
        next
    }

    pub(crate) fn without_building(&self, position: Vector) -> Self {
        let mut next = self.clone();
        Arc::make_mut(&mut next.buildings).remove(&position);
        next
    }

    pub(crate) fn map_units(&self, mut f: impl FnMut(Vector, &Unit) -> Option<Unit>) -> Self {
        let mut next = self.clone();
        let units = Arc::make_mut(&mut next.units);
        for (position, unit) in units.iter_mut() {
            if let Some(updated) = f(*position, unit) {
                *unit = updated;
            }
        }
        next
    }

    pub(crate) fn map_buildings(
        &self,
        mut f: impl FnMut(Vector, &Building) -> Option<Building>,
    ) -> Self {
        let mut next = self.clone();
        let buildings = Arc::make_mut(&mut next.buildings);
        for (position, building) in buildings.iter_mut() {
            if let Some(updated) = f(*position, building) {
                *building = updated;
            }
        }
        next
    }

    // ------------------------------------------------------------------
    // Invariants
    // ------------------------------------------------------------------

    fn check_owner(&self, player: PlayerId) -> Result<()> {
        if player.is_neutral() || self.player(player).is_some() {
            Ok(())
        } else {
            Err(GameError::UnknownPlayer(player))
        }
    }

    fn check_unit_placement(&self, position: Vector, unit: &Unit) -> Result<()> {
        let tile = self
            .tile_info_at(position)
            .ok_or(GameError::OutOfBounds(position))?;
        let info = unit_info(unit.id).ok_or(GameError::UnknownUnit(unit.id.0))?;
        self.check_owner(unit.player)?;
        if !tile.is_passable(info.movement_type) {
            return Err(GameError::IllegalPlacement {
                entity: info.name,
                tile: tile.name,
                position,
            });
        }
        if let Some(building) = self.building_at(position) {
            if !building.info().is_accessible_by(info) {
                return Err(GameError::IllegalPlacement {
                    entity: info.name,
                    tile: building.info().name,
                    position,
                });
            }
        }
        let limit = info
            .transport
            .as_ref()
            .map_or(0, |transport| transport.limit as usize);
        if unit.transports.len() > limit {
            return Err(GameError::CannotTransport(position));
        }
        for cargo in &unit.transports {
            let cargo_info = unit_info(cargo.id).ok_or(GameError::UnknownUnit(cargo.id.0))?;
            if !info.can_transport(cargo_info) {
                return Err(GameError::CannotTransport(position));
            }
        }
        Ok(())
    }

    /// Check every structural invariant of the snapshot.
    pub fn validate(&self) -> Result<()> {
        check_size(self.size)?;
        if self.tiles.len() != self.size.area() {
            return Err(GameError::InvalidState(format!(
                "expected {} tiles, found {}",
                self.size.area(),
                self.tiles.len()
            )));
        }
        if let Some(tile) = self.tiles.iter().find(|tile| tile_info(**tile).is_none()) {
            return Err(GameError::UnknownTile(tile.0));
        }
        if self.players.is_empty() {
            return Err(GameError::InvalidState("a map needs at least one player".into()));
        }
        if self.players.windows(2).any(|w| w[0].id >= w[1].id)
            || self.players.iter().any(|player| player.id.is_neutral())
        {
            return Err(GameError::InvalidState(
                "players must be sorted, unique and not neutral".into(),
            ));
        }
        if self.active.is_empty() {
            return Err(GameError::InvalidState("no active players".into()));
        }
        if let Some(missing) = self.active.iter().find(|id| self.player(**id).is_none()) {
            return Err(GameError::UnknownPlayer(*missing));
        }
        self.player_or_err(self.current_player)?;
        for (position, building) in self.buildings() {
            let info =
                building_info(building.id).ok_or(GameError::UnknownBuilding(building.id.0))?;
            if !self.contains(position) {
                return Err(GameError::OutOfBounds(position));
            }
            self.check_owner(building.player)?;
            let tile = self.tile_info_at(position).ok_or(GameError::OutOfBounds(position))?;
            if !info.can_be_placed_on(tile.id) {
                return Err(GameError::IllegalPlacement {
                    entity: info.name,
                    tile: tile.name,
                    position,
                });
            }
        }
        for (position, unit) in self.units() {
            self.check_unit_placement(position, unit)?;
        }
        Ok(())
    }
}

pub(crate) fn check_size(size: SizeVector) -> Result<()> {
    let valid = |edge: i32| (MIN_SIZE..=MAX_SIZE).contains(&edge);
    if valid(size.width) && valid(size.height) {
        Ok(())
    } else {
        Err(GameError::InvalidSize {
            width: size.width,
            height: size.height,
        })
    }
}
