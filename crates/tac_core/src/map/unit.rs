//! Unit instances.

use serde::{Deserialize, Serialize};

use super::player::PlayerId;
use crate::error::{GameError, Result};
use crate::registry::unit::{unit_info, unit_info_or_panic};
use crate::registry::{UnitId, UnitInfo};

/// Health of an undamaged entity.
pub const MAX_HEALTH: u8 = 100;

/// A unit on the map.
///
/// Units are plain values: every change produces a new `Unit` that replaces
/// the old one inside a new `MapState`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    /// Registry id.
    pub id: UnitId,
    /// Owner.
    pub player: PlayerId,
    /// Health, `1..=100`.
    pub health: u8,
    /// Remaining fuel.
    pub fuel: u32,
    /// Remaining ammo, `None` for weapons without ammo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ammo: Option<u8>,
    /// Moved this turn.
    #[serde(default)]
    pub moved: bool,
    /// Done for this turn.
    #[serde(default)]
    pub completed: bool,
    /// Started capturing the building it stands on.
    #[serde(default)]
    pub capturing: bool,
    /// Deployed and ready to fire.
    #[serde(default)]
    pub unfolded: bool,
    /// Carried units, in loading order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<Unit>,
    /// Map author label referenced by objectives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<u8>,
}

impl Unit {
    /// Create a fresh unit of a registered type with full health, fuel and ammo.
    pub fn create(id: UnitId, player: PlayerId) -> Result<Self> {
        let info = unit_info(id).ok_or(GameError::UnknownUnit(id.0))?;
        Ok(Self::from_info(info, player))
    }

    /// Create a fresh unit from a registry entry.
    #[must_use]
    pub fn from_info(info: &UnitInfo, player: PlayerId) -> Self {
        Self {
            id: info.id,
            player,
            health: MAX_HEALTH,
            fuel: info.fuel,
            ammo: info.ammo,
            moved: false,
            completed: false,
            capturing: false,
            unfolded: false,
            transports: Vec::new(),
            label: None,
        }
    }

    /// Registry entry. The id was validated when the unit entered the map.
    #[must_use]
    pub fn info(&self) -> &'static UnitInfo {
        unit_info_or_panic(self.id)
    }

    /// Set the label.
    #[must_use]
    pub fn with_label(mut self, label: Option<u8>) -> Self {
        self.label = label;
        self
    }

    /// Change the owner, including carried units.
    #[must_use]
    pub fn with_player(mut self, player: PlayerId) -> Self {
        self.player = player;
        self.transports = self
            .transports
            .into_iter()
            .map(|unit| unit.with_player(player))
            .collect();
        self
    }

    /// Set health, clamped to `0..=100`.
    #[must_use]
    pub fn with_health(mut self, health: i32) -> Self {
        self.health = health.clamp(0, i32::from(MAX_HEALTH)) as u8;
        self
    }

    /// Mark the unit as done for the turn.
    #[must_use]
    pub fn complete(mut self) -> Self {
        self.completed = true;
        self
    }

    /// Reset per-turn flags.
    #[must_use]
    pub fn recover(mut self) -> Self {
        self.moved = false;
        self.completed = false;
        self
    }

    /// Refill fuel and ammo to the registry maximum.
    #[must_use]
    pub fn refill(mut self) -> Self {
        let info = self.info();
        self.fuel = info.fuel;
        self.ammo = info.ammo;
        self
    }

    /// Whether the unit can still carry the other unit.
    #[must_use]
    pub fn can_load(&self, other: &Unit) -> bool {
        let info = self.info();
        info.can_transport(other.info())
            && info
                .transport
                .as_ref()
                .is_some_and(|transport| self.transports.len() < transport.limit as usize)
    }

    /// Add a carried unit.
    #[must_use]
    pub fn load(mut self, other: Unit) -> Self {
        self.transports.push(other);
        self
    }

    /// Whether the unit's health is below the maximum.
    #[must_use]
    pub const fn is_damaged(&self) -> bool {
        self.health < MAX_HEALTH
    }
}
