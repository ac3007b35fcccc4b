//! Building instances.

use serde::{Deserialize, Serialize};

use super::player::PlayerId;
use super::unit::MAX_HEALTH;
use crate::error::{GameError, Result};
use crate::registry::building::{building_info, building_info_or_panic};
use crate::registry::{BuildingId, BuildingInfo};

/// A building on the map.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Building {
    /// Registry id.
    pub id: BuildingId,
    /// Owner, neutral for unclaimed buildings.
    pub player: PlayerId,
    /// Health, `0..=100`.
    pub health: u8,
    /// Already produced or sold this turn.
    #[serde(default)]
    pub completed: bool,
    /// Map author label referenced by objectives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<u8>,
}

impl Building {
    /// Create a building of a registered type at full health.
    pub fn create(id: BuildingId, player: PlayerId) -> Result<Self> {
        let info = building_info(id).ok_or(GameError::UnknownBuilding(id.0))?;
        Ok(Self::from_info(info, player))
    }

    /// Create a building from a registry entry.
    #[must_use]
    pub fn from_info(info: &BuildingInfo, player: PlayerId) -> Self {
        Self {
            id: info.id,
            player,
            health: MAX_HEALTH,
            completed: false,
            label: None,
        }
    }

    /// Registry entry. The id was validated when the building entered the map.
    #[must_use]
    pub fn info(&self) -> &'static BuildingInfo {
        building_info_or_panic(self.id)
    }

    /// Change the owner.
    #[must_use]
    pub fn with_player(mut self, player: PlayerId) -> Self {
        self.player = player;
        self
    }

    /// Set health, clamped to `0..=100`.
    #[must_use]
    pub fn with_health(mut self, health: i32) -> Self {
        self.health = health.clamp(0, i32::from(MAX_HEALTH)) as u8;
        self
    }

    /// Set the label.
    #[must_use]
    pub fn with_label(mut self, label: Option<u8>) -> Self {
        self.label = label;
        self
    }

    /// Mark the building as used for the turn.
    #[must_use]
    pub fn complete(mut self) -> Self {
        self.completed = true;
        self
    }

    /// Reset the per-turn flag.
    #[must_use]
    pub fn recover(mut self) -> Self {
        self.completed = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::building::{FACTORY, HQ};

    #[test]
    fn test_create() {
        let hq = Building::create(HQ, PlayerId(1)).unwrap();
        assert_eq!(hq.health, MAX_HEALTH);
        assert!(hq.info().is_hq());
        assert_eq!(
            Building::create(BuildingId(77), PlayerId(1)),
            Err(GameError::UnknownBuilding(77))
        );
    }

    #[test]
    fn test_neutral_conversion() {
        let factory = Building::create(FACTORY, PlayerId(2))
            .unwrap()
            .with_health(10)
            .with_player(PlayerId::NEUTRAL)
            .with_health(100);
        assert!(factory.player.is_neutral());
        assert_eq!(factory.health, 100);
    }
}
