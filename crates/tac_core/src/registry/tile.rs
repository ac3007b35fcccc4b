//! Tile catalog.

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::{display_order, MovementType};

/// Stable tile identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub u16);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Movement cost per [`MovementType`]; `None` means impassable.
type Costs = [Option<u8>; MovementType::COUNT];

const fn costs(
    soldier: u8,
    tires: u8,
    tread: u8,
    rail: u8,
    air: u8,
    ship: u8,
    amphibious: u8,
) -> Costs {
    const fn c(value: u8) -> Option<u8> {
        if value == 0 {
            None
        } else {
            Some(value)
        }
    }
    [
        c(soldier),
        c(tires),
        c(tread),
        c(rail),
        c(air),
        c(ship),
        c(amphibious),
    ]
}

/// Configuration of a tile type.
#[derive(Debug)]
pub struct TileInfo {
    /// Stable identifier.
    pub id: TileId,
    /// Display name.
    pub name: &'static str,
    /// Display sort key.
    pub sort: u8,
    /// Defense bonus in percent for units standing on the tile.
    pub cover: u8,
    /// Movement cost table.
    costs: Costs,
    /// Hides units from viewers that are not adjacent.
    pub conceals: bool,
    /// Water tile.
    pub sea: bool,
}

impl TileInfo {
    const fn new(id: u16, name: &'static str, sort: u8, cover: u8, costs: Costs) -> Self {
        Self {
            id: TileId(id),
            name,
            sort,
            cover,
            costs,
            conceals: false,
            sea: false,
        }
    }

    const fn concealing(mut self) -> Self {
        self.conceals = true;
        self
    }

    const fn water(mut self) -> Self {
        self.sea = true;
        self
    }

    /// Movement cost for a movement type, `None` if impassable.
    #[must_use]
    pub const fn cost(&self, movement: MovementType) -> Option<u8> {
        self.costs[movement.index()]
    }

    /// Whether a unit with the movement type may stand on the tile.
    #[must_use]
    pub const fn is_passable(&self, movement: MovementType) -> bool {
        self.cost(movement).is_some()
    }

    /// The tile that rail tracks turn this tile into, if tracks can be laid.
    #[must_use]
    pub fn tracks(&self) -> Option<TileId> {
        match self.id {
            PLAIN | STREET | PATH | CONSTRUCTION_SITE => Some(RAIL_TRACK),
            BRIDGE => Some(RAIL_BRIDGE),
            _ => None,
        }
    }
}

/// Open field.
pub const PLAIN: TileId = TileId(1);
/// Woods, concealing.
pub const FOREST: TileId = TileId(2);
/// High ground.
pub const MOUNTAIN: TileId = TileId(3);
/// Paved road.
pub const STREET: TileId = TileId(4);
/// Dirt road.
pub const PATH: TileId = TileId(5);
/// River.
pub const RIVER: TileId = TileId(6);
/// Shallow sea.
pub const SEA: TileId = TileId(7);
/// Deep sea.
pub const DEEP_SEA: TileId = TileId(8);
/// Beach.
pub const BEACH: TileId = TileId(9);
/// Bridge.
pub const BRIDGE: TileId = TileId(10);
/// Pier.
pub const PIER: TileId = TileId(11);
/// Airfield, hosts airbases.
pub const AIRFIELD: TileId = TileId(12);
/// Campsite, hosts shelters.
pub const CAMPSITE: TileId = TileId(13);
/// Construction site, hosts most buildings.
pub const CONSTRUCTION_SITE: TileId = TileId(14);
/// Shipyard construction site.
pub const SHIPYARD_CONSTRUCTION_SITE: TileId = TileId(15);
/// Rail track.
pub const RAIL_TRACK: TileId = TileId(16);
/// Rail bridge.
pub const RAIL_BRIDGE: TileId = TileId(17);
/// Reef, concealing.
pub const REEF: TileId = TileId(18);

// The order of tiles must not be changed.
static TILES: [TileInfo; 18] = [
    TileInfo::new(1, "Plain", 1, 10, costs(1, 2, 1, 0, 1, 0, 1)),
    TileInfo::new(2, "Forest", 2, 25, costs(1, 3, 2, 0, 1, 0, 2)).concealing(),
    TileInfo::new(3, "Mountain", 3, 40, costs(2, 0, 0, 0, 1, 0, 0)),
    TileInfo::new(4, "Street", 1, 0, costs(1, 1, 1, 0, 1, 0, 1)),
    TileInfo::new(5, "Path", 1, 0, costs(1, 1, 1, 0, 1, 0, 1)),
    TileInfo::new(6, "River", 4, 0, costs(2, 0, 0, 0, 1, 0, 1)),
    TileInfo::new(7, "Sea", 5, 0, costs(0, 0, 0, 0, 1, 1, 1)).water(),
    TileInfo::new(8, "Deep Sea", 5, 0, costs(0, 0, 0, 0, 1, 1, 0)).water(),
    TileInfo::new(9, "Beach", 4, 0, costs(1, 2, 1, 0, 1, 1, 1)),
    TileInfo::new(10, "Bridge", 4, 0, costs(1, 1, 1, 0, 1, 0, 1)),
    TileInfo::new(11, "Pier", 4, 0, costs(1, 1, 1, 0, 1, 1, 1)),
    TileInfo::new(12, "Airfield", 6, 0, costs(1, 1, 1, 0, 1, 0, 1)),
    TileInfo::new(13, "Campsite", 6, 10, costs(1, 2, 1, 0, 1, 0, 1)),
    TileInfo::new(14, "Construction Site", 6, 0, costs(1, 1, 1, 0, 1, 0, 1)),
    TileInfo::new(15, "Shipyard Construction Site", 6, 0, costs(0, 0, 0, 0, 1, 1, 1)).water(),
    TileInfo::new(16, "Rail Track", 7, 0, costs(1, 1, 1, 1, 1, 0, 1)),
    TileInfo::new(17, "Rail Bridge", 7, 0, costs(1, 1, 1, 1, 1, 0, 1)),
    TileInfo::new(18, "Reef", 5, 15, costs(0, 0, 0, 0, 1, 2, 2))
        .concealing()
        .water(),
];

/// Look up a tile, `None` for unknown ids.
#[must_use]
pub fn tile_info(id: TileId) -> Option<&'static TileInfo> {
    (id.0 as usize)
        .checked_sub(1)
        .and_then(|index| TILES.get(index))
}

/// Look up a tile that is known to exist.
///
/// # Panics
///
/// Panics if the id is not registered.
#[must_use]
pub fn tile_info_or_panic(id: TileId) -> &'static TileInfo {
    tile_info(id).unwrap_or_else(|| panic!("tile_info_or_panic: Could not find tile with id '{id}'."))
}

/// All tiles in display order.
#[must_use]
pub fn all_tiles() -> &'static [&'static TileInfo] {
    static ORDER: OnceLock<Vec<&'static TileInfo>> = OnceLock::new();
    ORDER.get_or_init(|| display_order(&TILES, |tile| (tile.sort, tile.id.0)))
}

/// Tiles matching a predicate, in display order.
pub fn filter_tiles(predicate: impl Fn(&TileInfo) -> bool) -> Vec<&'static TileInfo> {
    all_tiles().iter().copied().filter(|tile| predicate(tile)).collect()
}

/// Map over all tiles in display order.
pub fn map_tiles<T>(f: impl FnMut(&'static TileInfo) -> T) -> Vec<T> {
    all_tiles().iter().copied().map(f).collect()
}
