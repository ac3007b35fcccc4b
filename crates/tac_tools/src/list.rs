//! Registry listings.
//!
//! Flattens the static catalogs into rows for printing or for feeding
//! external tooling as JSON or RON.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::Serialize;
use tac_core::registry::building::all_buildings;
use tac_core::registry::skill::all_skills;
use tac_core::registry::tile::all_tiles;
use tac_core::registry::unit::all_units;
use thiserror::Error;

/// Error type for rendering listings.
#[derive(Error, Debug)]
pub enum RenderError {
    /// JSON serialization failed.
    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// RON serialization failed.
    #[error("Failed to write RON: {0}")]
    Ron(#[from] ron::Error),
}

/// Registry to list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Catalog {
    /// Tile types.
    Tiles,
    /// Unit types.
    Units,
    /// Building types.
    Buildings,
    /// Skills.
    Skills,
}

/// Output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Aligned text columns.
    #[default]
    Table,
    /// JSON array.
    Json,
    /// RON list.
    Ron,
}

/// One registry entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Row {
    /// Numeric id.
    pub id: u16,
    /// Display name.
    pub name: &'static str,
    /// Base cost, if the entry can be bought.
    pub cost: Option<u32>,
    /// Short summary of the entry's main stats.
    pub detail: String,
}

/// Rows of a catalog in display order.
pub fn rows(catalog: Catalog) -> Vec<Row> {
    let none = BTreeSet::new();
    match catalog {
        Catalog::Tiles => all_tiles()
            .iter()
            .map(|tile| Row {
                id: tile.id.0,
                name: tile.name,
                cost: None,
                detail: format!(
                    "cover {}{}{}",
                    tile.cover,
                    if tile.conceals { ", conceals" } else { "" },
                    if tile.sea { ", sea" } else { "" }
                ),
            })
            .collect(),
        Catalog::Units => all_units()
            .iter()
            .map(|unit| Row {
                id: unit.id.0,
                name: unit.name,
                cost: unit.cost_for(&none),
                detail: format!(
                    "{:?}, {:?}, radius {}, vision {}, fuel {}",
                    unit.entity_type, unit.movement_type, unit.radius, unit.vision, unit.fuel
                ),
            })
            .collect(),
        Catalog::Buildings => all_buildings()
            .iter()
            .map(|building| Row {
                id: building.id.0,
                name: building.name,
                cost: building.cost_for(&none),
                detail: format!(
                    "defense {}, funds {}, produces {} unit type(s)",
                    building.defense,
                    building.funds,
                    building.units.len()
                ),
            })
            .collect(),
        Catalog::Skills => all_skills()
            .iter()
            .map(|skill| Row {
                id: u16::from(skill.skill.id()),
                name: skill.name,
                cost: Some(skill.cost),
                detail: match &skill.power {
                    Some(power) => format!(
                        "attack {:+}%, defense {:+}%, power {} charge(s)",
                        skill.attack, skill.defense, power.charges
                    ),
                    None => format!("attack {:+}%, defense {:+}%", skill.attack, skill.defense),
                },
            })
            .collect(),
    }
}

/// Render rows in the given format.
pub fn render(rows: &[Row], format: Format) -> Result<String, RenderError> {
    Ok(match format {
        Format::Json => serde_json::to_string_pretty(rows)?,
        Format::Ron => ron::ser::to_string_pretty(rows, ron::ser::PrettyConfig::default())?,
        Format::Table => {
            let width = rows.iter().map(|row| row.name.len()).max().unwrap_or(0);
            let mut out = String::new();
            for row in rows {
                let cost = row.cost.map_or_else(|| "-".to_string(), |cost| cost.to_string());
                let _ = writeln!(
                    out,
                    "{:>3}  {:<width$}  {:>6}  {}",
                    row.id, row.name, cost, row.detail
                );
            }
            out
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_catalog_has_rows() {
        for catalog in [
            Catalog::Tiles,
            Catalog::Units,
            Catalog::Buildings,
            Catalog::Skills,
        ] {
            let rows = rows(catalog);
            assert!(!rows.is_empty(), "{catalog:?} is empty");
            let ids: BTreeSet<u16> = rows.iter().map(|row| row.id).collect();
            assert_eq!(ids.len(), rows.len(), "{catalog:?} has duplicate ids");
        }
    }

    #[test]
    fn test_infantry_row() {
        let rows = rows(Catalog::Units);
        let infantry = rows.iter().find(|row| row.id == 2).unwrap();
        assert_eq!(infantry.cost, Some(150));
        assert!(infantry.detail.contains("radius 3"));
    }

    #[test]
    fn test_render_formats() {
        let rows = rows(Catalog::Tiles);
        let table = render(&rows, Format::Table).unwrap();
        assert_eq!(table.lines().count(), rows.len());
        let json = render(&rows, Format::Json).unwrap();
        assert!(json.trim_start().starts_with('['));
        let ron = render(&rows, Format::Ron).unwrap();
        assert!(ron.contains("name:"));
    }
}
