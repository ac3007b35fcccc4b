//! Post-game performance evaluation.
//!
//! A map may set expectations for pace, power and style. A player who wins
//! earns one star per expectation met, plus one for every optional
//! objective completed.

use serde::{Deserialize, Serialize};

use crate::map::{MapState, PerformanceStyleType, PlayerId, PlayerStatistics};
use crate::math::Fixed;

/// Category a star is awarded in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceType {
    /// Won within the expected number of rounds.
    Pace,
    /// Destroyed enough units per unit lost.
    Power,
    /// Met the style threshold.
    Style,
    /// Completed an optional objective.
    Bonus,
}

/// Ratio of destroyed to lost units. Losing nothing counts as losing one.
#[must_use]
pub fn power_value(stats: &PlayerStatistics) -> Fixed {
    Fixed::from_num(stats.destroyed_units) / Fixed::from_num(stats.lost_units.max(1))
}

/// The statistic a style expectation measures.
#[must_use]
pub const fn style_value(kind: PerformanceStyleType, stats: &PlayerStatistics) -> u32 {
    match kind {
        PerformanceStyleType::LostUnits => stats.lost_units,
        PerformanceStyleType::CapturedBuildings => stats.captured,
        PerformanceStyleType::OneShots => stats.one_shots,
    }
}

/// Whether a style value meets its threshold. Lost units compare downward.
#[must_use]
pub const fn meets_style(kind: PerformanceStyleType, value: u32, threshold: u32) -> bool {
    match kind {
        PerformanceStyleType::LostUnits => value <= threshold,
        PerformanceStyleType::CapturedBuildings | PerformanceStyleType::OneShots => {
            value >= threshold
        }
    }
}

/// Result per configured category, in category order.
///
/// Categories the map does not configure are left out. `Bonus` appears once
/// per optional objective.
#[must_use]
pub fn evaluate_performance(map: &MapState, player: PlayerId) -> Vec<(PerformanceType, bool)> {
    let Some(stats) = map.player(player).map(|p| p.stats) else {
        return Vec::new();
    };
    let expectation = map.config().performance;
    let mut result = Vec::new();
    if let Some(pace) = expectation.pace {
        result.push((PerformanceType::Pace, map.round() <= pace));
    }
    if let Some(power) = expectation.power {
        result.push((PerformanceType::Power, power_value(&stats) >= power));
    }
    if let Some(style) = expectation.style {
        let value = style_value(style.kind, &stats);
        result.push((
            PerformanceType::Style,
            meets_style(style.kind, value, style.value),
        ));
    }
    for objective in map.config().objectives.values() {
        if objective.optional {
            result.push((PerformanceType::Bonus, objective.completed.contains(&player)));
        }
    }
    result
}

/// Number of stars earned.
#[must_use]
pub fn stars(map: &MapState, player: PlayerId) -> usize {
    evaluate_performance(map, player)
        .iter()
        .filter(|(_, achieved)| *achieved)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{Objective, ObjectiveKind, PerformanceExpectation, PerformanceStyle, Player};
    use crate::registry::tile::PLAIN;
    use crate::vector::SizeVector;

    fn map(expectation: PerformanceExpectation) -> MapState {
        let map = MapState::new(
            SizeVector::new(3, 3),
            PLAIN,
            vec![Player::new(PlayerId(1), 1, 0), Player::new(PlayerId(2), 2, 0)],
        )
        .unwrap();
        let mut config = map.config().clone();
        config.performance = expectation;
        map.with_config(config)
    }

    #[test]
    fn test_power_value() {
        let mut stats = PlayerStatistics::default();
        assert_eq!(power_value(&stats), Fixed::ZERO);
        stats.destroyed_units = 3;
        assert_eq!(power_value(&stats), Fixed::from_num(3));
        stats.lost_units = 2;
        assert_eq!(power_value(&stats), Fixed::from_num(1.5));
    }

    #[test]
    fn test_nothing_configured() {
        assert!(evaluate_performance(&map(PerformanceExpectation::default()), PlayerId(1))
            .is_empty());
        assert!(evaluate_performance(&map(PerformanceExpectation::default()), PlayerId(9))
            .is_empty());
    }

    #[test]
    fn test_all_categories() {
        let expectation = PerformanceExpectation {
            pace: Some(5),
            power: Some(Fixed::from_num(2)),
            style: Some(PerformanceStyle {
                kind: PerformanceStyleType::LostUnits,
                value: 1,
            }),
        };
        let mut map = map(expectation);
        map.round = 4;
        let map = map
            .modify_player(PlayerId(1), |p| {
                p.stats.destroyed_units = 4;
                p.stats.lost_units = 1;
            })
            .unwrap();
        let mut config = map.config().clone();
        let mut objective = Objective::new(ObjectiveKind::Survival { rounds: 2 }).optional(None);
        objective.completed.insert(PlayerId(1));
        config.objectives.insert(1, objective);
        let map = map.with_config(config);

        assert_eq!(
            evaluate_performance(&map, PlayerId(1)),
            vec![
                (PerformanceType::Pace, true),
                (PerformanceType::Power, true),
                (PerformanceType::Style, true),
                (PerformanceType::Bonus, true),
            ]
        );
        assert_eq!(stars(&map, PlayerId(1)), 4);
        // Player 2 meets only pace and style.
        assert_eq!(stars(&map, PlayerId(2)), 2);
    }

    #[test]
    fn test_style_comparison() {
        assert!(meets_style(PerformanceStyleType::OneShots, 3, 3));
        assert!(!meets_style(PerformanceStyleType::CapturedBuildings, 2, 3));
        assert!(!meets_style(PerformanceStyleType::LostUnits, 2, 1));
    }
}
