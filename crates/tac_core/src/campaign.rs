//! Campaign graphs.
//!
//! A campaign is a directed graph of levels keyed by map id. Each level
//! lists where play continues: either unconditionally or only when a given
//! objective was the one that ended the game. The graph must stay acyclic;
//! every edit returns a new campaign and leaves the old one untouched when
//! the edit is rejected.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GameError, Result};

/// One outgoing edge of a level.
///
/// Serialized as the bare map id or as `[objective_id, map_id]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NextLevel {
    /// Continue regardless of how the level was won.
    Always(String),
    /// Continue when the given objective ended the game.
    Objective(u8, String),
}

impl NextLevel {
    /// Target map id.
    #[must_use]
    pub fn map_id(&self) -> &str {
        match self {
            Self::Always(map_id) | Self::Objective(_, map_id) => map_id,
        }
    }

    /// Objective the edge is keyed on.
    #[must_use]
    pub const fn objective(&self) -> Option<u8> {
        match self {
            Self::Always(_) => None,
            Self::Objective(objective, _) => Some(*objective),
        }
    }
}

/// A node in the campaign graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    /// Continuations in the order they were added.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next: Vec<NextLevel>,
}

/// A named, acyclic graph of levels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    /// Display name.
    pub name: String,
    /// Map id of the first level.
    pub next: String,
    /// All levels by map id.
    pub levels: BTreeMap<String, Level>,
}

impl Campaign {
    /// A campaign with a single level.
    #[must_use]
    pub fn new(name: impl Into<String>, first: impl Into<String>) -> Self {
        let first = first.into();
        Self {
            name: name.into(),
            levels: BTreeMap::from([(first.clone(), Level::default())]),
            next: first,
        }
    }

    /// Parse and validate a campaign.
    pub fn from_json(json: &str) -> Result<Self> {
        let campaign: Self = serde_json::from_str(json)?;
        campaign.validate()?;
        Ok(campaign)
    }

    /// Serialize the campaign.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Look up a level.
    pub fn level(&self, map_id: &str) -> Result<&Level> {
        self.levels
            .get(map_id)
            .ok_or_else(|| GameError::UnknownLevel(map_id.to_owned()))
    }

    /// Check that every referenced level exists and the graph is acyclic.
    pub fn validate(&self) -> Result<()> {
        self.level(&self.next)?;
        for level in self.levels.values() {
            for next in &level.next {
                self.level(next.map_id())?;
            }
        }
        if let Some(map_id) = self.find_cycle() {
            return Err(GameError::CampaignCycle(map_id));
        }
        Ok(())
    }

    /// First level found on a cycle, if any.
    fn find_cycle(&self) -> Option<String> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Open,
            Done,
        }

        let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
        for root in self.levels.keys() {
            if marks.contains_key(root.as_str()) {
                continue;
            }
            // Iterative depth-first search; each frame is a level and the
            // index of the next edge to follow.
            let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
            marks.insert(root.as_str(), Mark::Open);
            while let Some((map_id, edge)) = stack.last_mut() {
                let next = self
                    .levels
                    .get(*map_id)
                    .and_then(|level| level.next.get(*edge));
                let Some(next) = next else {
                    marks.insert(*map_id, Mark::Done);
                    stack.pop();
                    continue;
                };
                *edge += 1;
                let target = next.map_id();
                match marks.get(target) {
                    Some(Mark::Open) => return Some(target.to_owned()),
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(target, Mark::Open);
                        stack.push((target, 0));
                    }
                }
            }
        }
        None
    }

    /// Levels reachable from the first level, breadth first.
    #[must_use]
    pub fn reachable(&self) -> Vec<&str> {
        let mut seen = BTreeSet::from([self.next.as_str()]);
        let mut order = Vec::new();
        let mut queue = VecDeque::from([self.next.as_str()]);
        while let Some(map_id) = queue.pop_front() {
            order.push(map_id);
            if let Some(level) = self.levels.get(map_id) {
                for next in &level.next {
                    if seen.insert(next.map_id()) {
                        queue.push_back(next.map_id());
                    }
                }
            }
        }
        order
    }

    /// Where play continues after `map_id` was won through `objective`.
    ///
    /// Objective-keyed edges take precedence over unconditional ones.
    pub fn next_levels(&self, map_id: &str, objective: Option<u8>) -> Result<Vec<&str>> {
        let level = self.level(map_id)?;
        let keyed: Vec<&str> = level
            .next
            .iter()
            .filter(|next| objective.is_some() && next.objective() == objective)
            .map(NextLevel::map_id)
            .collect();
        if !keyed.is_empty() {
            return Ok(keyed);
        }
        Ok(level
            .next
            .iter()
            .filter(|next| next.objective().is_none())
            .map(NextLevel::map_id)
            .collect())
    }

    /// Continue from `from` to `to`, creating the target level if needed.
    pub fn connect(&self, from: &str, to: &str, objective: Option<u8>) -> Result<Self> {
        let parent = self.level(from)?;
        if parent.next.iter().any(|next| next.map_id() == to) {
            return Err(GameError::DuplicateLevel {
                from: from.to_owned(),
                to: to.to_owned(),
            });
        }
        let mut campaign = self.clone();
        campaign.levels.entry(to.to_owned()).or_default();
        let edge = match objective {
            Some(objective) => NextLevel::Objective(objective, to.to_owned()),
            None => NextLevel::Always(to.to_owned()),
        };
        if let Some(level) = campaign.levels.get_mut(from) {
            level.next.push(edge);
        }
        campaign.validate()?;
        debug!(from, to, ?objective, "connected levels");
        Ok(campaign)
    }

    /// Change which objective an existing edge is keyed on.
    pub fn set_objective(&self, from: &str, to: &str, objective: Option<u8>) -> Result<Self> {
        self.level(from)?;
        let mut campaign = self.clone();
        let level = campaign
            .levels
            .get_mut(from)
            .ok_or_else(|| GameError::UnknownLevel(from.to_owned()))?;
        let edge = level
            .next
            .iter_mut()
            .find(|next| next.map_id() == to)
            .ok_or_else(|| GameError::UnknownLevel(to.to_owned()))?;
        *edge = match objective {
            Some(objective) => NextLevel::Objective(objective, to.to_owned()),
            None => NextLevel::Always(to.to_owned()),
        };
        Ok(campaign)
    }

    /// Remove the edge from `from` to `to` and drop levels no longer
    /// reachable.
    pub fn disconnect(&self, from: &str, to: &str) -> Result<Self> {
        let parent = self.level(from)?;
        if !parent.next.iter().any(|next| next.map_id() == to) {
            return Err(GameError::UnknownLevel(to.to_owned()));
        }
        let mut campaign = self.clone();
        if let Some(level) = campaign.levels.get_mut(from) {
            level.next.retain(|next| next.map_id() != to);
        }
        debug!(from, to, "disconnected levels");
        Ok(campaign.pruned())
    }

    /// Start the campaign at `map_id` instead. Levels not reachable from the
    /// new first level are dropped.
    pub fn replace_first_level(&self, map_id: &str) -> Result<Self> {
        let mut campaign = self.clone();
        campaign.levels.entry(map_id.to_owned()).or_default();
        map_id.clone_into(&mut campaign.next);
        let campaign = campaign.pruned();
        campaign.validate()?;
        Ok(campaign)
    }

    fn pruned(&self) -> Self {
        let keep: BTreeSet<&str> = self.reachable().into_iter().collect();
        Self {
            name: self.name.clone(),
            next: self.next.clone(),
            levels: self
                .levels
                .iter()
                .filter(|(map_id, _)| keep.contains(map_id.as_str()))
                .map(|(map_id, level)| (map_id.clone(), level.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign() -> Campaign {
        Campaign::new("Tutorial", "a")
            .connect("a", "b", None)
            .unwrap()
            .connect("a", "c", Some(1))
            .unwrap()
            .connect("b", "d", None)
            .unwrap()
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_string(&campaign().levels["a"]).unwrap();
        assert_eq!(json, r#"{"next":["b",[1,"c"]]}"#);
        let back = Campaign::from_json(&campaign().to_json().unwrap()).unwrap();
        assert_eq!(back, campaign());
    }

    #[test]
    fn test_cycle_rejected() {
        let original = campaign();
        let result = original.connect("d", "a", None);
        assert!(matches!(result, Err(GameError::CampaignCycle(_))));
        assert_eq!(original.levels.len(), 4);
        assert!(original.levels["d"].next.is_empty());
    }

    #[test]
    fn test_self_loop_rejected() {
        assert!(matches!(
            Campaign::new("Loop", "a").connect("a", "a", None),
            Err(GameError::CampaignCycle(_))
        ));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let diamond = campaign().connect("c", "d", None).unwrap();
        diamond.validate().unwrap();
        assert_eq!(diamond.reachable(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_duplicate_and_unknown() {
        assert!(matches!(
            campaign().connect("a", "b", Some(2)),
            Err(GameError::DuplicateLevel { .. })
        ));
        assert!(matches!(
            campaign().connect("x", "b", None),
            Err(GameError::UnknownLevel(_))
        ));
        let json = r#"{"name":"Broken","next":"a","levels":{"a":{"next":["z"]}}}"#;
        assert!(matches!(
            Campaign::from_json(json),
            Err(GameError::UnknownLevel(id)) if id == "z"
        ));
    }

    #[test]
    fn test_next_levels() {
        let campaign = campaign();
        assert_eq!(campaign.next_levels("a", Some(1)).unwrap(), vec!["c"]);
        assert_eq!(campaign.next_levels("a", Some(0)).unwrap(), vec!["b"]);
        assert_eq!(campaign.next_levels("a", None).unwrap(), vec!["b"]);
        assert!(campaign.next_levels("d", None).unwrap().is_empty());
    }

    #[test]
    fn test_disconnect_prunes() {
        let campaign = campaign().disconnect("a", "b").unwrap();
        assert_eq!(campaign.reachable(), vec!["a", "c"]);
        assert!(!campaign.levels.contains_key("d"));
        assert!(campaign.disconnect("a", "b").is_err());
    }

    #[test]
    fn test_replace_first_level() {
        let campaign = campaign().replace_first_level("b").unwrap();
        assert_eq!(campaign.next, "b");
        assert_eq!(campaign.reachable(), vec!["b", "d"]);
        assert_eq!(campaign.levels.len(), 2);

        let fresh = campaign.replace_first_level("z").unwrap();
        assert_eq!(fresh.levels.len(), 1);
    }

    #[test]
    fn test_set_objective() {
        let campaign = campaign().set_objective("a", "c", None).unwrap();
        assert_eq!(campaign.levels["a"].next[1], NextLevel::Always("c".into()));
    }
}
