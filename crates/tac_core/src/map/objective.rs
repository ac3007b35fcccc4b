//! Win, loss and optional objectives.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::player::PlayerId;
use crate::registry::Skill;

/// Prize handed out for completing an optional objective.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Reward {
    /// Add funds.
    Funds {
        /// Amount added.
        amount: u32,
    },
    /// Grant a skill.
    Skill {
        /// Skill granted.
        skill: Skill,
    },
}

/// What has to happen for an objective to be achieved.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ObjectiveKind {
    /// Eliminate every opponent.
    Default,
    /// Capture a number of buildings.
    CaptureAmount {
        /// Buildings to capture.
        amount: u32,
    },
    /// Own every building carrying one of the labels.
    CaptureLabel {
        /// Labels to capture.
        label: BTreeSet<u8>,
    },
    /// Destroy a number of units.
    DestroyAmount {
        /// Units to destroy.
        amount: u32,
    },
    /// Destroy every opposing unit carrying one of the labels.
    DestroyLabel {
        /// Labels to destroy.
        label: BTreeSet<u8>,
    },
    /// Survive past a round.
    Survival {
        /// Last round that has to be survived.
        rounds: u32,
    },
    /// Own every unit carrying one of the labels.
    RescueLabel {
        /// Labels to rescue.
        label: BTreeSet<u8>,
    },
}

/// An objective as configured on a map.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Objective {
    /// Condition.
    #[serde(flatten)]
    pub kind: ObjectiveKind,
    /// Not shown to players until discovered.
    #[serde(default)]
    pub hidden: bool,
    /// Completing it rewards instead of winning the game.
    #[serde(default)]
    pub optional: bool,
    /// Players that completed the objective.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub completed: BTreeSet<PlayerId>,
    /// Prize for optional objectives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<Reward>,
    /// Players that can achieve it; everyone if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<BTreeSet<PlayerId>>,
}

impl Objective {
    /// A visible, mandatory objective.
    #[must_use]
    pub fn new(kind: ObjectiveKind) -> Self {
        Self {
            kind,
            hidden: false,
            optional: false,
            completed: BTreeSet::new(),
            reward: None,
            players: None,
        }
    }

    /// Make the objective optional with a reward.
    #[must_use]
    pub fn optional(mut self, reward: Option<Reward>) -> Self {
        self.optional = true;
        self.reward = reward;
        self
    }

    /// Hide the objective.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Whether the player may achieve the objective.
    #[must_use]
    pub fn applies_to(&self, player: PlayerId) -> bool {
        self.players
            .as_ref()
            .map_or(true, |players| players.contains(&player))
    }
}
