//! Editor undo history.
//!
//! Every entry is a full `(label, MapState, Effects)` snapshot. Snapshots
//! share their layers through `Arc`, so keeping many of them is cheap.
//! Moving through the history never replays responses or fires triggers.

use std::fmt;

use tracing::trace;

use crate::effects::Effects;
use crate::map::{Biome, MapState};

/// What produced a history entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HistoryLabel {
    /// The state the editor opened with.
    Initial,
    /// A regular edit.
    Checkpoint,
    /// A resize to the given dimensions.
    Resize {
        /// New height.
        height: i32,
        /// New width.
        width: i32,
    },
    /// A biome change.
    Biome(Biome),
}

impl fmt::Display for HistoryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => f.write_str("initial"),
            Self::Checkpoint => f.write_str("checkpoint"),
            Self::Resize { height, width } => write!(f, "resize-{height}-{width}"),
            Self::Biome(biome) => write!(f, "biome-{biome:?}"),
        }
    }
}

/// One snapshot in the history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Origin of the snapshot.
    pub label: HistoryLabel,
    /// Map at that point.
    pub map: MapState,
    /// Effects at that point.
    pub effects: Effects,
}

/// Linear undo stack with a cursor.
#[derive(Clone, Debug)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

#[allow(clippy::len_without_is_empty)]
impl History {
    /// Start a history at the initial state.
    #[must_use]
    pub fn new(map: MapState, effects: Effects) -> Self {
        Self {
            entries: vec![HistoryEntry {
                label: HistoryLabel::Initial,
                map,
                effects,
            }],
            cursor: 0,
        }
    }

    /// Record a new state, discarding everything after the cursor.
    pub fn push(&mut self, label: HistoryLabel, map: MapState, effects: Effects) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(HistoryEntry {
            label,
            map,
            effects,
        });
        self.cursor = self.entries.len() - 1;
        trace!(%label, len = self.entries.len(), "history push");
    }

    /// Like [`push`](Self::push), but replaces the current entry when it has
    /// the same label. Repeated resizes to one size or drags across many
    /// fields then collapse into one step. The initial entry is never
    /// replaced.
    pub fn push_coalesced(&mut self, label: HistoryLabel, map: MapState, effects: Effects) {
        if self.cursor > 0 && self.entries[self.cursor].label == label {
            self.entries.truncate(self.cursor + 1);
            self.entries[self.cursor] = HistoryEntry {
                label,
                map,
                effects,
            };
            trace!(%label, "history coalesce");
        } else {
            self.push(label, map, effects);
        }
    }

    /// Step back. Returns the restored entry, or `None` at the start.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.entries[self.cursor])
    }

    /// Step forward. Returns the restored entry, or `None` at the end.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(&self.entries[self.cursor])
    }

    /// The entry at the cursor.
    #[must_use]
    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.cursor]
    }

    /// Cursor position.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of entries, including any redo tail. Never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether anything was recorded after the initial state.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.entries.len() > 1
    }

    /// Labels in order.
    pub fn labels(&self) -> impl Iterator<Item = HistoryLabel> + '_ {
        self.entries.iter().map(|entry| entry.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{Player, PlayerId};
    use crate::registry::tile::{FOREST, PLAIN};
    use crate::vector::{SizeVector, Vector};

    fn base() -> MapState {
        MapState::new(SizeVector::new(4, 4), PLAIN, vec![Player::new(PlayerId(1), 1, 0)]).unwrap()
    }

    fn forest(map: &MapState, x: i32) -> MapState {
        map.set_tile(Vector::new(x, 1), FOREST).unwrap()
    }

    #[test]
    fn test_undo_redo() {
        let initial = base();
        let mut history = History::new(initial.clone(), Effects::new());
        let one = forest(&initial, 1);
        let two = forest(&one, 2);
        history.push(HistoryLabel::Checkpoint, one.clone(), Effects::new());
        history.push(HistoryLabel::Checkpoint, two.clone(), Effects::new());

        assert_eq!(history.undo().unwrap().map, one);
        assert_eq!(history.undo().unwrap().map, initial);
        assert!(history.undo().is_none());
        assert_eq!(history.redo().unwrap().map, one);
        assert_eq!(history.redo().unwrap().map, two);
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_push_truncates_redo_tail() {
        let initial = base();
        let mut history = History::new(initial.clone(), Effects::new());
        history.push(HistoryLabel::Checkpoint, forest(&initial, 1), Effects::new());
        history.push(HistoryLabel::Checkpoint, forest(&initial, 2), Effects::new());
        history.undo();
        history.undo();
        history.push(
            HistoryLabel::Biome(Biome::Snow),
            forest(&initial, 3),
            Effects::new(),
        );
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), 1);
        assert!(history.redo().is_none());
        assert_eq!(
            history.labels().map(|label| label.to_string()).collect::<Vec<_>>(),
            vec!["initial", "biome-Snow"]
        );
    }

    #[test]
    fn test_coalesce() {
        let initial = base();
        let mut history = History::new(initial.clone(), Effects::new());
        let resize = HistoryLabel::Resize {
            height: 4,
            width: 4,
        };
        history.push_coalesced(resize, forest(&initial, 1), Effects::new());
        history.push_coalesced(resize, forest(&initial, 2), Effects::new());
        history.push_coalesced(HistoryLabel::Checkpoint, forest(&initial, 3), Effects::new());
        assert_eq!(history.len(), 3);
        assert_eq!(history.undo().unwrap().map, forest(&initial, 2));
        assert!(history.has_changes());
        assert!(history.len() > 1);
    }
}
