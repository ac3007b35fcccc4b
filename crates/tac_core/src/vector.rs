//! Grid coordinates and positional maps.
//!
//! Coordinates are 1-based: `(1, 1)` is the top-left field. [`Vector`]
//! serializes as a two element array `[x, y]`, and positional maps
//! serialize as sequences of `[position, value]` pairs so snapshots stay
//! JSON compatible.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A position on the grid.
///
/// Ordering is structural (`x`, then `y`), which is also the iteration
/// order of every positional map in the kernel.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Vector {
    /// Column, starting at 1.
    pub x: i32,
    /// Row, starting at 1.
    pub y: i32,
}

impl Vector {
    /// Create a new vector.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The field above.
    #[must_use]
    pub const fn up(self) -> Self {
        Self::new(self.x, self.y - 1)
    }

    /// The field below.
    #[must_use]
    pub const fn down(self) -> Self {
        Self::new(self.x, self.y + 1)
    }

    /// The field to the left.
    #[must_use]
    pub const fn left(self) -> Self {
        Self::new(self.x - 1, self.y)
    }

    /// The field to the right.
    #[must_use]
    pub const fn right(self) -> Self {
        Self::new(self.x + 1, self.y)
    }

    /// The four orthogonal neighbours in a fixed order (up, right, down, left).
    ///
    /// Neighbours may lie outside the map; filter with [`SizeVector::contains`].
    #[must_use]
    pub const fn adjacent(self) -> [Self; 4] {
        [self.up(), self.right(), self.down(), self.left()]
    }

    /// Manhattan distance to another vector.
    #[must_use]
    pub const fn distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Translate by an offset.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<(i32, i32)> for Vector {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl From<Vector> for (i32, i32) {
    fn from(vector: Vector) -> Self {
        (vector.x, vector.y)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Dimensions of a map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SizeVector {
    /// Number of columns.
    pub width: i32,
    /// Number of rows.
    pub height: i32,
}

impl SizeVector {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Whether the vector lies within `1..=width` and `1..=height`.
    #[must_use]
    pub const fn contains(self, vector: Vector) -> bool {
        vector.x >= 1 && vector.y >= 1 && vector.x <= self.width && vector.y <= self.height
    }

    /// Number of fields.
    #[must_use]
    pub fn area(self) -> usize {
        (self.width.max(0) * self.height.max(0)) as usize
    }

    /// Row-major index of a position, if it is in bounds.
    #[must_use]
    pub const fn index(self, vector: Vector) -> Option<usize> {
        if self.contains(vector) {
            Some(((vector.y - 1) * self.width + (vector.x - 1)) as usize)
        } else {
            None
        }
    }

    /// All positions in row-major order.
    pub fn positions(self) -> impl Iterator<Item = Vector> {
        (1..=self.height).flat_map(move |y| (1..=self.width).map(move |x| Vector::new(x, y)))
    }
}

impl fmt::Display for SizeVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Serde support for `Arc<BTreeMap<Vector, T>>`.
///
/// JSON object keys must be strings, so positional maps are written as a
/// sequence of `[position, value]` pairs. Duplicate positions are rejected
/// on the way back in.
pub mod vector_map {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use serde::de::Error as _;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Vector;

    /// Serialize a positional map as `[position, value]` pairs.
    pub fn serialize<S, T>(map: &Arc<BTreeMap<Vector, T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        let mut seq = serializer.serialize_seq(Some(map.len()))?;
        for entry in map.iter() {
            seq.serialize_element(&entry)?;
        }
        seq.end()
    }

    /// Deserialize a positional map from `[position, value]` pairs.
    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Arc<BTreeMap<Vector, T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let pairs = Vec::<(Vector, T)>::deserialize(deserializer)?;
        let mut map = BTreeMap::new();
        for (position, value) in pairs {
            if map.insert(position, value).is_some() {
                return Err(D::Error::custom(format!("duplicate position {position}")));
            }
        }
        Ok(Arc::new(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_serializes_as_pair() {
        let json = serde_json::to_string(&Vector::new(3, 7)).unwrap();
        assert_eq!(json, "[3,7]");
        let back: Vector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Vector::new(3, 7));
    }

    #[test]
    fn test_size_contains_is_one_based() {
        let size = SizeVector::new(4, 3);
        assert!(size.contains(Vector::new(1, 1)));
        assert!(size.contains(Vector::new(4, 3)));
        assert!(!size.contains(Vector::new(0, 1)));
        assert!(!size.contains(Vector::new(5, 3)));
        assert!(!size.contains(Vector::new(4, 4)));
    }

    #[test]
    fn test_index_is_row_major() {
        let size = SizeVector::new(4, 3);
        assert_eq!(size.index(Vector::new(1, 1)), Some(0));
        assert_eq!(size.index(Vector::new(2, 1)), Some(1));
        assert_eq!(size.index(Vector::new(1, 2)), Some(4));
        assert_eq!(size.index(Vector::new(9, 9)), None);
        assert_eq!(size.positions().count(), size.area());
    }

    #[test]
    fn test_adjacent_and_distance() {
        let v = Vector::new(5, 5);
        for neighbour in v.adjacent() {
            assert_eq!(v.distance(neighbour), 1);
        }
        assert_eq!(Vector::new(1, 1).distance(Vector::new(4, 5)), 7);
    }

    #[test]
    fn test_vector_map_rejects_duplicates() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "vector_map")]
            #[allow(dead_code)]
            map: std::sync::Arc<std::collections::BTreeMap<Vector, u8>>,
        }

        let ok: Wrapper = serde_json::from_str(r#"{"map":[[[1,1],3],[[2,1],4]]}"#).unwrap();
        assert_eq!(ok.map.len(), 2);
        let duplicate = serde_json::from_str::<Wrapper>(r#"{"map":[[[1,1],3],[[1,1],4]]}"#);
        assert!(duplicate.is_err());
    }
}
