//! # Grid Math
//!
//! Axis-aligned integer geometry for the wiring grid. Everything here works
//! on `glam::IVec2` grid cells; the only float type in the crate is the
//! world-space `Vec2` that [`crate::block::Block::snap_to_grid`] consumes.

use bitflags::bitflags;
use glam::IVec2;
use serde::{Deserialize, Serialize};

/// One of the four axis directions a port can face.
///
/// The grid uses screen conventions: `Up` is `(0, -1)`, `Down` is `(0, 1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All four directions, in port-slot order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// The unit grid vector for this direction.
    pub fn to_vec(self) -> IVec2 {
        match self {
            Direction::Up => IVec2::new(0, -1),
            Direction::Down => IVec2::new(0, 1),
            Direction::Left => IVec2::new(-1, 0),
            Direction::Right => IVec2::new(1, 0),
        }
    }

    /// The opposite direction (`Up` ↔ `Down`, `Left` ↔ `Right`).
    pub fn reverse(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Rotates by swapping the vector components: `Up` → `Left`,
    /// `Down` → `Right`, `Left` → `Up`, `Right` → `Down`.
    pub fn swap_xy(self) -> Self {
        match self {
            Direction::Up => Direction::Left,
            Direction::Down => Direction::Right,
            Direction::Left => Direction::Up,
            Direction::Right => Direction::Down,
        }
    }

    /// The node port slot this direction maps to.
    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    /// Inverse of [`Direction::index`].
    pub fn from_index(index: usize) -> Option<Self> {
        Direction::ALL.get(index).copied()
    }
}

bitflags! {
    /// A set of [`Direction`]s, used for node port-slot occupancy.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DirSet: u8 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

impl Serialize for DirSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for DirSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}

impl DirSet {
    /// True if `dir` is in the set.
    pub fn has(self, dir: Direction) -> bool {
        self.contains(dir.into())
    }
}

impl From<Direction> for DirSet {
    fn from(dir: Direction) -> Self {
        match dir {
            Direction::Up => DirSet::UP,
            Direction::Down => DirSet::DOWN,
            Direction::Left => DirSet::LEFT,
            Direction::Right => DirSet::RIGHT,
        }
    }
}

/// True iff exactly one component of `v` is zero. The zero vector is not
/// axis-aligned.
pub fn is_axis_aligned(v: IVec2) -> bool {
    (v.x != 0) != (v.y != 0)
}

/// L¹ (taxicab) magnitude.
pub fn mag_l1(v: IVec2) -> i32 {
    v.x.abs() + v.y.abs()
}

/// Dot product of a direction's unit vector with `v`.
pub fn dir_dot(dir: Direction, v: IVec2) -> i32 {
    dir.to_vec().dot(v)
}

/// The direction an axis-aligned non-zero vector points in.
pub fn vec_to_dir(v: IVec2) -> Direction {
    debug_assert!(is_axis_aligned(v));
    if v.y != 0 {
        if v.y < 0 { Direction::Up } else { Direction::Down }
    } else if v.x < 0 {
        Direction::Left
    } else {
        Direction::Right
    }
}

/// True iff `v` lies strictly between `end1` and `end2` on their common axis.
/// The endpoints themselves are excluded.
pub fn is_between(v: IVec2, end1: IVec2, end2: IVec2) -> bool {
    debug_assert!(is_axis_aligned(end1 - end2));
    let mag1 = mag_l1(v - end1);
    let mag2 = mag_l1(end2 - v);
    if mag1 == 0 || mag2 == 0 {
        return false;
    }
    mag1 + mag2 == mag_l1(end2 - end1)
}

/// Interior crossing point of two axis-aligned segments.
///
/// Returns `None` for parallel segments and for crossings that coincide with
/// any endpoint of either segment.
pub fn line_intersection(line1: (IVec2, IVec2), line2: (IVec2, IVec2)) -> Option<IVec2> {
    let diff1 = line1.1 - line1.0;
    let diff2 = line2.1 - line2.0;
    debug_assert!(is_axis_aligned(diff1));
    debug_assert!(is_axis_aligned(diff2));
    if diff1.dot(diff2) != 0 {
        // same axis, parallel
        return None;
    }
    let mag = mag_l1(diff1);
    let dir = diff1 / mag;
    let dt = dir.dot(line2.0 - line1.0);
    if !(dt > 0 && dt < mag) {
        return None;
    }
    let mag = mag_l1(diff2);
    let dir = diff2 / mag;
    let dt = dir.dot(line1.0 - line2.0);
    if !(dt > 0 && dt < mag) {
        return None;
    }
    Some(line2.0 + dt * dir)
}

/// Keeps the component of larger absolute value, zeroing the other. Ties keep
/// the `y` component.
pub fn snap_to_axis(v: IVec2) -> IVec2 {
    if v.x.abs() > v.y.abs() {
        IVec2::new(v.x, 0)
    } else {
        IVec2::new(0, v.y)
    }
}
