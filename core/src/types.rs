//! Shared primitive types used across the whole mapper.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A host tick. The voxel host runs 20 ticks per real second.
pub type Tick = u64;

/// Name of a world as reported by the voxel host.
pub type WorldName = String;

/// Horizontal and vertical extent of a chunk column, in cells.
pub const CHUNK_SIZE: i32 = 16;

/// An integer cell coordinate inside one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CellPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy, z: self.z + dz }
    }

    /// The chunk column containing this cell.
    pub const fn chunk(self) -> ChunkPos {
        ChunkPos {
            x: self.x.div_euclid(CHUNK_SIZE),
            z: self.z.div_euclid(CHUNK_SIZE),
        }
    }

    pub fn distance(self, other: CellPos) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        let dz = f64::from(self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Per-axis sign of the step from `self` to `next`.
    pub fn step_sign(self, next: CellPos) -> [i32; 3] {
        [
            (next.x - self.x).signum(),
            (next.y - self.y).signum(),
            (next.z - self.z).signum(),
        ]
    }

    pub const fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[i32; 3]> for CellPos {
    fn from(v: [i32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A chunk column coordinate (x, z) in chunk units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk containing a continuous world position.
    pub fn containing(x: f64, z: f64) -> Self {
        Self::new(
            (x.floor() as i32).div_euclid(CHUNK_SIZE),
            (z.floor() as i32).div_euclid(CHUNK_SIZE),
        )
    }

    pub const fn min_x(self) -> i32 {
        self.x * CHUNK_SIZE
    }

    pub const fn min_z(self) -> i32 {
        self.z * CHUNK_SIZE
    }

    /// Every chunk within Chebyshev distance `radius`, row by row.
    pub fn square_around(self, radius: u32) -> impl Iterator<Item = ChunkPos> {
        let r = i32::try_from(radius).unwrap_or(i32::MAX);
        (-r..=r).flat_map(move |dx| (-r..=r).map(move |dz| ChunkPos::new(self.x + dx, self.z + dz)))
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}
