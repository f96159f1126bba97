//! The voxel-world host seam.
//!
//! RULE: the scanner and the tracker only see the world through
//! `VoxelHost`. Every call may be slow; callers batch per chunk.

use crate::{
    error::{MapError, MapResult},
    model::TrackType,
    types::{CellPos, ChunkPos, WorldName},
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Who is riding an observed entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Rider {
    Player(String),
    /// Any non-player passenger.
    Entity,
}

/// A live track-riding entity as the host reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedEntity {
    pub id:       Uuid,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    #[serde(default)]
    pub riders:   Vec<Rider>,
}

pub trait VoxelHost: Send + Sync {
    /// Names of every loaded world, sorted.
    fn worlds(&self) -> Vec<WorldName>;

    /// Vertical cell bounds of a world: `min` inclusive, `max` exclusive.
    fn vertical_bounds(&self, world: &str) -> MapResult<(i32, i32)>;

    /// Chunk columns currently loaded in a world.
    fn loaded_chunks(&self, world: &str) -> MapResult<Vec<ChunkPos>>;

    /// Make sure a chunk is readable; fails when it is transiently unavailable.
    fn load_chunk(&self, world: &str, chunk: ChunkPos) -> MapResult<()>;

    /// Track type at a cell, or None when the cell holds no rail.
    fn track_at(&self, world: &str, pos: CellPos) -> MapResult<Option<TrackType>>;

    /// Every live track-riding entity in a world.
    fn entities(&self, world: &str) -> MapResult<Vec<ObservedEntity>>;
}

/// One world held entirely in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryWorld {
    pub min_y: i32,
    pub max_y: i32,
    #[serde(default, with = "rail_list")]
    pub rails: BTreeMap<CellPos, TrackType>,
    #[serde(default)]
    pub entities: Vec<ObservedEntity>,
    /// Chunks reported as loaded in addition to those holding rails.
    #[serde(default)]
    pub extra_chunks: BTreeSet<ChunkPos>,
    /// Chunks that fail every access.
    #[serde(default)]
    pub failing_chunks: BTreeSet<ChunkPos>,
}

impl MemoryWorld {
    pub fn new(min_y: i32, max_y: i32) -> Self {
        Self { min_y, max_y, ..Self::default() }
    }
}

/// In-memory host used by tests and the headless runner.
#[derive(Debug, Default)]
pub struct MemoryHost {
    worlds: RwLock<BTreeMap<WorldName, MemoryWorld>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_worlds(worlds: BTreeMap<WorldName, MemoryWorld>) -> Self {
        Self { worlds: RwLock::new(worlds) }
    }

    pub fn add_world(&self, name: &str, world: MemoryWorld) {
        self.worlds.write().insert(name.to_string(), world);
    }

    pub fn set_rail(&self, world: &str, pos: CellPos, track_type: TrackType) {
        if let Some(w) = self.worlds.write().get_mut(world) {
            w.rails.insert(pos, track_type);
        }
    }

    pub fn remove_rail(&self, world: &str, pos: CellPos) {
        if let Some(w) = self.worlds.write().get_mut(world) {
            w.rails.remove(&pos);
        }
    }

    pub fn spawn_entity(&self, world: &str, entity: ObservedEntity) {
        if let Some(w) = self.worlds.write().get_mut(world) {
            w.entities.retain(|e| e.id != entity.id);
            w.entities.push(entity);
        }
    }

    pub fn despawn_entity(&self, world: &str, id: Uuid) {
        if let Some(w) = self.worlds.write().get_mut(world) {
            w.entities.retain(|e| e.id != id);
        }
    }

    pub fn fail_chunk(&self, world: &str, chunk: ChunkPos) {
        if let Some(w) = self.worlds.write().get_mut(world) {
            w.failing_chunks.insert(chunk);
        }
    }

    pub fn heal_chunk(&self, world: &str, chunk: ChunkPos) {
        if let Some(w) = self.worlds.write().get_mut(world) {
            w.failing_chunks.remove(&chunk);
        }
    }

    fn with_world<R>(&self, world: &str, f: impl FnOnce(&MemoryWorld) -> MapResult<R>) -> MapResult<R> {
        let worlds = self.worlds.read();
        let w = worlds
            .get(world)
            .ok_or_else(|| MapError::WorldNotFound { world: world.to_string() })?;
        f(w)
    }
}

impl VoxelHost for MemoryHost {
    fn worlds(&self) -> Vec<WorldName> {
        self.worlds.read().keys().cloned().collect()
    }

    fn vertical_bounds(&self, world: &str) -> MapResult<(i32, i32)> {
        self.with_world(world, |w| Ok((w.min_y, w.max_y)))
    }

    fn loaded_chunks(&self, world: &str) -> MapResult<Vec<ChunkPos>> {
        self.with_world(world, |w| {
            let mut chunks: BTreeSet<ChunkPos> = w.rails.keys().map(|p| p.chunk()).collect();
            chunks.extend(w.extra_chunks.iter().copied());
            chunks.extend(w.failing_chunks.iter().copied());
            Ok(chunks.into_iter().collect())
        })
    }

    fn load_chunk(&self, world: &str, chunk: ChunkPos) -> MapResult<()> {
        self.with_world(world, |w| {
            if w.failing_chunks.contains(&chunk) {
                return Err(MapError::ChunkUnavailable { world: world.to_string(), chunk });
            }
            Ok(())
        })
    }

    fn track_at(&self, world: &str, pos: CellPos) -> MapResult<Option<TrackType>> {
        self.with_world(world, |w| {
            let chunk = pos.chunk();
            if w.failing_chunks.contains(&chunk) {
                return Err(MapError::ChunkUnavailable { world: world.to_string(), chunk });
            }
            if pos.y < w.min_y || pos.y >= w.max_y {
                return Ok(None);
            }
            Ok(w.rails.get(&pos).copied())
        })
    }

    fn entities(&self, world: &str) -> MapResult<Vec<ObservedEntity>> {
        self.with_world(world, |w| Ok(w.entities.clone()))
    }
}

/// Rails as a list of `[[x, y, z], "TYPE"]` pairs; JSON map keys must be strings.
mod rail_list {
    use crate::{model::TrackType, types::CellPos};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        rails: &BTreeMap<CellPos, TrackType>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<([i32; 3], TrackType)> =
            rails.iter().map(|(p, t)| (p.to_array(), *t)).collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<CellPos, TrackType>, D::Error> {
        let list = Vec::<([i32; 3], TrackType)>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|(p, t)| (CellPos::from(p), t)).collect())
    }
}
