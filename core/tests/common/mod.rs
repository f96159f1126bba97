//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use railmap_core::{
    error::{MapError, MapResult},
    host::{MemoryHost, MemoryWorld, ObservedEntity, Rider, VoxelHost},
    model::TrackType,
    store::MapStore,
    types::{CellPos, ChunkPos},
};
use uuid::Uuid;

pub const WORLD: &str = "overworld";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn store() -> MapStore {
    let store = MapStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

/// A host with one empty world spanning y in [0, 128).
pub fn host() -> MemoryHost {
    let host = MemoryHost::new();
    host.add_world(WORLD, MemoryWorld::new(0, 128));
    host
}

pub fn lay(host: &MemoryHost, world: &str, cells: &[CellPos]) {
    for &c in cells {
        host.set_rail(world, c, TrackType::Plain);
    }
}

/// A straight run along +x at fixed y, z.
pub fn straight_x(x0: i32, x1: i32, y: i32, z: i32) -> Vec<CellPos> {
    (x0..=x1).map(|x| CellPos::new(x, y, z)).collect()
}

pub fn cart(id: u128, position: [f64; 3], velocity: [f64; 3], riders: Vec<Rider>) -> ObservedEntity {
    ObservedEntity { id: Uuid::from_u128(id), position, velocity, riders }
}

pub fn ridden_by(player: &str) -> Vec<Rider> {
    vec![Rider::Player(player.to_string())]
}

/// Wraps a host and lists one extra world that fails every access.
pub struct PhantomWorld {
    pub inner: MemoryHost,
    pub name:  &'static str,
}

impl PhantomWorld {
    fn check(&self, world: &str) -> MapResult<()> {
        if world == self.name {
            return Err(MapError::WorldNotFound { world: world.to_string() });
        }
        Ok(())
    }
}

impl VoxelHost for PhantomWorld {
    fn worlds(&self) -> Vec<String> {
        let mut worlds = self.inner.worlds();
        worlds.push(self.name.to_string());
        worlds.sort();
        worlds
    }

    fn vertical_bounds(&self, world: &str) -> MapResult<(i32, i32)> {
        self.check(world)?;
        self.inner.vertical_bounds(world)
    }

    fn loaded_chunks(&self, world: &str) -> MapResult<Vec<ChunkPos>> {
        self.check(world)?;
        self.inner.loaded_chunks(world)
    }

    fn load_chunk(&self, world: &str, chunk: ChunkPos) -> MapResult<()> {
        self.check(world)?;
        self.inner.load_chunk(world, chunk)
    }

    fn track_at(&self, world: &str, pos: CellPos) -> MapResult<Option<TrackType>> {
        self.check(world)?;
        self.inner.track_at(world, pos)
    }

    fn entities(&self, world: &str) -> MapResult<Vec<ObservedEntity>> {
        self.check(world)?;
        self.inner.entities(world)
    }
}
