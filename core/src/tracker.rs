//! Entity tracker: periodic full sweep of track-riding entities.
//!
//! Per-entity lifecycle:
//!   Absent  → Tracked   first cycle the entity is observed
//!   Tracked → Tracked   every cycle it is still observed (snapshot replaced)
//!   Tracked → Absent    first cycle it is not observed (evicted)
//!
//! RULES:
//!   - The tracker is the only writer of its table and of the
//!     `entity_snapshot` collection.
//!   - Readers get an immutable `Arc` of the last settled cycle through
//!     `TrackerView`; they never see a table mid-update.
//!   - Entities of a world whose enumeration failed are kept as they were:
//!     a failed read is not evidence the entity is gone.

use crate::{
    error::MapResult,
    host::{ObservedEntity, Rider, VoxelHost},
    store::MapStore,
    types::WorldName,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use uuid::Uuid;

/// Below this on both horizontal axes an entity counts as stopped.
pub const STOPPED_EPSILON: f64 = 0.01;

/// Passenger label used for non-player riders.
pub const NON_PLAYER_PASSENGER: &str = "entity";

/// 8-way compass heading derived from horizontal velocity. +x is east, +z is south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
    North,
    Northeast,
    Stopped,
}

impl Direction {
    pub fn from_velocity(vx: f64, vz: f64) -> Self {
        if vx.abs() < STOPPED_EPSILON && vz.abs() < STOPPED_EPSILON {
            return Self::Stopped;
        }
        let mut angle = vz.atan2(vx).to_degrees();
        if angle < 0.0 {
            angle += 360.0;
        }
        // 45° windows centred on each heading; east straddles 0°.
        const HEADINGS: [Direction; 8] = [
            Direction::East,
            Direction::Southeast,
            Direction::South,
            Direction::Southwest,
            Direction::West,
            Direction::Northwest,
            Direction::North,
            Direction::Northeast,
        ];
        let bucket = (((angle + 22.5) / 45.0).floor() as usize) % 8;
        HEADINGS[bucket]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::East      => "east",
            Self::Southeast => "southeast",
            Self::South     => "south",
            Self::Southwest => "southwest",
            Self::West      => "west",
            Self::Northwest => "northwest",
            Self::North     => "north",
            Self::Northeast => "northeast",
            Self::Stopped   => "stopped",
        }
    }
}

/// One captured observation. Speed and direction are derived on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id:          Uuid,
    pub world:       WorldName,
    pub position:    [f64; 3],
    pub velocity:    [f64; 3],
    pub occupied:    bool,
    pub passenger:   Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl EntitySnapshot {
    pub fn capture(world: &str, entity: &ObservedEntity, captured_at: DateTime<Utc>) -> Self {
        Self {
            id:        entity.id,
            world:     world.to_string(),
            position:  finite_or_zero(entity.position),
            velocity:  finite_or_zero(entity.velocity),
            occupied:  !entity.riders.is_empty(),
            passenger: passenger_of(&entity.riders),
            captured_at,
        }
    }

    pub fn speed(&self) -> f64 {
        let [x, y, z] = self.velocity;
        (x * x + y * y + z * z).sqrt()
    }

    pub fn direction(&self) -> Direction {
        Direction::from_velocity(self.velocity[0], self.velocity[2])
    }
}

/// Non-finite components read as zero.
fn finite_or_zero(v: [f64; 3]) -> [f64; 3] {
    v.map(|c| if c.is_finite() { c } else { 0.0 })
}

/// First player rider by name, else `entity` for any other rider.
fn passenger_of(riders: &[Rider]) -> Option<String> {
    riders
        .iter()
        .find_map(|r| match r {
            Rider::Player(name) => Some(name.clone()),
            Rider::Entity => None,
        })
        .or_else(|| (!riders.is_empty()).then(|| NON_PLAYER_PASSENGER.to_string()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub observed:      usize,
    pub added:         Vec<Uuid>,
    pub evicted:       Vec<Uuid>,
    pub worlds_failed: Vec<WorldName>,
}

/// Cheap cloneable read handle onto the last settled cycle.
#[derive(Debug, Clone, Default)]
pub struct TrackerView {
    published: Arc<RwLock<Arc<Vec<EntitySnapshot>>>>,
}

impl TrackerView {
    pub fn snapshot(&self) -> Arc<Vec<EntitySnapshot>> {
        Arc::clone(&self.published.read())
    }

    pub fn in_world(&self, world: &str) -> Vec<EntitySnapshot> {
        self.snapshot().iter().filter(|s| s.world == world).cloned().collect()
    }

    pub fn active_count(&self) -> usize {
        self.snapshot().len()
    }

    pub fn occupied_count(&self) -> usize {
        self.snapshot().iter().filter(|s| s.occupied).count()
    }

    fn publish(&self, snapshots: Vec<EntitySnapshot>) {
        *self.published.write() = Arc::new(snapshots);
    }
}

#[derive(Debug, Default)]
pub struct EntityTracker {
    table: BTreeMap<Uuid, EntitySnapshot>,
    view:  TrackerView,
}

impl EntityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> TrackerView {
        self.view.clone()
    }

    pub fn is_tracked(&self, id: &Uuid) -> bool {
        self.table.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// One full sweep: capture, replace, evict, publish.
    pub fn cycle(&mut self, host: &dyn VoxelHost, now: DateTime<Utc>) -> CycleReport {
        let previous: BTreeSet<Uuid> = self.table.keys().copied().collect();
        let mut seen: BTreeSet<Uuid> = BTreeSet::new();
        let mut report = CycleReport::default();

        for world in host.worlds() {
            match host.entities(&world) {
                Ok(entities) => {
                    for entity in &entities {
                        seen.insert(entity.id);
                        if !previous.contains(&entity.id) {
                            report.added.push(entity.id);
                        }
                        self.table
                            .insert(entity.id, EntitySnapshot::capture(&world, entity, now));
                    }
                }
                Err(e) => {
                    log::warn!("tracker: cannot enumerate entities in {world}: {e}");
                    report.worlds_failed.push(world);
                }
            }
        }

        let failed: BTreeSet<&str> = report.worlds_failed.iter().map(String::as_str).collect();
        report.evicted = previous
            .difference(&seen)
            .filter(|id| {
                self.table
                    .get(*id)
                    .is_some_and(|s| !failed.contains(s.world.as_str()))
            })
            .copied()
            .collect();
        for id in &report.evicted {
            self.table.remove(id);
        }
        report.observed = seen.len();

        self.view.publish(self.table.values().cloned().collect());

        if !report.added.is_empty() || !report.evicted.is_empty() {
            log::debug!(
                "tracker: {} observed, {} added, {} evicted",
                report.observed,
                report.added.len(),
                report.evicted.len()
            );
        }
        report
    }

    /// Write the settled table to the store in one batch.
    pub fn persist(&self, store: &MapStore) -> MapResult<()> {
        let snapshots: Vec<EntitySnapshot> = self.table.values().cloned().collect();
        store.replace_entity_snapshots(&snapshots)
    }

    /// Sweep, then persist.
    pub fn run_cycle(
        &mut self,
        host: &dyn VoxelHost,
        store: &MapStore,
        now: DateTime<Utc>,
    ) -> MapResult<CycleReport> {
        let report = self.cycle(host, now);
        self.persist(store)?;
        Ok(report)
    }
}
