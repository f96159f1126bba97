//! Region scanner: discovers rail components around points of interest.
//!
//! PIPELINE (per world, per invocation):
//!   1. Pick chunks: a square of `radius` around each anchor, or every
//!      loaded chunk for a full scan. A chunk is enumerated at most once.
//!   2. Walk every cell of each chunk inside the world's vertical bounds.
//!   3. Seed a trace from each accepted rail cell not yet traced.
//!   4. Sequence and simplify each component into a rail line.
//!
//! RULES:
//!   - `ScanPassState::traced` is the only dedup authority. A cell joins it
//!     the moment the tracer discovers it, so overlapping anchors never fold
//!     the same cell into two components.
//!   - A chunk that fails is logged and skipped; the pass goes on.
//!   - Scanning is read-only. Persisting an outcome is the caller's job.

use crate::{
    audit::{AuditFilter, AuditService, Verdict},
    config::MapperConfig,
    error::MapResult,
    host::VoxelHost,
    model::{NetworkSummary, RailLine, Station, TrackCell, TrackType},
    sequencer::sequence,
    simplifier::simplify,
    tracer::trace,
    types::{CellPos, ChunkPos, WorldName, CHUNK_SIZE},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScanMode {
    /// Chunks within `radius_chunks` of riders and stations.
    Anchored { radius_chunks: u32 },
    /// Every loaded chunk.
    Full,
}

/// Dedup state for one scan invocation of one world. Never persisted.
#[derive(Debug, Default)]
struct ScanPassState {
    visited_chunks: HashSet<ChunkPos>,
    traced:         HashSet<CellPos>,
    rejected:       HashSet<CellPos>,
    accepted:       HashMap<CellPos, (TrackType, Option<String>)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub world:          WorldName,
    pub mode:           ScanMode,
    pub chunks_scanned: usize,
    pub chunks_failed:  usize,
    pub cells_accepted: usize,
    pub cells_rejected: usize,
    pub components:     usize,
    pub lines:          usize,
}

/// Everything one pass discovered in one world.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub world:      WorldName,
    /// Accepted cells grouped by component, components in discovery order.
    pub components: Vec<Vec<TrackCell>>,
    pub lines:      Vec<RailLine>,
    pub summary:    ScanSummary,
}

impl ScanOutcome {
    /// The raw inventory: every accepted cell, in discovery order.
    pub fn cells(&self) -> impl Iterator<Item = &TrackCell> {
        self.components.iter().flatten()
    }

    /// One summary row per persisted line.
    pub fn networks(&self) -> Vec<NetworkSummary> {
        self.lines
            .iter()
            .map(|line| {
                let members = self
                    .cells()
                    .filter(|c| c.network_id == Some(line.network_id));
                let mut builders: BTreeMap<&str, u32> = BTreeMap::new();
                let mut cell_count = 0u32;
                for cell in members {
                    cell_count += 1;
                    if let Some(p) = &cell.placer {
                        *builders.entry(p.as_str()).or_default() += 1;
                    }
                }
                // Highest count wins; BTreeMap order breaks ties by name.
                let main_builder = builders
                    .iter()
                    .fold(None::<(&str, u32)>, |best, (&name, &n)| match best {
                        Some((_, best_n)) if best_n >= n => best,
                        _ => Some((name, n)),
                    })
                    .map(|(name, _)| name.to_string());
                NetworkSummary {
                    world: self.world.clone(),
                    network_id: line.network_id,
                    cell_count,
                    vertex_count: line.vertices.len() as u32,
                    main_builder,
                    color: line.color.clone(),
                }
            })
            .collect()
    }
}

pub struct RegionScanner<'a> {
    host:   &'a dyn VoxelHost,
    audit:  Option<&'a dyn AuditService>,
    config: &'a MapperConfig,
    now:    DateTime<Utc>,
}

impl<'a> RegionScanner<'a> {
    pub fn new(
        host: &'a dyn VoxelHost,
        audit: Option<&'a dyn AuditService>,
        config: &'a MapperConfig,
    ) -> Self {
        Self { host, audit, config, now: Utc::now() }
    }

    /// Pin the clock used for placement age checks.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Chunks of occupied entities and of stations in `world`, sorted.
    pub fn anchors_for(&self, world: &str, stations: &[Station]) -> MapResult<Vec<ChunkPos>> {
        let mut anchors = BTreeSet::new();
        for entity in self.host.entities(world)? {
            if !entity.riders.is_empty() {
                anchors.insert(ChunkPos::containing(entity.position[0], entity.position[2]));
            }
        }
        for station in stations.iter().filter(|s| s.world == world) {
            anchors.insert(station.pos.chunk());
        }
        Ok(anchors.into_iter().collect())
    }

    /// Scan the chunks within `radius_chunks` (Chebyshev) of each anchor.
    pub fn scan_region(
        &self,
        world: &str,
        anchors: &[ChunkPos],
        radius_chunks: u32,
    ) -> MapResult<ScanOutcome> {
        let chunks: Vec<ChunkPos> = anchors
            .iter()
            .flat_map(|a| a.square_around(radius_chunks))
            .collect();
        self.scan_chunks(world, chunks, ScanMode::Anchored { radius_chunks })
    }

    /// Scan every chunk the host currently has loaded.
    pub fn scan_full(&self, world: &str) -> MapResult<ScanOutcome> {
        let mut chunks = self.host.loaded_chunks(world)?;
        chunks.sort();
        self.scan_chunks(world, chunks, ScanMode::Full)
    }

    /// Resolve anchors for `mode` and scan.
    pub fn scan_world(&self, world: &str, mode: ScanMode, stations: &[Station]) -> MapResult<ScanOutcome> {
        match mode {
            ScanMode::Full => self.scan_full(world),
            ScanMode::Anchored { radius_chunks } => {
                let anchors = self.anchors_for(world, stations)?;
                log::info!("scan {world}: {} anchor chunk(s), radius {radius_chunks}", anchors.len());
                self.scan_region(world, &anchors, radius_chunks)
            }
        }
    }

    fn scan_chunks(
        &self,
        world: &str,
        chunks: Vec<ChunkPos>,
        mode: ScanMode,
    ) -> MapResult<ScanOutcome> {
        let bounds = self.host.vertical_bounds(world)?;
        let mut state = ScanPassState::default();
        let mut filter = AuditFilter::new(self.audit, &self.config.audit, self.now);
        let mut components: Vec<Vec<CellPos>> = Vec::new();
        let mut chunks_failed = 0usize;

        for chunk in chunks {
            if !state.visited_chunks.insert(chunk) {
                continue;
            }
            match self.scan_chunk(world, chunk, bounds, &mut state, &mut filter, &mut components) {
                Ok(found) => {
                    if found > 0 {
                        log::debug!("scan {world}: chunk {chunk} seeded {found} component(s)");
                    }
                }
                Err(e) => {
                    chunks_failed += 1;
                    log::warn!("scan {world}: skipping chunk {chunk}: {e}");
                }
            }
        }

        let outcome = self.assemble(world, mode, &state, components, chunks_failed);
        log::info!(
            "scan {world} done: {} chunk(s), {} cell(s), {} component(s), {} line(s), {} rejected, {} failed chunk(s)",
            outcome.summary.chunks_scanned,
            outcome.summary.cells_accepted,
            outcome.summary.components,
            outcome.summary.lines,
            outcome.summary.cells_rejected,
            outcome.summary.chunks_failed,
        );
        Ok(outcome)
    }

    /// Returns how many components this chunk seeded.
    fn scan_chunk(
        &self,
        world: &str,
        chunk: ChunkPos,
        (min_y, max_y): (i32, i32),
        state: &mut ScanPassState,
        filter: &mut AuditFilter<'_>,
        components: &mut Vec<Vec<CellPos>>,
    ) -> MapResult<usize> {
        self.host.load_chunk(world, chunk)?;
        let host = self.host;
        let ScanPassState { traced, rejected, accepted, .. } = state;
        let mut seeded = 0;

        let mut is_accepted_track = |pos: CellPos| -> bool {
            if accepted.contains_key(&pos) {
                return true;
            }
            if rejected.contains(&pos) {
                return false;
            }
            let track_type = match host.track_at(world, pos) {
                Ok(Some(t)) => t,
                Ok(None) => return false,
                Err(e) => {
                    log::debug!("scan {world}: cannot read {pos}: {e}");
                    return false;
                }
            };
            match filter.check(world, pos) {
                Verdict::Accept { placer } => {
                    accepted.insert(pos, (track_type, placer));
                    true
                }
                Verdict::Reject(reason) => {
                    log::debug!("scan {world}: rejected {pos}: {reason:?}");
                    rejected.insert(pos);
                    false
                }
            }
        };

        for dx in 0..CHUNK_SIZE {
            for dz in 0..CHUNK_SIZE {
                for y in min_y..max_y {
                    let pos = CellPos::new(chunk.min_x() + dx, y, chunk.min_z() + dz);
                    if traced.contains(&pos) {
                        continue;
                    }
                    if host.track_at(world, pos)?.is_none() {
                        continue;
                    }
                    let component = trace(pos, &mut is_accepted_track, traced);
                    if !component.is_empty() {
                        seeded += 1;
                        components.push(component);
                    }
                }
            }
        }

        Ok(seeded)
    }

    fn assemble(
        &self,
        world: &str,
        mode: ScanMode,
        state: &ScanPassState,
        components: Vec<Vec<CellPos>>,
        chunks_failed: usize,
    ) -> ScanOutcome {
        let threshold = self.config.scan.connectivity_threshold;
        let mut next_id = 0u32;
        let mut lines = Vec::new();
        let mut grouped = Vec::with_capacity(components.len());

        for component in &components {
            let vertices = simplify(&sequence(component, threshold));
            let network_id = if vertices.len() >= 2 {
                next_id += 1;
                lines.push(RailLine {
                    network_id: next_id,
                    color: self.config.render.network_color(next_id),
                    vertices,
                });
                Some(next_id)
            } else {
                None
            };

            grouped.push(
                component
                    .iter()
                    .filter_map(|pos| {
                        let (track_type, placer) = state.accepted.get(pos)?;
                        Some(TrackCell {
                            world: world.to_string(),
                            pos: *pos,
                            track_type: *track_type,
                            placer: placer.clone(),
                            network_id,
                        })
                    })
                    .collect::<Vec<_>>(),
            );
        }

        let cells_accepted = grouped.iter().map(Vec::len).sum();
        ScanOutcome {
            world: world.to_string(),
            summary: ScanSummary {
                world: world.to_string(),
                mode,
                chunks_scanned: state.visited_chunks.len() - chunks_failed,
                chunks_failed,
                cells_accepted,
                cells_rejected: state.rejected.len(),
                components: components.len(),
                lines: lines.len(),
            },
            components: grouped,
            lines,
        }
    }
}
