//! Seeded demo world for headless runs.
//!
//! Same seed, same world: every draw comes from one Pcg64Mcg stream.

use chrono::{Duration, Utc};
use railmap_core::{
    audit::MemoryAuditLog,
    host::{MemoryHost, MemoryWorld, ObservedEntity, Rider},
    model::TrackType,
    types::CellPos,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use uuid::Uuid;

pub const DEMO_WORLD: &str = "world";

const MIN_Y: i32 = 0;
const MAX_Y: i32 = 128;
const LINES: usize = 6;
const BUILDERS: [&str; 5] = ["alice", "bob", "carol", "#natural", "WorldEdit"];
const HEADINGS: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

pub struct DemoWorld {
    pub host:  MemoryHost,
    pub audit: MemoryAuditLog,
}

pub fn generate(seed: u64) -> DemoWorld {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let host = MemoryHost::new();
    host.add_world(DEMO_WORLD, MemoryWorld::new(MIN_Y, MAX_Y));
    let audit = MemoryAuditLog::new();
    let now = Utc::now();

    for _ in 0..LINES {
        let builder = BUILDERS[rng.gen_range(0..BUILDERS.len())];
        let placed_at = now - Duration::days(rng.gen_range(0..60));
        let cells = random_walk(&mut rng);
        for &pos in &cells {
            let track_type = if rng.gen_bool(0.1) { TrackType::PoweredRail } else { TrackType::Plain };
            host.set_rail(DEMO_WORLD, pos, track_type);
            audit.record(DEMO_WORLD, pos, builder, placed_at);
        }

        if let Some(entity) = cart_on(&mut rng, &cells) {
            host.spawn_entity(DEMO_WORLD, entity);
        }
    }

    DemoWorld { host, audit }
}

fn random_walk(rng: &mut Pcg64Mcg) -> Vec<CellPos> {
    let mut pos = CellPos::new(rng.gen_range(-96..96), 64, rng.gen_range(-96..96));
    let mut heading = HEADINGS[rng.gen_range(0..HEADINGS.len())];
    let length = rng.gen_range(16..64);
    let mut cells = vec![pos];

    for _ in 0..length {
        if rng.gen_bool(0.12) {
            heading = HEADINGS[rng.gen_range(0..HEADINGS.len())];
        }
        let dy = match rng.gen_range(0..10) {
            0 if pos.y + 1 < MAX_Y => 1,
            1 if pos.y > MIN_Y => -1,
            _ => 0,
        };
        pos = pos.offset(heading.0, dy, heading.1);
        cells.push(pos);
    }
    cells
}

fn cart_on(rng: &mut Pcg64Mcg, cells: &[CellPos]) -> Option<ObservedEntity> {
    if cells.is_empty() || !rng.gen_bool(0.7) {
        return None;
    }
    let at = cells[rng.gen_range(0..cells.len())];
    let riders = if rng.gen_bool(0.5) {
        vec![Rider::Player(BUILDERS[rng.gen_range(0..3)].to_string())]
    } else {
        Vec::new()
    };
    Some(ObservedEntity {
        id:       Uuid::from_u128(rng.gen()),
        position: [f64::from(at.x) + 0.5, f64::from(at.y), f64::from(at.z) + 0.5],
        velocity: [rng.gen_range(-0.4..0.4), 0.0, rng.gen_range(-0.4..0.4)],
        riders,
    })
}
