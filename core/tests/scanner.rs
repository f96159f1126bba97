//! Region scanner: anchors, dedup, failures and audit filtering.

mod common;

use chrono::Duration;
use common::{cart, fixed_now, host, lay, ridden_by, straight_x, WORLD};
use railmap_core::{
    audit::MemoryAuditLog,
    config::MapperConfig,
    error::MapError,
    model::Station,
    scanner::{RegionScanner, ScanMode},
    types::{CellPos, ChunkPos},
};
use std::collections::BTreeSet;

#[test]
fn overlapping_anchor_windows_trace_each_cell_once() {
    common::init_logging();
    let host = host();
    let line = straight_x(0, 20, 64, 5);
    lay(&host, WORLD, &line);
    host.spawn_entity(WORLD, cart(1, [2.5, 64.0, 5.5], [0.1, 0.0, 0.0], ridden_by("alice")));
    host.spawn_entity(WORLD, cart(2, [18.5, 64.0, 5.5], [0.0, 0.0, 0.0], ridden_by("bob")));

    let config = MapperConfig::default_test();
    let scanner = RegionScanner::new(&host, None, &config).at(fixed_now());
    let anchors = scanner.anchors_for(WORLD, &[]).unwrap();
    assert_eq!(anchors, vec![ChunkPos::new(0, 0), ChunkPos::new(1, 0)]);

    let outcome = scanner.scan_region(WORLD, &anchors, 1).unwrap();
    assert_eq!(outcome.summary.chunks_scanned, 12, "4x3 distinct chunks around two anchors");
    assert_eq!(outcome.summary.components, 1);
    assert_eq!(outcome.lines.len(), 1);

    let cells: Vec<CellPos> = outcome.cells().map(|c| c.pos).collect();
    let unique: BTreeSet<CellPos> = cells.iter().copied().collect();
    assert_eq!(cells.len(), unique.len(), "a cell was traced twice");
    assert_eq!(unique, line.iter().copied().collect());
    assert_eq!(
        outcome.lines[0].vertices,
        vec![CellPos::new(0, 64, 5), CellPos::new(20, 64, 5)]
    );
}

#[test]
fn unoccupied_entities_are_not_anchors_but_stations_are() {
    let host = host();
    lay(&host, WORLD, &straight_x(160, 165, 64, 160));
    host.spawn_entity(WORLD, cart(1, [161.0, 64.0, 160.0], [0.0; 3], Vec::new()));

    let config = MapperConfig::default_test();
    let scanner = RegionScanner::new(&host, None, &config).at(fixed_now());
    let nothing = scanner.scan_world(WORLD, ScanMode::Anchored { radius_chunks: 1 }, &[]).unwrap();
    assert_eq!(nothing.summary.cells_accepted, 0);

    let station = Station {
        world:      WORLD.into(),
        pos:        CellPos::new(163, 64, 161),
        name:       "Far End".into(),
        created_by: None,
    };
    let found = scanner
        .scan_world(WORLD, ScanMode::Anchored { radius_chunks: 0 }, &[station])
        .unwrap();
    assert_eq!(found.summary.cells_accepted, 6);
    assert_eq!(found.lines.len(), 1);
}

#[test]
fn failing_chunk_is_skipped_and_the_rest_still_scans() {
    common::init_logging();
    let host = host();
    lay(&host, WORLD, &straight_x(0, 4, 64, 0));
    lay(&host, WORLD, &straight_x(48, 52, 64, 0));
    host.fail_chunk(WORLD, ChunkPos::new(3, 0));

    let config = MapperConfig::default_test();
    let outcome = RegionScanner::new(&host, None, &config)
        .at(fixed_now())
        .scan_full(WORLD)
        .unwrap();

    assert_eq!(outcome.summary.chunks_failed, 1);
    assert_eq!(outcome.summary.chunks_scanned, 1);
    assert_eq!(outcome.lines.len(), 1);
    assert!(outcome.cells().all(|c| c.pos.x <= 4));
}

#[test]
fn isolated_cell_stays_in_inventory_without_a_line() {
    let host = host();
    lay(&host, WORLD, &straight_x(0, 4, 64, 0));
    lay(&host, WORLD, &[CellPos::new(10, 64, 10)]);

    let config = MapperConfig::default_test();
    let outcome = RegionScanner::new(&host, None, &config)
        .at(fixed_now())
        .scan_full(WORLD)
        .unwrap();

    assert_eq!(outcome.summary.cells_accepted, 6);
    assert_eq!(outcome.summary.components, 2);
    assert_eq!(outcome.lines.len(), 1);
    let lone = outcome
        .cells()
        .find(|c| c.pos == CellPos::new(10, 64, 10))
        .expect("isolated cell in inventory");
    assert_eq!(lone.network_id, None);
    assert_eq!(outcome.lines[0].network_id, 1);
}

#[test]
fn player_only_policy_rejects_natural_and_accepts_named_players() {
    let host = host();
    let natural = straight_x(0, 4, 64, 0);
    let built = straight_x(0, 4, 64, 8);
    lay(&host, WORLD, &natural);
    lay(&host, WORLD, &built);

    let audit = MemoryAuditLog::new();
    let placed_at = fixed_now() - Duration::days(3);
    for &c in &natural {
        audit.record(WORLD, c, "#natural", placed_at);
    }
    for &c in &built {
        audit.record(WORLD, c, "alice", placed_at);
    }

    let mut config = MapperConfig::default_test();
    config.audit.enabled = true;
    config.audit.player_placed_only = true;

    let outcome = RegionScanner::new(&host, Some(&audit), &config)
        .at(fixed_now())
        .scan_full(WORLD)
        .unwrap();

    assert_eq!(outcome.summary.cells_accepted, 5);
    assert_eq!(outcome.summary.cells_rejected, 5);
    assert!(outcome.cells().all(|c| c.placer.as_deref() == Some("alice")));

    let networks = outcome.networks();
    assert_eq!(networks.len(), 1);
    assert_eq!(networks[0].main_builder.as_deref(), Some("alice"));
    assert_eq!(networks[0].cell_count, 5);
}

#[test]
fn audit_outage_degrades_to_accept_all() {
    common::init_logging();
    let host = host();
    lay(&host, WORLD, &straight_x(0, 4, 64, 0));
    let audit = MemoryAuditLog::new();
    audit.set_failing(true);

    let mut config = MapperConfig::default_test();
    config.audit.enabled = true;
    config.audit.player_placed_only = true;

    let outcome = RegionScanner::new(&host, Some(&audit), &config)
        .at(fixed_now())
        .scan_full(WORLD)
        .unwrap();
    assert_eq!(outcome.summary.cells_accepted, 5);
    assert_eq!(outcome.summary.cells_rejected, 0);
}

#[test]
fn unknown_world_is_reported() {
    let host = host();
    let config = MapperConfig::default_test();
    let err = RegionScanner::new(&host, None, &config)
        .scan_full("nether")
        .unwrap_err();
    assert!(matches!(err, MapError::WorldNotFound { .. }), "got {err:?}");
}
