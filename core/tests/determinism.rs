//! Re-scanning an unchanged world must yield the same serialized line set,
//! byte for byte. A renderer diffing consecutive exports depends on it.

mod common;

use common::{fixed_now, lay, straight_x, WORLD};
use railmap_core::{
    config::MapperConfig,
    host::MemoryHost,
    scanner::RegionScanner,
    types::CellPos,
};

fn network_world() -> MemoryHost {
    let host = common::host();
    // Main line, a ramp, a spur and an isolated cell across several chunks.
    lay(&host, WORLD, &straight_x(-20, 40, 64, 3));
    lay(&host, WORLD, &[CellPos::new(41, 65, 3), CellPos::new(42, 66, 3), CellPos::new(43, 66, 3)]);
    lay(&host, WORLD, &(4..=30).map(|z| CellPos::new(10, 64, z)).collect::<Vec<_>>());
    lay(&host, WORLD, &straight_x(100, 120, 70, -50));
    lay(&host, WORLD, &[CellPos::new(200, 64, 200)]);
    host
}

fn full_scan_json(host: &MemoryHost) -> String {
    let store = common::store();
    let config = MapperConfig::default_test();
    let outcome = RegionScanner::new(host, None, &config)
        .at(fixed_now())
        .scan_full(WORLD)
        .expect("full scan");
    store.replace_world_scan(&outcome).expect("persist");
    store.rail_lines_json(WORLD).expect("read back")
}

#[test]
fn full_rescan_is_byte_identical() {
    let host = network_world();
    let first = full_scan_json(&host);
    let second = full_scan_json(&host);
    assert!(first.len() > 2, "expected persisted lines, got {first}");
    assert_eq!(first, second, "line set diverged between scans");

    let rebuilt = full_scan_json(&network_world());
    assert_eq!(first, rebuilt, "identical worlds built separately diverged");
}

#[test]
fn rescan_in_the_same_store_is_stable() {
    let host = network_world();
    let store = common::store();
    let config = MapperConfig::default_test();
    let scanner = RegionScanner::new(&host, None, &config).at(fixed_now());

    store.replace_world_scan(&scanner.scan_full(WORLD).unwrap()).unwrap();
    let first = store.rail_lines_json(WORLD).unwrap();
    let first_networks = store.networks(WORLD).unwrap();

    store.replace_world_scan(&scanner.scan_full(WORLD).unwrap()).unwrap();
    assert_eq!(store.rail_lines_json(WORLD).unwrap(), first);
    assert_eq!(store.networks(WORLD).unwrap(), first_networks);
}
