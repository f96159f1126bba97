//! Tracer, sequencer and simplifier working together.

mod common;

use railmap_core::{
    adjacency::are_adjacent,
    sequencer::sequence,
    simplifier::simplify,
    tracer::trace,
    types::CellPos,
};
use std::collections::{BTreeSet, HashSet};

const THRESHOLD: f64 = 2.5;

fn pipeline(cells: &[CellPos], seed: CellPos) -> (Vec<CellPos>, Vec<CellPos>, Vec<CellPos>) {
    let set: HashSet<CellPos> = cells.iter().copied().collect();
    let mut visited = HashSet::new();
    let component = trace(seed, |p| set.contains(&p), &mut visited);
    let ordered = sequence(&component, THRESHOLD);
    let vertices = simplify(&ordered);
    (component, ordered, vertices)
}

/// Acceptance example: five cells along x collapse to their two ends.
#[test]
fn straight_line_simplifies_to_two_vertices() {
    let cells = common::straight_x(0, 4, 64, 0);
    let (_, _, vertices) = pipeline(&cells, CellPos::new(0, 64, 0));
    assert_eq!(vertices, vec![CellPos::new(0, 64, 0), CellPos::new(4, 64, 0)]);
}

/// An L-shaped run keeps its corner.
#[test]
fn l_shape_keeps_the_corner() {
    let mut cells = common::straight_x(0, 3, 64, 0);
    cells.extend((1..=3).map(|z| CellPos::new(3, 64, z)));
    let (_, _, vertices) = pipeline(&cells, CellPos::new(0, 64, 0));
    assert_eq!(
        vertices,
        vec![CellPos::new(0, 64, 0), CellPos::new(3, 64, 0), CellPos::new(3, 64, 3)]
    );
}

/// Ramps are adjacent across one block of height and keep their bends.
#[test]
fn ramp_is_traced_as_one_component() {
    let cells = vec![
        CellPos::new(0, 64, 0),
        CellPos::new(1, 64, 0),
        CellPos::new(2, 65, 0),
        CellPos::new(3, 66, 0),
        CellPos::new(4, 66, 0),
    ];
    let (component, _, vertices) = pipeline(&cells, CellPos::new(2, 65, 0));
    assert_eq!(component.len(), 5);
    assert_eq!(vertices.first(), Some(&CellPos::new(0, 64, 0)));
    assert_eq!(vertices.last(), Some(&CellPos::new(4, 66, 0)));
    assert_eq!(vertices.len(), 4, "flat, climb, flat: {vertices:?}");
}

/// Consecutive path steps never exceed the connectivity threshold.
#[test]
fn sequenced_steps_stay_within_threshold() {
    let mut cells = common::straight_x(0, 10, 64, 0);
    cells.extend((1..=6).map(|z| CellPos::new(10, 64 + z.min(3), z)));
    let (_, ordered, _) = pipeline(&cells, CellPos::new(5, 64, 0));
    for pair in ordered.windows(2) {
        let d = pair[0].distance(pair[1]);
        assert!(d <= THRESHOLD, "step {} -> {} is {d:.3}", pair[0], pair[1]);
    }
}

/// Simplifier output keeps endpoints, never grows, and is a fixed point.
#[test]
fn simplifier_properties_hold_on_a_zigzag() {
    let mut path = Vec::new();
    for i in 0..12 {
        path.push(CellPos::new(i, 64, (i / 3) % 2));
    }
    let once = simplify(&path);
    assert!(once.len() <= path.len());
    assert_eq!(once.first(), path.first());
    assert_eq!(once.last(), path.last());
    assert_eq!(simplify(&once), once, "simplify must be idempotent");
}

/// Two disjoint components traced with a shared visited set never share a cell,
/// and together cover every track cell.
#[test]
fn shared_visited_set_partitions_cells() {
    let a = common::straight_x(0, 5, 64, 0);
    let b = common::straight_x(0, 5, 64, 10);
    let all: HashSet<CellPos> = a.iter().chain(b.iter()).copied().collect();

    let mut visited = HashSet::new();
    let mut components = Vec::new();
    for &seed in a.iter().chain(b.iter()) {
        let c = trace(seed, |p| all.contains(&p), &mut visited);
        if !c.is_empty() {
            components.push(c);
        }
    }

    assert_eq!(components.len(), 2);
    let mut seen = BTreeSet::new();
    for c in &components {
        for &cell in c {
            assert!(seen.insert(cell), "{cell} appears in two components");
        }
    }
    assert_eq!(seen.len(), all.len());
}

/// Every traced component is connected under the 12-neighbour rule.
#[test]
fn traced_cells_are_reachable_through_adjacency() {
    let mut cells = common::straight_x(0, 4, 64, 0);
    cells.push(CellPos::new(5, 65, 0));
    cells.push(CellPos::new(7, 64, 0)); // gap of two: separate component
    let set: HashSet<CellPos> = cells.iter().copied().collect();
    let mut visited = HashSet::new();
    let component = trace(CellPos::new(0, 64, 0), |p| set.contains(&p), &mut visited);

    assert_eq!(component.len(), 6);
    assert!(!component.contains(&CellPos::new(7, 64, 0)));
    for &cell in &component[1..] {
        assert!(
            component.iter().any(|&other| are_adjacent(cell, other)),
            "{cell} has no neighbour in its component"
        );
    }
}
