//! Orders an unordered component into a walk along the track.
//!
//! Greedy nearest neighbour: from the current cell, step to the closest
//! unused cell no further than the connectivity threshold; stop when no
//! such cell exists. Cells left behind at a fork are dropped from this
//! line's ordering. One dominant path per component is the contract.

use crate::{adjacency::are_adjacent, types::CellPos};

/// Order `cells` (given in trace order) into a path.
///
/// The walk starts from the first cell in trace order that has at most one
/// adjacent cell in the component, so a plain run is walked end to end;
/// closed loops fall back to the first traced cell. Ties between equally
/// near candidates go to the earlier traced cell, so the result is
/// deterministic for a given input order.
pub fn sequence(cells: &[CellPos], threshold: f64) -> Vec<CellPos> {
    let Some(start) = pick_start(cells) else {
        return Vec::new();
    };

    let mut used = vec![false; cells.len()];
    used[start] = true;
    let mut path = Vec::with_capacity(cells.len());
    path.push(cells[start]);

    let mut current = cells[start];
    loop {
        let mut best: Option<(usize, f64)> = None;
        for (i, &candidate) in cells.iter().enumerate() {
            if used[i] {
                continue;
            }
            let d = current.distance(candidate);
            if d > threshold {
                continue;
            }
            if best.is_none_or(|(_, best_d)| d < best_d) {
                best = Some((i, d));
            }
        }
        let Some((next, _)) = best else { break };
        used[next] = true;
        current = cells[next];
        path.push(current);
    }

    path
}

fn pick_start(cells: &[CellPos]) -> Option<usize> {
    if cells.is_empty() {
        return None;
    }
    let endpoint = cells.iter().position(|&c| {
        cells.iter().filter(|&&other| are_adjacent(c, other)).count() <= 1
    });
    Some(endpoint.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_a_straight_run_from_an_end_even_when_traced_from_the_middle() {
        let cells = vec![
            CellPos::new(2, 0, 0),
            CellPos::new(3, 0, 0),
            CellPos::new(1, 0, 0),
            CellPos::new(4, 0, 0),
            CellPos::new(0, 0, 0),
        ];
        let path = sequence(&cells, 2.5);
        assert_eq!(path.len(), 5);
        assert_eq!(path.first(), Some(&CellPos::new(4, 0, 0)));
        assert_eq!(path.last(), Some(&CellPos::new(0, 0, 0)));
    }

    #[test]
    fn empty_component_yields_empty_path() {
        assert!(sequence(&[], 2.5).is_empty());
    }

    #[test]
    fn fork_keeps_one_branch() {
        // A T junction: stem along x, branch going +z from the middle.
        let cells = vec![
            CellPos::new(0, 0, 0),
            CellPos::new(1, 0, 0),
            CellPos::new(2, 0, 0),
            CellPos::new(3, 0, 0),
            CellPos::new(4, 0, 0),
            CellPos::new(5, 0, 0),
            CellPos::new(6, 0, 0),
            CellPos::new(2, 0, 1),
            CellPos::new(2, 0, 2),
            CellPos::new(2, 0, 3),
            CellPos::new(2, 0, 4),
            CellPos::new(2, 0, 5),
        ];
        let path = sequence(&cells, 2.5);
        // Ties at the junction go to the earlier traced cell, so the stem wins.
        assert_eq!(path.len(), 7);
        assert_eq!(path.last(), Some(&CellPos::new(6, 0, 0)));
        for pair in path.windows(2) {
            assert!(pair[0].distance(pair[1]) <= 2.5);
        }
    }
}
