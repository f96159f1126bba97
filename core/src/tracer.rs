//! Connected-component tracing over the rail adjacency rule.
//!
//! Iterative, stack driven: a track run of any length never grows the call
//! stack. The `visited` set is shared across a whole scan pass; a cell is
//! inserted exactly once, at first discovery, which is what guarantees no
//! cell lands in two components of the same pass.

use crate::{adjacency::neighbors, types::CellPos};
use std::collections::HashSet;

/// Collect the component reachable from `seed`, in discovery order.
///
/// Returns an empty vec when `seed` was already visited or is not track.
/// Every returned cell has been inserted into `visited`.
pub fn trace<F>(seed: CellPos, mut is_track: F, visited: &mut HashSet<CellPos>) -> Vec<CellPos>
where
    F: FnMut(CellPos) -> bool,
{
    if visited.contains(&seed) || !is_track(seed) {
        return Vec::new();
    }

    visited.insert(seed);
    let mut component = vec![seed];
    let mut stack = vec![seed];

    while let Some(current) = stack.pop() {
        for next in neighbors(current) {
            if visited.contains(&next) || !is_track(next) {
                continue;
            }
            visited.insert(next);
            component.push(next);
            stack.push(next);
        }
    }

    component
}
