//! Which cells a rail can connect to.
//!
//! Flat rails join their four cardinal neighbours; ascending rails join a
//! cardinal neighbour one block up or down. Nothing else connects.

use crate::types::CellPos;

/// The fixed 12 neighbour offsets (dx, dy, dz).
pub const NEIGHBOR_OFFSETS: [(i32, i32, i32); 12] = [
    // flat
    ( 1,  0,  0),
    (-1,  0,  0),
    ( 0,  0,  1),
    ( 0,  0, -1),
    // one block up
    ( 1,  1,  0),
    (-1,  1,  0),
    ( 0,  1,  1),
    ( 0,  1, -1),
    // one block down
    ( 1, -1,  0),
    (-1, -1,  0),
    ( 0, -1,  1),
    ( 0, -1, -1),
];

/// Every cell a rail at `cell` may connect to, in a fixed order.
pub fn neighbors(cell: CellPos) -> [CellPos; 12] {
    NEIGHBOR_OFFSETS.map(|(dx, dy, dz)| cell.offset(dx, dy, dz))
}

/// True when `b` is one of the 12 neighbours of `a`.
pub fn are_adjacent(a: CellPos, b: CellPos) -> bool {
    let d = (b.x - a.x, b.y - a.y, b.z - a.z);
    NEIGHBOR_OFFSETS.contains(&d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn twelve_distinct_neighbours() {
        let origin = CellPos::new(5, 64, -3);
        let set: HashSet<CellPos> = neighbors(origin).into_iter().collect();
        assert_eq!(set.len(), 12);
        assert!(!set.contains(&origin));
    }

    #[test]
    fn adjacency_is_symmetric() {
        let a = CellPos::new(0, 10, 0);
        for b in neighbors(a) {
            assert!(are_adjacent(b, a), "{b} should see {a} as a neighbour");
        }
    }

    #[test]
    fn horizontal_diagonals_and_pure_vertical_do_not_connect() {
        let a = CellPos::new(0, 0, 0);
        assert!(!are_adjacent(a, CellPos::new(1, 0, 1)));
        assert!(!are_adjacent(a, CellPos::new(0, 1, 0)));
        assert!(!are_adjacent(a, CellPos::new(2, 0, 0)));
        assert!(!are_adjacent(a, CellPos::new(1, 2, 0)));
    }
}
