//! Run-length compression of an ordered cell path into a polyline.
//!
//! The step between consecutive cells is reduced to its per-axis sign.
//! A cell is kept when it is the first, the last, or the step into it
//! differs from the step out of it. No interpolation: every kept vertex is
//! an input cell.

use crate::types::CellPos;

pub fn simplify(ordered: &[CellPos]) -> Vec<CellPos> {
    let mut cells: Vec<CellPos> = Vec::with_capacity(ordered.len());
    for &c in ordered {
        if cells.last() != Some(&c) {
            cells.push(c);
        }
    }
    if cells.len() <= 2 {
        return cells;
    }

    let mut out = Vec::new();
    out.push(cells[0]);
    for w in cells.windows(3) {
        let (prev, here, next) = (w[0], w[1], w[2]);
        if prev.step_sign(here) != here.step_sign(next) {
            out.push(here);
        }
    }
    out.push(cells[cells.len() - 1]);
    out
}
