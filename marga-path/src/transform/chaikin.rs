//! Chaikin corner cutting.
//!
//! Every edge `(Pi, Pi+1)` is replaced by the points at 1/4 and 3/4 along it.
//! Blending happens on X/Y only; each new point keeps the height of the
//! original node it sits closest to.
//!
//! The original endpoints survive every iteration, which gives `2N - 1`
//! nodes from `N` (`P0, R0, Q1, R1, .., Q(N-2), R(N-2), P(N-1)`).

use crate::core::Point3;

/// Minimum node count for corner cutting
pub const MIN_NODES: usize = 2;

/// Node count after `iterations` passes over `len` nodes, saturating at
/// `usize::MAX`.
pub fn output_len(len: usize, iterations: u32) -> usize {
    if len < MIN_NODES {
        return len;
    }
    let mut n = len;
    for _ in 0..iterations {
        match n.checked_mul(2) {
            Some(doubled) => n = doubled - 1,
            None => return usize::MAX,
        }
    }
    n
}

/// Run `iterations` passes of corner cutting.
///
/// Paths shorter than [`MIN_NODES`] are returned unchanged.
pub fn smooth(path: &[Point3], iterations: u32) -> Vec<Point3> {
    if path.len() < MIN_NODES {
        return path.to_vec();
    }

    let mut current = path.to_vec();
    for _ in 0..iterations {
        current = cut_corners(&current);
    }
    current
}

/// One corner-cutting pass.
fn cut_corners(path: &[Point3]) -> Vec<Point3> {
    let n = path.len();
    let mut out = Vec::with_capacity(2 * n - 1);
    out.push(path[0]);

    for i in 0..n - 1 {
        let p = path[i];
        let q = path[i + 1];

        // The first edge's Q would sit on top of P0's role as the anchor.
        if i > 0 {
            out.push(Point3::new(
                0.75 * p.x + 0.25 * q.x,
                0.75 * p.y + 0.25 * q.y,
                p.z,
            ));
        }
        out.push(Point3::new(
            0.25 * p.x + 0.75 * q.x,
            0.25 * p.y + 0.75 * q.y,
            q.z,
        ));
    }

    out.push(path[n - 1]);
    out
}
