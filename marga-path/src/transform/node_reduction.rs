//! Pruning of near-collinear waypoints.

use crate::core::{Point3, heading, normalize_angle};

/// Minimum node count for reduction (nothing interior to drop below this)
pub const MIN_NODES: usize = 3;

/// Default bearing change threshold (radians)
pub const DEFAULT_MIN_ANGLE: f32 = 0.2;

/// Drop interior nodes whose bearing change is at most `min_angle`.
///
/// The incoming bearing is measured from the last kept node, so a long run of
/// slightly wobbling nodes collapses instead of drifting. First and last
/// nodes are always kept.
pub fn reduce(path: &[Point3], min_angle: f32) -> Vec<Point3> {
    if path.len() < MIN_NODES {
        return path.to_vec();
    }

    let mut out = Vec::with_capacity(path.len());
    out.push(path[0]);

    for i in 1..path.len() - 1 {
        let last_kept = out[out.len() - 1];
        let current = path[i];
        let next = path[i + 1];

        // Duplicate nodes carry no bearing
        if current.distance_2d(&last_kept) <= f32::EPSILON
            || current.distance_2d(&next) <= f32::EPSILON
        {
            continue;
        }

        let incoming = heading(&last_kept, &current);
        let outgoing = heading(&current, &next);
        let turn = normalize_angle(outgoing - incoming).abs();

        if turn > min_angle {
            out.push(current);
        }
    }

    out.push(path[path.len() - 1]);
    out
}
