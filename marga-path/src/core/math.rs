//! Angle helpers shared by the transforms.

use std::f32::consts::PI;

use super::Point3;

/// Normalize angle to [-pi, pi].
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle;
    while a > PI {
        a -= 2.0 * PI;
    }
    while a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Planar heading from `from` to `to`.
#[inline]
pub fn heading(from: &Point3, to: &Point3) -> f32 {
    from.heading_to(to)
}

/// Interior angle at `b` of the planar triangle `a, b, c` (radians).
///
/// Returns `None` when either leg at `b` has zero length.
pub fn interior_angle(a: &Point3, b: &Point3, c: &Point3) -> Option<f32> {
    let ab = a.distance_2d(b);
    let bc = b.distance_2d(c);
    if ab <= f32::EPSILON || bc <= f32::EPSILON {
        return None;
    }
    let ac = a.distance_2d(c);

    let cos_b = ((ab * ab + bc * bc - ac * ac) / (2.0 * ab * bc)).clamp(-1.0, 1.0);
    Some(cos_b.acos())
}
