//! Catmull-Rom spline resampling with chord-length knots.
//!
//! Each span between `P1` and `P2` uses the neighbours `P0` and `P3` as
//! control points. Knots are spaced by the Euclidean distance between
//! consecutive control points and evaluated with the Barry-Goldman pyramid
//! (three linear blends, two quadratic, one cubic).

use crate::core::Point3;

/// Minimum node count for spline resampling
pub const MIN_NODES: usize = 4;

/// Node count after resampling `len` nodes with `points_per_span` samples.
pub fn output_len(len: usize, points_per_span: u32) -> usize {
    if len < MIN_NODES {
        return len;
    }
    ((len - 3) as u64)
        .saturating_mul(u64::from(points_per_span.max(1)))
        .saturating_add(2)
        .try_into()
        .unwrap_or(usize::MAX)
}

/// Resample a path along a Catmull-Rom spline.
///
/// Paths shorter than [`MIN_NODES`] are returned unchanged. The first and
/// last input nodes anchor the output.
pub fn resample(path: &[Point3], points_per_span: u32) -> Vec<Point3> {
    if path.len() < MIN_NODES {
        return path.to_vec();
    }

    let points = points_per_span.max(1);
    let mut out = Vec::with_capacity(output_len(path.len(), points));
    out.push(path[0]);

    for i in 1..path.len() - 2 {
        let p0 = path[i - 1];
        let p1 = path[i];
        let p2 = path[i + 1];
        let p3 = path[i + 2];

        let t0 = 0.0f32;
        let t1 = t0 + p0.distance(&p1);
        let t2 = t1 + p1.distance(&p2);
        let t3 = t2 + p2.distance(&p3);

        // Coincident control points leave a knot interval of zero.
        if t1 - t0 <= f32::EPSILON || t2 - t1 <= f32::EPSILON || t3 - t2 <= f32::EPSILON {
            out.push(p1);
            continue;
        }

        let step = (t2 - t1) / points as f32;
        for j in 0..points {
            let t = t1 + step * j as f32;

            let a1 = (t1 - t) / (t1 - t0) * p0 + (t - t0) / (t1 - t0) * p1;
            let a2 = (t2 - t) / (t2 - t1) * p1 + (t - t1) / (t2 - t1) * p2;
            let a3 = (t3 - t) / (t3 - t2) * p2 + (t - t2) / (t3 - t2) * p3;

            let b1 = (t2 - t) / (t2 - t0) * a1 + (t - t0) / (t2 - t0) * a2;
            let b2 = (t3 - t) / (t3 - t1) * a2 + (t - t1) / (t3 - t1) * a3;

            out.push((t2 - t) / (t2 - t1) * b1 + (t - t1) / (t2 - t1) * b2);
        }
    }

    out.push(path[path.len() - 1]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_wave() -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(4.0, 2.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn test_output_len_saturates() {
        assert_eq!(output_len(5, 4), 10);
        assert!(output_len(usize::MAX, u32::MAX) >= u32::MAX as usize);
    }

    #[test]
    fn test_short_path_unchanged() {
        let path = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ];
        assert_eq!(resample(&path, 8), path);
    }

    #[test]
    fn test_anchors_preserved() {
        let path = square_wave();
        let out = resample(&path, 4);
        assert_eq!(out[0], path[0]);
        assert_eq!(*out.last().unwrap(), path[4]);
        assert_eq!(out.len(), output_len(path.len(), 4));
    }

    #[test]
    fn test_span_starts_on_control_point() {
        let path = square_wave();
        let out = resample(&path, 4);
        // First sample of the first span is P1 itself
        assert!(out[1].distance(&path[1]) < 1e-5);
        // First sample of the second span is P2
        assert!(out[5].distance(&path[2]) < 1e-5);
    }

    #[test]
    fn test_collinear_points_stay_on_line() {
        let path: Vec<Point3> = (0..5).map(|i| Point3::new(i as f32, 0.0, 0.0)).collect();
        let out = resample(&path, 5);
        for p in &out {
            assert!(p.y.abs() < 1e-5);
            assert!(p.x >= 0.0 && p.x <= 4.0);
        }
    }

    #[test]
    fn test_duplicate_points_do_not_produce_nan() {
        let path = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let out = resample(&path, 4);
        assert!(out.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_zero_points_treated_as_one() {
        let path = square_wave();
        assert_eq!(resample(&path, 0).len(), output_len(path.len(), 1));
    }
}
