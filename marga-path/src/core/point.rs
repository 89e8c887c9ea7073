//! 3-D point type used by every path transform.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use crate::error::{PathError, Result};

/// Point in navmesh space (x/y horizontal, z up)
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    /// Create a new point
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Origin
    pub const ZERO: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub fn from_array(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Length of this point as a vector from origin
    #[inline]
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn distance(&self, other: &Point3) -> f32 {
        (*self - *other).length()
    }

    /// Distance on the XY plane, ignoring height
    #[inline]
    pub fn distance_2d(&self, other: &Point3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Normalize to unit length (zero vector stays zero)
    #[inline]
    pub fn normalize(&self) -> Point3 {
        let len = self.length();
        if len > 0.0 {
            *self * (1.0 / len)
        } else {
            *self
        }
    }

    #[inline]
    pub fn dot(&self, other: &Point3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Rotate around the Z axis by angle (radians, CCW)
    #[inline]
    pub fn rotate_z(&self, angle: f32) -> Point3 {
        let (sin_a, cos_a) = angle.sin_cos();
        Point3::new(
            self.x * cos_a - self.y * sin_a,
            self.x * sin_a + self.y * cos_a,
            self.z,
        )
    }

    /// Clamp every component into `[-max, max]`
    #[inline]
    pub fn truncate(&self, max: f32) -> Point3 {
        let max = max.abs();
        Point3::new(
            self.x.clamp(-max, max),
            self.y.clamp(-max, max),
            self.z.clamp(-max, max),
        )
    }

    /// Heading from this point to another on the XY plane (radians, CCW from +X)
    #[inline]
    pub fn heading_to(&self, other: &Point3) -> f32 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Point3 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Point3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl AddAssign for Point3 {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Point3 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Point3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Neg for Point3 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Point3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f32> for Point3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f32) -> Self {
        Point3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Mul<Point3> for f32 {
    type Output = Point3;

    #[inline]
    fn mul(self, point: Point3) -> Point3 {
        point * self
    }
}

// Bitwise hash; -0.0 is folded into 0.0 so equal points hash equally.
impl Hash for Point3 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for v in [self.x, self.y, self.z] {
            (v + 0.0).to_bits().hash(state);
        }
    }
}

/// Reinterpret an engine's flat `[x0, y0, z0, x1, ...]` buffer as points.
pub fn points_from_flat(flat: &[f32]) -> Result<Vec<Point3>> {
    if flat.len() % 3 != 0 {
        return Err(PathError::RaggedBuffer(flat.len()));
    }
    if let Some(idx) = flat.iter().position(|v| !v.is_finite()) {
        return Err(PathError::NonFinite(idx));
    }

    Ok(flat
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect())
}

/// Flatten points back into a coordinate buffer.
pub fn points_to_flat(points: &[Point3]) -> Vec<f32> {
    points.iter().flat_map(|p| p.to_array()).collect()
}
