//! Core geometry types.

mod math;
mod point;

pub use math::{heading, interior_angle, normalize_angle};
pub use point::{Point3, points_from_flat, points_to_flat};
