//! Navmesh engine seam.
//!
//! The engine answers geometric queries against loaded maps. Implementations
//! are not required to be reentrant: callers go through
//! [`MapAccess`](crate::map_access::MapAccess), which serializes every call.

mod grid;

pub use grid::{GridEngineConfig, GridMap, GridNavEngine};

use marga_path::PathError;
use marga_path::core::Point3;
use thiserror::Error;

/// Engine result type alias
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Engine error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// No data file for this map id
    #[error("Map {0:03} not found")]
    MapNotFound(i32),

    /// Map data could not be parsed or is inconsistent
    #[error("Map {map_id:03} is invalid: {reason}")]
    InvalidMap { map_id: i32, reason: String },

    /// Query against a map that was never loaded
    #[error("Map {0:03} is not loaded")]
    MapNotLoaded(i32),

    /// Query position is outside the map
    #[error("Position ({:.2}, {:.2}, {:.2}) is outside the map", .0.x, .0.y, .0.z)]
    OutOfBounds(Point3),

    #[error("No path between the requested points")]
    NoPath,

    #[error("No walkable point found")]
    NoPoint,

    /// Engine produced a malformed coordinate buffer
    #[error("Invalid path buffer: {0}")]
    BadPath(#[from] PathError),
}

/// Navigation queries against loaded maps.
pub trait NavEngine: Send {
    /// Load map data for `map_id`.
    fn load_map(&mut self, map_id: i32) -> EngineResult<()>;

    /// Walkable path from `start` to `end` as a flat `[x, y, z, ...]` buffer.
    fn find_path(&mut self, map_id: i32, start: Point3, end: Point3) -> EngineResult<Vec<f32>>;

    /// Slide from `start` toward `end` along the surface, returning where the
    /// walk stops.
    fn move_along_surface(&mut self, map_id: i32, start: Point3, end: Point3)
    -> EngineResult<Point3>;

    /// `true` when the segment from `start` to `end` is unobstructed.
    fn cast_ray(&mut self, map_id: i32, start: Point3, end: Point3) -> EngineResult<bool>;

    /// Random walkable point anywhere on the map.
    fn random_point(&mut self, map_id: i32) -> EngineResult<Point3>;

    /// Random walkable point within `radius` of `center`.
    fn random_point_around(
        &mut self,
        map_id: i32,
        center: Point3,
        radius: f32,
    ) -> EngineResult<Point3>;
}
