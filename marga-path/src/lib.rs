//! # Marga-Path: path post-processing for navmesh queries
//!
//! Geometry primitives and the transforms the Marga server applies to raw
//! engine paths before they go back to a client.
//!
//! ## Quick Start
//!
//! ```rust
//! use marga_path::core::Point3;
//! use marga_path::transform::{PathFlags, PipelineConfig, TransformPipeline};
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//!
//! let raw = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(5.0, 0.0, 0.0),
//!     Point3::new(10.0, 0.0, 0.0),
//! ];
//!
//! let pipeline = TransformPipeline::new(PipelineConfig::default());
//! let mut rng = SmallRng::seed_from_u64(7);
//! let out = pipeline.apply(raw, PathFlags::CHAIKIN, &mut rng);
//! assert_eq!(out.path.len(), 5);
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: `Point3` and angle helpers
//! - [`transform`]: Chaikin, Catmull-Rom, node reduction, steering and the
//!   pipeline that composes them

pub mod core;
pub mod error;
pub mod transform;

pub use crate::core::{Point3, points_from_flat, points_to_flat};
pub use error::{PathError, Result};
