//! Path post-processing.
//!
//! This module provides:
//! - Chaikin corner cutting
//! - Catmull-Rom resampling with chord-length knots
//! - Node reduction for near-collinear runs
//! - Steering displacement with a caller-owned RNG
//! - [`TransformPipeline`] composing them in a fixed order

pub mod catmull_rom;
pub mod chaikin;
pub mod node_reduction;
mod pipeline;
pub mod steering;

pub use pipeline::{PipelineConfig, TransformPipeline, Transformed};
pub use steering::{Obstacle, SteeringConfig};

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Set of transform stages.
///
/// The low two bits travel on the wire; the rest are enabled server-side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PathFlags(u32);

impl PathFlags {
    pub const NONE: Self = Self(0);
    pub const CHAIKIN: Self = Self(1 << 0);
    pub const CATMULL_ROM: Self = Self(1 << 1);
    pub const NODE_REDUCTION: Self = Self(1 << 2);
    pub const STEERING: Self = Self(1 << 3);

    /// Bits a client may set
    pub const WIRE_MASK: u32 = Self::CHAIKIN.0 | Self::CATMULL_ROM.0;

    /// Keep only the client-settable bits, dropping unknown ones.
    pub const fn from_wire(bits: u32) -> Self {
        Self(bits & Self::WIRE_MASK)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for PathFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PathFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for PathFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(PathFlags, &str); 4] = [
            (PathFlags::CHAIKIN, "chaikin"),
            (PathFlags::CATMULL_ROM, "catmull-rom"),
            (PathFlags::NODE_REDUCTION, "node-reduction"),
            (PathFlags::STEERING, "steering"),
        ];

        if self.is_empty() {
            return write!(f, "none");
        }

        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}
