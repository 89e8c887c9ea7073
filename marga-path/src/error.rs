//! Error types for Marga-Path

use thiserror::Error;

/// Path construction errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    /// Flat coordinate buffer does not hold whole points
    #[error("Coordinate buffer of {0} floats is not a multiple of 3")]
    RaggedBuffer(usize),

    /// Coordinate buffer contains NaN or infinity
    #[error("Non-finite coordinate at index {0}")]
    NonFinite(usize),
}

pub type Result<T> = std::result::Result<T, PathError>;
