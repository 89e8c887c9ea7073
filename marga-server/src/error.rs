//! Error types for the Marga server

use crate::engine::EngineError;
use crate::protocol::ProtocolError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Marga server error types
#[derive(Error, Debug)]
pub enum Error {
    /// Socket or file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed request payload
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Navmesh engine failure
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Declared frame length exceeds the limit
    #[error("Frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    /// Request dispatch panicked
    #[error("Handler panicked: {0}")]
    HandlerPanic(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl Error {
    /// Peer went away at a frame boundary or mid-read, or stalled past a
    /// socket timeout.
    pub fn is_disconnect(&self) -> bool {
        self.is_timeout()
            || matches!(
                self,
                Error::Io(e) if matches!(
                    e.kind(),
                    std::io::ErrorKind::UnexpectedEof
                        | std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::ConnectionAborted
                        | std::io::ErrorKind::BrokenPipe
                )
            )
    }

    /// Socket read or write timeout expired. Unix reports `WouldBlock`,
    /// Windows `TimedOut`.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Io(e) if matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, ErrorKind};

    #[test]
    fn test_disconnect_classification() {
        for kind in [
            ErrorKind::UnexpectedEof,
            ErrorKind::ConnectionReset,
            ErrorKind::BrokenPipe,
            ErrorKind::WouldBlock,
            ErrorKind::TimedOut,
        ] {
            assert!(Error::Io(io::Error::from(kind)).is_disconnect(), "{:?}", kind);
        }
        assert!(Error::Io(io::Error::from(ErrorKind::TimedOut)).is_timeout());
        assert!(!Error::Io(io::Error::from(ErrorKind::ConnectionReset)).is_timeout());
        assert!(!Error::Io(io::Error::from(ErrorKind::PermissionDenied)).is_disconnect());
        assert!(!Error::HandlerPanic("boom".to_string()).is_disconnect());
    }
}
