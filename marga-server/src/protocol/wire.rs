//! Length-prefixed framing.
//!
//! ```text
//! ┌──────────────────┬─────────────────────┐
//! │ Length (4 bytes) │ Payload             │
//! │ Little-endian u32│ (Length bytes)      │
//! └──────────────────┴─────────────────────┘
//! ```
//!
//! - Frames above [`MAX_FRAME_SIZE`] close the connection, since the stream
//!   cannot be resynchronized after skipping an unknown amount of data
//! - Zero-length frames are skipped
//! - EOF or reset while waiting for a length prefix is a clean disconnect

use crate::error::{Error, Result};
use std::io::{ErrorKind, Read, Write};

/// Maximum accepted payload size (1 MiB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Size of the length prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Initial capacity for the payload buffer (largest fixed-layout request)
const INITIAL_BUFFER_CAPACITY: usize = 64;

/// Frame reader with a reusable payload buffer
pub struct FrameReader {
    buffer: Vec<u8>,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read the next non-empty frame.
    ///
    /// Returns `Ok(None)` when the peer disconnects between frames.
    pub fn read<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<Option<&[u8]>> {
        loop {
            let mut len_buf = [0u8; LENGTH_PREFIX_SIZE];
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::UnexpectedEof
                            | ErrorKind::ConnectionReset
                            | ErrorKind::ConnectionAborted
                    ) =>
                {
                    log::debug!("Peer closed before length prefix ({:?})", e.kind());
                    return Ok(None);
                }
                Err(e) => return Err(Error::Io(e)),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_FRAME_SIZE {
                return Err(Error::FrameTooLarge {
                    len,
                    max: MAX_FRAME_SIZE,
                });
            }
            if len == 0 {
                log::trace!("Skipping empty frame");
                continue;
            }

            self.buffer.clear();
            self.buffer.resize(len, 0);
            reader.read_exact(&mut self.buffer)?;
            return Ok(Some(self.buffer.as_slice()));
        }
    }
}

/// Prefix `payload` with its length.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Write one frame and flush.
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    writer.write_all(&encode_frame(payload))?;
    writer.flush()?;
    Ok(())
}
