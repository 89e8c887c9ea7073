//! Binary request/response protocol.
//!
//! Every message travels as a length-prefixed frame (see [`wire`]). The first
//! four payload bytes of a request carry its tag; the rest is a fixed layout
//! of little-endian fields (see [`messages`]).

pub mod messages;
pub mod wire;

pub use messages::{
    MessageKind, MovementType, PathRequest, ProtocolError, RandomPointRequest, Request, Response,
};
pub use wire::{FrameReader, MAX_FRAME_SIZE, write_frame};
