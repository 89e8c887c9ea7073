//! Request and response messages.
//!
//! # Request layouts
//!
//! All fields are little-endian; `i32` unless noted.
//!
//! | Kind | Size | Layout (offset: field) |
//! |------|------|------------------------|
//! | KeepAlive | ≥ 4 | 0: tag |
//! | Path | 40 | 0: tag, 4/8/12: start (f32), 16/20/24: end (f32), 28: map id, 32: flags, 36: movement type |
//! | RandomPoint | 24 | 0: tag, 4: map id, 8/12/16: start (f32), 20: max radius (f32) |
//!
//! # Responses
//!
//! - Keep-alive: a one-byte payload `[1]`
//! - Points: `12 * N` bytes of `x, y, z` f32 triples

use marga_path::core::Point3;
use marga_path::transform::PathFlags;
use thiserror::Error;

/// Size of a Path request
pub const PATH_REQUEST_SIZE: usize = 40;

/// Size of a RandomPoint request
pub const RANDOM_POINT_REQUEST_SIZE: usize = 24;

/// Size of the message tag
pub const TAG_SIZE: usize = 4;

/// Bytes per point in a response
pub const POINT_SIZE: usize = 12;

/// Request decoding errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// Payload too short for the field being read
    #[error("Payload of {0} bytes is truncated")]
    Truncated(usize),

    #[error("Unknown message tag {0}")]
    UnknownTag(i32),

    #[error("{kind} request must be {expected} bytes, got {actual}")]
    SizeMismatch {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown movement type {0}")]
    UnknownMovementType(i32),

    /// Response payload is not a whole number of points
    #[error("Points payload of {0} bytes is not a multiple of 12")]
    RaggedPoints(usize),
}

/// Message tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MessageKind {
    KeepAlive = 0,
    Path = 1,
    RandomPoint = 2,
}

impl MessageKind {
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Self::KeepAlive),
            1 => Some(Self::Path),
            2 => Some(Self::RandomPoint),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::KeepAlive => "KeepAlive",
            Self::Path => "Path",
            Self::RandomPoint => "RandomPoint",
        }
    }
}

/// Query carried by a Path request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MovementType {
    FindPath = 0,
    CastRay = 1,
    MoveAlongSurface = 2,
    RandomPoint = 3,
    RandomPointAround = 4,
}

impl TryFrom<i32> for MovementType {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::FindPath),
            1 => Ok(Self::CastRay),
            2 => Ok(Self::MoveAlongSurface),
            3 => Ok(Self::RandomPoint),
            4 => Ok(Self::RandomPointAround),
            other => Err(ProtocolError::UnknownMovementType(other)),
        }
    }
}

/// Path request (tag 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathRequest {
    pub start: Point3,
    pub end: Point3,
    pub map_id: i32,
    /// Client-requested transforms; unknown bits already dropped
    pub flags: PathFlags,
    pub movement: MovementType,
}

/// RandomPoint request (tag 2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomPointRequest {
    pub map_id: i32,
    pub start: Point3,
    /// Search radius around `start`; `<= 0` asks for any point on the map
    pub max_radius: f32,
}

/// Decoded request frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Request {
    KeepAlive,
    Path(PathRequest),
    RandomPoint(RandomPointRequest),
}

/// Bounds-checked little-endian field reader
struct Fields<'a> {
    buf: &'a [u8],
}

impl<'a> Fields<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn bytes(&self, offset: usize) -> Result<[u8; 4], ProtocolError> {
        self.buf
            .get(offset..offset + 4)
            .and_then(|s| s.try_into().ok())
            .ok_or(ProtocolError::Truncated(self.buf.len()))
    }

    fn i32(&self, offset: usize) -> Result<i32, ProtocolError> {
        self.bytes(offset).map(i32::from_le_bytes)
    }

    fn f32(&self, offset: usize) -> Result<f32, ProtocolError> {
        self.bytes(offset).map(f32::from_le_bytes)
    }

    fn point(&self, offset: usize) -> Result<Point3, ProtocolError> {
        Ok(Point3::new(
            self.f32(offset)?,
            self.f32(offset + 4)?,
            self.f32(offset + 8)?,
        ))
    }
}

fn expect_size(kind: MessageKind, expected: usize, actual: usize) -> Result<(), ProtocolError> {
    if actual != expected {
        return Err(ProtocolError::SizeMismatch {
            kind: kind.name(),
            expected,
            actual,
        });
    }
    Ok(())
}

impl Request {
    /// Decode a frame payload.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let fields = Fields::new(payload);
        let tag = fields.i32(0)?;
        let kind = MessageKind::from_tag(tag).ok_or(ProtocolError::UnknownTag(tag))?;

        match kind {
            MessageKind::KeepAlive => Ok(Request::KeepAlive),
            MessageKind::Path => {
                expect_size(kind, PATH_REQUEST_SIZE, payload.len())?;
                Ok(Request::Path(PathRequest {
                    start: fields.point(4)?,
                    end: fields.point(16)?,
                    map_id: fields.i32(28)?,
                    flags: PathFlags::from_wire(fields.i32(32)? as u32),
                    movement: MovementType::try_from(fields.i32(36)?)?,
                }))
            }
            MessageKind::RandomPoint => {
                expect_size(kind, RANDOM_POINT_REQUEST_SIZE, payload.len())?;
                Ok(Request::RandomPoint(RandomPointRequest {
                    map_id: fields.i32(4)?,
                    start: fields.point(8)?,
                    max_radius: fields.f32(20)?,
                }))
            }
        }
    }

    /// Encode as a frame payload (client side).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Request::KeepAlive => (MessageKind::KeepAlive as i32).to_le_bytes().to_vec(),
            Request::Path(req) => {
                let mut out = Vec::with_capacity(PATH_REQUEST_SIZE);
                out.extend_from_slice(&(MessageKind::Path as i32).to_le_bytes());
                put_point(&mut out, req.start);
                put_point(&mut out, req.end);
                out.extend_from_slice(&req.map_id.to_le_bytes());
                out.extend_from_slice(&req.flags.bits().to_le_bytes());
                out.extend_from_slice(&(req.movement as i32).to_le_bytes());
                out
            }
            Request::RandomPoint(req) => {
                let mut out = Vec::with_capacity(RANDOM_POINT_REQUEST_SIZE);
                out.extend_from_slice(&(MessageKind::RandomPoint as i32).to_le_bytes());
                out.extend_from_slice(&req.map_id.to_le_bytes());
                put_point(&mut out, req.start);
                out.extend_from_slice(&req.max_radius.to_le_bytes());
                out
            }
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Request::KeepAlive => MessageKind::KeepAlive,
            Request::Path(_) => MessageKind::Path,
            Request::RandomPoint(_) => MessageKind::RandomPoint,
        }
    }
}

fn put_point(out: &mut Vec<u8>, p: Point3) {
    for v in p.to_array() {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

/// Reply to a request
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Keep-alive acknowledgement
    Ack,
    Points(Vec<Point3>),
}

impl Response {
    /// Degenerate reply for failed queries
    pub fn zero() -> Self {
        Response::Points(vec![Point3::ZERO])
    }

    /// Frame payload for this response.
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Response::Ack => vec![1],
            Response::Points(points) => {
                let mut out = Vec::with_capacity(points.len() * POINT_SIZE);
                for p in points {
                    put_point(&mut out, *p);
                }
                out
            }
        }
    }

    pub fn node_count(&self) -> usize {
        match self {
            Response::Ack => 0,
            Response::Points(points) => points.len(),
        }
    }
}

/// Decode a points payload (client side).
pub fn decode_points(payload: &[u8]) -> Result<Vec<Point3>, ProtocolError> {
    if payload.len() % POINT_SIZE != 0 {
        return Err(ProtocolError::RaggedPoints(payload.len()));
    }
    let fields = Fields::new(payload);
    (0..payload.len() / POINT_SIZE)
        .map(|i| fields.point(i * POINT_SIZE))
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn decode_never_panics(payload in prop::collection::vec(any::<u8>(), 0..64)) {
            let _ = Request::decode(&payload);
        }

        #[test]
        fn decoded_requests_reencode_to_same_bytes(payload in prop::collection::vec(any::<u8>(), 0..64)) {
            if let Ok(request @ (Request::Path(_) | Request::RandomPoint(_))) = Request::decode(&payload) {
                let reencoded = request.encode();
                prop_assert_eq!(Request::decode(&reencoded).map(|r| r.kind()), Ok(request.kind()));
                prop_assert_eq!(reencoded.len(), payload.len());
            }
        }
    }
}
