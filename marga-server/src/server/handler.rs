//! Per-connection request loop.
//!
//! # Connection Lifecycle
//!
//! ```text
//! 1. Listener accepts and spawns a thread with a ConnectionHandler
//! 2. Read frame -> decode -> dispatch -> encode -> write frame, repeated
//! 3. Peer close, socket error or handler panic ends the loop
//! ```
//!
//! Malformed requests are logged and dropped without a reply; the
//! connection stays usable. Engine failures reply with a single zero point.

use crate::engine::EngineError;
use crate::error::{Error, Result};
use crate::protocol::messages::{MovementType, PathRequest, RandomPointRequest, Request, Response};
use crate::protocol::wire::{FrameReader, write_frame};
use crate::server::context::ServerContext;
use log::{debug, info, trace, warn};
use marga_path::core::{Point3, points_from_flat};
use marga_path::transform::PathFlags;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::any::Any;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Serves one client connection
pub struct ConnectionHandler {
    ctx: Arc<ServerContext>,
    id: u64,
    frames: FrameReader,
    /// Steering jitter source owned by this connection
    rng: SmallRng,
}

impl ConnectionHandler {
    /// Create a handler for connection number `id`.
    pub fn new(ctx: Arc<ServerContext>, id: u64) -> Self {
        let seed = ctx.config.smoothing.steering_seed;
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed.wrapping_add(id))
        };
        Self {
            ctx,
            id,
            frames: FrameReader::new(),
            rng,
        }
    }

    /// Configure socket timeouts and serve until the peer goes away.
    pub fn run(mut self, mut stream: TcpStream) -> Result<()> {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        info!("[conn {}] Client connected: {}", self.id, peer);

        if let Err(e) = stream.set_read_timeout(self.ctx.config.read_timeout()) {
            warn!("[conn {}] Failed to set read timeout: {}", self.id, e);
        }
        if let Err(e) = stream.set_write_timeout(self.ctx.config.write_timeout()) {
            warn!("[conn {}] Failed to set write timeout: {}", self.id, e);
        }
        if let Err(e) = stream.set_nodelay(true) {
            debug!("[conn {}] Failed to set TCP_NODELAY: {}", self.id, e);
        }

        let result = self.serve(&mut stream);
        let _ = stream.shutdown(Shutdown::Both);

        match result {
            Ok(()) => {
                info!("[conn {}] Client disconnected: {}", self.id, peer);
                Ok(())
            }
            Err(e) if e.is_timeout() => {
                info!("[conn {}] Client stalled, disconnecting: {}", self.id, peer);
                Ok(())
            }
            Err(e) if e.is_disconnect() => {
                info!("[conn {}] Client dropped: {}", self.id, peer);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Request loop over any byte stream.
    pub fn serve<S: Read + Write>(&mut self, stream: &mut S) -> Result<()> {
        loop {
            let payload = match self.frames.read(stream)? {
                Some(payload) => payload,
                None => return Ok(()),
            };

            let request = match Request::decode(payload) {
                Ok(request) => request,
                Err(e) => {
                    warn!("[conn {}] Dropping malformed request: {}", self.id, e);
                    continue;
                }
            };

            let response = self.dispatch_guarded(request)?;
            write_frame(stream, &response.payload())?;
        }
    }

    /// Dispatch, turning a panic into [`Error::HandlerPanic`].
    fn dispatch_guarded(&mut self, request: Request) -> Result<Response> {
        panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(request)))
            .map_err(|payload| Error::HandlerPanic(panic_message(payload.as_ref())))
    }

    /// Answer one decoded request.
    pub fn dispatch(&mut self, request: Request) -> Response {
        let started = Instant::now();

        let (response, applied) = match request {
            Request::KeepAlive => (Response::Ack, PathFlags::NONE),
            Request::Path(req) => self.handle_path(req),
            Request::RandomPoint(req) => (self.handle_random_point(req), PathFlags::NONE),
        };

        if matches!(request, Request::KeepAlive) {
            trace!("[conn {}] KeepAlive", self.id);
        } else {
            info!(
                "[conn {}] {} -> {} nodes [{}] in {:?}",
                self.id,
                describe(&request),
                response.node_count(),
                applied,
                started.elapsed()
            );
        }
        response
    }

    fn handle_path(&mut self, req: PathRequest) -> (Response, PathFlags) {
        let maps = &self.ctx.maps;
        let map_id = req.map_id;

        let result = match req.movement {
            MovementType::FindPath => {
                let raw = maps
                    .with_map(map_id, |e| e.find_path(map_id, req.start, req.end))
                    .and_then(|flat| Ok(points_from_flat(&flat)?));
                match raw {
                    Ok(path) if !path.is_empty() => {
                        let flags = req.flags | self.ctx.server_flags;
                        let out = self.ctx.pipeline.apply(path, flags, &mut self.rng);
                        return (Response::Points(out.path), out.applied);
                    }
                    Ok(_) => Err(EngineError::NoPath),
                    Err(e) => Err(e),
                }
            }
            MovementType::CastRay => maps
                .with_map(map_id, |e| e.cast_ray(map_id, req.start, req.end))
                .map(|clear| if clear { req.end } else { Point3::ZERO }),
            MovementType::MoveAlongSurface => {
                maps.with_map(map_id, |e| e.move_along_surface(map_id, req.start, req.end))
            }
            MovementType::RandomPoint => maps.with_map(map_id, |e| e.random_point(map_id)),
            MovementType::RandomPointAround => {
                let radius = req.end.distance(&req.start);
                maps.with_map(map_id, |e| e.random_point_around(map_id, req.start, radius))
            }
        };

        let response = match result {
            Ok(point) => Response::Points(vec![point]),
            Err(e) => {
                warn!(
                    "[conn {}] {:?} on map {:03} failed: {}",
                    self.id, req.movement, map_id, e
                );
                Response::zero()
            }
        };
        (response, PathFlags::NONE)
    }

    fn handle_random_point(&mut self, req: RandomPointRequest) -> Response {
        let map_id = req.map_id;
        let result = if req.max_radius > 0.0 {
            self.ctx.maps.with_map(map_id, |e| {
                e.random_point_around(map_id, req.start, req.max_radius)
            })
        } else {
            self.ctx.maps.with_map(map_id, |e| e.random_point(map_id))
        };

        match result {
            Ok(point) => Response::Points(vec![point]),
            Err(e) => {
                warn!(
                    "[conn {}] RandomPoint on map {:03} failed: {}",
                    self.id, map_id, e
                );
                Response::zero()
            }
        }
    }
}

fn describe(request: &Request) -> String {
    match request {
        Request::KeepAlive => "KeepAlive".to_string(),
        Request::Path(req) => format!("{:?} map {:03}", req.movement, req.map_id),
        Request::RandomPoint(req) => format!(
            "RandomPoint map {:03} radius {:.2}",
            req.map_id, req.max_radius
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
