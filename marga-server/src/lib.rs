//! # Marga: navigation query server
//!
//! Game-bot clients send fixed-layout binary requests over TCP asking for a
//! walkable path, a surface move, a ray cast or a random point on a
//! navigation mesh. Marga answers each with a length-prefixed list of points.
//!
//! ## Architecture
//!
//! ```text
//! Listener ──accept──► ConnectionHandler (thread per client)
//!                          │ decode / dispatch / encode
//!                          ▼
//!                      MapAccess ──mutex──► dyn NavEngine
//!                          │
//!                          ▼
//!                  TransformPipeline (outside the lock)
//! ```
//!
//! - [`protocol`]: framing and message layouts
//! - [`engine`]: the `NavEngine` seam and a grid-backed reference engine
//! - [`map_access`]: serializes all engine calls
//! - [`server`]: shared context, per-connection handler, accept loop
//! - [`logging`]: `env_logger` on top of an async channel sink
//! - [`config`]: JSON configuration with defaults

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod map_access;
pub mod protocol;
pub mod server;

pub use config::ServerConfig;
pub use error::{Error, Result};
pub use map_access::MapAccess;
pub use server::{Listener, ServerContext};
