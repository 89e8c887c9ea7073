//! Shared server state.

use crate::config::ServerConfig;
use crate::engine::NavEngine;
use crate::map_access::MapAccess;
use log::info;
use marga_path::transform::{PathFlags, TransformPipeline};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Live connection count
#[derive(Clone, Default)]
pub struct ConnectionCounter {
    live: Arc<AtomicUsize>,
}

impl ConnectionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a new connection until the guard is dropped.
    pub fn acquire(&self) -> ConnectionGuard {
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Connections: {}", live);
        ConnectionGuard {
            live: Arc::clone(&self.live),
        }
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Decrements the live count exactly once
pub struct ConnectionGuard {
    live: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let live = self.live.fetch_sub(1, Ordering::SeqCst) - 1;
        info!("Connections: {}", live);
    }
}

/// State shared by the listener and every connection handler
pub struct ServerContext {
    pub config: ServerConfig,
    pub maps: MapAccess,
    pub pipeline: TransformPipeline,
    /// Stages applied to every path on top of the client's flags
    pub server_flags: PathFlags,
    connections: ConnectionCounter,
    next_connection_id: AtomicU64,
    running: AtomicBool,
}

impl ServerContext {
    pub fn new(config: ServerConfig, engine: Box<dyn NavEngine>) -> Self {
        Self {
            maps: MapAccess::new(engine),
            pipeline: TransformPipeline::new(config.pipeline_config()),
            server_flags: config.server_flags(),
            config,
            connections: ConnectionCounter::new(),
            next_connection_id: AtomicU64::new(1),
            running: AtomicBool::new(true),
        }
    }

    pub fn connections(&self) -> &ConnectionCounter {
        &self.connections
    }

    /// Ordinal for the next accepted connection, starting at 1
    pub fn next_connection_id(&self) -> u64 {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Ask the accept loop to exit.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}
