//! TCP accept loop.
//!
//! The listener socket is non-blocking and polled every 10 ms so the loop
//! notices a cleared running flag promptly. Each accepted stream is switched
//! back to blocking mode and served on its own named thread.

use crate::error::{Error, Result};
use crate::server::context::ServerContext;
use crate::server::handler::ConnectionHandler;
use log::{error, info, warn};
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Accept poll interval
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Bound listener sharing one [`ServerContext`]
pub struct Listener {
    listener: TcpListener,
    ctx: Arc<ServerContext>,
}

impl Listener {
    /// Bind the configured address.
    pub fn bind(ctx: Arc<ServerContext>) -> Result<Self> {
        let addr = ctx.config.address();
        let listener = TcpListener::bind(&addr)
            .map_err(|e| Error::Other(format!("Failed to bind to {}: {}", addr, e)))?;
        listener.set_nonblocking(true)?;
        Ok(Self { listener, ctx })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until [`shutdown`](Self::shutdown) is called.
    pub fn run(&self) -> Result<()> {
        info!("Listening on {}", self.local_addr()?);

        while self.ctx.is_running() {
            match self.listener.accept() {
                Ok((stream, addr)) => self.spawn_connection(stream, addr),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                    thread::sleep(ACCEPT_POLL);
                }
            }
        }

        info!("Listener stopped");
        Ok(())
    }

    /// Stop accepting; in-flight connections finish on their own.
    pub fn shutdown(&self) {
        self.ctx.stop();
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nonblocking(false) {
            warn!("Dropping {}: failed to set blocking mode: {}", addr, e);
            return;
        }

        let id = self.ctx.next_connection_id();
        let guard = self.ctx.connections().acquire();
        let ctx = Arc::clone(&self.ctx);

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", id))
            .spawn(move || {
                let _guard = guard;
                if let Err(e) = ConnectionHandler::new(ctx, id).run(stream) {
                    error!("[conn {}] Connection from {} failed: {}", id, addr, e);
                }
            });

        if let Err(e) = spawned {
            error!("Failed to spawn handler for {}: {}", addr, e);
        }
    }
}
