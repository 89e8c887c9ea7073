//! Connection handling and the accept loop.

pub mod context;
pub mod handler;
pub mod listener;

pub use context::{ConnectionCounter, ConnectionGuard, ServerContext};
pub use handler::ConnectionHandler;
pub use listener::Listener;
