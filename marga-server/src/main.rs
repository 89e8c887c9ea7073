//! Marga server daemon
//!
//! Loads `config.json` (created with defaults when missing), preloads the
//! configured maps and serves navigation queries until Ctrl-C.

use clap::Parser;
use log::{error, info};
use marga_server::engine::GridNavEngine;
use marga_server::logging;
use marga_server::{Error, Listener, Result, ServerConfig, ServerContext};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "marga-server", version, about = "Binary TCP navigation query server")]
struct Args {
    /// Configuration file (JSON)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let existed = args.config.exists();
    let mut config = ServerConfig::load_or_create(&args.config)?;
    if let Some(bind) = args.bind {
        config.network.bind_address = bind;
    }
    if let Some(port) = args.port {
        config.network.port = port;
    }

    let _log_guard = logging::install(&config.logging)?;

    info!("Marga server v{} starting...", env!("CARGO_PKG_VERSION"));
    if existed {
        info!("Using config: {}", args.config.display());
    } else {
        info!("Wrote default config to {}", args.config.display());
    }

    if let Err(e) = config.validate() {
        error!("{}", e);
        return Err(e);
    }

    let engine = GridNavEngine::new(config.engine_config());
    let ctx = Arc::new(ServerContext::new(config, Box::new(engine)));

    let preload = ctx.config.maps.preload.clone();
    if !preload.is_empty() {
        let loaded = ctx.maps.preload(&preload);
        info!("Preloaded {}/{} maps", loaded, preload.len());
    }

    let listener = Listener::bind(Arc::clone(&ctx))?;

    let signal_ctx = Arc::clone(&ctx);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        signal_ctx.stop();
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    info!("Marga running. Press Ctrl-C to stop.");
    listener.run()?;

    info!(
        "Marga stopped ({} connections still open)",
        ctx.connections().live()
    );
    Ok(())
}
