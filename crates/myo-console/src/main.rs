//! Myo Console - browser console backend.
//!
//! Run with: `cargo run -p myo-console`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use myo_console::{AppState, Config, ControllerLink};
use myo_types::Gallery;

/// Myo Console - serves the operator console and bridges it to the controller.
#[derive(Parser, Debug)]
#[command(name = "myo-console")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Gallery CSV file (overrides config).
    #[arg(short, long)]
    gallery: Option<PathBuf>,

    /// Directory holding the console page (overrides config).
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Controller command address (overrides config).
    #[arg(long)]
    controller: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("myo_console=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_default(),
    };

    // Override config with CLI args
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(gallery) = args.gallery {
        config.gallery.path = Some(gallery);
    }
    if let Some(static_dir) = args.static_dir {
        config.server.static_dir = static_dir;
    }
    if let Some(controller) = args.controller {
        config.controller.command_addr = controller;
    }

    config.validate()?;

    let gallery = match &config.gallery.path {
        Some(path) => {
            info!("Loading gallery from {:?}", path);
            let gallery = Gallery::from_path(path)?;
            info!("Loaded {} motion classes", gallery.len());
            gallery
        }
        None => {
            warn!("No gallery configured, console will show no slides");
            Gallery::default()
        }
    };

    // Create application state
    let state = AppState::new(config.clone(), gallery);

    // Start the controller link
    let link = ControllerLink::bind(Arc::clone(&state), &config.controller).await?;
    let link_task = link.start();

    let app = myo_console::app(state, &config.server.static_dir);

    // Parse bind address
    let addr: SocketAddr = config.server.bind.parse()?;

    info!(
        "Serving console from {:?} on http://{}",
        config.server.static_dir, addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    link_task.abort();
    Ok(())
}
