//! Myo Agent - discovers Myo armbands and relays their data over UDP.
//!
//! Run with: `cargo run -p myo-agent -- --n 1 --ADD f0:1c:cd:a7:2c:85 --PORT 15001`

mod cli;

use anyhow::Result;
use clap::Parser;
use myo_core::{AgentEvent, DiscoveryAgent, EventReceiver};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, filter_directives};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.agent_config()?;

    // An explicit --DEBUG wins over RUST_LOG, which wins over the config file
    let filter = match cli.debug {
        Some(level) => EnvFilter::new(filter_directives(level)),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter_directives(config.debug))),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let agent = DiscoveryAgent::new(config)?;
    for target in agent.targets() {
        info!("Tracking armband {}", target.id());
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, disconnecting armbands");
            ctrl_c.cancel();
        }
    });

    tokio::spawn(log_events(agent.subscribe()));

    agent.run(cancel).await?;
    info!("Agent stopped");
    Ok(())
}

/// Report armband state changes.
async fn log_events(mut events: EventReceiver) {
    loop {
        match events.recv().await {
            Ok(AgentEvent::Ready { armband, services }) => {
                info!("{} ready, streaming {} services", armband, services.len());
            }
            Ok(AgentEvent::Battery { armband, level }) => {
                info!("{} battery {}%", armband.address, level);
            }
            Ok(AgentEvent::Disconnected { armband, reason }) => {
                warn!("{} disconnected: {:?}", armband.address, reason);
            }
            Ok(AgentEvent::Emg { .. } | AgentEvent::Imu { .. }) => {}
            Ok(event) => debug!("{:?}", event),
            Err(RecvError::Lagged(skipped)) => debug!("Event log skipped {} events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}
