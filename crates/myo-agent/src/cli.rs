//! CLI argument definitions using clap.
//!
//! The flag set keeps the spelling of the original launcher scripts
//! (`--n`, `--ADD`, `--PORT`, `--IP`, `--DEBUG`) so existing launch
//! configurations keep working.

use std::path::PathBuf;

use clap::Parser;
use myo_core::{AgentConfig, Result};

#[derive(Debug, Parser)]
#[command(name = "myo-agent")]
#[command(author, version, about = "Relay Myo armband EMG and IMU data over UDP", long_about = None)]
pub struct Cli {
    /// Number of armbands to connect
    #[arg(long = "n", value_name = "COUNT")]
    pub n: Option<usize>,

    /// Armband hardware addresses, one per armband
    #[arg(long = "ADD", value_name = "ADDRESS", num_args = 1..)]
    pub addresses: Vec<String>,

    /// Destination UDP ports, one per armband
    #[arg(long = "PORT", value_name = "PORT", num_args = 1..)]
    pub ports: Vec<u16>,

    /// Destination hosts, one per armband
    #[arg(long = "IP", value_name = "IP", num_args = 1..)]
    pub ips: Vec<String>,

    /// Debug level: 0 normal, 1 debug, 2 per-sample logging
    #[arg(long = "DEBUG", value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(0..=2))]
    pub debug: Option<u8>,

    /// Agent configuration file (TOML); flags override its values
    #[arg(short, long, env = "MYO_AGENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Connect and stream without relaying over UDP
    #[arg(long)]
    pub no_relay: bool,
}

impl Cli {
    /// Build the agent configuration from the config file and flags.
    pub fn agent_config(&self) -> Result<AgentConfig> {
        let mut config = match &self.config {
            Some(path) => AgentConfig::load(path)?,
            None => AgentConfig::default(),
        };

        if let Some(n) = self.n {
            config.n = n;
        }
        if !self.addresses.is_empty() {
            config.addresses = self.addresses.clone();
        }
        if !self.ports.is_empty() {
            config.ports = self.ports.clone();
        }
        if !self.ips.is_empty() {
            config.ips = self.ips.clone();
        }
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        if self.no_relay {
            config.relay.enabled = false;
        }

        Ok(config)
    }
}

/// Log filter directives for a debug level.
///
/// Debug output is scoped to the agent crates so BLE stack internals stay at
/// `info`.
pub fn filter_directives(debug: u8) -> &'static str {
    match debug {
        0 => "info",
        1 => "info,myo_core=debug,myo_agent=debug",
        _ => "info,myo_core=trace,myo_agent=trace",
    }
}
