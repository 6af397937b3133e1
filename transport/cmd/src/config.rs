//! Configuration handling for the mctpd daemon.
//!
//! Configuration comes from a YAML file with environment-variable
//! overrides on top; command-line flags override both. Every field has
//! a working default so the daemon starts without a config file.

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Operating mode of the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Terminate packets at a local endpoint and demultiplex completed
    /// messages to application clients.
    Terminate,
    /// Relay packets between two packet sockets as a bridge pair.
    Bridge,
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Operating mode
    pub mode: Mode,
    /// Local endpoint ID (terminate mode)
    pub eid: u8,
    /// Unix socket carrying raw MCTP packets (terminate mode and
    /// bridge side A)
    pub packet_socket: PathBuf,
    /// Second packet socket (bridge side B)
    pub bridge_socket: PathBuf,
    /// Unix socket for application clients (terminate mode)
    pub app_socket: PathBuf,
    /// Maximum on-wire packet size for the socket binding
    pub pkt_size: usize,
    /// Seconds before a stalled reassembly context is evicted
    pub reassembly_timeout_secs: u64,
    /// Seconds between eviction sweeps
    pub sweep_interval_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Terminate,
            eid: 8,
            packet_socket: PathBuf::from("/run/mctpd/packet.sock"),
            bridge_socket: PathBuf::from("/run/mctpd/packet-b.sock"),
            app_socket: PathBuf::from("/run/mctpd/app.sock"),
            pkt_size: 64,
            reassembly_timeout_secs: 6,
            sweep_interval_secs: 1,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a file, then apply environment
    /// overrides. A missing or unparseable file falls back to
    /// defaults.
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(content) = std::fs::read_to_string(&config_path) {
            match serde_yaml::from_str::<DaemonConfig>(&content) {
                Ok(parsed) => {
                    config = parsed;
                    info!("loaded configuration from {:?}", config_path.as_ref());
                }
                Err(err) => {
                    warn!(
                        "failed to parse config file {:?} ({err}), using defaults",
                        config_path.as_ref()
                    );
                }
            }
        } else {
            warn!(
                "config file {:?} not found, using defaults",
                config_path.as_ref()
            );
        }

        config.apply_environment_overrides();
        Ok(config)
    }

    /// Apply `MCTPD_*` environment variable overrides.
    fn apply_environment_overrides(&mut self) {
        if let Ok(mode) = std::env::var("MCTPD_MODE") {
            match mode.to_lowercase().as_str() {
                "terminate" => self.mode = Mode::Terminate,
                "bridge" => self.mode = Mode::Bridge,
                other => warn!("ignoring unknown MCTPD_MODE value {other:?}"),
            }
        }

        if let Ok(eid) = std::env::var("MCTPD_EID") {
            if let Ok(eid) = eid.parse::<u8>() {
                self.eid = eid;
                info!("endpoint ID overridden by environment: {eid}");
            }
        }

        if let Ok(path) = std::env::var("MCTPD_PACKET_SOCKET") {
            self.packet_socket = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("MCTPD_BRIDGE_SOCKET") {
            self.bridge_socket = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("MCTPD_APP_SOCKET") {
            self.app_socket = PathBuf::from(path);
        }

        if let Ok(size) = std::env::var("MCTPD_PKT_SIZE") {
            if let Ok(size) = size.parse::<usize>() {
                self.pkt_size = size;
                info!("packet size overridden by environment: {size}");
            }
        }
    }
}
