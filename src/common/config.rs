//! # Configuration
//!
//! TOML-backed configuration for the broker, app server, and client. The
//! data store takes only CLI flags (it has no peers or timing knobs to
//! externalize), so it has no config struct here.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

/// Load a TOML configuration file and deserialize it into `T`.
pub fn load_config<T>(path: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Broker listen addresses and liveness tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Client-facing frontend address (default `"0.0.0.0:5555"`).
    pub frontend_addr: String,
    /// Internal address backend worker connections dial (default
    /// `"127.0.0.1:6000"`); app servers connect here to receive forwarded
    /// client requests.
    pub backend_addr: String,
    /// Control channel address (registration, election, clock/notify).
    pub control_addr: String,
    /// Notification pub/sub address.
    pub notify_addr: String,
    /// Heartbeat ingest address.
    pub heartbeat_addr: String,
    /// Seconds of silence after which a server is evicted from the registry.
    pub heartbeat_timeout_secs: u64,
    /// Seconds between liveness sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_sweep_interval() -> u64 {
    1
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            frontend_addr: "0.0.0.0:5555".into(),
            backend_addr: "127.0.0.1:6000".into(),
            control_addr: "127.0.0.1:6001".into(),
            notify_addr: "127.0.0.1:6010".into(),
            heartbeat_addr: "127.0.0.1:6015".into(),
            heartbeat_timeout_secs: 4,
            sweep_interval_secs: 1,
        }
    }
}

/// App server endpoints and loop cadences. The server's own id is not
/// configured here — it is assigned by the broker at startup via
/// `get_server_id`. The server is a worker: it dials the broker's backend
/// address and pulls forwarded client requests rather than listening for
/// its own inbound connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub store_addr: String,
    pub broker_backend_addr: String,
    pub broker_control_addr: String,
    pub broker_notify_addr: String,
    pub broker_heartbeat_addr: String,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_membership_interval")]
    pub membership_interval_secs: u64,
    #[serde(default = "default_election_interval")]
    pub election_interval_secs: u64,
    #[serde(default = "default_drift_interval")]
    pub drift_interval_secs: u64,
    /// Timeout applied to every cross-process round trip (store/broker
    /// calls), in seconds.
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,
}

fn default_heartbeat_interval() -> u64 {
    2
}
fn default_membership_interval() -> u64 {
    10
}
fn default_election_interval() -> u64 {
    12
}
fn default_drift_interval() -> u64 {
    5
}
fn default_rpc_timeout() -> u64 {
    2
}

/// Client-side broker endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub broker_frontend_addr: String,
    pub broker_notify_addr: String,
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            broker_frontend_addr: "127.0.0.1:5555".into(),
            broker_notify_addr: "127.0.0.1:6010".into(),
            rpc_timeout_secs: default_rpc_timeout(),
        }
    }
}
