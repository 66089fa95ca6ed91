//! Per-session configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tilebridge_transport::{default_reconnect_intervals, HeartbeatConfig};

/// Everything one bot session needs to run.
///
/// The defaults mirror the production deployment: 300ms settle pause,
/// 1.5s human-like response delay, 30s heartbeats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Display name; also names the trace files.
    pub name: String,
    pub username: String,
    pub password: String,
    /// Game server WebSocket URL.
    pub server_endpoint: String,
    /// Decision agent WebSocket URL.
    pub agent_endpoint: String,
    /// Backoff schedule shared by both sockets.
    #[serde(default = "default_reconnect_intervals")]
    pub reconnect_intervals: Vec<Duration>,
    /// Heartbeat toward the game server; the agent link has none.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    /// Blind pause after join/exit/login requests, in lieu of a
    /// request/response correlation the protocol does not have.
    #[serde(default = "default_settle_interval")]
    pub settle_interval: Duration,
    /// Pacing delay before forwarding an agent decision to the server.
    #[serde(default = "default_response_delay")]
    pub response_delay: Duration,
    /// Directory trace files are flushed into.
    #[serde(default = "default_trace_dir")]
    pub trace_dir: PathBuf,
}

fn default_settle_interval() -> Duration {
    Duration::from_millis(300)
}

fn default_response_delay() -> Duration {
    Duration::from_millis(1500)
}

fn default_trace_dir() -> PathBuf {
    PathBuf::from("traces")
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            username: String::new(),
            password: String::new(),
            server_endpoint: String::new(),
            agent_endpoint: String::new(),
            reconnect_intervals: default_reconnect_intervals(),
            heartbeat: HeartbeatConfig::default(),
            settle_interval: default_settle_interval(),
            response_delay: default_response_delay(),
            trace_dir: default_trace_dir(),
        }
    }
}
