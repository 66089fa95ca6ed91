//! Service assembly: one lobby connection, many bot sessions.
//!
//! `BridgeService` is the construct → connect → dispose lifecycle
//! around the core pieces. It owns the shared registry, the lobby
//! client that feeds it, and every enabled bot session, and exposes
//! the narrow operations an orchestrating frontend needs. Command
//! parsing, rendering, and persistence live elsewhere.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tilebridge_lobby::{new_shared, LobbyClient, LobbyConfig, SharedRegistry};
use tilebridge_session::{BotConfig, BotHandle, DisplayStatus};
use tilebridge_transport::{default_reconnect_intervals, HeartbeatConfig};

use crate::BridgeError;

/// One bot in the service configuration. Connection settings fall
/// back to the service-wide values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotEntry {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub name: String,
    pub username: String,
    pub password: String,
    /// Overrides the service-wide agent endpoint for this bot.
    #[serde(default)]
    pub agent_endpoint: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Service-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Game server WebSocket URL, shared by the lobby and every bot.
    pub server_endpoint: String,
    /// Default decision-agent WebSocket URL.
    pub agent_endpoint: String,
    /// Credentials for the lobby connection.
    pub lobby_username: String,
    pub lobby_password: String,
    pub bots: Vec<BotEntry>,
    #[serde(default = "default_reconnect_intervals")]
    pub reconnect_intervals: Vec<Duration>,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default = "default_settle_interval")]
    pub settle_interval: Duration,
    #[serde(default = "default_response_delay")]
    pub response_delay: Duration,
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

impl BridgeConfig {
    fn lobby_config(&self) -> LobbyConfig {
        LobbyConfig {
            endpoint: self.server_endpoint.clone(),
            username: self.lobby_username.clone(),
            password: self.lobby_password.clone(),
            reconnect_intervals: self.reconnect_intervals.clone(),
            heartbeat: self.heartbeat,
            settle_interval: self.settle_interval,
        }
    }

    fn bot_config(&self, entry: &BotEntry) -> BotConfig {
        BotConfig {
            name: entry.name.clone(),
            username: entry.username.clone(),
            password: entry.password.clone(),
            server_endpoint: self.server_endpoint.clone(),
            agent_endpoint: entry
                .agent_endpoint
                .clone()
                .unwrap_or_else(|| self.agent_endpoint.clone()),
            reconnect_intervals: self.reconnect_intervals.clone(),
            heartbeat: self.heartbeat,
            settle_interval: self.settle_interval,
            response_delay: self.response_delay,
            trace_dir: self.trace_dir.clone(),
        }
    }
}

/// The running bridge: registry, lobby feed, and bot sessions.
pub struct BridgeService {
    registry: SharedRegistry,
    lobby: LobbyClient,
    bots: Vec<BotHandle>,
}

impl BridgeService {
    /// Connects everything and returns the running service.
    pub async fn start(config: BridgeConfig) -> Self {
        if let Err(e) = tokio::fs::create_dir_all(&config.trace_dir).await {
            tracing::warn!(
                error = %e, dir = %config.trace_dir.display(),
                "could not create trace directory"
            );
        }

        let registry = new_shared();
        let lobby =
            LobbyClient::connect(config.lobby_config(), registry.clone());

        let bots: Vec<BotHandle> = config
            .bots
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| BotHandle::spawn(config.bot_config(entry)))
            .collect();

        tracing::info!(bots = bots.len(), "bridge service started");

        Self {
            registry,
            lobby,
            bots,
        }
    }

    /// The room registry, for read access.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn bots(&self) -> &[BotHandle] {
        &self.bots
    }

    pub fn bot(&self, name: &str) -> Option<&BotHandle> {
        self.bots.iter().find(|bot| bot.name() == name)
    }

    /// Every bot's name and derived status.
    pub async fn statuses(&self) -> Vec<(String, DisplayStatus)> {
        let mut out = Vec::with_capacity(self.bots.len());
        for bot in &self.bots {
            out.push((bot.name().to_owned(), bot.status().await));
        }
        out
    }

    /// Validates the target room against the registry, then asks a bot
    /// to join. With no bot named, the first idle one is used; with no
    /// seat given, the first vacant seat is taken.
    pub async fn join(
        &self,
        bot_name: Option<&str>,
        room_id: u64,
        seat: Option<usize>,
        password: Option<String>,
    ) -> Result<String, BridgeError> {
        let room = self
            .registry
            .read()
            .await
            .get(room_id)
            .ok_or(BridgeError::RoomNotFound(room_id))?;
        if !room.is_waiting() {
            return Err(BridgeError::RoomStarted(room_id));
        }
        let seat = match seat {
            Some(seat) => {
                if !room.seat_is_vacant(seat) {
                    return Err(BridgeError::SeatTaken(room_id, seat));
                }
                seat
            }
            None => room
                .first_vacant_seat()
                .ok_or(BridgeError::RoomFull(room_id))?,
        };

        let bot = match bot_name {
            Some(name) => self
                .bot(name)
                .ok_or_else(|| BridgeError::UnknownBot(name.to_owned()))?,
            None => {
                let mut idle = None;
                for bot in &self.bots {
                    if bot.status().await == DisplayStatus::Idle {
                        idle = Some(bot);
                        break;
                    }
                }
                idle.ok_or(BridgeError::NoIdleBot)?
            }
        };

        if bot.join(room_id, seat as u64, password).await {
            Ok(bot.name().to_owned())
        } else {
            Err(BridgeError::JoinUnconfirmed)
        }
    }

    /// Pulls bots out of their rooms. Bots relaying an active game are
    /// skipped unless `force` is set. Returns the names that exited.
    pub async fn kick(&self, names: &[String], force: bool) -> Vec<String> {
        let mut kicked = Vec::new();
        for bot in &self.bots {
            if !names.is_empty()
                && !names.iter().any(|n| n == bot.name())
            {
                continue;
            }
            if !force && bot.status().await == DisplayStatus::Playing {
                continue;
            }
            bot.exit().await;
            kicked.push(bot.name().to_owned());
        }
        kicked
    }

    /// Force-closes one bot's sockets (they reconnect on schedule).
    pub fn kill(&self, name: &str) -> Result<(), BridgeError> {
        self.bot(name)
            .ok_or_else(|| BridgeError::UnknownBot(name.to_owned()))?
            .kill();
        Ok(())
    }

    /// Overrides the pacing delay on every bot.
    pub fn set_delay(&self, delay: Duration) {
        for bot in &self.bots {
            bot.set_delay(delay);
        }
    }

    /// Flushes every bot's trace buffer.
    pub async fn flush_all(&self) {
        for bot in &self.bots {
            bot.flush().await;
        }
    }

    /// Terminal teardown of every session and the lobby connection.
    pub async fn shutdown(&self) {
        for bot in &self.bots {
            bot.shutdown().await;
        }
        self.lobby.close();
        tracing::info!("bridge service stopped");
    }
}
