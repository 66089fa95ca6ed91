//! The lobby connection: the registry's single producer.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tilebridge_protocol::{self as protocol, ServerPacket};
use tilebridge_transport::{
    default_reconnect_intervals, HeartbeatConfig, LinkState,
    ReconnectingSocket, SocketConfig, SocketEvent,
};
use tokio::sync::mpsc;

use crate::SharedRegistry;

/// Settings for the lobby connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Game server WebSocket URL.
    pub endpoint: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_reconnect_intervals")]
    pub reconnect_intervals: Vec<Duration>,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    /// Blind pause between sending the login answer and requesting the
    /// room list; the protocol has no per-request acknowledgment.
    #[serde(default = "default_settle_interval")]
    pub settle_interval: Duration,
}

fn default_settle_interval() -> Duration {
    Duration::from_millis(300)
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: String::new(),
            password: String::new(),
            reconnect_intervals: default_reconnect_intervals(),
            heartbeat: HeartbeatConfig::default(),
            settle_interval: default_settle_interval(),
        }
    }
}

/// Owns the lobby socket and feeds the shared registry.
///
/// Every fresh open clears the registry and re-runs the login +
/// room-list sequence; afterwards the incremental event stream keeps
/// the registry current until the next disconnect.
pub struct LobbyClient {
    socket: ReconnectingSocket,
}

impl LobbyClient {
    /// Connects and starts the feed task.
    pub fn connect(config: LobbyConfig, registry: SharedRegistry) -> Self {
        let socket_config = SocketConfig {
            endpoint: config.endpoint.clone(),
            reconnect_intervals: config.reconnect_intervals.clone(),
            heartbeat: Some(config.heartbeat),
        };
        let (socket, events) = ReconnectingSocket::connect("lobby", socket_config);

        tokio::spawn(run(socket.clone(), events, registry, config));

        Self { socket }
    }

    /// Terminally closes the lobby connection.
    pub fn close(&self) {
        self.socket.close();
    }

    pub fn state(&self) -> LinkState {
        self.socket.state()
    }
}

async fn run(
    socket: ReconnectingSocket,
    mut events: mpsc::UnboundedReceiver<SocketEvent>,
    registry: SharedRegistry,
    config: LobbyConfig,
) {
    while let Some(event) = events.recv().await {
        match event {
            SocketEvent::Open => {
                // A fresh snapshot is coming; drop the stale mirror.
                registry.write().await.clear();
                socket.send(protocol::request_login_challenge());
            }
            SocketEvent::HeartbeatDue(ts) => {
                socket.send(protocol::heartbeat(ts));
            }
            SocketEvent::Text(text) => match protocol::decode_text(&text) {
                Ok(value) => {
                    handle_packet(&socket, &registry, &config, value).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "undecodable lobby frame");
                }
            },
            SocketEvent::Binary(data) => match protocol::decode_binary(&data) {
                Ok(value) => {
                    handle_packet(&socket, &registry, &config, value).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "undecodable lobby frame");
                }
            },
            SocketEvent::Closed => {
                tracing::info!("lobby disconnected");
            }
        }
    }
}

async fn handle_packet(
    socket: &ReconnectingSocket,
    registry: &SharedRegistry,
    config: &LobbyConfig,
    value: Value,
) {
    if let Some(stats) = protocol::extract_stats(&value) {
        registry.write().await.set_stats(stats);
    }

    match protocol::classify(value) {
        ServerPacket::HeartbeatEcho { timestamp } => {
            socket.acknowledge_heartbeat(timestamp);
        }
        ServerPacket::LoginChallenge { question } => {
            let answer = tilebridge_solver::solve_answer(&question);
            socket.send(protocol::login(
                &config.username,
                &config.password,
                &question,
                &answer,
            ));
            // Settle pause, then ask for the full room list.
            tokio::time::sleep(config.settle_interval).await;
            socket.send(protocol::room_list());
            tracing::info!("lobby logged in");
        }
        ServerPacket::LoginResult { failed } => {
            if failed {
                tracing::warn!("lobby login rejected");
            }
        }
        ServerPacket::RoomList { rooms } => {
            registry.write().await.apply_snapshot(rooms);
        }
        ServerPacket::PlayerJoined { to, from } => {
            registry.write().await.apply_join(&to, from.as_ref());
        }
        ServerPacket::PlayerExited { seat } => {
            registry.write().await.apply_exit(&seat);
        }
        ServerPacket::RoomDismissed { room_id } => {
            registry.write().await.apply_dismiss(room_id);
        }
        ServerPacket::RoundStarted { room_id } => {
            registry.write().await.apply_start(room_id);
        }
        ServerPacket::RoundAdvanced {
            room_id,
            round_index,
        } => {
            registry
                .write()
                .await
                .apply_round_advance(room_id, round_index);
        }
        ServerPacket::ReadyAck
        | ServerPacket::LoginInfo
        | ServerPacket::RoomState { .. } => {}
        ServerPacket::Game(frame) => {
            tracing::debug!(route = frame.route, "gameplay packet on lobby link");
        }
        ServerPacket::Unrecognized(packet) => {
            tracing::debug!(%packet, "unrecognized lobby packet");
        }
    }
}
