//! The orchestrator's handle to a running session.

use std::time::Duration;

use tilebridge_transport::{ReconnectingSocket, SocketConfig};
use tokio::sync::{mpsc, oneshot};

use crate::session::{BotSession, Command};
use crate::{BotConfig, DisplayStatus};

/// Cheap-to-clone front for one bot session actor.
///
/// All operations are forwarded as commands; none of them can fail
/// loudly — failure shows up in [`BotHandle::status`] instead.
#[derive(Clone)]
pub struct BotHandle {
    name: String,
    commands: mpsc::UnboundedSender<Command>,
}

impl BotHandle {
    /// Builds the session's two sockets, spawns the actor, and starts
    /// connecting immediately.
    pub fn spawn(config: BotConfig) -> Self {
        let name = config.name.clone();

        let server_config = SocketConfig {
            endpoint: config.server_endpoint.clone(),
            reconnect_intervals: config.reconnect_intervals.clone(),
            heartbeat: Some(config.heartbeat),
        };
        let agent_config = SocketConfig {
            endpoint: config.agent_endpoint.clone(),
            reconnect_intervals: config.reconnect_intervals.clone(),
            heartbeat: None,
        };

        let (server, server_rx) =
            ReconnectingSocket::connect(format!("{name}/server"), server_config);
        let (agent, agent_rx) =
            ReconnectingSocket::connect(format!("{name}/agent"), agent_config);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let session = BotSession::new(config, server, agent);
        tokio::spawn(session.run(server_rx, agent_rx, command_rx));

        Self {
            name,
            commands: command_tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Asks the session to take `seat` in `room_id`. Resolves after
    /// the settle pause with whether the server's seat push confirmed
    /// the room.
    pub async fn join(
        &self,
        room_id: u64,
        seat: u64,
        password: Option<String>,
    ) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .commands
            .send(Command::Join {
                room_id,
                seat,
                password,
                reply,
            })
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Leaves the current room. Unconditionally idle afterwards.
    pub async fn exit(&self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Exit { reply }).is_ok() {
            let _ = rx.await;
        }
    }

    /// Force-closes both sockets; they reconnect on schedule. Does not
    /// block.
    pub fn kill(&self) {
        let _ = self.commands.send(Command::Kill);
    }

    /// Drains the trace buffer to disk. A no-op when nothing was
    /// traced since the last flush.
    pub async fn flush(&self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Flush { reply }).is_ok() {
            let _ = rx.await;
        }
    }

    /// The derived externally-visible status.
    pub async fn status(&self) -> DisplayStatus {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Status { reply }).is_err() {
            return DisplayStatus::Closed;
        }
        rx.await.unwrap_or(DisplayStatus::Closed)
    }

    /// Overrides the pacing delay for future agent decisions.
    pub fn set_delay(&self, delay: Duration) {
        let _ = self.commands.send(Command::SetDelay { delay });
    }

    /// Terminal teardown: closes both sockets for good and flushes
    /// the remaining trace.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown { reply }).is_ok() {
            let _ = rx.await;
        }
    }
}
