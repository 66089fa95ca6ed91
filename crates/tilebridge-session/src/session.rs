//! The bot session actor.
//!
//! One task owns all session state and both sockets. Commands from
//! the orchestrator, events from the server socket, and events from
//! the agent socket are interleaved on a single `select!` loop, so
//! handlers never overlap and each socket's packets are processed in
//! arrival order. There is no ordering between the two sockets, which
//! is why every routing decision re-checks state instead of assuming
//! it.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tilebridge_protocol::{
    self as protocol, AgentSeverity, GameFrame, SeatStatus, ServerPacket,
};
use tilebridge_transport::{ReconnectingSocket, SocketEvent};
use tokio::sync::{mpsc, oneshot};

use crate::status::{display_status, BotStatus, DisplayStatus};
use crate::trace::{write_trace, TraceBuffer, TraceDirection};
use crate::BotConfig;

/// Commands the handle sends into the actor.
pub(crate) enum Command {
    Join {
        room_id: u64,
        seat: u64,
        password: Option<String>,
        reply: oneshot::Sender<bool>,
    },
    Exit {
        reply: oneshot::Sender<()>,
    },
    /// Force-close both sockets (they reconnect on schedule).
    Kill,
    Flush {
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<DisplayStatus>,
    },
    SetDelay {
        delay: std::time::Duration,
    },
    /// Terminal teardown: closed flag, sockets, final flush.
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

type EventRx = mpsc::UnboundedReceiver<SocketEvent>;

pub(crate) struct BotSession {
    pub(crate) config: BotConfig,
    pub(crate) server: ReconnectingSocket,
    pub(crate) agent: ReconnectingSocket,
    status: BotStatus,
    closed: bool,
    killed: bool,
    /// A freshly (re)connected agent waits for the next round before
    /// it is asked to act.
    ready: bool,
    seat: SeatStatus,
    delay: std::time::Duration,
    trace: TraceBuffer,
}

impl BotSession {
    pub(crate) fn new(
        config: BotConfig,
        server: ReconnectingSocket,
        agent: ReconnectingSocket,
    ) -> Self {
        let delay = config.response_delay;
        Self {
            config,
            server,
            agent,
            status: BotStatus::Idle,
            closed: false,
            killed: false,
            ready: false,
            seat: SeatStatus::default(),
            delay,
            trace: TraceBuffer::default(),
        }
    }

    /// The actor loop. Runs until shutdown or until every handle is
    /// dropped.
    pub(crate) async fn run(
        mut self,
        mut server_rx: EventRx,
        mut agent_rx: EventRx,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        loop {
            tokio::select! {
                Some(event) = server_rx.recv() => {
                    self.on_server_event(event).await;
                }
                Some(event) = agent_rx.recv() => {
                    self.on_agent_event(event).await;
                }
                cmd = commands.recv() => match cmd {
                    Some(cmd) => {
                        let done = self
                            .handle_command(cmd, &mut server_rx, &mut agent_rx)
                            .await;
                        if done {
                            break;
                        }
                    }
                    // Every handle dropped: tear down for good.
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                else => break,
            }
        }
        tracing::info!(bot = %self.config.name, "session stopped");
    }

    /// Returns `true` when the session should stop.
    async fn handle_command(
        &mut self,
        cmd: Command,
        server_rx: &mut EventRx,
        agent_rx: &mut EventRx,
    ) -> bool {
        match cmd {
            Command::Join {
                room_id,
                seat,
                password,
                reply,
            } => {
                let joined = self
                    .join(room_id, seat, password, server_rx, agent_rx)
                    .await;
                let _ = reply.send(joined);
            }
            Command::Exit { reply } => {
                self.exit(server_rx, agent_rx).await;
                let _ = reply.send(());
            }
            Command::Kill => {
                tracing::info!(bot = %self.config.name, "killing session links");
                self.server.disconnect();
                self.agent.disconnect();
            }
            Command::Flush { reply } => {
                self.flush().await;
                let _ = reply.send(());
            }
            Command::Status { reply } => {
                let _ = reply.send(self.display_status());
            }
            Command::SetDelay { delay } => {
                self.delay = delay;
            }
            Command::Shutdown { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
                return true;
            }
        }
        false
    }

    fn display_status(&self) -> DisplayStatus {
        display_status(
            self.status,
            self.closed,
            self.killed,
            self.ready,
            self.server.state(),
            self.agent.state(),
        )
    }

    // -- Operations -------------------------------------------------------

    /// Requests a seat, settles, then checks whether the server's seat
    /// push confirmed the room. There is no acknowledgment to wait on.
    async fn join(
        &mut self,
        room_id: u64,
        seat: u64,
        password: Option<String>,
        server_rx: &mut EventRx,
        agent_rx: &mut EventRx,
    ) -> bool {
        if self.display_status() != DisplayStatus::Idle {
            return false;
        }
        self.status = BotStatus::Waiting;
        tracing::info!(
            bot = %self.config.name, room_id, seat, "joining room"
        );

        self.server
            .send(protocol::join_room(room_id, seat, password.as_deref()));
        self.settle(server_rx, agent_rx).await;

        if self.seat.room_id != Some(room_id) {
            tracing::info!(bot = %self.config.name, room_id, "join not confirmed");
            self.status = BotStatus::Idle;
            return false;
        }

        self.server.send(protocol::ready());
        true
    }

    async fn exit(&mut self, server_rx: &mut EventRx, agent_rx: &mut EventRx) {
        self.server.send(protocol::exit_room());
        self.settle(server_rx, agent_rx).await;
        self.status = BotStatus::Idle;
    }

    async fn flush(&mut self) {
        if self.trace.is_empty() {
            return;
        }
        let entries = self.trace.drain();
        write_trace(&self.config.trace_dir, &self.config.name, entries).await;
    }

    async fn shutdown(&mut self) {
        self.closed = true;
        self.server.close();
        self.agent.close();
        self.flush().await;
    }

    /// The settle pause: a fixed wall-clock wait that keeps draining
    /// socket events (the confirmation we are waiting for arrives as
    /// one) while further commands stay queued.
    async fn settle(&mut self, server_rx: &mut EventRx, agent_rx: &mut EventRx) {
        let deadline = tokio::time::sleep(self.config.settle_interval);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                Some(event) = server_rx.recv() => {
                    self.on_server_event(event).await;
                }
                Some(event) = agent_rx.recv() => {
                    self.on_agent_event(event).await;
                }
                else => break,
            }
        }
    }

    // -- Server socket ----------------------------------------------------

    async fn on_server_event(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Open => {
                tracing::info!(bot = %self.config.name, "connected to server");
                self.server.send(protocol::request_login_challenge());
            }
            SocketEvent::Closed => {
                tracing::info!(bot = %self.config.name, "server disconnected");
                self.status = BotStatus::Idle;
            }
            SocketEvent::HeartbeatDue(ts) => {
                self.server.send(protocol::heartbeat(ts));
            }
            SocketEvent::Text(text) => match protocol::decode_text(&text) {
                Ok(value) => self.on_server_packet(value).await,
                Err(e) => {
                    tracing::warn!(
                        bot = %self.config.name, error = %e,
                        "undecodable server frame"
                    );
                }
            },
            SocketEvent::Binary(data) => {
                match protocol::decode_binary(&data) {
                    Ok(value) => self.on_server_packet(value).await,
                    Err(e) => {
                        tracing::warn!(
                            bot = %self.config.name, error = %e,
                            "undecodable server frame"
                        );
                    }
                }
            }
        }
    }

    async fn on_server_packet(&mut self, value: Value) {
        match protocol::classify(value) {
            ServerPacket::HeartbeatEcho { timestamp } => {
                self.server.acknowledge_heartbeat(timestamp);
            }
            ServerPacket::LoginResult { failed } => {
                if failed {
                    tracing::warn!(bot = %self.config.name, "login rejected");
                    self.server.disconnect();
                    self.agent.disconnect();
                }
            }
            ServerPacket::LoginChallenge { question } => {
                self.login(&question);
            }
            ServerPacket::RoomState { seat } => {
                if let Some(seat) = seat {
                    self.seat = seat;
                }
            }
            ServerPacket::Game(frame) => {
                self.on_game_frame(frame).await;
            }
            // Lobby bookkeeping rides this link too, but the registry
            // is fed by its own connection; nothing to do here.
            ServerPacket::RoomList { .. }
            | ServerPacket::PlayerJoined { .. }
            | ServerPacket::PlayerExited { .. }
            | ServerPacket::ReadyAck
            | ServerPacket::RoomDismissed { .. }
            | ServerPacket::LoginInfo
            | ServerPacket::RoundStarted { .. }
            | ServerPacket::RoundAdvanced { .. } => {}
            ServerPacket::Unrecognized(packet) => {
                tracing::debug!(
                    bot = %self.config.name, %packet,
                    "unrecognized server packet"
                );
            }
        }
    }

    /// Answers the login challenge, then requests the room list after
    /// the settle pause (detached, so packet processing continues).
    fn login(&self, question: &str) {
        let answer = tilebridge_solver::solve_answer(question);
        self.server.send(protocol::login(
            &self.config.username,
            &self.config.password,
            question,
            &answer,
        ));

        let server = self.server.clone();
        let settle = self.config.settle_interval;
        tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            server.send(protocol::room_list());
        });
    }

    async fn on_game_frame(&mut self, mut frame: GameFrame) {
        if frame.is_seat_assignment() {
            frame.stamp_received(unix_millis());
            self.ready = true;
            self.seat.game_seat = frame.actor_seat();
        } else if frame.is_round_start() || frame.is_discard() {
            frame.stamp_received(unix_millis());
        }

        let round_over = frame.is_round_result();
        self.relay_game_frame(frame).await;
        if round_over {
            self.status = BotStatus::Idle;
            self.flush().await;
        }
    }

    /// Forwards a gameplay packet to the agent, or answers protocol
    /// minimums while the agent is not ready — a not-yet-initialized
    /// agent is never asked to act.
    async fn relay_game_frame(&mut self, frame: GameFrame) {
        self.status = BotStatus::Playing;

        if !self.ready {
            if frame.is_draw()
                && self.seat.game_seat.is_some()
                && frame.actor_seat() == self.seat.game_seat
            {
                if let Some(tile) = frame.drawn_tile() {
                    self.server.send(protocol::discard(tile));
                }
            } else if frame.has_option_prompt() {
                self.server.send(protocol::decline());
            }
            return;
        }

        self.trace.record(frame.body.clone(), TraceDirection::Receive);
        self.agent.send(frame.body.to_string());
    }

    // -- Agent socket -----------------------------------------------------

    async fn on_agent_event(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Open => {
                tracing::info!(bot = %self.config.name, "connected to agent");
                // A restarted agent sits out until the next round.
                self.ready = false;
                self.killed = false;
            }
            SocketEvent::Closed => {
                tracing::info!(bot = %self.config.name, "agent disconnected");
            }
            // The agent link runs without a heartbeat.
            SocketEvent::HeartbeatDue(_) => {}
            SocketEvent::Text(text) => self.on_agent_frame(&text).await,
            SocketEvent::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => self.on_agent_frame(text).await,
                Err(_) => {
                    tracing::warn!(
                        bot = %self.config.name,
                        "non-utf8 agent frame dropped"
                    );
                }
            },
        }
    }

    async fn on_agent_frame(&mut self, text: &str) {
        let decision = match protocol::parse_decision(text) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(
                    bot = %self.config.name, error = %e,
                    "undecodable agent frame"
                );
                return;
            }
        };

        match decision.severity {
            Some(AgentSeverity::Error) => {
                self.killed = true;
                tracing::warn!(
                    bot = %self.config.name, packet = %decision.body,
                    "agent error"
                );
                return;
            }
            Some(AgentSeverity::Fatal) => {
                self.killed = true;
                tracing::error!(
                    bot = %self.config.name, packet = %decision.body,
                    "agent fatal error"
                );
                self.server.disconnect();
                self.agent.disconnect();
                return;
            }
            None => {}
        }

        self.killed = false;
        self.trace
            .record(decision.body.clone(), TraceDirection::Send);

        if !decision.immediate {
            tokio::time::sleep(self.delay).await;
        }

        if !self.server.send(decision.body.to_string()) {
            // Dropping a decision silently would desync the game;
            // surface it as a killed session instead.
            self.killed = true;
        }
    }
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
