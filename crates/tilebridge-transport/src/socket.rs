//! The reconnecting client socket.
//!
//! One `ReconnectingSocket` owns at most one live WebSocket at a time
//! and runs a background task that dials, drives, and re-dials the
//! endpoint forever, until [`ReconnectingSocket::close`] marks it
//! terminal. The backoff between attempts comes from the configured
//! [`ReconnectSchedule`]; the retry counter resets only on a
//! successful open.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;

use crate::backoff::{default_reconnect_intervals, ReconnectSchedule};
use crate::heartbeat::HeartbeatMonitor;

/// How long a single dial attempt may take before it counts as failed.
const DIAL_TIMEOUT: Duration = Duration::from_secs(15);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Heartbeat settings for a socket that keeps itself alive.
///
/// `start_jitter` randomizes the first tick so that many sessions in
/// one process do not beat in lockstep.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    pub interval: Duration,
    pub start_jitter: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            start_jitter: Duration::from_secs(1),
        }
    }
}

/// Configuration for one reconnecting socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    /// WebSocket URL to dial (`ws://` or `wss://`).
    pub endpoint: String,

    /// Backoff schedule between reconnect attempts.
    #[serde(default = "default_reconnect_intervals")]
    pub reconnect_intervals: Vec<Duration>,

    /// Heartbeat monitoring; `None` for sockets whose peer does not
    /// speak a heartbeat (the agent side).
    #[serde(default)]
    pub heartbeat: Option<HeartbeatConfig>,
}

impl SocketConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reconnect_intervals: default_reconnect_intervals(),
            heartbeat: None,
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    pub fn with_intervals(mut self, intervals: Vec<Duration>) -> Self {
        self.reconnect_intervals = intervals;
        self
    }
}

/// Connectivity as seen by status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// A connection is up and no retry is in flight.
    Connected,
    /// Between connections (dialing or waiting out the backoff).
    Connecting,
    /// Terminally closed; will never reconnect.
    Closed,
}

/// Everything a socket delivers to its owning dispatch loop.
#[derive(Debug)]
pub enum SocketEvent {
    /// A connection opened (fires again after every reconnect).
    Open,
    /// A text frame arrived.
    Text(String),
    /// A binary frame arrived (possibly compressed; the protocol layer
    /// decides).
    Binary(Vec<u8>),
    /// The heartbeat interval elapsed with the slot free; the owner
    /// must send a heartbeat frame stamped with this timestamp.
    HeartbeatDue(u64),
    /// The current connection dropped. A reconnect is already
    /// scheduled unless the socket was closed.
    Closed,
}

/// A self-healing client WebSocket.
///
/// Cheap to clone; all clones share the same underlying connection,
/// monitor, and lifecycle flags.
#[derive(Debug, Clone)]
pub struct ReconnectingSocket {
    label: String,
    closed: Arc<AtomicBool>,
    retries: Arc<AtomicU32>,
    outbound: Arc<Mutex<Option<mpsc::UnboundedSender<Message>>>>,
    monitor: Arc<HeartbeatMonitor>,
    kick: Arc<Notify>,
}

impl ReconnectingSocket {
    /// Spawns the dial loop and returns the socket handle plus the
    /// event stream. Dialing starts immediately.
    pub fn connect(
        label: impl Into<String>,
        config: SocketConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SocketEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let socket = Self {
            label: label.into(),
            closed: Arc::new(AtomicBool::new(false)),
            retries: Arc::new(AtomicU32::new(0)),
            outbound: Arc::new(Mutex::new(None)),
            monitor: Arc::new(HeartbeatMonitor::new()),
            kick: Arc::new(Notify::new()),
        };

        tokio::spawn(run(socket.clone(), config, event_tx));

        (socket, event_rx)
    }

    /// Queues a text frame on the live connection.
    ///
    /// Returns `false` (and logs at debug) when no connection is up —
    /// callers that care about delivery must check the result.
    pub fn send(&self, text: impl Into<String>) -> bool {
        let text: String = text.into();
        let Ok(slot) = self.outbound.lock() else {
            return false;
        };
        match slot.as_ref() {
            Some(tx) => tx.send(Message::Text(text.into())).is_ok(),
            None => {
                tracing::debug!(
                    socket = %self.label,
                    "send while disconnected, frame dropped"
                );
                false
            }
        }
    }

    /// Drops the current connection, entering the backoff path.
    ///
    /// The socket reconnects on schedule; use [`close`](Self::close)
    /// to tear it down for good.
    pub fn disconnect(&self) {
        self.kick.notify_one();
    }

    /// Terminally closes the socket. Suppresses all further
    /// reconnection; the flag is checked before every dial and sleep,
    /// so no retry can slip through after this returns.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.kick.notify_one();
    }

    /// Clears the heartbeat slot if `echo_ms` matches the outstanding
    /// beat. Called by the owner when the peer echoes a heartbeat.
    pub fn acknowledge_heartbeat(&self, echo_ms: u64) {
        self.monitor.acknowledge(echo_ms);
    }

    /// Whether a connection is currently up.
    pub fn is_connected(&self) -> bool {
        self.outbound
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::Acquire)
    }

    /// Derived connectivity state.
    pub fn state(&self) -> LinkState {
        if self.closed.load(Ordering::Acquire) {
            LinkState::Closed
        } else if self.is_connected() && self.retries() == 0 {
            LinkState::Connected
        } else {
            LinkState::Connecting
        }
    }
}

/// The dial loop: connect, drive, back off, repeat.
async fn run(
    socket: ReconnectingSocket,
    config: SocketConfig,
    events: mpsc::UnboundedSender<SocketEvent>,
) {
    let schedule = ReconnectSchedule::new(config.reconnect_intervals.clone());

    loop {
        if socket.closed.load(Ordering::Acquire) {
            break;
        }

        let dial = tokio::time::timeout(
            DIAL_TIMEOUT,
            tokio_tungstenite::connect_async(config.endpoint.as_str()),
        );
        match dial.await {
            Ok(Ok((ws, _))) => {
                socket.retries.store(0, Ordering::Release);
                socket.monitor.reset();

                let (out_tx, out_rx) = mpsc::unbounded_channel();
                set_outbound(&socket.outbound, Some(out_tx));
                if events.send(SocketEvent::Open).is_err() {
                    break;
                }
                tracing::info!(socket = %socket.label, "connected");

                drive(&socket, ws, out_rx, &events, config.heartbeat).await;

                set_outbound(&socket.outbound, None);
                tracing::info!(socket = %socket.label, "disconnected");
                if events.send(SocketEvent::Closed).is_err() {
                    break;
                }
            }
            Ok(Err(e)) => {
                let text = e.to_string();
                if is_benign_rejection(&text) {
                    tracing::debug!(
                        socket = %socket.label, error = %text,
                        "handshake rejected"
                    );
                } else {
                    tracing::warn!(
                        socket = %socket.label, error = %text,
                        "connect failed"
                    );
                }
            }
            Err(_) => {
                tracing::warn!(socket = %socket.label, "connect timed out");
            }
        }

        if socket.closed.load(Ordering::Acquire) {
            break;
        }

        let retry = socket.retries.load(Ordering::Acquire);
        let delay = schedule.interval_for(retry);
        socket.retries.store(retry + 1, Ordering::Release);
        tracing::info!(
            socket = %socket.label,
            retry,
            delay_ms = delay.as_millis() as u64,
            "reconnecting after delay"
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = socket.kick.notified() => {}
        }
    }

    set_outbound(&socket.outbound, None);
}

/// Pumps one live connection until it drops, is kicked, or stalls.
async fn drive(
    socket: &ReconnectingSocket,
    ws: WsStream,
    mut out_rx: mpsc::UnboundedReceiver<Message>,
    events: &mpsc::UnboundedSender<SocketEvent>,
    heartbeat: Option<HeartbeatConfig>,
) {
    let (mut sink, mut stream) = ws.split();

    let mut ticker = heartbeat.map(|hb| {
        let jitter = start_jitter(hb.start_jitter);
        tokio::time::interval_at(
            tokio::time::Instant::now() + hb.interval + jitter,
            hb.interval,
        )
    });

    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if events
                        .send(SocketEvent::Text(text.as_str().to_owned()))
                        .is_err()
                    {
                        break;
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    if events
                        .send(SocketEvent::Binary(data.to_vec()))
                        .is_err()
                    {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Ping/pong and raw frames are handled by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let text = e.to_string();
                    if is_benign_rejection(&text) {
                        tracing::debug!(
                            socket = %socket.label, error = %text,
                            "stream error"
                        );
                    } else {
                        tracing::warn!(
                            socket = %socket.label, error = %text,
                            "stream error"
                        );
                    }
                    break;
                }
            },
            out = out_rx.recv() => match out {
                Some(msg) => {
                    if let Err(e) = sink.send(msg).await {
                        tracing::debug!(
                            socket = %socket.label, error = %e,
                            "send failed"
                        );
                        break;
                    }
                }
                None => break,
            },
            _ = maybe_tick(&mut ticker) => {
                let now = unix_millis();
                if !socket.monitor.arm(now) {
                    tracing::warn!(
                        socket = %socket.label,
                        "heartbeat unanswered, dropping connection"
                    );
                    break;
                }
                if events.send(SocketEvent::HeartbeatDue(now)).is_err() {
                    break;
                }
            }
            _ = socket.kick.notified() => break,
        }
    }

    let _ = sink.close().await;
}

/// Resolves when the heartbeat interval elapses; pends forever for
/// sockets without a heartbeat so `select!` keeps serving the other
/// branches.
async fn maybe_tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn set_outbound(
    slot: &Mutex<Option<mpsc::UnboundedSender<Message>>>,
    value: Option<mpsc::UnboundedSender<Message>>,
) {
    if let Ok(mut guard) = slot.lock() {
        *guard = value;
    }
}

fn start_jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(rand::rng().random_range(0..max_ms))
    }
}

/// The game server rejects surplus handshakes with a non-101 status;
/// that rejection is routine and not worth a warning.
fn is_benign_rejection(message: &str) -> bool {
    message.contains("invalid status code")
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
