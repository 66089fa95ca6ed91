//! Reconnecting WebSocket transport for tilebridge.
//!
//! Every socket the bridge opens — toward the game server or toward a
//! decision agent — goes through the same [`ReconnectingSocket`]: a
//! client-side dialer that owns one live connection at a time, a
//! literal backoff schedule read from configuration, and an optional
//! single-slot heartbeat liveness monitor.
//!
//! Incoming traffic and lifecycle changes are delivered as
//! [`SocketEvent`]s on an mpsc channel, so the owning session can
//! process everything on one dispatch loop in strict arrival order.
//! The transport knows nothing about packet contents; when a heartbeat
//! is due it emits [`SocketEvent::HeartbeatDue`] and the protocol-aware
//! layer sends the actual frame back through [`ReconnectingSocket::send`].

mod backoff;
mod error;
mod heartbeat;
mod socket;

pub use backoff::{default_reconnect_intervals, ReconnectSchedule};
pub use error::TransportError;
pub use heartbeat::HeartbeatMonitor;
pub use socket::{
    HeartbeatConfig, LinkState, ReconnectingSocket, SocketConfig, SocketEvent,
};
