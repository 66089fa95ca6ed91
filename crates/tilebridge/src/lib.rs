//! # tilebridge
//!
//! Unattended bots for a real-time multiplayer tile-game service.
//! Each bot speaks two wire protocols at once — one to the
//! authoritative game server, one to an external decision agent — and
//! faithfully bridges the two: server events become agent requests,
//! agent decisions become server commands, and both connections heal
//! themselves across arbitrary disconnects.
//!
//! The pieces, bottom up:
//!
//! - [`tilebridge_transport`] — the reconnecting socket every
//!   connection runs on, with a literal backoff schedule and a
//!   single-slot heartbeat monitor.
//! - [`tilebridge_protocol`] — both wire formats and the typed
//!   classification of server packets.
//! - [`tilebridge_solver`] — the waiting-tile search that answers the
//!   login challenge.
//! - [`tilebridge_lobby`] — the room registry and the lobby connection
//!   that feeds it.
//! - [`tilebridge_session`] — the bot session actor that routes
//!   packets between its two sockets.
//!
//! This meta-crate ties them into [`BridgeService`]: one registry, one
//! lobby feed, many bots, with a narrow command surface for whatever
//! frontend drives it.

mod error;
mod service;

pub use error::BridgeError;
pub use service::{BotEntry, BridgeConfig, BridgeService};

pub mod prelude {
    pub use crate::{BotEntry, BridgeConfig, BridgeError, BridgeService};
    pub use tilebridge_lobby::{Room, RoomRegistry, SharedRegistry};
    pub use tilebridge_session::{BotConfig, BotHandle, DisplayStatus};
    pub use tilebridge_transport::{HeartbeatConfig, LinkState};
}
