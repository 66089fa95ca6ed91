//! Wire protocols for tilebridge.
//!
//! Two independent JSON protocols meet in this crate:
//!
//! - **Server protocol** — packets addressed by a numeric method `m`
//!   and, for lobby traffic (`m = 1`), a numeric route `r`. Gameplay
//!   uses `m = 2` with its own sub-routes. Binary frames are
//!   zlib-compressed JSON; text frames are plain JSON.
//! - **Agent protocol** — gameplay packets mirrored to an external
//!   decision process, with an optional `_meta` envelope carrying an
//!   error/fatal marker and a delivery hint. The envelope is stripped
//!   before anything is forwarded to the server.
//!
//! Payloads stay opaque [`serde_json::Value`]s; only the fields the
//! bridge must inspect get typed views. Incoming packets are
//! classified into [`ServerPacket`] at the dispatch boundary, with an
//! explicit [`ServerPacket::Unrecognized`] fallback so nothing is
//! dropped silently.

mod agent;
mod error;
mod frame;
mod request;
mod server;

pub use agent::{parse_decision, AgentDecision, AgentSeverity};
pub use error::ProtocolError;
pub use frame::{decode_binary, decode_text, encode};
pub use request::{
    decline, discard, exit_room, heartbeat, join_room, login, ready,
    request_login_challenge, room_list,
};
pub use server::{
    classify, extract_stats, game_route, lobby_route, method, GameFrame,
    LobbyStats, PlayerBrief, RoomSnapshot, SeatRef, SeatStatus, ServerPacket,
};
