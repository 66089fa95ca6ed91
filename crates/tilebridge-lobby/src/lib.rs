//! Lobby state for tilebridge.
//!
//! The server pushes an unordered stream of incremental room events;
//! [`RoomRegistry`] folds them into the authoritative map of room id →
//! room state plus the lobby-wide occupancy counters. The registry is
//! a best-effort mirror: events for rooms it has never seen are
//! silently dropped, because races between a snapshot and the
//! incremental stream are routine.
//!
//! [`LobbyClient`] is the registry's single producer — a dedicated
//! reconnecting connection that logs in (answering the waiting-tile
//! challenge), pulls a fresh snapshot on every open, and applies every
//! event it receives. Everyone else only reads, through the shared
//! [`SharedRegistry`] lock.

mod client;
mod registry;

pub use client::{LobbyClient, LobbyConfig};
pub use registry::{new_shared, Room, RoomRegistry, SharedRegistry};
