//! The room registry: server events in, consistent room map out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tilebridge_protocol::{LobbyStats, PlayerBrief, RoomSnapshot, SeatRef};
use tokio::sync::RwLock;

/// Registry shared between its one producer (the lobby connection)
/// and any number of reading sessions.
pub type SharedRegistry = Arc<RwLock<RoomRegistry>>;

/// Creates an empty shared registry.
pub fn new_shared() -> SharedRegistry {
    Arc::new(RwLock::new(RoomRegistry::new()))
}

/// One room as the registry sees it. Callers receive clones; the
/// registry alone mutates.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: u64,
    pub title: String,
    pub create_time: u64,
    pub finish_time: u64,
    /// `-1` until the first round starts.
    pub round_index: i32,
    pub round_count: u32,
    /// Exactly four slots, in seat order.
    pub players: [Option<PlayerBrief>; 4],
    pub has_password: bool,
    /// Set once the game starts; its presence distinguishes waiting
    /// from in-progress.
    pub start_time: Option<u64>,
    /// Opaque game settings, passed through untouched.
    pub settings: Value,
}

impl Room {
    fn from_snapshot(snapshot: RoomSnapshot, now_ms: u64) -> Self {
        let mut players: [Option<PlayerBrief>; 4] = Default::default();
        for (slot, player) in snapshot.players.into_iter().take(4).enumerate()
        {
            players[slot] = player;
        }
        Self {
            id: snapshot.id,
            title: snapshot.title,
            create_time: snapshot.create_time,
            finish_time: snapshot.finish_time,
            round_index: snapshot.round_index,
            round_count: snapshot.round_count,
            players,
            has_password: snapshot.has_password,
            start_time: snapshot.in_progress.then_some(now_ms),
            settings: snapshot.settings,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.start_time.is_none()
    }

    pub fn is_full(&self) -> bool {
        self.players.iter().all(Option::is_some)
    }

    pub fn seat_is_vacant(&self, seat: usize) -> bool {
        self.players.get(seat).is_some_and(Option::is_none)
    }

    /// First vacant seat index, if any.
    pub fn first_vacant_seat(&self) -> Option<usize> {
        self.players.iter().position(Option::is_none)
    }
}

/// Map of all known rooms plus the lobby-wide counters.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<u64, Room>,
    stats: LobbyStats,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts every room in a snapshot wholesale. Used for the
    /// initial room list and every full refresh.
    pub fn apply_snapshot(&mut self, snapshots: Vec<RoomSnapshot>) {
        let now = now_millis();
        for snapshot in snapshots {
            let room = Room::from_snapshot(snapshot, now);
            tracing::debug!(room_id = room.id, title = %room.title,
                waiting = room.is_waiting(), "room snapshot");
            self.rooms.insert(room.id, room);
        }
    }

    /// Seats a player, clearing the source slot on a seat transfer.
    pub fn apply_join(&mut self, to: &SeatRef, from: Option<&SeatRef>) {
        if let Some(room) = self.rooms.get_mut(&to.room_id) {
            if let Some(slot) = room.players.get_mut(to.seat) {
                *slot = to.player.clone();
            }
        }
        if let Some(from) = from {
            if let Some(room) = self.rooms.get_mut(&from.room_id) {
                if let Some(slot) = room.players.get_mut(from.seat) {
                    *slot = None;
                }
            }
        }
    }

    /// Vacates a seat.
    pub fn apply_exit(&mut self, seat: &SeatRef) {
        if let Some(room) = self.rooms.get_mut(&seat.room_id) {
            if let Some(slot) = room.players.get_mut(seat.seat) {
                *slot = None;
            }
        }
    }

    /// Deletes a room.
    pub fn apply_dismiss(&mut self, room_id: u64) {
        if let Some(room) = self.rooms.remove(&room_id) {
            tracing::debug!(room_id, title = %room.title, "room dismissed");
        }
    }

    /// Marks a room started, but only when all four seats are filled.
    ///
    /// The room could have been dismissed or emptied between the
    /// server-side decision and this client receiving it, so a
    /// not-full room ignores the event rather than entering a state
    /// the seat map contradicts.
    pub fn apply_start(&mut self, room_id: u64) {
        if let Some(room) = self.rooms.get_mut(&room_id) {
            if room.is_full() {
                room.round_index = 0;
                room.start_time = Some(now_millis());
                tracing::debug!(room_id, title = %room.title, "room started");
            }
        }
    }

    /// Advances a room's round counter.
    pub fn apply_round_advance(&mut self, room_id: u64, round_index: u32) {
        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.round_index = round_index as i32;
        }
    }

    /// Replaces the lobby counters wholesale; they are never computed
    /// client-side.
    pub fn set_stats(&mut self, stats: LobbyStats) {
        self.stats = stats;
    }

    pub fn stats(&self) -> LobbyStats {
        self.stats
    }

    /// Read-only snapshot of one room.
    pub fn get(&self, room_id: u64) -> Option<Room> {
        self.rooms.get(&room_id).cloned()
    }

    /// Drops every room. Called when the lobby connection reopens and
    /// a fresh snapshot is about to arrive.
    pub fn clear(&mut self) {
        self.rooms.clear();
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Rooms still gathering players.
    pub fn waiting_rooms(&self) -> Vec<Room> {
        self.rooms
            .values()
            .filter(|room| room.is_waiting())
            .cloned()
            .collect()
    }

    /// Rooms with a game underway.
    pub fn playing_rooms(&self) -> Vec<Room> {
        self.rooms
            .values()
            .filter(|room| !room.is_waiting())
            .cloned()
            .collect()
    }

    /// Waiting rooms whose title contains `pattern`. The narrow lookup
    /// the orchestrator uses to resolve a join target.
    pub fn find_waiting(&self, pattern: &str) -> Vec<Room> {
        self.rooms
            .values()
            .filter(|room| room.is_waiting() && room.title.contains(pattern))
            .cloned()
            .collect()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
