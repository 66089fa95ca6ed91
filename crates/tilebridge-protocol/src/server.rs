//! Server packet classification.
//!
//! The server speaks loosely-typed JSON objects addressed by `(m, r)`.
//! This module turns each incoming packet into a [`ServerPacket`]
//! variant at the dispatch boundary, keeping the payload itself as an
//! opaque [`Value`] wherever the bridge only relays it. Anything the
//! classifier does not know lands in [`ServerPacket::Unrecognized`] so
//! the dispatch site can log it.
//!
//! Field names on the wire are single letters; the typed views below
//! give them real names and nothing more.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level packet methods.
pub mod method {
    /// Lobby traffic: login, room management, seat state.
    pub const LOBBY: u64 = 1;
    /// Gameplay traffic, relayed between server and agent.
    pub const GAME: u64 = 2;
    /// Heartbeat echo.
    pub const HEARTBEAT: u64 = 5;
}

/// Routes under `m = 1`.
pub mod lobby_route {
    pub const LOGIN_RESULT: u64 = 1;
    pub const ROOM_LIST: u64 = 2;
    pub const ROOM_UPDATE: u64 = 3;
    pub const JOIN: u64 = 4;
    pub const EXIT: u64 = 5;
    pub const READY: u64 = 6;
    pub const DISMISS: u64 = 7;
    pub const ROOM_STATE: u64 = 8;
    pub const LOGIN_INFO: u64 = 9;
    pub const LOGIN_CHALLENGE: u64 = 10;
    pub const ROUND: u64 = 13;
}

/// Routes under `m = 2`.
pub mod game_route {
    pub const ROUND_START: u64 = 1;
    pub const DISCARD: u64 = 2;
    pub const DRAW: u64 = 6;
    pub const DECLINE: u64 = 9;
    pub const SEAT_ASSIGNMENT: u64 = 14;
    pub const ROUND_RESULT: u64 = 17;
}

/// A player occupying a room slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerBrief {
    pub name: String,
    pub vip: bool,
}

/// One room as carried by a room-list packet.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub id: u64,
    pub title: String,
    pub create_time: u64,
    pub finish_time: u64,
    /// `-1` while the room is still waiting.
    pub round_index: i32,
    pub round_count: u32,
    /// Always exactly four slots.
    pub players: Vec<Option<PlayerBrief>>,
    pub has_password: bool,
    /// Whether the snapshot describes a game already underway.
    pub in_progress: bool,
    /// Opaque game settings blob, passed through untouched.
    pub settings: Value,
}

impl RoomSnapshot {
    /// Decodes a room entry. Returns `None` when the entry has no id —
    /// the registry cannot key it, so the list parser skips it.
    fn from_value(value: &Value) -> Option<Self> {
        let id = value.get("i").and_then(Value::as_u64)?;
        let settings = value.get("g").cloned().unwrap_or(Value::Null);
        let round = value.get("n").and_then(Value::as_i64).unwrap_or(0);

        let mut players: Vec<Option<PlayerBrief>> = value
            .get("p")
            .and_then(Value::as_array)
            .map(|slots| slots.iter().map(parse_player).collect())
            .unwrap_or_default();
        players.resize(4, None);

        Some(Self {
            id,
            title: settings
                .get("t")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            create_time: value.get("t").and_then(Value::as_u64).unwrap_or(0),
            finish_time: value.get("e").and_then(Value::as_u64).unwrap_or(0),
            round_index: (round - 1) as i32,
            round_count: settings
                .get("n")
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32,
            players,
            has_password: truthy(value.get("u")),
            in_progress: round != 0,
            settings,
        })
    }
}

/// A slot entry is a player only when it is a non-empty object;
/// `null` and `{}` both mean vacant.
fn parse_player(value: &Value) -> Option<PlayerBrief> {
    let slot = value.as_object()?;
    if slot.is_empty() {
        return None;
    }
    Some(PlayerBrief {
        name: slot
            .get("n")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        vip: truthy(slot.get("v")),
    })
}

/// A `(room, slot)` reference from a join/exit/dismiss event, with the
/// player description when the event carries one.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatRef {
    pub room_id: u64,
    pub seat: usize,
    pub player: Option<PlayerBrief>,
}

impl SeatRef {
    fn from_value(value: Option<&Value>) -> Option<Self> {
        let value = value?;
        let room_id = value.get("i").and_then(Value::as_u64)?;
        let seat = value.get("s").and_then(Value::as_u64).unwrap_or(0) as usize;
        let player = value
            .get("n")
            .and_then(Value::as_str)
            .map(|name| PlayerBrief {
                name: name.to_owned(),
                vip: truthy(value.get("v")),
            });
        Some(Self {
            room_id,
            seat,
            player,
        })
    }
}

/// The bot's own seat as pushed by the server (`m=1 r=8`), extended
/// with the in-game seat learned from the seat-assignment packet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeatStatus {
    pub room_id: Option<u64>,
    pub seat: Option<u64>,
    pub name: Option<String>,
    pub vip: bool,
    /// Seat index inside the running game (`m=2 r=14`).
    pub game_seat: Option<u64>,
}

impl SeatStatus {
    fn from_value(value: Option<&Value>) -> Option<Self> {
        let value = value?;
        value.as_object()?;
        Some(Self {
            room_id: value.get("i").and_then(Value::as_u64),
            seat: value.get("s").and_then(Value::as_u64),
            name: value
                .get("n")
                .and_then(Value::as_str)
                .map(str::to_owned),
            vip: truthy(value.get("v")),
            game_seat: None,
        })
    }
}

/// Lobby occupancy counters, replaced wholesale whenever the server
/// attaches a stats block — never computed client-side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyStats {
    pub idle: u32,
    pub waiting: u32,
    pub playing: u32,
    pub auto: u32,
}

/// Pulls the stats block off a packet, if it carries one. Stats may
/// ride on any route, so callers check every packet.
pub fn extract_stats(value: &Value) -> Option<LobbyStats> {
    let stats = value.get("s")?;
    stats.get("f")?;
    Some(LobbyStats {
        idle: stats.get("f").and_then(Value::as_u64).unwrap_or(0) as u32,
        waiting: stats.get("w").and_then(Value::as_u64).unwrap_or(0) as u32,
        playing: stats.get("p").and_then(Value::as_u64).unwrap_or(0) as u32,
        auto: stats.get("o").and_then(Value::as_u64).unwrap_or(0) as u32,
    })
}

/// A gameplay packet (`m = 2`), kept whole for relaying with typed
/// accessors for the few fields the bridge inspects.
#[derive(Debug, Clone, PartialEq)]
pub struct GameFrame {
    pub route: u64,
    pub body: Value,
}

impl GameFrame {
    pub fn is_round_start(&self) -> bool {
        self.route == game_route::ROUND_START
    }

    pub fn is_draw(&self) -> bool {
        self.route == game_route::DRAW
    }

    pub fn is_discard(&self) -> bool {
        self.route == game_route::DISCARD
    }

    pub fn is_seat_assignment(&self) -> bool {
        self.route == game_route::SEAT_ASSIGNMENT
    }

    pub fn is_round_result(&self) -> bool {
        self.route == game_route::ROUND_RESULT
    }

    /// The seat a draw/assignment packet refers to.
    pub fn actor_seat(&self) -> Option<u64> {
        self.body.get("v").and_then(Value::as_u64)
    }

    /// The tile just drawn; the low byte of `t` is the tile code.
    pub fn drawn_tile(&self) -> Option<u64> {
        self.body
            .get("t")
            .and_then(Value::as_u64)
            .map(|t| t & 0xff)
    }

    /// Whether the packet offers the bot an option to act on.
    pub fn has_option_prompt(&self) -> bool {
        truthy(self.body.get("tt"))
    }

    /// Attaches a receive timestamp for the agent's timing.
    pub fn stamp_received(&mut self, unix_ms: u64) {
        if let Value::Object(map) = &mut self.body {
            map.insert("_ts".to_owned(), unix_ms.into());
        }
    }
}

/// Every server packet the bridge understands, plus the fallback.
#[derive(Debug)]
pub enum ServerPacket {
    /// `m=5` — echo of a heartbeat this client sent.
    HeartbeatEcho { timestamp: u64 },
    /// `m=1 r=1` — login outcome; `failed` when the server flags an error.
    LoginResult { failed: bool },
    /// `m=1 r=2|3` — full or incremental room snapshots.
    RoomList { rooms: Vec<RoomSnapshot> },
    /// `m=1 r=4` — a player took a seat, possibly vacating another.
    PlayerJoined {
        to: SeatRef,
        from: Option<SeatRef>,
    },
    /// `m=1 r=5` — a player left a seat.
    PlayerExited { seat: SeatRef },
    /// `m=1 r=6` — ready acknowledgment.
    ReadyAck,
    /// `m=1 r=7` — a room was dismissed.
    RoomDismissed { room_id: u64 },
    /// `m=1 r=8` — room-state push; carries this client's seat when
    /// addressed to a seated bot.
    RoomState { seat: Option<SeatStatus> },
    /// `m=1 r=9` — post-login account info (unused by the bridge).
    LoginInfo,
    /// `m=1 r=10` — the waiting-tile challenge to answer at login.
    LoginChallenge { question: String },
    /// `m=1 r=13, p=1` — a room's game started.
    RoundStarted { room_id: u64 },
    /// `m=1 r=13, p>1` — a room advanced to the given round.
    RoundAdvanced { room_id: u64, round_index: u32 },
    /// `m=2` — gameplay, relayed to the agent.
    Game(GameFrame),
    /// Anything else; the dispatch site logs it.
    Unrecognized(Value),
}

/// Classifies a decoded packet by `(m, r)`.
pub fn classify(value: Value) -> ServerPacket {
    let m = value.get("m").and_then(Value::as_u64);
    let r = value.get("r").and_then(Value::as_u64);

    match (m, r) {
        (Some(method::HEARTBEAT), _) => ServerPacket::HeartbeatEcho {
            timestamp: value.get("t").and_then(Value::as_u64).unwrap_or(0),
        },
        (Some(method::LOBBY), Some(lobby_route::LOGIN_RESULT)) => {
            ServerPacket::LoginResult {
                failed: truthy(value.get("e")),
            }
        }
        (
            Some(method::LOBBY),
            Some(lobby_route::ROOM_LIST | lobby_route::ROOM_UPDATE),
        ) => {
            let rooms = value
                .get("t")
                .and_then(Value::as_array)
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(RoomSnapshot::from_value)
                        .collect()
                })
                .unwrap_or_default();
            ServerPacket::RoomList { rooms }
        }
        (Some(method::LOBBY), Some(lobby_route::JOIN)) => {
            match SeatRef::from_value(value.get("t")) {
                Some(to) => ServerPacket::PlayerJoined {
                    to,
                    from: SeatRef::from_value(value.get("f")),
                },
                None => ServerPacket::Unrecognized(value),
            }
        }
        (Some(method::LOBBY), Some(lobby_route::EXIT)) => {
            match SeatRef::from_value(value.get("t")) {
                Some(seat) => ServerPacket::PlayerExited { seat },
                None => ServerPacket::Unrecognized(value),
            }
        }
        (Some(method::LOBBY), Some(lobby_route::READY)) => {
            ServerPacket::ReadyAck
        }
        (Some(method::LOBBY), Some(lobby_route::DISMISS)) => {
            match SeatRef::from_value(value.get("t")) {
                Some(seat) => ServerPacket::RoomDismissed {
                    room_id: seat.room_id,
                },
                None => ServerPacket::Unrecognized(value),
            }
        }
        (Some(method::LOBBY), Some(lobby_route::ROOM_STATE)) => {
            ServerPacket::RoomState {
                seat: SeatStatus::from_value(value.get("t")),
            }
        }
        (Some(method::LOBBY), Some(lobby_route::LOGIN_INFO)) => {
            ServerPacket::LoginInfo
        }
        (Some(method::LOBBY), Some(lobby_route::LOGIN_CHALLENGE)) => {
            ServerPacket::LoginChallenge {
                question: value
                    .get("z")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
            }
        }
        (Some(method::LOBBY), Some(lobby_route::ROUND)) => {
            let Some(room_id) = value.get("i").and_then(Value::as_u64) else {
                return ServerPacket::Unrecognized(value);
            };
            let phase = value.get("p").and_then(Value::as_u64).unwrap_or(0);
            if phase == 1 {
                ServerPacket::RoundStarted { room_id }
            } else {
                ServerPacket::RoundAdvanced {
                    room_id,
                    round_index: phase as u32,
                }
            }
        }
        (Some(method::GAME), Some(route)) => ServerPacket::Game(GameFrame {
            route,
            body: value,
        }),
        _ => ServerPacket::Unrecognized(value),
    }
}

/// JavaScript-style truthiness, matching how the server uses flags.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}
