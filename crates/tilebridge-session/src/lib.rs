//! Bot sessions for tilebridge.
//!
//! A [`BotHandle`] fronts one automated participant: an actor task
//! that owns two reconnecting sockets — one to the game server, one to
//! the external decision agent — and relays gameplay packets between
//! them. Everything a session does (socket events, timers, commands)
//! runs on its single dispatch loop, so packets on each socket are
//! processed strictly in arrival order and no state is shared.
//!
//! Failure never surfaces as an error to the orchestrator; it is
//! folded into the session's [`DisplayStatus`], which the orchestrator
//! polls.

mod config;
mod handle;
mod session;
mod status;
mod trace;

pub use config::BotConfig;
pub use handle::BotHandle;
pub use status::{display_status, BotStatus, DisplayStatus};
pub use trace::TraceDirection;
