//! Session status and its externally visible derivation.

use tilebridge_transport::LinkState;

/// The primary session cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotStatus {
    /// Not seated anywhere; available for a join.
    Idle,
    /// Seated and waiting for the game to start.
    Waiting,
    /// Relaying an active game.
    Playing,
}

/// What the orchestrator sees. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
    Idle,
    Waiting,
    Playing,
    /// Deliberately torn down; terminal.
    Closed,
    /// The agent reported an unrecoverable condition, or the session
    /// is mid-game without a ready agent.
    Killed,
    /// At least one socket is down or retrying.
    Connecting,
}

/// Folds the session's independent flags and both links into the one
/// externally visible state.
///
/// Pure and total over its inputs: `closed` dominates everything,
/// `killed` dominates connectivity, and a session that is nominally
/// playing without a ready agent counts as killed because nothing is
/// answering for it.
pub fn display_status(
    status: BotStatus,
    closed: bool,
    killed: bool,
    ready: bool,
    server: LinkState,
    agent: LinkState,
) -> DisplayStatus {
    if closed {
        return DisplayStatus::Closed;
    }
    if killed {
        return DisplayStatus::Killed;
    }
    if status == BotStatus::Playing && !ready {
        return DisplayStatus::Killed;
    }
    if server != LinkState::Connected || agent != LinkState::Connected {
        return DisplayStatus::Connecting;
    }
    match status {
        BotStatus::Idle => DisplayStatus::Idle,
        BotStatus::Waiting => DisplayStatus::Waiting,
        BotStatus::Playing => DisplayStatus::Playing,
    }
}
