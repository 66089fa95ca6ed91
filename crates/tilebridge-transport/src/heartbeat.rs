//! Single-slot heartbeat liveness detection.
//!
//! Only the most recent heartbeat is tracked: a single "sent at, or
//! zero once acknowledged" field. If the slot is still armed when the
//! next tick fires, the peer missed a full interval and the connection
//! is declared stalled. A late echo for an older heartbeat no longer
//! matches the slot and is ignored, which bounds stall detection to at
//! most two intervals.

use std::sync::atomic::{AtomicU64, Ordering};

/// Tracks the one outstanding heartbeat for a connection.
///
/// All methods are lock-free; the monitor is shared between the socket
/// task (which arms it) and the session dispatch loop (which
/// acknowledges echoes).
#[derive(Debug, Default)]
pub struct HeartbeatMonitor {
    /// Timestamp (unix ms) of the unacknowledged heartbeat, 0 if none.
    pending: AtomicU64,
}

impl HeartbeatMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the slot with the send timestamp of a new heartbeat.
    ///
    /// Returns `false` if the previous heartbeat is still
    /// unacknowledged — the connection is stalled and the caller must
    /// drop it instead of sending another beat.
    pub fn arm(&self, now_ms: u64) -> bool {
        self.pending
            .compare_exchange(0, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Clears the slot if `echo_ms` matches the outstanding heartbeat.
    ///
    /// Echoes for anything other than the armed timestamp are ignored.
    pub fn acknowledge(&self, echo_ms: u64) {
        let _ = self.pending.compare_exchange(
            echo_ms,
            0,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Whether a heartbeat is awaiting its echo.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire) != 0
    }

    /// Forgets any outstanding heartbeat. Called on every fresh open.
    pub fn reset(&self) {
        self.pending.store(0, Ordering::Release);
    }
}
