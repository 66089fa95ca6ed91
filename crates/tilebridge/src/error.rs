//! Unified error type for the bridge.

use tilebridge_protocol::ProtocolError;
use tilebridge_solver::SolverError;
use tilebridge_transport::TransportError;

/// Top-level error for users of the `tilebridge` meta-crate.
///
/// The transparent variants wrap the per-crate errors so `?` converts
/// them automatically; the rest cover service-level validation, which
/// is the only place the core reports failure as an error rather than
/// as session state.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, inflate).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A solver-level error (malformed login challenge).
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// No bot with this name exists.
    #[error("no such bot: {0}")]
    UnknownBot(String),

    /// Every bot is busy, connecting, or killed.
    #[error("no idle bot available")]
    NoIdleBot,

    /// The registry knows no room with this id.
    #[error("room {0} not found")]
    RoomNotFound(u64),

    /// The room's game already started.
    #[error("room {0} already started")]
    RoomStarted(u64),

    /// The requested seat is occupied.
    #[error("seat {1} in room {0} is taken")]
    SeatTaken(u64, usize),

    /// All four seats are occupied.
    #[error("room {0} is full")]
    RoomFull(u64),

    /// The server did not confirm the seat within the settle pause.
    #[error("join was not confirmed by the server")]
    JoinUnconfirmed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectFailed("refused".into());
        let bridge_err: BridgeError = err.into();
        assert!(matches!(bridge_err, BridgeError::Transport(_)));
        assert!(bridge_err.to_string().contains("refused"));
    }

    #[test]
    fn test_from_solver_error() {
        let err = SolverError::BadHandSize(2);
        let bridge_err: BridgeError = err.into();
        assert!(matches!(bridge_err, BridgeError::Solver(_)));
    }

    #[test]
    fn test_service_errors_render_context() {
        assert_eq!(
            BridgeError::SeatTaken(42, 2).to_string(),
            "seat 2 in room 42 is taken"
        );
        assert_eq!(
            BridgeError::UnknownBot("bot-z".into()).to_string(),
            "no such bot: bot-z"
        );
    }
}
