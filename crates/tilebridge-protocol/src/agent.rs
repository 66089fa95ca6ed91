//! The agent-side protocol: gameplay packets with an optional `_meta`
//! envelope.
//!
//! The envelope carries `{t: "error" | "fatal", d: false}`. `t` marks
//! a decision the bridge must not forward; `d: false` asks for
//! immediate delivery (no pacing delay). The envelope never reaches
//! the server — parsing strips it from the body.

use serde_json::Value;

use crate::ProtocolError;

/// How badly the agent says things went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentSeverity {
    /// Recoverable: the session is marked killed but stays connected.
    Error,
    /// Unrecoverable: the session tears both sockets down.
    Fatal,
}

/// One parsed agent message, envelope already stripped.
#[derive(Debug, Clone)]
pub struct AgentDecision {
    /// The gameplay packet to forward verbatim.
    pub body: Value,
    /// Set when the agent reported a failure instead of a move.
    pub severity: Option<AgentSeverity>,
    /// `true` when the packet must skip the pacing delay.
    pub immediate: bool,
}

/// Parses a frame from the agent socket.
pub fn parse_decision(text: &str) -> Result<AgentDecision, ProtocolError> {
    let mut body: Value =
        serde_json::from_str(text).map_err(ProtocolError::Decode)?;

    let meta = match &mut body {
        Value::Object(map) => map.remove("_meta"),
        _ => None,
    };

    let (severity, immediate) = match meta {
        Some(meta) => {
            let severity = match meta.get("t").and_then(Value::as_str) {
                Some("error") => Some(AgentSeverity::Error),
                Some("fatal") => Some(AgentSeverity::Fatal),
                _ => None,
            };
            let immediate =
                meta.get("d").and_then(Value::as_bool) == Some(false);
            (severity, immediate)
        }
        None => (None, false),
    };

    Ok(AgentDecision {
        body,
        severity,
        immediate,
    })
}
