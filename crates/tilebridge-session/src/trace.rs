//! The per-session packet trace.
//!
//! Every gameplay packet a session relays is appended here, tagged
//! with its direction, and flushed to one file per flush. Trace loss
//! is tolerated: a failed write logs a warning and the drained entries
//! are gone, because gameplay must never stall on disk I/O.

use std::path::Path;

use serde_json::Value;

/// Which way a traced packet was travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceDirection {
    /// Agent decision forwarded toward the server.
    Send,
    /// Server packet forwarded toward the agent.
    Receive,
}

impl TraceDirection {
    fn as_str(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Receive => "receive",
        }
    }
}

/// Append-only buffer of traced packets, drained atomically on flush.
#[derive(Debug, Default)]
pub(crate) struct TraceBuffer {
    entries: Vec<Value>,
}

impl TraceBuffer {
    pub(crate) fn record(&mut self, mut packet: Value, direction: TraceDirection) {
        if let Value::Object(map) = &mut packet {
            map.insert("type".to_owned(), direction.as_str().into());
        }
        self.entries.push(packet);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn drain(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.entries)
    }
}

/// Writes one flush worth of entries to `<name>-<unix_ms>.log`.
pub(crate) async fn write_trace(dir: &Path, name: &str, entries: Vec<Value>) {
    let path = dir.join(format!("{name}-{}.log", crate::session::unix_millis()));
    let serialized = match serde_json::to_string(&entries) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize trace");
            return;
        }
    };
    match tokio::fs::write(&path, serialized).await {
        Ok(()) => {
            tracing::info!(path = %path.display(), entries = entries.len(),
                "trace written");
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(),
                "failed to write trace");
        }
    }
}
