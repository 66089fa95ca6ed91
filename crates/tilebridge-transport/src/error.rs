/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Dialing the remote endpoint failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The connection dropped mid-stream.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The socket was closed for good and will not reconnect.
    #[error("socket closed")]
    Closed,
}
