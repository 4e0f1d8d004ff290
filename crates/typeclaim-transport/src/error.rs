/// Failures at the socket level.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Writing a frame (data, ping or close) failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener, accepting a socket or the WebSocket
    /// handshake failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}
