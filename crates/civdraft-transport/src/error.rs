/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The peer connected but never completed the WebSocket upgrade.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// A binary frame that isn't UTF-8 text.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}
