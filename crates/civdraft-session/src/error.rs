//! Error types for the session layer.

use civdraft_protocol::DraftId;

/// Errors raised by a [`SessionStore`](crate::SessionStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file couldn't be read or written.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record couldn't be encoded or decoded.
    #[error("draft record is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    /// The id can't name a record (empty or not all digits).
    #[error("invalid draft id {0:?}")]
    InvalidId(DraftId),

    /// No unused id turned up after repeated attempts.
    #[error("could not allocate an unused draft id")]
    IdsExhausted,
}
