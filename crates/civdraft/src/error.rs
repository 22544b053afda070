//! Unified error type for the civdraft server.

use civdraft_draft::DraftError;
use civdraft_protocol::ProtocolError;
use civdraft_room::RoomError;
use civdraft_session::StoreError;
use civdraft_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CivdraftError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Loading the card catalog failed.
    #[error(transparent)]
    Draft(#[from] DraftError),

    /// The draft store could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A room failed to handle an event.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// An environment variable held an unusable value.
    #[error("invalid configuration: {0}")]
    Config(String),
}
