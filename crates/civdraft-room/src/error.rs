//! Error types for the room layer.

use civdraft_draft::DraftError;
use civdraft_protocol::DraftId;
use civdraft_session::StoreError;

/// Errors that can occur during room operations.
///
/// Client mistakes (stale turns, wrong phase, unknown cards) are not
/// errors at this level: [`DraftProtocol`](crate::DraftProtocol) turns
/// them into outbound events. What's left is infrastructure failing.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The draft has no record.
    #[error("draft {0} not found")]
    NotFound(DraftId),

    /// The room's command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(DraftId),

    /// A create request carried an unusable preset.
    #[error("invalid preset: {0}")]
    InvalidPreset(String),

    /// Reading or writing the draft record failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The draft rules rejected an internal transition (for example a
    /// build result for a draft that is no longer generating).
    #[error(transparent)]
    Draft(#[from] DraftError),
}
