//! Error types for the draft state machine.

use civdraft_protocol::CardId;

use crate::Phase;

/// Errors raised while validating or mutating a draft record.
///
/// None of these leave the record half-mutated: every operation checks
/// its preconditions before it touches state.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    /// The preset can't produce a playable draft.
    #[error("invalid preset: {0}")]
    InvalidPreset(String),

    /// The event isn't allowed in the draft's current phase.
    #[error("expected phase {expected}, draft is in phase {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    /// The player number doesn't name a seat (spectator or out of range).
    #[error("player number {0} is not a seat in this draft")]
    NotASeat(i32),

    /// A slot claim came without a display name.
    #[error("a slot can't be claimed without a name")]
    MissingName,

    /// Every seat is already claimed.
    #[error("no free slot left")]
    NoFreeSlot,

    /// `start draft` arrived before every seat was claimed.
    #[error("{0} slot(s) still unclaimed")]
    SlotsUnclaimed(usize),

    /// The client's turn number doesn't match the draft's. Expected
    /// under normal latency: duplicates and late retries land here.
    #[error("stale turn: client sent {client}, draft is on {current}")]
    StaleTurn { client: u64, current: u64 },

    /// The pick isn't on the board despite a matching turn number.
    #[error("card {pick} is not on the board at turn {turn}")]
    CardNotFound { pick: CardId, turn: u64 },

    /// The turn counter is past the last round type.
    #[error("turn {0} is past the final round")]
    DraftOver(u64),

    /// The stored record contradicts itself (e.g. missing turn order).
    #[error("corrupt draft state: {0}")]
    CorruptState(String),

    #[error("unknown phase value {0}")]
    UnknownPhase(u8),

    #[error("invalid board slot value {0}")]
    InvalidBoardSlot(i64),

    /// The catalog file couldn't be parsed.
    #[error("invalid card catalog: {0}")]
    Catalog(#[from] serde_json::Error),

    /// The catalog file couldn't be read.
    #[error("failed to read card catalog: {0}")]
    CatalogIo(#[from] std::io::Error),
}
