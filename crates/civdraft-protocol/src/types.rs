//! Core protocol types for the draft session wire format.
//!
//! Every type here travels "on the wire": clients send a [`ClientEnvelope`]
//! (a draft id plus one named [`ClientEvent`]), and the server answers
//! with [`ServerEvent`]s. Event names are the human-readable strings the
//! browser clients already use (`"end turn"`, `"set gamestate"`, ...), so
//! the JSON shape stays stable across server rewrites.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier of one draft session.
///
/// Drafts are addressed by a numeric string (15 decimal digits for
/// server-created drafts). It is kept as a string because clients treat
/// it as an opaque token and leading zeros are significant.
///
/// `#[serde(transparent)]` serializes `DraftId("123")` as just `"123"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftId(pub String);

impl DraftId {
    /// Creates a draft id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the id is non-empty and all ASCII digits.
    ///
    /// Ids end up in file names, so anything else is rejected before it
    /// reaches a store.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a card within one round type's catalog.
///
/// Card ids are only unique per round type: card `7` of the civilization
/// bonus round and card `7` of the unique unit round are different cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u32);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The player number clients send for spectators.
pub const SPECTATOR: i32 = -1;

fn spectator() -> i32 {
    SPECTATOR
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive a server event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every connection subscribed to the draft's channel.
    Room,

    /// Only the connection that sent the triggering event.
    Caller,
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Cosmetic choices a player confirms during the setup phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CivInfo {
    /// Slot index of the player confirming.
    pub player_number: i32,
    /// Display name of the civilization being built.
    pub civ_name: String,
    /// Five palette colours, then division, overlay, and symbol.
    pub flag_palette: Vec<u8>,
    pub architecture: u32,
    pub language: u32,
    #[serde(default)]
    pub wonder: Option<u32>,
    #[serde(default)]
    pub castle: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    /// Encoded image data for a hand-drawn flag.
    #[serde(default)]
    pub custom_flag_data: Option<String>,
}

/// A named event sent by a client.
///
/// `#[serde(tag = "event")]` makes the JSON look like
/// `{ "event": "end turn", "pick": 12, "client_turn": 3 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ClientEvent {
    /// Subscribe this connection to the draft's broadcast channel.
    #[serde(rename = "join room")]
    JoinRoom,

    /// Request the full state. Seated players trigger a room-wide
    /// broadcast, spectators (`player_number < 0`) get a unicast.
    #[serde(rename = "get gamestate")]
    GetGamestate {
        #[serde(default = "spectator")]
        player_number: i32,
    },

    /// Request the full state, always as a unicast.
    #[serde(rename = "get private gamestate")]
    GetPrivateGamestate,

    /// Flip a player's lobby readiness.
    #[serde(rename = "toggle ready")]
    ToggleReady { player_number: i32 },

    /// Host moves the draft from the lobby into cosmetic setup.
    #[serde(rename = "start draft")]
    StartDraft,

    /// Confirm cosmetics; marks the player ready.
    #[serde(rename = "update civ info")]
    UpdateCivInfo(CivInfo),

    /// Submit the final tech tree; marks the player ready.
    #[serde(rename = "update tree")]
    UpdateTree {
        player_number: i32,
        tree: Vec<Vec<u32>>,
    },

    /// Save an in-progress tech tree without confirming it.
    #[serde(rename = "update tree progress")]
    UpdateTreeProgress {
        player_number: i32,
        tree: Vec<Vec<u32>>,
    },

    /// Pick a card. `client_turn` is the client's belief about the
    /// current turn counter; mismatches are dropped as duplicates.
    #[serde(rename = "end turn")]
    EndTurn { pick: CardId, client_turn: u64 },

    /// Fill every emptied board slot with a fresh card.
    #[serde(rename = "refill")]
    Refill,

    /// Redraw the first cards of the board.
    #[serde(rename = "clear")]
    Clear,

    #[serde(rename = "pause timer")]
    PauseTimer,

    #[serde(rename = "resume timer")]
    ResumeTimer,

    /// Lightweight timer refresh; may trigger an automatic pick.
    #[serde(rename = "sync timer")]
    SyncTimer,

    /// The client saw its countdown reach zero on `client_turn`.
    #[serde(rename = "timer expired")]
    TimerExpired { client_turn: u64 },

    /// Create a new draft from a preset. The preset is validated by the
    /// room layer, so it travels as raw JSON here.
    #[serde(rename = "create draft")]
    CreateDraft { preset: serde_json::Value },

    /// Claim a seat: slot 0 for the host, the first free slot otherwise.
    #[serde(rename = "claim slot")]
    ClaimSlot {
        name: String,
        #[serde(default)]
        host: bool,
    },

    /// Relaunch a failed artifact build.
    #[serde(rename = "retry build")]
    RetryBuild,
}

impl ClientEvent {
    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom => "join room",
            Self::GetGamestate { .. } => "get gamestate",
            Self::GetPrivateGamestate => "get private gamestate",
            Self::ToggleReady { .. } => "toggle ready",
            Self::StartDraft => "start draft",
            Self::UpdateCivInfo(_) => "update civ info",
            Self::UpdateTree { .. } => "update tree",
            Self::UpdateTreeProgress { .. } => "update tree progress",
            Self::EndTurn { .. } => "end turn",
            Self::Refill => "refill",
            Self::Clear => "clear",
            Self::PauseTimer => "pause timer",
            Self::ResumeTimer => "resume timer",
            Self::SyncTimer => "sync timer",
            Self::TimerExpired { .. } => "timer expired",
            Self::CreateDraft { .. } => "create draft",
            Self::ClaimSlot { .. } => "claim slot",
            Self::RetryBuild => "retry build",
        }
    }
}

/// One inbound frame: the addressed draft plus the event.
///
/// `draft_id` is optional only because `create draft` has no draft yet.
/// `#[serde(flatten)]` lifts the event's fields into the same JSON
/// object: `{ "draft_id": "42", "event": "refill" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_id: Option<DraftId>,
    #[serde(flatten)]
    pub event: ClientEvent,
}

impl ClientEnvelope {
    /// Wraps an event addressed to `draft_id`.
    pub fn new(draft_id: DraftId, event: ClientEvent) -> Self {
        Self {
            draft_id: Some(draft_id),
            event,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Timer-only state sent by `timer update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStatus {
    pub timer_remaining: u32,
    pub timer_paused: bool,
}

/// An event sent by the server.
///
/// Generic over the session state `S` so this crate doesn't depend on
/// the domain model. `#[serde(tag = "event", content = "data")]`
/// produces `{ "event": "set gamestate", "data": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent<S> {
    /// Full post-mutation session state.
    #[serde(rename = "set gamestate")]
    SetGamestate(S),

    /// The addressed draft has no record.
    #[serde(rename = "draft not found")]
    DraftNotFound(DraftId),

    #[serde(rename = "timer update")]
    TimerUpdate(TimerStatus),

    /// A pick referenced a card that isn't on the board.
    #[serde(rename = "bug")]
    Bug,

    #[serde(rename = "draft created")]
    DraftCreated { id: DraftId },

    #[serde(rename = "slot claimed")]
    SlotClaimed { player_number: usize },

    #[serde(rename = "slot unavailable")]
    SlotUnavailable,

    /// The frame or its payload could not be processed.
    #[serde(rename = "rejected")]
    Rejected { reason: String },
}

// =========================================================================
// Tests
// =========================================================================
