//! The draft session record.
//!
//! A [`Draft`] is the root aggregate: one per draft id, serialized to JSON
//! by the store and sent verbatim to clients in `set gamestate`. Field
//! names therefore follow the wire format the browser clients read.
//!
//! ```text
//! Draft
//! ├── preset     (fixed at creation)
//! ├── players[]  (one per slot: cosmetics, tree, drafted bonuses)
//! └── gamestate  (phase, turn counter, buckets, board, timer)
//! ```

use std::fmt;

use civdraft_protocol::{CardId, DraftId};
use serde::{Deserialize, Serialize};

use crate::{DraftError, ROUND_TYPES};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where a draft is in its lifecycle.
///
/// ```text
/// Lobby(0) → Setup(1) → Picking(2) → AwaitingTree(3) → Generating(5) → Complete(6)
/// ```
///
/// `4` is unused. Phases are serialized as raw integers, and persisted
/// records and clients already rely on these values, so the gap stays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Phase {
    Lobby = 0,
    Setup = 1,
    Picking = 2,
    AwaitingTree = 3,
    Generating = 5,
    Complete = 6,
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> u8 {
        phase as u8
    }
}

impl TryFrom<u8> for Phase {
    type Error = DraftError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Lobby),
            1 => Ok(Self::Setup),
            2 => Ok(Self::Picking),
            3 => Ok(Self::AwaitingTree),
            5 => Ok(Self::Generating),
            6 => Ok(Self::Complete),
            other => Err(DraftError::UnknownPhase(other)),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lobby => "lobby",
            Self::Setup => "setup",
            Self::Picking => "picking",
            Self::AwaitingTree => "awaiting tech tree",
            Self::Generating => "generating",
            Self::Complete => "complete",
        };
        write!(f, "{} ({name})", *self as u8)
    }
}

// ---------------------------------------------------------------------------
// BoardSlot
// ---------------------------------------------------------------------------

/// One position on the displayed board.
///
/// Picked cards leave an `Empty` slot instead of shrinking the list, so
/// positions stay stable for clients. On the wire an empty slot is `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum BoardSlot {
    Empty,
    Occupied(CardId),
}

impl BoardSlot {
    pub fn card(self) -> Option<CardId> {
        match self {
            Self::Empty => None,
            Self::Occupied(id) => Some(id),
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<BoardSlot> for i64 {
    fn from(slot: BoardSlot) -> i64 {
        match slot {
            BoardSlot::Empty => -1,
            BoardSlot::Occupied(id) => i64::from(id.0),
        }
    }
}

impl TryFrom<i64> for BoardSlot {
    type Error = DraftError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value == -1 {
            return Ok(Self::Empty);
        }
        u32::try_from(value)
            .map(|id| Self::Occupied(CardId(id)))
            .map_err(|_| DraftError::InvalidBoardSlot(value))
    }
}

// ---------------------------------------------------------------------------
// TurnOrder
// ---------------------------------------------------------------------------

/// How the acting slot is chosen within each group of `slots` turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOrder {
    /// Always walk `order` front to back.
    Sequential,
    /// Snake draft: reverse on every odd draft round.
    AlternatingEveryRound,
    /// Reverse only during the castle tech and team bonus rounds. This is
    /// what drafts created without the snake flag have always done.
    LegacyReverseOnTypes,
}

// ---------------------------------------------------------------------------
// Preset
// ---------------------------------------------------------------------------

/// Configuration fixed at draft creation.
///
/// `#[serde(default)]` fills absent fields from [`Preset::default`], so
/// create requests can send only what they change and older records
/// without newer fields still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preset {
    /// Number of player seats.
    pub slots: usize,
    /// Tech tree currency each player gets.
    pub points: u32,
    /// Number of civilization bonus rounds.
    pub rounds: usize,
    /// Allowed flag per rarity index.
    pub rarities: Vec<bool>,
    pub allow_base_edition_uu: bool,
    pub allow_first_edition_uu: bool,
    pub timer_enabled: bool,
    /// Seconds per pick.
    pub timer_duration: u32,
    /// Hide other players' picks in the display layer.
    pub blind_picks: bool,
    pub snake_draft: bool,
    /// How many board slots `clear` redraws.
    pub cards_per_roll: usize,
    /// Cards per page in the client; sizes each round's board.
    pub bonuses_per_page: usize,
    /// Civilization bonus ids forced into the first board.
    pub required_first_roll: Vec<CardId>,
    /// Overrides the order derived from `snake_draft`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_order: Option<TurnOrder>,
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            slots: 2,
            points: 200,
            rounds: 4,
            rarities: vec![true; 5],
            allow_base_edition_uu: true,
            allow_first_edition_uu: false,
            timer_enabled: false,
            timer_duration: 60,
            blind_picks: false,
            snake_draft: false,
            cards_per_roll: 3,
            bonuses_per_page: 30,
            required_first_roll: Vec::new(),
            turn_order: None,
        }
    }
}

impl Preset {
    pub const MAX_SLOTS: usize = 8;
    pub const MAX_ROUNDS: usize = 32;
    pub const MAX_BONUSES_PER_PAGE: usize = 240;
    pub const TIMER_RANGE: std::ops::RangeInclusive<u32> = 5..=300;

    /// Rejects presets that can't produce a playable draft.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.slots == 0 || self.slots > Self::MAX_SLOTS {
            return Err(DraftError::InvalidPreset(format!(
                "slots must be 1..={}, got {}",
                Self::MAX_SLOTS,
                self.slots
            )));
        }
        if self.rounds == 0 || self.rounds > Self::MAX_ROUNDS {
            return Err(DraftError::InvalidPreset(format!(
                "rounds must be 1..={}, got {}",
                Self::MAX_ROUNDS,
                self.rounds
            )));
        }
        if self.bonuses_per_page > Self::MAX_BONUSES_PER_PAGE {
            return Err(DraftError::InvalidPreset(format!(
                "bonuses_per_page must be at most {}, got {}",
                Self::MAX_BONUSES_PER_PAGE,
                self.bonuses_per_page
            )));
        }
        if self.rarities.len() != 5 {
            return Err(DraftError::InvalidPreset(format!(
                "expected 5 rarity flags, got {}",
                self.rarities.len()
            )));
        }
        if self.timer_enabled && !Self::TIMER_RANGE.contains(&self.timer_duration) {
            return Err(DraftError::InvalidPreset(format!(
                "timer duration must be 5..=300 seconds, got {}",
                self.timer_duration
            )));
        }
        if self.cards_per_roll == 0 {
            return Err(DraftError::InvalidPreset(
                "cards_per_roll must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The turn order policy this draft runs with.
    pub fn turn_order(&self) -> TurnOrder {
        match self.turn_order {
            Some(order) => order,
            None if self.snake_draft => TurnOrder::AlternatingEveryRound,
            None => TurnOrder::LegacyReverseOnTypes,
        }
    }

    pub fn rarity_allowed(&self, rarity: u8) -> bool {
        self.rarities.get(rarity as usize).copied().unwrap_or(false)
    }

    pub fn edition_allowed(&self, edition: i8) -> bool {
        if edition < 0 {
            self.allow_first_edition_uu
        } else {
            self.allow_base_edition_uu
        }
    }

    /// Board size dealt at the start of every round type after the first.
    pub fn round_batch_size(&self) -> usize {
        // Saturating: stored records predate the preset bounds.
        self.slots
            .saturating_mul(2)
            .saturating_add(self.bonuses_per_page.saturating_mul(2) / 3)
    }

    /// Board size of the first roll. The civilization bonus board is
    /// shared by all civ bonus rounds, so it carries one extra card per
    /// slot for every round but the last.
    pub fn first_roll_size(&self) -> usize {
        self.rounds
            .saturating_sub(1)
            .saturating_mul(self.slots)
            .saturating_add(self.round_batch_size())
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Readiness travels as `0`/`1`.
mod ready_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ready: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*ready))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(u8::deserialize(deserializer)? != 0)
    }
}

/// One seat in the draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Player {
    /// Display name given when the seat was claimed. Empty means free.
    pub name: String,
    /// Name of the civilization being built.
    pub alias: String,
    pub description: String,
    #[serde(with = "ready_flag")]
    pub ready: bool,
    pub wonder: u32,
    pub castle: u32,
    /// Palette (five colours), division, overlay, symbol.
    pub flag_palette: Vec<u8>,
    pub custom_flag: bool,
    pub custom_flag_data: String,
    /// Units, buildings, techs.
    pub tree: Vec<Vec<u32>>,
    pub architecture: u32,
    pub language: u32,
    /// Drafted cards, indexed by round type.
    pub bonuses: [Vec<CardId>; ROUND_TYPES],
}

impl Default for Player {
    fn default() -> Self {
        Self {
            name: String::new(),
            alias: String::new(),
            description: String::new(),
            ready: false,
            wonder: 0,
            castle: 0,
            flag_palette: vec![3, 4, 5, 6, 7, 3, 3, 3],
            custom_flag: false,
            custom_flag_data: String::new(),
            tree: vec![
                vec![13, 17, 21, 74, 545, 539, 331, 125, 83, 128, 440],
                vec![
                    12, 45, 49, 50, 68, 70, 72, 79, 82, 84, 87, 101, 103, 104, 109, 199, 209,
                    276, 562, 584, 598, 621, 792,
                ],
                vec![22, 101, 102, 103, 408],
            ],
            architecture: 1,
            language: 0,
            bonuses: Default::default(),
        }
    }
}

impl Player {
    pub fn is_claimed(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn holds(&self, round: usize, card: CardId) -> bool {
        self.bonuses.get(round).is_some_and(|held| held.contains(&card))
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// The mutable part of a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub phase: Phase,
    /// Only ever increases. The sole source of truth for whose slot acts
    /// and which round type is active.
    pub turn: u64,
    /// Undealt cards per round type.
    pub available_cards: [Vec<CardId>; ROUND_TYPES],
    /// The displayed board.
    pub cards: Vec<BoardSlot>,
    /// Slot indices in turn-priority order.
    pub order: Vec<usize>,
    /// Board positions that were just dealt.
    pub highlighted: Vec<usize>,
    pub timer_paused: bool,
    /// Whole seconds left for the current pick.
    pub timer_remaining: u32,
    /// Epoch millis up to which `timer_remaining` is accurate.
    pub timer_last_update: Option<u64>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            phase: Phase::Lobby,
            turn: 0,
            available_cards: Default::default(),
            cards: Vec::new(),
            order: Vec::new(),
            highlighted: Vec::new(),
            timer_paused: false,
            timer_remaining: 0,
            timer_last_update: None,
        }
    }
}

impl GameState {
    pub fn displays(&self, card: CardId) -> bool {
        self.cards.contains(&BoardSlot::Occupied(card))
    }
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// The session record for one draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    /// Creation time, epoch millis.
    pub timestamp: u64,
    pub preset: Preset,
    pub players: Vec<Player>,
    pub gamestate: GameState,
    /// File name reported by the build pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    /// Reason the last build failed, cleared on retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_error: Option<String>,
}

impl Draft {
    pub fn phase(&self) -> Phase {
        self.gamestate.phase
    }

    pub fn slots(&self) -> usize {
        self.preset.slots
    }

    /// Fails with [`DraftError::WrongPhase`] unless the draft is in `expected`.
    pub fn expect_phase(&self, expected: Phase) -> Result<(), DraftError> {
        let actual = self.phase();
        if actual == expected {
            Ok(())
        } else {
            Err(DraftError::WrongPhase { expected, actual })
        }
    }

    /// Fails with [`DraftError::StaleTurn`] unless `client_turn` is the
    /// current turn.
    pub fn check_turn(&self, client_turn: u64) -> Result<(), DraftError> {
        let current = self.gamestate.turn;
        if client_turn == current {
            Ok(())
        } else {
            Err(DraftError::StaleTurn {
                client: client_turn,
                current,
            })
        }
    }

    /// Maps a client player number onto a seat index.
    pub fn seat(&self, player_number: i32) -> Result<usize, DraftError> {
        usize::try_from(player_number)
            .ok()
            .filter(|&seat| seat < self.players.len())
            .ok_or(DraftError::NotASeat(player_number))
    }

    pub fn all_ready(&self) -> bool {
        self.players.iter().all(|player| player.ready)
    }

    pub fn reset_ready(&mut self) {
        for player in &mut self.players {
            player.ready = false;
        }
    }

    /// Whether any player holds `card` for the given round type.
    pub fn is_held(&self, round: usize, card: CardId) -> bool {
        self.players.iter().any(|player| player.holds(round, card))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_phase_serializes_as_integer_with_gap() {
        assert_eq!(serde_json::to_value(Phase::Generating).unwrap(), json!(5));
        assert_eq!(serde_json::to_value(Phase::Complete).unwrap(), json!(6));
        assert!(serde_json::from_value::<Phase>(json!(4)).is_err());
        assert_eq!(
            serde_json::from_value::<Phase>(json!(3)).unwrap(),
            Phase::AwaitingTree
        );
    }

    #[test]
    fn test_board_slot_empty_is_minus_one() {
        let board = vec![BoardSlot::Occupied(CardId(4)), BoardSlot::Empty];
        assert_eq!(serde_json::to_value(&board).unwrap(), json!([4, -1]));
        let parsed: Vec<BoardSlot> = serde_json::from_value(json!([-1, 9])).unwrap();
        assert_eq!(parsed, vec![BoardSlot::Empty, BoardSlot::Occupied(CardId(9))]);
        assert!(serde_json::from_value::<BoardSlot>(json!(-7)).is_err());
    }

    #[test]
    fn test_ready_flag_is_zero_or_one() {
        let player = Player {
            ready: true,
            ..Player::default()
        };
        let value = serde_json::to_value(&player).unwrap();
        assert_eq!(value["ready"], json!(1));
        let parsed: Player = serde_json::from_value(json!({ "ready": 0 })).unwrap();
        assert!(!parsed.ready);
    }

    #[test]
    fn test_preset_partial_json_uses_defaults() {
        let preset: Preset =
            serde_json::from_value(json!({ "slots": 3, "snake_draft": true })).unwrap();
        assert_eq!(preset.slots, 3);
        assert_eq!(preset.rounds, 4);
        assert_eq!(preset.cards_per_roll, 3);
        assert_eq!(preset.turn_order(), TurnOrder::AlternatingEveryRound);
    }

    #[test]
    fn test_preset_turn_order_override_wins() {
        let preset = Preset {
            snake_draft: true,
            turn_order: Some(TurnOrder::Sequential),
            ..Preset::default()
        };
        assert_eq!(preset.turn_order(), TurnOrder::Sequential);
        assert_eq!(
            Preset::default().turn_order(),
            TurnOrder::LegacyReverseOnTypes
        );
    }

    #[test]
    fn test_preset_validate_rejects_bad_values() {
        let zero_slots = Preset {
            slots: 0,
            ..Preset::default()
        };
        let no_rounds = Preset {
            rounds: 0,
            ..Preset::default()
        };
        let short_timer = Preset {
            timer_enabled: true,
            timer_duration: 2,
            ..Preset::default()
        };
        let few_rarities = Preset {
            rarities: vec![true; 3],
            ..Preset::default()
        };
        for preset in [zero_slots, no_rounds, short_timer, few_rarities] {
            assert!(matches!(
                preset.validate(),
                Err(DraftError::InvalidPreset(_))
            ));
        }
        assert!(Preset::default().validate().is_ok());
    }

    #[test]
    fn test_preset_validate_rejects_oversized_board_settings() {
        let huge_page: Preset =
            serde_json::from_value(json!({ "bonuses_per_page": 9_223_372_036_854_775_808u64 }))
                .unwrap();
        let many_rounds = Preset {
            rounds: usize::MAX,
            ..Preset::default()
        };
        for preset in [huge_page, many_rounds] {
            assert!(matches!(
                preset.validate(),
                Err(DraftError::InvalidPreset(_))
            ));
        }
        let largest = Preset {
            slots: Preset::MAX_SLOTS,
            rounds: Preset::MAX_ROUNDS,
            bonuses_per_page: Preset::MAX_BONUSES_PER_PAGE,
            ..Preset::default()
        };
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn test_preset_board_sizes_saturate_for_unchecked_records() {
        let preset = Preset {
            rounds: usize::MAX,
            bonuses_per_page: usize::MAX,
            ..Preset::default()
        };
        assert_eq!(preset.round_batch_size(), usize::MAX / 3 + 4);
        assert_eq!(preset.first_roll_size(), usize::MAX);
    }

    #[test]
    fn test_preset_board_sizes() {
        let preset = Preset {
            slots: 2,
            rounds: 4,
            bonuses_per_page: 30,
            ..Preset::default()
        };
        assert_eq!(preset.round_batch_size(), 24);
        assert_eq!(preset.first_roll_size(), 30);
    }

    #[test]
    fn test_draft_seat_rejects_spectators_and_out_of_range() {
        let draft = Draft {
            id: DraftId::new("1"),
            timestamp: 0,
            preset: Preset::default(),
            players: vec![Player::default(), Player::default()],
            gamestate: GameState::default(),
            artifact: None,
            build_error: None,
        };
        assert_eq!(draft.seat(1).unwrap(), 1);
        assert!(matches!(draft.seat(-1), Err(DraftError::NotASeat(-1))));
        assert!(matches!(draft.seat(2), Err(DraftError::NotASeat(2))));
    }
}
