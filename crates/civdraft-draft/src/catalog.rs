//! The card catalog: read-only metadata for every draftable card.
//!
//! One catalog is loaded at startup and shared (behind an `Arc`) by every
//! draft. It is never mutated, so no locking is needed.

use std::fmt;
use std::path::Path;

use civdraft_protocol::CardId;
use serde::{Deserialize, Serialize};

use crate::{DraftError, Preset};

/// Number of round types.
pub const ROUND_TYPES: usize = 5;

// ---------------------------------------------------------------------------
// RoundType
// ---------------------------------------------------------------------------

/// The kind of card drafted in a round, in draft order.
///
/// The discriminant doubles as the index into a player's `bonuses` and
/// the game state's `available_cards`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoundType {
    CivBonus = 0,
    UniqueUnit = 1,
    CastleTech = 2,
    ImperialTech = 3,
    TeamBonus = 4,
}

impl RoundType {
    /// All round types in draft order.
    pub const ALL: [RoundType; ROUND_TYPES] = [
        Self::CivBonus,
        Self::UniqueUnit,
        Self::CastleTech,
        Self::ImperialTech,
        Self::TeamBonus,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// The round type drafted after this one, or `None` for the last.
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn is_final(self) -> bool {
        self == Self::TeamBonus
    }
}

impl fmt::Display for RoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CivBonus => "civilization bonuses",
            Self::UniqueUnit => "unique units",
            Self::CastleTech => "castle techs",
            Self::ImperialTech => "imperial techs",
            Self::TeamBonus => "team bonuses",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Metadata of one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardEntry {
    pub id: CardId,
    /// Index into the preset's rarity flags.
    pub rarity: u8,
    /// Only meaningful for unique units: negative means first edition,
    /// zero or positive means base edition.
    #[serde(default)]
    pub edition: i8,
    /// Effect description consumed by the display and build layers.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Every card, grouped by round type.
///
/// On disk this is `{ "round_types": [[entry, ...], x5] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardCatalog {
    round_types: [Vec<CardEntry>; ROUND_TYPES],
}

impl CardCatalog {
    pub fn new(round_types: [Vec<CardEntry>; ROUND_TYPES]) -> Self {
        Self { round_types }
    }

    /// A catalog with `counts[r]` plain cards per round type, ids
    /// `0..counts[r]`, rarity 0 and base edition.
    pub fn uniform(counts: [usize; ROUND_TYPES]) -> Self {
        let round_types = counts.map(|count| {
            (0..count as u32)
                .map(|id| CardEntry {
                    id: CardId(id),
                    rarity: 0,
                    edition: 0,
                    payload: serde_json::Value::Null,
                })
                .collect()
        });
        Self { round_types }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, DraftError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Reads and parses a catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DraftError> {
        let bytes = std::fs::read(path)?;
        Self::from_json(&bytes)
    }

    pub fn entries(&self, round: RoundType) -> &[CardEntry] {
        &self.round_types[round.index()]
    }

    pub fn get(&self, round: RoundType, id: CardId) -> Option<&CardEntry> {
        self.entries(round).iter().find(|entry| entry.id == id)
    }

    /// Whether a card passes the preset's rarity filter and, for unique
    /// units, its edition filter.
    pub fn is_draftable(&self, preset: &Preset, round: RoundType, entry: &CardEntry) -> bool {
        if !preset.rarity_allowed(entry.rarity) {
            return false;
        }
        round != RoundType::UniqueUnit || preset.edition_allowed(entry.edition)
    }

    /// Ids of every card of `round` the preset allows.
    pub fn draftable(&self, preset: &Preset, round: RoundType) -> Vec<CardId> {
        self.entries(round)
            .iter()
            .filter(|entry| self.is_draftable(preset, round, entry))
            .map(|entry| entry.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, rarity: u8, edition: i8) -> CardEntry {
        CardEntry {
            id: CardId(id),
            rarity,
            edition,
            payload: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_round_type_next_stops_after_team_bonus() {
        assert_eq!(RoundType::CivBonus.next(), Some(RoundType::UniqueUnit));
        assert_eq!(RoundType::TeamBonus.next(), None);
        assert!(RoundType::TeamBonus.is_final());
    }

    #[test]
    fn test_from_json_reads_round_types() {
        let raw = br#"{"round_types": [
            [{"id": 0, "rarity": 1}, {"id": 1, "rarity": 2, "payload": "Cavalry +1 armor"}],
            [{"id": 0, "rarity": 0, "edition": -1}],
            [], [], []
        ]}"#;
        let catalog = CardCatalog::from_json(raw).unwrap();
        assert_eq!(catalog.entries(RoundType::CivBonus).len(), 2);
        assert_eq!(
            catalog.get(RoundType::UniqueUnit, CardId(0)).unwrap().edition,
            -1
        );
        assert!(catalog.get(RoundType::CastleTech, CardId(0)).is_none());
    }

    #[test]
    fn test_from_json_wrong_round_count_is_error() {
        let raw = br#"{"round_types": [[], []]}"#;
        assert!(matches!(
            CardCatalog::from_json(raw),
            Err(DraftError::Catalog(_))
        ));
    }

    #[test]
    fn test_draftable_skips_disabled_rarity() {
        let catalog = CardCatalog::new([
            vec![entry(0, 0, 0), entry(1, 2, 0), entry(2, 1, 0)],
            vec![],
            vec![],
            vec![],
            vec![],
        ]);
        let preset = Preset {
            rarities: vec![true, true, false, true, true],
            ..Preset::default()
        };
        assert_eq!(
            catalog.draftable(&preset, RoundType::CivBonus),
            vec![CardId(0), CardId(2)]
        );
    }

    #[test]
    fn test_draftable_unique_units_follow_edition_flags() {
        let catalog = CardCatalog::new([
            vec![entry(0, 0, -1)],
            vec![entry(0, 0, 0), entry(1, 0, -1), entry(2, 0, 3)],
            vec![],
            vec![],
            vec![],
        ]);
        let base_only = Preset {
            allow_base_edition_uu: true,
            allow_first_edition_uu: false,
            ..Preset::default()
        };
        let first_only = Preset {
            allow_base_edition_uu: false,
            allow_first_edition_uu: true,
            ..Preset::default()
        };
        assert_eq!(
            catalog.draftable(&base_only, RoundType::UniqueUnit),
            vec![CardId(0), CardId(2)]
        );
        assert_eq!(
            catalog.draftable(&first_only, RoundType::UniqueUnit),
            vec![CardId(1)]
        );
        // Edition is ignored outside the unique unit round.
        assert_eq!(
            catalog.draftable(&base_only, RoundType::CivBonus),
            vec![CardId(0)]
        );
    }
}
