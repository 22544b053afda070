//! Turn resolution: whose slot acts on a turn, and in which round type.
//!
//! Everything here is a pure function of `(turn, slots, rounds, policy,
//! order)`. Callers resolve afresh after every mutation instead of
//! caching a position, since the turn counter is the only source of truth.
//!
//! Turns are grouped into draft rounds of `slots` turns each. The first
//! `rounds` draft rounds all draft civilization bonuses (round type 0);
//! every later draft round advances to the next round type:
//!
//! ```text
//! rounds = 3, slots = 2
//! turn:        0 1 | 2 3 | 4 5 | 6 7 | 8 9 | 10 11 | 12 13
//! draft round: 0   | 1   | 2   | 3   | 4   | 5     | 6
//! round type:  0   | 0   | 0   | 1   | 2   | 3     | 4
//! ```

use crate::{Draft, DraftError, RoundType, TurnOrder};

/// Round types reversed by [`TurnOrder::LegacyReverseOnTypes`].
const LEGACY_REVERSED: [usize; 2] = [RoundType::CastleTech as usize, RoundType::TeamBonus as usize];

/// The resolved position of one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnPosition {
    /// Seat index of the acting player.
    pub slot: usize,
    /// Round type index. May exceed the last round type once the final
    /// round is over.
    pub round_type: usize,
    /// `turn / slots`.
    pub draft_round: u64,
    /// `turn % slots`.
    pub turn_in_round: usize,
}

impl TurnPosition {
    pub fn round(&self) -> Option<RoundType> {
        RoundType::from_index(self.round_type)
    }

    /// Whether this turn is the last of its draft round.
    pub fn is_last_in_round(&self, slots: usize) -> bool {
        self.turn_in_round + 1 == slots
    }
}

/// `max(0, turn / slots - (rounds - 1))`.
pub fn round_type_index(turn: u64, slots: usize, rounds: usize) -> usize {
    let draft_round = turn / slots as u64;
    draft_round.saturating_sub(rounds.saturating_sub(1) as u64) as usize
}

/// Resolves `turn` to the acting slot.
///
/// Returns `None` when `slots` is zero or `order` has fewer than `slots`
/// entries (the turn order isn't assigned until picking starts).
pub fn resolve(
    turn: u64,
    slots: usize,
    rounds: usize,
    policy: TurnOrder,
    order: &[usize],
) -> Option<TurnPosition> {
    if slots == 0 || order.len() < slots {
        return None;
    }
    let draft_round = turn / slots as u64;
    let turn_in_round = (turn % slots as u64) as usize;
    let round_type = round_type_index(turn, slots, rounds);

    let reversed = match policy {
        TurnOrder::Sequential => false,
        TurnOrder::AlternatingEveryRound => draft_round % 2 == 1,
        TurnOrder::LegacyReverseOnTypes => LEGACY_REVERSED.contains(&round_type),
    };
    let index = if reversed {
        slots - 1 - turn_in_round
    } else {
        turn_in_round
    };

    Some(TurnPosition {
        slot: order[index],
        round_type,
        draft_round,
        turn_in_round,
    })
}

impl Draft {
    /// Resolves the draft's current turn.
    pub fn current_turn(&self) -> Result<TurnPosition, DraftError> {
        let position = resolve(
            self.gamestate.turn,
            self.preset.slots,
            self.preset.rounds,
            self.preset.turn_order(),
            &self.gamestate.order,
        )
        .ok_or_else(|| {
            DraftError::CorruptState(format!(
                "turn order has {} entries for {} slots",
                self.gamestate.order.len(),
                self.preset.slots
            ))
        })?;
        if position.slot >= self.players.len() {
            return Err(DraftError::CorruptState(format!(
                "turn order names slot {} of {}",
                position.slot,
                self.players.len()
            )));
        }
        Ok(position)
    }

    /// The active round type, or [`DraftError::DraftOver`] past the end.
    pub fn current_round(&self) -> Result<RoundType, DraftError> {
        self.current_turn()?
            .round()
            .ok_or(DraftError::DraftOver(self.gamestate.turn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots_for(policy: TurnOrder, slots: usize, rounds: usize, turns: u64) -> Vec<usize> {
        let order: Vec<usize> = (0..slots).collect();
        (0..turns)
            .map(|turn| resolve(turn, slots, rounds, policy, &order).unwrap().slot)
            .collect()
    }

    #[test]
    fn test_round_type_index_is_zero_for_civ_bonus_rounds() {
        for slots in 1..=8 {
            for rounds in 1..=6 {
                for turn in 0..(slots * rounds) as u64 {
                    assert_eq!(round_type_index(turn, slots, rounds), 0);
                }
            }
        }
    }

    #[test]
    fn test_round_type_index_is_monotonic() {
        for slots in 1..=8 {
            for rounds in 1..=6 {
                let mut previous = 0;
                for turn in 0..200u64 {
                    let current = round_type_index(turn, slots, rounds);
                    assert!(current >= previous, "turn {turn} slots {slots} rounds {rounds}");
                    previous = current;
                }
            }
        }
    }

    #[test]
    fn test_round_type_index_advances_after_civ_rounds() {
        // rounds = 3, slots = 2 (see module docs)
        let types: Vec<usize> = (0..14).map(|t| round_type_index(t, 2, 3)).collect();
        assert_eq!(types, vec![0, 0, 0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4]);
    }

    #[test]
    fn test_resolve_snake_four_players_alternates_each_round() {
        let slots = slots_for(TurnOrder::AlternatingEveryRound, 4, 4, 14);
        assert_eq!(slots, vec![0, 1, 2, 3, 3, 2, 1, 0, 0, 1, 2, 3, 3, 2]);
    }

    #[test]
    fn test_resolve_snake_two_players_pattern() {
        let slots = slots_for(TurnOrder::AlternatingEveryRound, 2, 4, 8);
        assert_eq!(slots, vec![0, 1, 1, 0, 0, 1, 1, 0]);
    }

    #[test]
    fn test_resolve_legacy_forward_until_castle_round() {
        // rounds = 4, slots = 4: round type 1 is turns 16..20,
        // castle techs 20..24, imperial 24..28, team 28..32.
        let slots = slots_for(TurnOrder::LegacyReverseOnTypes, 4, 4, 32);
        assert_eq!(&slots[0..8], &[0, 1, 2, 3, 0, 1, 2, 3]);
        assert_eq!(&slots[16..20], &[0, 1, 2, 3]);
        assert_eq!(&slots[20..24], &[3, 2, 1, 0]);
        assert_eq!(&slots[24..28], &[0, 1, 2, 3]);
        assert_eq!(&slots[28..32], &[3, 2, 1, 0]);
    }

    #[test]
    fn test_resolve_sequential_never_reverses() {
        let slots = slots_for(TurnOrder::Sequential, 3, 2, 21);
        for (turn, slot) in slots.into_iter().enumerate() {
            assert_eq!(slot, turn % 3);
        }
    }

    #[test]
    fn test_resolve_maps_through_order() {
        let order = [2, 0, 1];
        let position = resolve(1, 3, 1, TurnOrder::Sequential, &order).unwrap();
        assert_eq!(position.slot, 0);
        let position = resolve(5, 3, 1, TurnOrder::AlternatingEveryRound, &order).unwrap();
        // draft round 1 is reversed: index 3 - 1 - 2 = 0
        assert_eq!(position.slot, 2);
    }

    #[test]
    fn test_resolve_without_order_is_none() {
        assert!(resolve(0, 2, 4, TurnOrder::Sequential, &[]).is_none());
        assert!(resolve(0, 0, 4, TurnOrder::Sequential, &[0]).is_none());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let order = [1, 0];
        let a = resolve(9, 2, 4, TurnOrder::LegacyReverseOnTypes, &order);
        let b = resolve(9, 2, 4, TurnOrder::LegacyReverseOnTypes, &order);
        assert_eq!(a, b);
    }
}
