//! Applying a pick to the draft record.
//!
//! [`apply_pick`] validates everything up front and only then mutates, so
//! a rejected pick leaves the record exactly as it was. The caller is
//! expected to have already checked the client's turn number with
//! [`Draft::check_turn`].

use civdraft_protocol::CardId;
use rand::Rng;

use crate::{pool, BoardSlot, CardCatalog, Draft, DraftError, Phase, RoundType};

/// What a successful pick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickOutcome {
    /// Seat that received the card.
    pub slot: usize,
    /// Round type the card was drafted for.
    pub round: RoundType,
    /// Whether the pick closed its round and replaced the board.
    pub boundary: bool,
    /// Whether the pick ended the drafting phase.
    pub finished: bool,
}

/// Gives `pick` to the acting slot and advances the turn.
///
/// On the last turn of a round group (every group once the civilization
/// bonus rounds are down to their last one) the board is replaced with
/// the next round type's batch, or, after the final round type, the draft
/// moves on to tech tree submission. Otherwise the picked card's board
/// slot is emptied.
///
/// # Errors
///
/// - [`DraftError::WrongPhase`] outside the picking phase.
/// - [`DraftError::CardNotFound`] if `pick` isn't on the board. Nothing
///   is mutated in that case.
/// - [`DraftError::DraftOver`] / [`DraftError::CorruptState`] if the turn
///   can't be resolved.
pub fn apply_pick<R: Rng + ?Sized>(
    draft: &mut Draft,
    catalog: &CardCatalog,
    pick: CardId,
    now_millis: u64,
    rng: &mut R,
) -> Result<PickOutcome, DraftError> {
    draft.expect_phase(Phase::Picking)?;
    let position = draft.current_turn()?;
    let round = position
        .round()
        .ok_or(DraftError::DraftOver(draft.gamestate.turn))?;
    let board_index = draft
        .gamestate
        .cards
        .iter()
        .position(|slot| *slot == BoardSlot::Occupied(pick))
        .ok_or(DraftError::CardNotFound {
            pick,
            turn: draft.gamestate.turn,
        })?;

    let slots = draft.slots();
    let last_civ_round = position.draft_round + 1 == draft.preset.rounds as u64;
    let boundary = (position.round_type > 0 || last_civ_round) && position.is_last_in_round(slots);

    draft.gamestate.highlighted.clear();
    draft.players[position.slot].bonuses[round.index()].push(pick);

    let mut finished = false;
    if boundary {
        match round.next() {
            None => {
                draft.gamestate.phase = Phase::AwaitingTree;
                finished = true;
            }
            Some(next) => pool::deal_round(draft, catalog, next, rng),
        }
    } else {
        draft.gamestate.cards[board_index] = BoardSlot::Empty;
    }

    draft.gamestate.turn += 1;
    if finished {
        draft.reset_ready();
        tracing::info!(draft_id = %draft.id, "drafting finished, awaiting tech trees");
    }

    if draft.preset.timer_enabled {
        draft.gamestate.timer_remaining = draft.preset.timer_duration;
        draft.gamestate.timer_paused = false;
        draft.gamestate.timer_last_update = Some(now_millis);
    }

    Ok(PickOutcome {
        slot: position.slot,
        round,
        boundary,
        finished,
    })
}
