//! The pick countdown.
//!
//! Nothing ticks in the background. The remaining time is brought up to
//! date whenever someone looks at it ([`refresh_remaining`]), and an
//! expired countdown is resolved by [`auto_pick`] on the next access, on
//! a client's `timer expired` report, or on the room's periodic sweep.
//!
//! Time is consumed in whole seconds. The stamp only advances by the
//! seconds actually subtracted, so frequent refreshes never lose the
//! fractional remainder.

use civdraft_protocol::{CardId, TimerStatus};
use rand::Rng;

use crate::{apply_pick, CardCatalog, Draft, DraftError, Phase, PickOutcome};

/// Whether the countdown is currently running.
fn is_running(draft: &Draft) -> bool {
    draft.preset.timer_enabled
        && draft.phase() == Phase::Picking
        && !draft.gamestate.timer_paused
}

/// Brings `timer_remaining` up to date with `now_millis`.
///
/// No-op unless the timer is enabled, the draft is picking, and the timer
/// isn't paused. A missing stamp is set without subtracting anything.
/// Returns whether the record changed.
pub fn refresh_remaining(draft: &mut Draft, now_millis: u64) -> bool {
    if !is_running(draft) {
        return false;
    }
    let gamestate = &mut draft.gamestate;
    let Some(stamp) = gamestate.timer_last_update else {
        gamestate.timer_last_update = Some(now_millis);
        return true;
    };

    let elapsed_secs = now_millis.saturating_sub(stamp) / 1000;
    if elapsed_secs == 0 {
        return false;
    }
    let consumed = elapsed_secs.min(u64::from(gamestate.timer_remaining));
    gamestate.timer_remaining -= consumed as u32;
    // Once the countdown bottoms out the leftover time is meaningless.
    gamestate.timer_last_update = if gamestate.timer_remaining == 0 {
        Some(now_millis)
    } else {
        Some(stamp + elapsed_secs * 1000)
    };
    true
}

/// Freezes the countdown, first accounting for the time already spent.
pub fn pause(draft: &mut Draft, now_millis: u64) {
    refresh_remaining(draft, now_millis);
    draft.gamestate.timer_paused = true;
}

/// Restarts a paused countdown from `now_millis`.
pub fn resume(draft: &mut Draft, now_millis: u64) {
    if !draft.gamestate.timer_paused {
        return;
    }
    draft.gamestate.timer_paused = false;
    draft.gamestate.timer_last_update = Some(now_millis);
}

pub fn status(draft: &Draft) -> TimerStatus {
    TimerStatus {
        timer_remaining: draft.gamestate.timer_remaining,
        timer_paused: draft.gamestate.timer_paused,
    }
}

/// Whether a running countdown has reached zero. Call after
/// [`refresh_remaining`].
pub fn is_expired(draft: &Draft) -> bool {
    is_running(draft) && draft.gamestate.timer_remaining == 0
}

/// Cards the auto-pick may choose from: the highlighted slots if any,
/// otherwise the whole board. Emptied slots never qualify.
pub fn candidate_picks(draft: &Draft) -> Vec<CardId> {
    let cards = &draft.gamestate.cards;
    if draft.gamestate.highlighted.is_empty() {
        cards.iter().filter_map(|slot| slot.card()).collect()
    } else {
        draft
            .gamestate
            .highlighted
            .iter()
            .filter_map(|&index| cards.get(index).and_then(|slot| slot.card()))
            .collect()
    }
}

/// Picks a random candidate for the acting slot if the countdown expired.
///
/// Returns `Ok(None)` when the countdown is still running or there is
/// nothing on the board to pick.
pub fn auto_pick<R: Rng + ?Sized>(
    draft: &mut Draft,
    catalog: &CardCatalog,
    now_millis: u64,
    rng: &mut R,
) -> Result<Option<PickOutcome>, DraftError> {
    if !is_expired(draft) {
        return Ok(None);
    }
    let candidates = candidate_picks(draft);
    if candidates.is_empty() {
        tracing::debug!(draft_id = %draft.id, turn = draft.gamestate.turn, "timer expired with an empty board");
        return Ok(None);
    }
    let pick = candidates[rng.random_range(0..candidates.len())];
    let outcome = apply_pick(draft, catalog, pick, now_millis, rng)?;
    tracing::info!(
        draft_id = %draft.id,
        slot = outcome.slot,
        %pick,
        "timer expired, picked automatically"
    );
    Ok(Some(outcome))
}
