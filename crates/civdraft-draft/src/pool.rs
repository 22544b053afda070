//! Card buckets and the displayed board.
//!
//! Each round type owns a bucket in `gamestate.available_cards`: the
//! cards not dealt yet. Drawing removes a random card from the bucket.
//! When a bucket runs dry it is rebuilt by [`reshuffle`] from the catalog,
//! leaving out anything a player holds or the board shows. A pool that is
//! still empty after reshuffling simply yields no card.

use civdraft_protocol::CardId;
use rand::Rng;

use crate::{BoardSlot, CardCatalog, Draft, DraftError, Preset, RoundType, ROUND_TYPES};

/// The initial bucket for every round type.
pub fn initial_pools(catalog: &CardCatalog, preset: &Preset) -> [Vec<CardId>; ROUND_TYPES] {
    RoundType::ALL.map(|round| catalog.draftable(preset, round))
}

/// Rebuilds the bucket of `round` from the catalog.
///
/// Excluded: cards any player already holds for `round` and cards
/// currently on the board. Emptied board slots exclude nothing.
pub fn reshuffle(draft: &mut Draft, catalog: &CardCatalog, round: RoundType) {
    let bucket: Vec<CardId> = catalog
        .draftable(&draft.preset, round)
        .into_iter()
        .filter(|&card| !draft.is_held(round.index(), card))
        .filter(|&card| !draft.gamestate.displays(card))
        .collect();
    tracing::debug!(
        draft_id = %draft.id,
        %round,
        cards = bucket.len(),
        "reshuffled bucket"
    );
    draft.gamestate.available_cards[round.index()] = bucket;
}

/// Takes a random card out of the bucket of `round`, reshuffling first if
/// the bucket is empty.
fn draw<R: Rng + ?Sized>(
    draft: &mut Draft,
    catalog: &CardCatalog,
    round: RoundType,
    rng: &mut R,
) -> Option<CardId> {
    if draft.gamestate.available_cards[round.index()].is_empty() {
        reshuffle(draft, catalog, round);
    }
    let bucket = &mut draft.gamestate.available_cards[round.index()];
    if bucket.is_empty() {
        return None;
    }
    let index = rng.random_range(0..bucket.len());
    Some(bucket.swap_remove(index))
}

/// Deals up to `count` cards of `round` onto the end of the board.
fn deal<R: Rng + ?Sized>(
    draft: &mut Draft,
    catalog: &CardCatalog,
    round: RoundType,
    count: usize,
    rng: &mut R,
) {
    for _ in 0..count {
        match draw(draft, catalog, round, rng) {
            Some(card) => draft.gamestate.cards.push(BoardSlot::Occupied(card)),
            None => break,
        }
    }
}

/// Fills every emptied board slot with a fresh card of the current round
/// type and highlights exactly the slots it touched.
///
/// Slots stay empty once the pool is exhausted. Returns the touched
/// indices.
pub fn refill<R: Rng + ?Sized>(
    draft: &mut Draft,
    catalog: &CardCatalog,
    rng: &mut R,
) -> Result<Vec<usize>, DraftError> {
    let round = draft.current_round()?;
    let mut touched = Vec::new();
    for index in 0..draft.gamestate.cards.len() {
        if !draft.gamestate.cards[index].is_empty() {
            continue;
        }
        let Some(card) = draw(draft, catalog, round, rng) else {
            break;
        };
        draft.gamestate.cards[index] = BoardSlot::Occupied(card);
        touched.push(index);
    }
    draft.gamestate.highlighted = touched.clone();
    Ok(touched)
}

/// Redraws the first `cards_per_roll` board slots, whatever they held,
/// and highlights the slots that got a new card.
///
/// Replaced cards are not put back in the bucket; a later reshuffle picks
/// them up again. A slot keeps its old content if the pool is dry.
pub fn clear<R: Rng + ?Sized>(
    draft: &mut Draft,
    catalog: &CardCatalog,
    rng: &mut R,
) -> Result<Vec<usize>, DraftError> {
    let round = draft.current_round()?;
    let count = draft.preset.cards_per_roll.min(draft.gamestate.cards.len());

    let mut touched = Vec::with_capacity(count);
    for index in 0..count {
        let Some(card) = draw(draft, catalog, round, rng) else {
            break;
        };
        draft.gamestate.cards[index] = BoardSlot::Occupied(card);
        touched.push(index);
    }
    draft.gamestate.highlighted = touched.clone();
    Ok(touched)
}

/// Builds the shared civilization bonus board when picking starts.
///
/// Cards named in `required_first_roll` go first, in order, when the
/// catalog has them and they aren't already dealt. Random cards fill the
/// rest up to [`Preset::first_roll_size`].
pub fn deal_first_roll<R: Rng + ?Sized>(draft: &mut Draft, catalog: &CardCatalog, rng: &mut R) {
    let round = RoundType::CivBonus;
    draft.gamestate.cards.clear();
    draft.gamestate.highlighted.clear();

    let size = draft.preset.first_roll_size();
    let required = draft.preset.required_first_roll.clone();
    for card in required {
        if draft.gamestate.cards.len() >= size {
            break;
        }
        if catalog.get(round, card).is_none() || draft.gamestate.displays(card) {
            tracing::debug!(draft_id = %draft.id, %card, "skipping required first roll card");
            continue;
        }
        draft.gamestate.available_cards[round.index()].retain(|&other| other != card);
        draft.gamestate.cards.push(BoardSlot::Occupied(card));
    }

    let missing = size - draft.gamestate.cards.len();
    deal(draft, catalog, round, missing, rng);
}

/// Replaces the board with a fresh batch of `round` cards.
pub fn deal_round<R: Rng + ?Sized>(
    draft: &mut Draft,
    catalog: &CardCatalog,
    round: RoundType,
    rng: &mut R,
) {
    draft.gamestate.cards.clear();
    draft.gamestate.highlighted.clear();
    let size = draft.preset.round_batch_size();
    deal(draft, catalog, round, size, rng);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CardEntry, GameState, Phase, Player};
    use civdraft_protocol::DraftId;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn picking_draft(catalog: &CardCatalog, preset: Preset) -> Draft {
        let slots = preset.slots;
        let available_cards = initial_pools(catalog, &preset);
        Draft {
            id: DraftId::new("100"),
            timestamp: 0,
            preset,
            players: vec![Player::default(); slots],
            gamestate: GameState {
                phase: Phase::Picking,
                available_cards,
                order: (0..slots).collect(),
                ..GameState::default()
            },
            artifact: None,
            build_error: None,
        }
    }

    fn board_cards(draft: &Draft) -> Vec<CardId> {
        draft.gamestate.cards.iter().filter_map(|slot| slot.card()).collect()
    }

    #[test]
    fn test_initial_pools_excludes_disabled_rarity() {
        let entries = (0..20)
            .map(|id| CardEntry {
                id: CardId(id),
                rarity: (id % 5) as u8,
                edition: 0,
                payload: serde_json::Value::Null,
            })
            .collect();
        let catalog = CardCatalog::new([entries, vec![], vec![], vec![], vec![]]);
        let preset = Preset {
            rarities: vec![true, true, false, true, true],
            ..Preset::default()
        };
        let pools = initial_pools(&catalog, &preset);
        assert_eq!(pools[0].len(), 16);
        for card in &pools[0] {
            let entry = catalog.get(RoundType::CivBonus, *card).unwrap();
            assert_ne!(entry.rarity, 2);
        }
    }

    #[test]
    fn test_deal_first_roll_fills_to_first_roll_size() {
        let catalog = CardCatalog::uniform([100, 40, 40, 40, 40]);
        let mut draft = picking_draft(&catalog, Preset::default());
        let mut rng = StdRng::seed_from_u64(7);
        deal_first_roll(&mut draft, &catalog, &mut rng);

        let dealt = board_cards(&draft);
        assert_eq!(dealt.len(), draft.preset.first_roll_size());
        assert_eq!(draft.gamestate.available_cards[0].len(), 100 - dealt.len());
        for card in dealt {
            assert!(!draft.gamestate.available_cards[0].contains(&card));
        }
    }

    #[test]
    fn test_deal_first_roll_honors_required_cards() {
        let catalog = CardCatalog::uniform([100, 40, 40, 40, 40]);
        let preset = Preset {
            required_first_roll: vec![CardId(42), CardId(7), CardId(42), CardId(500)],
            ..Preset::default()
        };
        let mut draft = picking_draft(&catalog, preset);
        let mut rng = StdRng::seed_from_u64(7);
        deal_first_roll(&mut draft, &catalog, &mut rng);

        let dealt = board_cards(&draft);
        assert_eq!(&dealt[0..2], &[CardId(42), CardId(7)]);
        assert_eq!(dealt.iter().filter(|&&card| card == CardId(42)).count(), 1);
        assert!(!dealt.contains(&CardId(500)));
        assert!(!draft.gamestate.available_cards[0].contains(&CardId(42)));
    }

    #[test]
    fn test_deal_first_roll_small_catalog_deals_what_exists() {
        let catalog = CardCatalog::uniform([5, 0, 0, 0, 0]);
        let mut draft = picking_draft(&catalog, Preset::default());
        let mut rng = StdRng::seed_from_u64(1);
        deal_first_roll(&mut draft, &catalog, &mut rng);
        assert_eq!(board_cards(&draft).len(), 5);
    }

    #[test]
    fn test_reshuffle_skips_held_and_displayed_cards() {
        let catalog = CardCatalog::uniform([10, 0, 0, 0, 0]);
        let mut draft = picking_draft(&catalog, Preset::default());
        draft.gamestate.available_cards[0].clear();
        draft.players[1].bonuses[0].push(CardId(3));
        draft.gamestate.cards = vec![
            BoardSlot::Occupied(CardId(4)),
            BoardSlot::Empty,
            BoardSlot::Occupied(CardId(5)),
        ];

        reshuffle(&mut draft, &catalog, RoundType::CivBonus);

        let bucket = &draft.gamestate.available_cards[0];
        assert_eq!(bucket.len(), 7);
        for card in [3, 4, 5] {
            assert!(!bucket.contains(&CardId(card)));
        }
    }

    #[test]
    fn test_refill_replaces_only_empty_slots_and_highlights_them() {
        let catalog = CardCatalog::uniform([50, 0, 0, 0, 0]);
        let mut draft = picking_draft(&catalog, Preset::default());
        let mut rng = StdRng::seed_from_u64(3);
        deal_first_roll(&mut draft, &catalog, &mut rng);
        draft.gamestate.cards[2] = BoardSlot::Empty;
        draft.gamestate.cards[5] = BoardSlot::Empty;
        draft.gamestate.highlighted = vec![0, 1];
        let kept = draft.gamestate.cards[0];

        let touched = refill(&mut draft, &catalog, &mut rng).unwrap();

        assert_eq!(touched, vec![2, 5]);
        assert_eq!(draft.gamestate.highlighted, vec![2, 5]);
        assert_eq!(draft.gamestate.cards[0], kept);
        assert!(draft.gamestate.cards.iter().all(|slot| !slot.is_empty()));
    }

    #[test]
    fn test_refill_is_noop_when_nothing_is_empty() {
        let catalog = CardCatalog::uniform([50, 0, 0, 0, 0]);
        let mut draft = picking_draft(&catalog, Preset::default());
        let mut rng = StdRng::seed_from_u64(3);
        deal_first_roll(&mut draft, &catalog, &mut rng);
        let before = draft.gamestate.cards.clone();

        let touched = refill(&mut draft, &catalog, &mut rng).unwrap();
        assert!(touched.is_empty());
        assert_eq!(draft.gamestate.cards, before);
    }

    #[test]
    fn test_reshuffle_then_refill_with_empty_pool_leaves_slots_empty() {
        let catalog = CardCatalog::uniform([2, 0, 0, 0, 0]);
        let mut draft = picking_draft(&catalog, Preset::default());
        draft.players[0].bonuses[0] = vec![CardId(0), CardId(1)];
        draft.gamestate.available_cards[0].clear();
        draft.gamestate.cards = vec![BoardSlot::Empty, BoardSlot::Empty];
        let mut rng = StdRng::seed_from_u64(9);

        reshuffle(&mut draft, &catalog, RoundType::CivBonus);
        let touched = refill(&mut draft, &catalog, &mut rng).unwrap();

        assert!(touched.is_empty());
        assert_eq!(draft.gamestate.cards, vec![BoardSlot::Empty, BoardSlot::Empty]);
        assert!(draft.gamestate.highlighted.is_empty());
    }

    #[test]
    fn test_clear_redraws_cards_per_roll_slots() {
        let catalog = CardCatalog::uniform([200, 0, 0, 0, 0]);
        let mut draft = picking_draft(&catalog, Preset::default());
        let mut rng = StdRng::seed_from_u64(11);
        deal_first_roll(&mut draft, &catalog, &mut rng);
        draft.gamestate.cards[1] = BoardSlot::Empty;
        let tail = draft.gamestate.cards[3..].to_vec();

        let touched = clear(&mut draft, &catalog, &mut rng).unwrap();

        assert_eq!(touched, vec![0, 1, 2]);
        assert_eq!(draft.gamestate.highlighted, vec![0, 1, 2]);
        assert!(!draft.gamestate.cards[1].is_empty());
        assert_eq!(&draft.gamestate.cards[3..], tail.as_slice());
    }

    #[test]
    fn test_clear_reshuffles_inline_when_bucket_runs_dry() {
        let catalog = CardCatalog::uniform([6, 0, 0, 0, 0]);
        let preset = Preset {
            cards_per_roll: 3,
            ..Preset::default()
        };
        let mut draft = picking_draft(&catalog, preset);
        draft.gamestate.available_cards[0] = vec![CardId(0)];
        draft.gamestate.cards = vec![
            BoardSlot::Occupied(CardId(1)),
            BoardSlot::Occupied(CardId(2)),
            BoardSlot::Occupied(CardId(3)),
        ];
        let mut rng = StdRng::seed_from_u64(5);

        let touched = clear(&mut draft, &catalog, &mut rng).unwrap();

        assert_eq!(touched.len(), 3);
        assert!(draft.gamestate.cards.iter().all(|slot| !slot.is_empty()));
    }

    #[test]
    fn test_clear_with_dry_pool_highlights_only_redrawn_slots() {
        let catalog = CardCatalog::uniform([3, 0, 0, 0, 0]);
        let mut draft = picking_draft(&catalog, Preset::default());
        draft.players[0].bonuses[0] = vec![CardId(0), CardId(1)];
        draft.gamestate.available_cards[0].clear();
        draft.gamestate.cards = vec![BoardSlot::Empty, BoardSlot::Empty, BoardSlot::Empty];
        draft.gamestate.highlighted = vec![2];
        let mut rng = StdRng::seed_from_u64(4);

        let touched = clear(&mut draft, &catalog, &mut rng).unwrap();

        assert_eq!(touched, vec![0]);
        assert_eq!(draft.gamestate.highlighted, vec![0]);
        assert_eq!(draft.gamestate.cards[0], BoardSlot::Occupied(CardId(2)));
        assert!(draft.gamestate.cards[1].is_empty());
        assert!(draft.gamestate.cards[2].is_empty());
    }

    #[test]
    fn test_deal_round_replaces_board_with_batch() {
        let catalog = CardCatalog::uniform([100, 40, 40, 40, 40]);
        let mut draft = picking_draft(&catalog, Preset::default());
        let mut rng = StdRng::seed_from_u64(2);
        deal_first_roll(&mut draft, &catalog, &mut rng);

        deal_round(&mut draft, &catalog, RoundType::UniqueUnit, &mut rng);

        assert_eq!(draft.gamestate.cards.len(), draft.preset.round_batch_size());
        assert_eq!(
            draft.gamestate.available_cards[1].len(),
            40 - draft.preset.round_batch_size()
        );
    }
}
