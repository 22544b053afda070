//! Phase transitions driven by player actions.
//!
//! ```text
//! claim_slot ──► start ──► confirm_civ_info* ──► (apply_pick)* ──► submit_tree* ──► complete_build
//!   Lobby        Lobby→Setup   Setup→Picking      Picking→AwaitingTree  AwaitingTree→Generating  →Complete
//! ```
//!
//! The starred steps are per player and fire the transition the moment
//! every player is ready.

use civdraft_protocol::{CivInfo, DraftId};
use rand::Rng;

use crate::{pool, CardCatalog, Draft, DraftError, GameState, Phase, Player, Preset};

/// Digits in a generated draft id.
const ID_DIGITS: usize = 15;

impl Draft {
    /// Creates a draft in the lobby with every slot free.
    pub fn new(
        id: DraftId,
        preset: Preset,
        catalog: &CardCatalog,
        now_millis: u64,
    ) -> Result<Self, DraftError> {
        preset.validate()?;
        let available_cards = pool::initial_pools(catalog, &preset);
        Ok(Self {
            id,
            timestamp: now_millis,
            players: vec![Player::default(); preset.slots],
            preset,
            gamestate: GameState {
                available_cards,
                ..GameState::default()
            },
            artifact: None,
            build_error: None,
        })
    }

    /// A random 15-digit id. Uniqueness is the store's concern.
    pub fn random_id<R: Rng + ?Sized>(rng: &mut R) -> DraftId {
        let id: String = (0..ID_DIGITS)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect();
        DraftId(id)
    }

    /// Seats `name`. The host takes slot 0; everyone else the first free
    /// slot after it.
    pub fn claim_slot(&mut self, name: &str, host: bool) -> Result<usize, DraftError> {
        self.expect_phase(Phase::Lobby)?;
        if name.is_empty() {
            return Err(DraftError::MissingName);
        }
        let seat = if host {
            Some(0).filter(|_| !self.players[0].is_claimed())
        } else {
            (1..self.players.len()).find(|&seat| !self.players[seat].is_claimed())
        };
        let seat = seat.ok_or(DraftError::NoFreeSlot)?;
        self.players[seat].name = name.to_owned();
        Ok(seat)
    }

    /// Flips a player's lobby readiness.
    pub fn toggle_ready(&mut self, player_number: i32) -> Result<bool, DraftError> {
        self.expect_phase(Phase::Lobby)?;
        let seat = self.seat(player_number)?;
        let player = &mut self.players[seat];
        player.ready = !player.ready;
        Ok(player.ready)
    }

    /// Lobby → setup, once every slot is claimed.
    pub fn start(&mut self) -> Result<(), DraftError> {
        self.expect_phase(Phase::Lobby)?;
        let unclaimed = self.players.iter().filter(|p| !p.is_claimed()).count();
        if unclaimed > 0 {
            return Err(DraftError::SlotsUnclaimed(unclaimed));
        }
        self.gamestate.phase = Phase::Setup;
        self.reset_ready();
        tracing::info!(draft_id = %self.id, "draft started");
        Ok(())
    }

    /// Stores a player's cosmetics and marks them ready.
    ///
    /// When the last player confirms, picking starts: the turn order is
    /// drawn, the first board is dealt, and the timer is armed. Returns
    /// whether that happened.
    pub fn confirm_civ_info<R: Rng + ?Sized>(
        &mut self,
        info: &CivInfo,
        catalog: &CardCatalog,
        now_millis: u64,
        rng: &mut R,
    ) -> Result<bool, DraftError> {
        self.expect_phase(Phase::Setup)?;
        let seat = self.seat(info.player_number)?;

        let player = &mut self.players[seat];
        player.alias = info.civ_name.clone();
        player.flag_palette = info.flag_palette.clone();
        player.architecture = info.architecture;
        player.language = info.language;
        if let Some(wonder) = info.wonder {
            player.wonder = wonder;
        }
        if let Some(castle) = info.castle {
            player.castle = castle;
        }
        if let Some(description) = &info.description {
            player.description = description.clone();
        }
        if let Some(data) = &info.custom_flag_data {
            player.custom_flag = true;
            player.custom_flag_data = data.clone();
        }
        player.ready = true;

        if !self.all_ready() {
            return Ok(false);
        }

        self.gamestate.phase = Phase::Picking;
        self.reset_ready();
        self.gamestate.order = priority_order(self.slots(), rng);
        pool::deal_first_roll(self, catalog, rng);
        if self.preset.timer_enabled {
            self.gamestate.timer_remaining = self.preset.timer_duration;
            self.gamestate.timer_paused = false;
            self.gamestate.timer_last_update = Some(now_millis);
        }
        tracing::info!(
            draft_id = %self.id,
            order = ?self.gamestate.order,
            board = self.gamestate.cards.len(),
            "picking started"
        );
        Ok(true)
    }

    /// Stores a player's final tech tree and marks them ready.
    ///
    /// Returns whether every tree is in and the draft moved to
    /// [`Phase::Generating`].
    pub fn submit_tree(&mut self, player_number: i32, tree: Vec<Vec<u32>>) -> Result<bool, DraftError> {
        self.expect_phase(Phase::AwaitingTree)?;
        let seat = self.seat(player_number)?;
        self.players[seat].tree = tree;
        self.players[seat].ready = true;

        if !self.all_ready() {
            return Ok(false);
        }
        self.gamestate.phase = Phase::Generating;
        self.build_error = None;
        tracing::info!(draft_id = %self.id, "all tech trees submitted");
        Ok(true)
    }

    /// Stores an in-progress tech tree without touching readiness.
    pub fn save_tree_progress(&mut self, player_number: i32, tree: Vec<Vec<u32>>) -> Result<(), DraftError> {
        self.expect_phase(Phase::AwaitingTree)?;
        let seat = self.seat(player_number)?;
        self.players[seat].tree = tree;
        Ok(())
    }

    /// Records the build artifact and completes the draft.
    pub fn complete_build(&mut self, artifact: String) -> Result<(), DraftError> {
        self.expect_phase(Phase::Generating)?;
        self.artifact = Some(artifact);
        self.build_error = None;
        self.gamestate.phase = Phase::Complete;
        Ok(())
    }

    /// Records a failed build. The draft stays in [`Phase::Generating`]
    /// so the build can be retried.
    pub fn fail_build(&mut self, reason: String) -> Result<(), DraftError> {
        self.expect_phase(Phase::Generating)?;
        self.build_error = Some(reason);
        Ok(())
    }
}

/// A uniformly random turn order. Each slot draws a random priority, and
/// equal priorities are broken by a second independent draw.
fn priority_order<R: Rng + ?Sized>(slots: usize, rng: &mut R) -> Vec<usize> {
    let mut ranked: Vec<(u64, u64, usize)> = (0..slots)
        .map(|slot| (rng.random::<u64>(), rng.random::<u64>(), slot))
        .collect();
    ranked.sort_unstable_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));
    ranked.into_iter().map(|(_, _, slot)| slot).collect()
}
