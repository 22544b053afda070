//! Event handling: one client event in, store update and outbound events out.
//!
//! [`DraftProtocol`] is synchronous and owns no draft state. Every call
//! reads the record from the store, applies the event, writes the record
//! back, and only then returns the events to deliver. The room actor
//! guarantees calls for one draft never overlap.
//!
//! # Failure handling
//!
//! Client-caused failures never reach the caller as errors:
//!
//! ```text
//! unknown draft      → `draft not found` to the caller
//! stale turn number  → dropped silently (debug log)
//! wrong phase        → dropped silently (debug log)
//! pick not on board  → `bug` to the room, record untouched (error log)
//! full lobby         → `slot unavailable` to the caller
//! anything else      → `rejected` to the caller (warn log)
//! ```
//!
//! Only infrastructure failures (the store) come back as [`RoomError`].

use std::sync::Arc;

use civdraft_draft::{
    apply_pick, pool, timer, CardCatalog, Clock, Draft, DraftError, Phase, Preset,
};
use civdraft_protocol::{ClientEvent, DraftId, Recipient, ServerEvent};
use civdraft_session::{unique_id, SessionStore};
use rand::Rng;

use crate::{BuildError, BuildRequest, Outbound, RoomError};

/// Work the room has to start after an event was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Hand the finalized draft to the artifact pipeline.
    StartBuild(BuildRequest),
}

/// What a room keeps track of about its draft between events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftStatus {
    pub phase: Phase,
    /// A pick countdown is running and can expire without client input.
    pub counting_down: bool,
}

impl DraftStatus {
    pub fn of(draft: &Draft) -> Self {
        let phase = draft.phase();
        Self {
            phase,
            counting_down: phase == Phase::Picking
                && draft.preset.timer_enabled
                && !draft.gamestate.timer_paused,
        }
    }

    pub fn is_complete(self) -> bool {
        self.phase == Phase::Complete
    }
}

/// The result of handling one event.
#[derive(Debug, Default)]
pub struct Reply {
    /// Events to deliver, in order.
    pub outbound: Vec<(Recipient, Outbound)>,
    pub effect: Option<Effect>,
    /// The draft's status afterwards. `None` when no draft was loaded.
    pub status: Option<DraftStatus>,
}

impl Reply {
    /// Nothing to send.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn to(recipient: Recipient, event: Outbound) -> Self {
        Self {
            outbound: vec![(recipient, event)],
            ..Self::default()
        }
    }

    pub fn caller(event: Outbound) -> Self {
        Self::to(Recipient::Caller, event)
    }

    pub fn room(event: Outbound) -> Self {
        Self::to(Recipient::Room, event)
    }

    fn with(mut self, recipient: Recipient, event: Outbound) -> Self {
        self.outbound.push((recipient, event));
        self
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = Some(effect);
        self
    }

    fn with_status(mut self, draft: &Draft) -> Self {
        self.status = Some(DraftStatus::of(draft));
        self
    }
}

/// Applies client events to stored drafts.
///
/// Cheap to clone: everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct DraftProtocol {
    store: Arc<dyn SessionStore>,
    catalog: Arc<CardCatalog>,
    clock: Arc<dyn Clock>,
}

impl DraftProtocol {
    pub fn new(
        store: Arc<dyn SessionStore>,
        catalog: Arc<CardCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn catalog(&self) -> &CardCatalog {
        &self.catalog
    }

    /// Creates and stores a new draft from a raw preset.
    ///
    /// Absent preset fields take their defaults.
    pub fn create_draft<R: Rng + ?Sized>(
        &self,
        preset: serde_json::Value,
        rng: &mut R,
    ) -> Result<Draft, RoomError> {
        let preset: Preset = serde_json::from_value(preset)
            .map_err(|e| RoomError::InvalidPreset(e.to_string()))?;
        let id = unique_id(self.store.as_ref(), rng)?;
        let draft = Draft::new(id, preset, &self.catalog, self.clock.now_millis()).map_err(
            |e| match e {
                DraftError::InvalidPreset(reason) => RoomError::InvalidPreset(reason),
                other => other.into(),
            },
        )?;
        self.store.put(&draft)?;
        tracing::info!(
            draft_id = %draft.id,
            slots = draft.preset.slots,
            rounds = draft.preset.rounds,
            "draft created"
        );
        Ok(draft)
    }

    /// Handles one event addressed to `draft_id`.
    pub fn handle<R: Rng + ?Sized>(
        &self,
        draft_id: &DraftId,
        event: ClientEvent,
        rng: &mut R,
    ) -> Result<Reply, RoomError> {
        let Some(mut draft) = self.store.get(draft_id)? else {
            tracing::debug!(%draft_id, event = event.name(), "draft not found");
            return Ok(Reply::caller(ServerEvent::DraftNotFound(draft_id.clone())));
        };
        let name = event.name();
        let reply = match self.apply(&mut draft, event, rng) {
            Ok(reply) => reply,
            Err(RoomError::Draft(err)) => recover(&draft, name, err),
            Err(err) => return Err(err),
        };
        Ok(reply.with_status(&draft))
    }

    /// Resolves an expired pick timer without any client activity.
    pub fn sweep<R: Rng + ?Sized>(&self, draft_id: &DraftId, rng: &mut R) -> Result<Reply, RoomError> {
        let Some(mut draft) = self.store.get(draft_id)? else {
            return Ok(Reply::none());
        };
        let now = self.clock.now_millis();
        // Only an automatic pick is worth a write; the countdown itself is
        // recomputed from the stored stamp on the next access.
        timer::refresh_remaining(&mut draft, now);
        let reply = match timer::auto_pick(&mut draft, &self.catalog, now, rng) {
            Ok(Some(_)) => self.commit(&draft)?,
            Ok(None) => Reply::none(),
            Err(err) => recover(&draft, "sweep", err),
        };
        Ok(reply.with_status(&draft))
    }

    /// Records the pipeline's result on the draft.
    pub fn finish_build(
        &self,
        draft_id: &DraftId,
        result: Result<String, BuildError>,
    ) -> Result<Reply, RoomError> {
        let mut draft = self
            .store
            .get(draft_id)?
            .ok_or_else(|| RoomError::NotFound(draft_id.clone()))?;
        match result {
            Ok(artifact) => {
                tracing::info!(%draft_id, %artifact, "build complete");
                draft.complete_build(artifact)?;
            }
            Err(err) => {
                tracing::error!(%draft_id, error = %err, "build failed");
                draft.fail_build(err.to_string())?;
            }
        }
        Ok(self.commit(&draft)?.with_status(&draft))
    }

    /// The current status of `draft_id`, or `None` if it isn't stored.
    pub fn status(&self, draft_id: &DraftId) -> Result<Option<DraftStatus>, RoomError> {
        Ok(self.store.get(draft_id)?.as_ref().map(DraftStatus::of))
    }

    /// A build to relaunch for a draft left generating without a result,
    /// e.g. after a restart interrupted the pipeline.
    pub fn pending_build(&self, draft_id: &DraftId) -> Result<Option<BuildRequest>, RoomError> {
        Ok(self
            .store
            .get(draft_id)?
            .filter(|draft| draft.phase() == Phase::Generating && draft.build_error.is_none())
            .map(|draft| BuildRequest::from_draft(&draft)))
    }

    fn apply<R: Rng + ?Sized>(
        &self,
        draft: &mut Draft,
        event: ClientEvent,
        rng: &mut R,
    ) -> Result<Reply, RoomError> {
        let now = self.clock.now_millis();
        match event {
            // Subscription is the transport's business.
            ClientEvent::JoinRoom => Ok(Reply::none()),

            ClientEvent::GetGamestate { player_number } => {
                let picked = self.catch_up(draft, now, rng)?;
                let recipient = if picked || player_number >= 0 {
                    Recipient::Room
                } else {
                    Recipient::Caller
                };
                Ok(Reply::to(recipient, ServerEvent::SetGamestate(draft.clone())))
            }

            ClientEvent::GetPrivateGamestate => {
                let picked = self.catch_up(draft, now, rng)?;
                let recipient = if picked {
                    Recipient::Room
                } else {
                    Recipient::Caller
                };
                Ok(Reply::to(recipient, ServerEvent::SetGamestate(draft.clone())))
            }

            ClientEvent::ClaimSlot { name, host } => {
                let seat = draft.claim_slot(&name, host)?;
                tracing::info!(draft_id = %draft.id, seat, host, "slot claimed");
                self.store.put(draft)?;
                Ok(Reply::caller(ServerEvent::SlotClaimed { player_number: seat })
                    .with(Recipient::Room, ServerEvent::SetGamestate(draft.clone())))
            }

            ClientEvent::ToggleReady { player_number } => {
                draft.toggle_ready(player_number)?;
                self.commit(draft)
            }

            ClientEvent::StartDraft => {
                draft.start()?;
                self.commit(draft)
            }

            ClientEvent::UpdateCivInfo(info) => {
                draft.confirm_civ_info(&info, &self.catalog, now, rng)?;
                self.commit(draft)
            }

            ClientEvent::UpdateTree {
                player_number,
                tree,
            } => {
                let all_in = draft.submit_tree(player_number, tree)?;
                let reply = self.commit(draft)?;
                if all_in {
                    Ok(reply.with_effect(Effect::StartBuild(BuildRequest::from_draft(draft))))
                } else {
                    Ok(reply)
                }
            }

            ClientEvent::UpdateTreeProgress {
                player_number,
                tree,
            } => {
                draft.save_tree_progress(player_number, tree)?;
                self.store.put(draft)?;
                Ok(Reply::none())
            }

            ClientEvent::EndTurn { pick, client_turn } => {
                draft.check_turn(client_turn)?;
                let outcome = apply_pick(draft, &self.catalog, pick, now, rng)?;
                tracing::info!(
                    draft_id = %draft.id,
                    slot = outcome.slot,
                    %pick,
                    round = %outcome.round,
                    turn = draft.gamestate.turn,
                    "pick applied"
                );
                self.commit(draft)
            }

            ClientEvent::Refill => {
                draft.expect_phase(Phase::Picking)?;
                pool::refill(draft, &self.catalog, rng)?;
                self.commit(draft)
            }

            ClientEvent::Clear => {
                draft.expect_phase(Phase::Picking)?;
                pool::clear(draft, &self.catalog, rng)?;
                self.commit(draft)
            }

            ClientEvent::PauseTimer => {
                draft.expect_phase(Phase::Picking)?;
                timer::pause(draft, now);
                self.store.put(draft)?;
                Ok(Reply::room(ServerEvent::TimerUpdate(timer::status(draft))))
            }

            ClientEvent::ResumeTimer => {
                draft.expect_phase(Phase::Picking)?;
                timer::resume(draft, now);
                self.store.put(draft)?;
                Ok(Reply::room(ServerEvent::TimerUpdate(timer::status(draft))))
            }

            ClientEvent::SyncTimer => {
                if self.catch_up(draft, now, rng)? {
                    Ok(Reply::room(ServerEvent::SetGamestate(draft.clone())))
                } else {
                    Ok(Reply::caller(ServerEvent::TimerUpdate(timer::status(draft))))
                }
            }

            ClientEvent::TimerExpired { client_turn } => {
                if client_turn != draft.gamestate.turn {
                    tracing::debug!(
                        draft_id = %draft.id,
                        client_turn,
                        turn = draft.gamestate.turn,
                        "expiry reported for a past turn"
                    );
                    if timer::refresh_remaining(draft, now) {
                        self.store.put(draft)?;
                    }
                    return Ok(Reply::caller(ServerEvent::TimerUpdate(timer::status(draft))));
                }
                if self.catch_up(draft, now, rng)? {
                    Ok(Reply::room(ServerEvent::SetGamestate(draft.clone())))
                } else {
                    Ok(Reply::caller(ServerEvent::TimerUpdate(timer::status(draft))))
                }
            }

            ClientEvent::RetryBuild => {
                draft.expect_phase(Phase::Generating)?;
                if draft.build_error.take().is_none() {
                    tracing::debug!(draft_id = %draft.id, "build still running, retry ignored");
                    return Ok(Reply::none());
                }
                tracing::info!(draft_id = %draft.id, "retrying build");
                let reply = self.commit(draft)?;
                Ok(reply.with_effect(Effect::StartBuild(BuildRequest::from_draft(draft))))
            }

            ClientEvent::CreateDraft { .. } => Ok(Reply::caller(ServerEvent::Rejected {
                reason: "create draft is not addressed to an existing draft".into(),
            })),
        }
    }

    /// Brings the timer up to date and resolves it if it ran out.
    /// Persists any change. Returns whether a pick was made.
    fn catch_up<R: Rng + ?Sized>(
        &self,
        draft: &mut Draft,
        now: u64,
        rng: &mut R,
    ) -> Result<bool, RoomError> {
        let refreshed = timer::refresh_remaining(draft, now);
        let picked = timer::auto_pick(draft, &self.catalog, now, rng)?.is_some();
        if refreshed || picked {
            self.store.put(draft)?;
        }
        Ok(picked)
    }

    /// Writes the record, then returns the full state for the room.
    fn commit(&self, draft: &Draft) -> Result<Reply, RoomError> {
        self.store.put(draft)?;
        Ok(Reply::room(ServerEvent::SetGamestate(draft.clone())))
    }
}

/// Turns a rule violation into what the client should see.
fn recover(draft: &Draft, event: &str, err: DraftError) -> Reply {
    match err {
        DraftError::StaleTurn { client, current } => {
            tracing::debug!(draft_id = %draft.id, event, client, current, "stale turn, dropped");
            Reply::none()
        }
        DraftError::WrongPhase { expected, actual } => {
            tracing::debug!(
                draft_id = %draft.id,
                event,
                %expected,
                %actual,
                "event not allowed in this phase, ignored"
            );
            Reply::none()
        }
        DraftError::CardNotFound { pick, turn } => {
            tracing::error!(
                draft_id = %draft.id,
                %pick,
                turn,
                gamestate = ?draft.gamestate,
                "picked card is not on the board"
            );
            Reply::room(ServerEvent::Bug)
        }
        DraftError::NoFreeSlot => Reply::caller(ServerEvent::SlotUnavailable),
        other => {
            tracing::warn!(draft_id = %draft.id, event, error = %other, "event rejected");
            Reply::caller(ServerEvent::Rejected {
                reason: other.to_string(),
            })
        }
    }
}
