//! Room manager: creates drafts, spawns rooms on demand, routes events.

use std::collections::HashMap;
use std::sync::Arc;

use civdraft_protocol::{ClientEvent, DraftId, ServerEvent};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::broadcast;

use crate::room::spawn_room;
use crate::{
    ArtifactBuilder, CallerSender, DraftChannel, DraftProtocol, Outbound, RoomConfig, RoomError,
    RoomHandle,
};

/// Tracks one room per draft with recent activity.
///
/// Rooms are spawned lazily the first time a stored draft is addressed,
/// and respawned if their actor has stopped. Handles of stopped rooms are
/// dropped whenever a new room is spawned. The draft record itself
/// lives in the store, so a respawned room carries on where the old one
/// left off.
pub struct RoomManager<B: ArtifactBuilder> {
    protocol: DraftProtocol,
    channel: Arc<dyn DraftChannel>,
    builder: Arc<B>,
    config: RoomConfig,
    rooms: HashMap<DraftId, RoomHandle>,
    /// Draws draft ids.
    rng: StdRng,
}

impl<B: ArtifactBuilder> RoomManager<B> {
    pub fn new(
        protocol: DraftProtocol,
        channel: Arc<dyn DraftChannel>,
        builder: Arc<B>,
        config: RoomConfig,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            protocol,
            channel,
            builder,
            config,
            rooms: HashMap::new(),
            rng,
        }
    }

    pub fn protocol(&self) -> &DraftProtocol {
        &self.protocol
    }

    /// Stores a new draft built from `preset` and returns its id.
    ///
    /// No room is spawned until someone addresses the draft.
    pub fn create_draft(&mut self, preset: serde_json::Value) -> Result<DraftId, RoomError> {
        self.protocol
            .create_draft(preset, &mut self.rng)
            .map(|draft| draft.id)
    }

    /// Returns the room for `draft_id`, spawning it if needed.
    ///
    /// # Errors
    ///
    /// [`RoomError::NotFound`] if the store has no such draft.
    pub fn room(&mut self, draft_id: &DraftId) -> Result<RoomHandle, RoomError> {
        if let Some(handle) = self.rooms.get(draft_id) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        }
        if !self.protocol.store().exists(draft_id)? {
            return Err(RoomError::NotFound(draft_id.clone()));
        }
        self.rooms.retain(|_, handle| !handle.is_closed());

        let handle = spawn_room(
            draft_id.clone(),
            self.protocol.clone(),
            Arc::clone(&self.channel),
            Arc::clone(&self.builder),
            self.config.clone(),
        );
        self.rooms.insert(draft_id.clone(), handle.clone());
        tracing::info!(%draft_id, rooms = self.rooms.len(), "room spawned");
        Ok(handle)
    }

    /// Routes one event to its draft's room and waits for it to be
    /// handled. An unknown draft is answered with `draft not found`.
    ///
    /// Holds `&mut self` across the room's work; callers sharing the
    /// manager behind a lock should take [`room`](Self::room) under the
    /// lock and call [`RoomHandle::send_event`] outside it.
    pub async fn route(
        &mut self,
        draft_id: &DraftId,
        event: ClientEvent,
        caller: CallerSender,
    ) -> Result<(), RoomError> {
        for attempt in 0..2 {
            let handle = match self.room(draft_id) {
                Ok(handle) => handle,
                Err(RoomError::NotFound(id)) => {
                    let _ = caller.send(ServerEvent::DraftNotFound(id));
                    return Ok(());
                }
                Err(err) => return Err(err),
            };
            match handle.send_event(event.clone(), caller.clone()).await {
                // The room closed between lookup and send; a fresh one
                // takes the event.
                Err(RoomError::Unavailable(_)) if attempt == 0 => continue,
                result => return result,
            }
        }
        Err(RoomError::Unavailable(draft_id.clone()))
    }

    /// Subscribes to everything the draft's room publishes from now on.
    pub fn subscribe(&self, draft_id: &DraftId) -> broadcast::Receiver<Outbound> {
        self.channel.subscribe(draft_id)
    }

    /// Number of rooms whose actor is still running.
    pub fn room_count(&self) -> usize {
        self.rooms.values().filter(|handle| !handle.is_closed()).count()
    }

    /// Stops every room.
    pub async fn shutdown_all(&mut self) {
        for (draft_id, handle) in self.rooms.drain() {
            if handle.shutdown().await.is_err() {
                tracing::debug!(%draft_id, "room already stopped");
            }
        }
    }
}
