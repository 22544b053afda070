//! Room actor: an isolated Tokio task that serializes one draft's events.
//!
//! The actor owns no draft state of its own. It owns the *right to
//! mutate* the draft: every command is handled to completion (load,
//! apply, persist, deliver) before the next one is received. Builds run
//! in separate tasks and report back through the actor's own mailbox, so
//! a slow pipeline never blocks picks or timer checks.
//!
//! A room stops once its draft is complete, or when it has been idle for
//! [`RoomConfig::idle_timeout`] with no subscribers and no build running.
//! The record stays in the store, so the manager can spawn a fresh room
//! the next time the draft is addressed.

use std::future;
use std::sync::Arc;

use civdraft_protocol::{ClientEvent, DraftId, Recipient};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::{
    ArtifactBuilder, BuildError, BuildRequest, DraftChannel, DraftProtocol, DraftStatus, Effect,
    Outbound, Reply, RoomConfig, RoomError,
};

/// Channel for delivering events to the connection that sent a request.
pub type CallerSender = mpsc::UnboundedSender<Outbound>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    /// A client event. `ack` resolves once the event was handled and its
    /// replies were handed off.
    Event {
        event: ClientEvent,
        caller: CallerSender,
        ack: oneshot::Sender<Result<(), RoomError>>,
    },

    /// A build task finished.
    BuildFinished { result: Result<String, BuildError> },

    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone. The [`RoomManager`](crate::RoomManager) keeps one per
/// active draft.
#[derive(Clone)]
pub struct RoomHandle {
    draft_id: DraftId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn draft_id(&self) -> &DraftId {
        &self.draft_id
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Hands `event` to the room and waits until it has been handled.
    ///
    /// Replies meant for the sender alone go to `caller`; room-wide
    /// events go through the [`DraftChannel`].
    pub async fn send_event(
        &self,
        event: ClientEvent,
        caller: CallerSender,
    ) -> Result<(), RoomError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Event {
                event,
                caller,
                ack: ack_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.draft_id.clone()))?;
        ack_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.draft_id.clone()))?
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.draft_id.clone()))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<B: ArtifactBuilder> {
    draft_id: DraftId,
    protocol: DraftProtocol,
    channel: Arc<dyn DraftChannel>,
    builder: Arc<B>,
    config: RoomConfig,
    rng: StdRng,
    receiver: mpsc::Receiver<RoomCommand>,
    /// Lets build tasks report back without keeping the room alive on
    /// their own.
    mailbox: mpsc::WeakSender<RoomCommand>,
    /// Last known status of the draft. Refreshed by every reply.
    status: Option<DraftStatus>,
    builds_running: usize,
}

impl<B: ArtifactBuilder> RoomActor<B> {
    async fn run(mut self) {
        tracing::info!(draft_id = %self.draft_id, "room actor started");
        self.status = match self.protocol.status(&self.draft_id) {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(draft_id = %self.draft_id, error = %err, "could not load draft status");
                None
            }
        };
        self.resume_pending_build();

        let mut sweep = (!self.config.sweep_interval.is_zero()).then(|| {
            let mut interval = tokio::time::interval(self.config.sweep_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let idle_timeout = self.config.idle_timeout;
        let idle = tokio::time::sleep(idle_timeout);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        tracing::info!(draft_id = %self.draft_id, "room shutting down");
                        break;
                    }
                    if self.is_complete() {
                        tracing::info!(draft_id = %self.draft_id, "draft complete, closing room");
                        break;
                    }
                    idle.as_mut().reset(Instant::now() + idle_timeout);
                }
                _ = next_tick(&mut sweep), if self.is_counting_down() => self.sweep(),
                _ = &mut idle, if !idle_timeout.is_zero() => {
                    if self.is_idle() {
                        tracing::info!(draft_id = %self.draft_id, "room idle, closing");
                        break;
                    }
                    idle.as_mut().reset(Instant::now() + idle_timeout);
                }
            }
        }

        self.drain().await;
        tracing::info!(draft_id = %self.draft_id, "room actor stopped");
    }

    /// Handles one command. Returns `false` on shutdown.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Event { event, caller, ack } => {
                let result = self.handle_event(event, &caller);
                let _ = ack.send(result);
            }
            RoomCommand::BuildFinished { result } => self.handle_build_finished(result),
            RoomCommand::Shutdown => return false,
        }
        true
    }

    /// Refuses new commands, then handles everything already queued so no
    /// accepted event goes unanswered.
    async fn drain(&mut self) {
        self.receiver.close();
        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }
    }

    fn is_complete(&self) -> bool {
        self.status.is_some_and(DraftStatus::is_complete)
    }

    fn is_counting_down(&self) -> bool {
        self.status.is_some_and(|status| status.counting_down)
    }

    /// Nobody is watching and nothing is in flight.
    fn is_idle(&self) -> bool {
        self.builds_running == 0 && self.channel.subscriber_count(&self.draft_id) == 0
    }

    fn handle_event(&mut self, event: ClientEvent, caller: &CallerSender) -> Result<(), RoomError> {
        let name = event.name();
        let reply = self
            .protocol
            .handle(&self.draft_id, event, &mut self.rng)
            .inspect_err(|err| {
                tracing::error!(draft_id = %self.draft_id, event = name, error = %err, "event failed");
            })?;
        self.deliver(reply, Some(caller));
        Ok(())
    }

    fn handle_build_finished(&mut self, result: Result<String, BuildError>) {
        self.builds_running = self.builds_running.saturating_sub(1);
        match self.protocol.finish_build(&self.draft_id, result) {
            Ok(reply) => self.deliver(reply, None),
            Err(err) => {
                tracing::error!(draft_id = %self.draft_id, error = %err, "could not record build result");
            }
        }
    }

    fn sweep(&mut self) {
        match self.protocol.sweep(&self.draft_id, &mut self.rng) {
            Ok(reply) => self.deliver(reply, None),
            Err(err) => {
                tracing::warn!(draft_id = %self.draft_id, error = %err, "timer sweep failed");
            }
        }
    }

    fn resume_pending_build(&mut self) {
        match self.protocol.pending_build(&self.draft_id) {
            Ok(Some(request)) => {
                tracing::info!(draft_id = %self.draft_id, "relaunching interrupted build");
                self.start_build(request);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(draft_id = %self.draft_id, error = %err, "could not check for a pending build");
            }
        }
    }

    /// Sends each outbound event where it belongs, then starts any
    /// follow-up work.
    fn deliver(&mut self, reply: Reply, caller: Option<&CallerSender>) {
        if reply.status.is_some() {
            self.status = reply.status;
        }
        for (recipient, event) in reply.outbound {
            match recipient {
                Recipient::Room => self.channel.publish(&self.draft_id, event),
                Recipient::Caller => {
                    // The caller may already have disconnected.
                    if let Some(caller) = caller {
                        let _ = caller.send(event);
                    }
                }
            }
        }
        if let Some(Effect::StartBuild(request)) = reply.effect {
            self.start_build(request);
        }
    }

    fn start_build(&mut self, request: BuildRequest) {
        let Some(mailbox) = self.mailbox.upgrade() else {
            return;
        };
        let builder = Arc::clone(&self.builder);
        let draft_id = self.draft_id.clone();
        tracing::info!(%draft_id, slots = request.slots.len(), "build started");
        self.builds_running += 1;

        tokio::spawn(async move {
            let result = builder.build(request).await;
            if mailbox
                .send(RoomCommand::BuildFinished { result })
                .await
                .is_err()
            {
                tracing::warn!(%draft_id, "room stopped before the build finished");
            }
        });
    }
}

/// Waits for the next sweep tick, or forever when sweeping is disabled.
async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending().await,
    }
}

/// Spawns a room actor for `draft_id` and returns a handle to it.
pub(crate) fn spawn_room<B: ArtifactBuilder>(
    draft_id: DraftId,
    protocol: DraftProtocol,
    channel: Arc<dyn DraftChannel>,
    builder: Arc<B>,
    config: RoomConfig,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.mailbox.max(1));
    let rng = match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let actor = RoomActor {
        draft_id: draft_id.clone(),
        protocol,
        channel,
        builder,
        config,
        rng,
        receiver: rx,
        mailbox: tx.downgrade(),
        status: None,
        builds_running: 0,
    };
    tokio::spawn(actor.run());

    RoomHandle {
        draft_id,
        sender: tx,
    }
}
