//! Per-connection handler: frame decoding, subscriptions, and routing.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!   1. Spawn a writer task draining the connection's outbox
//!   2. Loop: receive a frame → decode the envelope → route it
//!   3. On close, stop the writer and every subscription forwarder
//!
//! Replies meant for this connection alone are pushed to the outbox by
//! the room. Room-wide events reach the outbox through a forwarder task
//! per joined draft.

use std::collections::HashMap;
use std::sync::Arc;

use civdraft_protocol::{ClientEnvelope, ClientEvent, Codec, DraftId, ProtocolError, ServerEvent};
use civdraft_room::{CallerSender, Outbound, RoomError};
use civdraft_transport::{Connection, WebSocketConnection};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::server::ServerState;
use crate::CivdraftError;

/// Forwarder tasks, one per joined draft. Aborted when dropped.
#[derive(Default)]
struct Subscriptions {
    forwarders: HashMap<DraftId, JoinHandle<()>>,
}

impl Subscriptions {
    fn contains(&self, draft_id: &DraftId) -> bool {
        self.forwarders.contains_key(draft_id)
    }

    fn insert(&mut self, draft_id: DraftId, task: JoinHandle<()>) {
        self.forwarders.insert(draft_id, task);
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        for task in self.forwarders.values() {
            task.abort();
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), CivdraftError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let (outbox, outbox_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_outbox(Arc::clone(&conn), Arc::clone(&state), outbox_rx));
    let mut subscriptions = Subscriptions::default();

    loop {
        let text = match conn.recv().await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let envelope: ClientEnvelope = match state.codec.decode(text.as_bytes()) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode frame");
                continue;
            }
        };

        let event = envelope.event.name();
        if let Err(e) = dispatch(&state, envelope, &outbox, &mut subscriptions).await {
            tracing::warn!(%conn_id, event, error = %e, "event could not be handled");
        }
    }

    drop(subscriptions);
    writer.abort();
    Ok(())
}

/// Routes one envelope: creation goes to the manager, everything else
/// to the addressed draft's room.
async fn dispatch(
    state: &ServerState,
    envelope: ClientEnvelope,
    outbox: &CallerSender,
    subscriptions: &mut Subscriptions,
) -> Result<(), CivdraftError> {
    let ClientEnvelope { draft_id, event } = envelope;

    if let ClientEvent::CreateDraft { preset } = event {
        let created = state.rooms.lock().await.create_draft(preset);
        let reply = match created {
            Ok(id) => ServerEvent::DraftCreated { id },
            Err(RoomError::InvalidPreset(reason)) => ServerEvent::Rejected { reason },
            Err(e) => return Err(e.into()),
        };
        let _ = outbox.send(reply);
        return Ok(());
    }

    let Some(draft_id) = draft_id else {
        return Err(ProtocolError::InvalidMessage(format!("{} needs a draft_id", event.name())).into());
    };

    // Lock only to find the room; the event itself is handled outside it.
    let handle = {
        let mut rooms = state.rooms.lock().await;
        let handle = match rooms.room(&draft_id) {
            Ok(handle) => handle,
            Err(RoomError::NotFound(id)) => {
                let _ = outbox.send(ServerEvent::DraftNotFound(id));
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        if matches!(event, ClientEvent::JoinRoom) && !subscriptions.contains(&draft_id) {
            let receiver = rooms.subscribe(&draft_id);
            let task = tokio::spawn(forward(draft_id.clone(), receiver, outbox.clone()));
            subscriptions.insert(draft_id.clone(), task);
            tracing::debug!(%draft_id, "connection joined draft channel");
        }
        handle
    };

    match handle.send_event(event.clone(), outbox.clone()).await {
        // The room closed between lookup and send; a fresh one takes the
        // event.
        Err(RoomError::Unavailable(_)) => {
            let handle = state.rooms.lock().await.room(&draft_id)?;
            handle.send_event(event, outbox.clone()).await?;
        }
        result => result?,
    }
    Ok(())
}

/// Copies a draft's broadcasts into one connection's outbox.
async fn forward(draft_id: DraftId, mut receiver: broadcast::Receiver<Outbound>, outbox: CallerSender) {
    loop {
        match receiver.recv().await {
            Ok(event) => {
                if outbox.send(event).is_err() {
                    break;
                }
            }
            // Every state broadcast is complete, so skipping is harmless.
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(%draft_id, skipped, "subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Encodes and sends everything pushed to the outbox, in order.
async fn write_outbox(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState>,
    mut outbox: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(event) = outbox.recv().await {
        let text = match encode(&state, &event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(conn_id = %conn.id(), error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&text).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
            break;
        }
    }
}

fn encode(state: &ServerState, event: &Outbound) -> Result<String, ProtocolError> {
    let bytes = state.codec.encode(event)?;
    String::from_utf8(bytes).map_err(|e| ProtocolError::InvalidMessage(e.to_string()))
}
