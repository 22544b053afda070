//! Draft rooms for civdraft.
//!
//! Every draft with activity gets a room: an isolated Tokio task (actor
//! model) that handles that draft's events one at a time. Two events for
//! the same draft never interleave, and events for different drafts never
//! wait on each other.
//!
//! # Key types
//!
//! - [`DraftProtocol`] — turns one client event into a store update plus
//!   outbound events
//! - [`RoomManager`] — creates drafts, spawns rooms on demand, routes events
//! - [`RoomHandle`] — send events to a running room actor
//! - [`DraftChannel`] / [`BroadcastHub`] — per-draft publish/subscribe
//! - [`ArtifactBuilder`] — the external build pipeline boundary
//! - [`RoomConfig`] — mailbox size, sweep interval, idle timeout

#![allow(async_fn_in_trait)]

mod channel;
mod config;
mod error;
mod logic;
mod manager;
mod pipeline;
mod room;

pub use channel::{BroadcastHub, DraftChannel, Outbound};
pub use config::RoomConfig;
pub use error::RoomError;
pub use logic::{DraftProtocol, DraftStatus, Effect, Reply};
pub use manager::RoomManager;
pub use pipeline::{ArtifactBuilder, BuildError, BuildRequest, SlotBuild};
pub use room::{CallerSender, RoomHandle};
