//! Wire protocol for civdraft.
//!
//! This crate defines the "language" draft clients and the server speak:
//!
//! - **Types** ([`ClientEnvelope`], [`ClientEvent`], [`ServerEvent`],
//!   [`DraftId`], [`CardId`]): the frames that travel on the wire.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how frames become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about drafts beyond their ids; the
//! session state inside `set gamestate` is a type parameter.

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    CardId, CivInfo, ClientEnvelope, ClientEvent, DraftId, Recipient, ServerEvent,
    TimerStatus, SPECTATOR,
};
