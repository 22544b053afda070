//! Draft record storage for civdraft.
//!
//! The store is the single source of truth for every draft. Nothing above
//! this layer keeps a draft between events: each event reads the record,
//! mutates it, and writes it back before anything is broadcast.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)  ← reads, mutates, and writes drafts per event
//!     ↕
//! Session Layer (this crate)  ← get / put / exists by draft id
//!     ↕
//! Draft Layer (below)  ← the Draft record itself
//! ```

mod error;
mod file;
mod memory;
mod store;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{unique_id, SessionStore};
