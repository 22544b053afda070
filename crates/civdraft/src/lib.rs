//! # civdraft
//!
//! Real-time multiplayer civilization draft server.
//!
//! Players join a draft over WebSocket, claim seats, customise their
//! civilization, then take turns picking bonus cards from a shared board.
//! Once every tech tree is in, the finished draft goes to an artifact
//! pipeline.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use civdraft::prelude::*;
//!
//! # async fn run() -> Result<(), CivdraftError> {
//! let mut server = CivdraftServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod pipeline;
mod server;

pub use config::ServerConfig;
pub use error::CivdraftError;
pub use pipeline::{CommandBuilder, JsonExportBuilder, Pipeline};
pub use server::{CivdraftServer, CivdraftServerBuilder};

/// Re-exports for embedding the server or writing clients and tests.
pub mod prelude {
    pub use crate::{CivdraftError, CivdraftServer, ServerConfig};
    pub use civdraft_draft::{CardCatalog, Draft, ManualClock, Phase};
    pub use civdraft_protocol::{CardId, CivInfo, ClientEnvelope, ClientEvent, DraftId, ServerEvent};
    pub use civdraft_session::{MemoryStore, SessionStore};
}
