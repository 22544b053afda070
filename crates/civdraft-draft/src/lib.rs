//! Draft session state machine for civdraft.
//!
//! Everything in this crate is synchronous and side-effect free apart
//! from mutating the [`Draft`] record it is handed. Randomness comes in
//! through `rand::Rng` parameters and time through the [`Clock`] trait,
//! so every rule can be exercised deterministically.
//!
//! # Key pieces
//!
//! - [`Draft`] — the session record (preset, players, game state)
//! - [`turn`] — who acts on a given turn, and in which round type
//! - [`pool`] — card buckets: initial pools, reshuffle, refill, clear
//! - [`pick`] — applying a pick to the record
//! - [`timer`] — the lazily-evaluated pick countdown and auto-pick
//! - [`CardCatalog`] — read-only rarity/edition metadata per round type

mod catalog;
mod clock;
mod error;
mod lifecycle;
mod model;
pub mod pick;
pub mod pool;
pub mod timer;
pub mod turn;

pub use catalog::{CardCatalog, CardEntry, RoundType, ROUND_TYPES};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::DraftError;
pub use model::{BoardSlot, Draft, GameState, Phase, Player, Preset, TurnOrder};
pub use pick::{apply_pick, PickOutcome};
pub use turn::TurnPosition;
