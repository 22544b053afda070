//! Room configuration.

use std::time::Duration;

/// Settings shared by every room a [`RoomManager`](crate::RoomManager)
/// spawns.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Bounded command channel size per room. Senders wait when it's full.
    pub mailbox: usize,

    /// How often a room checks its pick timer without client activity.
    /// `Duration::ZERO` disables the sweep; expiry then only resolves on
    /// client access.
    pub sweep_interval: Duration,

    /// A room with no events, no subscribers and no build running for
    /// this long stops. `Duration::ZERO` keeps rooms until their draft
    /// completes.
    pub idle_timeout: Duration,

    /// Seed for the room's random number generator. `None` seeds from
    /// the OS; tests set it for reproducible draws.
    pub rng_seed: Option<u64>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            mailbox: 64,
            sweep_interval: Duration::from_secs(1),
            idle_timeout: Duration::from_secs(300),
            rng_seed: None,
        }
    }
}
