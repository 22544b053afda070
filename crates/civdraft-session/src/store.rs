//! The store abstraction.

use civdraft_draft::Draft;
use civdraft_protocol::DraftId;
use rand::Rng;

use crate::StoreError;

/// How many random ids [`unique_id`] tries before giving up.
const ID_ATTEMPTS: usize = 32;

/// Key-value storage of draft records, keyed by draft id.
///
/// Operations are synchronous: a put or get is treated as fast relative
/// to message handling, and the room actor that calls them owns its
/// draft exclusively, so nothing here needs to be async.
///
/// # Trait bounds
///
/// - `Send + Sync` → one store is shared by every room task.
/// - `'static` → it lives as long as the server.
///
/// # Example
///
/// ```rust
/// use civdraft_session::{MemoryStore, SessionStore};
/// use civdraft_protocol::DraftId;
///
/// let store = MemoryStore::new();
/// assert!(!store.exists(&DraftId::new("42")).unwrap());
/// ```
pub trait SessionStore: Send + Sync + 'static {
    /// Returns the record for `id`, or `None` if there is none.
    fn get(&self, id: &DraftId) -> Result<Option<Draft>, StoreError>;

    /// Inserts or replaces the record under `draft.id`.
    fn put(&self, draft: &Draft) -> Result<(), StoreError>;

    /// Whether a record exists for `id`.
    fn exists(&self, id: &DraftId) -> Result<bool, StoreError>;
}

/// Draws random draft ids until one is not taken in `store`.
pub fn unique_id<R: Rng + ?Sized>(
    store: &dyn SessionStore,
    rng: &mut R,
) -> Result<DraftId, StoreError> {
    for _ in 0..ID_ATTEMPTS {
        let id = Draft::random_id(rng);
        if !store.exists(&id)? {
            return Ok(id);
        }
        tracing::debug!(draft_id = %id, "draft id collision, retrying");
    }
    Err(StoreError::IdsExhausted)
}
