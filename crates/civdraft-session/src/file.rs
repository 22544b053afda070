//! File-backed store: one pretty-printed JSON file per draft.
//!
//! ```text
//! <root>/
//! └── drafts/
//!     ├── 381920475610293.json
//!     └── 774102938475610.json
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use civdraft_draft::Draft;
use civdraft_protocol::DraftId;

use crate::{SessionStore, StoreError};

/// Stores drafts under `<root>/drafts/<id>.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so
/// a crash mid-write never leaves a truncated record behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) the `drafts` directory under `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = root.as_ref().join("drafts");
        fs::create_dir_all(&dir)?;
        tracing::info!(dir = %dir.display(), "file store opened");
        Ok(Self { dir })
    }

    /// Directory holding the draft files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `id`. Ids that aren't plain digit strings
    /// are rejected so they can't escape the directory.
    fn path(&self, id: &DraftId) -> Result<PathBuf, StoreError> {
        if !id.is_well_formed() {
            return Err(StoreError::InvalidId(id.clone()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}

impl SessionStore for FileStore {
    fn get(&self, id: &DraftId) -> Result<Option<Draft>, StoreError> {
        // Nothing is ever stored under an id `put` would refuse.
        if !id.is_well_formed() {
            return Ok(None);
        }
        let path = self.path(id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, draft: &Draft) -> Result<(), StoreError> {
        let path = self.path(&draft.id)?;
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(draft)?;
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn exists(&self, id: &DraftId) -> Result<bool, StoreError> {
        if !id.is_well_formed() {
            return Ok(false);
        }
        let path = self.path(id)?;
        Ok(path.try_exists()?)
    }
}
