//! The artifact build pipeline boundary.
//!
//! When every tech tree is in, the room hands a [`BuildRequest`] to an
//! [`ArtifactBuilder`] and keeps serving events while it runs. The result
//! comes back to the room as a message: success completes the draft,
//! failure is recorded on it and can be retried.

use std::future::Future;

use civdraft_draft::{Draft, ROUND_TYPES};
use civdraft_protocol::{CardId, DraftId};
use serde::{Deserialize, Serialize};

/// Everything the pipeline needs to know about one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotBuild {
    pub alias: String,
    pub description: String,
    pub flag_palette: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_flag_data: Option<String>,
    pub architecture: u32,
    pub language: u32,
    pub wonder: u32,
    pub castle: u32,
    pub tree: Vec<Vec<u32>>,
    pub bonuses: [Vec<CardId>; ROUND_TYPES],
}

/// The finalized draft, as handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub draft_id: DraftId,
    pub slots: Vec<SlotBuild>,
}

impl BuildRequest {
    pub fn from_draft(draft: &Draft) -> Self {
        let slots = draft
            .players
            .iter()
            .map(|player| SlotBuild {
                alias: player.alias.clone(),
                description: player.description.clone(),
                flag_palette: player.flag_palette.clone(),
                custom_flag_data: player
                    .custom_flag
                    .then(|| player.custom_flag_data.clone()),
                architecture: player.architecture,
                language: player.language,
                wonder: player.wonder,
                castle: player.castle,
                tree: player.tree.clone(),
                bonuses: player.bonuses.clone(),
            })
            .collect();
        Self {
            draft_id: draft.id.clone(),
            slots,
        }
    }
}

/// Errors reported by an [`ArtifactBuilder`].
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("build I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode build request: {0}")]
    Encode(#[from] serde_json::Error),

    /// The pipeline ran but reported failure.
    #[error("build failed: {0}")]
    Failed(String),
}

/// Produces the downloadable artifact for a finished draft.
///
/// Returns the artifact's file name, which is stored on the draft.
///
/// # Why `impl Future` instead of `async fn`?
///
/// The room spawns the build on its own task, so the returned future has
/// to be `Send`. Spelling the return type out lets the trait promise that.
pub trait ArtifactBuilder: Send + Sync + 'static {
    fn build(
        &self,
        request: BuildRequest,
    ) -> impl Future<Output = Result<String, BuildError>> + Send;
}
