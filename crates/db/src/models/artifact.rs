//! Artifact row models.

use serde::Serialize;
use sqlx::FromRow;
use stateline_core::types::DbId;

use super::status::{ArtifactKind, StatusId};

/// Permission bitmask flag: read access.
pub const PERM_VIEW: i32 = 1;

/// Permission bitmask flag: edit access (required to transition).
pub const PERM_EDIT: i32 = 2;

/// Basic artifact details used for permission and visibility checks.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ArtifactBasicDetails {
    pub id: DbId,
    /// Revision at which this artifact was last written.
    pub revision_id: DbId,
    /// Permission bitmask for the requesting user ([`PERM_VIEW`] | [`PERM_EDIT`]).
    pub permissions: i32,
    /// Primitive kind id; see [`ArtifactKind`].
    pub kind_id: StatusId,
}

impl ArtifactBasicDetails {
    /// The primitive kind, if the stored id is known.
    pub fn kind(&self) -> Option<ArtifactKind> {
        ArtifactKind::from_id(self.kind_id)
    }

    /// Whether the permission bitmask carries the given flag.
    pub fn has_permission(&self, flag: i32) -> bool {
        self.permissions & flag != 0
    }
}

/// Current workflow state resolved for an artifact revision.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ArtifactStateRow {
    pub artifact_id: DbId,
    pub revision_id: DbId,
    pub state_id: DbId,
    pub state_name: String,
    pub workflow_id: DbId,
    pub is_draft: bool,
}
