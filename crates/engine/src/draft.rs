//! Storage seam for synchronous trigger actions.
//!
//! Synchronous triggers mutate the draft artifact inside the state-change
//! transaction. [`DraftStore`] is the seam between the trigger engine and
//! that transaction: the production implementation is the open
//! `sqlx::Transaction` itself, and tests substitute an in-memory store.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::Postgres;
use stateline_core::types::DbId;
use stateline_db::repositories::ArtifactRepo;

/// Failure of a single trigger action. The message ends up in the
/// per-trigger error map returned to the caller.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TriggerActionError(pub String);

/// Mutable view of the draft artifact during the synchronous phase.
#[async_trait]
pub trait DraftStore: Send {
    /// Set one property on the draft artifact.
    async fn set_property(
        &mut self,
        artifact_id: DbId,
        property: &str,
        value: &Value,
    ) -> Result<(), TriggerActionError>;
}

#[async_trait]
impl DraftStore for sqlx::Transaction<'static, Postgres> {
    async fn set_property(
        &mut self,
        artifact_id: DbId,
        property: &str,
        value: &Value,
    ) -> Result<(), TriggerActionError> {
        ArtifactRepo::update_property(&mut **self, artifact_id, property, value)
            .await
            .map_err(|e| TriggerActionError(format!("property update failed: {e}")))
    }
}
