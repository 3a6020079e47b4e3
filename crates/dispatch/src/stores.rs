//! Storage seams for the action handlers.
//!
//! Handlers reach the tenant database and the outbound queue through these
//! traits so tests can substitute recording fakes. The production
//! implementations delegate straight to the repository layer.

use async_trait::async_trait;

use stateline_core::messages::ActionMessage;
use stateline_core::types::DbId;
use stateline_db::repositories::{ArtifactRepo, QueueRepo, TriggerRefRepo};
use stateline_db::DbPool;

use crate::tenants::Tenant;

/// Queries and bounded writes against a tenant's database.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Artifacts linked downstream of the given artifact.
    async fn linked_artifacts(
        &self,
        tenant: &Tenant,
        artifact_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error>;

    /// Apply a state change to a batch of artifacts.
    async fn apply_state(
        &self,
        tenant: &Tenant,
        artifact_ids: &[DbId],
        state_id: DbId,
    ) -> Result<u64, sqlx::Error>;

    /// Artifacts whose triggers reference any of the given users or groups.
    async fn artifacts_referencing_principals(
        &self,
        tenant: &Tenant,
        user_ids: &[DbId],
        group_ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error>;

    /// Artifacts attached to the given workflow.
    async fn artifacts_using_workflow(
        &self,
        tenant: &Tenant,
        workflow_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error>;

    /// Rebuild one artifact's trigger reference index.
    async fn rebuild_trigger_refs(
        &self,
        tenant: &Tenant,
        artifact_id: DbId,
    ) -> Result<(), sqlx::Error>;
}

/// Production [`TenantStore`] delegating to the repositories over the
/// tenant's pool.
pub struct PgTenantStore;

#[async_trait]
impl TenantStore for PgTenantStore {
    async fn linked_artifacts(
        &self,
        tenant: &Tenant,
        artifact_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        ArtifactRepo::list_linked_ids(&tenant.pool, artifact_id).await
    }

    async fn apply_state(
        &self,
        tenant: &Tenant,
        artifact_ids: &[DbId],
        state_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        ArtifactRepo::apply_state_bulk(&tenant.pool, artifact_ids, state_id).await
    }

    async fn artifacts_referencing_principals(
        &self,
        tenant: &Tenant,
        user_ids: &[DbId],
        group_ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        TriggerRefRepo::artifacts_referencing_principals(&tenant.pool, user_ids, group_ids).await
    }

    async fn artifacts_using_workflow(
        &self,
        tenant: &Tenant,
        workflow_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        TriggerRefRepo::artifacts_using_workflow(&tenant.pool, workflow_id).await
    }

    async fn rebuild_trigger_refs(
        &self,
        tenant: &Tenant,
        artifact_id: DbId,
    ) -> Result<(), sqlx::Error> {
        TriggerRefRepo::rebuild_for_artifact(&tenant.pool, artifact_id).await
    }
}

/// Outbound queue for follow-up messages emitted by fan-out handlers.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn enqueue(&self, message: &ActionMessage) -> Result<DbId, sqlx::Error>;
}

/// Production [`MessageSink`] writing to the control-database queue table.
pub struct QueueSink {
    pool: DbPool,
}

impl QueueSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageSink for QueueSink {
    async fn enqueue(&self, message: &ActionMessage) -> Result<DbId, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        QueueRepo::enqueue(&mut conn, message).await
    }
}
