//! Repository for `artifact_trigger_refs` — the index of which artifacts'
//! workflow triggers reference which user/group principals.
//!
//! The fan-out handlers use it to find artifacts affected by principal and
//! workflow definition changes, and to rebuild the index when those
//! definitions move underneath an artifact.

use sqlx::PgPool;
use stateline_core::types::DbId;

/// Principal kind column value for users.
const PRINCIPAL_USER: &str = "user";

/// Principal kind column value for groups.
const PRINCIPAL_GROUP: &str = "group";

/// Provides affected-artifact queries and index maintenance.
pub struct TriggerRefRepo;

impl TriggerRefRepo {
    /// Artifacts whose triggers reference any of the given users or groups.
    pub async fn artifacts_referencing_principals(
        pool: &PgPool,
        user_ids: &[DbId],
        group_ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT DISTINCT artifact_id FROM artifact_trigger_refs \
             WHERE (principal_kind = $1 AND principal_id = ANY($2)) \
                OR (principal_kind = $3 AND principal_id = ANY($4)) \
             ORDER BY artifact_id",
        )
        .bind(PRINCIPAL_USER)
        .bind(user_ids)
        .bind(PRINCIPAL_GROUP)
        .bind(group_ids)
        .fetch_all(pool)
        .await
    }

    /// Artifacts attached to the given workflow.
    pub async fn artifacts_using_workflow(
        pool: &PgPool,
        workflow_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM artifacts WHERE workflow_id = $1 ORDER BY id",
        )
        .bind(workflow_id)
        .fetch_all(pool)
        .await
    }

    /// Rebuild the trigger reference index for one artifact from its
    /// workflow's current trigger principals.
    pub async fn rebuild_for_artifact(
        pool: &PgPool,
        artifact_id: DbId,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM artifact_trigger_refs WHERE artifact_id = $1")
            .bind(artifact_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO artifact_trigger_refs (artifact_id, principal_kind, principal_id) \
             SELECT a.id, p.principal_kind, p.principal_id \
             FROM artifacts a \
             JOIN workflow_trigger_principals p ON p.workflow_id = a.workflow_id \
             WHERE a.id = $1",
        )
        .bind(artifact_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }
}
