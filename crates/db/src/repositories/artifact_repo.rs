//! Repository for the `artifacts` and `artifact_states` tables.

use sqlx::{PgConnection, PgPool};
use stateline_core::types::DbId;

use crate::models::artifact::{ArtifactBasicDetails, ArtifactStateRow};

/// Column list for artifact state queries.
const STATE_COLUMNS: &str = "\
    s.artifact_id, s.revision_id, s.state_id, ws.name AS state_name, \
    ws.workflow_id, s.is_draft";

/// Provides read and transactional write operations for artifacts.
pub struct ArtifactRepo;

impl ArtifactRepo {
    /// Fetch basic artifact details with the requesting user's permission
    /// bitmask. Returns `None` if the artifact does not exist.
    pub async fn get_basic_details(
        pool: &PgPool,
        artifact_id: DbId,
        user_id: DbId,
    ) -> Result<Option<ArtifactBasicDetails>, sqlx::Error> {
        sqlx::query_as::<_, ArtifactBasicDetails>(
            "SELECT a.id, a.revision_id, COALESCE(p.permissions, 0) AS permissions, a.kind_id \
             FROM artifacts a \
             LEFT JOIN artifact_permissions p \
               ON p.artifact_id = a.id AND p.user_id = $2 \
             WHERE a.id = $1",
        )
        .bind(artifact_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Resolve the artifact's workflow state at or before `revision_id`.
    ///
    /// When `include_drafts` is false, draft state rows are skipped and the
    /// latest committed state wins.
    pub async fn get_state_at_revision(
        pool: &PgPool,
        artifact_id: DbId,
        revision_id: DbId,
        include_drafts: bool,
    ) -> Result<Option<ArtifactStateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {STATE_COLUMNS} \
             FROM artifact_states s \
             JOIN workflow_states ws ON ws.id = s.state_id \
             WHERE s.artifact_id = $1 \
               AND s.revision_id <= $2 \
               AND ($3 OR NOT s.is_draft) \
             ORDER BY s.revision_id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, ArtifactStateRow>(&query)
            .bind(artifact_id)
            .bind(revision_id)
            .bind(include_drafts)
            .fetch_optional(pool)
            .await
    }

    /// Write the artifact's new state row and bump its revision.
    ///
    /// Runs on the caller's connection so it commits (or rolls back) together
    /// with the synchronous trigger effects.
    pub async fn set_state(
        conn: &mut PgConnection,
        artifact_id: DbId,
        state_id: DbId,
        revision_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO artifact_states (artifact_id, revision_id, state_id, is_draft) \
             VALUES ($1, $2, $3, FALSE)",
        )
        .bind(artifact_id)
        .bind(revision_id)
        .bind(state_id)
        .execute(&mut *conn)
        .await?;

        sqlx::query("UPDATE artifacts SET revision_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(artifact_id)
            .bind(revision_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Set one property on the artifact's draft property document.
    ///
    /// Returns `RowNotFound` if the artifact does not exist.
    pub async fn update_property(
        conn: &mut PgConnection,
        artifact_id: DbId,
        property: &str,
        value: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            "UPDATE artifacts \
             SET properties = jsonb_set(properties, ARRAY[$2], $3, TRUE), \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(artifact_id)
        .bind(property)
        .bind(value)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    /// Artifacts linked downstream of the given artifact (targets of its
    /// outgoing links). Used by the state-change fan-out handler.
    pub async fn list_linked_ids(
        pool: &PgPool,
        artifact_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT to_artifact_id FROM artifact_links \
             WHERE from_artifact_id = $1 \
             ORDER BY to_artifact_id",
        )
        .bind(artifact_id)
        .fetch_all(pool)
        .await
    }

    /// Apply a state change to a batch of artifacts, bumping each revision.
    ///
    /// Used by the state-change fan-out handler; batches are bounded by the
    /// fan-out batch size, which bounds this statement's scope.
    pub async fn apply_state_bulk(
        pool: &PgPool,
        artifact_ids: &[DbId],
        state_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "WITH bumped AS ( \
                 UPDATE artifacts \
                 SET revision_id = revision_id + 1, updated_at = NOW() \
                 WHERE id = ANY($1) \
                 RETURNING id, revision_id \
             ) \
             INSERT INTO artifact_states (artifact_id, revision_id, state_id, is_draft) \
             SELECT id, revision_id, $2, FALSE FROM bumped",
        )
        .bind(artifact_ids)
        .bind(state_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
