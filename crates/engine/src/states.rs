//! State and transition resolution with permission enforcement.

use stateline_core::error::CoreError;
use stateline_core::types::DbId;
use stateline_core::workflow::{WorkflowEventTrigger, WorkflowState, WorkflowTransition};
use stateline_db::models::artifact::{ArtifactBasicDetails, PERM_VIEW};
use stateline_db::models::status::ArtifactKind;
use stateline_db::repositories::{ArtifactRepo, WorkflowRepo};
use stateline_db::DbPool;

use crate::error::{EngineError, EngineResult};

/// Resolves current workflow states and legal transitions for artifacts.
pub struct StateRepository {
    pool: DbPool,
}

impl StateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Resolve the artifact's workflow state at or before `revision_id`.
    ///
    /// Fails `NotFound` if the artifact does not exist, its stored revision
    /// exceeds the requested one (the revision must already exist for the
    /// requester), or no state row resolves. Fails `Forbidden` without read
    /// permission and `Unsupported` for non-workflow-bearing artifact kinds.
    pub async fn get_current_state(
        &self,
        user_id: DbId,
        artifact_id: DbId,
        revision_id: DbId,
        include_drafts: bool,
    ) -> EngineResult<WorkflowState> {
        let details = ArtifactRepo::get_basic_details(&self.pool, artifact_id, user_id).await?;
        check_visibility(details.as_ref(), artifact_id, revision_id, PERM_VIEW)?;

        let row =
            ArtifactRepo::get_state_at_revision(&self.pool, artifact_id, revision_id, include_drafts)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "artifact state",
                    id: artifact_id,
                })?;

        Ok(WorkflowState {
            id: row.state_id,
            workflow_id: row.workflow_id,
            name: row.state_name,
        })
    }

    /// List transitions leaving `state_id`, each with its ordered trigger
    /// list.
    ///
    /// `user_id` identifies the requester for tracing; edit permission on
    /// the artifact is the caller's responsibility, since workflow
    /// definitions carry no per-user data.
    pub async fn get_available_transitions(
        &self,
        user_id: DbId,
        workflow_id: DbId,
        state_id: DbId,
    ) -> EngineResult<Vec<WorkflowTransition>> {
        tracing::debug!(user_id, workflow_id, state_id, "Listing available transitions");
        let rows = WorkflowRepo::list_transitions_from(&self.pool, workflow_id, state_id).await?;

        let mut transitions = Vec::with_capacity(rows.len());
        for row in rows {
            let trigger_rows = WorkflowRepo::list_triggers(&self.pool, row.id).await?;
            let triggers = trigger_rows
                .into_iter()
                .map(|t| WorkflowEventTrigger {
                    name: t.name,
                    action: t.action.0,
                    condition: t.condition.map(|c| c.0),
                })
                .collect();

            transitions.push(WorkflowTransition {
                id: row.id,
                workflow_id: row.workflow_id,
                name: row.name,
                from_state: WorkflowState {
                    id: row.from_state_id,
                    workflow_id: row.workflow_id,
                    name: row.from_state_name,
                },
                to_state: WorkflowState {
                    id: row.to_state_id,
                    workflow_id: row.workflow_id,
                    name: row.to_state_name,
                },
                triggers,
            });
        }

        Ok(transitions)
    }
}

/// Shared visibility/permission check for artifact lookups.
///
/// `None` details, or a stored revision newer than the requested one, are
/// both reported as not-found so a transition is never computed against a
/// revision that did not yet exist for the requester.
pub(crate) fn check_visibility(
    details: Option<&ArtifactBasicDetails>,
    artifact_id: DbId,
    revision_id: DbId,
    required_flag: i32,
) -> Result<(), EngineError> {
    let details = details.ok_or(CoreError::NotFound {
        entity: "artifact",
        id: artifact_id,
    })?;

    if details.revision_id > revision_id {
        return Err(CoreError::NotFound {
            entity: "artifact",
            id: artifact_id,
        }
        .into());
    }

    if !details.has_permission(required_flag) {
        return Err(CoreError::Forbidden(format!(
            "user lacks permission on artifact {artifact_id}"
        ))
        .into());
    }

    if details.kind() != Some(ArtifactKind::Regular) {
        return Err(CoreError::Unsupported(format!(
            "artifact {artifact_id} is not a workflow-bearing artifact type"
        ))
        .into());
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
