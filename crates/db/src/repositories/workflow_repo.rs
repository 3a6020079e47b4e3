//! Repository for workflow transition and trigger definitions.

use sqlx::PgPool;
use stateline_core::types::DbId;

use crate::models::workflow::{TransitionRow, TriggerRow};

/// Column list for `workflow_triggers` queries.
const TRIGGER_COLUMNS: &str = "id, transition_id, position, name, action, condition";

/// Provides read access to persisted workflow definitions.
pub struct WorkflowRepo;

impl WorkflowRepo {
    /// List transitions leaving `state_id` within `workflow_id`.
    pub async fn list_transitions_from(
        pool: &PgPool,
        workflow_id: DbId,
        state_id: DbId,
    ) -> Result<Vec<TransitionRow>, sqlx::Error> {
        sqlx::query_as::<_, TransitionRow>(
            "SELECT t.id, t.workflow_id, t.name, \
                    t.from_state_id, fs.name AS from_state_name, \
                    t.to_state_id, ts.name AS to_state_name \
             FROM workflow_transitions t \
             JOIN workflow_states fs ON fs.id = t.from_state_id \
             JOIN workflow_states ts ON ts.id = t.to_state_id \
             WHERE t.workflow_id = $1 AND t.from_state_id = $2 \
             ORDER BY t.id",
        )
        .bind(workflow_id)
        .bind(state_id)
        .fetch_all(pool)
        .await
    }

    /// List a transition's triggers in declared execution order.
    pub async fn list_triggers(
        pool: &PgPool,
        transition_id: DbId,
    ) -> Result<Vec<TriggerRow>, sqlx::Error> {
        let query = format!(
            "SELECT {TRIGGER_COLUMNS} FROM workflow_triggers \
             WHERE transition_id = $1 \
             ORDER BY position ASC"
        );
        sqlx::query_as::<_, TriggerRow>(&query)
            .bind(transition_id)
            .fetch_all(pool)
            .await
    }
}
