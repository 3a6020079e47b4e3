//! Workflow transition and trigger row models.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use stateline_core::types::DbId;
use stateline_core::workflow::{TriggerAction, TriggerCondition};

/// A `workflow_transitions` row joined with its endpoint state names.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TransitionRow {
    pub id: DbId,
    pub workflow_id: DbId,
    pub name: String,
    pub from_state_id: DbId,
    pub from_state_name: String,
    pub to_state_id: DbId,
    pub to_state_name: String,
}

/// A `workflow_triggers` row. `position` is the declared execution order
/// within the transition.
#[derive(Debug, Clone, FromRow)]
pub struct TriggerRow {
    pub id: DbId,
    pub transition_id: DbId,
    pub position: i32,
    pub name: String,
    pub action: Json<TriggerAction>,
    pub condition: Option<Json<TriggerCondition>>,
}
