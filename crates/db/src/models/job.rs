//! Background job row models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stateline_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub job_type: String,
    pub status_id: StatusId,
    pub tenant_id: String,
    pub submitted_by: DbId,
    pub parameters: serde_json::Value,
    pub error_message: Option<String>,
    pub submitted_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for submitting a new background job.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitJob {
    pub job_type: String,
    pub parameters: serde_json::Value,
}
