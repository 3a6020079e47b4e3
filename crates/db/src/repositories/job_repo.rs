//! Repository for the `jobs` table.
//!
//! The generate-* handlers create background job records here; job
//! execution itself belongs to a separate job runner outside this system.

use sqlx::PgPool;
use stateline_core::types::DbId;

use crate::models::job::{Job, SubmitJob};
use crate::models::status::JobStatus;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, job_type, status_id, tenant_id, submitted_by, parameters, \
    error_message, submitted_at, completed_at, created_at, updated_at";

/// Provides create/read operations for background jobs.
pub struct JobRepo;

impl JobRepo {
    /// Create a new pending job. Returns the job id, or `None` when the
    /// insert produced no row (the caller's failure sentinel).
    pub async fn submit(
        pool: &PgPool,
        tenant_id: &str,
        user_id: DbId,
        input: &SubmitJob,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO jobs (job_type, status_id, tenant_id, submitted_by, parameters) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(&input.job_type)
        .bind(JobStatus::Pending.id())
        .bind(tenant_id)
        .bind(user_id)
        .bind(&input.parameters)
        .fetch_optional(pool)
        .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
