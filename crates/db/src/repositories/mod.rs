//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or `&mut PgConnection` when they must join a caller's
//! transaction) as the first argument.

pub mod artifact_repo;
pub mod email_settings_repo;
pub mod job_repo;
pub mod queue_repo;
pub mod tenant_repo;
pub mod trigger_ref_repo;
pub mod user_repo;
pub mod workflow_repo;

pub use artifact_repo::ArtifactRepo;
pub use email_settings_repo::EmailSettingsRepo;
pub use job_repo::JobRepo;
pub use queue_repo::QueueRepo;
pub use tenant_repo::TenantRepo;
pub use trigger_ref_repo::TriggerRefRepo;
pub use user_repo::UserRepo;
pub use workflow_repo::WorkflowRepo;
