//! Generation handlers: one handler instance per generate-* action type,
//! each submitting a background job of its own job type.
//!
//! Job execution is not this system's concern; a separate job runner picks
//! pending jobs up. The handler only creates the job record.

use async_trait::async_trait;

use stateline_core::messages::{ActionMessage, ActionPayload, ActionType, GeneratePayload};
use stateline_db::models::job::SubmitJob;
use stateline_db::repositories::{JobRepo, UserRepo};

use crate::registry::{ActionHandler, HandlerOutcome};
use crate::tenants::Tenant;

/// Job type for descendant-artifact generation.
pub const JOB_TYPE_GENERATE_DESCENDANTS: &str = "generate_descendants";
/// Job type for user-story generation.
pub const JOB_TYPE_GENERATE_USER_STORIES: &str = "generate_user_stories";
/// Job type for test generation.
pub const JOB_TYPE_GENERATE_TESTS: &str = "generate_tests";

/// Submits a background generation job for the message's artifact.
///
/// Requires an acting user on the message; generation jobs are always
/// attributed to the user whose transition triggered them.
pub struct GenerateJobHandler {
    expected: ActionType,
    job_type: &'static str,
}

impl GenerateJobHandler {
    pub fn descendants() -> Self {
        Self {
            expected: ActionType::GenerateDescendants,
            job_type: JOB_TYPE_GENERATE_DESCENDANTS,
        }
    }

    pub fn user_stories() -> Self {
        Self {
            expected: ActionType::GenerateUserStories,
            job_type: JOB_TYPE_GENERATE_USER_STORIES,
        }
    }

    pub fn tests() -> Self {
        Self {
            expected: ActionType::GenerateTests,
            job_type: JOB_TYPE_GENERATE_TESTS,
        }
    }

    fn payload<'a>(&self, message: &'a ActionMessage) -> Option<&'a GeneratePayload> {
        match (&message.payload, self.expected) {
            (ActionPayload::GenerateDescendants(p), ActionType::GenerateDescendants) => Some(p),
            (ActionPayload::GenerateUserStories(p), ActionType::GenerateUserStories) => Some(p),
            (ActionPayload::GenerateTests(p), ActionType::GenerateTests) => Some(p),
            _ => None,
        }
    }
}

#[async_trait]
impl ActionHandler for GenerateJobHandler {
    async fn handle(&self, tenant: &Tenant, message: &ActionMessage) -> HandlerOutcome {
        let Some(payload) = self.payload(message) else {
            return HandlerOutcome::PermanentFailure(format!(
                "Payload does not match the {} action type",
                self.expected
            ));
        };

        let Some(user_id) = message.user_id else {
            return HandlerOutcome::PermanentFailure(
                "Generation message has no acting user".to_string(),
            );
        };

        let user = match UserRepo::find_active(&tenant.pool, user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return HandlerOutcome::PermanentFailure(format!(
                    "Acting user {user_id} is unknown or inactive"
                ));
            }
            Err(e) => {
                return HandlerOutcome::TransientFailure(format!("Failed to load user: {e}"));
            }
        };

        let input = SubmitJob {
            job_type: self.job_type.to_string(),
            parameters: serde_json::json!({
                "artifact_id": payload.artifact_id,
                "template_id": payload.template_id,
                "revision_id": message.revision_id,
            }),
        };

        match JobRepo::submit(&tenant.pool, &tenant.info.tenant_id, user.id, &input).await {
            Ok(Some(job_id)) => {
                tracing::info!(
                    message_id = %message.message_id,
                    job_id,
                    job_type = self.job_type,
                    artifact_id = payload.artifact_id,
                    "Generation job submitted"
                );
                HandlerOutcome::Success
            }
            Ok(None) => HandlerOutcome::PermanentFailure(format!(
                "Submitting a {} job produced no job id",
                self.job_type
            )),
            Err(e) => HandlerOutcome::TransientFailure(format!("Failed to submit job: {e}")),
        }
    }
}
