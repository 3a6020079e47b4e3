//! Action messages — the contract between the synchronous transition path
//! and the asynchronous worker handlers.
//!
//! An [`ActionMessage`] is immutable once constructed and safe to serialize
//! and redeliver. The queue stores `tenant_id` and the [`ActionType`]
//! discriminator as their own columns, so both are extractable without
//! deserializing the payload.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

/// Discriminator routing a message to exactly one handler type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    PropertyChange,
    Notification,
    GenerateDescendants,
    GenerateUserStories,
    GenerateTests,
    StateChange,
    UsersGroupsChanged,
    WorkflowsChanged,
}

impl ActionType {
    /// Stable string form used as the queue column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::PropertyChange => "property_change",
            ActionType::Notification => "notification",
            ActionType::GenerateDescendants => "generate_descendants",
            ActionType::GenerateUserStories => "generate_user_stories",
            ActionType::GenerateTests => "generate_tests",
            ActionType::StateChange => "state_change",
            ActionType::UsersGroupsChanged => "users_groups_changed",
            ActionType::WorkflowsChanged => "workflows_changed",
        }
    }

    /// Parse the queue column value back into a discriminator.
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "property_change" => ActionType::PropertyChange,
            "notification" => ActionType::Notification,
            "generate_descendants" => ActionType::GenerateDescendants,
            "generate_user_stories" => ActionType::GenerateUserStories,
            "generate_tests" => ActionType::GenerateTests,
            "state_change" => ActionType::StateChange,
            "users_groups_changed" => ActionType::UsersGroupsChanged,
            "workflows_changed" => ActionType::WorkflowsChanged,
            _ => return None,
        })
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Kind of change to a user or group principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

/// Re-evaluate workflow trigger references for a batch of artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyChangePayload {
    pub artifact_ids: Vec<DbId>,
}

/// Send a notification email. Missing fields render as empty strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub recipients: Vec<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Create a background generation job for one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratePayload {
    pub artifact_id: DbId,
    #[serde(default)]
    pub template_id: Option<DbId>,
}

/// Propagate a state change to artifacts linked to the source artifact.
///
/// An empty `artifact_ids` marks the originating event; the handler queries
/// the affected artifacts and re-emits batched messages with the list filled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChangePayload {
    pub source_artifact_id: DbId,
    pub new_state_id: DbId,
    #[serde(default)]
    pub artifact_ids: Vec<DbId>,
}

/// Users or groups referenced by workflow triggers were changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersGroupsChangedPayload {
    pub change_type: ChangeType,
    #[serde(default)]
    pub user_ids: Vec<DbId>,
    #[serde(default)]
    pub group_ids: Vec<DbId>,
}

/// A workflow definition was changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowsChangedPayload {
    pub workflow_id: DbId,
}

/// Tagged payload union. The tag duplicates the queue's `action_type`
/// column so a payload blob is self-describing on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action_type", rename_all = "snake_case")]
pub enum ActionPayload {
    PropertyChange(PropertyChangePayload),
    Notification(NotificationPayload),
    GenerateDescendants(GeneratePayload),
    GenerateUserStories(GeneratePayload),
    GenerateTests(GeneratePayload),
    StateChange(StateChangePayload),
    UsersGroupsChanged(UsersGroupsChangedPayload),
    WorkflowsChanged(WorkflowsChangedPayload),
}

impl ActionPayload {
    /// The discriminator routing this payload to its handler.
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionPayload::PropertyChange(_) => ActionType::PropertyChange,
            ActionPayload::Notification(_) => ActionType::Notification,
            ActionPayload::GenerateDescendants(_) => ActionType::GenerateDescendants,
            ActionPayload::GenerateUserStories(_) => ActionType::GenerateUserStories,
            ActionPayload::GenerateTests(_) => ActionType::GenerateTests,
            ActionPayload::StateChange(_) => ActionType::StateChange,
            ActionPayload::UsersGroupsChanged(_) => ActionType::UsersGroupsChanged,
            ActionPayload::WorkflowsChanged(_) => ActionType::WorkflowsChanged,
        }
    }
}

// ---------------------------------------------------------------------------
// ActionMessage
// ---------------------------------------------------------------------------

/// An immutable, serializable unit of work carrying a discriminated action
/// plus tenant and payload data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionMessage {
    /// Unique id for log correlation across redeliveries.
    pub message_id: Uuid,

    /// The tenant the message must execute against.
    pub tenant_id: String,

    /// Acting user, when the originating operation had one.
    pub user_id: Option<DbId>,

    /// Artifact revision the originating operation ran at.
    pub revision_id: Option<DbId>,

    /// Typed action payload.
    pub payload: ActionPayload,

    /// When the message was constructed (UTC).
    pub created_at: Timestamp,
}

impl ActionMessage {
    /// Create a new message with only the required tenant and payload.
    pub fn new(tenant_id: impl Into<String>, payload: ActionPayload) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            user_id: None,
            revision_id: None,
            payload,
            created_at: chrono::Utc::now(),
        }
    }

    /// Attach the acting user.
    pub fn with_user(mut self, user_id: DbId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Attach the originating revision.
    pub fn with_revision(mut self, revision_id: DbId) -> Self {
        self.revision_id = Some(revision_id);
        self
    }

    /// The discriminator routing this message to its handler.
    pub fn action_type(&self) -> ActionType {
        self.payload.action_type()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_type_string_form_round_trips() {
        let all = [
            ActionType::PropertyChange,
            ActionType::Notification,
            ActionType::GenerateDescendants,
            ActionType::GenerateUserStories,
            ActionType::GenerateTests,
            ActionType::StateChange,
            ActionType::UsersGroupsChanged,
            ActionType::WorkflowsChanged,
        ];
        for action_type in all {
            assert_eq!(ActionType::parse(action_type.as_str()), Some(action_type));
        }
        assert_eq!(ActionType::parse("no_such_type"), None);
    }

    #[test]
    fn payload_tag_matches_discriminator_column() {
        let payload = ActionPayload::UsersGroupsChanged(UsersGroupsChangedPayload {
            change_type: ChangeType::Delete,
            user_ids: vec![4],
            group_ids: vec![],
        });
        let encoded = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(encoded["action_type"], payload.action_type().as_str());
    }

    #[test]
    fn message_builder_fills_metadata() {
        let message = ActionMessage::new(
            "acme",
            ActionPayload::WorkflowsChanged(WorkflowsChangedPayload { workflow_id: 9 }),
        )
        .with_user(3)
        .with_revision(120);

        assert_eq!(message.tenant_id, "acme");
        assert_eq!(message.user_id, Some(3));
        assert_eq!(message.revision_id, Some(120));
        assert_eq!(message.action_type(), ActionType::WorkflowsChanged);
    }

    #[test]
    fn notification_payload_tolerates_missing_optional_fields() {
        let decoded: NotificationPayload =
            serde_json::from_str(r#"{"recipients": ["a@x.com"]}"#).expect("deserialize");
        assert!(decoded.subject.is_none());
        assert!(decoded.body.is_none());
    }
}
