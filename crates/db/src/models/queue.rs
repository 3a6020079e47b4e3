//! Durable queue row model for `action_messages`.

use serde::Serialize;
use sqlx::FromRow;
use stateline_core::messages::{ActionMessage, ActionPayload};
use stateline_core::types::{DbId, Timestamp};
use uuid::Uuid;

use super::status::StatusId;

/// A row from the `action_messages` queue table.
///
/// `tenant_id` and `action_type` are stored as their own columns so the
/// dispatcher can extract both before deserializing `payload`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueMessage {
    pub id: DbId,
    pub message_id: Uuid,
    pub tenant_id: String,
    pub action_type: String,
    pub user_id: Option<DbId>,
    pub revision_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub status_id: StatusId,
    /// Number of times a dispatcher has claimed this message.
    pub attempts: i32,
    /// Earliest time the message may be claimed (retry backoff).
    pub visible_at: Timestamp,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl QueueMessage {
    /// Reconstruct the typed [`ActionMessage`] from this row.
    pub fn decode(&self) -> Result<ActionMessage, serde_json::Error> {
        let payload: ActionPayload = serde_json::from_value(self.payload.clone())?;
        Ok(ActionMessage {
            message_id: self.message_id,
            tenant_id: self.tenant_id.clone(),
            user_id: self.user_id,
            revision_id: self.revision_id,
            payload,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::status::MessageStatus;
    use stateline_core::messages::{ActionType, NotificationPayload};

    #[test]
    fn decode_rebuilds_the_typed_message() {
        let payload = ActionPayload::Notification(NotificationPayload {
            recipients: vec!["a@x.com".to_string()],
            subject: Some("Moved".to_string()),
            body: None,
        });
        let row = QueueMessage {
            id: 1,
            message_id: Uuid::new_v4(),
            tenant_id: "acme".to_string(),
            action_type: ActionType::Notification.as_str().to_string(),
            user_id: Some(7),
            revision_id: Some(42),
            payload: serde_json::to_value(&payload).expect("serialize"),
            status_id: MessageStatus::Pending.id(),
            attempts: 0,
            visible_at: chrono::Utc::now(),
            last_error: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let message = row.decode().expect("decode");
        assert_eq!(message.tenant_id, "acme");
        assert_eq!(message.action_type(), ActionType::Notification);
        assert_eq!(message.user_id, Some(7));
    }

    #[test]
    fn decode_rejects_malformed_payload() {
        let row = QueueMessage {
            id: 1,
            message_id: Uuid::new_v4(),
            tenant_id: "acme".to_string(),
            action_type: "notification".to_string(),
            user_id: None,
            revision_id: None,
            payload: serde_json::json!({"action_type": "no_such_type"}),
            status_id: MessageStatus::Pending.id(),
            attempts: 0,
            visible_at: chrono::Utc::now(),
            last_error: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        assert!(row.decode().is_err());
    }
}
