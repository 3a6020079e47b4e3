//! Notification handler: sends one email per recipient via the tenant's
//! configured SMTP relay.

use async_trait::async_trait;

use stateline_core::messages::{ActionMessage, ActionPayload};
use stateline_db::repositories::EmailSettingsRepo;

use crate::email::{EmailDelivery, TenantEmailConfig};
use crate::registry::{ActionHandler, HandlerOutcome};
use crate::tenants::Tenant;

/// Handles [`ActionType::Notification`](stateline_core::messages::ActionType)
/// messages.
pub struct NotificationHandler;

#[async_trait]
impl ActionHandler for NotificationHandler {
    async fn handle(&self, tenant: &Tenant, message: &ActionMessage) -> HandlerOutcome {
        let ActionPayload::Notification(payload) = &message.payload else {
            return HandlerOutcome::PermanentFailure(
                "Payload does not match the notification action type".to_string(),
            );
        };

        if payload.recipients.is_empty() {
            tracing::debug!(message_id = %message.message_id, "Notification has no recipients");
            return HandlerOutcome::Success;
        }

        let settings = match EmailSettingsRepo::find(&tenant.pool, &tenant.info.tenant_id).await {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                return HandlerOutcome::PermanentFailure(format!(
                    "Tenant '{}' has no email settings",
                    tenant.info.tenant_id
                ));
            }
            Err(e) => {
                return HandlerOutcome::TransientFailure(format!(
                    "Failed to load email settings: {e}"
                ));
            }
        };

        let Some(config) = TenantEmailConfig::from_settings(&settings) else {
            return HandlerOutcome::PermanentFailure(format!(
                "Tenant '{}' has no SMTP host configured",
                tenant.info.tenant_id
            ));
        };

        let delivery = EmailDelivery::new(config);
        let subject = payload.subject.as_deref().unwrap_or_default();
        let body = payload.body.as_deref().unwrap_or_default();

        for recipient in &payload.recipients {
            if let Err(e) = delivery.send(recipient, subject, body).await {
                return HandlerOutcome::TransientFailure(format!(
                    "Failed to send notification to {recipient}: {e}"
                ));
            }
        }

        tracing::info!(
            message_id = %message.message_id,
            recipients = payload.recipients.len(),
            "Notification delivered"
        );
        HandlerOutcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::test_tenant;
    use assert_matches::assert_matches;
    use stateline_core::messages::{NotificationPayload, PropertyChangePayload};

    #[tokio::test]
    async fn mismatched_payload_fails_permanently() {
        let message = ActionMessage::new(
            "acme",
            ActionPayload::PropertyChange(PropertyChangePayload { artifact_ids: vec![1] }),
        );
        let outcome = NotificationHandler.handle(&test_tenant(), &message).await;
        assert_matches!(outcome, HandlerOutcome::PermanentFailure(_));
    }

    #[tokio::test]
    async fn empty_recipient_list_is_a_no_op_success() {
        let message = ActionMessage::new(
            "acme",
            ActionPayload::Notification(NotificationPayload {
                recipients: vec![],
                subject: Some("State changed".to_string()),
                body: None,
            }),
        );
        let outcome = NotificationHandler.handle(&test_tenant(), &message).await;
        assert_eq!(outcome, HandlerOutcome::Success);
    }
}
