//! Property-change handler: re-evaluates workflow trigger references for
//! each artifact in the batch.
//!
//! This is the terminal half of every fan-out: the users/groups, workflow,
//! and state-change handlers all converge on batched property-change
//! messages, and this handler does the per-artifact index rebuild.

use std::sync::Arc;

use async_trait::async_trait;

use stateline_core::messages::{ActionMessage, ActionPayload};

use crate::registry::{ActionHandler, HandlerOutcome};
use crate::stores::TenantStore;
use crate::tenants::Tenant;

pub struct PropertyChangeHandler {
    store: Arc<dyn TenantStore>,
}

impl PropertyChangeHandler {
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ActionHandler for PropertyChangeHandler {
    async fn handle(&self, tenant: &Tenant, message: &ActionMessage) -> HandlerOutcome {
        let ActionPayload::PropertyChange(payload) = &message.payload else {
            return HandlerOutcome::PermanentFailure(
                "Payload does not match the property_change action type".to_string(),
            );
        };

        for &artifact_id in &payload.artifact_ids {
            if let Err(e) = self.store.rebuild_trigger_refs(tenant, artifact_id).await {
                return HandlerOutcome::TransientFailure(format!(
                    "Failed to rebuild trigger references for artifact {artifact_id}: {e}"
                ));
            }
        }

        tracing::debug!(
            message_id = %message.message_id,
            artifacts = payload.artifact_ids.len(),
            "Trigger references rebuilt"
        );
        HandlerOutcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{test_tenant, FakeTenantStore};
    use assert_matches::assert_matches;
    use stateline_core::messages::{NotificationPayload, PropertyChangePayload};

    fn message(ids: Vec<i64>) -> ActionMessage {
        ActionMessage::new(
            "acme",
            ActionPayload::PropertyChange(PropertyChangePayload { artifact_ids: ids }),
        )
    }

    #[tokio::test]
    async fn rebuilds_references_for_every_artifact_in_order() {
        let store = Arc::new(FakeTenantStore::default());
        let handler = PropertyChangeHandler::new(store.clone());

        let outcome = handler.handle(&test_tenant(), &message(vec![3, 1, 2])).await;

        assert_eq!(outcome, HandlerOutcome::Success);
        assert_eq!(*store.rebuilt.lock().unwrap(), vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn empty_batch_succeeds_without_touching_the_store() {
        let store = Arc::new(FakeTenantStore {
            fail: true,
            ..FakeTenantStore::default()
        });
        let handler = PropertyChangeHandler::new(store);

        let outcome = handler.handle(&test_tenant(), &message(vec![])).await;
        assert_eq!(outcome, HandlerOutcome::Success);
    }

    #[tokio::test]
    async fn store_failure_is_transient() {
        let store = Arc::new(FakeTenantStore {
            fail: true,
            ..FakeTenantStore::default()
        });
        let handler = PropertyChangeHandler::new(store);

        let outcome = handler.handle(&test_tenant(), &message(vec![7])).await;
        assert_matches!(outcome, HandlerOutcome::TransientFailure(_));
    }

    #[tokio::test]
    async fn mismatched_payload_fails_permanently() {
        let handler = PropertyChangeHandler::new(Arc::new(FakeTenantStore::default()));
        let wrong = ActionMessage::new(
            "acme",
            ActionPayload::Notification(NotificationPayload {
                recipients: vec![],
                subject: None,
                body: None,
            }),
        );

        let outcome = handler.handle(&test_tenant(), &wrong).await;
        assert_matches!(outcome, HandlerOutcome::PermanentFailure(_));
    }
}
