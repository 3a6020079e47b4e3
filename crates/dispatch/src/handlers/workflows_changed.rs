//! Workflows-changed handler: fans a workflow definition change out to
//! every artifact attached to that workflow as batched property-change
//! messages.

use std::sync::Arc;

use async_trait::async_trait;

use stateline_core::messages::{ActionMessage, ActionPayload};

use crate::handlers::enqueue_property_change_batches;
use crate::registry::{ActionHandler, HandlerOutcome};
use crate::stores::{MessageSink, TenantStore};
use crate::tenants::Tenant;

pub struct WorkflowsChangedHandler {
    store: Arc<dyn TenantStore>,
    sink: Arc<dyn MessageSink>,
    batch_size: usize,
}

impl WorkflowsChangedHandler {
    pub fn new(
        store: Arc<dyn TenantStore>,
        sink: Arc<dyn MessageSink>,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            sink,
            batch_size,
        }
    }
}

#[async_trait]
impl ActionHandler for WorkflowsChangedHandler {
    async fn handle(&self, tenant: &Tenant, message: &ActionMessage) -> HandlerOutcome {
        let ActionPayload::WorkflowsChanged(payload) = &message.payload else {
            return HandlerOutcome::PermanentFailure(
                "Payload does not match the workflows_changed action type".to_string(),
            );
        };

        let affected = match self
            .store
            .artifacts_using_workflow(tenant, payload.workflow_id)
            .await
        {
            Ok(affected) => affected,
            Err(e) => {
                return HandlerOutcome::TransientFailure(format!(
                    "Failed to resolve artifacts using workflow {}: {e}",
                    payload.workflow_id
                ));
            }
        };

        if affected.is_empty() {
            return HandlerOutcome::Success;
        }

        match enqueue_property_change_batches(&*self.sink, message, &affected, self.batch_size)
            .await
        {
            Ok(batches) => {
                tracing::info!(
                    message_id = %message.message_id,
                    workflow_id = payload.workflow_id,
                    artifacts = affected.len(),
                    batches,
                    "Workflow change fanned out"
                );
                HandlerOutcome::Success
            }
            Err(e) => HandlerOutcome::TransientFailure(format!(
                "Failed to enqueue property-change batch: {e}"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{test_tenant, FakeTenantStore, RecordingSink};
    use assert_matches::assert_matches;
    use stateline_core::messages::WorkflowsChangedPayload;

    fn message() -> ActionMessage {
        ActionMessage::new(
            "acme",
            ActionPayload::WorkflowsChanged(WorkflowsChangedPayload { workflow_id: 9 }),
        )
        .with_user(5)
    }

    #[tokio::test]
    async fn fans_out_batches_preserving_the_acting_user() {
        let store = Arc::new(FakeTenantStore {
            using_workflow: vec![10, 11, 12, 13, 14],
            ..FakeTenantStore::default()
        });
        let sink = Arc::new(RecordingSink::default());
        let handler = WorkflowsChangedHandler::new(store, sink.clone(), 2);

        let outcome = handler.handle(&test_tenant(), &message()).await;

        assert_eq!(outcome, HandlerOutcome::Success);
        let messages = sink.messages.lock().unwrap();
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.user_id == Some(5)));
        assert_matches!(
            &messages[2].payload,
            ActionPayload::PropertyChange(p) if p.artifact_ids == vec![14]
        );
    }

    #[tokio::test]
    async fn no_attached_artifacts_succeeds_quietly() {
        let sink = Arc::new(RecordingSink::default());
        let handler =
            WorkflowsChangedHandler::new(Arc::new(FakeTenantStore::default()), sink.clone(), 2);

        let outcome = handler.handle(&test_tenant(), &message()).await;
        assert_eq!(outcome, HandlerOutcome::Success);
        assert!(sink.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_transient() {
        let store = Arc::new(FakeTenantStore {
            fail: true,
            ..FakeTenantStore::default()
        });
        let handler = WorkflowsChangedHandler::new(store, Arc::new(RecordingSink::default()), 2);

        let outcome = handler.handle(&test_tenant(), &message()).await;
        assert_matches!(outcome, HandlerOutcome::TransientFailure(_));
    }
}
