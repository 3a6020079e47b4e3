//! Users/groups-changed handler: finds artifacts whose workflow triggers
//! reference the changed principals and fans out batched property-change
//! messages to re-evaluate them.

use std::sync::Arc;

use async_trait::async_trait;

use stateline_core::messages::{ActionMessage, ActionPayload, ChangeType};

use crate::handlers::enqueue_property_change_batches;
use crate::registry::{ActionHandler, HandlerOutcome};
use crate::stores::{MessageSink, TenantStore};
use crate::tenants::Tenant;

pub struct UsersGroupsChangedHandler {
    store: Arc<dyn TenantStore>,
    sink: Arc<dyn MessageSink>,
    batch_size: usize,
}

impl UsersGroupsChangedHandler {
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
impl ActionHandler for UsersGroupsChangedHandler {
    async fn handle(&self, tenant: &Tenant, message: &ActionMessage) -> HandlerOutcome {
        let ActionPayload::UsersGroupsChanged(payload) = &message.payload else {
            return HandlerOutcome::PermanentFailure(
                "Payload does not match the users_groups_changed action type".to_string(),
            );
        };

        // A freshly created principal cannot be referenced by any existing
        // trigger yet, so there is nothing to re-evaluate.
        if payload.change_type == ChangeType::Create {
            return HandlerOutcome::Success;
        }

        let affected = match self
            .store
            .artifacts_referencing_principals(tenant, &payload.user_ids, &payload.group_ids)
            .await
        {
            Ok(affected) => affected,
            Err(e) => {
                return HandlerOutcome::TransientFailure(format!(
                    "Failed to resolve artifacts referencing principals: {e}"
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
                    change_type = ?payload.change_type,
                    artifacts = affected.len(),
                    batches,
                    "Principal change fanned out"
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
    use stateline_core::messages::UsersGroupsChangedPayload;

    fn handler(store: Arc<FakeTenantStore>, sink: Arc<RecordingSink>) -> UsersGroupsChangedHandler {
        UsersGroupsChangedHandler::new(store, sink, 2)
    }

    fn message(change_type: ChangeType) -> ActionMessage {
        ActionMessage::new(
            "acme",
            ActionPayload::UsersGroupsChanged(UsersGroupsChangedPayload {
                change_type,
                user_ids: vec![4],
                group_ids: vec![],
            }),
        )
    }

    #[tokio::test]
    async fn create_is_a_no_op_without_querying_the_store() {
        // A failing store proves the query path is never reached.
        let store = Arc::new(FakeTenantStore {
            fail: true,
            ..FakeTenantStore::default()
        });
        let sink = Arc::new(RecordingSink::default());

        let outcome = handler(store, sink.clone())
            .handle(&test_tenant(), &message(ChangeType::Create))
            .await;

        assert_eq!(outcome, HandlerOutcome::Success);
        assert!(sink.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_fans_out_property_change_batches() {
        let store = Arc::new(FakeTenantStore {
            referencing: vec![1, 2, 3],
            ..FakeTenantStore::default()
        });
        let sink = Arc::new(RecordingSink::default());

        let outcome = handler(store, sink.clone())
            .handle(&test_tenant(), &message(ChangeType::Update))
            .await;

        assert_eq!(outcome, HandlerOutcome::Success);
        let messages = sink.messages.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert_matches!(
            &messages[0].payload,
            ActionPayload::PropertyChange(p) if p.artifact_ids == vec![1, 2]
        );
        assert_matches!(
            &messages[1].payload,
            ActionPayload::PropertyChange(p) if p.artifact_ids == vec![3]
        );
    }

    #[tokio::test]
    async fn delete_with_no_referencing_artifacts_succeeds_quietly() {
        let sink = Arc::new(RecordingSink::default());
        let outcome = handler(Arc::new(FakeTenantStore::default()), sink.clone())
            .handle(&test_tenant(), &message(ChangeType::Delete))
            .await;

        assert_eq!(outcome, HandlerOutcome::Success);
        assert!(sink.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_transient() {
        let store = Arc::new(FakeTenantStore {
            fail: true,
            ..FakeTenantStore::default()
        });
        let outcome = handler(store, Arc::new(RecordingSink::default()))
            .handle(&test_tenant(), &message(ChangeType::Update))
            .await;
        assert_matches!(outcome, HandlerOutcome::TransientFailure(_));
    }
}
