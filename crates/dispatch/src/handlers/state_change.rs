//! State-change handler: propagates a state change to artifacts linked to
//! the source artifact.
//!
//! The originating message carries an empty `artifact_ids`; the handler
//! resolves the linked artifacts and re-enqueues itself as batched
//! messages with the list filled in. Batch messages then apply the state
//! directly. Splitting the work this way keeps each message's transaction
//! small and lets batches retry independently.

use std::sync::Arc;

use async_trait::async_trait;

use stateline_core::batching::chunk_ids;
use stateline_core::messages::{ActionMessage, ActionPayload, StateChangePayload};

use crate::registry::{ActionHandler, HandlerOutcome};
use crate::stores::{MessageSink, TenantStore};
use crate::tenants::Tenant;

pub struct StateChangeHandler {
    store: Arc<dyn TenantStore>,
    sink: Arc<dyn MessageSink>,
    batch_size: usize,
}

impl StateChangeHandler {
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

    /// Resolve the linked artifacts and re-enqueue batched copies of the
    /// originating message.
    async fn fan_out(
        &self,
        tenant: &Tenant,
        message: &ActionMessage,
        payload: &StateChangePayload,
    ) -> HandlerOutcome {
        let linked = match self
            .store
            .linked_artifacts(tenant, payload.source_artifact_id)
            .await
        {
            Ok(linked) => linked,
            Err(e) => {
                return HandlerOutcome::TransientFailure(format!(
                    "Failed to resolve linked artifacts: {e}"
                ));
            }
        };

        if linked.is_empty() {
            tracing::debug!(
                message_id = %message.message_id,
                source_artifact_id = payload.source_artifact_id,
                "No linked artifacts to propagate state to"
            );
            return HandlerOutcome::Success;
        }

        let batches = chunk_ids(&linked, self.batch_size);
        let batch_count = batches.len();
        for batch in batches {
            let mut follow_up = ActionMessage::new(
                message.tenant_id.clone(),
                ActionPayload::StateChange(StateChangePayload {
                    source_artifact_id: payload.source_artifact_id,
                    new_state_id: payload.new_state_id,
                    artifact_ids: batch,
                }),
            );
            follow_up.user_id = message.user_id;
            follow_up.revision_id = message.revision_id;
            if let Err(e) = self.sink.enqueue(&follow_up).await {
                return HandlerOutcome::TransientFailure(format!(
                    "Failed to enqueue state-change batch: {e}"
                ));
            }
        }

        tracing::info!(
            message_id = %message.message_id,
            source_artifact_id = payload.source_artifact_id,
            artifacts = linked.len(),
            batches = batch_count,
            "State change fanned out"
        );
        HandlerOutcome::Success
    }
}

#[async_trait]
impl ActionHandler for StateChangeHandler {
    async fn handle(&self, tenant: &Tenant, message: &ActionMessage) -> HandlerOutcome {
        let ActionPayload::StateChange(payload) = &message.payload else {
            return HandlerOutcome::PermanentFailure(
                "Payload does not match the state_change action type".to_string(),
            );
        };

        if payload.artifact_ids.is_empty() {
            return self.fan_out(tenant, message, payload).await;
        }

        match self
            .store
            .apply_state(tenant, &payload.artifact_ids, payload.new_state_id)
            .await
        {
            Ok(updated) => {
                tracing::info!(
                    message_id = %message.message_id,
                    new_state_id = payload.new_state_id,
                    updated,
                    "State change batch applied"
                );
                HandlerOutcome::Success
            }
            Err(e) => {
                HandlerOutcome::TransientFailure(format!("Failed to apply state change: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{test_tenant, FakeTenantStore, RecordingSink};
    use assert_matches::assert_matches;
    use stateline_core::types::DbId;

    fn handler(store: Arc<FakeTenantStore>, sink: Arc<RecordingSink>) -> StateChangeHandler {
        StateChangeHandler::new(store, sink, 2)
    }

    fn originating() -> ActionMessage {
        ActionMessage::new(
            "acme",
            ActionPayload::StateChange(StateChangePayload {
                source_artifact_id: 10,
                new_state_id: 3,
                artifact_ids: vec![],
            }),
        )
        .with_user(7)
    }

    #[tokio::test]
    async fn originating_message_fans_out_batched_copies() {
        let store = Arc::new(FakeTenantStore {
            linked: vec![1, 2, 3, 4, 5],
            ..FakeTenantStore::default()
        });
        let sink = Arc::new(RecordingSink::default());

        let outcome = handler(store, sink.clone())
            .handle(&test_tenant(), &originating())
            .await;

        assert_eq!(outcome, HandlerOutcome::Success);
        let messages = sink.messages.lock().unwrap();
        assert_eq!(messages.len(), 3);

        let batches: Vec<Vec<DbId>> = messages
            .iter()
            .map(|m| match &m.payload {
                ActionPayload::StateChange(p) => {
                    assert_eq!(p.source_artifact_id, 10);
                    assert_eq!(p.new_state_id, 3);
                    p.artifact_ids.clone()
                }
                other => panic!("unexpected payload: {other:?}"),
            })
            .collect();
        assert_eq!(batches, vec![vec![1, 2], vec![3, 4], vec![5]]);
        assert!(messages.iter().all(|m| m.user_id == Some(7)));
    }

    #[tokio::test]
    async fn originating_message_with_no_links_succeeds_quietly() {
        let sink = Arc::new(RecordingSink::default());
        let outcome = handler(Arc::new(FakeTenantStore::default()), sink.clone())
            .handle(&test_tenant(), &originating())
            .await;

        assert_eq!(outcome, HandlerOutcome::Success);
        assert!(sink.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_message_applies_the_state() {
        let store = Arc::new(FakeTenantStore::default());
        let sink = Arc::new(RecordingSink::default());
        let batch = ActionMessage::new(
            "acme",
            ActionPayload::StateChange(StateChangePayload {
                source_artifact_id: 10,
                new_state_id: 3,
                artifact_ids: vec![1, 2],
            }),
        );

        let outcome = handler(store.clone(), sink.clone())
            .handle(&test_tenant(), &batch)
            .await;

        assert_eq!(outcome, HandlerOutcome::Success);
        assert_eq!(*store.applied.lock().unwrap(), vec![(vec![1, 2], 3)]);
        // Batch messages never fan out further.
        assert!(sink.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sink_failure_during_fan_out_is_transient() {
        let store = Arc::new(FakeTenantStore {
            linked: vec![1],
            ..FakeTenantStore::default()
        });
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..RecordingSink::default()
        });

        let outcome = handler(store, sink)
            .handle(&test_tenant(), &originating())
            .await;
        assert_matches!(outcome, HandlerOutcome::TransientFailure(_));
    }
}
