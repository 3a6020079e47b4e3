//! Per-action-type handlers.
//!
//! Each handler owns exactly one action type and reports a
//! [`HandlerOutcome`](crate::registry::HandlerOutcome). Handlers reach
//! tenant data through the [`TenantStore`](crate::stores::TenantStore)
//! seam; fan-out handlers split follow-up work into bounded batches
//! before re-enqueueing.

pub mod generate;
pub mod notification;
pub mod property_change;
pub mod state_change;
pub mod users_groups;
pub mod workflows_changed;

use stateline_core::batching::chunk_ids;
use stateline_core::messages::{ActionMessage, ActionPayload, PropertyChangePayload};
use stateline_core::types::DbId;

use crate::stores::MessageSink;

/// Enqueue property-change follow-up messages for `ids`, split into
/// batches of at most `batch_size`. Tenant, acting user, and revision
/// carry over from the originating message. Returns the batch count.
pub(crate) async fn enqueue_property_change_batches(
    sink: &dyn MessageSink,
    origin: &ActionMessage,
    ids: &[DbId],
    batch_size: usize,
) -> Result<usize, sqlx::Error> {
    let batches = chunk_ids(ids, batch_size);
    let count = batches.len();
    for batch in batches {
        let mut follow_up = ActionMessage::new(
            origin.tenant_id.clone(),
            ActionPayload::PropertyChange(PropertyChangePayload { artifact_ids: batch }),
        );
        follow_up.user_id = origin.user_id;
        follow_up.revision_id = origin.revision_id;
        sink.enqueue(&follow_up).await?;
    }
    Ok(count)
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use stateline_core::messages::ActionMessage;
    use stateline_core::types::DbId;
    use stateline_db::create_pool_lazy;

    use crate::stores::{MessageSink, TenantStore};
    use crate::tenants::{Tenant, TenantInformation};

    /// A tenant whose pool never connects. Handlers under test go through
    /// the store fakes, not the pool.
    pub fn test_tenant() -> Tenant {
        Tenant {
            info: TenantInformation {
                tenant_id: "acme".to_string(),
                display_name: "Acme Corp".to_string(),
                database_url: "postgres://localhost/unused".to_string(),
            },
            pool: create_pool_lazy("postgres://localhost/unused").expect("lazy pool"),
        }
    }

    /// Records enqueued messages; optionally fails every enqueue.
    #[derive(Default)]
    pub struct RecordingSink {
        pub fail: bool,
        pub messages: Mutex<Vec<ActionMessage>>,
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn enqueue(&self, message: &ActionMessage) -> Result<DbId, sqlx::Error> {
            if self.fail {
                return Err(sqlx::Error::PoolClosed);
            }
            let mut messages = self.messages.lock().unwrap();
            messages.push(message.clone());
            Ok(messages.len() as DbId)
        }
    }

    /// Canned-response tenant store that records writes.
    #[derive(Default)]
    pub struct FakeTenantStore {
        pub fail: bool,
        pub linked: Vec<DbId>,
        pub referencing: Vec<DbId>,
        pub using_workflow: Vec<DbId>,
        pub applied: Mutex<Vec<(Vec<DbId>, DbId)>>,
        pub rebuilt: Mutex<Vec<DbId>>,
    }

    impl FakeTenantStore {
        fn check(&self) -> Result<(), sqlx::Error> {
            if self.fail {
                Err(sqlx::Error::PoolClosed)
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl TenantStore for FakeTenantStore {
        async fn linked_artifacts(
            &self,
            _tenant: &Tenant,
            _artifact_id: DbId,
        ) -> Result<Vec<DbId>, sqlx::Error> {
            self.check()?;
            Ok(self.linked.clone())
        }

        async fn apply_state(
            &self,
            _tenant: &Tenant,
            artifact_ids: &[DbId],
            state_id: DbId,
        ) -> Result<u64, sqlx::Error> {
            self.check()?;
            self.applied
                .lock()
                .unwrap()
                .push((artifact_ids.to_vec(), state_id));
            Ok(artifact_ids.len() as u64)
        }

        async fn artifacts_referencing_principals(
            &self,
            _tenant: &Tenant,
            _user_ids: &[DbId],
            _group_ids: &[DbId],
        ) -> Result<Vec<DbId>, sqlx::Error> {
            self.check()?;
            Ok(self.referencing.clone())
        }

        async fn artifacts_using_workflow(
            &self,
            _tenant: &Tenant,
            _workflow_id: DbId,
        ) -> Result<Vec<DbId>, sqlx::Error> {
            self.check()?;
            Ok(self.using_workflow.clone())
        }

        async fn rebuild_trigger_refs(
            &self,
            _tenant: &Tenant,
            artifact_id: DbId,
        ) -> Result<(), sqlx::Error> {
            self.check()?;
            self.rebuilt.lock().unwrap().push(artifact_id);
            Ok(())
        }
    }
}
