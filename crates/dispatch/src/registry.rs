//! Handler registry: one handler per action type, looked up by the
//! message's discriminator. No reflection, no downcasting.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use stateline_core::batching::MAX_FANOUT_BATCH;
use stateline_core::messages::{ActionMessage, ActionType};
use stateline_db::DbPool;

use crate::handlers::generate::GenerateJobHandler;
use crate::handlers::notification::NotificationHandler;
use crate::handlers::property_change::PropertyChangeHandler;
use crate::handlers::state_change::StateChangeHandler;
use crate::handlers::users_groups::UsersGroupsChangedHandler;
use crate::handlers::workflows_changed::WorkflowsChangedHandler;
use crate::stores::{MessageSink, PgTenantStore, QueueSink, TenantStore};
use crate::tenants::Tenant;

/// Result of handling one message. The dispatcher decides retry behavior
/// from this — never from whether the handler panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The unit of work completed (including deliberate no-ops).
    Success,
    /// Something that may succeed on redelivery failed (I/O, SMTP, ...).
    /// Retried with backoff up to the configured attempt budget.
    TransientFailure(String),
    /// The handler decided the failure is not transient (missing
    /// configuration, malformed message). Logged, never retried.
    PermanentFailure(String),
}

/// A handler for exactly one action type.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, tenant: &Tenant, message: &ActionMessage) -> HandlerOutcome;
}

/// Registry mapping action-type discriminators to their handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<ActionType, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one action type, replacing any previous one.
    pub fn register(&mut self, action_type: ActionType, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(action_type, handler);
    }

    /// Look up the handler for an action type. `None` is a configuration
    /// error the dispatcher reports as an unsupported action type.
    pub fn get(&self, action_type: ActionType) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&action_type).cloned()
    }

    /// The full production registry: every action type wired to its handler
    /// against the control-database queue.
    pub fn standard(control: DbPool) -> Self {
        let sink: Arc<dyn MessageSink> = Arc::new(QueueSink::new(control));
        let store: Arc<dyn TenantStore> = Arc::new(PgTenantStore);

        let mut registry = Self::new();
        registry.register(ActionType::Notification, Arc::new(NotificationHandler));
        registry.register(
            ActionType::GenerateDescendants,
            Arc::new(GenerateJobHandler::descendants()),
        );
        registry.register(
            ActionType::GenerateUserStories,
            Arc::new(GenerateJobHandler::user_stories()),
        );
        registry.register(
            ActionType::GenerateTests,
            Arc::new(GenerateJobHandler::tests()),
        );
        registry.register(
            ActionType::PropertyChange,
            Arc::new(PropertyChangeHandler::new(store.clone())),
        );
        registry.register(
            ActionType::StateChange,
            Arc::new(StateChangeHandler::new(
                store.clone(),
                sink.clone(),
                MAX_FANOUT_BATCH,
            )),
        );
        registry.register(
            ActionType::UsersGroupsChanged,
            Arc::new(UsersGroupsChangedHandler::new(
                store.clone(),
                sink.clone(),
                MAX_FANOUT_BATCH,
            )),
        );
        registry.register(
            ActionType::WorkflowsChanged,
            Arc::new(WorkflowsChangedHandler::new(store, sink, MAX_FANOUT_BATCH)),
        );
        registry
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysSucceeds;

    #[async_trait]
    impl ActionHandler for AlwaysSucceeds {
        async fn handle(&self, _tenant: &Tenant, _message: &ActionMessage) -> HandlerOutcome {
            HandlerOutcome::Success
        }
    }

    #[test]
    fn lookup_returns_the_registered_handler() {
        let mut registry = HandlerRegistry::new();
        registry.register(ActionType::Notification, Arc::new(AlwaysSucceeds));

        assert!(registry.get(ActionType::Notification).is_some());
        assert!(registry.get(ActionType::WorkflowsChanged).is_none());
    }

    #[test]
    fn registering_twice_replaces_the_handler() {
        let mut registry = HandlerRegistry::new();
        let first: Arc<dyn ActionHandler> = Arc::new(AlwaysSucceeds);
        let second: Arc<dyn ActionHandler> = Arc::new(AlwaysSucceeds);
        registry.register(ActionType::Notification, first);
        registry.register(ActionType::Notification, second.clone());

        let looked_up = registry.get(ActionType::Notification).unwrap();
        assert!(Arc::ptr_eq(&looked_up, &second));
    }
}
