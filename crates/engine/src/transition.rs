//! The full transition attempt: validate, execute synchronous triggers,
//! commit, enqueue deferred triggers.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::Postgres;
use stateline_core::messages::ActionMessage;
use stateline_core::types::DbId;
use stateline_core::workflow::{WorkflowState, WorkflowTransition};
use stateline_db::models::artifact::{ArtifactBasicDetails, PERM_EDIT};
use stateline_db::repositories::{ArtifactRepo, QueueRepo};
use stateline_db::DbPool;

use crate::draft::{DraftStore, TriggerActionError};
use crate::error::EngineResult;
use crate::params::ExecutionParameters;
use crate::states::check_visibility;
use crate::triggers;

// ---------------------------------------------------------------------------
// Storage seams
// ---------------------------------------------------------------------------

/// One open transition transaction.
///
/// Synchronous trigger writes go through the [`DraftStore`] supertrait;
/// the state write and those trigger writes commit together, or the whole
/// unit rolls back. Both consume the unit, so a committed or rolled-back
/// transaction cannot be touched again.
#[async_trait]
pub trait TransitionUnit: DraftStore {
    /// Write the new state row and commit everything in the unit.
    async fn commit_state(
        self: Box<Self>,
        artifact_id: DbId,
        state_id: DbId,
        revision_id: DbId,
    ) -> Result<(), sqlx::Error>;

    /// Discard every write made through the unit.
    async fn rollback(self: Box<Self>) -> Result<(), sqlx::Error>;
}

/// Storage seam for [`TransitionEngine`].
#[async_trait]
pub trait TransitionStore: Send + Sync {
    /// Look up the artifact's revision, permission mask, and kind.
    async fn basic_details(
        &self,
        artifact_id: DbId,
        user_id: DbId,
    ) -> Result<Option<ArtifactBasicDetails>, sqlx::Error>;

    /// Open the transaction the synchronous phase runs inside.
    async fn begin(&self) -> Result<Box<dyn TransitionUnit>, sqlx::Error>;

    /// Durably enqueue one deferred-trigger message. Happens outside the
    /// transition transaction, after commit.
    async fn enqueue(&self, message: &ActionMessage) -> Result<(), sqlx::Error>;
}

struct PgTransitionStore {
    pool: DbPool,
}

struct PgTransitionUnit {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl DraftStore for PgTransitionUnit {
    async fn set_property(
        &mut self,
        artifact_id: DbId,
        property: &str,
        value: &serde_json::Value,
    ) -> Result<(), TriggerActionError> {
        self.tx.set_property(artifact_id, property, value).await
    }
}

#[async_trait]
impl TransitionUnit for PgTransitionUnit {
    async fn commit_state(
        mut self: Box<Self>,
        artifact_id: DbId,
        state_id: DbId,
        revision_id: DbId,
    ) -> Result<(), sqlx::Error> {
        ArtifactRepo::set_state(&mut self.tx, artifact_id, state_id, revision_id).await?;
        self.tx.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), sqlx::Error> {
        self.tx.rollback().await
    }
}

#[async_trait]
impl TransitionStore for PgTransitionStore {
    async fn basic_details(
        &self,
        artifact_id: DbId,
        user_id: DbId,
    ) -> Result<Option<ArtifactBasicDetails>, sqlx::Error> {
        ArtifactRepo::get_basic_details(&self.pool, artifact_id, user_id).await
    }

    async fn begin(&self) -> Result<Box<dyn TransitionUnit>, sqlx::Error> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransitionUnit { tx }))
    }

    async fn enqueue(&self, message: &ActionMessage) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        QueueRepo::enqueue(&mut conn, message).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Result of a transition attempt.
#[derive(Debug)]
pub enum TransitionOutcome {
    /// The transition committed. Deferred triggers were enqueued as action
    /// messages; `enqueued_messages` counts the ones durably queued.
    Completed {
        new_state: WorkflowState,
        enqueued_messages: usize,
    },
    /// Validation or a synchronous trigger failed. The transaction was
    /// rolled back; nothing was applied and nothing was enqueued.
    Rejected {
        errors: BTreeMap<String, String>,
    },
}

/// Runs transition attempts end to end.
pub struct TransitionEngine {
    store: Arc<dyn TransitionStore>,
}

impl TransitionEngine {
    pub fn new(pool: DbPool) -> Self {
        Self {
            store: Arc::new(PgTransitionStore { pool }),
        }
    }

    /// Build the engine over an explicit store. Tests substitute an
    /// in-memory store here.
    pub fn with_store(store: Arc<dyn TransitionStore>) -> Self {
        Self { store }
    }

    /// Attempt the given transition for an artifact.
    ///
    /// Phases, in order:
    ///
    /// 1. **Validate** — property rules against the incoming values; any
    ///    violation rejects the attempt before any trigger runs.
    /// 2. **Execute-synchronous** — synchronous triggers in declaration
    ///    order inside one transaction, non-short-circuiting; any failure
    ///    rolls everything back and returns the full error map.
    /// 3. **Commit** — the state write and all synchronous side effects
    ///    commit together.
    /// 4. **Execute-deferred** — each deferred trigger becomes an
    ///    [`ActionMessage`] on the queue. Enqueue failures are logged and
    ///    never roll back the already-committed transition.
    pub async fn change_state(
        &self,
        tenant_id: &str,
        user_id: DbId,
        transition: &WorkflowTransition,
        params: &ExecutionParameters,
    ) -> EngineResult<TransitionOutcome> {
        // Phase 1: validation. No triggers run on failure.
        if let Some(errors) = triggers::validate_properties(params) {
            return Ok(TransitionOutcome::Rejected { errors });
        }

        let artifact_id = params.version.artifact_id;
        let revision_id = params.version.revision_id;

        let details = self.store.basic_details(artifact_id, user_id).await?;
        check_visibility(details.as_ref(), artifact_id, revision_id, PERM_EDIT)?;

        // Phase 2: synchronous triggers share one transaction with the
        // state write.
        let mut unit = self.store.begin().await?;
        let errors = triggers::run_synchronous(&mut *unit, params, &transition.triggers).await;

        if !errors.is_empty() {
            unit.rollback().await?;
            tracing::info!(
                artifact_id,
                transition = %transition.name,
                failed_triggers = errors.len(),
                "Transition rejected by synchronous triggers",
            );
            return Ok(TransitionOutcome::Rejected { errors });
        }

        // Phase 3: commit.
        unit.commit_state(artifact_id, transition.to_state.id, revision_id)
            .await?;

        // Phase 4: deferred triggers. The transition is already committed;
        // a failed enqueue is logged and surfaces only through the queue's
        // own observability.
        let messages = triggers::build_deferred_messages(tenant_id, user_id, transition, params);
        let mut enqueued = 0usize;
        for message in &messages {
            match self.store.enqueue(message).await {
                Ok(()) => enqueued += 1,
                Err(e) => {
                    tracing::error!(
                        artifact_id,
                        message_id = %message.message_id,
                        action_type = %message.action_type(),
                        error = %e,
                        "Failed to enqueue deferred trigger message",
                    );
                }
            }
        }

        tracing::info!(
            artifact_id,
            transition = %transition.name,
            new_state = %transition.to_state.name,
            enqueued,
            "Transition committed",
        );

        Ok(TransitionOutcome::Completed {
            new_state: transition.to_state.clone(),
            enqueued_messages: enqueued,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
