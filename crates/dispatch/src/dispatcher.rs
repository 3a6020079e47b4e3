//! The message dispatcher loop.
//!
//! Polls the durable queue, claims messages with `FOR UPDATE SKIP LOCKED`,
//! resolves each message's tenant, and hands it to the registered handler
//! for its action type. Handler outcomes drive disposition: complete,
//! retry with linear backoff, or dead-letter once the attempt budget is
//! exhausted. Infrastructure errors (tenant registry unreachable) are
//! treated as transient; messages for unknown tenants are dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use stateline_db::models::queue::QueueMessage;
use stateline_db::repositories::QueueRepo;
use stateline_db::DbPool;

use crate::config::DispatcherConfig;
use crate::registry::{HandlerOutcome, HandlerRegistry};
use crate::tenants::TenantResolver;

// ---------------------------------------------------------------------------
// Disposition
// ---------------------------------------------------------------------------

/// What to do with a claimed message after processing.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Disposition {
    /// Mark completed.
    Complete,
    /// Mark permanently failed. Never retried.
    Fail(String),
    /// Return to pending, hidden for the given delay.
    Retry(Duration, String),
    /// Park for manual inspection.
    DeadLetter(String),
}

/// Map a handler outcome to a disposition.
///
/// `attempts` is the number of claims so far, including the one that just
/// ran. Transient failures retry with linear backoff (`attempts * base`)
/// until the budget is spent, then dead-letter.
fn disposition(outcome: HandlerOutcome, attempts: i32, config: &DispatcherConfig) -> Disposition {
    match outcome {
        HandlerOutcome::Success => Disposition::Complete,
        HandlerOutcome::PermanentFailure(reason) => Disposition::Fail(reason),
        HandlerOutcome::TransientFailure(reason) => {
            if attempts >= config.max_attempts {
                Disposition::DeadLetter(reason)
            } else {
                let delay = config.retry_base_delay * attempts.max(1) as u32;
                Disposition::Retry(delay, reason)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MessageDispatcher
// ---------------------------------------------------------------------------

/// Claims and processes queued action messages.
///
/// Multiple dispatcher processes may run against the same queue; the
/// claim query guarantees each message is processed by at most one at a
/// time.
pub struct MessageDispatcher {
    queue: DbPool,
    resolver: Arc<TenantResolver>,
    registry: Arc<HandlerRegistry>,
    config: DispatcherConfig,
    semaphore: Arc<Semaphore>,
}

impl MessageDispatcher {
    pub fn new(
        queue: DbPool,
        resolver: Arc<TenantResolver>,
        registry: Arc<HandlerRegistry>,
        config: DispatcherConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.concurrency));
        Self {
            queue,
            resolver,
            registry,
            config,
            semaphore,
        }
    }

    /// Run the polling loop until the cancellation token fires.
    ///
    /// In-flight handlers are given until they finish their current
    /// message; no new claims are made after cancellation.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!(
            concurrency = self.config.concurrency,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Message dispatcher started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Message dispatcher shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.clone().dispatch_cycle().await {
                        tracing::error!(error = %e, "Dispatch cycle failed");
                    }
                }
            }
        }

        // A handler task aborted mid-message would strand its claimed row
        // in the processing state until the lease expires, so wait for the
        // in-flight tasks to record their dispositions first.
        drain(&self.semaphore, self.config.concurrency).await;
        tracing::info!("Message dispatcher stopped");
    }

    /// Claim and process as many messages as free permits allow.
    ///
    /// Each claimed message is processed on its own task so a slow handler
    /// (an SMTP timeout, say) does not stall the rest of the batch.
    async fn dispatch_cycle(self: Arc<Self>) -> Result<(), sqlx::Error> {
        loop {
            let Ok(permit) = self.semaphore.clone().try_acquire_owned() else {
                return Ok(());
            };

            let Some(row) = QueueRepo::claim_next(&self.queue, self.config.lease).await? else {
                return Ok(());
            };

            let dispatcher = self.clone();
            tokio::spawn(async move {
                dispatcher.process_message(row).await;
                drop(permit);
            });
        }
    }

    /// Process one claimed message end to end and record its disposition.
    async fn process_message(&self, row: QueueMessage) {
        use stateline_core::messages::ActionType;

        let row_id = row.id;
        let message_id = row.message_id;

        let outcome = 'outcome: {
            let Some(action_type) = ActionType::parse(&row.action_type) else {
                break 'outcome HandlerOutcome::PermanentFailure(format!(
                    "Unknown action type '{}'",
                    row.action_type
                ));
            };

            let tenant = match self.resolver.resolve(&row.tenant_id).await {
                Ok(Some(tenant)) => tenant,
                Ok(None) => {
                    break 'outcome HandlerOutcome::PermanentFailure(format!(
                        "Unknown or inactive tenant '{}'",
                        row.tenant_id
                    ));
                }
                Err(e) => {
                    break 'outcome HandlerOutcome::TransientFailure(format!(
                        "Tenant resolution failed: {e}"
                    ));
                }
            };

            let Some(handler) = self.registry.get(action_type) else {
                break 'outcome HandlerOutcome::PermanentFailure(format!(
                    "No handler registered for action type '{}'",
                    action_type.as_str()
                ));
            };

            let message = match row.decode() {
                Ok(message) => message,
                Err(e) => {
                    break 'outcome HandlerOutcome::PermanentFailure(format!(
                        "Malformed payload: {e}"
                    ));
                }
            };

            tracing::debug!(
                %message_id,
                tenant_id = %row.tenant_id,
                action_type = action_type.as_str(),
                attempt = row.attempts,
                "Processing message"
            );

            handler.handle(&tenant, &message).await
        };

        let result = match disposition(outcome, row.attempts, &self.config) {
            Disposition::Complete => {
                tracing::info!(%message_id, "Message completed");
                QueueRepo::complete(&self.queue, row_id).await
            }
            Disposition::Fail(reason) => {
                tracing::warn!(%message_id, reason, "Message permanently failed");
                QueueRepo::mark_failed(&self.queue, row_id, &reason).await
            }
            Disposition::Retry(delay, reason) => {
                tracing::warn!(
                    %message_id,
                    reason,
                    delay_secs = delay.as_secs(),
                    attempt = row.attempts,
                    "Message failed transiently, scheduling retry"
                );
                QueueRepo::retry_later(&self.queue, row_id, &reason, delay).await
            }
            Disposition::DeadLetter(reason) => {
                tracing::error!(
                    %message_id,
                    reason,
                    attempts = row.attempts,
                    "Retry budget exhausted, dead-lettering message"
                );
                QueueRepo::dead_letter(&self.queue, row_id, &reason).await
            }
        };

        if let Err(e) = result {
            // The row stays in the processing state and is redelivered
            // once its claim lease expires.
            tracing::error!(%message_id, error = %e, "Failed to record message disposition");
        }
    }
}

/// Wait until every handler permit is free again.
async fn drain(semaphore: &Semaphore, concurrency: usize) {
    if semaphore.acquire_many(concurrency as u32).await.is_err() {
        tracing::warn!("Semaphore closed while draining in-flight handlers");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DispatcherConfig {
        DispatcherConfig {
            max_attempts: 3,
            retry_base_delay: Duration::from_secs(10),
            ..DispatcherConfig::default()
        }
    }

    #[test]
    fn success_completes() {
        assert_eq!(
            disposition(HandlerOutcome::Success, 1, &config()),
            Disposition::Complete
        );
    }

    #[test]
    fn permanent_failure_is_never_retried() {
        assert_eq!(
            disposition(
                HandlerOutcome::PermanentFailure("bad payload".to_string()),
                1,
                &config()
            ),
            Disposition::Fail("bad payload".to_string())
        );
    }

    #[test]
    fn transient_failure_retries_with_linear_backoff() {
        let cfg = config();
        assert_eq!(
            disposition(HandlerOutcome::TransientFailure("smtp".to_string()), 1, &cfg),
            Disposition::Retry(Duration::from_secs(10), "smtp".to_string())
        );
        assert_eq!(
            disposition(HandlerOutcome::TransientFailure("smtp".to_string()), 2, &cfg),
            Disposition::Retry(Duration::from_secs(20), "smtp".to_string())
        );
    }

    #[test]
    fn transient_failure_dead_letters_at_budget() {
        let cfg = config();
        assert_eq!(
            disposition(HandlerOutcome::TransientFailure("smtp".to_string()), 3, &cfg),
            Disposition::DeadLetter("smtp".to_string())
        );
        assert_eq!(
            disposition(HandlerOutcome::TransientFailure("smtp".to_string()), 4, &cfg),
            Disposition::DeadLetter("smtp".to_string())
        );
    }

    #[test]
    fn zero_attempts_still_waits_one_base_delay() {
        assert_eq!(
            disposition(
                HandlerOutcome::TransientFailure("db".to_string()),
                0,
                &config()
            ),
            Disposition::Retry(Duration::from_secs(10), "db".to_string())
        );
    }

    #[tokio::test]
    async fn shutdown_drain_waits_for_held_permits() {
        let semaphore = Arc::new(Semaphore::new(2));
        let permit = semaphore.clone().try_acquire_owned().expect("permit");

        // An in-flight handler still holds a permit; the drain must block.
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), drain(&semaphore, 2)).await;
        assert!(blocked.is_err());

        drop(permit);
        tokio::time::timeout(Duration::from_secs(1), drain(&semaphore, 2))
            .await
            .expect("drain finishes once all permits are released");
    }

    #[tokio::test]
    async fn run_stops_after_cancellation() {
        let pool =
            stateline_db::create_pool_lazy("postgres://localhost:1/unused").expect("lazy pool");
        let dispatcher = Arc::new(MessageDispatcher::new(
            pool.clone(),
            Arc::new(TenantResolver::new(pool)),
            Arc::new(HandlerRegistry::new()),
            DispatcherConfig {
                poll_interval: Duration::from_millis(10),
                ..DispatcherConfig::default()
            },
        ));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(dispatcher.run(cancel.clone()));
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("run returns after cancellation")
            .expect("dispatcher task completes");
    }
}
