//! Repository for the `action_messages` durable queue table.
//!
//! Uses `MessageStatus` from `models::status` for all status transitions.
//! Claims use `FOR UPDATE SKIP LOCKED` so concurrent dispatchers never
//! double-claim a live message; claims older than the lease are treated as
//! abandoned and redelivered.

use std::time::Duration;

use sqlx::{PgConnection, PgPool};
use stateline_core::messages::ActionMessage;
use stateline_core::types::DbId;

use crate::models::queue::QueueMessage;
use crate::models::status::MessageStatus;

/// Column list for `action_messages` queries.
const COLUMNS: &str = "\
    id, message_id, tenant_id, action_type, user_id, revision_id, \
    payload, status_id, attempts, visible_at, last_error, \
    created_at, updated_at";

/// Default page size for dead-letter listing.
const DEAD_LETTER_LIMIT: i64 = 100;

/// Provides enqueue, claim, and disposition operations for the queue.
pub struct QueueRepo;

impl QueueRepo {
    /// Durably enqueue a message. Returns the queue row id.
    ///
    /// Takes a connection so callers can enqueue inside their own
    /// transaction when they need the message to commit atomically with
    /// other writes.
    pub async fn enqueue(
        conn: &mut PgConnection,
        message: &ActionMessage,
    ) -> Result<DbId, sqlx::Error> {
        let payload = serde_json::to_value(&message.payload)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO action_messages \
                 (message_id, tenant_id, action_type, user_id, revision_id, \
                  payload, status_id, visible_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) \
             RETURNING id",
        )
        .bind(message.message_id)
        .bind(&message.tenant_id)
        .bind(message.action_type().as_str())
        .bind(message.user_id)
        .bind(message.revision_id)
        .bind(payload)
        .bind(MessageStatus::Pending.id())
        .fetch_one(conn)
        .await
    }

    /// Atomically claim the next deliverable message.
    ///
    /// A message is deliverable when it is pending and visible, or when it
    /// has sat in the processing state longer than `lease` — a claim whose
    /// dispatcher died without recording a disposition expires and the
    /// message becomes eligible for redelivery.
    ///
    /// Increments `attempts` as part of the claim so a crashed dispatcher
    /// still counts against the retry budget.
    pub async fn claim_next(
        pool: &PgPool,
        lease: Duration,
    ) -> Result<Option<QueueMessage>, sqlx::Error> {
        let query = format!(
            "UPDATE action_messages \
             SET status_id = $1, attempts = attempts + 1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM action_messages \
                 WHERE (status_id = $2 AND visible_at <= NOW()) \
                    OR (status_id = $1 \
                        AND updated_at < NOW() - make_interval(secs => $3)) \
                 ORDER BY created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueMessage>(&query)
            .bind(MessageStatus::Processing.id())
            .bind(MessageStatus::Pending.id())
            .bind(lease.as_secs_f64())
            .fetch_optional(pool)
            .await
    }

    /// Mark a message as successfully handled.
    pub async fn complete(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE action_messages SET status_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(MessageStatus::Completed.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a message as permanently failed or dropped. Never retried.
    pub async fn mark_failed(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE action_messages \
             SET status_id = $2, last_error = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(MessageStatus::Failed.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Return a message to the pending state after a transient failure,
    /// hidden until the backoff delay elapses.
    pub async fn retry_later(
        pool: &PgPool,
        id: DbId,
        error: &str,
        delay: Duration,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE action_messages \
             SET status_id = $2, last_error = $3, \
                 visible_at = NOW() + make_interval(secs => $4), \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(MessageStatus::Pending.id())
        .bind(error)
        .bind(delay.as_secs_f64())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Park a message whose retry budget is exhausted.
    pub async fn dead_letter(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE action_messages \
             SET status_id = $2, last_error = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(MessageStatus::DeadLettered.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// List dead-lettered messages, newest first, for manual inspection.
    pub async fn list_dead_lettered(
        pool: &PgPool,
        limit: Option<i64>,
    ) -> Result<Vec<QueueMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM action_messages \
             WHERE status_id = $1 \
             ORDER BY updated_at DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, QueueMessage>(&query)
            .bind(MessageStatus::DeadLettered.id())
            .bind(limit.unwrap_or(DEAD_LETTER_LIMIT))
            .fetch_all(pool)
            .await
    }
}
