//! Repository for the `users` table.

use sqlx::PgPool;
use stateline_core::types::DbId;

use crate::models::tenant::UserRow;

/// Column list for `users` queries.
const COLUMNS: &str = "id, username, email, active";

/// Provides read access to users.
pub struct UserRepo;

impl UserRepo {
    /// Find an active user by id.
    pub async fn find_active(pool: &PgPool, id: DbId) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1 AND active");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
