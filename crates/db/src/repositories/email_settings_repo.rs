//! Repository for per-tenant SMTP settings.

use sqlx::PgPool;

use crate::models::tenant::EmailSettingsRow;

/// Column list for `tenant_email_settings` queries.
const COLUMNS: &str = "tenant_id, smtp_host, smtp_port, from_address, smtp_user, smtp_password";

/// Provides read access to tenant email settings.
pub struct EmailSettingsRepo;

impl EmailSettingsRepo {
    /// Find the SMTP settings for a tenant. `None` means email delivery is
    /// not configured for that tenant.
    pub async fn find(
        pool: &PgPool,
        tenant_id: &str,
    ) -> Result<Option<EmailSettingsRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tenant_email_settings WHERE tenant_id = $1");
        sqlx::query_as::<_, EmailSettingsRow>(&query)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }
}
