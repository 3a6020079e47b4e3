//! Repository for the `tenants` registry table (control database).

use sqlx::PgPool;

use crate::models::tenant::TenantRow;

/// Column list for `tenants` queries.
const COLUMNS: &str = "tenant_id, display_name, database_url, active, created_at";

/// Provides read access to the tenant registry.
pub struct TenantRepo;

impl TenantRepo {
    /// Find an active tenant by its opaque id.
    pub async fn find_active(
        pool: &PgPool,
        tenant_id: &str,
    ) -> Result<Option<TenantRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tenants WHERE tenant_id = $1 AND active");
        sqlx::query_as::<_, TenantRow>(&query)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }
}
