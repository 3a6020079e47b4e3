//! Tenant resolution.
//!
//! Maps an opaque tenant id to its connection information plus a lazily
//! connected database pool. Resolved tenants are cached with a TTL; a
//! stale or missing entry refreshes from the `tenants` registry in the
//! control database, so a tenant deactivated there stops resolving within
//! one TTL. An id with no registry row is permanently unknown — the
//! caller must drop the message rather than retry, since retrying cannot
//! fix it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use stateline_db::repositories::TenantRepo;
use stateline_db::{create_pool_lazy, DbPool};

/// How long a resolved tenant is served from cache before the registry is
/// consulted again.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Per-tenant connection descriptor. Read-only after resolution and safe to
/// share across concurrent handler invocations.
#[derive(Debug, Clone)]
pub struct TenantInformation {
    pub tenant_id: String,
    pub display_name: String,
    pub database_url: String,
}

/// A resolved tenant: its descriptor and a pool for its database.
///
/// The pool connects lazily; the first query establishes the connection.
pub struct Tenant {
    pub info: TenantInformation,
    pub pool: DbPool,
}

struct CachedTenant {
    tenant: Arc<Tenant>,
    resolved_at: Instant,
}

/// Caching tenant resolver backed by the control database.
pub struct TenantResolver {
    control: DbPool,
    ttl: Duration,
    cache: RwLock<HashMap<String, CachedTenant>>,
}

impl TenantResolver {
    pub fn new(control: DbPool) -> Self {
        Self::with_ttl(control, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(control: DbPool, ttl: Duration) -> Self {
        Self {
            control,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a tenant id. `Ok(None)` means the tenant is unknown (or
    /// inactive) — permanently undeliverable for the caller.
    pub async fn resolve(&self, tenant_id: &str) -> Result<Option<Arc<Tenant>>, sqlx::Error> {
        if let Some(cached) = self.cache.read().await.get(tenant_id) {
            if cached.resolved_at.elapsed() < self.ttl {
                return Ok(Some(cached.tenant.clone()));
            }
        }

        let Some(row) = TenantRepo::find_active(&self.control, tenant_id).await? else {
            // Deactivated since the last refresh; stop serving the stale
            // entry.
            self.cache.write().await.remove(tenant_id);
            return Ok(None);
        };

        let mut cache = self.cache.write().await;
        match cache.get_mut(&row.tenant_id) {
            // The descriptor is unchanged; keep the existing pool so every
            // caller shares one, and restart the TTL clock.
            Some(cached) if cached.tenant.info.database_url == row.database_url => {
                cached.resolved_at = Instant::now();
                Ok(Some(cached.tenant.clone()))
            }
            _ => {
                let pool = create_pool_lazy(&row.database_url)?;
                let tenant = Arc::new(Tenant {
                    info: TenantInformation {
                        tenant_id: row.tenant_id.clone(),
                        display_name: row.display_name,
                        database_url: row.database_url,
                    },
                    pool,
                });
                cache.insert(
                    row.tenant_id,
                    CachedTenant {
                        tenant: tenant.clone(),
                        resolved_at: Instant::now(),
                    },
                );
                Ok(Some(tenant))
            }
        }
    }

    #[cfg(test)]
    async fn insert_cached(&self, tenant: Arc<Tenant>) {
        self.cache.write().await.insert(
            tenant.info.tenant_id.clone(),
            CachedTenant {
                tenant,
                resolved_at: Instant::now(),
            },
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
