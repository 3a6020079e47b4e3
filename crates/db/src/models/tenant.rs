//! Tenant registry and per-tenant settings row models.

use serde::Serialize;
use sqlx::FromRow;
use stateline_core::types::{DbId, Timestamp};

/// A row from the `tenants` registry table in the control database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TenantRow {
    pub tenant_id: String,
    pub display_name: String,
    /// Connection string for the tenant's own database.
    pub database_url: String,
    pub active: bool,
    pub created_at: Timestamp,
}

/// Per-tenant SMTP settings from `tenant_email_settings`.
#[derive(Debug, Clone, FromRow)]
pub struct EmailSettingsRow {
    pub tenant_id: String,
    pub smtp_host: String,
    pub smtp_port: i32,
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

/// Minimal user row needed to resolve an acting user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserRow {
    pub id: DbId,
    pub username: String,
    pub email: Option<String>,
    pub active: bool,
}
