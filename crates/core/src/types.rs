//! Primitive type aliases shared by every crate in the workspace.

use serde_json::Value;

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A JSON property document: property name to value. Trigger conditions and
/// validation rules both evaluate against one of these.
pub type PropertyMap = serde_json::Map<String, Value>;
