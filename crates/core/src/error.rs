//! Domain error taxonomy shared by every crate.
//!
//! Not-found and forbidden are deliberately distinct: a caller who lacks
//! read permission still learns the artifact exists from `Forbidden`, so
//! visibility checks must pick the variant carefully.

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The entity does not exist, or is not visible at the requested
    /// revision.
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The acting user lacks the required permission flag.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The operation does not apply to this entity, e.g. a workflow
    /// transition on a folder artifact.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
