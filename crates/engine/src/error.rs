use stateline_core::error::CoreError;

/// Error type for state/transition resolution and transition execution.
///
/// Trigger failures are not errors at this level — they are reported in the
/// [`TransitionOutcome::Rejected`](crate::transition::TransitionOutcome)
/// error map so the caller sees every failing trigger by name.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A domain-level error (not found, forbidden, unsupported, ...).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for engine return values.
pub type EngineResult<T> = Result<T, EngineError>;
