//! Workflow transition engine.
//!
//! This crate owns the synchronous half of the system:
//!
//! - [`StateRepository`] — resolves an artifact's current workflow state and
//!   the legal outbound transitions, enforcing permission and revision
//!   visibility rules.
//! - [`TransitionEngine`] — runs a transition attempt end to end: property
//!   validation, synchronous triggers inside the state-write transaction,
//!   and post-commit enqueue of the deferred triggers' action messages.
//!
//! The asynchronous half (dispatcher and handlers) lives in
//! `stateline-dispatch`.

pub mod draft;
pub mod error;
pub mod params;
pub mod states;
pub mod transition;
pub mod triggers;

pub use draft::{DraftStore, TriggerActionError};
pub use error::EngineError;
pub use params::{ArtifactVersionInfo, ExecutionParameters, ReuseTemplate};
pub use states::StateRepository;
pub use transition::{TransitionEngine, TransitionOutcome, TransitionStore, TransitionUnit};
