//! Shared domain types for the Stateline workflow engine.
//!
//! This crate is database-free. It defines:
//!
//! - [`types`] — primitive aliases (`DbId`, `Timestamp`).
//! - [`error`] — the [`CoreError`](error::CoreError) taxonomy shared by all
//!   crates.
//! - [`workflow`] — workflow states, transitions, triggers, actions, and
//!   trigger conditions.
//! - [`validation`] — property validation rules and their evaluator.
//! - [`messages`] — the [`ActionMessage`](messages::ActionMessage) envelope
//!   exchanged between the synchronous transition path and the asynchronous
//!   workers.
//! - [`batching`] — fan-out batch splitting bounded by
//!   [`MAX_FANOUT_BATCH`](batching::MAX_FANOUT_BATCH).

pub mod batching;
pub mod error;
pub mod messages;
pub mod types;
pub mod validation;
pub mod workflow;

pub use error::CoreError;
pub use messages::{ActionMessage, ActionPayload, ActionType, ChangeType};
pub use types::{DbId, PropertyMap, Timestamp};
pub use workflow::{TriggerAction, WorkflowEventTrigger, WorkflowState, WorkflowTransition};
