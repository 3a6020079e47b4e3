//! Asynchronous action dispatch: tenant resolution, handler registry, the
//! durable-queue dispatcher loop, and the action handlers themselves.
//!
//! The queue guarantees at-least-once delivery. Handlers must therefore be
//! safe to re-run; a duplicated email on redelivery is an accepted tradeoff,
//! not a correctness bug.

pub mod config;
pub mod dispatcher;
pub mod email;
pub mod handlers;
pub mod registry;
pub mod stores;
pub mod tenants;

pub use config::DispatcherConfig;
pub use dispatcher::MessageDispatcher;
pub use registry::{ActionHandler, HandlerOutcome, HandlerRegistry};
pub use tenants::{Tenant, TenantInformation, TenantResolver};
