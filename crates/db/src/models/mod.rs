//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row plus any insert DTOs. Status-style lookup values live in [`status`].

pub mod artifact;
pub mod job;
pub mod queue;
pub mod status;
pub mod tenant;
pub mod workflow;
