//! Per-transition execution context.

use std::collections::HashSet;

use serde_json::Value;
use stateline_core::types::{DbId, PropertyMap};
use stateline_core::validation::PropertyRule;

/// Version-control coordinates of the artifact being transitioned.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactVersionInfo {
    pub artifact_id: DbId,
    /// The revision the caller is transitioning; becomes the revision of the
    /// new state row on commit.
    pub revision_id: DbId,
}

/// Properties that are read-only on this artifact because they are inherited
/// through a reuse template. Synchronous property changes targeting them
/// fail rather than silently detaching the inheritance.
#[derive(Debug, Clone, Default)]
pub struct ReuseTemplate {
    pub read_only_properties: HashSet<String>,
}

impl ReuseTemplate {
    pub fn is_read_only(&self, property: &str) -> bool {
        self.read_only_properties.contains(property)
    }
}

/// Execution context shared by every trigger of one transition attempt.
///
/// The transactional store handle is deliberately NOT part of this struct —
/// it is owned by the synchronous phase of a single attempt and passed
/// separately, so it can never leak past commit/rollback.
#[derive(Debug, Clone)]
pub struct ExecutionParameters {
    pub version: ArtifactVersionInfo,
    pub reuse_template: ReuseTemplate,
    /// Fixed validator list (e.g. numeric-range) run before any trigger.
    pub validators: Vec<PropertyRule>,
    /// Rules derived from the project's custom property-type definitions,
    /// evaluated together with `validators`.
    pub custom_property_rules: Vec<PropertyRule>,
    /// Incoming property values for the transition request.
    pub properties: PropertyMap,
}

impl ExecutionParameters {
    /// All rules to run during the validation phase, fixed validators first.
    pub fn all_rules(&self) -> impl Iterator<Item = &PropertyRule> {
        self.validators.iter().chain(self.custom_property_rules.iter())
    }
}
