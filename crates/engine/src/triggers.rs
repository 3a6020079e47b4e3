//! Trigger execution: validation phase, synchronous phase, and deferred
//! message construction.
//!
//! Triggers run strictly in declaration order. The synchronous phase never
//! short-circuits — every synchronous trigger executes so the caller gets
//! the full `{trigger name -> message}` error map, not just the first
//! failure. When multiple triggers target the same property, the last one
//! to execute wins; the engine performs no deduplication.

use std::collections::BTreeMap;

use stateline_core::messages::{
    ActionMessage, ActionPayload, GeneratePayload, NotificationPayload, StateChangePayload,
};
use stateline_core::types::{DbId, PropertyMap};
use stateline_core::validation::{evaluate_rules, PropertyRule};
use stateline_core::workflow::{TriggerAction, WorkflowEventTrigger, WorkflowTransition};

use crate::draft::DraftStore;
use crate::params::ExecutionParameters;

/// Error map key for property validation failures.
pub const PROPERTIES_ERROR_KEY: &str = "Properties";

/// Run the validation phase: every registered rule against the incoming
/// property values. Returns the structured error map when anything fails;
/// no triggers may run in that case.
pub fn validate_properties(params: &ExecutionParameters) -> Option<BTreeMap<String, String>> {
    let rules: Vec<PropertyRule> = params.all_rules().cloned().collect();
    let violations = evaluate_rules(&rules, &params.properties);
    if violations.is_empty() {
        return None;
    }

    let joined = violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    let mut errors = BTreeMap::new();
    errors.insert(PROPERTIES_ERROR_KEY.to_string(), joined);
    Some(errors)
}

/// Execute the synchronous-class triggers of a transition against the open
/// transaction, in declaration order.
///
/// Returns the per-trigger error map. A non-empty map means the caller must
/// roll the transaction back — no partial application.
pub async fn run_synchronous<S: DraftStore + ?Sized>(
    store: &mut S,
    params: &ExecutionParameters,
    triggers: &[WorkflowEventTrigger],
) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();

    for trigger in triggers {
        if !trigger.action.is_synchronous() {
            continue;
        }
        if !trigger.should_run(&params.properties) {
            tracing::debug!(trigger = %trigger.name, "Trigger condition false, skipping");
            continue;
        }

        match &trigger.action {
            TriggerAction::PropertyChange { property, value } => {
                if params.reuse_template.is_read_only(property) {
                    errors.insert(
                        trigger.name.clone(),
                        format!("property '{property}' is read-only (inherited from template)"),
                    );
                    continue;
                }
                if let Err(e) = store
                    .set_property(params.version.artifact_id, property, value)
                    .await
                {
                    errors.insert(trigger.name.clone(), e.0);
                }
            }
            // Deferred-class actions never reach this phase.
            _ => continue,
        }
    }

    errors
}

/// Build one [`ActionMessage`] per deferred trigger whose condition holds.
///
/// Called only after the transition committed; the messages carry the
/// tenant, acting user, and committed revision.
pub fn build_deferred_messages(
    tenant_id: &str,
    user_id: DbId,
    transition: &WorkflowTransition,
    params: &ExecutionParameters,
) -> Vec<ActionMessage> {
    let mut messages = Vec::new();

    for trigger in &transition.triggers {
        if trigger.action.is_synchronous() || !trigger.should_run(&params.properties) {
            continue;
        }

        let artifact_id = params.version.artifact_id;
        let payload = match &trigger.action {
            TriggerAction::Notification {
                recipients,
                subject,
                body,
            } => ActionPayload::Notification(NotificationPayload {
                recipients: recipients.clone(),
                subject: subject.clone(),
                body: body.clone(),
            }),
            TriggerAction::GenerateDescendants { template_id } => {
                ActionPayload::GenerateDescendants(GeneratePayload {
                    artifact_id,
                    template_id: *template_id,
                })
            }
            TriggerAction::GenerateUserStories => {
                ActionPayload::GenerateUserStories(GeneratePayload {
                    artifact_id,
                    template_id: None,
                })
            }
            TriggerAction::GenerateTests => ActionPayload::GenerateTests(GeneratePayload {
                artifact_id,
                template_id: None,
            }),
            TriggerAction::StateChange { target_state_id } => {
                ActionPayload::StateChange(StateChangePayload {
                    source_artifact_id: artifact_id,
                    new_state_id: *target_state_id,
                    artifact_ids: Vec::new(),
                })
            }
            TriggerAction::PropertyChange { .. } => continue,
        };

        messages.push(
            ActionMessage::new(tenant_id, payload)
                .with_user(user_id)
                .with_revision(params.version.revision_id),
        );
    }

    messages
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
