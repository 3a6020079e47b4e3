//! Workflow graph domain types: states, transitions, and event triggers.
//!
//! A [`WorkflowTransition`] is one legal edge in a workflow graph. Its
//! `triggers` list is ordered — declaration order is execution order and the
//! engine never reorders it by action type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{DbId, PropertyMap};

// ---------------------------------------------------------------------------
// States and transitions
// ---------------------------------------------------------------------------

/// Immutable snapshot of a point in a workflow graph, resolved per artifact
/// per revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: DbId,
    pub workflow_id: DbId,
    pub name: String,
}

/// A single legal edge of a workflow graph with its ordered trigger list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTransition {
    pub id: DbId,
    pub workflow_id: DbId,
    pub name: String,
    pub from_state: WorkflowState,
    pub to_state: WorkflowState,
    /// Execution order. Must be preserved exactly as declared.
    pub triggers: Vec<WorkflowEventTrigger>,
}

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

/// A named, conditionally-executed unit of work attached to a transition.
///
/// If `condition` is absent the trigger always runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEventTrigger {
    pub name: String,
    pub action: TriggerAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<TriggerCondition>,
}

impl WorkflowEventTrigger {
    /// Whether this trigger should execute for the given property values.
    pub fn should_run(&self, properties: &PropertyMap) -> bool {
        match &self.condition {
            Some(condition) => condition.evaluate(properties),
            None => true,
        }
    }
}

/// The concrete operation a trigger performs.
///
/// `PropertyChange` is the synchronous class — it mutates the draft artifact
/// inside the state-change transaction. Every other variant is deferred: it
/// becomes an [`ActionMessage`](crate::messages::ActionMessage) on the queue
/// after the transition commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerAction {
    PropertyChange {
        property: String,
        value: Value,
    },
    Notification {
        recipients: Vec<String>,
        #[serde(default)]
        subject: Option<String>,
        #[serde(default)]
        body: Option<String>,
    },
    GenerateDescendants {
        #[serde(default)]
        template_id: Option<DbId>,
    },
    GenerateUserStories,
    GenerateTests,
    StateChange {
        target_state_id: DbId,
    },
}

impl TriggerAction {
    /// Synchronous-class actions run inside the state-change transaction.
    pub fn is_synchronous(&self) -> bool {
        matches!(self, TriggerAction::PropertyChange { .. })
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// Comparison operator for a [`TriggerCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    IsSet,
}

/// A structural condition evaluated against the transition's incoming
/// property values. There is deliberately no expression language here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerCondition {
    pub property: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: Value,
}

impl TriggerCondition {
    /// Evaluate against a property map. Missing properties compare as null.
    pub fn evaluate(&self, properties: &PropertyMap) -> bool {
        let actual = properties.get(&self.property).unwrap_or(&Value::Null);
        match self.operator {
            ConditionOperator::Equals => *actual == self.value,
            ConditionOperator::NotEquals => *actual != self.value,
            ConditionOperator::IsSet => !actual.is_null(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> PropertyMap {
        let mut map = PropertyMap::new();
        map.insert("Priority".to_string(), value);
        map
    }

    #[test]
    fn equals_condition_matches_value() {
        let condition = TriggerCondition {
            property: "Priority".to_string(),
            operator: ConditionOperator::Equals,
            value: json!("High"),
        };
        assert!(condition.evaluate(&props(json!("High"))));
        assert!(!condition.evaluate(&props(json!("Low"))));
    }

    #[test]
    fn not_equals_treats_missing_property_as_null() {
        let condition = TriggerCondition {
            property: "Priority".to_string(),
            operator: ConditionOperator::NotEquals,
            value: json!("High"),
        };
        assert!(condition.evaluate(&PropertyMap::new()));
    }

    #[test]
    fn is_set_requires_non_null() {
        let condition = TriggerCondition {
            property: "Priority".to_string(),
            operator: ConditionOperator::IsSet,
            value: Value::Null,
        };
        assert!(condition.evaluate(&props(json!("anything"))));
        assert!(!condition.evaluate(&props(Value::Null)));
        assert!(!condition.evaluate(&PropertyMap::new()));
    }

    #[test]
    fn trigger_without_condition_always_runs() {
        let trigger = WorkflowEventTrigger {
            name: "Set priority".to_string(),
            action: TriggerAction::PropertyChange {
                property: "Priority".to_string(),
                value: json!("High"),
            },
            condition: None,
        };
        assert!(trigger.should_run(&PropertyMap::new()));
    }

    #[test]
    fn only_property_change_is_synchronous() {
        let sync = TriggerAction::PropertyChange {
            property: "Priority".to_string(),
            value: json!("High"),
        };
        assert!(sync.is_synchronous());
        assert!(!TriggerAction::GenerateUserStories.is_synchronous());
        assert!(!TriggerAction::StateChange { target_state_id: 2 }.is_synchronous());
        assert!(!TriggerAction::Notification {
            recipients: vec!["a@x.com".to_string()],
            subject: None,
            body: None,
        }
        .is_synchronous());
    }

    #[test]
    fn trigger_action_round_trips_through_json() {
        let action = TriggerAction::Notification {
            recipients: vec!["a@x.com".to_string()],
            subject: Some("Moved".to_string()),
            body: None,
        };
        let encoded = serde_json::to_value(&action).expect("serialize");
        assert_eq!(encoded["kind"], "notification");
        let decoded: TriggerAction = serde_json::from_value(encoded).expect("deserialize");
        assert!(matches!(decoded, TriggerAction::Notification { .. }));
    }
}
