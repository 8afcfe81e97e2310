//! Planned changes toward declared configuration

use crate::object::AttrMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of change the controller performs for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Create a new remote object.
    Create,
    /// Apply a partial update to an existing object.
    Update,
    /// Delete an existing object.
    Delete,
    /// Declared and observed state already converge.
    NoOp,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::Create => write!(f, "create"),
            ActionKind::Update => write!(f, "update"),
            ActionKind::Delete => write!(f, "delete"),
            ActionKind::NoOp => write!(f, "no-op"),
        }
    }
}

/// A single field-level difference between declared and observed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,

    /// Last observed remote value, absent when the field was never set.
    pub before: Option<Value>,

    /// Declared value the update will apply.
    pub after: Value,
}

/// One planned remote mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub action: ActionKind,

    /// Resource kind the action targets.
    pub kind: String,

    /// Remote identity, empty for creates until the platform assigns one.
    pub resource_id: String,

    /// Field-level changes carried by an update; empty otherwise.
    pub changes: Vec<FieldChange>,

    pub description: String,
}

impl Action {
    pub fn create(kind: &str, resource_id: &str) -> Self {
        Self {
            action: ActionKind::Create,
            kind: kind.to_string(),
            resource_id: resource_id.to_string(),
            changes: Vec::new(),
            description: format!("create {kind} {resource_id}"),
        }
    }

    pub fn update(kind: &str, resource_id: &str, changes: Vec<FieldChange>) -> Self {
        let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
        Self {
            action: ActionKind::Update,
            kind: kind.to_string(),
            resource_id: resource_id.to_string(),
            description: format!("update {kind} {resource_id} ({})", fields.join(", ")),
            changes,
        }
    }

    pub fn delete(kind: &str, resource_id: &str) -> Self {
        Self {
            action: ActionKind::Delete,
            kind: kind.to_string(),
            resource_id: resource_id.to_string(),
            changes: Vec::new(),
            description: format!("delete {kind} {resource_id}"),
        }
    }

    /// The partial attribute payload an update action sends.
    pub fn patch(&self) -> AttrMap {
        self.changes
            .iter()
            .map(|c| (c.field.clone(), c.after.clone()))
            .collect()
    }
}

/// The set of actions one reconciliation decided on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action != ActionKind::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            has_changes: false,
        }
    }

    pub fn actions_of(&self, action: ActionKind) -> Vec<&Action> {
        self.actions.iter().filter(|a| a.action == action).collect()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_of(ActionKind::Create).len(),
            update: self.actions_of(ActionKind::Update).len(),
            delete: self.actions_of(ActionKind::Delete).len(),
            no_change: self.actions_of(ActionKind::NoOp).len(),
        }
    }
}

/// Counts of planned actions by kind.
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}

/// Field-level diff between declared configuration and the last observed
/// snapshot, restricted to the managed fields. Declared fields missing
/// from the observed side count as changes; fields the caller never
/// declared are skipped.
pub fn diff_attrs(declared: &AttrMap, observed: &AttrMap, managed: &[&str]) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    for &field in managed {
        let Some(wanted) = declared.get(field) else {
            continue;
        };
        let current = observed.get(field);
        if current != Some(wanted) {
            changes.push(FieldChange {
                field: field.to_string(),
                before: current.cloned(),
                after: wanted.clone(),
            });
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn diff_touches_only_changed_managed_fields() {
        let declared: AttrMap = [
            ("name".to_string(), json!("security_group_2")),
            ("description".to_string(), json!("acceptance test group")),
        ]
        .into_iter()
        .collect();
        let observed: AttrMap = [
            ("name".to_string(), json!("security_group")),
            ("description".to_string(), json!("acceptance test group")),
            ("status".to_string(), json!("ACTIVE")),
        ]
        .into_iter()
        .collect();

        let changes = diff_attrs(&declared, &observed, &["name", "description"]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "name");
        assert_eq!(changes[0].before, Some(json!("security_group")));
        assert_eq!(changes[0].after, json!("security_group_2"));
    }

    #[test]
    fn converged_state_diffs_to_nothing() {
        let declared: AttrMap = [("name".to_string(), json!("g1"))].into_iter().collect();
        let observed = declared.clone();
        assert!(diff_attrs(&declared, &observed, &["name"]).is_empty());
    }

    #[test]
    fn unmanaged_fields_never_produce_changes() {
        let declared: AttrMap = [("size".to_string(), json!(40))].into_iter().collect();
        let observed: AttrMap = [("size".to_string(), json!(20))].into_iter().collect();
        assert!(diff_attrs(&declared, &observed, &["name"]).is_empty());
    }

    #[test]
    fn plan_summary_counts_by_action() {
        let plan = Plan::new(vec![
            Action::create("security_group", "sg-1"),
            Action::update(
                "security_group",
                "sg-2",
                vec![FieldChange {
                    field: "name".to_string(),
                    before: Some(json!("old")),
                    after: json!("new"),
                }],
            ),
        ]);

        assert!(plan.has_changes);
        assert_eq!(
            plan.summary().to_string(),
            "1 to create, 1 to update, 0 to delete, 0 unchanged"
        );
    }

    #[test]
    fn update_patch_carries_only_changed_fields() {
        let action = Action::update(
            "security_group",
            "sg-1",
            vec![FieldChange {
                field: "name".to_string(),
                before: Some(json!("security_group")),
                after: json!("security_group_2"),
            }],
        );
        let patch = action.patch();
        assert_eq!(patch.len(), 1);
        assert_eq!(patch.get("name"), Some(&json!("security_group_2")));
    }
}
