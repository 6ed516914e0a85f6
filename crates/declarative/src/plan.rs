//! Plan computation - proposed new state plus attribute plan modifiers
//!
//! Mirrors the host's planning step closely enough that plan modifiers
//! can be exercised end to end:
//!
//! 1. Build the proposed new state from configuration, keeping prior
//!    values for computed attributes the configuration leaves null.
//! 2. If anything changed (or the resource is new), mark computed
//!    attributes that the configuration leaves null as unknown.
//! 3. Run every attribute's plan modifiers, parents before children.

use crate::diag::Diagnostics;
use crate::modifier::{PlanModifierRequest, PlanModifierResponse};
use crate::private::PrivateState;
use crate::schema::{AttrKind, Attribute, Schema};
use crate::value::{AttrPath, Value};
use std::collections::BTreeMap;

/// Outcome of planning one resource instance
#[derive(Debug, Clone, Default)]
pub struct PlannedChange {
    /// Planned new state; null when the resource is being destroyed
    pub plan: Value,
    /// Attributes whose change forces replacement
    pub requires_replace: Vec<AttrPath>,
    pub diagnostics: Diagnostics,
}

impl PlannedChange {
    /// Whether applying the plan would change anything
    pub fn has_changes(&self, prior: &Value) -> bool {
        self.plan != *prior
    }
}

/// Plan a change for one resource instance.
pub fn plan_resource_change(
    schema: &Schema,
    prior: &Value,
    config: &Value,
    private: &PrivateState,
) -> PlannedChange {
    if config.is_null() {
        return PlannedChange::default();
    }

    let mut plan = propose(&schema.attributes, prior, config);
    if prior.is_null() || plan != *prior {
        mark_computed_unknown(&schema.attributes, &AttrPath::empty(), config, &mut plan);
    }

    let mut change = PlannedChange {
        plan: Value::Null,
        requires_replace: Vec::new(),
        diagnostics: Diagnostics::new(),
    };
    let ctx = Walk {
        state: prior,
        config,
        private,
    };
    ctx.modify(&schema.attributes, &AttrPath::empty(), &mut plan, &mut change);
    change.plan = plan;
    log::trace!(
        "planned change with {} replacement trigger(s)",
        change.requires_replace.len()
    );
    change
}

fn propose(attributes: &BTreeMap<String, Attribute>, prior: &Value, config: &Value) -> Value {
    let mut fields = BTreeMap::new();
    for (name, attribute) in attributes {
        let path = AttrPath::root(name.clone());
        let config_value = config.at(&path);
        let prior_value = prior.at(&path);

        let proposed = match (&attribute.kind, config_value) {
            (_, Value::Null) if attribute.computed => prior_value.clone(),
            (AttrKind::Object(nested), Value::Object(_)) => {
                propose(nested, prior_value, config_value)
            }
            _ => config_value.clone(),
        };
        fields.insert(name.clone(), proposed);
    }
    Value::Object(fields)
}

fn mark_computed_unknown(
    attributes: &BTreeMap<String, Attribute>,
    parent: &AttrPath,
    config: &Value,
    plan: &mut Value,
) {
    for (name, attribute) in attributes {
        let path = parent.clone().attr(name.clone());
        let config_value = config.at(&path);
        if attribute.computed && config_value.is_null() {
            // Writes below a known parent object cannot fail.
            let _ = plan.set_at(&path, Value::Unknown);
            continue;
        }
        if let (AttrKind::Object(nested), Value::Object(_)) = (&attribute.kind, config_value) {
            mark_computed_unknown(nested, &path, config, plan);
        }
    }
}

struct Walk<'a> {
    state: &'a Value,
    config: &'a Value,
    private: &'a PrivateState,
}

impl Walk<'_> {
    fn modify(
        &self,
        attributes: &BTreeMap<String, Attribute>,
        parent: &AttrPath,
        plan: &mut Value,
        change: &mut PlannedChange,
    ) {
        for (name, attribute) in attributes {
            let path = parent.clone().attr(name.clone());

            if !attribute.plan_modifiers.is_empty() {
                let snapshot = plan.clone();
                let mut resp = PlanModifierResponse {
                    plan_value: snapshot.at(&path).clone(),
                    ..Default::default()
                };
                for modifier in &attribute.plan_modifiers {
                    let current = resp.plan_value.clone();
                    let req = PlanModifierRequest {
                        path: path.clone(),
                        state: self.state,
                        plan: &snapshot,
                        config: self.config,
                        state_value: self.state.at(&path),
                        plan_value: &current,
                        config_value: self.config.at(&path),
                        private: self.private,
                    };
                    modifier.modify(&req, &mut resp);
                    if resp.diagnostics.has_error() {
                        break;
                    }
                }
                if resp.requires_replace {
                    change.requires_replace.push(path.clone());
                }
                change
                    .diagnostics
                    .extend(std::mem::take(&mut resp.diagnostics));
                if let Err(err) = plan.set_at(&path, resp.plan_value) {
                    change.diagnostics.add(err.into());
                }
            }

            if let AttrKind::Object(nested) = &attribute.kind {
                if matches!(plan.at(&path), Value::Object(_)) {
                    self.modify(nested, &path, plan, change);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::{RequiresReplace, UseStateForUnknown};

    fn schema() -> Schema {
        Schema::new("test")
            .attribute(
                "id",
                Attribute::string()
                    .computed()
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute(
                "name",
                Attribute::string().required().plan_modifier(RequiresReplace),
            )
            .attribute("admin_emails", Attribute::string_list().optional())
            .attribute("domain", Attribute::string().computed())
            .attribute(
                "certificate",
                Attribute::object([
                    ("duration", Attribute::string().optional().computed()),
                    ("authority_id", Attribute::string().required()),
                ])
                .required(),
            )
    }

    fn config(name: &str, emails: Vec<&str>) -> Value {
        Value::object([
            ("id", Value::Null),
            ("name", Value::string(name)),
            (
                "admin_emails",
                Value::List(emails.into_iter().map(Value::string).collect()),
            ),
            ("domain", Value::Null),
            (
                "certificate",
                Value::object([("duration", Value::Null), ("authority_id", Value::string("a"))]),
            ),
        ])
    }

    fn state(name: &str, emails: Vec<&str>) -> Value {
        Value::object([
            ("id", Value::string("1")),
            ("name", Value::string(name)),
            (
                "admin_emails",
                Value::List(emails.into_iter().map(Value::string).collect()),
            ),
            ("domain", Value::string("foo.ca")),
            (
                "certificate",
                Value::object([
                    ("duration", Value::string("24h")),
                    ("authority_id", Value::string("a")),
                ]),
            ),
        ])
    }

    #[test]
    fn test_create_marks_computed_unknown() {
        let change = plan_resource_change(
            &schema(),
            &Value::Null,
            &config("foo", vec![]),
            &PrivateState::new(),
        );
        assert!(change.plan.at(&AttrPath::root("id")).is_unknown());
        assert!(change.plan.at(&AttrPath::root("domain")).is_unknown());
        assert!(change.plan.at(&AttrPath::parse("certificate.duration")).is_unknown());
        assert!(change.requires_replace.is_empty());
    }

    #[test]
    fn test_no_change_keeps_prior() {
        let prior = state("foo", vec!["a@b.com"]);
        let change = plan_resource_change(
            &schema(),
            &prior,
            &config("foo", vec!["a@b.com"]),
            &PrivateState::new(),
        );
        assert!(!change.has_changes(&prior));
    }

    #[test]
    fn test_update_unknowns_then_use_state() {
        let prior = state("foo", vec![]);
        let change = plan_resource_change(
            &schema(),
            &prior,
            &config("foo", vec!["a@b.com"]),
            &PrivateState::new(),
        );
        // id carries over through its modifier; domain has none and stays unknown.
        assert_eq!(change.plan.at(&AttrPath::root("id")), &Value::string("1"));
        assert!(change.plan.at(&AttrPath::root("domain")).is_unknown());
        assert!(change.requires_replace.is_empty());
    }

    #[test]
    fn test_requires_replace_reported() {
        let prior = state("foo", vec![]);
        let change = plan_resource_change(
            &schema(),
            &prior,
            &config("bar", vec![]),
            &PrivateState::new(),
        );
        assert_eq!(change.requires_replace, vec![AttrPath::root("name")]);
    }

    #[test]
    fn test_destroy_plans_null() {
        let prior = state("foo", vec![]);
        let change = plan_resource_change(&schema(), &prior, &Value::Null, &PrivateState::new());
        assert!(change.plan.is_null());
    }
}
