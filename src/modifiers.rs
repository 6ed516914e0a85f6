//! Plan modifiers shared by several resources.

use crate::marker;
use declarative::{
    AttrPath, PlanModifier, PlanModifierRequest, PlanModifierResponse, RequiresReplaceIf, Value,
};

/// Keep a server-computed value through plans that leave it unknown.
///
/// Like `UseStateForUnknown`, but only when private state says the value
/// in state came from the server. A value the user configured and then
/// removed stays unknown so the server can recompute it.
#[derive(Debug, Clone)]
pub struct UseStateIfServerComputed {
    key: &'static str,
}

impl UseStateIfServerComputed {
    pub const fn new(key: &'static str) -> Self {
        Self { key }
    }
}

impl PlanModifier for UseStateIfServerComputed {
    fn description(&self) -> String {
        "Keeps the value the server filled in until the attribute is configured.".to_string()
    }

    fn modify(&self, req: &PlanModifierRequest<'_>, resp: &mut PlanModifierResponse) {
        if req.state_value.is_null() {
            return;
        }
        if !resp.plan_value.is_unknown() {
            return;
        }
        // Values interpolated from other resources are unknown until apply.
        if req.config_value.is_unknown() {
            return;
        }
        if marker::is_server_computed(req.private, self.key) {
            log::trace!("{}: using server-computed value from state", req.path);
            resp.plan_value = req.state_value.clone();
        }
    }
}

/// Force an attribute to null when a sibling in the same variant family
/// is set.
#[derive(Debug, Clone)]
pub struct NullWhenSiblingSet {
    sibling: AttrPath,
}

impl NullWhenSiblingSet {
    /// `sibling` is an absolute path such as `certificate.ssh`.
    pub fn new(sibling: &str) -> Self {
        Self {
            sibling: AttrPath::parse(sibling),
        }
    }
}

impl PlanModifier for NullWhenSiblingSet {
    fn description(&self) -> String {
        format!("Set to null when {} is set.", self.sibling)
    }

    fn modify(&self, req: &PlanModifierRequest<'_>, resp: &mut PlanModifierResponse) {
        if req.plan.at(&self.sibling).is_null() {
            return;
        }
        resp.plan_value = Value::Null;
    }
}

/// Replace the resource when an optional object appears or disappears.
///
/// Used on variant families whose discriminator cannot change in place.
pub fn requires_replace_if_presence_changes() -> RequiresReplaceIf {
    RequiresReplaceIf::new(
        "Adding or removing this attribute replaces the resource.",
        |req| req.state_value.is_null() != req.plan_value.is_null(),
    )
}

/// Replace the resource when the value moves to or from `value`.
pub fn requires_replace_if_either_is(value: &'static str) -> RequiresReplaceIf {
    RequiresReplaceIf::new(
        format!("Changing this attribute to or from {value} replaces the resource."),
        move |req| {
            req.state_value.as_str() == Some(value) || req.plan_value.as_str() == Some(value)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Attribute, PrivateState, Schema, plan_resource_change};

    fn schema() -> Schema {
        Schema::new("account")
            .attribute("name", Attribute::string().required())
            .attribute(
                "certificate",
                Attribute::object([
                    (
                        "x509",
                        Attribute::object([("common_name", Attribute::string().optional())])
                            .optional()
                            .computed()
                            .plan_modifier(UseStateIfServerComputed::new("certificate.x509"))
                            .plan_modifier(NullWhenSiblingSet::new("certificate.ssh")),
                    ),
                    (
                        "ssh",
                        Attribute::object([("key_id", Attribute::string().optional())]).optional(),
                    ),
                ])
                .required(),
            )
            .attribute(
                "wifi",
                Attribute::object([("ssid", Attribute::string().required())])
                    .optional()
                    .plan_modifier(requires_replace_if_presence_changes()),
            )
    }

    fn x509(common_name: &str) -> Value {
        Value::object([("common_name", Value::string(common_name))])
    }

    fn state() -> Value {
        Value::object([
            ("name", Value::string("a")),
            (
                "certificate",
                Value::object([("x509", x509("server default")), ("ssh", Value::Null)]),
            ),
            ("wifi", Value::Null),
        ])
    }

    fn config(name: &str, certificate: Value) -> Value {
        Value::object([
            ("name", Value::string(name)),
            ("certificate", certificate),
            ("wifi", Value::Null),
        ])
    }

    fn marked() -> PrivateState {
        let mut private = PrivateState::new();
        private.set_key("certificate.x509", marker::SERVER_COMPUTED).unwrap();
        private
    }

    #[test]
    fn test_server_computed_value_survives_unrelated_change() {
        let config = config("b", Value::object([("x509", Value::Null), ("ssh", Value::Null)]));
        let change = plan_resource_change(&schema(), &state(), &config, &marked());
        assert_eq!(
            change.plan.at(&AttrPath::parse("certificate.x509")),
            &x509("server default")
        );
    }

    #[test]
    fn test_unmarked_value_stays_unknown() {
        let config = config("b", Value::object([("x509", Value::Null), ("ssh", Value::Null)]));
        let change = plan_resource_change(&schema(), &state(), &config, &PrivateState::new());
        assert!(change.plan.at(&AttrPath::parse("certificate.x509")).is_unknown());
    }

    #[test]
    fn test_unknown_config_is_left_alone() {
        let config = config("b", Value::object([("x509", Value::Unknown), ("ssh", Value::Null)]));
        let change = plan_resource_change(&schema(), &state(), &config, &marked());
        assert!(change.plan.at(&AttrPath::parse("certificate.x509")).is_unknown());
    }

    #[test]
    fn test_create_keeps_unknown() {
        let config = config("a", Value::object([("x509", Value::Null), ("ssh", Value::Null)]));
        let change = plan_resource_change(&schema(), &Value::Null, &config, &marked());
        assert!(change.plan.at(&AttrPath::parse("certificate.x509")).is_unknown());
    }

    #[test]
    fn test_sibling_forces_null() {
        let ssh = Value::object([("key_id", Value::string("host"))]);
        let config = config("a", Value::object([("x509", Value::Null), ("ssh", ssh.clone())]));
        let change = plan_resource_change(&schema(), &state(), &config, &marked());
        assert!(change.plan.at(&AttrPath::parse("certificate.x509")).is_null());
        assert_eq!(change.plan.at(&AttrPath::parse("certificate.ssh")), &ssh);
    }

    #[test]
    fn test_variant_presence_change_replaces() {
        let mut config = config("a", Value::object([("x509", Value::Null), ("ssh", Value::Null)]));
        config
            .set_at(
                &AttrPath::root("wifi"),
                Value::object([("ssid", Value::string("corp"))]),
            )
            .unwrap();
        let change = plan_resource_change(&schema(), &state(), &config, &marked());
        assert_eq!(change.requires_replace, vec![AttrPath::root("wifi")]);
    }

    #[test]
    fn test_requires_replace_if_either_is() {
        let schema = Schema::new("credential").attribute(
            "protection",
            Attribute::string()
                .optional()
                .plan_modifier(requires_replace_if_either_is("HARDWARE_ATTESTED")),
        );
        let state = Value::object([("protection", Value::string("NONE"))]);
        let to_hardware = Value::object([("protection", Value::string("HARDWARE"))]);
        let to_attested = Value::object([("protection", Value::string("HARDWARE_ATTESTED"))]);
        let private = PrivateState::new();

        let change = plan_resource_change(&schema, &state, &to_hardware, &private);
        assert!(change.requires_replace.is_empty());

        let change = plan_resource_change(&schema, &state, &to_attested, &private);
        assert_eq!(change.requires_replace, vec![AttrPath::root("protection")]);

        let change = plan_resource_change(&schema, &to_attested, &to_hardware, &private);
        assert_eq!(change.requires_replace, vec![AttrPath::root("protection")]);
    }
}
