//! Attribute and configuration validators

use crate::diag::Diagnostics;
use crate::value::{AttrPath, Value};
use std::fmt;

/// Validates a single configured attribute value
///
/// Validators are not called for null or unknown values.
pub trait ValueValidator: Send + Sync + fmt::Debug {
    fn description(&self) -> String;

    fn validate(&self, path: &AttrPath, value: &Value, diags: &mut Diagnostics);
}

/// Validates relationships across a whole configuration
pub trait ConfigValidator: Send + Sync + fmt::Debug {
    fn description(&self) -> String;

    fn validate(&self, config: &Value, diags: &mut Diagnostics);
}

/// String must be one of a fixed set
#[derive(Debug, Clone)]
pub struct OneOf {
    allowed: Vec<String>,
}

impl OneOf {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }
}

impl ValueValidator for OneOf {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, path: &AttrPath, value: &Value, diags: &mut Diagnostics) {
        let Some(s) = value.as_str() else {
            return;
        };
        if !self.allowed.iter().any(|a| a == s) {
            diags.add_attribute_error(
                path.clone(),
                "Invalid Attribute Value Match",
                format!("Attribute {path} {}, got: {s:?}", self.description()),
            );
        }
    }
}

/// At most one of the given attributes may be set
#[derive(Debug, Clone)]
pub struct AtMostOneOf {
    paths: Vec<AttrPath>,
}

impl AtMostOneOf {
    pub fn new(paths: impl IntoIterator<Item = AttrPath>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }
}

fn joined(paths: &[AttrPath]) -> String {
    paths
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ConfigValidator for AtMostOneOf {
    fn description(&self) -> String {
        format!("at most one of [{}] may be set", joined(&self.paths))
    }

    fn validate(&self, config: &Value, diags: &mut Diagnostics) {
        let set: Vec<&AttrPath> = self
            .paths
            .iter()
            .filter(|p| !config.at(p).is_null())
            .collect();
        if set.len() > 1 {
            diags.add_attribute_error(
                set[1].clone(),
                "Invalid Attribute Combination",
                format!(
                    "These attributes cannot be configured together: [{}]",
                    joined(&self.paths)
                ),
            );
        }
    }
}

/// Exactly one of the given attributes must be set
#[derive(Debug, Clone)]
pub struct ExactlyOneOf {
    paths: Vec<AttrPath>,
}

impl ExactlyOneOf {
    pub fn new(paths: impl IntoIterator<Item = AttrPath>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }
}

impl ConfigValidator for ExactlyOneOf {
    fn description(&self) -> String {
        format!("exactly one of [{}] must be set", joined(&self.paths))
    }

    fn validate(&self, config: &Value, diags: &mut Diagnostics) {
        // An unknown value may still resolve to null, so defer judgement.
        if self.paths.iter().any(|p| config.at(p).is_unknown()) {
            return;
        }
        let set = self
            .paths
            .iter()
            .filter(|p| !config.at(p).is_null())
            .count();
        match set {
            1 => {}
            0 => diags.add_error(
                "Invalid Attribute Combination",
                format!(
                    "No attribute specified when one (and only one) of [{}] is required",
                    joined(&self.paths)
                ),
            ),
            _ => diags.add_error(
                "Invalid Attribute Combination",
                format!(
                    "{set} attributes specified when one (and only one) of [{}] is required",
                    joined(&self.paths)
                ),
            ),
        }
    }
}
