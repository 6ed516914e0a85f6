//! Attribute plan modifiers
//!
//! A plan modifier decides the planned value of one attribute from the
//! prior state, the proposed plan and the configuration. The host runs
//! them after it has built the proposed new state.

use crate::diag::Diagnostics;
use crate::private::PrivateState;
use crate::value::{AttrPath, Value};
use std::fmt;

/// Everything a modifier may look at
pub struct PlanModifierRequest<'a> {
    /// Attribute being modified
    pub path: AttrPath,
    /// Whole prior state (null while creating)
    pub state: &'a Value,
    /// Whole plan as modified so far
    pub plan: &'a Value,
    /// Whole configuration
    pub config: &'a Value,
    pub state_value: &'a Value,
    pub plan_value: &'a Value,
    pub config_value: &'a Value,
    pub private: &'a PrivateState,
}

/// What a modifier may change
#[derive(Debug, Clone, Default)]
pub struct PlanModifierResponse {
    pub plan_value: Value,
    pub requires_replace: bool,
    pub diagnostics: Diagnostics,
}

/// Decides a planned attribute value
pub trait PlanModifier: Send + Sync + fmt::Debug {
    /// Human-readable description for documentation
    fn description(&self) -> String;

    fn modify(&self, req: &PlanModifierRequest<'_>, resp: &mut PlanModifierResponse);
}

/// Copy the prior state value into an unknown plan value
///
/// For computed attributes whose value never changes after create.
#[derive(Debug, Clone, Copy, Default)]
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "Once set, the value of this attribute in state will not change.".to_string()
    }

    fn modify(&self, req: &PlanModifierRequest<'_>, resp: &mut PlanModifierResponse) {
        if req.state_value.is_null() || !req.plan_value.is_unknown() {
            return;
        }
        if req.config_value.is_unknown() {
            return;
        }
        resp.plan_value = req.state_value.clone();
    }
}

/// Replace the resource whenever the planned value differs from state
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiresReplace;

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "If the value of this attribute changes, the resource will be replaced.".to_string()
    }

    fn modify(&self, req: &PlanModifierRequest<'_>, resp: &mut PlanModifierResponse) {
        if req.state.is_null() || req.plan.is_null() {
            return;
        }
        if resp.plan_value == *req.state_value {
            return;
        }
        resp.requires_replace = true;
    }
}

/// Replace the resource when the value changes and a predicate agrees
pub struct RequiresReplaceIf {
    description: String,
    predicate: Box<dyn Fn(&PlanModifierRequest<'_>) -> bool + Send + Sync>,
}

impl RequiresReplaceIf {
    pub fn new(
        description: impl Into<String>,
        predicate: impl Fn(&PlanModifierRequest<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            predicate: Box::new(predicate),
        }
    }
}

impl fmt::Debug for RequiresReplaceIf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequiresReplaceIf")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl PlanModifier for RequiresReplaceIf {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn modify(&self, req: &PlanModifierRequest<'_>, resp: &mut PlanModifierResponse) {
        if req.state.is_null() || req.plan.is_null() {
            return;
        }
        if resp.plan_value == *req.state_value {
            return;
        }
        if (self.predicate)(req) {
            resp.requires_replace = true;
        }
    }
}
