//! Value validators shared by resource schemas.

use declarative::{AttrPath, Diagnostics, Value, ValueValidator};
use regex::Regex;

/// A single DNS label: lowercase letters, digits and inner hyphens.
pub const DNS_LABEL: &str = r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$";

/// String must match a regular expression
#[derive(Debug, Clone)]
pub struct Matches {
    pattern: Regex,
    expected: &'static str,
}

impl Matches {
    /// `expected` names the format in error messages.
    ///
    /// Patterns are compile-time constants; an invalid one is a
    /// programming error and reported when the schema is built.
    pub fn new(pattern: &str, expected: &'static str) -> anyhow::Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            expected,
        })
    }

    /// A DNS label such as an authority subdomain.
    pub fn dns_label() -> anyhow::Result<Self> {
        Self::new(DNS_LABEL, "a DNS label")
    }
}

impl ValueValidator for Matches {
    fn description(&self) -> String {
        format!("value must be {}", self.expected)
    }

    fn validate(&self, path: &AttrPath, value: &Value, diags: &mut Diagnostics) {
        let Some(s) = value.as_str() else {
            return;
        };
        if !self.pattern.is_match(s) {
            diags.add_attribute_error(
                path.clone(),
                "Invalid Attribute Value Match",
                format!("Attribute {path} {}, got: {s:?}", self.description()),
            );
        }
    }
}
