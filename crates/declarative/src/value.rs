//! Dynamic attribute values and attribute paths
//!
//! [`Value`] is the untyped tree the host runtime hands to a resource:
//! every node is null, unknown, or a known primitive or collection.
//! [`AttrPath`] locates a node inside that tree.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

static NULL: Value = Value::Null;
static UNKNOWN: Value = Value::Unknown;

/// A framework value in one of the four semantic states
///
/// `Null` and `Unknown` carry no payload; every other variant is known.
/// Known-empty values (`String("")`, `List(vec![])`, ...) are distinct
/// from `Null`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Value {
    /// Explicitly absent
    #[default]
    Null,
    /// Will be computed later
    Unknown,
    String(String),
    Bool(bool),
    Int(i64),
    List(Vec<Value>),
    /// Unordered collection; build with [`Value::new_set`] to keep it canonical
    Set(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Build a set value, sorting and de-duplicating the elements.
    pub fn new_set(mut elements: Vec<Value>) -> Self {
        elements.sort();
        elements.dedup();
        Self::Set(elements)
    }

    /// Build an object value from `(name, value)` pairs.
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Shorthand for a known string.
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Neither null nor unknown.
    pub fn is_known(&self) -> bool {
        !self.is_null() && !self.is_unknown()
    }

    /// True when no unknown value appears anywhere in the tree.
    pub fn is_fully_known(&self) -> bool {
        match self {
            Self::Unknown => false,
            Self::List(items) | Self::Set(items) => items.iter().all(Self::is_fully_known),
            Self::Map(entries) | Self::Object(entries) => {
                entries.values().all(Self::is_fully_known)
            }
            _ => true,
        }
    }

    /// Name of the value kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Unknown => "unknown",
            Self::String(_) => "string",
            Self::Bool(_) => "bool",
            Self::Int(_) => "number",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Look up a descendant value.
    ///
    /// Missing children and children of null parents resolve to null;
    /// children of unknown parents resolve to unknown.
    pub fn at(&self, path: &AttrPath) -> &Value {
        let mut current = self;
        for step in path.steps() {
            current = match (current, step) {
                (Self::Unknown, _) => return &UNKNOWN,
                (Self::Object(fields), PathStep::Attr(name)) => {
                    fields.get(name).unwrap_or(&NULL)
                }
                (Self::Map(entries), PathStep::Key(key)) => entries.get(key).unwrap_or(&NULL),
                (Self::List(items) | Self::Set(items), PathStep::Index(i)) => {
                    items.get(*i).unwrap_or(&NULL)
                }
                _ => return &NULL,
            };
        }
        current
    }

    /// Write a descendant value, creating intermediate objects under null parents.
    pub fn set_at(&mut self, path: &AttrPath, value: Value) -> Result<()> {
        let Some((last, parents)) = path.steps().split_last() else {
            *self = value;
            return Ok(());
        };

        let mut current = self;
        for step in parents {
            current = current.child_mut(step, path)?;
        }

        if current.is_null() && matches!(last, PathStep::Attr(_)) {
            *current = Value::Object(BTreeMap::new());
        }

        match (current, last) {
            (Value::Object(fields), PathStep::Attr(name)) => {
                fields.insert(name.clone(), value);
                Ok(())
            }
            (Value::Map(entries), PathStep::Key(key)) => {
                entries.insert(key.clone(), value);
                Ok(())
            }
            (Value::List(items) | Value::Set(items), PathStep::Index(i)) if *i < items.len() => {
                items[*i] = value;
                Ok(())
            }
            (other, _) => Err(Error::InvalidPath {
                path: path.clone(),
                reason: format!("parent is {}", other.kind()),
            }),
        }
    }

    fn child_mut<'a>(&'a mut self, step: &PathStep, full: &AttrPath) -> Result<&'a mut Value> {
        if self.is_null() && matches!(step, PathStep::Attr(_)) {
            *self = Value::Object(BTreeMap::new());
        }
        match (self, step) {
            (Value::Object(fields), PathStep::Attr(name)) => {
                Ok(fields.entry(name.clone()).or_insert(Value::Null))
            }
            (Value::Map(entries), PathStep::Key(key)) => {
                Ok(entries.entry(key.clone()).or_insert(Value::Null))
            }
            (Value::List(items) | Value::Set(items), PathStep::Index(i)) => {
                let len = items.len();
                items.get_mut(*i).ok_or_else(|| Error::InvalidPath {
                    path: full.clone(),
                    reason: format!("index {i} out of range for {len} elements"),
                })
            }
            (other, _) => Err(Error::InvalidPath {
                path: full.clone(),
                reason: format!("cannot descend into {}", other.kind()),
            }),
        }
    }

    /// Render the value as JSON for display; unknowns become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Null | Self::Unknown => Json::Null,
            Self::String(s) => Json::String(s.clone()),
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(n) => Json::from(*n),
            Self::List(items) | Self::Set(items) => {
                Json::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Map(entries) | Self::Object(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

/// One step of an attribute path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathStep {
    /// Object attribute name
    Attr(String),
    /// List or set element index
    Index(usize),
    /// Map key
    Key(String),
}

/// A rooted sequence of steps locating a value in the tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrPath {
    steps: Vec<PathStep>,
}

impl AttrPath {
    /// The empty path, addressing the whole tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A path with a single top-level attribute.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            steps: vec![PathStep::Attr(name.into())],
        }
    }

    /// Parse a dotted attribute path such as `certificate.x509`.
    ///
    /// Only attribute steps are supported; indexes and keys are built
    /// with [`AttrPath::index`] and [`AttrPath::key`].
    pub fn parse(dotted: &str) -> Self {
        Self {
            steps: dotted
                .split('.')
                .filter(|s| !s.is_empty())
                .map(|s| PathStep::Attr(s.to_string()))
                .collect(),
        }
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>) -> Self {
        self.steps.push(PathStep::Attr(name.into()));
        self
    }

    #[must_use]
    pub fn index(mut self, index: usize) -> Self {
        self.steps.push(PathStep::Index(index));
        self
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.steps.push(PathStep::Key(key.into()));
        self
    }

    /// The path with `step` prepended.
    #[must_use]
    pub fn prefixed(mut self, step: PathStep) -> Self {
        self.steps.insert(0, step);
        self
    }

    /// The parent path; the empty path is its own parent.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut steps = self.steps.clone();
        steps.pop();
        Self { steps }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn last(&self) -> Option<&PathStep> {
        self.steps.last()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "<root>");
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Attr(name) if i == 0 => write!(f, "{name}")?,
                PathStep::Attr(name) => write!(f, ".{name}")?,
                PathStep::Index(index) => write!(f, "[{index}]")?,
                PathStep::Key(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        Value::object([
            ("name", Value::string("foo")),
            (
                "certificate",
                Value::object([
                    ("x509", Value::Null),
                    ("duration", Value::Unknown),
                ]),
            ),
            ("tags", Value::List(vec![Value::string("a"), Value::string("b")])),
        ])
    }

    #[test]
    fn test_at_resolves_nested() {
        let v = sample();
        assert_eq!(v.at(&AttrPath::root("name")), &Value::string("foo"));
        assert_eq!(
            v.at(&AttrPath::root("tags").index(1)),
            &Value::string("b")
        );
        assert!(v.at(&AttrPath::parse("certificate.duration")).is_unknown());
    }

    #[test]
    fn test_at_missing_and_null_parents_are_null() {
        let v = sample();
        assert!(v.at(&AttrPath::root("missing")).is_null());
        assert!(v.at(&AttrPath::parse("certificate.x509.common_name")).is_null());
    }

    #[test]
    fn test_at_unknown_parent_is_unknown() {
        let v = Value::object([("certificate", Value::Unknown)]);
        assert!(v.at(&AttrPath::parse("certificate.x509")).is_unknown());
    }

    #[test]
    fn test_set_at_creates_objects_under_null() {
        let mut v = Value::Null;
        v.set_at(&AttrPath::parse("certificate.x509"), Value::Bool(true))
            .unwrap();
        assert_eq!(v.at(&AttrPath::parse("certificate.x509")), &Value::Bool(true));
    }

    #[test]
    fn test_set_at_rejects_scalar_parent() {
        let mut v = sample();
        let result = v.set_at(&AttrPath::parse("name.inner"), Value::Null);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_set_is_canonical() {
        let a = Value::new_set(vec![Value::string("b"), Value::string("a"), Value::string("b")]);
        let b = Value::new_set(vec![Value::string("a"), Value::string("b")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_known_empty_differs_from_null() {
        assert_ne!(Value::List(vec![]), Value::Null);
        assert_ne!(Value::string(""), Value::Null);
        assert!(Value::List(vec![]).is_known());
    }

    #[test]
    fn test_fully_known() {
        assert!(!sample().is_fully_known());
        assert!(Value::object([("a", Value::Null)]).is_fully_known());
    }

    #[test]
    fn test_path_display() {
        let path = AttrPath::root("metadata").key("env").attr("x");
        assert_eq!(path.to_string(), "metadata[\"env\"].x");
        assert_eq!(AttrPath::root("sans").index(2).to_string(), "sans[2]");
        assert_eq!(AttrPath::empty().to_string(), "<root>");
    }

    #[test]
    fn test_to_json_drops_unknown() {
        let json = sample().to_json();
        assert_eq!(json["name"], "foo");
        assert!(json["certificate"]["duration"].is_null());
    }
}
