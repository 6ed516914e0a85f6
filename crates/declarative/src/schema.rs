//! Resource and data source schemas
//!
//! A [`Schema`] lists the attributes a resource exposes to the host,
//! with their kind, required/optional/computed flags, documentation,
//! plan modifiers and validators.

use crate::modifier::PlanModifier;
use crate::validator::ValueValidator;
use crate::value::{AttrPath, PathStep};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The kind of value an attribute holds
#[derive(Debug, Clone)]
pub enum AttrKind {
    String,
    Bool,
    Int64,
    List(Box<AttrKind>),
    Set(Box<AttrKind>),
    Map(Box<AttrKind>),
    /// Single nested object
    Object(BTreeMap<String, Attribute>),
}

impl AttrKind {
    /// Nested attributes of an object kind (or of an object element kind).
    pub fn nested(&self) -> Option<&BTreeMap<String, Attribute>> {
        match self {
            Self::Object(attributes) => Some(attributes),
            Self::List(element) | Self::Set(element) | Self::Map(element) => element.nested(),
            _ => None,
        }
    }

    fn type_name(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Int64 => "int64".to_string(),
            Self::List(element) => format!("list({})", element.type_name()),
            Self::Set(element) => format!("set({})", element.type_name()),
            Self::Map(element) => format!("map({})", element.type_name()),
            Self::Object(_) => "object".to_string(),
        }
    }
}

/// A single schema attribute
#[derive(Clone)]
pub struct Attribute {
    pub kind: AttrKind,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub markdown_description: String,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub validators: Vec<Arc<dyn ValueValidator>>,
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("plan_modifiers", &self.plan_modifiers.len())
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

impl Attribute {
    fn of(kind: AttrKind) -> Self {
        Self {
            kind,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            markdown_description: String::new(),
            plan_modifiers: Vec::new(),
            validators: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::of(AttrKind::String)
    }

    pub fn bool() -> Self {
        Self::of(AttrKind::Bool)
    }

    pub fn int64() -> Self {
        Self::of(AttrKind::Int64)
    }

    pub fn string_list() -> Self {
        Self::of(AttrKind::List(Box::new(AttrKind::String)))
    }

    pub fn string_set() -> Self {
        Self::of(AttrKind::Set(Box::new(AttrKind::String)))
    }

    pub fn string_map() -> Self {
        Self::of(AttrKind::Map(Box::new(AttrKind::String)))
    }

    /// Single nested object.
    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Attribute)>,
        K: Into<String>,
    {
        Self::of(AttrKind::Object(
            attributes.into_iter().map(|(k, a)| (k.into(), a)).collect(),
        ))
    }

    /// List of nested objects.
    pub fn object_list<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Attribute)>,
        K: Into<String>,
    {
        Self::of(AttrKind::List(Box::new(AttrKind::Object(
            attributes.into_iter().map(|(k, a)| (k.into(), a)).collect(),
        ))))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.markdown_description = description.into();
        self
    }

    pub fn plan_modifier(mut self, modifier: impl PlanModifier + 'static) -> Self {
        self.plan_modifiers.push(Arc::new(modifier));
        self
    }

    pub fn validator(mut self, validator: impl ValueValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Whether the user may set this attribute in configuration.
    pub fn is_configurable(&self) -> bool {
        self.required || self.optional
    }

    fn to_json(&self) -> serde_json::Value {
        let mut json = serde_json::json!({
            "type": self.kind.type_name(),
            "required": self.required,
            "optional": self.optional,
            "computed": self.computed,
            "sensitive": self.sensitive,
            "description": self.markdown_description,
        });
        if let Some(nested) = self.kind.nested() {
            json["attributes"] = attributes_json(nested);
        }
        json
    }
}

fn attributes_json(attributes: &BTreeMap<String, Attribute>) -> serde_json::Value {
    serde_json::Value::Object(
        attributes
            .iter()
            .map(|(name, attr)| (name.clone(), attr.to_json()))
            .collect(),
    )
}

/// A resource or data source schema
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub markdown_description: String,
    pub version: i64,
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            markdown_description: description.into(),
            version: 0,
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    /// Find the attribute at `path`; list indexes and map keys step into
    /// element attributes.
    pub fn attribute_at(&self, path: &AttrPath) -> Option<&Attribute> {
        let mut attributes = &self.attributes;
        let mut found: Option<&Attribute> = None;
        for step in path.steps() {
            match step {
                PathStep::Attr(name) => {
                    let attr = attributes.get(name)?;
                    found = Some(attr);
                    if let Some(nested) = attr.kind.nested() {
                        attributes = nested;
                    }
                }
                PathStep::Index(_) | PathStep::Key(_) => {}
            }
        }
        found
    }

    /// Export the schema as JSON for documentation tooling.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "version": self.version,
            "description": self.markdown_description,
            "attributes": attributes_json(&self.attributes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new("A credential")
            .attribute("id", Attribute::string().computed())
            .attribute(
                "certificate",
                Attribute::object([
                    ("duration", Attribute::string().optional().computed()),
                    (
                        "x509",
                        Attribute::object([("common_name", Attribute::string().optional())])
                            .optional(),
                    ),
                ])
                .required(),
            )
    }

    #[test]
    fn test_attribute_at_nested() {
        let schema = schema();
        let attr = schema
            .attribute_at(&AttrPath::parse("certificate.x509.common_name"))
            .unwrap();
        assert!(attr.optional);
        assert!(schema.attribute_at(&AttrPath::root("missing")).is_none());
    }

    #[test]
    fn test_builder_flags() {
        let attr = Attribute::string().optional().computed().sensitive();
        assert!(attr.optional && attr.computed && attr.sensitive);
        assert!(attr.is_configurable());
        assert!(!Attribute::string().computed().is_configurable());
    }

    #[test]
    fn test_to_json_includes_nested() {
        let json = schema().to_json();
        assert_eq!(json["attributes"]["id"]["computed"], true);
        assert_eq!(
            json["attributes"]["certificate"]["attributes"]["duration"]["type"],
            "string"
        );
    }
}
