//! Schema documentation from the embedded OpenAPI document.
//!
//! Attribute descriptions are taken from the API's own component schemas
//! so the provider documentation never drifts from the API reference.

use anyhow::{Context, Result, bail};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const DOCUMENT: &str = include_str!("../openapi/smallstep.json");
const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";
const MAX_REF_DEPTH: usize = 16;

static PARSED: OnceLock<Result<Json, String>> = OnceLock::new();

fn document() -> Result<&'static Json> {
    PARSED
        .get_or_init(|| serde_json::from_str(DOCUMENT).map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| anyhow::anyhow!("embedded API document is invalid: {e}"))
}

/// Documentation for one API component
#[derive(Debug, Clone, Default)]
pub struct Description {
    /// The component's own description
    pub description: String,
    properties: BTreeMap<String, String>,
}

impl Description {
    /// Description of a property by its JSON name, or `""`.
    pub fn property(&self, name: &str) -> &str {
        self.properties.get(name).map_or("", String::as_str)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(name, description)| (name.as_str(), description.as_str()))
    }
}

/// Describe the component schema `component`.
///
/// Properties of every `allOf` branch are merged; a later branch wins on
/// conflicts. Enum values are appended to property descriptions.
pub fn describe(component: &str) -> Result<Description> {
    let schemas = document()?
        .pointer("/components/schemas")
        .and_then(Json::as_object)
        .context("embedded API document has no component schemas")?;
    let Some(schema) = schemas.get(component) else {
        bail!("component {component:?} not found in the API document");
    };

    let resolver = Resolver { schemas };
    let mut description = Description {
        description: resolver.description(schema),
        properties: BTreeMap::new(),
    };
    resolver.collect(schema, &mut description.properties, 0);
    log::trace!(
        "described {component} with {} properties",
        description.properties.len()
    );
    Ok(description)
}

struct Resolver<'a> {
    schemas: &'a serde_json::Map<String, Json>,
}

impl<'a> Resolver<'a> {
    fn resolve(&self, schema: &'a Json) -> Option<&'a Json> {
        let target = schema.get("$ref")?.as_str()?.strip_prefix(SCHEMA_REF_PREFIX)?;
        self.schemas.get(target)
    }

    fn description(&self, schema: &'a Json) -> String {
        if let Some(text) = schema.get("description").and_then(Json::as_str) {
            return text.to_string();
        }
        self.resolve(schema)
            .and_then(|target| target.get("description"))
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn collect(&self, schema: &'a Json, properties: &mut BTreeMap<String, String>, depth: usize) {
        if depth > MAX_REF_DEPTH {
            return;
        }
        if let Some(target) = self.resolve(schema) {
            self.collect(target, properties, depth + 1);
        }
        if let Some(branches) = schema.get("allOf").and_then(Json::as_array) {
            for branch in branches {
                self.collect(branch, properties, depth + 1);
            }
        }
        if let Some(own) = schema.get("properties").and_then(Json::as_object) {
            for (name, property) in own {
                properties.insert(name.clone(), self.property(property));
            }
        }
    }

    fn property(&self, property: &'a Json) -> String {
        let description = self.description(property);
        let values = self.enum_values(property);
        if values.is_empty() {
            return description;
        }
        let allowed = values
            .iter()
            .map(|v| format!("`{v}`"))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{description} Allowed values: {allowed}")
            .trim_start()
            .to_string()
    }

    fn enum_values(&self, property: &'a Json) -> Vec<String> {
        let candidates = [
            Some(property),
            self.resolve(property),
            property.get("items"),
            property.get("items").and_then(|items| self.resolve(items)),
        ];
        candidates
            .into_iter()
            .flatten()
            .find_map(|schema| schema.get("enum").and_then(Json::as_array))
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(ToString::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_description() {
        let authority = describe("authority").unwrap();
        assert!(authority.description.contains("certificate authority"));
        assert!(authority.property("adminEmails").contains("admin access"));
    }

    #[test]
    fn test_enum_values_appended() {
        let device = describe("device").unwrap();
        assert!(
            device
                .property("ownership")
                .ends_with("Allowed values: `company` `user`")
        );
    }

    #[test]
    fn test_enum_values_through_ref() {
        let authority = describe("authority").unwrap();
        let text = authority.property("type");
        assert!(text.starts_with("The type of authority."));
        assert!(text.ends_with("Allowed values: `devops` `advanced`"));

        let key = describe("endpointKeyInfo").unwrap();
        assert!(key.property("protection").contains("`HARDWARE_ATTESTED`"));
    }

    #[test]
    fn test_enum_values_from_array_items() {
        let policy = describe("policy").unwrap();
        assert!(policy.property("ownership").contains("`company` `user`"));
        assert!(policy.property("os").contains("`macOS`"));
        assert!(!policy.property("tags").contains("Allowed values"));
    }

    #[test]
    fn test_all_of_branches_merged() {
        let provisioner = describe("provisioner").unwrap();
        assert!(provisioner.description.contains("authorizes certificate requests"));
        assert!(!provisioner.property("name").is_empty());
        assert!(!provisioner.property("claims").is_empty());
        assert!(provisioner.property("type").contains("`ACME_ATTESTATION`"));

        let webhook = describe("provisionerWebhook").unwrap();
        assert!(webhook.property("kind").contains("`ENRICHING` `AUTHORIZING`"));
        assert!(webhook.property("serverType").contains("`HOSTED_ATTESTATION`"));
    }

    #[test]
    fn test_ref_property_uses_sibling_description() {
        let credential = describe("credential").unwrap();
        assert_eq!(credential.property("policy"), "The devices the credential is issued to.");
    }

    #[test]
    fn test_unknown_component_and_property() {
        assert!(describe("noSuchComponent").is_err());
        assert_eq!(describe("files").unwrap().property("noSuchProperty"), "");
    }

    #[test]
    fn test_every_property_documented() {
        let schemas = document()
            .unwrap()
            .pointer("/components/schemas")
            .and_then(Json::as_object)
            .unwrap();
        for name in schemas.keys() {
            let description = describe(name).unwrap();
            assert!(!description.description.is_empty(), "{name} has no description");
            for (property, text) in description.properties() {
                assert!(!text.is_empty(), "{name}.{property} has no description");
            }
        }
    }
}
