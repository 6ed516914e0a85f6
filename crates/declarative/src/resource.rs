//! Resource and data source traits
//!
//! A Resource owns one kind of remote object and converges it through
//! Create, Read, Update, Delete and ImportState. Every operation takes a
//! typed request and fills a response; diagnostics with error severity
//! abort the operation and the host discards any state in the response.

use crate::attr::TfValue;
use crate::diag::Diagnostics;
use crate::private::PrivateState;
use crate::schema::Schema;
use crate::validator::ConfigValidator;
use crate::value::{AttrPath, Value};
use anyhow::Result;

/// Input to [`Resource::create`]
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub plan: Value,
    pub config: Value,
}

/// Output of [`Resource::create`]
#[derive(Debug, Clone, Default)]
pub struct CreateResponse {
    pub state: Value,
    pub private: PrivateState,
    pub diagnostics: Diagnostics,
}

/// Input to [`Resource::read`]
#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    pub state: Value,
    pub private: PrivateState,
}

/// Output of [`Resource::read`]; a null state removes the resource
#[derive(Debug, Clone, Default)]
pub struct ReadResponse {
    pub state: Value,
    pub private: PrivateState,
    pub diagnostics: Diagnostics,
}

/// Input to [`Resource::update`]
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub state: Value,
    pub plan: Value,
    pub config: Value,
    pub private: PrivateState,
}

/// Output of [`Resource::update`]
#[derive(Debug, Clone, Default)]
pub struct UpdateResponse {
    pub state: Value,
    pub private: PrivateState,
    pub diagnostics: Diagnostics,
}

/// Input to [`Resource::delete`]
#[derive(Debug, Clone, Default)]
pub struct DeleteRequest {
    pub state: Value,
    pub private: PrivateState,
}

/// Output of [`Resource::delete`]
#[derive(Debug, Clone, Default)]
pub struct DeleteResponse {
    pub diagnostics: Diagnostics,
}

/// Input to [`Resource::import_state`]
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub id: String,
}

/// Output of [`Resource::import_state`]
#[derive(Debug, Clone, Default)]
pub struct ImportResponse {
    pub state: Value,
    pub diagnostics: Diagnostics,
}

macro_rules! state_setter {
    ($($resp:ty),*) => {
        $(
            impl $resp {
                /// Replace the state with an encoded model.
                pub fn set_state<T: TfValue>(&mut self, model: &T) {
                    self.state = model.to_value();
                }
            }
        )*
    };
}

state_setter!(CreateResponse, ReadResponse, UpdateResponse, ReadDataResponse);

impl ReadResponse {
    /// Drop the resource from state; the next plan will recreate it.
    pub fn remove_resource(&mut self) {
        self.state = Value::Null;
    }
}

impl ImportResponse {
    /// Write a single attribute; Read fills in the rest.
    pub fn set_attribute(&mut self, path: &AttrPath, value: Value) {
        if self.state.is_null() {
            self.state = Value::Object(Default::default());
        }
        if let Err(err) = self.state.set_at(path, value) {
            self.diagnostics.add(err.into());
        }
    }
}

/// Core trait for managed resources
///
/// # Example
///
/// ```ignore
/// impl Resource for AuthorityResource {
///     fn type_name(&self) -> &'static str { "smallstep_authority" }
///     fn schema(&self) -> anyhow::Result<Schema> { authority_schema() }
///     fn create(&self, req: CreateRequest, resp: &mut CreateResponse) { ... }
///     fn read(&self, req: ReadRequest, resp: &mut ReadResponse) { ... }
///     fn update(&self, req: UpdateRequest, resp: &mut UpdateResponse) { ... }
///     fn delete(&self, req: DeleteRequest, resp: &mut DeleteResponse) { ... }
///     fn import_state(&self, req: ImportRequest, resp: &mut ImportResponse) {
///         resp.set_attribute(&AttrPath::root("id"), Value::string(req.id));
///     }
/// }
/// ```
pub trait Resource: Send + Sync {
    /// Type name, e.g. `smallstep_authority`
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Result<Schema>;

    /// Cross-attribute validators run against the configuration
    fn config_validators(&self) -> Vec<Box<dyn ConfigValidator>> {
        Vec::new()
    }

    fn create(&self, req: CreateRequest, resp: &mut CreateResponse);

    fn read(&self, req: ReadRequest, resp: &mut ReadResponse);

    fn update(&self, req: UpdateRequest, resp: &mut UpdateResponse);

    fn delete(&self, req: DeleteRequest, resp: &mut DeleteResponse);

    /// Default import writes the id attribute only.
    fn import_state(&self, req: ImportRequest, resp: &mut ImportResponse) {
        resp.set_attribute(&AttrPath::root("id"), Value::String(req.id));
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Input to [`DataSource::read`]
#[derive(Debug, Clone, Default)]
pub struct ReadDataRequest {
    pub config: Value,
}

/// Output of [`DataSource::read`]
#[derive(Debug, Clone, Default)]
pub struct ReadDataResponse {
    pub state: Value,
    pub diagnostics: Diagnostics,
}

/// Read-only lookup of a remote object
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Result<Schema>;

    fn read(&self, req: ReadDataRequest, resp: &mut ReadDataResponse);
}

/// A boxed data source for type-erased storage
pub type BoxedDataSource = Box<dyn DataSource>;

/// Run attribute validators and resource-level validators over a configuration
pub fn validate_config(
    schema: &Schema,
    validators: &[Box<dyn ConfigValidator>],
    config: &Value,
) -> Diagnostics {
    let mut diags = Diagnostics::new();
    validate_attributes(&schema.attributes, &AttrPath::empty(), config, &mut diags);
    for validator in validators {
        validator.validate(config, &mut diags);
    }
    diags
}

fn validate_attributes(
    attributes: &std::collections::BTreeMap<String, crate::schema::Attribute>,
    parent: &AttrPath,
    config: &Value,
    diags: &mut Diagnostics,
) {
    for (name, attribute) in attributes {
        let path = parent.clone().attr(name.clone());
        let value = config.at(&path);
        if attribute.required && value.is_null() {
            diags.add_attribute_error(
                path.clone(),
                "Missing Configuration for Required Attribute",
                format!("Must set a configuration value for the {path} attribute."),
            );
            continue;
        }
        if !attribute.is_configurable() && value.is_known() {
            diags.add_attribute_error(
                path.clone(),
                "Invalid Configuration for Read-Only Attribute",
                format!("Cannot set value for the {path} attribute; it is computed by the provider."),
            );
            continue;
        }
        if !value.is_known() {
            continue;
        }
        for validator in &attribute.validators {
            validator.validate(&path, value, diags);
        }
        if let crate::schema::AttrKind::Object(nested) = &attribute.kind {
            validate_attributes(nested, &path, config, diags);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use crate::validator::{ExactlyOneOf, OneOf};

    fn schema() -> Schema {
        Schema::new("test")
            .attribute("id", Attribute::string().computed())
            .attribute(
                "kind",
                Attribute::string()
                    .required()
                    .validator(OneOf::new(["A", "B"])),
            )
            .attribute(
                "wifi",
                Attribute::object([("ssid", Attribute::string().required())]).optional(),
            )
            .attribute(
                "vpn",
                Attribute::object([("host", Attribute::string().optional())]).optional(),
            )
    }

    #[test]
    fn test_validate_required_and_enum() {
        let config = Value::object([("kind", Value::string("C"))]);
        let diags = validate_config(&schema(), &[], &config);
        assert!(diags.has_error());

        let config = Value::object([("kind", Value::Null)]);
        let diags = validate_config(&schema(), &[], &config);
        assert_eq!(diags.errors().count(), 1);
    }

    #[test]
    fn test_validate_nested_required_only_when_parent_set() {
        let config = Value::object([
            ("kind", Value::string("A")),
            ("wifi", Value::object([("ssid", Value::Null)])),
        ]);
        let diags = validate_config(&schema(), &[], &config);
        assert!(diags.has_error());

        let config = Value::object([("kind", Value::string("A"))]);
        assert!(validate_config(&schema(), &[], &config).is_empty());
    }

    #[test]
    fn test_validate_rejects_computed_only() {
        let config = Value::object([("kind", Value::string("A")), ("id", Value::string("x"))]);
        assert!(validate_config(&schema(), &[], &config).has_error());
    }

    #[test]
    fn test_config_validators_run() {
        let validators: Vec<Box<dyn ConfigValidator>> = vec![Box::new(ExactlyOneOf::new([
            AttrPath::root("wifi"),
            AttrPath::root("vpn"),
        ]))];
        let config = Value::object([("kind", Value::string("A"))]);
        assert!(validate_config(&schema(), &validators, &config).has_error());
    }

    #[test]
    fn test_import_set_attribute() {
        let mut resp = ImportResponse::default();
        resp.set_attribute(&AttrPath::root("id"), Value::string("abc"));
        assert_eq!(resp.state.at(&AttrPath::root("id")), &Value::string("abc"));
        assert!(resp.diagnostics.is_empty());
    }
}
