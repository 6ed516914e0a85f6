//! Object codecs between attribute models and API models.
//!
//! Every nested object model implements [`Codec`]. Leaves go through the
//! [`bridge`](crate::bridge) so the null/empty discipline holds at every
//! depth; objects go through [`decode`], which applies the same rule one
//! level up: an object the server omits stays as the user wrote it when
//! the user wrote it empty.

pub mod account;
pub mod endpoint;
pub mod fields;
pub mod policy;
pub mod provisioner;

use declarative::{Attr, TfValue, Value};

/// Bidirectional translation for one nested object
pub trait Codec: TfValue + Clone {
    type Api;

    fn to_api(&self) -> Self::Api;

    /// Decode `remote`, consulting `prior` for the state of every leaf.
    fn from_api(remote: Self::Api, prior: &Attr<Self>) -> Self;

    /// Whether an API value carries nothing worth sending or keeping.
    fn is_vacant(_remote: &Self::Api) -> bool {
        false
    }
}

/// Encode an optional object; null, unknown and vacant objects are absent.
pub fn encode<C: Codec>(attr: &Attr<C>) -> Option<C::Api> {
    attr.known().map(C::to_api).filter(|api| !C::is_vacant(api))
}

/// Decode an optional object.
pub fn decode<C: Codec>(remote: Option<C::Api>, prior: &Attr<C>) -> Attr<C> {
    match remote.filter(|api| !C::is_vacant(api)) {
        Some(api) => Attr::Known(C::from_api(api, prior)),
        None => absent_object(prior),
    }
}

/// The value of an object the server did not return.
///
/// An empty object in prior state is kept, which is how `policy = {}`
/// survives a refresh. A populated one is drift and becomes null.
pub fn absent_object<T: TfValue + Clone>(prior: &Attr<T>) -> Attr<T> {
    match prior {
        Attr::Known(model) if is_empty_value(&model.to_value()) => prior.clone(),
        _ => Attr::Null,
    }
}

/// Parse a JSON document held as a string attribute.
pub fn parse_json(what: &str, text: &str) -> smallstep::Result<serde_json::Value> {
    serde_json::from_str(text).map_err(|e| smallstep::Error::encoding(what, e))
}

/// Render a remote JSON document, or nothing when the server sent null.
pub fn render_json(value: Option<serde_json::Value>) -> Option<String> {
    value.filter(|v| !v.is_null()).map(|v| v.to_string())
}

/// Null, or a value made only of zero values, empty collections and
/// objects of those.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Unknown => false,
        Value::String(s) => s.is_empty(),
        Value::Bool(b) => !b,
        Value::Int(n) => *n == 0,
        Value::List(items) | Value::Set(items) => items.is_empty(),
        Value::Map(entries) => entries.is_empty(),
        Value::Object(fields) => fields.values().all(is_empty_value),
    }
}
