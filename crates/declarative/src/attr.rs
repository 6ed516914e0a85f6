//! Typed attribute values
//!
//! Models are plain structs whose fields are [`Attr<T>`]. The
//! [`TfValue`] trait converts them to and from the dynamic [`Value`]
//! tree; the [`object!`](crate::object) macro derives it for model structs.

use crate::error::{Error, Result};
use crate::value::{AttrPath, PathStep, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A typed attribute: null, unknown, or a known payload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Attr<T> {
    #[default]
    Null,
    Unknown,
    Known(T),
}

impl<T> Attr<T> {
    /// `Known(value)`
    pub fn known_value(value: T) -> Self {
        Self::Known(value)
    }

    /// `Some` becomes known, `None` becomes null.
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Known)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Null or unknown.
    pub fn is_null_or_unknown(&self) -> bool {
        !self.is_known()
    }

    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_known(self) -> Option<T> {
        match self {
            Self::Known(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Attr<&T> {
        match self {
            Self::Null => Attr::Null,
            Self::Unknown => Attr::Unknown,
            Self::Known(value) => Attr::Known(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attr<U> {
        match self {
            Self::Null => Attr::Null,
            Self::Unknown => Attr::Unknown,
            Self::Known(value) => Attr::Known(f(value)),
        }
    }

    /// Read a nested attribute through this one.
    ///
    /// A null parent yields a null child and an unknown parent an unknown
    /// child, which is how prior state is consulted below objects that
    /// were never set.
    pub fn get<U: Clone>(&self, field: impl FnOnce(&T) -> &Attr<U>) -> Attr<U> {
        match self {
            Self::Null => Attr::Null,
            Self::Unknown => Attr::Unknown,
            Self::Known(value) => field(value).clone(),
        }
    }
}

impl<T: Clone> Attr<T> {
    /// The known value, or `fallback` for null and unknown.
    pub fn value_or(&self, fallback: T) -> T {
        self.known().cloned().unwrap_or(fallback)
    }
}

impl Attr<String> {
    /// Shorthand for a known string.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Known(value.into())
    }

    /// The known string, or `""` for null and unknown.
    pub fn value_str(&self) -> &str {
        self.known().map_or("", String::as_str)
    }
}

impl<T> From<Option<T>> for Attr<T> {
    fn from(value: Option<T>) -> Self {
        Self::from_option(value)
    }
}

/// Conversion between a typed model value and the dynamic [`Value`] tree
pub trait TfValue: Sized {
    /// Encode into a dynamic value.
    fn to_value(&self) -> Value;

    /// Decode from a dynamic value.
    ///
    /// Error paths are relative to `value`.
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch(expected: &'static str, value: &Value) -> Error {
    match value {
        Value::Null => Error::UnexpectedNull {
            path: AttrPath::empty(),
        },
        Value::Unknown => Error::UnexpectedUnknown {
            path: AttrPath::empty(),
        },
        other => Error::TypeMismatch {
            path: AttrPath::empty(),
            expected,
            found: other.kind(),
        },
    }
}

impl TfValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| mismatch("string", value))
    }
}

impl TfValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch("bool", value))
    }
}

impl TfValue for i64 {
    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int(n) => Ok(*n),
            other => Err(mismatch("number", other)),
        }
    }
}

impl<T: TfValue> TfValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(TfValue::to_value).collect())
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::List(items) | Value::Set(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| T::from_value(item).map_err(|e| e.within(PathStep::Index(i))))
                .collect(),
            other => Err(mismatch("list", other)),
        }
    }
}

impl TfValue for BTreeSet<String> {
    fn to_value(&self) -> Value {
        Value::new_set(self.iter().map(|s| Value::String(s.clone())).collect())
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::List(items) | Value::Set(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    String::from_value(item).map_err(|e| e.within(PathStep::Index(i)))
                })
                .collect(),
            other => Err(mismatch("set", other)),
        }
    }
}

impl<T: TfValue> TfValue for BTreeMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Map(entries) | Value::Object(entries) => entries
                .iter()
                .map(|(k, v)| {
                    T::from_value(v)
                        .map(|v| (k.clone(), v))
                        .map_err(|e| e.within(PathStep::Key(k.clone())))
                })
                .collect(),
            other => Err(mismatch("map", other)),
        }
    }
}

impl<T: TfValue> TfValue for Attr<T> {
    fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Unknown => Value::Unknown,
            Self::Known(value) => value.to_value(),
        }
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Unknown => Ok(Self::Unknown),
            other => T::from_value(other).map(Self::Known),
        }
    }
}

/// Read a field out of an object value; used by [`object!`](crate::object).
#[doc(hidden)]
pub fn field<T: TfValue>(fields: &BTreeMap<String, Value>, name: &str) -> Result<T> {
    static NULL: Value = Value::Null;
    T::from_value(fields.get(name).unwrap_or(&NULL))
        .map_err(|e| e.within(PathStep::Attr(name.to_string())))
}

/// Expect an object value; used by [`object!`](crate::object).
#[doc(hidden)]
pub fn expect_object(value: &Value) -> Result<&BTreeMap<String, Value>> {
    value.as_object().ok_or_else(|| mismatch("object", value))
}

/// Declare a model struct and derive [`TfValue`] for it.
///
/// Every field name doubles as the attribute name unless the field is
/// followed by `=> "name"`, which is how keywords such as `static` are
/// spelled.
///
/// ```
/// use declarative::{object, Attr, TfValue};
///
/// object! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Files {
///         pub crt_file: Attr<String>,
///         pub mode: Attr<i64>,
///     }
/// }
///
/// let files = Files { crt_file: Attr::string("/etc/crt.pem"), mode: Attr::Null };
/// let round = Files::from_value(&files.to_value()).unwrap();
/// assert_eq!(files, round);
/// ```
#[macro_export]
macro_rules! object {
    (@name $field:ident) => { stringify!($field) };
    (@name $field:ident $name:literal) => { $name };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty $(=> $attr:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::TfValue for $name {
            #[allow(unused_mut)]
            fn to_value(&self) -> $crate::Value {
                let mut fields = ::std::collections::BTreeMap::new();
                $(
                    fields.insert(
                        ::std::string::String::from($crate::object!(@name $field $($attr)?)),
                        $crate::TfValue::to_value(&self.$field),
                    );
                )*
                $crate::Value::Object(fields)
            }

            #[allow(unused_variables)]
            fn from_value(value: &$crate::Value) -> $crate::Result<Self> {
                let fields = $crate::attr::expect_object(value)?;
                Ok(Self {
                    $( $field: $crate::attr::field(fields, $crate::object!(@name $field $($attr)?))?, )*
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object;

    object! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Inner {
            name: Attr<String>,
            tags: Attr<Vec<String>>,
        }
    }

    object! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Outer {
            id: Attr<String>,
            inner: Attr<Inner>,
            ids: Attr<BTreeSet<String>>,
            metadata: Attr<BTreeMap<String, String>>,
            port: Attr<i64>,
        }
    }

    #[test]
    fn test_object_roundtrip_keeps_four_states() {
        let outer = Outer {
            id: Attr::Unknown,
            inner: Attr::Known(Inner {
                name: Attr::string(""),
                tags: Attr::Known(vec![]),
            }),
            ids: Attr::Null,
            metadata: Attr::Known(BTreeMap::from([("k".to_string(), "v".to_string())])),
            port: Attr::Known(1812),
        };

        let value = outer.to_value();
        assert!(value.at(&AttrPath::root("id")).is_unknown());
        assert_eq!(
            value.at(&AttrPath::parse("inner.tags")),
            &Value::List(vec![])
        );

        let decoded = Outer::from_value(&value).unwrap();
        assert_eq!(decoded, outer);
    }

    #[test]
    fn test_missing_fields_decode_as_null() {
        let value = Value::object([("id", Value::string("abc"))]);
        let decoded = Outer::from_value(&value).unwrap();
        assert_eq!(decoded.id, Attr::string("abc"));
        assert!(decoded.inner.is_null());
        assert!(decoded.port.is_null());
    }

    #[test]
    fn test_type_mismatch_reports_nested_path() {
        let value = Value::object([(
            "inner",
            Value::object([("tags", Value::List(vec![Value::Bool(true)]))]),
        )]);
        let err = Outer::from_value(&value).unwrap_err();
        assert_eq!(err.path().unwrap().to_string(), "inner.tags[0]");
    }

    #[test]
    fn test_get_through_null_and_unknown() {
        let null: Attr<Inner> = Attr::Null;
        assert!(null.get(|i| &i.name).is_null());

        let unknown: Attr<Inner> = Attr::Unknown;
        assert!(unknown.get(|i| &i.name).is_unknown());

        let known = Attr::Known(Inner {
            name: Attr::string("x"),
            tags: Attr::Null,
        });
        assert_eq!(known.get(|i| &i.name), Attr::string("x"));
    }

    #[test]
    fn test_set_encoding_is_canonical() {
        let ids: BTreeSet<String> = ["b", "a"].iter().map(ToString::to_string).collect();
        assert_eq!(
            ids.to_value(),
            Value::Set(vec![Value::string("a"), Value::string("b")])
        );
    }

    object! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Field {
            static_value: Attr<String> => "static",
            device_metadata: Attr<String>,
        }
    }

    object! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Empty {}
    }

    #[test]
    fn test_renamed_attribute() {
        let field = Field {
            static_value: Attr::string("web"),
            device_metadata: Attr::Null,
        };
        let value = field.to_value();
        assert_eq!(value.at(&AttrPath::root("static")), &Value::string("web"));
        assert_eq!(Field::from_value(&value).unwrap(), field);
    }

    #[test]
    fn test_empty_object() {
        let value = Empty {}.to_value();
        assert_eq!(value, Value::Object(BTreeMap::new()));
        assert_eq!(Empty::from_value(&value).unwrap(), Empty {});
        assert!(Empty::from_value(&Value::Null).is_err());
    }

    #[test]
    fn test_value_str_defaults_to_empty() {
        assert_eq!(Attr::<String>::Null.value_str(), "");
        assert_eq!(Attr::string("x").value_str(), "x");
    }
}
