//! # Declarative
//!
//! The value model and lifecycle contracts a declarative provider is
//! written against.
//!
//! ## Core Concepts
//!
//! - **Value**: a dynamic attribute tree where every node is null,
//!   unknown, or known (known-empty is distinct from null)
//! - **Attr**: the typed counterpart used in model structs
//! - **Schema**: attributes with required/optional/computed flags,
//!   documentation, plan modifiers and validators
//! - **PrivateState**: opaque per-instance bytes stored next to state
//! - **Resource / DataSource**: lifecycle handlers driven by the host
//!
//! ## Example
//!
//! ```
//! use declarative::{object, Attr, TfValue, Value, AttrPath};
//!
//! object! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct Policy {
//!         pub os: Attr<Vec<String>>,
//!         pub tags: Attr<Vec<String>>,
//!     }
//! }
//!
//! // `policy = {}` in configuration: an object whose lists are all null
//! let policy = Policy::default();
//! let value = policy.to_value();
//! assert!(value.is_known());
//! assert!(value.at(&AttrPath::root("os")).is_null());
//! ```

pub mod attr;
pub mod diag;
pub mod error;
pub mod modifier;
pub mod plan;
pub mod private;
pub mod resource;
pub mod schema;
pub mod validator;
pub mod value;

// Re-export main types at crate root
pub use attr::{Attr, TfValue};
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, Result};
pub use modifier::{
    PlanModifier, PlanModifierRequest, PlanModifierResponse, RequiresReplace, RequiresReplaceIf,
    UseStateForUnknown,
};
pub use plan::{PlannedChange, plan_resource_change};
pub use private::PrivateState;
pub use resource::{
    BoxedDataSource, BoxedResource, CreateRequest, CreateResponse, DataSource, DeleteRequest,
    DeleteResponse, ImportRequest, ImportResponse, ReadDataRequest, ReadDataResponse,
    ReadRequest, ReadResponse, Resource, UpdateRequest, UpdateResponse, validate_config,
};
pub use schema::{AttrKind, Attribute, Schema};
pub use validator::{AtMostOneOf, ConfigValidator, ExactlyOneOf, OneOf, ValueValidator};
pub use value::{AttrPath, PathStep, Value};
