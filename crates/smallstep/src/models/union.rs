//! Open union containers.
//!
//! The API models several fields as one-of unions whose branch is chosen
//! by a sibling discriminator. [`Union`] holds the raw JSON object so a
//! branch can be encoded into it and decoded out of it on demand.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON object holding exactly one union branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Union(Map<String, Value>);

impl Union {
    /// Encode a branch.
    ///
    /// # Errors
    ///
    /// Fails if the branch does not serialize to a JSON object.
    pub fn from_variant<T: Serialize>(variant: &T) -> Result<Self> {
        match serde_json::to_value(variant).map_err(|e| Error::encoding("union", e))? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::encoding(
                "union",
                format!("expected an object, got {other}"),
            )),
        }
    }

    /// Decode the branch as `T`.
    pub fn as_variant<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| Error::InvalidResponse(format!("union: {e}")))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}
