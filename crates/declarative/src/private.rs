//! Per-instance private state
//!
//! Opaque bytes a resource stores next to its public state. The host
//! persists them verbatim and hands them back on every later operation
//! for the same instance.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Private state: key to JSON bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivateState {
    entries: BTreeMap<String, Vec<u8>>,
}

impl PrivateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes stored under `key`, if any.
    pub fn get_key(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Store bytes under `key`; empty bytes remove the key.
    ///
    /// The bytes must be valid JSON even though they are never
    /// interpreted here.
    pub fn set_key(&mut self, key: &str, value: &[u8]) -> Result<()> {
        if value.is_empty() {
            self.entries.remove(key);
            return Ok(());
        }
        serde_json::from_slice::<serde_json::Value>(value).map_err(|source| {
            Error::InvalidPrivateState {
                key: key.to_string(),
                source,
            }
        })?;
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut private = PrivateState::new();
        private.set_key("x509", br#""server""#).unwrap();
        assert_eq!(private.get_key("x509"), Some(br#""server""#.as_slice()));
        assert_eq!(private.get_key("other"), None);
    }

    #[test]
    fn test_rejects_invalid_json() {
        let mut private = PrivateState::new();
        assert!(private.set_key("x509", b"not json").is_err());
        assert!(private.is_empty());
    }

    #[test]
    fn test_empty_bytes_remove_key() {
        let mut private = PrivateState::new();
        private.set_key("x509", b"true").unwrap();
        private.set_key("x509", b"").unwrap();
        assert!(private.get_key("x509").is_none());
    }
}
