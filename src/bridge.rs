//! Value bridge between four-state attributes and two-state API fields.
//!
//! An attribute is null, unknown, known-empty or known-populated; an API
//! field is present or absent. Decoding consults the prior state so that
//! a value the user wrote as empty stays empty when the server omits it,
//! and a value the user never wrote stays null when the server echoes a
//! zero value.
//!
//! Decoding, for an API value `remote` and prior state `prior`:
//!
//! 1. If `remote` is absent or zero, and `prior` is null or zero, return
//!    `prior` as is.
//! 2. Otherwise an absent `remote` is null and a present one is known.

use declarative::Attr;
use std::collections::{BTreeMap, BTreeSet};

/// Types with a zero value on the wire.
pub trait Zero {
    fn is_zero(&self) -> bool;
}

impl Zero for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl Zero for bool {
    fn is_zero(&self) -> bool {
        !*self
    }
}

impl Zero for i64 {
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl<T> Zero for Vec<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Zero for BTreeSet<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> Zero for BTreeMap<K, V> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

/// Decode an optional API value against prior state.
pub fn from_remote<T: Zero + Clone>(remote: Option<T>, prior: &Attr<T>) -> Attr<T> {
    let remote_is_zero = remote.as_ref().is_none_or(Zero::is_zero);
    if remote_is_zero {
        match prior {
            Attr::Null => return Attr::Null,
            Attr::Known(value) if value.is_zero() => return prior.clone(),
            _ => {}
        }
    }
    Attr::from_option(remote)
}

/// Decode a string whose serialization is not canonical.
///
/// After the zero rule, a remote value that `equal` considers the same as
/// the prior value yields the prior value, keeping the user's spelling.
pub fn from_remote_with(
    remote: Option<String>,
    prior: &Attr<String>,
    equal: fn(&str, &str) -> bool,
) -> Attr<String> {
    let decoded = from_remote(remote, prior);
    match (&decoded, prior) {
        (Attr::Known(remote), Attr::Known(prior_value)) if equal(prior_value, remote) => {
            prior.clone()
        }
        _ => decoded,
    }
}

/// Decode a value the server returns at most once (a generated secret) or
/// never (a write-only input): keep the prior value whenever the server
/// sends nothing.
pub fn from_remote_once(remote: Option<String>, prior: &Attr<String>) -> Attr<String> {
    match remote.filter(|v| !v.is_empty()) {
        Some(value) => Attr::Known(value),
        None => match prior {
            Attr::Unknown => Attr::Null,
            other => other.clone(),
        },
    }
}

/// Decode an input the server never echoes back; an unknown prior, left
/// by a create, becomes null.
pub fn write_only<T: Clone>(prior: &Attr<T>) -> Attr<T> {
    match prior {
        Attr::Unknown => Attr::Null,
        other => other.clone(),
    }
}

/// Encode an attribute: null and unknown are absent on the wire.
pub fn to_remote<T: Clone>(attr: &Attr<T>) -> Option<T> {
    attr.known().cloned()
}

/// Encode a string that must not be sent empty, such as a duration.
pub fn to_remote_non_empty(attr: &Attr<String>) -> Option<String> {
    attr.known().filter(|v| !v.is_empty()).cloned()
}
