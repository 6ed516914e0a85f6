//! Private-state markers for server-computed values
//!
//! When the API fills an optional object with defaults, the resource
//! records that fact under a per-attribute key in private state. The
//! [`UseStateIfServerComputed`](crate::modifiers::UseStateIfServerComputed)
//! modifier reads the marker on later plans.
//!
//! The stored bytes are a JSON string so they survive the host's
//! validity check; nothing ever parses them. Changing them is a breaking
//! change for existing state.

use declarative::{Diagnostics, PrivateState};

/// Bytes stored under a key whose value came from the server.
pub const SERVER_COMPUTED: &[u8] = br#""computed-by-server""#;

/// Record that the value at `key` was filled in by the server.
pub fn mark(private: &mut PrivateState, key: &str, diags: &mut Diagnostics) {
    if let Err(err) = private.set_key(key, SERVER_COMPUTED) {
        diags.add(err.into());
    }
}

/// Forget the marker at `key`, for values the user configured.
pub fn clear(private: &mut PrivateState, key: &str, diags: &mut Diagnostics) {
    if let Err(err) = private.set_key(key, b"") {
        diags.add(err.into());
    }
}

/// Mark `key` when the server supplied the value, clear it otherwise.
pub fn record(
    private: &mut PrivateState,
    key: &str,
    server_computed: bool,
    diags: &mut Diagnostics,
) {
    if server_computed {
        mark(private, key, diags);
    } else {
        clear(private, key, diags);
    }
}

pub fn is_server_computed(private: &PrivateState, key: &str) -> bool {
    private.get_key(key) == Some(SERVER_COMPUTED)
}
