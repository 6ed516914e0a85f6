//! Transport backends for the Smallstep API.
//!
//! A [`Backend`] sends one [`ApiRequest`] and returns the raw
//! [`ApiResponse`], whatever its status. Interpreting statuses is left to
//! callers so they can map 404 to "gone" and surface the server's message
//! for everything else.
//!
//! An in-memory `MockBackend` is available to tests and, for dependent
//! crates' tests, behind the `mock` feature.

pub mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockBackend;

use crate::error::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One API call.
///
/// The path is held as unescaped segments; the HTTP backend percent-encodes
/// them when it joins them onto the server URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            body: None,
        }
    }

    /// Attach a JSON body.
    pub fn with_json(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// `/a/b/c`, unescaped; used for logging and mock matching.
    #[must_use]
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Decode the request body; mostly useful in tests.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.body.as_deref().unwrap_or(b"null");
        Ok(serde_json::from_slice(body)?)
    }
}

/// A response of any status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiResponse {
    pub status: u16,
    /// Value of the `X-Request-Id` header, when present
    pub request_id: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            request_id: None,
            body: body.into(),
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            Error::InvalidResponse(format!("status {}: {e}", self.status))
        })
    }

    /// The `message` field of an error body, or the raw body text.
    #[must_use]
    pub fn error_message(&self) -> String {
        match serde_json::from_slice::<ErrorBody>(&self.body) {
            Ok(body) => body.message,
            Err(_) => String::from_utf8_lossy(&self.body).trim().to_string(),
        }
    }

    /// The request id, or `-` when the server sent none.
    #[must_use]
    pub fn request_id_or_dash(&self) -> &str {
        self.request_id.as_deref().unwrap_or("-")
    }
}

/// Backend trait for sending API requests.
///
/// This abstraction allows the real HTTP transport to be swapped for a
/// mock in tests.
pub trait Backend: Send + Sync {
    /// Send a request and return the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` when no response was received at all.
    fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}
