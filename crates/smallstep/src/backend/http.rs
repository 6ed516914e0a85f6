//! HTTP backend.
//!
//! This module provides the [`HttpBackend`] implementation that sends
//! requests to a Smallstep API server with ureq. Every request passes
//! through a [`RequestEditor`] that contributes the API version and
//! authorization headers.

use crate::auth::RequestEditor;
use crate::backend::{ApiRequest, ApiResponse, Backend, Method};
use crate::error::{Error, Result};
use url::Url;

/// Response header carrying the server's request id.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Parse and check a server URL.
pub fn parse_server_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::InvalidUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(Error::InvalidUrl {
            url: raw.to_string(),
            message: "expected an http or https URL".to_string(),
        });
    }
    Ok(url)
}

/// HTTP backend for the Smallstep API.
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// API base URL.
    base: Url,
    /// Adds headers to every request.
    editor: Box<dyn RequestEditor>,
}

impl HttpBackend {
    /// Create a backend for `base` using a default agent.
    pub fn new(base: Url, editor: Box<dyn RequestEditor>) -> Self {
        Self::with_agent(default_agent(), base, editor)
    }

    /// Create a backend with a preconfigured agent.
    pub fn with_agent(agent: ureq::Agent, base: Url, editor: Box<dyn RequestEditor>) -> Self {
        Self {
            agent,
            base,
            editor,
        }
    }

    /// Get the API base URL.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Join request segments onto the base URL.
    fn url_for(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl {
                url: self.base.to_string(),
                message: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(&request.segments);
        Ok(url)
    }

    fn decorate<B>(&self, mut builder: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        for (name, value) in self.editor.headers() {
            builder = builder.header(name, value);
        }
        builder
    }
}

/// An agent that hands every status back to the caller.
pub fn default_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .user_agent(concat!("smallstep-rs/", env!("CARGO_PKG_VERSION")))
        .build();
    ureq::Agent::new_with_config(config)
}

impl Backend for HttpBackend {
    fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(&request)?;
        let path = request.path();
        log::debug!("{} {path}", request.method);

        let body = request.body.take().unwrap_or_default();
        let uri = url.as_str();
        let result = match request.method {
            Method::Get => self.decorate(self.agent.get(uri)).call(),
            Method::Delete => self.decorate(self.agent.delete(uri)).call(),
            Method::Post => self
                .decorate(self.agent.post(uri))
                .content_type("application/json")
                .send(body.as_slice()),
            Method::Put => self
                .decorate(self.agent.put(uri))
                .content_type("application/json")
                .send(body.as_slice()),
            Method::Patch => self
                .decorate(self.agent.patch(uri))
                .content_type("application/json")
                .send(body.as_slice()),
        };
        let mut response = result?;

        let status = response.status().as_u16();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response.body_mut().read_to_vec()?;
        log::debug!(
            "{} {path} -> {status} (request id {})",
            request.method,
            request_id.as_deref().unwrap_or("-")
        );

        Ok(ApiResponse {
            status,
            request_id,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(
            parse_server_url(base).unwrap(),
            Box::new(StaticToken::new("token")),
        )
    }

    #[test]
    fn test_url_for_root_base() {
        let backend = backend("https://gateway.smallstep.com");
        let req = ApiRequest::new(Method::Get, ["authorities", "a1"]);
        assert_eq!(
            backend.url_for(&req).unwrap().as_str(),
            "https://gateway.smallstep.com/authorities/a1"
        );
    }

    #[test]
    fn test_url_for_keeps_base_path() {
        let backend = backend("https://gateway.smallstep.com/api/");
        let req = ApiRequest::new(Method::Get, ["devices"]);
        assert_eq!(
            backend.url_for(&req).unwrap().as_str(),
            "https://gateway.smallstep.com/api/devices"
        );
    }

    #[test]
    fn test_url_for_escapes_segments() {
        let backend = backend("https://gateway.smallstep.com");
        let req = ApiRequest::new(Method::Get, ["collections", "a b", "instances", "x/y"]);
        assert_eq!(
            backend.url_for(&req).unwrap().as_str(),
            "https://gateway.smallstep.com/collections/a%20b/instances/x%2Fy"
        );
    }

    #[test]
    fn test_default_agent_sets_no_timeout() {
        let timeouts = default_agent().config().timeouts();
        assert_eq!(timeouts.global, None);
        assert_eq!(timeouts.per_call, None);
    }

    #[test]
    fn test_parse_server_url_rejects_other_schemes() {
        assert!(parse_server_url("ftp://example.com").is_err());
        assert!(parse_server_url("not a url").is_err());
        assert!(parse_server_url("http://localhost:8080").is_ok());
    }
}
