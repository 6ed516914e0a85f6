//! High-level client.

use crate::auth::{
    ClientCertificate, MtlsAuthenticator, ROTATION_INTERVAL, RequestEditor, StaticToken,
    TokenRotator, parse_team_id,
};
use crate::backend::http::{HttpBackend, parse_server_url};
use crate::backend::{ApiRequest, ApiResponse, Backend, Method};
use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// How the client authenticates.
#[derive(Clone)]
pub enum Credentials {
    /// A long-lived API token.
    Token(String),
    /// A client certificate exchanged for an hourly-rotated token.
    ClientCertificate {
        certificate: String,
        private_key: String,
        team_id: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(****)"),
            Self::ClientCertificate { team_id, .. } => f
                .debug_struct("ClientCertificate")
                .field("team_id", team_id)
                .finish_non_exhaustive(),
        }
    }
}

/// Client for the Smallstep API.
///
/// Verbs return the raw response whatever its status; callers decide what
/// a 404 or a 400 means for them.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client with a custom backend.
    pub fn with_backend(backend: impl Backend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Connect to `server_url`.
    ///
    /// With client-certificate credentials this authenticates once up
    /// front and starts refreshing the token in the background; the
    /// refresh stops when the client is dropped.
    ///
    /// # Errors
    ///
    /// Fails on an invalid URL, team id or key pair, or when the initial
    /// token exchange is rejected.
    pub fn connect(server_url: &str, credentials: &Credentials) -> Result<Self> {
        let base = parse_server_url(server_url)?;
        let editor: Box<dyn RequestEditor> = match credentials {
            Credentials::Token(token) => {
                if token.is_empty() {
                    return Err(Error::Auth("API token is empty".to_string()));
                }
                Box::new(StaticToken::new(token.clone()))
            }
            Credentials::ClientCertificate {
                certificate,
                private_key,
                team_id,
            } => {
                let team_id = parse_team_id(team_id)?;
                let certificate = ClientCertificate::from_pem(certificate, private_key)?;
                let authenticator = MtlsAuthenticator::new(&base, &certificate, team_id)?;
                log::info!(
                    "authenticating to {} with a client certificate",
                    authenticator.auth_url()
                );
                Box::new(TokenRotator::start(Arc::new(authenticator), ROTATION_INTERVAL)?)
            }
        };
        Ok(Self::with_backend(HttpBackend::new(base, editor)))
    }

    /// Send a prepared request.
    pub fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.backend.send(request)
    }

    pub fn get(&self, segments: &[&str]) -> Result<ApiResponse> {
        self.send(ApiRequest::new(Method::Get, segments.iter().copied()))
    }

    pub fn delete(&self, segments: &[&str]) -> Result<ApiResponse> {
        self.send(ApiRequest::new(Method::Delete, segments.iter().copied()))
    }

    pub fn post<T: Serialize + ?Sized>(&self, segments: &[&str], body: &T) -> Result<ApiResponse> {
        self.send_json(Method::Post, segments, body)
    }

    pub fn put<T: Serialize + ?Sized>(&self, segments: &[&str], body: &T) -> Result<ApiResponse> {
        self.send_json(Method::Put, segments, body)
    }

    fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &T,
    ) -> Result<ApiResponse> {
        let body = serde_json::to_vec(body).map_err(|e| Error::encoding("request body", e))?;
        self.send(ApiRequest::new(method, segments.iter().copied()).with_json(body))
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::models::AuthorityUpdate;

    #[test]
    fn test_put_encodes_body() {
        let mock = MockBackend::new();
        mock.respond(Method::Put, "/authorities/a1", 200, "{}");
        let client = Client::with_backend(mock.clone());

        let resp = client
            .put(
                &["authorities", "a1"],
                &AuthorityUpdate {
                    admin_emails: vec!["a@example.com".into()],
                },
            )
            .unwrap();
        assert_eq!(resp.status, 200);

        let sent = mock.requests_to(Method::Put, "/authorities/a1");
        let body: serde_json::Value = sent[0].json().unwrap();
        assert_eq!(body["adminEmails"][0], "a@example.com");
    }

    #[test]
    fn test_connect_validates_inputs() {
        let creds = Credentials::ClientCertificate {
            certificate: String::new(),
            private_key: String::new(),
            team_id: "not-a-uuid".into(),
        };
        assert!(matches!(
            Client::connect("https://gateway.smallstep.com", &creds),
            Err(Error::InvalidTeamId(_))
        ));
        assert!(matches!(
            Client::connect("::", &Credentials::Token("t".into())),
            Err(Error::InvalidUrl { .. })
        ));
        let token = Credentials::Token("t".into());
        assert!(Client::connect("https://gateway.smallstep.com", &token).is_ok());
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let creds = Credentials::Token("secret-token".into());
        assert!(!format!("{creds:?}").contains("secret-token"));
    }
}
