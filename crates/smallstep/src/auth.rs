//! Request authentication.
//!
//! Every request carries the API version header plus a bearer token. The
//! token is either static or obtained by exchanging a client certificate
//! at `{server}/auth` and refreshed in the background by a
//! [`TokenRotator`].

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// API version sent with every request.
pub const API_VERSION: &str = "2025-01-01";

/// Header carrying [`API_VERSION`].
pub const API_VERSION_HEADER: &str = "X-Smallstep-Api-Version";

/// How often a certificate-bootstrapped token is refreshed.
pub const ROTATION_INTERVAL: Duration = Duration::from_secs(59 * 60);

/// A bearer token. Debug output never shows the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(****)")
    }
}

/// Contributes headers to every outbound request.
pub trait RequestEditor: Send + Sync {
    fn headers(&self) -> Vec<(&'static str, String)>;
}

fn bearer_headers(token: &Token) -> Vec<(&'static str, String)> {
    vec![
        (API_VERSION_HEADER, API_VERSION.to_string()),
        ("Authorization", format!("Bearer {}", token.secret())),
    ]
}

/// A token that never changes.
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: Token,
}

impl StaticToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            token: Token::new(secret),
        }
    }
}

impl RequestEditor for StaticToken {
    fn headers(&self) -> Vec<(&'static str, String)> {
        bearer_headers(&self.token)
    }
}

/// A shared handle onto a token that a [`TokenRotator`] keeps fresh.
#[derive(Debug, Clone)]
pub struct RotatingToken {
    token: Arc<RwLock<Token>>,
}

impl RotatingToken {
    /// Snapshot of the current token.
    #[must_use]
    pub fn current(&self) -> Token {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RequestEditor for RotatingToken {
    fn headers(&self) -> Vec<(&'static str, String)> {
        bearer_headers(&self.current())
    }
}

/// Obtains a fresh bearer token.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self) -> Result<Token>;
}

/// A client certificate chain and its private key, loaded from PEM.
pub struct ClientCertificate {
    /// DER of every certificate in the chain, leaf first
    chain_der: Vec<Vec<u8>>,
    chain: Vec<ureq::tls::Certificate<'static>>,
    key: ureq::tls::PrivateKey<'static>,
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("certificates", &self.chain_der.len())
            .finish_non_exhaustive()
    }
}

impl ClientCertificate {
    /// Load a PEM certificate chain and PEM private key.
    ///
    /// Every certificate must parse as X.509, the key must be a supported
    /// private key, and the key must belong to the leaf certificate.
    pub fn from_pem(certificate: &str, private_key: &str) -> Result<Self> {
        let mut chain_der = Vec::new();
        for pem in x509_parser::pem::Pem::iter_from_buffer(certificate.as_bytes()) {
            let pem = pem.map_err(|e| Error::InvalidCertificate(e.to_string()))?;
            if pem.label != "CERTIFICATE" {
                continue;
            }
            pem.parse_x509()
                .map_err(|e| Error::InvalidCertificate(e.to_string()))?;
            chain_der.push(pem.contents);
        }
        if chain_der.is_empty() {
            return Err(Error::InvalidCertificate(
                "no PEM certificate found".to_string(),
            ));
        }

        let mut chain = Vec::new();
        for item in ureq::tls::parse_pem(certificate.as_bytes()) {
            if let ureq::tls::PemItem::Certificate(cert) =
                item.map_err(|e| Error::InvalidCertificate(e.to_string()))?
            {
                chain.push(cert);
            }
        }

        let key = ureq::tls::PrivateKey::from_pem(private_key.as_bytes())
            .map_err(|e| Error::InvalidCertificate(format!("private key: {e}")))?;
        check_key_pair(&chain, &key)?;

        Ok(Self {
            chain_der,
            chain,
            key,
        })
    }

    /// Base64 DER of each certificate, as the auth endpoint expects.
    #[must_use]
    pub fn bundle(&self) -> Vec<String> {
        self.chain_der.iter().map(|der| STANDARD.encode(der)).collect()
    }

    /// An agent presenting this certificate during the TLS handshake.
    pub fn agent(&self) -> ureq::Agent {
        let key = ureq::tls::PrivateKey::from_der(self.key.kind(), self.key.der()).to_owned();
        let client_cert = ureq::tls::ClientCert::new_with_certs(&self.chain, key);
        let tls = ureq::tls::TlsConfig::builder()
            .client_cert(Some(client_cert))
            .build();
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .tls_config(tls)
            .build();
        ureq::Agent::new_with_config(config)
    }
}

/// The leaf certificate's public key must be the one derived from `key`.
fn check_key_pair(
    chain: &[ureq::tls::Certificate<'static>],
    key: &ureq::tls::PrivateKey<'static>,
) -> Result<()> {
    use rustls::pki_types::{
        CertificateDer, PrivateKeyDer, PrivatePkcs1KeyDer, PrivatePkcs8KeyDer, PrivateSec1KeyDer,
    };
    // `ureq::tls::KeyKind` is not re-exported by ureq, so match on its
    // derived `Debug` name instead of the (unnameable) variant paths.
    let der = key.der().to_vec();
    let kind = key.kind();
    let key_der = match format!("{kind:?}").as_str() {
        "Pkcs1" => PrivateKeyDer::Pkcs1(PrivatePkcs1KeyDer::from(der)),
        "Pkcs8" => PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(der)),
        "Sec1" => PrivateKeyDer::Sec1(PrivateSec1KeyDer::from(der)),
        _ => {
            return Err(Error::InvalidCertificate(format!(
                "unsupported private key kind {kind:?}"
            )));
        }
    };
    let signing_key = rustls::crypto::ring::sign::any_supported_type(&key_der)
        .map_err(|e| Error::InvalidCertificate(format!("private key: {e}")))?;
    let certs = chain
        .iter()
        .map(|cert| CertificateDer::from(cert.der().to_vec()))
        .collect();
    rustls::sign::CertifiedKey::new(certs, signing_key)
        .keys_match()
        .map_err(|e| {
            Error::InvalidCertificate(format!("private key does not match certificate: {e}"))
        })
}

/// Parse a team id.
pub fn parse_team_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| Error::InvalidTeamId(raw.to_string()))
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    bundle: &'a [String],
    #[serde(rename = "teamID")]
    team_id: Uuid,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
}

/// Exchanges a client certificate for a token over mTLS.
pub struct MtlsAuthenticator {
    agent: ureq::Agent,
    auth_url: Url,
    team_id: Uuid,
    bundle: Vec<String>,
}

impl MtlsAuthenticator {
    pub fn new(server: &Url, certificate: &ClientCertificate, team_id: Uuid) -> Result<Self> {
        let mut auth_url = server.clone();
        auth_url
            .path_segments_mut()
            .map_err(|()| Error::InvalidUrl {
                url: server.to_string(),
                message: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .push("auth");
        Ok(Self {
            agent: certificate.agent(),
            auth_url,
            team_id,
            bundle: certificate.bundle(),
        })
    }

    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }
}

impl Authenticator for MtlsAuthenticator {
    fn authenticate(&self) -> Result<Token> {
        let body = AuthRequest {
            bundle: &self.bundle,
            team_id: self.team_id,
        };
        let mut response = self
            .agent
            .post(self.auth_url.as_str())
            .header(API_VERSION_HEADER, API_VERSION)
            .send_json(&body)?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let text = response.body_mut().read_to_string().unwrap_or_default();
            return Err(Error::Auth(format!("{status}: {}", text.trim())));
        }
        let parsed: AuthResponse = response.body_mut().read_json()?;
        if parsed.token.is_empty() {
            return Err(Error::Auth("server returned an empty token".to_string()));
        }
        Ok(Token::new(parsed.token))
    }
}

/// Keeps a token fresh on a background thread.
///
/// The thread stops when the rotator is shut down or dropped.
pub struct TokenRotator {
    token: RotatingToken,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl TokenRotator {
    /// Authenticate once and start refreshing every `interval`.
    ///
    /// # Errors
    ///
    /// Fails if the initial authentication fails.
    pub fn start(authenticator: Arc<dyn Authenticator>, interval: Duration) -> Result<Self> {
        let initial = authenticator.authenticate()?;
        log::debug!("obtained Smallstep API token");
        let token = RotatingToken {
            token: Arc::new(RwLock::new(initial)),
        };

        let (stop, stopped) = mpsc::channel::<()>();
        let shared = token.clone();
        let worker = thread::Builder::new()
            .name("smallstep-token-rotation".to_string())
            .spawn(move || {
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => refresh(authenticator.as_ref(), &shared),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::debug!("token rotation stopped");
            })
            .map_err(|e| Error::Other(format!("failed to start token rotation: {e}")))?;

        Ok(Self {
            token,
            stop: Some(stop),
            worker: Some(worker),
        })
    }

    /// A handle that always reads the latest token.
    #[must_use]
    pub fn token(&self) -> RotatingToken {
        self.token.clone()
    }

    /// Stop rotating and wait for the worker to exit.
    pub fn shutdown(&mut self) {
        self.stop.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn refresh(authenticator: &dyn Authenticator, token: &RotatingToken) {
    match authenticator.authenticate() {
        Ok(fresh) => {
            *token.token.write().unwrap_or_else(PoisonError::into_inner) = fresh;
            log::debug!("refreshed Smallstep API token");
        }
        Err(e) => log::error!("failed to refresh Smallstep API token: {e}"),
    }
}

impl RequestEditor for TokenRotator {
    fn headers(&self) -> Vec<(&'static str, String)> {
        self.token.headers()
    }
}

impl Drop for TokenRotator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CERT: &str = include_str!("../testdata/client.crt");
    const KEY: &str = include_str!("../testdata/client.key");

    struct Counting {
        calls: AtomicUsize,
        fail_after: usize,
    }

    impl Authenticator for Counting {
        fn authenticate(&self) -> Result<Token> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n >= self.fail_after {
                return Err(Error::Auth("rejected".to_string()));
            }
            Ok(Token::new(format!("token-{n}")))
        }
    }

    fn header<'a>(headers: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_static_token_headers() {
        let headers = StaticToken::new("abc").headers();
        assert_eq!(header(&headers, "Authorization"), Some("Bearer abc"));
        assert_eq!(header(&headers, API_VERSION_HEADER), Some(API_VERSION));
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::new("super-secret");
        assert!(!format!("{token:?}").contains("super-secret"));
    }

    #[test]
    fn test_rotator_refreshes_and_stops() {
        let auth = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail_after: usize::MAX,
        });
        let mut rotator = TokenRotator::start(auth.clone(), Duration::from_millis(10)).unwrap();
        let handle = rotator.token();
        assert_eq!(handle.current().secret(), "token-0");

        thread::sleep(Duration::from_millis(100));
        assert_ne!(handle.current().secret(), "token-0");

        rotator.shutdown();
        let calls = auth.calls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(auth.calls.load(Ordering::SeqCst), calls);
    }

    #[test]
    fn test_rotation_failure_keeps_previous_token() {
        let auth = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail_after: 1,
        });
        let rotator = TokenRotator::start(auth.clone(), Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(60));
        assert!(auth.calls.load(Ordering::SeqCst) > 1);
        assert_eq!(rotator.token().current().secret(), "token-0");
        let headers = rotator.headers();
        assert_eq!(header(&headers, "Authorization"), Some("Bearer token-0"));
    }

    #[test]
    fn test_initial_failure_is_fatal() {
        let auth = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail_after: 0,
        });
        let err = TokenRotator::start(auth, ROTATION_INTERVAL).err().unwrap();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn test_parse_team_id() {
        assert!(parse_team_id("0b8a6c52-6f54-4a8b-9d0b-2f6a4c8a1e33").is_ok());
        assert!(matches!(
            parse_team_id("my-team"),
            Err(Error::InvalidTeamId(_))
        ));
    }

    #[test]
    fn test_client_certificate_from_pem() {
        let cert = ClientCertificate::from_pem(CERT, KEY).unwrap();
        let bundle = cert.bundle();
        assert_eq!(bundle.len(), 1);
        assert!(STANDARD.decode(&bundle[0]).is_ok());
    }

    #[test]
    fn test_client_certificate_rejects_garbage() {
        assert!(matches!(
            ClientCertificate::from_pem("not a cert", KEY),
            Err(Error::InvalidCertificate(_))
        ));
        assert!(matches!(
            ClientCertificate::from_pem(CERT, "not a key"),
            Err(Error::InvalidCertificate(_))
        ));
    }

    #[test]
    fn test_client_certificate_rejects_mismatched_key() {
        let other = include_str!("../testdata/other.key");
        let err = ClientCertificate::from_pem(CERT, other).unwrap_err();
        assert!(matches!(&err, Error::InvalidCertificate(m) if m.contains("does not match")));
    }

    #[test]
    fn test_client_certificate_agent_builds_repeatedly() {
        let cert = ClientCertificate::from_pem(CERT, KEY).unwrap();
        let _first = cert.agent();
        let _second = cert.agent();
    }

    #[test]
    fn test_auth_request_body() {
        let bundle = vec!["Zm9v".to_string()];
        let team = parse_team_id("0b8a6c52-6f54-4a8b-9d0b-2f6a4c8a1e33").unwrap();
        let body = serde_json::to_value(AuthRequest {
            bundle: &bundle,
            team_id: team,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "bundle": ["Zm9v"],
                "teamID": "0b8a6c52-6f54-4a8b-9d0b-2f6a4c8a1e33",
            })
        );
    }

    #[test]
    fn test_auth_url() {
        let cert = ClientCertificate::from_pem(CERT, KEY).unwrap();
        let server = Url::parse("https://gateway.smallstep.com/api").unwrap();
        let team = parse_team_id("0b8a6c52-6f54-4a8b-9d0b-2f6a4c8a1e33").unwrap();
        let auth = MtlsAuthenticator::new(&server, &cert, team).unwrap();
        assert_eq!(auth.auth_url().as_str(), "https://gateway.smallstep.com/api/auth");
    }
}
