//! Provider configuration
//!
//! Read from `provider.toml`, overridden by command-line flags, with the
//! environment filling whatever is still unset:
//!
//! ```toml
//! server_url = "https://smallstep.com"
//!
//! [client_certificate]
//! certificate = "~/.step/certs/team.crt"
//! private_key = "~/.step/secrets/team.key"
//! team_id = "4a1b0c3e-2d5f-4e6a-8b7c-9d0e1f2a3b4c"
//! ```

use crate::paths;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use smallstep::Credentials;
use smallstep::backend::http::parse_server_url;
use std::fmt;
use std::fs;
use std::path::Path;

/// Environment variable holding a static API token
pub const ENV_API_TOKEN: &str = "SMALLSTEP_API_TOKEN";

/// Environment variable overriding the API base URL
pub const ENV_API_URL: &str = "SMALLSTEP_API_URL";

/// API base URL when nothing else sets one
pub const DEFAULT_SERVER_URL: &str = "https://smallstep.com";

/// Provider settings as written by the user; every field is optional
/// until [`ProviderConfig::resolve`].
#[derive(Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default)]
    pub bearer_token: Option<String>,

    #[serde(default)]
    pub server_url: Option<String>,

    #[serde(default)]
    pub client_certificate: Option<ClientCertificateConfig>,
}

/// Client certificate exchanged for a rotating token.
///
/// `certificate` and `private_key` are PEM text or paths to PEM files.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientCertificateConfig {
    pub certificate: String,
    pub private_key: String,
    pub team_id: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "****"))
            .field("server_url", &self.server_url)
            .field("client_certificate", &self.client_certificate)
            .finish()
    }
}

/// Settings ready to connect with
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub server_url: String,
    pub credentials: Credentials,
}

impl ProviderConfig {
    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in config file: {}", path.display()))?;
        log::debug!("Loaded provider config from {}", path.display());
        Ok(config)
    }

    /// Load `provider.toml` from the config directory, or an empty
    /// config when there is none.
    pub fn load_default() -> Result<Self> {
        let path = paths::config_file()?;
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Fields set in `overrides` replace ours.
    #[must_use]
    pub fn merge(self, overrides: Self) -> Self {
        Self {
            bearer_token: overrides.bearer_token.or(self.bearer_token),
            server_url: overrides.server_url.or(self.server_url),
            client_certificate: overrides.client_certificate.or(self.client_certificate),
        }
    }

    /// Fill unset fields from the process environment and validate.
    pub fn resolve(self) -> Result<ResolvedConfig> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Like [`resolve`](Self::resolve) with an explicit environment.
    pub fn resolve_with(self, env: impl Fn(&str) -> Option<String>) -> Result<ResolvedConfig> {
        let present = |value: Option<String>| value.filter(|v| !v.is_empty());

        let server_url = present(self.server_url)
            .or_else(|| present(env(ENV_API_URL)))
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        parse_server_url(&server_url).context("Invalid server_url")?;

        let bearer_token = present(self.bearer_token).or_else(|| present(env(ENV_API_TOKEN)));
        let credentials = match (bearer_token, self.client_certificate) {
            (Some(_), Some(_)) => bail!(
                "Both a bearer token and a client certificate are configured; \
                 remove one of them (the token may come from {ENV_API_TOKEN})"
            ),
            (None, None) => bail!(
                "No credentials configured; set bearer_token, export {ENV_API_TOKEN}, \
                 or configure a client_certificate"
            ),
            (Some(token), None) => Credentials::Token(token),
            (None, Some(cert)) => Credentials::ClientCertificate {
                certificate: read_pem(&cert.certificate).context("Invalid client certificate")?,
                private_key: read_pem(&cert.private_key)
                    .context("Invalid client certificate private key")?,
                team_id: cert.team_id,
            },
        };

        Ok(ResolvedConfig {
            server_url,
            credentials,
        })
    }
}

/// PEM text as given, or the contents of the file it names.
fn read_pem(value: &str) -> Result<String> {
    if value.contains("-----BEGIN") {
        return Ok(value.to_string());
    }
    let path = paths::expand(value);
    fs::read_to_string(&path).with_context(|| format!("Could not read {}", path.display()))
}
