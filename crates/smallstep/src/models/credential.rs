use crate::models::common::{EndpointKeyInfo, Files, Policy, X509Fields};
use serde::{Deserialize, Serialize};

/// A certificate issued to every device matching a policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub slug: String,
    pub certificate: CredentialCertificate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<EndpointKeyInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<Policy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Files>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialCertificate {
    #[serde(rename = "authorityID", default, skip_serializing_if = "Option::is_none")]
    pub authority_id: Option<String>,
    /// Go duration string; the server defaults it when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x509: Option<X509Fields>,
}
