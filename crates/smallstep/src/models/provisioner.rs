use crate::models::Union;
use serde::{Deserialize, Serialize};

/// A provisioner attached to an authority.
///
/// The type-specific fields are flattened into the same object as the
/// common ones; `details` captures them and `provisioner_type` says which
/// branch they belong to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provisioner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub provisioner_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<ProvisionerClaims>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ProvisionerOptions>,
    #[serde(flatten)]
    pub details: Union,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwkProvisioner {
    /// Public JWK
    pub key: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcProvisioner {
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub client_secret: String,
    pub configuration_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admins: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_address: Option<String>,
    #[serde(rename = "tenantID", default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcmeProvisioner {
    pub challenges: Vec<String>,
    #[serde(rename = "requireEAB")]
    pub require_eab: bool,
    #[serde(rename = "forceCN", default, skip_serializing_if = "Option::is_none")]
    pub force_cn: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcmeAttestationProvisioner {
    pub attestation_formats: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation_roots: Option<Vec<String>>,
    #[serde(rename = "requireEAB", default, skip_serializing_if = "Option::is_none")]
    pub require_eab: Option<bool>,
    #[serde(rename = "forceCN", default, skip_serializing_if = "Option::is_none")]
    pub force_cn: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct X5cProvisioner {
    pub roots: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsProvisioner {
    pub accounts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_trust_on_first_use: Option<bool>,
    #[serde(rename = "disableCustomSANs", default, skip_serializing_if = "Option::is_none")]
    pub disable_custom_sans: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpProvisioner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_accounts: Option<Vec<String>>,
    #[serde(rename = "projectIDs", default, skip_serializing_if = "Option::is_none")]
    pub project_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_trust_on_first_use: Option<bool>,
    #[serde(rename = "disableCustomSANs", default, skip_serializing_if = "Option::is_none")]
    pub disable_custom_sans: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureProvisioner {
    #[serde(rename = "tenantID")]
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_trust_on_first_use: Option<bool>,
    #[serde(rename = "disableCustomSANs", default, skip_serializing_if = "Option::is_none")]
    pub disable_custom_sans: Option<bool>,
}

/// Certificate lifetime limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProvisionerClaims {
    #[serde(rename = "minTLSCertDuration", skip_serializing_if = "Option::is_none")]
    pub min_tls_cert_duration: Option<String>,
    #[serde(rename = "maxTLSCertDuration", skip_serializing_if = "Option::is_none")]
    pub max_tls_cert_duration: Option<String>,
    #[serde(rename = "defaultTLSCertDuration", skip_serializing_if = "Option::is_none")]
    pub default_tls_cert_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_renewal: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_renewal_after_expiry: Option<bool>,
    #[serde(rename = "enableSSHCA", skip_serializing_if = "Option::is_none")]
    pub enable_ssh_ca: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_user_ssh_cert_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_user_ssh_cert_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_user_ssh_cert_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_host_ssh_cert_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_host_ssh_cert_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_host_ssh_cert_duration: Option<String>,
}

/// Certificate templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionerOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x509: Option<TemplateOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh: Option<TemplateOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_data: Option<serde_json::Value>,
}
