//! Provisioner type-specific configuration, claims and templates.
//!
//! The API flattens the type-specific fields into the provisioner object
//! and names the branch with `type`. Each branch is a sibling attribute
//! here, and the set branch must match `type`.

use crate::api::CLIENT_ERROR;
use crate::bridge::{
    from_remote, from_remote_once, from_remote_with, to_remote, to_remote_non_empty,
};
use crate::codec::{Codec, absent_object, decode, encode, parse_json, render_json};
use crate::equivalence::{duration_equal, json_equal};
use declarative::{Attr, Diagnostics, object};
use serde::de::DeserializeOwned;
use smallstep::models::{self, Union};

pub const JWK: &str = "JWK";
pub const OIDC: &str = "OIDC";
pub const ACME: &str = "ACME";
pub const ACME_ATTESTATION: &str = "ACME_ATTESTATION";
pub const X5C: &str = "X5C";
pub const AWS: &str = "AWS";
pub const GCP: &str = "GCP";
pub const AZURE: &str = "AZURE";

/// Every provisioner type, in schema order.
pub const TYPES: [&str; 8] = [JWK, OIDC, ACME, ACME_ATTESTATION, X5C, AWS, GCP, AZURE];


object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Jwk {
        pub key: Attr<String>,
        pub encrypted_key: Attr<String>,
    }
}

impl Jwk {
    pub fn to_api(&self) -> smallstep::Result<models::JwkProvisioner> {
        Ok(models::JwkProvisioner {
            key: parse_json("jwk key", self.key.value_str())?,
            encrypted_key: to_remote(&self.encrypted_key),
        })
    }

    pub fn from_api(remote: models::JwkProvisioner, prior: &Attr<Self>) -> Self {
        Self {
            key: from_remote_with(
                render_json(Some(remote.key)),
                &prior.get(|j| &j.key),
                json_equal,
            ),
            encrypted_key: from_remote(remote.encrypted_key, &prior.get(|j| &j.encrypted_key)),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Oidc {
        pub client_id: Attr<String>,
        pub client_secret: Attr<String>,
        pub configuration_endpoint: Attr<String>,
        pub admins: Attr<Vec<String>>,
        pub domains: Attr<Vec<String>>,
        pub groups: Attr<Vec<String>>,
        pub listen_address: Attr<String>,
        pub tenant_id: Attr<String>,
    }
}

impl Codec for Oidc {
    type Api = models::OidcProvisioner;

    fn to_api(&self) -> models::OidcProvisioner {
        models::OidcProvisioner {
            client_id: self.client_id.value_str().to_string(),
            client_secret: self.client_secret.value_str().to_string(),
            configuration_endpoint: self.configuration_endpoint.value_str().to_string(),
            admins: to_remote(&self.admins),
            domains: to_remote(&self.domains),
            groups: to_remote(&self.groups),
            listen_address: to_remote(&self.listen_address),
            tenant_id: to_remote(&self.tenant_id),
        }
    }

    fn from_api(remote: models::OidcProvisioner, prior: &Attr<Self>) -> Self {
        Self {
            client_id: from_remote(Some(remote.client_id), &prior.get(|o| &o.client_id)),
            client_secret: from_remote_once(
                Some(remote.client_secret),
                &prior.get(|o| &o.client_secret),
            ),
            configuration_endpoint: from_remote(
                Some(remote.configuration_endpoint),
                &prior.get(|o| &o.configuration_endpoint),
            ),
            admins: from_remote(remote.admins, &prior.get(|o| &o.admins)),
            domains: from_remote(remote.domains, &prior.get(|o| &o.domains)),
            groups: from_remote(remote.groups, &prior.get(|o| &o.groups)),
            listen_address: from_remote(remote.listen_address, &prior.get(|o| &o.listen_address)),
            tenant_id: from_remote(remote.tenant_id, &prior.get(|o| &o.tenant_id)),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Acme {
        pub challenges: Attr<Vec<String>>,
        pub require_eab: Attr<bool>,
        pub force_cn: Attr<bool>,
    }
}

impl Codec for Acme {
    type Api = models::AcmeProvisioner;

    fn to_api(&self) -> models::AcmeProvisioner {
        models::AcmeProvisioner {
            challenges: self.challenges.value_or(Vec::new()),
            require_eab: self.require_eab.value_or(false),
            force_cn: to_remote(&self.force_cn),
        }
    }

    fn from_api(remote: models::AcmeProvisioner, prior: &Attr<Self>) -> Self {
        Self {
            challenges: from_remote(Some(remote.challenges), &prior.get(|a| &a.challenges)),
            require_eab: from_remote(Some(remote.require_eab), &prior.get(|a| &a.require_eab)),
            force_cn: from_remote(remote.force_cn, &prior.get(|a| &a.force_cn)),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct AcmeAttestation {
        pub attestation_formats: Attr<Vec<String>>,
        pub attestation_roots: Attr<Vec<String>>,
        pub require_eab: Attr<bool>,
        pub force_cn: Attr<bool>,
    }
}

impl Codec for AcmeAttestation {
    type Api = models::AcmeAttestationProvisioner;

    fn to_api(&self) -> models::AcmeAttestationProvisioner {
        models::AcmeAttestationProvisioner {
            attestation_formats: self.attestation_formats.value_or(Vec::new()),
            attestation_roots: to_remote(&self.attestation_roots),
            require_eab: to_remote(&self.require_eab),
            force_cn: to_remote(&self.force_cn),
        }
    }

    fn from_api(remote: models::AcmeAttestationProvisioner, prior: &Attr<Self>) -> Self {
        Self {
            attestation_formats: from_remote(
                Some(remote.attestation_formats),
                &prior.get(|a| &a.attestation_formats),
            ),
            attestation_roots: from_remote(
                remote.attestation_roots,
                &prior.get(|a| &a.attestation_roots),
            ),
            require_eab: from_remote(remote.require_eab, &prior.get(|a| &a.require_eab)),
            force_cn: from_remote(remote.force_cn, &prior.get(|a| &a.force_cn)),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct X5c {
        pub roots: Attr<Vec<String>>,
    }
}

impl Codec for X5c {
    type Api = models::X5cProvisioner;

    fn to_api(&self) -> models::X5cProvisioner {
        models::X5cProvisioner {
            roots: self.roots.value_or(Vec::new()),
        }
    }

    fn from_api(remote: models::X5cProvisioner, prior: &Attr<Self>) -> Self {
        Self {
            roots: from_remote(Some(remote.roots), &prior.get(|x| &x.roots)),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Aws {
        pub accounts: Attr<Vec<String>>,
        pub instance_age: Attr<String>,
        pub disable_trust_on_first_use: Attr<bool>,
        pub disable_custom_sans: Attr<bool>,
    }
}

impl Codec for Aws {
    type Api = models::AwsProvisioner;

    fn to_api(&self) -> models::AwsProvisioner {
        models::AwsProvisioner {
            accounts: self.accounts.value_or(Vec::new()),
            instance_age: to_remote_non_empty(&self.instance_age),
            disable_trust_on_first_use: to_remote(&self.disable_trust_on_first_use),
            disable_custom_sans: to_remote(&self.disable_custom_sans),
        }
    }

    fn from_api(remote: models::AwsProvisioner, prior: &Attr<Self>) -> Self {
        Self {
            accounts: from_remote(Some(remote.accounts), &prior.get(|a| &a.accounts)),
            instance_age: from_remote_with(
                remote.instance_age,
                &prior.get(|a| &a.instance_age),
                duration_equal,
            ),
            disable_trust_on_first_use: from_remote(
                remote.disable_trust_on_first_use,
                &prior.get(|a| &a.disable_trust_on_first_use),
            ),
            disable_custom_sans: from_remote(
                remote.disable_custom_sans,
                &prior.get(|a| &a.disable_custom_sans),
            ),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Gcp {
        pub service_accounts: Attr<Vec<String>>,
        pub project_ids: Attr<Vec<String>>,
        pub instance_age: Attr<String>,
        pub disable_trust_on_first_use: Attr<bool>,
        pub disable_custom_sans: Attr<bool>,
    }
}

impl Codec for Gcp {
    type Api = models::GcpProvisioner;

    fn to_api(&self) -> models::GcpProvisioner {
        models::GcpProvisioner {
            service_accounts: to_remote(&self.service_accounts),
            project_ids: to_remote(&self.project_ids),
            instance_age: to_remote_non_empty(&self.instance_age),
            disable_trust_on_first_use: to_remote(&self.disable_trust_on_first_use),
            disable_custom_sans: to_remote(&self.disable_custom_sans),
        }
    }

    fn from_api(remote: models::GcpProvisioner, prior: &Attr<Self>) -> Self {
        Self {
            service_accounts: from_remote(
                remote.service_accounts,
                &prior.get(|g| &g.service_accounts),
            ),
            project_ids: from_remote(remote.project_ids, &prior.get(|g| &g.project_ids)),
            instance_age: from_remote_with(
                remote.instance_age,
                &prior.get(|g| &g.instance_age),
                duration_equal,
            ),
            disable_trust_on_first_use: from_remote(
                remote.disable_trust_on_first_use,
                &prior.get(|g| &g.disable_trust_on_first_use),
            ),
            disable_custom_sans: from_remote(
                remote.disable_custom_sans,
                &prior.get(|g| &g.disable_custom_sans),
            ),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Azure {
        pub tenant_id: Attr<String>,
        pub resource_groups: Attr<Vec<String>>,
        pub audience: Attr<String>,
        pub disable_trust_on_first_use: Attr<bool>,
        pub disable_custom_sans: Attr<bool>,
    }
}

impl Codec for Azure {
    type Api = models::AzureProvisioner;

    fn to_api(&self) -> models::AzureProvisioner {
        models::AzureProvisioner {
            tenant_id: self.tenant_id.value_str().to_string(),
            resource_groups: to_remote(&self.resource_groups),
            audience: to_remote(&self.audience),
            disable_trust_on_first_use: to_remote(&self.disable_trust_on_first_use),
            disable_custom_sans: to_remote(&self.disable_custom_sans),
        }
    }

    fn from_api(remote: models::AzureProvisioner, prior: &Attr<Self>) -> Self {
        Self {
            tenant_id: from_remote(Some(remote.tenant_id), &prior.get(|a| &a.tenant_id)),
            resource_groups: from_remote(
                remote.resource_groups,
                &prior.get(|a| &a.resource_groups),
            ),
            audience: from_remote(remote.audience, &prior.get(|a| &a.audience)),
            disable_trust_on_first_use: from_remote(
                remote.disable_trust_on_first_use,
                &prior.get(|a| &a.disable_trust_on_first_use),
            ),
            disable_custom_sans: from_remote(
                remote.disable_custom_sans,
                &prior.get(|a| &a.disable_custom_sans),
            ),
        }
    }
}

/// The provisioner variant family
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variants {
    pub jwk: Attr<Jwk>,
    pub oidc: Attr<Oidc>,
    pub acme: Attr<Acme>,
    pub acme_attestation: Attr<AcmeAttestation>,
    pub x5c: Attr<X5c>,
    pub aws: Attr<Aws>,
    pub gcp: Attr<Gcp>,
    pub azure: Attr<Azure>,
}

impl Variants {
    /// Attribute name of the branch that carries `provisioner_type`.
    pub fn attribute_for(provisioner_type: &str) -> Option<&'static str> {
        let name = match provisioner_type {
            JWK => "jwk",
            OIDC => "oidc",
            ACME => "acme",
            ACME_ATTESTATION => "acme_attestation",
            X5C => "x5c",
            AWS => "aws",
            GCP => "gcp",
            AZURE => "azure",
            _ => return None,
        };
        Some(name)
    }

    /// Pack the branch named by `provisioner_type` into the flattened
    /// details.
    pub fn encode(&self, provisioner_type: &str) -> smallstep::Result<Union> {
        let missing = || {
            smallstep::Error::encoding(
                "provisioner details",
                format!("type {provisioner_type} requires the matching configuration block"),
            )
        };
        match provisioner_type {
            JWK => Union::from_variant(&self.jwk.known().ok_or_else(missing)?.to_api()?),
            OIDC => Union::from_variant(&self.oidc.known().ok_or_else(missing)?.to_api()),
            ACME => Union::from_variant(&self.acme.known().ok_or_else(missing)?.to_api()),
            ACME_ATTESTATION => Union::from_variant(
                &self.acme_attestation.known().ok_or_else(missing)?.to_api(),
            ),
            X5C => Union::from_variant(&self.x5c.known().ok_or_else(missing)?.to_api()),
            AWS => Union::from_variant(&self.aws.known().ok_or_else(missing)?.to_api()),
            GCP => Union::from_variant(&self.gcp.known().ok_or_else(missing)?.to_api()),
            AZURE => Union::from_variant(&self.azure.known().ok_or_else(missing)?.to_api()),
            other => Err(smallstep::Error::encoding(
                "provisioner details",
                format!("unsupported provisioner type {other:?}"),
            )),
        }
    }

    /// Decode the branch named by `provisioner_type`; every other branch is
    /// null.
    pub fn decode(
        provisioner_type: &str,
        details: &Union,
        prior: &Self,
        diags: &mut Diagnostics,
    ) -> Self {
        let mut decoded = Self::default();
        match provisioner_type {
            JWK => match details.as_variant::<models::JwkProvisioner>() {
                Ok(api) => decoded.jwk = Attr::Known(Jwk::from_api(api, &prior.jwk)),
                Err(err) => diags.add_error(CLIENT_ERROR, format!("Failed to decode jwk: {err}")),
            },
            OIDC => decoded.oidc = extract(details, &prior.oidc, "oidc", diags),
            ACME => decoded.acme = extract(details, &prior.acme, "acme", diags),
            ACME_ATTESTATION => {
                decoded.acme_attestation =
                    extract(details, &prior.acme_attestation, "acme_attestation", diags);
            }
            X5C => decoded.x5c = extract(details, &prior.x5c, "x5c", diags),
            AWS => decoded.aws = extract(details, &prior.aws, "aws", diags),
            GCP => decoded.gcp = extract(details, &prior.gcp, "gcp", diags),
            AZURE => decoded.azure = extract(details, &prior.azure, "azure", diags),
            other => diags.add_error(
                CLIENT_ERROR,
                format!("Unsupported provisioner type {other:?} in API response"),
            ),
        }
        decoded
    }
}

fn extract<C>(details: &Union, prior: &Attr<C>, name: &str, diags: &mut Diagnostics) -> Attr<C>
where
    C: Codec,
    C::Api: DeserializeOwned,
{
    match details.as_variant::<C::Api>() {
        Ok(api) => Attr::Known(C::from_api(api, prior)),
        Err(err) => {
            diags.add_error(CLIENT_ERROR, format!("Failed to decode {name}: {err}"));
            Attr::Null
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Claims {
        pub min_tls_cert_duration: Attr<String>,
        pub max_tls_cert_duration: Attr<String>,
        pub default_tls_cert_duration: Attr<String>,
        pub disable_renewal: Attr<bool>,
        pub allow_renewal_after_expiry: Attr<bool>,
        pub enable_ssh_ca: Attr<bool>,
        pub min_user_ssh_cert_duration: Attr<String>,
        pub max_user_ssh_cert_duration: Attr<String>,
        pub default_user_ssh_cert_duration: Attr<String>,
        pub min_host_ssh_cert_duration: Attr<String>,
        pub max_host_ssh_cert_duration: Attr<String>,
        pub default_host_ssh_cert_duration: Attr<String>,
    }
}

fn duration(remote: Option<String>, prior: &Attr<String>) -> Attr<String> {
    from_remote_with(remote, prior, duration_equal)
}

impl Codec for Claims {
    type Api = models::ProvisionerClaims;

    fn to_api(&self) -> models::ProvisionerClaims {
        models::ProvisionerClaims {
            min_tls_cert_duration: to_remote_non_empty(&self.min_tls_cert_duration),
            max_tls_cert_duration: to_remote_non_empty(&self.max_tls_cert_duration),
            default_tls_cert_duration: to_remote_non_empty(&self.default_tls_cert_duration),
            disable_renewal: to_remote(&self.disable_renewal),
            allow_renewal_after_expiry: to_remote(&self.allow_renewal_after_expiry),
            enable_ssh_ca: to_remote(&self.enable_ssh_ca),
            min_user_ssh_cert_duration: to_remote_non_empty(&self.min_user_ssh_cert_duration),
            max_user_ssh_cert_duration: to_remote_non_empty(&self.max_user_ssh_cert_duration),
            default_user_ssh_cert_duration: to_remote_non_empty(
                &self.default_user_ssh_cert_duration,
            ),
            min_host_ssh_cert_duration: to_remote_non_empty(&self.min_host_ssh_cert_duration),
            max_host_ssh_cert_duration: to_remote_non_empty(&self.max_host_ssh_cert_duration),
            default_host_ssh_cert_duration: to_remote_non_empty(
                &self.default_host_ssh_cert_duration,
            ),
        }
    }

    fn from_api(remote: models::ProvisionerClaims, prior: &Attr<Self>) -> Self {
        Self {
            min_tls_cert_duration: duration(
                remote.min_tls_cert_duration,
                &prior.get(|c| &c.min_tls_cert_duration),
            ),
            max_tls_cert_duration: duration(
                remote.max_tls_cert_duration,
                &prior.get(|c| &c.max_tls_cert_duration),
            ),
            default_tls_cert_duration: duration(
                remote.default_tls_cert_duration,
                &prior.get(|c| &c.default_tls_cert_duration),
            ),
            disable_renewal: from_remote(
                remote.disable_renewal,
                &prior.get(|c| &c.disable_renewal),
            ),
            allow_renewal_after_expiry: from_remote(
                remote.allow_renewal_after_expiry,
                &prior.get(|c| &c.allow_renewal_after_expiry),
            ),
            enable_ssh_ca: from_remote(remote.enable_ssh_ca, &prior.get(|c| &c.enable_ssh_ca)),
            min_user_ssh_cert_duration: duration(
                remote.min_user_ssh_cert_duration,
                &prior.get(|c| &c.min_user_ssh_cert_duration),
            ),
            max_user_ssh_cert_duration: duration(
                remote.max_user_ssh_cert_duration,
                &prior.get(|c| &c.max_user_ssh_cert_duration),
            ),
            default_user_ssh_cert_duration: duration(
                remote.default_user_ssh_cert_duration,
                &prior.get(|c| &c.default_user_ssh_cert_duration),
            ),
            min_host_ssh_cert_duration: duration(
                remote.min_host_ssh_cert_duration,
                &prior.get(|c| &c.min_host_ssh_cert_duration),
            ),
            max_host_ssh_cert_duration: duration(
                remote.max_host_ssh_cert_duration,
                &prior.get(|c| &c.max_host_ssh_cert_duration),
            ),
            default_host_ssh_cert_duration: duration(
                remote.default_host_ssh_cert_duration,
                &prior.get(|c| &c.default_host_ssh_cert_duration),
            ),
        }
    }

    fn is_vacant(remote: &models::ProvisionerClaims) -> bool {
        *remote == models::ProvisionerClaims::default()
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Template {
        pub template: Attr<String>,
        pub template_data: Attr<String>,
    }
}

impl Template {
    fn to_api(&self) -> smallstep::Result<models::TemplateOptions> {
        let template_data = match self.template_data.known().filter(|d| !d.is_empty()) {
            Some(data) => Some(parse_json("template data", data)?),
            None => None,
        };
        Ok(models::TemplateOptions {
            template: to_remote(&self.template),
            template_data,
        })
    }

    fn from_api(remote: models::TemplateOptions, prior: &Attr<Self>) -> Self {
        Self {
            template: from_remote(remote.template, &prior.get(|t| &t.template)),
            template_data: from_remote_with(
                render_json(remote.template_data),
                &prior.get(|t| &t.template_data),
                json_equal,
            ),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Options {
        pub x509: Attr<Template>,
        pub ssh: Attr<Template>,
    }
}

impl Options {
    /// Encode the template options; an object with no templates is absent.
    pub fn encode(attr: &Attr<Self>) -> smallstep::Result<Option<models::ProvisionerOptions>> {
        let Some(options) = attr.known() else {
            return Ok(None);
        };
        let template = |t: &Attr<Template>| -> smallstep::Result<_> {
            Ok(match t.known() {
                Some(t) => {
                    Some(t.to_api()?).filter(|api| *api != models::TemplateOptions::default())
                }
                None => None,
            })
        };
        let api = models::ProvisionerOptions {
            x509: template(&options.x509)?,
            ssh: template(&options.ssh)?,
        };
        Ok(Some(api).filter(|api| *api != models::ProvisionerOptions::default()))
    }

    pub fn decode(remote: Option<models::ProvisionerOptions>, prior: &Attr<Self>) -> Attr<Self> {
        let Some(remote) = remote.filter(|api| *api != models::ProvisionerOptions::default())
        else {
            return absent_object(prior);
        };
        let template = |remote: Option<models::TemplateOptions>, prior: Attr<Template>| {
            match remote.filter(|api| *api != models::TemplateOptions::default()) {
                Some(api) => Attr::Known(Template::from_api(api, &prior)),
                None => absent_object(&prior),
            }
        };
        Attr::Known(Self {
            x509: template(remote.x509, prior.get(|o| &o.x509)),
            ssh: template(remote.ssh, prior.get(|o| &o.ssh)),
        })
    }
}

/// Encode claims, leaving out a block that sets nothing.
pub fn encode_claims(attr: &Attr<Claims>) -> Option<models::ProvisionerClaims> {
    encode(attr)
}

pub fn decode_claims(
    remote: Option<models::ProvisionerClaims>,
    prior: &Attr<Claims>,
) -> Attr<Claims> {
    decode(remote, prior)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUB_JWK: &str = r#"{"use":"sig","kty":"EC","kid":"k1","crv":"P-256","alg":"ES256","x":"ex","y":"why"}"#;

    fn jwk_variants() -> Variants {
        Variants {
            jwk: Attr::Known(Jwk {
                key: Attr::string(PUB_JWK),
                encrypted_key: Attr::string("eyJhbGciOi"),
            }),
            ..Variants::default()
        }
    }

    #[test]
    fn test_jwk_key_keeps_user_spelling() {
        let variants = jwk_variants();
        let union = variants.encode(JWK).unwrap();
        assert_eq!(union.as_map()["key"]["kty"], "EC");

        // The server reorders keys.
        let body = serde_json::json!({
            "key": {"alg": "ES256", "crv": "P-256", "kid": "k1", "kty": "EC", "use": "sig", "x": "ex", "y": "why"},
            "encryptedKey": "eyJhbGciOi",
        });
        let details: Union = serde_json::from_value(body).unwrap();
        let mut diags = Diagnostics::new();
        let decoded = Variants::decode(JWK, &details, &variants, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(decoded.jwk, variants.jwk);
    }

    #[test]
    fn test_jwk_import_renders_server_key() {
        let details: Union =
            serde_json::from_value(serde_json::json!({"key": {"kty": "EC"}})).unwrap();
        let mut diags = Diagnostics::new();
        let decoded = Variants::decode(JWK, &details, &Variants::default(), &mut diags);
        let jwk = decoded.jwk.into_known().unwrap();
        assert!(json_equal(jwk.key.value_str(), r#"{"kty": "EC"}"#));
        assert!(jwk.encrypted_key.is_null());
    }

    #[test]
    fn test_invalid_jwk_key_is_encoding_error() {
        let variants = Variants {
            jwk: Attr::Known(Jwk {
                key: Attr::string("not json"),
                encrypted_key: Attr::Null,
            }),
            ..Variants::default()
        };
        let err = variants.encode(JWK).unwrap_err();
        assert!(matches!(err, smallstep::Error::Encoding { .. }));
    }

    #[test]
    fn test_type_without_block_is_encoding_error() {
        assert!(jwk_variants().encode(ACME).is_err());
        assert!(jwk_variants().encode("SCEP").is_err());
    }

    #[test]
    fn test_acme_sends_required_fields() {
        let variants = Variants {
            acme: Attr::Known(Acme {
                challenges: Attr::Known(vec!["http-01".into()]),
                require_eab: Attr::Null,
                force_cn: Attr::Null,
            }),
            ..Variants::default()
        };
        let union = variants.encode(ACME).unwrap();
        assert_eq!(
            serde_json::to_value(&union).unwrap(),
            serde_json::json!({"challenges": ["http-01"], "requireEAB": false})
        );

        // requireEAB false comes back but the user never set it.
        let mut diags = Diagnostics::new();
        let decoded = Variants::decode(ACME, &union, &variants, &mut diags);
        assert_eq!(decoded, variants);
    }

    #[test]
    fn test_decode_other_branches_null() {
        let details: Union =
            serde_json::from_value(serde_json::json!({"roots": ["pem"]})).unwrap();
        let mut diags = Diagnostics::new();
        let decoded = Variants::decode(X5C, &details, &Variants::default(), &mut diags);
        assert!(decoded.jwk.is_null());
        assert_eq!(
            decoded.x5c.into_known().unwrap().roots,
            Attr::Known(vec!["pem".to_string()])
        );
    }

    #[test]
    fn test_decode_missing_required_field_reported() {
        let mut diags = Diagnostics::new();
        let decoded = Variants::decode(AZURE, &Union::default(), &Variants::default(), &mut diags);
        assert!(diags.has_error());
        assert!(decoded.azure.is_null());
    }

    #[test]
    fn test_decode_invalid_jwk_details_reported() {
        let details: Union =
            serde_json::from_value(serde_json::json!({"key": {"kty": "EC"}, "encryptedKey": 7}))
                .unwrap();
        let mut diags = Diagnostics::new();
        let decoded = Variants::decode(JWK, &details, &jwk_variants(), &mut diags);
        assert!(diags.has_error());
        assert!(diags.errors().any(|d| d.detail.contains("jwk")));
        assert_eq!(decoded, Variants::default());
    }

    #[test]
    fn test_decode_unsupported_type_reported() {
        let details: Union =
            serde_json::from_value(serde_json::json!({"challenges": ["http-01"]})).unwrap();
        let mut diags = Diagnostics::new();
        let decoded = Variants::decode("SCEP", &details, &jwk_variants(), &mut diags);
        assert_eq!(diags.errors().count(), 1);
        assert!(diags.errors().any(|d| d.detail.contains("SCEP")));
        assert_eq!(decoded, Variants::default());
    }

    #[test]
    fn test_claims_duration_spelling() {
        let prior = Attr::Known(Claims {
            max_tls_cert_duration: Attr::string("24h"),
            ..Claims::default()
        });
        let remote = models::ProvisionerClaims {
            max_tls_cert_duration: Some("24h0m0s".into()),
            ..Default::default()
        };
        let decoded = decode_claims(Some(remote), &prior);
        assert_eq!(decoded, prior);
        assert_eq!(encode_claims(&Attr::Known(Claims::default())), None);
    }

    #[test]
    fn test_options_template_data() {
        let options = Attr::Known(Options {
            x509: Attr::Known(Template {
                template: Attr::string("{{ toJson .Insecure.CR }}"),
                template_data: Attr::string(r#"{"a": 1, "b": 2}"#),
            }),
            ssh: Attr::Null,
        });
        let api = Options::encode(&options).unwrap().unwrap();
        assert_eq!(
            api.x509.as_ref().unwrap().template_data,
            Some(serde_json::json!({"a": 1, "b": 2}))
        );
        assert_eq!(Options::decode(Some(api), &options), options);
    }

    #[test]
    fn test_empty_options_survive() {
        let empty = Attr::Known(Options::default());
        assert_eq!(Options::encode(&empty).unwrap(), None);
        assert_eq!(Options::decode(None, &empty), empty);
        assert_eq!(Options::decode(None, &Attr::Null), Attr::Null);
    }
}
