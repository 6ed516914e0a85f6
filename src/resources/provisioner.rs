//! `smallstep_provisioner`: a provisioner attached to an authority.
//!
//! Provisioners cannot be updated; every attribute forces replacement.
//! The `type` attribute selects which configuration block is sent.

use crate::api::{self, Lookup};
use crate::bridge::{from_remote, from_remote_with, write_only};
use crate::codec::provisioner::{
    Acme, AcmeAttestation, Aws, Azure, Claims, Gcp, Jwk, Oidc, Options, TYPES, Variants, X5c,
    decode_claims, encode_claims,
};
use crate::describe::{Description, describe};
use crate::equivalence::timestamp_equal;
use crate::resources::{id_attribute, split_import_id};
use anyhow::Result;
use declarative::{
    Attr, AttrPath, Attribute, ConfigValidator, CreateRequest, CreateResponse, DeleteRequest,
    DeleteResponse, Diagnostics, ExactlyOneOf, ImportRequest, ImportResponse, OneOf, ReadRequest,
    ReadResponse, RequiresReplace, Resource, Schema, UpdateRequest, UpdateResponse,
    UseStateForUnknown, Value, object,
};
use smallstep::Client;
use smallstep::models::Provisioner;
use std::sync::Arc;

pub const TYPE_NAME: &str = "smallstep_provisioner";

const VARIANTS: [&str; 8] = [
    "jwk",
    "oidc",
    "acme",
    "acme_attestation",
    "x5c",
    "aws",
    "gcp",
    "azure",
];

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ProvisionerModel {
        pub id: Attr<String>,
        pub authority_id: Attr<String>,
        pub name: Attr<String>,
        pub provisioner_type: Attr<String> => "type",
        pub created_at: Attr<String>,
        pub claims: Attr<Claims>,
        pub options: Attr<Options>,
        pub jwk: Attr<Jwk>,
        pub oidc: Attr<Oidc>,
        pub acme: Attr<Acme>,
        pub acme_attestation: Attr<AcmeAttestation>,
        pub x5c: Attr<X5c>,
        pub aws: Attr<Aws>,
        pub gcp: Attr<Gcp>,
        pub azure: Attr<Azure>,
    }
}

impl ProvisionerModel {
    fn variants(&self) -> Variants {
        Variants {
            jwk: self.jwk.clone(),
            oidc: self.oidc.clone(),
            acme: self.acme.clone(),
            acme_attestation: self.acme_attestation.clone(),
            x5c: self.x5c.clone(),
            aws: self.aws.clone(),
            gcp: self.gcp.clone(),
            azure: self.azure.clone(),
        }
    }

    fn to_api(&self) -> smallstep::Result<Provisioner> {
        Ok(Provisioner {
            id: None,
            name: self.name.value_str().to_string(),
            provisioner_type: self.provisioner_type.value_str().to_string(),
            created_at: None,
            claims: encode_claims(&self.claims),
            options: Options::encode(&self.options)?,
            details: self.variants().encode(self.provisioner_type.value_str())?,
        })
    }

    pub(crate) fn from_api(
        remote: Provisioner,
        prior: &Attr<Self>,
        diags: &mut Diagnostics,
    ) -> Self {
        let prior_variants = prior.known().map(Self::variants).unwrap_or_default();
        let variants =
            Variants::decode(&remote.provisioner_type, &remote.details, &prior_variants, diags);
        Self {
            id: from_remote(remote.id, &prior.get(|p| &p.id)),
            authority_id: write_only(&prior.get(|p| &p.authority_id)),
            name: from_remote(Some(remote.name), &prior.get(|p| &p.name)),
            provisioner_type: from_remote(
                Some(remote.provisioner_type),
                &prior.get(|p| &p.provisioner_type),
            ),
            created_at: from_remote_with(
                remote.created_at,
                &prior.get(|p| &p.created_at),
                timestamp_equal,
            ),
            claims: decode_claims(remote.claims, &prior.get(|p| &p.claims)),
            options: Options::decode(remote.options, &prior.get(|p| &p.options)),
            jwk: variants.jwk,
            oidc: variants.oidc,
            acme: variants.acme,
            acme_attestation: variants.acme_attestation,
            x5c: variants.x5c,
            aws: variants.aws,
            gcp: variants.gcp,
            azure: variants.azure,
        }
    }

    /// Path segment the API accepts for this provisioner: its id, or its
    /// name right after an import.
    pub(crate) fn name_or_id(&self) -> &str {
        match self.id.known() {
            Some(id) if !id.is_empty() => id,
            _ => self.name.value_str(),
        }
    }
}

/// The block named by `type` must be the one that is set.
#[derive(Debug)]
struct TypeSelectsBlock;

impl ConfigValidator for TypeSelectsBlock {
    fn description(&self) -> String {
        "The configuration block matching type must be set".to_string()
    }

    fn validate(&self, config: &Value, diags: &mut Diagnostics) {
        let Some(provisioner_type) = config.at(&AttrPath::root("type")).as_str() else {
            return;
        };
        let Some(attribute) = Variants::attribute_for(provisioner_type) else {
            return;
        };
        if config.at(&AttrPath::root(attribute)).is_null() {
            diags.add_attribute_error(
                AttrPath::root(attribute),
                "Missing Provisioner Configuration",
                format!("A provisioner of type {provisioner_type} requires the {attribute} block."),
            );
        }
    }
}

/// Every attribute of a provisioner forces replacement.
fn input(attribute: Attribute) -> Attribute {
    attribute.plan_modifier(RequiresReplace)
}

fn string_field(doc: &Description, name: &str) -> Attribute {
    Attribute::string().optional().description(doc.property(name))
}

fn required_string(doc: &Description, name: &str) -> Attribute {
    Attribute::string().required().description(doc.property(name))
}

fn bool_field(doc: &Description, name: &str) -> Attribute {
    Attribute::bool().optional().description(doc.property(name))
}

fn list_field(doc: &Description, name: &str) -> Attribute {
    Attribute::string_list().optional().description(doc.property(name))
}

fn variant_attributes() -> Result<Vec<(&'static str, Attribute)>> {
    let jwk = describe("jwkProvisioner")?;
    let oidc = describe("oidcProvisioner")?;
    let acme = describe("acmeProvisioner")?;
    let attestation = describe("acmeAttestationProvisioner")?;
    let x5c = describe("x5cProvisioner")?;
    let aws = describe("awsProvisioner")?;
    let gcp = describe("gcpProvisioner")?;
    let azure = describe("azureProvisioner")?;

    let variants = vec![
        (
            "jwk",
            Attribute::object([
                ("key", required_string(&jwk, "key")),
                (
                    "encrypted_key",
                    string_field(&jwk, "encryptedKey").sensitive(),
                ),
            ])
            .description(&jwk.description),
        ),
        (
            "oidc",
            Attribute::object([
                ("client_id", required_string(&oidc, "clientID")),
                ("client_secret", required_string(&oidc, "clientSecret").sensitive()),
                (
                    "configuration_endpoint",
                    required_string(&oidc, "configurationEndpoint"),
                ),
                ("admins", list_field(&oidc, "admins")),
                ("domains", list_field(&oidc, "domains")),
                ("groups", list_field(&oidc, "groups")),
                ("listen_address", string_field(&oidc, "listenAddress")),
                ("tenant_id", string_field(&oidc, "tenantID")),
            ])
            .description(&oidc.description),
        ),
        (
            "acme",
            Attribute::object([
                (
                    "challenges",
                    Attribute::string_list()
                        .required()
                        .description(acme.property("challenges")),
                ),
                ("require_eab", bool_field(&acme, "requireEAB")),
                ("force_cn", bool_field(&acme, "forceCN")),
            ])
            .description(&acme.description),
        ),
        (
            "acme_attestation",
            Attribute::object([
                (
                    "attestation_formats",
                    Attribute::string_list()
                        .required()
                        .description(attestation.property("attestationFormats")),
                ),
                ("attestation_roots", list_field(&attestation, "attestationRoots")),
                ("require_eab", bool_field(&attestation, "requireEAB")),
                ("force_cn", bool_field(&attestation, "forceCN")),
            ])
            .description(&attestation.description),
        ),
        (
            "x5c",
            Attribute::object([(
                "roots",
                Attribute::string_list()
                    .required()
                    .description(x5c.property("roots")),
            )])
            .description(&x5c.description),
        ),
        (
            "aws",
            Attribute::object([
                (
                    "accounts",
                    Attribute::string_list()
                        .required()
                        .description(aws.property("accounts")),
                ),
                ("instance_age", string_field(&aws, "instanceAge")),
                (
                    "disable_trust_on_first_use",
                    bool_field(&aws, "disableTrustOnFirstUse"),
                ),
                ("disable_custom_sans", bool_field(&aws, "disableCustomSANs")),
            ])
            .description(&aws.description),
        ),
        (
            "gcp",
            Attribute::object([
                ("service_accounts", list_field(&gcp, "serviceAccounts")),
                ("project_ids", list_field(&gcp, "projectIDs")),
                ("instance_age", string_field(&gcp, "instanceAge")),
                (
                    "disable_trust_on_first_use",
                    bool_field(&gcp, "disableTrustOnFirstUse"),
                ),
                ("disable_custom_sans", bool_field(&gcp, "disableCustomSANs")),
            ])
            .description(&gcp.description),
        ),
        (
            "azure",
            Attribute::object([
                ("tenant_id", required_string(&azure, "tenantID")),
                ("resource_groups", list_field(&azure, "resourceGroups")),
                ("audience", string_field(&azure, "audience")),
                (
                    "disable_trust_on_first_use",
                    bool_field(&azure, "disableTrustOnFirstUse"),
                ),
                ("disable_custom_sans", bool_field(&azure, "disableCustomSANs")),
            ])
            .description(&azure.description),
        ),
    ];
    Ok(variants
        .into_iter()
        .map(|(name, attribute)| (name, input(attribute.optional())))
        .collect())
}

fn claims_attribute(description: &str) -> Result<Attribute> {
    let claims = describe("provisionerClaims")?;
    Ok(Attribute::object([
        ("min_tls_cert_duration", string_field(&claims, "minTLSCertDuration")),
        ("max_tls_cert_duration", string_field(&claims, "maxTLSCertDuration")),
        ("default_tls_cert_duration", string_field(&claims, "defaultTLSCertDuration")),
        ("disable_renewal", bool_field(&claims, "disableRenewal")),
        ("allow_renewal_after_expiry", bool_field(&claims, "allowRenewalAfterExpiry")),
        ("enable_ssh_ca", bool_field(&claims, "enableSSHCA")),
        ("min_user_ssh_cert_duration", string_field(&claims, "minUserSSHCertDuration")),
        ("max_user_ssh_cert_duration", string_field(&claims, "maxUserSSHCertDuration")),
        ("default_user_ssh_cert_duration", string_field(&claims, "defaultUserSSHCertDuration")),
        ("min_host_ssh_cert_duration", string_field(&claims, "minHostSSHCertDuration")),
        ("max_host_ssh_cert_duration", string_field(&claims, "maxHostSSHCertDuration")),
        ("default_host_ssh_cert_duration", string_field(&claims, "defaultHostSSHCertDuration")),
    ])
    .optional()
    .description(description))
}

fn options_attribute(description: &str) -> Result<Attribute> {
    let options = describe("provisionerOptions")?;
    let template = describe("templateOptions")?;
    let template_attribute = |name: &str| {
        Attribute::object([
            ("template", string_field(&template, "template")),
            ("template_data", string_field(&template, "templateData")),
        ])
        .optional()
        .description(options.property(name))
    };
    Ok(Attribute::object([
        ("x509", template_attribute("x509")),
        ("ssh", template_attribute("ssh")),
    ])
    .optional()
    .description(description))
}

/// Handler for [`TYPE_NAME`]
pub struct ProvisionerResource {
    client: Arc<Client>,
}

impl ProvisionerResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Resource for ProvisionerResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let doc = describe("provisioner")?;
        let mut schema = Schema::new(doc.description.clone())
            .attribute("id", id_attribute(doc.property("id")))
            .attribute(
                "authority_id",
                input(required_string(&doc, "authorityID")),
            )
            .attribute("name", input(required_string(&doc, "name")))
            .attribute(
                "type",
                input(required_string(&doc, "type").validator(OneOf::new(TYPES))),
            )
            .attribute(
                "created_at",
                Attribute::string()
                    .computed()
                    .description(doc.property("createdAt"))
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute("claims", input(claims_attribute(doc.property("claims"))?))
            .attribute("options", input(options_attribute(doc.property("options"))?));
        for (name, attribute) in variant_attributes()? {
            schema = schema.attribute(name, attribute);
        }
        Ok(schema)
    }

    fn config_validators(&self) -> Vec<Box<dyn ConfigValidator>> {
        vec![
            Box::new(ExactlyOneOf::new(VARIANTS.map(AttrPath::root))),
            Box::new(TypeSelectsBlock),
        ]
    }

    fn create(&self, req: CreateRequest, resp: &mut CreateResponse) {
        let Some(plan) = api::decode_model::<ProvisionerModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        let body = match plan.to_api() {
            Ok(body) => body,
            Err(err) => {
                api::client_error(&mut resp.diagnostics, "encode provisioner", err);
                return;
            }
        };
        let authority_id = plan.authority_id.value_str();
        log::debug!("create {TYPE_NAME} {} in {authority_id}", body.name);

        let result = self
            .client
            .post(&["authorities", authority_id, "provisioners"], &body);
        let Some(remote) = api::expect_json::<Provisioner>(
            &mut resp.diagnostics,
            "create provisioner",
            result,
            201,
        ) else {
            return;
        };
        let state = ProvisionerModel::from_api(remote, &Attr::Known(plan), &mut resp.diagnostics);
        if resp.diagnostics.has_error() {
            return;
        }
        resp.set_state(&state);
    }

    fn read(&self, req: ReadRequest, resp: &mut ReadResponse) {
        let Some(state) = api::decode_model::<ProvisionerModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let authority_id = state.authority_id.value_str();
        let name_or_id = state.name_or_id();
        log::debug!("read {TYPE_NAME} {name_or_id} in {authority_id}");

        let result = self
            .client
            .get(&["authorities", authority_id, "provisioners", name_or_id]);
        match api::lookup::<Provisioner>(&mut resp.diagnostics, "read provisioner", result) {
            Lookup::Found(remote) => {
                let model =
                    ProvisionerModel::from_api(remote, &Attr::Known(state), &mut resp.diagnostics);
                if resp.diagnostics.has_error() {
                    return;
                }
                resp.set_state(&model);
                resp.private = req.private;
            }
            Lookup::Gone => resp.remove_resource(),
            Lookup::Failed => {}
        }
    }

    fn update(&self, _req: UpdateRequest, resp: &mut UpdateResponse) {
        resp.diagnostics.add_error(
            "Provisioner Update Not Supported",
            "Update not supported; all changes require replacement.",
        );
    }

    fn delete(&self, req: DeleteRequest, resp: &mut DeleteResponse) {
        let Some(state) = api::decode_model::<ProvisionerModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let authority_id = state.authority_id.value_str();
        let id = state.name_or_id();
        log::debug!("delete {TYPE_NAME} {id} in {authority_id}");
        api::expect(
            &mut resp.diagnostics,
            "delete provisioner",
            self.client
                .delete(&["authorities", authority_id, "provisioners", id]),
            204,
        );
    }

    fn import_state(&self, req: ImportRequest, resp: &mut ImportResponse) {
        let Some([authority_id, name]) =
            split_import_id::<2>(&req.id, "<authority_id>/<name>", &mut resp.diagnostics)
        else {
            return;
        };
        resp.set_attribute(&AttrPath::root("authority_id"), Value::String(authority_id));
        resp.set_attribute(&AttrPath::root("name"), Value::String(name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equivalence::json_equal;
    use crate::resources::testing::{self, UUID};
    use declarative::{PrivateState, validate_config};
    use smallstep::Method;
    use smallstep::backend::MockBackend;

    const AUTHORITY: &str = "0b8a6c52-6f54-4a8b-9d0b-2f6a4c8a1e33";
    const ID: &str = "6a0d2f1e-8c3b-4b7a-9e5d-1f2a3b4c5d6e";
    const PUB: &str = r#"{"use":"sig","kty":"EC","kid":"k1","crv":"P-256","alg":"ES256","x":"ex","y":"why"}"#;
    const PRIV: &str = "eyJhbGciOiJQQkVTMi1IUzI1NitBMTI4S1ciLCJlbmMiOiJBMjU2R0NNIn0";

    fn remote_body() -> String {
        serde_json::json!({
            "id": ID,
            "authorityID": AUTHORITY,
            "name": "e@s.com",
            "type": "JWK",
            "createdAt": "2025-01-02T03:04:05Z",
            "key": {"alg": "ES256", "crv": "P-256", "kid": "k1", "kty": "EC", "use": "sig", "x": "ex", "y": "why"},
            "encryptedKey": PRIV,
            "claims": {"maxTLSCertDuration": "24h0m0s"},
        })
        .to_string()
    }

    fn config() -> Value {
        Value::object([
            ("authority_id", Value::string(AUTHORITY)),
            ("name", Value::string("e@s.com")),
            ("type", Value::string("JWK")),
            (
                "jwk",
                Value::object([
                    ("key", Value::string(PUB)),
                    ("encrypted_key", Value::string(PRIV)),
                ]),
            ),
            (
                "claims",
                Value::object([("max_tls_cert_duration", Value::string("24h"))]),
            ),
        ])
    }

    fn setup() -> (MockBackend, ProvisionerResource) {
        let mock = MockBackend::new();
        let collection = format!("/authorities/{AUTHORITY}/provisioners");
        mock.respond(Method::Post, &collection, 201, &remote_body());
        mock.respond(Method::Get, &format!("{collection}/{ID}"), 200, &remote_body());
        mock.respond(Method::Get, &format!("{collection}/e@s.com"), 200, &remote_body());
        let resource = ProvisionerResource::new(testing::client(&mock));
        (mock, resource)
    }

    fn key_of(state: &Value) -> String {
        state
            .at(&AttrPath::parse("jwk.key"))
            .as_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_create_jwk_provisioner() {
        let (mock, resource) = setup();
        let created = testing::create(&resource, &config());
        assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
        assert!(testing::matches(UUID, created.state.at(&AttrPath::root("id"))));
        assert_eq!(key_of(&created.state), PUB);
        assert_eq!(
            created.state.at(&AttrPath::parse("claims.max_tls_cert_duration")),
            &Value::string("24h")
        );
        assert!(created.state.at(&AttrPath::root("oidc")).is_null());

        let collection = format!("/authorities/{AUTHORITY}/provisioners");
        let sent = &mock.requests_to(Method::Post, &collection)[0];
        let body: serde_json::Value = sent.json().unwrap();
        assert_eq!(body["type"], "JWK");
        assert_eq!(body["key"]["kty"], "EC");
        assert_eq!(body["claims"]["maxTLSCertDuration"], "24h");
    }

    #[test]
    fn test_read_is_stable() {
        let (_mock, resource) = setup();
        let created = testing::create(&resource, &config());
        let first = testing::read(&resource, &created.state, &created.private);
        let second = testing::read(&resource, &first.state, &first.private);
        assert_eq!(first.state, created.state);
        assert_eq!(second.state, first.state);
    }

    #[test]
    fn test_undecodable_read_keeps_no_partial_state() {
        let (mock, resource) = setup();
        let created = testing::create(&resource, &config());
        let mut body: serde_json::Value = serde_json::from_str(&remote_body()).unwrap();
        body["encryptedKey"] = serde_json::json!(7);
        let path = format!("/authorities/{AUTHORITY}/provisioners/{ID}");
        mock.replace(Method::Get, &path, 200, &body.to_string());

        let read = testing::read(&resource, &created.state, &created.private);
        assert!(read.diagnostics.has_error());
        assert!(read.state.is_null());
    }

    #[test]
    fn test_import_by_name() {
        let (_mock, resource) = setup();
        let created = testing::create(&resource, &config());
        let (imported, refreshed) = testing::import(&resource, &format!("{AUTHORITY}/e@s.com"));
        assert!(imported.diagnostics.is_empty());
        assert!(refreshed.diagnostics.is_empty(), "{:?}", refreshed.diagnostics);

        let state = &refreshed.state;
        assert_eq!(state.at(&AttrPath::root("id")), created.state.at(&AttrPath::root("id")));
        assert_eq!(
            state.at(&AttrPath::root("authority_id")),
            &Value::string(AUTHORITY)
        );
        assert!(json_equal(&key_of(state), &key_of(&created.state)));
        assert_eq!(
            state.at(&AttrPath::parse("jwk.encrypted_key")),
            &Value::string(PRIV)
        );
    }

    #[test]
    fn test_malformed_import_id() {
        let (_mock, resource) = setup();
        let (imported, _) = testing::import(&resource, "just-a-name");
        assert!(imported.diagnostics.has_error());
    }

    #[test]
    fn test_type_must_match_block() {
        let resource = ProvisionerResource::new(testing::client(&MockBackend::new()));
        let mut config = config();
        config.set_at(&AttrPath::root("type"), Value::string("ACME")).unwrap();
        let diags = validate_config(
            &resource.schema().unwrap(),
            &resource.config_validators(),
            &config,
        );
        let diag = diags.errors().next().unwrap();
        assert_eq!(diag.path, Some(AttrPath::root("acme")));
    }

    #[test]
    fn test_two_blocks_conflict() {
        let resource = ProvisionerResource::new(testing::client(&MockBackend::new()));
        let mut config = config();
        config
            .set_at(
                &AttrPath::root("x5c"),
                Value::object([("roots", Value::List(vec![Value::string("pem")]))]),
            )
            .unwrap();
        let diags = validate_config(
            &resource.schema().unwrap(),
            &resource.config_validators(),
            &config,
        );
        assert!(diags.has_error());
    }

    #[test]
    fn test_any_change_requires_replace() {
        let (_mock, resource) = setup();
        let created = testing::create(&resource, &config());
        let mut changed = config();
        changed
            .set_at(&AttrPath::parse("claims.max_tls_cert_duration"), Value::string("48h"))
            .unwrap();
        let change = testing::plan(&resource, &created.state, &changed, &PrivateState::new());
        assert_eq!(change.requires_replace, vec![AttrPath::root("claims")]);
    }

    #[test]
    fn test_update_is_rejected() {
        let (_mock, resource) = setup();
        let mut resp = UpdateResponse::default();
        resource.update(UpdateRequest::default(), &mut resp);
        assert!(resp.diagnostics.has_error());
    }
}
