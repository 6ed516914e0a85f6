//! `smallstep_provisioner_webhook`: a webhook called by a provisioner.
//!
//! The signing secret of an EXTERNAL webhook is returned only by the
//! create call, so state keeps it for the life of the resource.

use crate::api::{self, Lookup};
use crate::bridge::{from_remote, from_remote_once, to_remote, write_only};
use crate::describe::describe;
use crate::resources::{id_attribute, save_secret, split_import_id};
use anyhow::Result;
use declarative::{
    AtMostOneOf, Attr, AttrPath, Attribute, ConfigValidator, CreateRequest, CreateResponse,
    DeleteRequest, DeleteResponse, ImportRequest, ImportResponse, OneOf, ReadRequest,
    ReadResponse, RequiresReplace, Resource, Schema, UpdateRequest, UpdateResponse,
    UseStateForUnknown, Value, object,
};
use smallstep::Client;
use smallstep::models::{BasicAuth, ProvisionerWebhook};
use std::sync::Arc;

pub const TYPE_NAME: &str = "smallstep_provisioner_webhook";

const KINDS: [&str; 2] = ["ENRICHING", "AUTHORIZING"];
const CERT_TYPES: [&str; 3] = ["X509", "SSH", "ALL"];
const SERVER_TYPES: [&str; 2] = ["EXTERNAL", "HOSTED_ATTESTATION"];

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct BasicAuthModel {
        pub username: Attr<String>,
        pub password: Attr<String>,
    }
}

impl BasicAuthModel {
    fn to_api(&self) -> BasicAuth {
        BasicAuth {
            username: self.username.value_str().to_string(),
            password: self.password.value_str().to_string(),
        }
    }

    /// The server may echo the username but never the password.
    fn decode(remote: Option<BasicAuth>, prior: &Attr<Self>) -> Attr<Self> {
        let Some(remote) = remote else {
            return write_only(prior);
        };
        Attr::Known(Self {
            username: from_remote(Some(remote.username), &prior.get(|b| &b.username)),
            password: from_remote_once(Some(remote.password), &prior.get(|b| &b.password)),
        })
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct WebhookModel {
        pub id: Attr<String>,
        pub authority_id: Attr<String>,
        pub provisioner_id: Attr<String>,
        pub name: Attr<String>,
        pub kind: Attr<String>,
        pub cert_type: Attr<String>,
        pub server_type: Attr<String>,
        pub url: Attr<String>,
        pub secret: Attr<String>,
        pub bearer_token: Attr<String>,
        pub basic_auth: Attr<BasicAuthModel>,
        pub disable_tls_client_auth: Attr<bool>,
        pub collection_slug: Attr<String>,
        pub write_secret_file: Attr<String>,
    }
}

impl WebhookModel {
    fn to_api(&self) -> ProvisionerWebhook {
        ProvisionerWebhook {
            id: None,
            name: self.name.value_str().to_string(),
            kind: self.kind.value_str().to_string(),
            cert_type: self.cert_type.value_str().to_string(),
            server_type: self.server_type.value_str().to_string(),
            url: to_remote(&self.url),
            secret: None,
            bearer_token: to_remote(&self.bearer_token),
            basic_auth: self.basic_auth.known().map(BasicAuthModel::to_api),
            disable_tls_client_auth: to_remote(&self.disable_tls_client_auth),
            collection_slug: to_remote(&self.collection_slug),
        }
    }

    fn from_api(remote: ProvisionerWebhook, prior: &Attr<Self>) -> Self {
        Self {
            id: from_remote(remote.id, &prior.get(|w| &w.id)),
            authority_id: write_only(&prior.get(|w| &w.authority_id)),
            provisioner_id: write_only(&prior.get(|w| &w.provisioner_id)),
            name: from_remote(Some(remote.name), &prior.get(|w| &w.name)),
            kind: from_remote(Some(remote.kind), &prior.get(|w| &w.kind)),
            cert_type: from_remote(Some(remote.cert_type), &prior.get(|w| &w.cert_type)),
            server_type: from_remote(Some(remote.server_type), &prior.get(|w| &w.server_type)),
            url: from_remote(remote.url, &prior.get(|w| &w.url)),
            secret: from_remote_once(remote.secret, &prior.get(|w| &w.secret)),
            bearer_token: from_remote_once(remote.bearer_token, &prior.get(|w| &w.bearer_token)),
            basic_auth: BasicAuthModel::decode(remote.basic_auth, &prior.get(|w| &w.basic_auth)),
            disable_tls_client_auth: from_remote(
                remote.disable_tls_client_auth,
                &prior.get(|w| &w.disable_tls_client_auth),
            ),
            collection_slug: from_remote(
                remote.collection_slug,
                &prior.get(|w| &w.collection_slug),
            ),
            write_secret_file: write_only(&prior.get(|w| &w.write_secret_file)),
        }
    }

    fn name_or_id(&self) -> &str {
        match self.id.known() {
            Some(id) if !id.is_empty() => id,
            _ => self.name.value_str(),
        }
    }
}

/// Handler for [`TYPE_NAME`]
pub struct WebhookResource {
    client: Arc<Client>,
}

impl WebhookResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Resource for WebhookResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let doc = describe("provisionerWebhook")?;
        let basic = describe("basicAuth")?;
        let input = |attribute: Attribute| attribute.plan_modifier(RequiresReplace);

        Ok(Schema::new(doc.description.clone())
            .attribute("id", id_attribute(doc.property("id")))
            .attribute(
                "authority_id",
                input(
                    Attribute::string()
                        .required()
                        .description("The authority the provisioner belongs to."),
                ),
            )
            .attribute(
                "provisioner_id",
                input(
                    Attribute::string()
                        .required()
                        .description("The provisioner that calls this webhook."),
                ),
            )
            .attribute(
                "name",
                input(Attribute::string().required().description(doc.property("name"))),
            )
            .attribute(
                "kind",
                input(
                    Attribute::string()
                        .required()
                        .description(doc.property("kind"))
                        .validator(OneOf::new(KINDS)),
                ),
            )
            .attribute(
                "cert_type",
                input(
                    Attribute::string()
                        .required()
                        .description(doc.property("certType"))
                        .validator(OneOf::new(CERT_TYPES)),
                ),
            )
            .attribute(
                "server_type",
                input(
                    Attribute::string()
                        .required()
                        .description(doc.property("serverType"))
                        .validator(OneOf::new(SERVER_TYPES)),
                ),
            )
            .attribute(
                "url",
                input(Attribute::string().optional().description(doc.property("url"))),
            )
            .attribute(
                "secret",
                Attribute::string()
                    .computed()
                    .sensitive()
                    .description(doc.property("secret"))
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute(
                "bearer_token",
                input(
                    Attribute::string()
                        .optional()
                        .sensitive()
                        .description(doc.property("bearerToken")),
                ),
            )
            .attribute(
                "basic_auth",
                input(
                    Attribute::object([
                        (
                            "username",
                            Attribute::string()
                                .required()
                                .description(basic.property("username")),
                        ),
                        (
                            "password",
                            Attribute::string()
                                .required()
                                .sensitive()
                                .description(basic.property("password")),
                        ),
                    ])
                    .optional()
                    .description(doc.property("basicAuth")),
                ),
            )
            .attribute(
                "disable_tls_client_auth",
                input(
                    Attribute::bool()
                        .optional()
                        .description(doc.property("disableTLSClientAuth")),
                ),
            )
            .attribute(
                "collection_slug",
                input(
                    Attribute::string()
                        .optional()
                        .description(doc.property("collectionSlug")),
                ),
            )
            .attribute(
                "write_secret_file",
                input(
                    Attribute::string()
                        .optional()
                        .description("Write the webhook secret to this file, readable by the owner only."),
                ),
            ))
    }

    fn config_validators(&self) -> Vec<Box<dyn ConfigValidator>> {
        vec![Box::new(AtMostOneOf::new([
            AttrPath::root("bearer_token"),
            AttrPath::root("basic_auth"),
        ]))]
    }

    fn create(&self, req: CreateRequest, resp: &mut CreateResponse) {
        let Some(plan) = api::decode_model::<WebhookModel>(&mut resp.diagnostics, &req.plan) else {
            return;
        };
        let body = plan.to_api();
        let authority_id = plan.authority_id.value_str();
        let provisioner_id = plan.provisioner_id.value_str();
        log::debug!("create {TYPE_NAME} {} for provisioner {provisioner_id}", body.name);

        let result = self.client.post(
            &["authorities", authority_id, "provisioners", provisioner_id, "webhooks"],
            &body,
        );
        let Some(remote) = api::expect_json::<ProvisionerWebhook>(
            &mut resp.diagnostics,
            "create webhook",
            result,
            201,
        ) else {
            return;
        };
        let state = WebhookModel::from_api(remote, &Attr::Known(plan));
        save_secret(
            state.write_secret_file.known(),
            state.secret.known(),
            &mut resp.diagnostics,
        );
        resp.set_state(&state);
    }

    fn read(&self, req: ReadRequest, resp: &mut ReadResponse) {
        let Some(state) = api::decode_model::<WebhookModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let authority_id = state.authority_id.value_str();
        let provisioner_id = state.provisioner_id.value_str();
        let name_or_id = state.name_or_id();
        log::debug!("read {TYPE_NAME} {name_or_id} for provisioner {provisioner_id}");

        let result = self.client.get(&[
            "authorities",
            authority_id,
            "provisioners",
            provisioner_id,
            "webhooks",
            name_or_id,
        ]);
        match api::lookup::<ProvisionerWebhook>(&mut resp.diagnostics, "read webhook", result) {
            Lookup::Found(remote) => {
                resp.set_state(&WebhookModel::from_api(remote, &Attr::Known(state)));
                resp.private = req.private;
            }
            Lookup::Gone => resp.remove_resource(),
            Lookup::Failed => {}
        }
    }

    fn update(&self, _req: UpdateRequest, resp: &mut UpdateResponse) {
        resp.diagnostics.add_error(
            "Webhook Update Not Supported",
            "Update not supported; all changes require replacement.",
        );
    }

    fn delete(&self, req: DeleteRequest, resp: &mut DeleteResponse) {
        let Some(state) = api::decode_model::<WebhookModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.name_or_id();
        log::debug!("delete {TYPE_NAME} {id}");
        api::expect(
            &mut resp.diagnostics,
            "delete webhook",
            self.client.delete(&[
                "authorities",
                state.authority_id.value_str(),
                "provisioners",
                state.provisioner_id.value_str(),
                "webhooks",
                id,
            ]),
            204,
        );
    }

    fn import_state(&self, req: ImportRequest, resp: &mut ImportResponse) {
        let Some([authority_id, provisioner_id, name]) = split_import_id::<3>(
            &req.id,
            "<authority_id>/<provisioner_id>/<name>",
            &mut resp.diagnostics,
        ) else {
            return;
        };
        resp.set_attribute(&AttrPath::root("authority_id"), Value::String(authority_id));
        resp.set_attribute(&AttrPath::root("provisioner_id"), Value::String(provisioner_id));
        resp.set_attribute(&AttrPath::root("name"), Value::String(name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{self, UUID};
    use declarative::validate_config;
    use smallstep::Method;
    use smallstep::backend::MockBackend;

    const AUTHORITY: &str = "0b8a6c52-6f54-4a8b-9d0b-2f6a4c8a1e33";
    const PROVISIONER: &str = "6a0d2f1e-8c3b-4b7a-9e5d-1f2a3b4c5d6e";
    const ID: &str = "d2e1f0a9-3b4c-4d5e-8f6a-7b8c9d0e1f2a";
    const SECRET: &str = "c2lnbmluZy1zZWNyZXQtZm9yLXdlYmhvb2s=";
    const BASE64: &str = r"^[0-9A-Za-z+/]+={0,2}$";

    fn collection() -> String {
        format!("/authorities/{AUTHORITY}/provisioners/{PROVISIONER}/webhooks")
    }

    fn remote(secret: Option<&str>) -> String {
        let mut body = serde_json::json!({
            "id": ID,
            "name": "devices",
            "kind": "ENRICHING",
            "certType": "X509",
            "serverType": "EXTERNAL",
            "url": "https://hooks.example.com/devices",
        });
        if let Some(secret) = secret {
            body["secret"] = serde_json::json!(secret);
        }
        body.to_string()
    }

    fn config() -> Value {
        Value::object([
            ("authority_id", Value::string(AUTHORITY)),
            ("provisioner_id", Value::string(PROVISIONER)),
            ("name", Value::string("devices")),
            ("kind", Value::string("ENRICHING")),
            ("cert_type", Value::string("X509")),
            ("server_type", Value::string("EXTERNAL")),
            ("url", Value::string("https://hooks.example.com/devices")),
            ("bearer_token", Value::string("abc123")),
        ])
    }

    fn setup() -> (MockBackend, WebhookResource) {
        let mock = MockBackend::new();
        mock.respond(Method::Post, &collection(), 201, &remote(Some(SECRET)));
        mock.respond(Method::Get, &format!("{}/{ID}", collection()), 200, &remote(None));
        mock.respond(Method::Get, &format!("{}/devices", collection()), 200, &remote(None));
        let resource = WebhookResource::new(testing::client(&mock));
        (mock, resource)
    }

    #[test]
    fn test_create_keeps_secret_across_reads() {
        let (mock, resource) = setup();
        let created = testing::create(&resource, &config());
        assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
        assert!(testing::matches(UUID, created.state.at(&AttrPath::root("id"))));
        let secret = created.state.at(&AttrPath::root("secret"));
        assert!(testing::matches(BASE64, secret));

        let read = testing::read(&resource, &created.state, &created.private);
        assert!(read.diagnostics.is_empty());
        assert_eq!(read.state.at(&AttrPath::root("secret")), secret);
        assert_eq!(
            read.state.at(&AttrPath::root("bearer_token")),
            &Value::string("abc123")
        );
        assert_eq!(read.state, created.state);

        let sent = &mock.requests_to(Method::Post, &collection())[0];
        let body: serde_json::Value = sent.json().unwrap();
        assert_eq!(body["bearerToken"], "abc123");
        assert!(body.get("secret").is_none());
        assert!(body.get("basicAuth").is_none());
    }

    #[test]
    fn test_create_writes_secret_file() {
        let (_mock, resource) = setup();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("webhook.secret");
        let mut config = config();
        config
            .set_at(
                &AttrPath::root("write_secret_file"),
                Value::string(path.to_str().unwrap()),
            )
            .unwrap();

        let created = testing::create(&resource, &config);
        assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SECRET);
    }

    #[test]
    fn test_import_by_name() {
        let (_mock, resource) = setup();
        let (imported, refreshed) =
            testing::import(&resource, &format!("{AUTHORITY}/{PROVISIONER}/devices"));
        assert!(imported.diagnostics.is_empty());
        assert!(refreshed.diagnostics.is_empty(), "{:?}", refreshed.diagnostics);
        assert_eq!(refreshed.state.at(&AttrPath::root("id")), &Value::string(ID));
        assert_eq!(
            refreshed.state.at(&AttrPath::root("provisioner_id")),
            &Value::string(PROVISIONER)
        );
        assert!(refreshed.state.at(&AttrPath::root("secret")).is_null());
    }

    #[test]
    fn test_import_requires_three_parts() {
        let (_mock, resource) = setup();
        let (imported, _) = testing::import(&resource, &format!("{AUTHORITY}/devices"));
        let diag = imported.diagnostics.errors().next().unwrap();
        assert!(diag.detail.contains("<authority_id>/<provisioner_id>/<name>"));
    }

    #[test]
    fn test_bearer_and_basic_auth_conflict() {
        let resource = WebhookResource::new(testing::client(&MockBackend::new()));
        let mut config = config();
        config
            .set_at(
                &AttrPath::root("basic_auth"),
                Value::object([
                    ("username", Value::string("u")),
                    ("password", Value::string("p")),
                ]),
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
    fn test_read_removes_deleted_webhook() {
        let (mock, resource) = setup();
        let created = testing::create(&resource, &config());
        mock.replace(Method::Get, &format!("{}/{ID}", collection()), 404, "");
        let read = testing::read(&resource, &created.state, &created.private);
        assert!(read.diagnostics.is_empty());
        assert!(read.state.is_null());
    }
}
