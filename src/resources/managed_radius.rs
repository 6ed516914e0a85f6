//! `smallstep_managed_radius`: a RADIUS server hosted by Smallstep.
//!
//! The shared secret is generated by the server and returned only by the
//! create call.

use crate::api::{self, Lookup};
use crate::bridge::{from_remote, from_remote_once, to_remote, write_only};
use crate::describe::describe;
use crate::resources::{id_attribute, save_secret};
use anyhow::Result;
use declarative::{
    Attr, AttrPath, Attribute, CreateRequest, CreateResponse, DeleteRequest, DeleteResponse,
    Diagnostics, ReadRequest, ReadResponse, Resource, Schema, UpdateRequest, UpdateResponse,
    UseStateForUnknown, Value, ValueValidator, object,
};
use smallstep::Client;
use smallstep::models::{ManagedRadius, ReplyAttribute};
use std::sync::Arc;

pub const TYPE_NAME: &str = "smallstep_managed_radius";

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ReplyAttributeModel {
        pub name: Attr<String>,
        pub value: Attr<String>,
        pub value_from_certificate: Attr<String>,
    }
}

impl ReplyAttributeModel {
    fn to_api(&self) -> ReplyAttribute {
        ReplyAttribute {
            name: self.name.value_str().to_string(),
            value: to_remote(&self.value),
            value_from_certificate: to_remote(&self.value_from_certificate),
        }
    }

    fn from_api(remote: ReplyAttribute, prior: &Attr<Self>) -> Self {
        Self {
            name: from_remote(Some(remote.name), &prior.get(|r| &r.name)),
            value: from_remote(remote.value, &prior.get(|r| &r.value)),
            value_from_certificate: from_remote(
                remote.value_from_certificate,
                &prior.get(|r| &r.value_from_certificate),
            ),
        }
    }
}

/// Decode the reply attributes, matching each against the prior element
/// at the same position.
fn decode_reply_attributes(
    remote: Option<Vec<ReplyAttribute>>,
    prior: &Attr<Vec<ReplyAttributeModel>>,
) -> Attr<Vec<ReplyAttributeModel>> {
    let remote = remote.unwrap_or_default();
    if remote.is_empty() {
        return match prior {
            Attr::Known(items) if items.is_empty() => prior.clone(),
            _ => Attr::Null,
        };
    }
    let prior_items = prior.known().cloned().unwrap_or_default();
    Attr::Known(
        remote
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let prior_item = Attr::from_option(prior_items.get(i).cloned());
                ReplyAttributeModel::from_api(item, &prior_item)
            })
            .collect(),
    )
}

/// Each reply attribute takes its value from exactly one source.
#[derive(Debug, Clone)]
struct OneValueSource;

impl ValueValidator for OneValueSource {
    fn description(&self) -> String {
        "each reply attribute sets exactly one of value or value_from_certificate".to_string()
    }

    fn validate(&self, path: &AttrPath, value: &Value, diags: &mut Diagnostics) {
        let Value::List(items) = value else {
            return;
        };
        for (i, item) in items.iter().enumerate() {
            let sources = [
                item.at(&AttrPath::root("value")),
                item.at(&AttrPath::root("value_from_certificate")),
            ];
            if sources.iter().any(|s| s.is_unknown()) {
                continue;
            }
            let set = sources.iter().filter(|s| !s.is_null()).count();
            if set != 1 {
                diags.add_attribute_error(
                    path.clone().index(i),
                    "Invalid Reply Attribute",
                    format!("Reply attribute {i} must set exactly one of value or value_from_certificate."),
                );
            }
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ManagedRadiusModel {
        pub id: Attr<String>,
        pub name: Attr<String>,
        pub nas_ips: Attr<Vec<String>>,
        pub client_ca: Attr<String>,
        pub reply_attributes: Attr<Vec<ReplyAttributeModel>>,
        pub server_ca: Attr<String>,
        pub server_ip: Attr<String>,
        pub server_port: Attr<String>,
        pub server_hostname: Attr<String>,
        pub secret: Attr<String>,
        pub write_secret_file: Attr<String>,
    }
}

impl ManagedRadiusModel {
    fn to_api(&self) -> ManagedRadius {
        ManagedRadius {
            id: None,
            name: self.name.value_str().to_string(),
            nas_ips: to_remote(&self.nas_ips).unwrap_or_default(),
            client_ca: self.client_ca.value_str().to_string(),
            reply_attributes: self
                .reply_attributes
                .known()
                .filter(|items| !items.is_empty())
                .map(|items| items.iter().map(ReplyAttributeModel::to_api).collect()),
            ..ManagedRadius::default()
        }
    }

    fn from_api(remote: ManagedRadius, prior: &Attr<Self>) -> Self {
        Self {
            id: from_remote(remote.id, &prior.get(|r| &r.id)),
            name: from_remote(Some(remote.name), &prior.get(|r| &r.name)),
            nas_ips: from_remote(Some(remote.nas_ips), &prior.get(|r| &r.nas_ips)),
            client_ca: from_remote(Some(remote.client_ca), &prior.get(|r| &r.client_ca)),
            reply_attributes: decode_reply_attributes(
                remote.reply_attributes,
                &prior.get(|r| &r.reply_attributes),
            ),
            server_ca: from_remote(remote.server_ca, &prior.get(|r| &r.server_ca)),
            server_ip: from_remote(remote.server_ip, &prior.get(|r| &r.server_ip)),
            server_port: from_remote(remote.server_port, &prior.get(|r| &r.server_port)),
            server_hostname: from_remote(
                remote.server_hostname,
                &prior.get(|r| &r.server_hostname),
            ),
            secret: from_remote_once(remote.secret, &prior.get(|r| &r.secret)),
            write_secret_file: write_only(&prior.get(|r| &r.write_secret_file)),
        }
    }
}

/// Handler for [`TYPE_NAME`]
pub struct ManagedRadiusResource {
    client: Arc<Client>,
}

impl ManagedRadiusResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Resource for ManagedRadiusResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let doc = describe("managedRadius")?;
        let reply = describe("replyAttribute")?;
        let server = |name: &str| {
            Attribute::string()
                .computed()
                .description(doc.property(name))
                .plan_modifier(UseStateForUnknown)
        };

        Ok(Schema::new(doc.description.clone())
            .attribute("id", id_attribute(doc.property("id")))
            .attribute(
                "name",
                Attribute::string().required().description(doc.property("name")),
            )
            .attribute(
                "nas_ips",
                Attribute::string_list()
                    .required()
                    .description(doc.property("nasIPs")),
            )
            .attribute(
                "client_ca",
                Attribute::string()
                    .required()
                    .description(doc.property("clientCA")),
            )
            .attribute(
                "reply_attributes",
                Attribute::object_list([
                    (
                        "name",
                        Attribute::string().required().description(reply.property("name")),
                    ),
                    (
                        "value",
                        Attribute::string().optional().description(reply.property("value")),
                    ),
                    (
                        "value_from_certificate",
                        Attribute::string()
                            .optional()
                            .description(reply.property("valueFromCertificate")),
                    ),
                ])
                .optional()
                .description(doc.property("replyAttributes"))
                .validator(OneValueSource),
            )
            .attribute("server_ca", server("serverCA"))
            .attribute("server_ip", server("serverIP"))
            .attribute("server_port", server("serverPort"))
            .attribute("server_hostname", server("serverHostname"))
            .attribute(
                "secret",
                Attribute::string()
                    .computed()
                    .sensitive()
                    .description(doc.property("secret"))
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute(
                "write_secret_file",
                Attribute::string()
                    .optional()
                    .description("Write the RADIUS secret to this file, readable by the owner only."),
            ))
    }

    fn create(&self, req: CreateRequest, resp: &mut CreateResponse) {
        let Some(plan) = api::decode_model::<ManagedRadiusModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        let body = plan.to_api();
        log::debug!("create {TYPE_NAME} {}", body.name);

        let result = self.client.post(&["managed-radius"], &body);
        let Some(remote) = api::expect_json::<ManagedRadius>(
            &mut resp.diagnostics,
            "create managed radius",
            result,
            201,
        ) else {
            return;
        };
        let state = ManagedRadiusModel::from_api(remote, &Attr::Known(plan));
        save_secret(
            state.write_secret_file.known(),
            state.secret.known(),
            &mut resp.diagnostics,
        );
        resp.set_state(&state);
    }

    fn read(&self, req: ReadRequest, resp: &mut ReadResponse) {
        let Some(state) = api::decode_model::<ManagedRadiusModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("read {TYPE_NAME} {id}");

        let result = self.client.get(&["managed-radius", id]);
        match api::lookup::<ManagedRadius>(&mut resp.diagnostics, "read managed radius", result) {
            Lookup::Found(remote) => {
                resp.set_state(&ManagedRadiusModel::from_api(remote, &Attr::Known(state)));
                resp.private = req.private;
            }
            Lookup::Gone => resp.remove_resource(),
            Lookup::Failed => {}
        }
    }

    fn update(&self, req: UpdateRequest, resp: &mut UpdateResponse) {
        let Some(plan) = api::decode_model::<ManagedRadiusModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        let Some(prior) = api::decode_model::<ManagedRadiusModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = prior.id.value_str();
        log::debug!("update {TYPE_NAME} {id}");

        let mut body = plan.to_api();
        body.id = Some(id.to_string());
        let result = self.client.put(&["managed-radius", id], &body);
        let Some(remote) = api::expect_json::<ManagedRadius>(
            &mut resp.diagnostics,
            "update managed radius",
            result,
            200,
        ) else {
            return;
        };
        let state = ManagedRadiusModel::from_api(remote, &Attr::Known(plan));
        // A new destination gets the secret kept in state.
        if state.write_secret_file != prior.write_secret_file {
            save_secret(
                state.write_secret_file.known(),
                state.secret.known(),
                &mut resp.diagnostics,
            );
        }
        resp.set_state(&state);
        resp.private = req.private;
    }

    fn delete(&self, req: DeleteRequest, resp: &mut DeleteResponse) {
        let Some(state) = api::decode_model::<ManagedRadiusModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("delete {TYPE_NAME} {id}");
        api::expect(
            &mut resp.diagnostics,
            "delete managed radius",
            self.client.delete(&["managed-radius", id]),
            204,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing;
    use declarative::validate_config;
    use serde_json::json;
    use smallstep::Method;
    use smallstep::backend::MockBackend;

    const ID: &str = "5e4d3c2b-1a09-4f8e-b7d6-c5b4a3928170";
    const SECRET: &str = "cmFkaXVzLXNoYXJlZC1zZWNyZXQ=";
    const CA: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

    fn remote(name: &str, secret: Option<&str>) -> String {
        let mut body = json!({
            "id": ID,
            "name": name,
            "nasIPs": ["10.0.0.1"],
            "clientCA": CA,
            "replyAttributes": [
                {"name": "Tunnel-Type", "value": "13"},
                {"name": "Tunnel-Private-Group-ID", "valueFromCertificate": "1.3.6.1.4.1.37476.9000.64.1"},
            ],
            "serverCA": CA,
            "serverIP": "34.1.2.3",
            "serverPort": "1812",
            "serverHostname": "radius.example.smallstep.com",
        });
        if let Some(secret) = secret {
            body["secret"] = json!(secret);
        }
        body.to_string()
    }

    /// A list element as the host sends it, every attribute present.
    fn reply(name: &str, source: &str, value: &str) -> Value {
        let mut element = Value::object([
            ("name", Value::string(name)),
            ("value", Value::Null),
            ("value_from_certificate", Value::Null),
        ]);
        element
            .set_at(&AttrPath::root(source), Value::string(value))
            .unwrap();
        element
    }

    fn config(name: &str) -> Value {
        Value::object([
            ("name", Value::string(name)),
            ("nas_ips", Value::List(vec![Value::string("10.0.0.1")])),
            ("client_ca", Value::string(CA)),
            (
                "reply_attributes",
                Value::List(vec![
                    reply("Tunnel-Type", "value", "13"),
                    reply(
                        "Tunnel-Private-Group-ID",
                        "value_from_certificate",
                        "1.3.6.1.4.1.37476.9000.64.1",
                    ),
                ]),
            ),
        ])
    }

    fn setup() -> (MockBackend, ManagedRadiusResource) {
        let mock = MockBackend::new();
        mock.respond(Method::Post, "/managed-radius", 201, &remote("office", Some(SECRET)));
        mock.respond(Method::Get, &format!("/managed-radius/{ID}"), 200, &remote("office", None));
        let resource = ManagedRadiusResource::new(testing::client(&mock));
        (mock, resource)
    }

    #[test]
    fn test_create_and_read_keep_secret() {
        let (mock, resource) = setup();
        let created = testing::create(&resource, &config("office"));
        assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
        assert_eq!(created.state.at(&AttrPath::root("secret")), &Value::string(SECRET));
        assert_eq!(
            created.state.at(&AttrPath::root("server_port")),
            &Value::string("1812")
        );

        let sent: serde_json::Value =
            mock.requests_to(Method::Post, "/managed-radius")[0].json().unwrap();
        assert_eq!(
            sent["replyAttributes"][1]["valueFromCertificate"],
            "1.3.6.1.4.1.37476.9000.64.1"
        );
        assert!(sent["replyAttributes"][1].get("value").is_none());
        assert!(sent.get("secret").is_none());

        let read = testing::read(&resource, &created.state, &created.private);
        assert_eq!(read.state, created.state);
        let change = testing::plan(&resource, &read.state, &config("office"), &read.private);
        assert!(!change.has_changes(&read.state));
    }

    #[test]
    fn test_update_writes_secret_to_new_file() {
        let (mock, resource) = setup();
        let created = testing::create(&resource, &config("office"));
        mock.respond(Method::Put, &format!("/managed-radius/{ID}"), 200, &remote("office", None));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radius.secret");
        let mut changed = config("office");
        changed
            .set_at(
                &AttrPath::root("write_secret_file"),
                Value::string(path.to_str().unwrap()),
            )
            .unwrap();
        let updated = testing::update(&resource, &created.state, &changed, &created.private);
        assert!(updated.diagnostics.is_empty(), "{:?}", updated.diagnostics);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SECRET);
        assert_eq!(updated.state.at(&AttrPath::root("secret")), &Value::string(SECRET));
    }

    #[test]
    fn test_reply_attribute_needs_one_source() {
        let resource = ManagedRadiusResource::new(testing::client(&MockBackend::new()));
        let schema = resource.schema().unwrap();

        let mut both = config("office");
        both.set_at(
            &AttrPath::root("reply_attributes"),
            Value::List(vec![Value::object([
                ("name", Value::string("Tunnel-Type")),
                ("value", Value::string("13")),
                ("value_from_certificate", Value::string("1.2.3")),
            ])]),
        )
        .unwrap();
        let diags = validate_config(&schema, &[], &both);
        let diag = diags.errors().next().unwrap();
        assert_eq!(diag.path, Some(AttrPath::root("reply_attributes").index(0)));

        assert!(validate_config(&schema, &[], &config("office")).is_empty());
    }

    #[test]
    fn test_deleted_out_of_band() {
        let (mock, resource) = setup();
        let created = testing::create(&resource, &config("office"));
        mock.replace(Method::Get, &format!("/managed-radius/{ID}"), 404, "");
        let read = testing::read(&resource, &created.state, &created.private);
        assert!(read.diagnostics.is_empty());
        assert!(read.state.is_null());
    }
}
