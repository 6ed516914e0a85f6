//! `smallstep_collection_instance`: one JSON document in a collection.
//!
//! Instances are addressed by an id the user chooses; PUT both creates
//! and replaces them.

use crate::api::{self, Lookup};
use crate::bridge::{from_remote, from_remote_with, write_only};
use crate::codec::{parse_json, render_json};
use crate::describe::describe;
use crate::equivalence::{json_equal, timestamp_equal};
use crate::resources::split_import_id;
use anyhow::Result;
use declarative::{
    Attr, AttrPath, Attribute, CreateRequest, CreateResponse, DeleteRequest, DeleteResponse,
    Diagnostics, ImportRequest, ImportResponse, ReadRequest, ReadResponse, RequiresReplace,
    Resource, Schema, UpdateRequest, UpdateResponse, UseStateForUnknown, Value, ValueValidator,
    object,
};
use smallstep::Client;
use smallstep::models::{CollectionInstance, InstanceData};
use std::sync::Arc;

pub const TYPE_NAME: &str = "smallstep_collection_instance";

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct InstanceModel {
        pub collection_slug: Attr<String>,
        pub id: Attr<String>,
        pub data: Attr<String>,
        pub created_at: Attr<String>,
        pub updated_at: Attr<String>,
    }
}

impl InstanceModel {
    fn to_api(&self) -> smallstep::Result<InstanceData> {
        Ok(InstanceData {
            data: parse_json("instance data", self.data.value_str())?,
        })
    }

    fn from_api(remote: CollectionInstance, prior: &Attr<Self>) -> Self {
        Self {
            collection_slug: write_only(&prior.get(|i| &i.collection_slug)),
            id: from_remote(Some(remote.id), &prior.get(|i| &i.id)),
            data: from_remote_with(
                render_json(Some(remote.data)),
                &prior.get(|i| &i.data),
                json_equal,
            ),
            created_at: from_remote_with(
                remote.created_at,
                &prior.get(|i| &i.created_at),
                timestamp_equal,
            ),
            updated_at: from_remote_with(
                remote.updated_at,
                &prior.get(|i| &i.updated_at),
                timestamp_equal,
            ),
        }
    }

    fn path(&self) -> [&str; 4] {
        [
            "collections",
            self.collection_slug.value_str(),
            "instances",
            self.id.value_str(),
        ]
    }
}

/// String must hold a JSON object.
#[derive(Debug, Clone)]
struct JsonObject;

impl ValueValidator for JsonObject {
    fn description(&self) -> String {
        "value must be a JSON object".to_string()
    }

    fn validate(&self, path: &AttrPath, value: &Value, diags: &mut Diagnostics) {
        let Some(text) = value.as_str() else {
            return;
        };
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(serde_json::Value::Object(_)) => {}
            Ok(_) => diags.add_attribute_error(
                path.clone(),
                "Invalid JSON Object",
                format!("Attribute {path} {}, got another JSON type", self.description()),
            ),
            Err(err) => diags.add_attribute_error(
                path.clone(),
                "Invalid JSON Object",
                format!("Attribute {path} {}: {err}", self.description()),
            ),
        }
    }
}

/// Handler for [`TYPE_NAME`]
pub struct CollectionInstanceResource {
    client: Arc<Client>,
}

impl CollectionInstanceResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// PUT the planned document; create and update are the same call.
    fn put(
        &self,
        plan: &InstanceModel,
        action: &str,
        diags: &mut Diagnostics,
    ) -> Option<InstanceModel> {
        let body = match plan.to_api() {
            Ok(body) => body,
            Err(err) => {
                api::client_error(diags, "encode collection instance", err);
                return None;
            }
        };
        let result = self.client.put(&plan.path(), &body);
        let remote = api::expect_json::<CollectionInstance>(diags, action, result, 200)?;
        Some(InstanceModel::from_api(remote, &Attr::Known(plan.clone())))
    }
}

impl Resource for CollectionInstanceResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let doc = describe("collectionInstance")?;
        let timestamp = |name: &str| Attribute::string().computed().description(doc.property(name));
        Ok(Schema::new(doc.description.clone())
            .attribute(
                "collection_slug",
                Attribute::string()
                    .required()
                    .description("The collection this instance belongs to.")
                    .plan_modifier(RequiresReplace),
            )
            .attribute(
                "id",
                Attribute::string()
                    .required()
                    .description(doc.property("id"))
                    .plan_modifier(RequiresReplace),
            )
            .attribute(
                "data",
                Attribute::string()
                    .required()
                    .description(doc.property("data"))
                    .validator(JsonObject),
            )
            .attribute(
                "created_at",
                timestamp("createdAt").plan_modifier(UseStateForUnknown),
            )
            .attribute("updated_at", timestamp("updatedAt")))
    }

    fn create(&self, req: CreateRequest, resp: &mut CreateResponse) {
        let Some(plan) = api::decode_model::<InstanceModel>(&mut resp.diagnostics, &req.plan) else {
            return;
        };
        log::debug!(
            "create {TYPE_NAME} {}/{}",
            plan.collection_slug.value_str(),
            plan.id.value_str()
        );
        if let Some(state) = self.put(&plan, "create collection instance", &mut resp.diagnostics) {
            resp.set_state(&state);
        }
    }

    fn read(&self, req: ReadRequest, resp: &mut ReadResponse) {
        let Some(state) = api::decode_model::<InstanceModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        log::debug!(
            "read {TYPE_NAME} {}/{}",
            state.collection_slug.value_str(),
            state.id.value_str()
        );

        let result = self.client.get(&state.path());
        match api::lookup::<CollectionInstance>(
            &mut resp.diagnostics,
            "read collection instance",
            result,
        ) {
            Lookup::Found(remote) => {
                resp.set_state(&InstanceModel::from_api(remote, &Attr::Known(state)));
                resp.private = req.private;
            }
            Lookup::Gone => resp.remove_resource(),
            Lookup::Failed => {}
        }
    }

    fn update(&self, req: UpdateRequest, resp: &mut UpdateResponse) {
        let Some(plan) = api::decode_model::<InstanceModel>(&mut resp.diagnostics, &req.plan) else {
            return;
        };
        log::debug!(
            "update {TYPE_NAME} {}/{}",
            plan.collection_slug.value_str(),
            plan.id.value_str()
        );
        if let Some(state) = self.put(&plan, "update collection instance", &mut resp.diagnostics) {
            resp.set_state(&state);
            resp.private = req.private;
        }
    }

    fn delete(&self, req: DeleteRequest, resp: &mut DeleteResponse) {
        let Some(state) = api::decode_model::<InstanceModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        log::debug!(
            "delete {TYPE_NAME} {}/{}",
            state.collection_slug.value_str(),
            state.id.value_str()
        );
        api::expect(
            &mut resp.diagnostics,
            "delete collection instance",
            self.client.delete(&state.path()),
            204,
        );
    }

    fn import_state(&self, req: ImportRequest, resp: &mut ImportResponse) {
        let Some([slug, id]) =
            split_import_id::<2>(&req.id, "<collection_slug>/<instance_id>", &mut resp.diagnostics)
        else {
            return;
        };
        resp.set_attribute(&AttrPath::root("collection_slug"), Value::String(slug));
        resp.set_attribute(&AttrPath::root("id"), Value::String(id));
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

    const PATH: &str = "/collections/tpms/instances/laptop-1";

    fn remote(data: serde_json::Value) -> String {
        json!({
            "id": "laptop-1",
            "data": data,
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-01T10:00:00Z",
        })
        .to_string()
    }

    fn config(data: &str) -> Value {
        Value::object([
            ("collection_slug", Value::string("tpms")),
            ("id", Value::string("laptop-1")),
            ("data", Value::string(data)),
        ])
    }

    #[test]
    fn test_reordered_data_is_not_drift() {
        let mock = MockBackend::new();
        let data = json!({"owner": "ana@example.com", "ek": "abc"});
        mock.respond(Method::Put, PATH, 200, &remote(data.clone()));
        mock.respond(Method::Get, PATH, 200, &remote(data));
        let resource = CollectionInstanceResource::new(testing::client(&mock));

        let written = r#"{ "ek": "abc", "owner": "ana@example.com" }"#;
        let created = testing::create(&resource, &config(written));
        assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
        assert_eq!(created.state.at(&AttrPath::root("data")), &Value::string(written));

        let sent: serde_json::Value = mock.requests_to(Method::Put, PATH)[0].json().unwrap();
        assert_eq!(sent["data"]["owner"], "ana@example.com");

        let read = testing::read(&resource, &created.state, &created.private);
        assert_eq!(read.state, created.state);
        let change = testing::plan(&resource, &read.state, &config(written), &read.private);
        assert!(!change.has_changes(&read.state));
    }

    #[test]
    fn test_import_round_trip() {
        let mock = MockBackend::new();
        mock.respond(Method::Get, PATH, 200, &remote(json!({"ek": "abc"})));
        let resource = CollectionInstanceResource::new(testing::client(&mock));

        let (imported, refreshed) = testing::import(&resource, "tpms/laptop-1");
        assert!(imported.diagnostics.is_empty());
        assert!(refreshed.diagnostics.is_empty(), "{:?}", refreshed.diagnostics);
        assert!(json_equal(
            refreshed.state.at(&AttrPath::root("data")).as_str().unwrap(),
            r#"{"ek": "abc"}"#
        ));
        assert_eq!(
            refreshed.state.at(&AttrPath::root("collection_slug")),
            &Value::string("tpms")
        );
    }

    #[test]
    fn test_data_must_be_object() {
        let resource = CollectionInstanceResource::new(testing::client(&MockBackend::new()));
        let schema = resource.schema().unwrap();
        assert!(validate_config(&schema, &[], &config("[1, 2]")).has_error());
        assert!(validate_config(&schema, &[], &config("{")).has_error());
        assert!(validate_config(&schema, &[], &config(r#"{"a": 1}"#)).is_empty());
    }

    #[test]
    fn test_deleted_out_of_band() {
        let mock = MockBackend::new();
        mock.respond(Method::Put, PATH, 200, &remote(json!({"ek": "abc"})));
        mock.respond(Method::Get, PATH, 404, "");
        let resource = CollectionInstanceResource::new(testing::client(&mock));
        let created = testing::create(&resource, &config(r#"{"ek": "abc"}"#));
        let read = testing::read(&resource, &created.state, &created.private);
        assert!(read.diagnostics.is_empty());
        assert!(read.state.is_null());
    }
}
