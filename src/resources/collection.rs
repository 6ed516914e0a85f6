//! `smallstep_collection`: a collection of device data, addressed by slug.

use crate::api::{self, Lookup};
use crate::bridge::{from_remote, from_remote_with, to_remote};
use crate::describe::{Description, describe};
use crate::equivalence::timestamp_equal;
use anyhow::Result;
use declarative::{
    Attr, AttrPath, Attribute, CreateRequest, CreateResponse, DeleteRequest, DeleteResponse,
    ImportRequest, ImportResponse, ReadRequest, ReadResponse, RequiresReplace, Resource, Schema,
    UpdateRequest, UpdateResponse, UseStateForUnknown, Value, object,
};
use smallstep::Client;
use smallstep::models::{Collection, CollectionUpdate, NewCollection};
use std::sync::Arc;

pub const TYPE_NAME: &str = "smallstep_collection";

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct CollectionModel {
        pub slug: Attr<String>,
        pub display_name: Attr<String>,
        pub instance_count: Attr<i64>,
        pub created_at: Attr<String>,
        pub updated_at: Attr<String>,
    }
}

impl CollectionModel {
    pub(crate) fn from_api(remote: Collection, prior: &Attr<Self>) -> Self {
        Self {
            slug: from_remote(Some(remote.slug), &prior.get(|c| &c.slug)),
            display_name: from_remote(remote.display_name, &prior.get(|c| &c.display_name)),
            instance_count: from_remote(remote.instance_count, &prior.get(|c| &c.instance_count)),
            created_at: from_remote_with(
                remote.created_at,
                &prior.get(|c| &c.created_at),
                timestamp_equal,
            ),
            updated_at: from_remote_with(
                remote.updated_at,
                &prior.get(|c| &c.updated_at),
                timestamp_equal,
            ),
        }
    }
}

/// Every attribute but the slug.
fn collection_attributes(doc: &Description) -> Vec<(&'static str, Attribute)> {
    let computed = |name: &str| Attribute::string().computed().description(doc.property(name));
    vec![
        (
            "display_name",
            Attribute::string()
                .optional()
                .description(doc.property("displayName")),
        ),
        (
            "instance_count",
            Attribute::int64()
                .computed()
                .description(doc.property("instanceCount")),
        ),
        (
            "created_at",
            computed("createdAt").plan_modifier(UseStateForUnknown),
        ),
        ("updated_at", computed("updatedAt")),
    ]
}

/// Handler for [`TYPE_NAME`]
pub struct CollectionResource {
    client: Arc<Client>,
}

impl CollectionResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Resource for CollectionResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let doc = describe("collection")?;
        let mut schema = Schema::new(doc.description.clone()).attribute(
            "slug",
            Attribute::string()
                .required()
                .description(doc.property("slug"))
                .plan_modifier(RequiresReplace),
        );
        for (name, attribute) in collection_attributes(&doc) {
            schema = schema.attribute(name, attribute);
        }
        Ok(schema)
    }

    fn create(&self, req: CreateRequest, resp: &mut CreateResponse) {
        let Some(plan) = api::decode_model::<CollectionModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        let body = NewCollection {
            slug: plan.slug.value_str().to_string(),
            display_name: to_remote(&plan.display_name),
        };
        log::debug!("create {TYPE_NAME} {}", body.slug);

        let result = self.client.post(&["collections"], &body);
        let Some(remote) =
            api::expect_json::<Collection>(&mut resp.diagnostics, "create collection", result, 201)
        else {
            return;
        };
        resp.set_state(&CollectionModel::from_api(remote, &Attr::Known(plan)));
    }

    fn read(&self, req: ReadRequest, resp: &mut ReadResponse) {
        let Some(state) = api::decode_model::<CollectionModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let slug = state.slug.value_str();
        log::debug!("read {TYPE_NAME} {slug}");

        let result = self.client.get(&["collections", slug]);
        match api::lookup::<Collection>(&mut resp.diagnostics, "read collection", result) {
            Lookup::Found(remote) => {
                resp.set_state(&CollectionModel::from_api(remote, &Attr::Known(state)));
                resp.private = req.private;
            }
            Lookup::Gone => resp.remove_resource(),
            Lookup::Failed => {}
        }
    }

    fn update(&self, req: UpdateRequest, resp: &mut UpdateResponse) {
        let Some(plan) = api::decode_model::<CollectionModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        let slug = plan.slug.value_str();
        log::debug!("update {TYPE_NAME} {slug}");

        let body = CollectionUpdate {
            display_name: to_remote(&plan.display_name),
        };
        let result = self.client.put(&["collections", slug], &body);
        let Some(remote) =
            api::expect_json::<Collection>(&mut resp.diagnostics, "update collection", result, 200)
        else {
            return;
        };
        resp.set_state(&CollectionModel::from_api(remote, &Attr::Known(plan)));
        resp.private = req.private;
    }

    fn delete(&self, req: DeleteRequest, resp: &mut DeleteResponse) {
        let Some(state) = api::decode_model::<CollectionModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let slug = state.slug.value_str();
        log::debug!("delete {TYPE_NAME} {slug}");
        api::expect(
            &mut resp.diagnostics,
            "delete collection",
            self.client.delete(&["collections", slug]),
            204,
        );
    }

    fn import_state(&self, req: ImportRequest, resp: &mut ImportResponse) {
        resp.set_attribute(&AttrPath::root("slug"), Value::String(req.id));
    }
}
