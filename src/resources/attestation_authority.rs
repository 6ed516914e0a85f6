//! `smallstep_attestation_authority`: issues attestation certificates to
//! devices whose keys chain to the attestor roots.

use crate::api::{self, Lookup};
use crate::bridge::{from_remote, from_remote_with, to_remote};
use crate::describe::{Description, describe};
use crate::equivalence::timestamp_equal;
use crate::resources::id_attribute;
use anyhow::Result;
use declarative::{
    Attr, Attribute, CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest,
    ReadResponse, RequiresReplace, Resource, Schema, UpdateRequest, UpdateResponse,
    UseStateForUnknown, object,
};
use smallstep::Client;
use smallstep::models::{AttestationAuthority, AttestationAuthorityUpdate};
use std::sync::Arc;

pub const TYPE_NAME: &str = "smallstep_attestation_authority";

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct AttestationAuthorityModel {
        pub id: Attr<String>,
        pub name: Attr<String>,
        pub attestor_roots: Attr<String>,
        pub attestor_intermediates: Attr<String>,
        pub root: Attr<String>,
        pub slug: Attr<String>,
        pub created_at: Attr<String>,
    }
}

impl AttestationAuthorityModel {
    fn to_api(&self) -> AttestationAuthority {
        AttestationAuthority {
            name: self.name.value_str().to_string(),
            attestor_roots: self.attestor_roots.value_str().to_string(),
            attestor_intermediates: to_remote(&self.attestor_intermediates),
            ..AttestationAuthority::default()
        }
    }

    pub(crate) fn from_api(remote: AttestationAuthority, prior: &Attr<Self>) -> Self {
        Self {
            id: from_remote(remote.id, &prior.get(|a| &a.id)),
            name: from_remote(Some(remote.name), &prior.get(|a| &a.name)),
            attestor_roots: from_remote(
                Some(remote.attestor_roots),
                &prior.get(|a| &a.attestor_roots),
            ),
            attestor_intermediates: from_remote(
                remote.attestor_intermediates,
                &prior.get(|a| &a.attestor_intermediates),
            ),
            root: from_remote(remote.root, &prior.get(|a| &a.root)),
            slug: from_remote(remote.slug, &prior.get(|a| &a.slug)),
            created_at: from_remote_with(
                remote.created_at,
                &prior.get(|a| &a.created_at),
                timestamp_equal,
            ),
        }
    }
}

/// Server-derived attributes, shared with the data source.
pub(crate) fn derived_attributes(doc: &Description) -> [(&'static str, Attribute); 3] {
    let derived = |name: &str| {
        Attribute::string()
            .computed()
            .description(doc.property(name))
            .plan_modifier(UseStateForUnknown)
    };
    [
        ("root", derived("root")),
        ("slug", derived("slug")),
        ("created_at", derived("createdAt")),
    ]
}

/// Handler for [`TYPE_NAME`]
pub struct AttestationAuthorityResource {
    client: Arc<Client>,
}

impl AttestationAuthorityResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Resource for AttestationAuthorityResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let doc = describe("attestationAuthority")?;
        let mut schema = Schema::new(doc.description.clone())
            .attribute("id", id_attribute(doc.property("id")))
            .attribute(
                "name",
                Attribute::string().required().description(doc.property("name")),
            )
            .attribute(
                "attestor_roots",
                Attribute::string()
                    .required()
                    .description(doc.property("attestorRoots"))
                    .plan_modifier(RequiresReplace),
            )
            .attribute(
                "attestor_intermediates",
                Attribute::string()
                    .optional()
                    .description(doc.property("attestorIntermediates"))
                    .plan_modifier(RequiresReplace),
            );
        for (name, attribute) in derived_attributes(&doc) {
            schema = schema.attribute(name, attribute);
        }
        Ok(schema)
    }

    fn create(&self, req: CreateRequest, resp: &mut CreateResponse) {
        let Some(plan) =
            api::decode_model::<AttestationAuthorityModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        let body = plan.to_api();
        log::debug!("create {TYPE_NAME} {}", body.name);

        let result = self.client.post(&["attestation-authorities"], &body);
        let Some(remote) = api::expect_json::<AttestationAuthority>(
            &mut resp.diagnostics,
            "create attestation authority",
            result,
            201,
        ) else {
            return;
        };
        resp.set_state(&AttestationAuthorityModel::from_api(remote, &Attr::Known(plan)));
    }

    fn read(&self, req: ReadRequest, resp: &mut ReadResponse) {
        let Some(state) =
            api::decode_model::<AttestationAuthorityModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("read {TYPE_NAME} {id}");

        let result = self.client.get(&["attestation-authorities", id]);
        match api::lookup::<AttestationAuthority>(
            &mut resp.diagnostics,
            "read attestation authority",
            result,
        ) {
            Lookup::Found(remote) => {
                resp.set_state(&AttestationAuthorityModel::from_api(remote, &Attr::Known(state)));
                resp.private = req.private;
            }
            Lookup::Gone => resp.remove_resource(),
            Lookup::Failed => {}
        }
    }

    fn update(&self, req: UpdateRequest, resp: &mut UpdateResponse) {
        let Some(plan) =
            api::decode_model::<AttestationAuthorityModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        let Some(prior) =
            api::decode_model::<AttestationAuthorityModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = prior.id.value_str();
        log::debug!("update {TYPE_NAME} {id}");

        let body = AttestationAuthorityUpdate {
            name: plan.name.value_str().to_string(),
        };
        let result = self.client.put(&["attestation-authorities", id], &body);
        let Some(remote) = api::expect_json::<AttestationAuthority>(
            &mut resp.diagnostics,
            "update attestation authority",
            result,
            200,
        ) else {
            return;
        };
        resp.set_state(&AttestationAuthorityModel::from_api(remote, &Attr::Known(plan)));
        resp.private = req.private;
    }

    fn delete(&self, req: DeleteRequest, resp: &mut DeleteResponse) {
        let Some(state) =
            api::decode_model::<AttestationAuthorityModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("delete {TYPE_NAME} {id}");
        api::expect(
            &mut resp.diagnostics,
            "delete attestation authority",
            self.client.delete(&["attestation-authorities", id]),
            204,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{self, UUID};
    use declarative::{AttrPath, Value};
    use serde_json::json;
    use smallstep::Method;
    use smallstep::backend::MockBackend;

    const ID: &str = "1b2c3d4e-5f60-4718-9a2b-3c4d5e6f7a8b";
    const ROOTS: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

    fn remote(name: &str) -> String {
        json!({
            "id": ID,
            "name": name,
            "attestorRoots": ROOTS,
            "root": "-----BEGIN CERTIFICATE-----\nMIIC\n-----END CERTIFICATE-----\n",
            "slug": "devices",
            "createdAt": "2024-05-01T12:00:00Z",
        })
        .to_string()
    }

    fn config(name: &str) -> Value {
        Value::object([
            ("name", Value::string(name)),
            ("attestor_roots", Value::string(ROOTS)),
        ])
    }

    #[test]
    fn test_create_then_rename() {
        let mock = MockBackend::new();
        mock.respond(Method::Post, "/attestation-authorities", 201, &remote("devices"));
        let path = format!("/attestation-authorities/{ID}");
        mock.respond(Method::Get, &path, 200, &remote("devices"));
        mock.respond(Method::Put, &path, 200, &remote("laptops"));
        let resource = AttestationAuthorityResource::new(testing::client(&mock));

        let created = testing::create(&resource, &config("devices"));
        assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
        assert!(testing::matches(UUID, created.state.at(&AttrPath::root("id"))));
        assert!(created.state.at(&AttrPath::root("attestor_intermediates")).is_null());

        let read = testing::read(&resource, &created.state, &created.private);
        assert_eq!(read.state, created.state);

        let change = testing::plan(&resource, &read.state, &config("laptops"), &read.private);
        assert!(change.requires_replace.is_empty());
        let updated = testing::update(&resource, &read.state, &config("laptops"), &read.private);
        assert!(updated.diagnostics.is_empty(), "{:?}", updated.diagnostics);
        let sent: serde_json::Value = mock
            .requests_to(Method::Put, &format!("/attestation-authorities/{ID}"))[0]
            .json()
            .unwrap();
        assert_eq!(sent, json!({"name": "laptops"}));
        assert_eq!(
            updated.state.at(&AttrPath::root("slug")),
            &Value::string("devices")
        );
    }

    #[test]
    fn test_new_roots_require_replace() {
        let mock = MockBackend::new();
        mock.respond(Method::Post, "/attestation-authorities", 201, &remote("devices"));
        let resource = AttestationAuthorityResource::new(testing::client(&mock));
        let created = testing::create(&resource, &config("devices"));

        let mut rotated = config("devices");
        rotated
            .set_at(&AttrPath::root("attestor_roots"), Value::string("other"))
            .unwrap();
        let change = testing::plan(&resource, &created.state, &rotated, &created.private);
        assert_eq!(change.requires_replace, vec![AttrPath::root("attestor_roots")]);
    }
}
