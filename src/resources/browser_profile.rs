//! `smallstep_browser_profile`: which credentials a browser presents to
//! which sites.

use crate::api::{self, Lookup};
use crate::bridge::{from_remote, to_remote};
use crate::describe::describe;
use crate::resources::id_attribute;
use anyhow::Result;
use declarative::{
    Attr, Attribute, CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest,
    ReadResponse, Resource, Schema, UpdateRequest, UpdateResponse, object,
};
use smallstep::Client;
use smallstep::models::BrowserProfile;
use std::sync::Arc;

pub const TYPE_NAME: &str = "smallstep_browser_profile";

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct BrowserProfileModel {
        pub id: Attr<String>,
        pub name: Attr<String>,
        pub match_addresses: Attr<Vec<String>>,
        pub credentials: Attr<Vec<String>>,
    }
}

impl BrowserProfileModel {
    fn to_api(&self) -> BrowserProfile {
        BrowserProfile {
            id: None,
            name: self.name.value_str().to_string(),
            match_addresses: to_remote(&self.match_addresses).unwrap_or_default(),
            credentials: to_remote(&self.credentials).unwrap_or_default(),
        }
    }

    fn from_api(remote: BrowserProfile, prior: &Attr<Self>) -> Self {
        Self {
            id: from_remote(remote.id, &prior.get(|p| &p.id)),
            name: from_remote(Some(remote.name), &prior.get(|p| &p.name)),
            match_addresses: from_remote(
                Some(remote.match_addresses),
                &prior.get(|p| &p.match_addresses),
            ),
            credentials: from_remote(Some(remote.credentials), &prior.get(|p| &p.credentials)),
        }
    }
}

/// Handler for [`TYPE_NAME`]
pub struct BrowserProfileResource {
    client: Arc<Client>,
}

impl BrowserProfileResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Resource for BrowserProfileResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let doc = describe("browserProfile")?;
        Ok(Schema::new(doc.description.clone())
            .attribute("id", id_attribute(doc.property("id")))
            .attribute(
                "name",
                Attribute::string().required().description(doc.property("name")),
            )
            .attribute(
                "match_addresses",
                Attribute::string_list()
                    .optional()
                    .description(doc.property("matchAddresses")),
            )
            .attribute(
                "credentials",
                Attribute::string_list()
                    .optional()
                    .description(doc.property("credentials")),
            ))
    }

    fn create(&self, req: CreateRequest, resp: &mut CreateResponse) {
        let Some(plan) = api::decode_model::<BrowserProfileModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        let body = plan.to_api();
        log::debug!("create {TYPE_NAME} {}", body.name);

        let result = self.client.post(&["browser-profiles"], &body);
        let Some(remote) = api::expect_json::<BrowserProfile>(
            &mut resp.diagnostics,
            "create browser profile",
            result,
            201,
        ) else {
            return;
        };
        resp.set_state(&BrowserProfileModel::from_api(remote, &Attr::Known(plan)));
    }

    fn read(&self, req: ReadRequest, resp: &mut ReadResponse) {
        let Some(state) =
            api::decode_model::<BrowserProfileModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("read {TYPE_NAME} {id}");

        let result = self.client.get(&["browser-profiles", id]);
        match api::lookup::<BrowserProfile>(&mut resp.diagnostics, "read browser profile", result) {
            Lookup::Found(remote) => {
                resp.set_state(&BrowserProfileModel::from_api(remote, &Attr::Known(state)));
                resp.private = req.private;
            }
            Lookup::Gone => resp.remove_resource(),
            Lookup::Failed => {}
        }
    }

    fn update(&self, req: UpdateRequest, resp: &mut UpdateResponse) {
        let Some(plan) = api::decode_model::<BrowserProfileModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        let Some(prior) =
            api::decode_model::<BrowserProfileModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = prior.id.value_str();
        log::debug!("update {TYPE_NAME} {id}");

        let mut body = plan.to_api();
        body.id = Some(id.to_string());
        let result = self.client.put(&["browser-profiles", id], &body);
        let Some(remote) = api::expect_json::<BrowserProfile>(
            &mut resp.diagnostics,
            "update browser profile",
            result,
            200,
        ) else {
            return;
        };
        resp.set_state(&BrowserProfileModel::from_api(remote, &Attr::Known(plan)));
        resp.private = req.private;
    }

    fn delete(&self, req: DeleteRequest, resp: &mut DeleteResponse) {
        let Some(state) =
            api::decode_model::<BrowserProfileModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("delete {TYPE_NAME} {id}");
        api::expect(
            &mut resp.diagnostics,
            "delete browser profile",
            self.client.delete(&["browser-profiles", id]),
            204,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing;
    use declarative::{AttrPath, Value};
    use serde_json::json;
    use smallstep::Method;
    use smallstep::backend::MockBackend;

    const ID: &str = "3f1c2b4a-6d5e-4f70-8a9b-0c1d2e3f4a5b";

    fn remote(name: &str, addresses: &[&str]) -> String {
        json!({"id": ID, "name": name, "matchAddresses": addresses, "credentials": []}).to_string()
    }

    fn config(name: &str) -> Value {
        Value::object([
            ("name", Value::string(name)),
            (
                "match_addresses",
                Value::List(vec![Value::string("*.example.com")]),
            ),
        ])
    }

    #[test]
    fn test_empty_credentials_stay_null() {
        let mock = MockBackend::new();
        mock.respond(
            Method::Post,
            "/browser-profiles",
            201,
            &remote("intranet", &["*.example.com"]),
        );
        mock.respond(
            Method::Get,
            &format!("/browser-profiles/{ID}"),
            200,
            &remote("intranet", &["*.example.com"]),
        );
        let resource = BrowserProfileResource::new(testing::client(&mock));

        let created = testing::create(&resource, &config("intranet"));
        assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
        assert!(created.state.at(&AttrPath::root("credentials")).is_null());

        let read = testing::read(&resource, &created.state, &created.private);
        assert_eq!(read.state, created.state);
        let change = testing::plan(&resource, &read.state, &config("intranet"), &read.private);
        assert!(!change.has_changes(&read.state));
    }

    #[test]
    fn test_rename_updates_in_place() {
        let mock = MockBackend::new();
        mock.respond(
            Method::Post,
            "/browser-profiles",
            201,
            &remote("intranet", &["*.example.com"]),
        );
        mock.respond(
            Method::Put,
            &format!("/browser-profiles/{ID}"),
            200,
            &remote("extranet", &["*.example.com"]),
        );
        let resource = BrowserProfileResource::new(testing::client(&mock));
        let created = testing::create(&resource, &config("intranet"));

        let change =
            testing::plan(&resource, &created.state, &config("extranet"), &created.private);
        assert!(change.requires_replace.is_empty());
        let updated =
            testing::update(&resource, &created.state, &config("extranet"), &created.private);
        assert!(updated.diagnostics.is_empty(), "{:?}", updated.diagnostics);
        assert_eq!(updated.state.at(&AttrPath::root("name")), &Value::string("extranet"));

        let sent: serde_json::Value =
            mock.requests_to(Method::Put, &format!("/browser-profiles/{ID}"))[0].json().unwrap();
        assert_eq!(sent["id"], ID);
        assert_eq!(sent["matchAddresses"], json!(["*.example.com"]));
    }
}
