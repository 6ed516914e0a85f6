//! `smallstep_identity_provider_client`: an OAuth client of the team's
//! identity provider.

use crate::api::{self, Lookup};
use crate::bridge::{from_remote, from_remote_once, to_remote, write_only};
use crate::describe::describe;
use crate::resources::{id_attribute, save_secret};
use anyhow::Result;
use declarative::{
    Attr, Attribute, CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest,
    ReadResponse, RequiresReplace, Resource, Schema, UpdateRequest, UpdateResponse,
    UseStateForUnknown, object,
};
use smallstep::Client;
use smallstep::models::IdpClient;
use std::sync::Arc;

pub const TYPE_NAME: &str = "smallstep_identity_provider_client";

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct IdpClientModel {
        pub id: Attr<String>,
        pub redirect_uri: Attr<String>,
        pub secret: Attr<String>,
        pub write_secret_file: Attr<String>,
    }
}

impl IdpClientModel {
    fn to_api(&self) -> IdpClient {
        IdpClient {
            id: None,
            redirect_uri: to_remote(&self.redirect_uri),
            secret: None,
        }
    }

    fn from_api(remote: IdpClient, prior: &Attr<Self>) -> Self {
        Self {
            id: from_remote(remote.id, &prior.get(|c| &c.id)),
            redirect_uri: from_remote(remote.redirect_uri, &prior.get(|c| &c.redirect_uri)),
            secret: from_remote_once(remote.secret, &prior.get(|c| &c.secret)),
            write_secret_file: write_only(&prior.get(|c| &c.write_secret_file)),
        }
    }
}

/// Handler for [`TYPE_NAME`]
pub struct IdpClientResource {
    client: Arc<Client>,
}

impl IdpClientResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Resource for IdpClientResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let doc = describe("idpClient")?;
        Ok(Schema::new(doc.description.clone())
            .attribute("id", id_attribute(doc.property("id")))
            .attribute(
                "redirect_uri",
                Attribute::string()
                    .required()
                    .description(doc.property("redirectURI"))
                    .plan_modifier(RequiresReplace),
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
                "write_secret_file",
                Attribute::string()
                    .optional()
                    .description("Write the client secret to this file, readable by the owner only.")
                    .plan_modifier(RequiresReplace),
            ))
    }

    fn create(&self, req: CreateRequest, resp: &mut CreateResponse) {
        let Some(plan) = api::decode_model::<IdpClientModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        log::debug!("create {TYPE_NAME} for {}", plan.redirect_uri.value_str());

        let result = self.client.post(&["identity-provider", "clients"], &plan.to_api());
        let Some(remote) =
            api::expect_json::<IdpClient>(&mut resp.diagnostics, "create client", result, 201)
        else {
            return;
        };
        let state = IdpClientModel::from_api(remote, &Attr::Known(plan));
        save_secret(
            state.write_secret_file.known(),
            state.secret.known(),
            &mut resp.diagnostics,
        );
        resp.set_state(&state);
    }

    fn read(&self, req: ReadRequest, resp: &mut ReadResponse) {
        let Some(state) = api::decode_model::<IdpClientModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("read {TYPE_NAME} {id}");

        let result = self.client.get(&["identity-provider", "clients", id]);
        match api::lookup::<IdpClient>(&mut resp.diagnostics, "read client", result) {
            Lookup::Found(remote) => {
                resp.set_state(&IdpClientModel::from_api(remote, &Attr::Known(state)));
                resp.private = req.private;
            }
            Lookup::Gone => resp.remove_resource(),
            Lookup::Failed => {}
        }
    }

    fn update(&self, _req: UpdateRequest, resp: &mut UpdateResponse) {
        resp.diagnostics.add_error(
            "Client Update Not Supported",
            "Update not supported; all changes require replacement.",
        );
    }

    fn delete(&self, req: DeleteRequest, resp: &mut DeleteResponse) {
        let Some(state) = api::decode_model::<IdpClientModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("delete {TYPE_NAME} {id}");
        api::expect(
            &mut resp.diagnostics,
            "delete client",
            self.client.delete(&["identity-provider", "clients", id]),
            204,
        );
    }
}
