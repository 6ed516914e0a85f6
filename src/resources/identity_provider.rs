//! `smallstep_identity_provider`: the team's OpenID Connect identity
//! provider.
//!
//! A team has at most one, addressed without an id. Create refuses to
//! adopt an existing provider; it has to be imported.

use crate::api::{self, Lookup};
use crate::bridge::from_remote;
use crate::describe::describe;
use anyhow::Result;
use declarative::{
    Attr, AttrPath, Attribute, CreateRequest, CreateResponse, DeleteRequest, DeleteResponse,
    ImportRequest, ImportResponse, ReadRequest, ReadResponse, Resource, Schema, UpdateRequest,
    UpdateResponse, UseStateForUnknown, Value, object,
};
use smallstep::Client;
use smallstep::models::IdentityProvider;
use std::sync::Arc;

pub const TYPE_NAME: &str = "smallstep_identity_provider";

const PATH: [&str; 1] = ["identity-provider"];

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct IdentityProviderModel {
        pub trust_roots: Attr<String>,
        pub issuer: Attr<String>,
        pub authorize_endpoint: Attr<String>,
        pub token_endpoint: Attr<String>,
        pub jwks_endpoint: Attr<String>,
    }
}

impl IdentityProviderModel {
    fn to_api(&self) -> IdentityProvider {
        IdentityProvider {
            trust_roots: self.trust_roots.value_str().to_string(),
            ..IdentityProvider::default()
        }
    }

    fn from_api(remote: IdentityProvider, prior: &Attr<Self>) -> Self {
        Self {
            trust_roots: from_remote(Some(remote.trust_roots), &prior.get(|p| &p.trust_roots)),
            issuer: from_remote(remote.issuer, &prior.get(|p| &p.issuer)),
            authorize_endpoint: from_remote(
                remote.authorize_endpoint,
                &prior.get(|p| &p.authorize_endpoint),
            ),
            token_endpoint: from_remote(remote.token_endpoint, &prior.get(|p| &p.token_endpoint)),
            jwks_endpoint: from_remote(remote.jwks_endpoint, &prior.get(|p| &p.jwks_endpoint)),
        }
    }
}

/// Handler for [`TYPE_NAME`]
pub struct IdentityProviderResource {
    client: Arc<Client>,
}

impl IdentityProviderResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Resource for IdentityProviderResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let doc = describe("identityProvider")?;
        let endpoint = |name: &str| {
            Attribute::string()
                .computed()
                .description(doc.property(name))
                .plan_modifier(UseStateForUnknown)
        };
        Ok(Schema::new(doc.description.clone())
            .attribute(
                "trust_roots",
                Attribute::string()
                    .required()
                    .description(doc.property("trustRoots")),
            )
            .attribute("issuer", endpoint("issuer"))
            .attribute("authorize_endpoint", endpoint("authorizeEndpoint"))
            .attribute("token_endpoint", endpoint("tokenEndpoint"))
            .attribute("jwks_endpoint", endpoint("jwksEndpoint")))
    }

    fn create(&self, req: CreateRequest, resp: &mut CreateResponse) {
        let Some(plan) =
            api::decode_model::<IdentityProviderModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        log::debug!("create {TYPE_NAME}");

        let existing = self.client.get(&PATH);
        match api::lookup::<IdentityProvider>(
            &mut resp.diagnostics,
            "read identity provider",
            existing,
        ) {
            Lookup::Found(_) => {
                resp.diagnostics.add_error(
                    "Identity Provider Exists",
                    "Team already has an identity provider. Import it to manage trust roots.",
                );
                return;
            }
            Lookup::Gone => {}
            Lookup::Failed => return,
        }

        let result = self.client.post(&PATH, &plan.to_api());
        let Some(remote) = api::expect_json::<IdentityProvider>(
            &mut resp.diagnostics,
            "create identity provider",
            result,
            201,
        ) else {
            return;
        };
        resp.set_state(&IdentityProviderModel::from_api(remote, &Attr::Known(plan)));
    }

    fn read(&self, req: ReadRequest, resp: &mut ReadResponse) {
        let Some(state) =
            api::decode_model::<IdentityProviderModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        log::debug!("read {TYPE_NAME}");

        let result = self.client.get(&PATH);
        match api::lookup::<IdentityProvider>(
            &mut resp.diagnostics,
            "read identity provider",
            result,
        ) {
            Lookup::Found(remote) => {
                resp.set_state(&IdentityProviderModel::from_api(remote, &Attr::Known(state)));
                resp.private = req.private;
            }
            Lookup::Gone => resp.remove_resource(),
            Lookup::Failed => {}
        }
    }

    fn update(&self, req: UpdateRequest, resp: &mut UpdateResponse) {
        let Some(plan) =
            api::decode_model::<IdentityProviderModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        log::debug!("update {TYPE_NAME}");

        let result = self.client.put(&PATH, &plan.to_api());
        let Some(remote) = api::expect_json::<IdentityProvider>(
            &mut resp.diagnostics,
            "update identity provider",
            result,
            200,
        ) else {
            return;
        };
        resp.set_state(&IdentityProviderModel::from_api(remote, &Attr::Known(plan)));
        resp.private = req.private;
    }

    fn delete(&self, _req: DeleteRequest, resp: &mut DeleteResponse) {
        log::debug!("delete {TYPE_NAME}");
        api::expect(
            &mut resp.diagnostics,
            "delete identity provider",
            self.client.delete(&PATH),
            204,
        );
    }

    /// The import id is ignored; there is only one provider to import.
    fn import_state(&self, req: ImportRequest, resp: &mut ImportResponse) {
        log::debug!("import {TYPE_NAME} ({})", req.id);
        resp.set_attribute(&AttrPath::root("trust_roots"), Value::string(""));
    }
}
