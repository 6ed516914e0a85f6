//! `smallstep_credential`: a certificate issued to matching devices.

use crate::api::{self, Lookup};
use crate::bridge::{from_remote, from_remote_with, to_remote, to_remote_non_empty};
use crate::codec::endpoint::{KEY_MARKER, KeyInfo, key_attribute};
use crate::codec::fields::{X509_MARKER, X509Fields, x509_attribute};
use crate::codec::policy::{Files, Policy, files_attribute, policy_attribute};
use crate::codec::{decode, encode};
use crate::describe::describe;
use crate::equivalence::duration_equal;
use crate::marker;
use crate::modifiers::UseStateIfServerComputed;
use crate::resources::id_attribute;
use anyhow::Result;
use declarative::{
    Attr, AttrPath, Attribute, CreateRequest, CreateResponse, DeleteRequest, DeleteResponse,
    Diagnostics, ReadRequest, ReadResponse, RequiresReplace, Resource, Schema, UpdateRequest,
    UpdateResponse, UseStateForUnknown, Value, object,
};
use smallstep::Client;
use smallstep::models::{Credential, CredentialCertificate};
use std::sync::Arc;

pub const TYPE_NAME: &str = "smallstep_credential";

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct CertificateModel {
        pub authority_id: Attr<String>,
        pub duration: Attr<String>,
        pub x509: Attr<X509Fields>,
    }
}

impl CertificateModel {
    fn to_api(&self) -> CredentialCertificate {
        CredentialCertificate {
            authority_id: to_remote(&self.authority_id),
            duration: to_remote_non_empty(&self.duration),
            x509: encode(&self.x509),
        }
    }

    fn from_api(remote: CredentialCertificate, prior: &Attr<Self>) -> Self {
        Self {
            authority_id: from_remote(remote.authority_id, &prior.get(|c| &c.authority_id)),
            duration: from_remote_with(
                remote.duration,
                &prior.get(|c| &c.duration),
                duration_equal,
            ),
            x509: decode(remote.x509, &prior.get(|c| &c.x509)),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct CredentialModel {
        pub id: Attr<String>,
        pub slug: Attr<String>,
        pub certificate: Attr<CertificateModel>,
        pub key: Attr<KeyInfo>,
        pub policy: Attr<Policy>,
        pub files: Attr<Files>,
    }
}

impl CredentialModel {
    fn to_api(&self) -> Credential {
        Credential {
            id: None,
            slug: self.slug.value_str().to_string(),
            certificate: self
                .certificate
                .known()
                .map(CertificateModel::to_api)
                .unwrap_or_default(),
            key: encode(&self.key),
            policy: encode(&self.policy),
            files: encode(&self.files),
        }
    }

    pub(crate) fn from_api(remote: Credential, prior: &Attr<Self>) -> Self {
        Self {
            id: from_remote(remote.id, &prior.get(|c| &c.id)),
            slug: from_remote(Some(remote.slug), &prior.get(|c| &c.slug)),
            certificate: Attr::Known(CertificateModel::from_api(
                remote.certificate,
                &prior.get(|c| &c.certificate),
            )),
            key: decode(remote.key, &prior.get(|c| &c.key)),
            policy: decode(remote.policy, &prior.get(|c| &c.policy)),
            files: decode(remote.files, &prior.get(|c| &c.files)),
        }
    }
}

/// Schema shared with the credential data source.
pub(crate) fn certificate_attribute() -> Result<Attribute> {
    let doc = describe("credentialCertificate")?;
    Ok(Attribute::object([
        (
            "authority_id",
            Attribute::string()
                .optional()
                .computed()
                .description(doc.property("authorityID"))
                .plan_modifier(UseStateForUnknown),
        ),
        (
            "duration",
            Attribute::string()
                .optional()
                .computed()
                .description(doc.property("duration"))
                .plan_modifier(UseStateForUnknown),
        ),
        (
            "x509",
            x509_attribute(doc.property("x509"))?
                .computed()
                .plan_modifier(UseStateIfServerComputed::new(X509_MARKER)),
        ),
    ])
    .required()
    .description(doc.description.clone()))
}

/// Mark the key and the X509 fields when the server chose them.
fn record_markers(
    private: &mut declarative::PrivateState,
    config: &Value,
    state: &CredentialModel,
    diags: &mut Diagnostics,
) {
    let filled = [
        (KEY_MARKER, state.key.is_known()),
        (X509_MARKER, state.certificate.get(|c| &c.x509).is_known()),
    ];
    for (key, known) in filled {
        let unset = config.at(&AttrPath::parse(key)).is_null();
        marker::record(private, key, unset && known, diags);
    }
}

/// Handler for [`TYPE_NAME`]
pub struct CredentialResource {
    client: Arc<Client>,
}

impl CredentialResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Resource for CredentialResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let doc = describe("credential")?;
        Ok(Schema::new(doc.description.clone())
            .attribute("id", id_attribute(doc.property("id")))
            .attribute(
                "slug",
                Attribute::string()
                    .required()
                    .description(doc.property("slug"))
                    .plan_modifier(RequiresReplace),
            )
            .attribute("certificate", certificate_attribute()?)
            .attribute("key", key_attribute(doc.property("key"))?)
            .attribute("policy", policy_attribute(doc.property("policy"))?)
            .attribute("files", files_attribute(doc.property("files"))?))
    }

    fn create(&self, req: CreateRequest, resp: &mut CreateResponse) {
        let Some(plan) = api::decode_model::<CredentialModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        let body = plan.to_api();
        log::debug!("create {TYPE_NAME} {}", body.slug);

        let result = self.client.post(&["credentials"], &body);
        let Some(remote) =
            api::expect_json::<Credential>(&mut resp.diagnostics, "create credential", result, 201)
        else {
            return;
        };
        let state = CredentialModel::from_api(remote, &Attr::Known(plan));
        record_markers(&mut resp.private, &req.config, &state, &mut resp.diagnostics);
        resp.set_state(&state);
    }

    fn read(&self, req: ReadRequest, resp: &mut ReadResponse) {
        let Some(state) = api::decode_model::<CredentialModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("read {TYPE_NAME} {id}");

        let result = self.client.get(&["credentials", id]);
        match api::lookup::<Credential>(&mut resp.diagnostics, "read credential", result) {
            Lookup::Found(remote) => {
                resp.set_state(&CredentialModel::from_api(remote, &Attr::Known(state)));
                resp.private = req.private;
            }
            Lookup::Gone => resp.remove_resource(),
            Lookup::Failed => {}
        }
    }

    fn update(&self, req: UpdateRequest, resp: &mut UpdateResponse) {
        let Some(plan) = api::decode_model::<CredentialModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        let Some(prior) = api::decode_model::<CredentialModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = prior.id.value_str();
        log::debug!("update {TYPE_NAME} {id}");

        let mut body = plan.to_api();
        body.id = Some(id.to_string());
        let result = self.client.put(&["credentials", id], &body);
        let Some(remote) =
            api::expect_json::<Credential>(&mut resp.diagnostics, "update credential", result, 200)
        else {
            return;
        };
        let state = CredentialModel::from_api(remote, &Attr::Known(plan));
        resp.private = req.private;
        record_markers(&mut resp.private, &req.config, &state, &mut resp.diagnostics);
        resp.set_state(&state);
    }

    fn delete(&self, req: DeleteRequest, resp: &mut DeleteResponse) {
        let Some(state) = api::decode_model::<CredentialModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("delete {TYPE_NAME} {id}");
        api::expect(
            &mut resp.diagnostics,
            "delete credential",
            self.client.delete(&["credentials", id]),
            204,
        );
    }
}
