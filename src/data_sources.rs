//! Data sources
//!
//! Each data source looks up one existing object and decodes it with the
//! same model as the matching resource. Its schema is the resource's
//! schema made read-only, except for the attributes used for the lookup.

use crate::api;
use crate::resources::account::{self, AccountModel, AccountResource};
use crate::resources::attestation_authority::{
    self, AttestationAuthorityModel, AttestationAuthorityResource,
};
use crate::resources::authority::{self, AuthorityModel, AuthorityResource};
use crate::resources::collection::{self, CollectionModel, CollectionResource};
use crate::resources::credential::{self, CredentialModel, CredentialResource};
use crate::resources::provisioner::{self, ProvisionerModel, ProvisionerResource};
use anyhow::Result;
use declarative::{
    Attr, AttrKind, AttrPath, Attribute, BoxedDataSource, DataSource, Diagnostics,
    ReadDataRequest, ReadDataResponse, Resource, Schema, TfValue,
};
use serde::de::DeserializeOwned;
use smallstep::Client;
use smallstep::models::{
    Account, AttestationAuthority, Authority, Collection, Credential, Provisioner,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// How a data source attribute takes part in the lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Required,
    /// One of several alternative keys
    Optional,
}

/// Every data source, sharing one API client.
pub fn all(client: &Arc<Client>) -> Vec<BoxedDataSource> {
    vec![
        Box::new(AuthorityData::new(Arc::clone(client))),
        Box::new(ProvisionerData::new(Arc::clone(client))),
        Box::new(CollectionData::new(Arc::clone(client))),
        Box::new(AttestationAuthorityData::new(Arc::clone(client))),
        Box::new(AccountData::new(Arc::clone(client))),
        Box::new(CredentialData::new(Arc::clone(client))),
    ]
}

/// Copy a resource schema with every attribute computed, apart from the
/// lookup keys.
fn read_only(schema: Schema, keys: &[(&str, Key)]) -> Schema {
    let mut attributes = computed_only(schema.attributes);
    for (name, key) in keys {
        if let Some(attribute) = attributes.get_mut(*name) {
            match key {
                Key::Required => {
                    attribute.required = true;
                    attribute.computed = false;
                }
                Key::Optional => attribute.optional = true,
            }
        }
    }
    Schema {
        attributes,
        ..schema
    }
}

fn computed_only(attributes: BTreeMap<String, Attribute>) -> BTreeMap<String, Attribute> {
    attributes
        .into_iter()
        .map(|(name, attribute)| {
            let attribute = Attribute {
                kind: computed_kind(attribute.kind),
                required: false,
                optional: false,
                computed: true,
                plan_modifiers: Vec::new(),
                validators: Vec::new(),
                ..attribute
            };
            (name, attribute)
        })
        .collect()
}

fn computed_kind(kind: AttrKind) -> AttrKind {
    match kind {
        AttrKind::Object(nested) => AttrKind::Object(computed_only(nested)),
        AttrKind::List(element) => AttrKind::List(Box::new(computed_kind(*element))),
        AttrKind::Set(element) => AttrKind::Set(Box::new(computed_kind(*element))),
        AttrKind::Map(element) => AttrKind::Map(Box::new(computed_kind(*element))),
        other => other,
    }
}

/// Decode the configuration into the model; it is the prior for
/// decoding the remote object, so lookup keys the API does not echo
/// survive.
fn lookup_prior<T: TfValue>(req: &ReadDataRequest, diags: &mut Diagnostics) -> Option<Attr<T>> {
    api::decode_model::<T>(diags, &req.config).map(Attr::Known)
}

/// GET an object that must exist.
fn fetch<T: DeserializeOwned>(
    client: &Client,
    segments: &[&str],
    action: &str,
    diags: &mut Diagnostics,
) -> Option<T> {
    log::debug!("{action}: {}", segments.join("/"));
    api::expect_json(diags, action, client.get(segments), 200)
}

/// A lookup key the user left unset
fn missing_key(diags: &mut Diagnostics, name: &str) {
    diags.add_attribute_error(
        AttrPath::root(name),
        "Missing Lookup Attribute",
        format!("Set {name} to look the object up."),
    );
}

pub struct AuthorityData {
    client: Arc<Client>,
}

impl AuthorityData {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl DataSource for AuthorityData {
    fn type_name(&self) -> &'static str {
        authority::TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let schema = AuthorityResource::new(Arc::clone(&self.client)).schema()?;
        Ok(read_only(schema, &[("id", Key::Required)]))
    }

    fn read(&self, req: ReadDataRequest, resp: &mut ReadDataResponse) {
        let Some(prior) = lookup_prior::<AuthorityModel>(&req, &mut resp.diagnostics) else {
            return;
        };
        let id = prior.get(|a| &a.id);
        let Some(remote) = fetch::<Authority>(
            &self.client,
            &["authorities", id.value_str()],
            "read authority",
            &mut resp.diagnostics,
        ) else {
            return;
        };
        resp.set_state(&AuthorityModel::from_api(remote, &prior));
    }
}

/// Looks a provisioner up by id or by name.
pub struct ProvisionerData {
    client: Arc<Client>,
}

impl ProvisionerData {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl DataSource for ProvisionerData {
    fn type_name(&self) -> &'static str {
        provisioner::TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let schema = ProvisionerResource::new(Arc::clone(&self.client)).schema()?;
        Ok(read_only(
            schema,
            &[
                ("authority_id", Key::Required),
                ("id", Key::Optional),
                ("name", Key::Optional),
            ],
        ))
    }

    fn read(&self, req: ReadDataRequest, resp: &mut ReadDataResponse) {
        let Some(prior) = lookup_prior::<ProvisionerModel>(&req, &mut resp.diagnostics) else {
            return;
        };
        let Some(model) = prior.known() else {
            return;
        };
        let name_or_id = model.name_or_id();
        if name_or_id.is_empty() {
            missing_key(&mut resp.diagnostics, "name");
            return;
        }
        let Some(remote) = fetch::<Provisioner>(
            &self.client,
            &[
                "authorities",
                model.authority_id.value_str(),
                "provisioners",
                name_or_id,
            ],
            "read provisioner",
            &mut resp.diagnostics,
        ) else {
            return;
        };
        let state = ProvisionerModel::from_api(remote, &prior, &mut resp.diagnostics);
        if resp.diagnostics.has_error() {
            return;
        }
        resp.set_state(&state);
    }
}

pub struct CollectionData {
    client: Arc<Client>,
}

impl CollectionData {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl DataSource for CollectionData {
    fn type_name(&self) -> &'static str {
        collection::TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let schema = CollectionResource::new(Arc::clone(&self.client)).schema()?;
        Ok(read_only(schema, &[("slug", Key::Required)]))
    }

    fn read(&self, req: ReadDataRequest, resp: &mut ReadDataResponse) {
        let Some(prior) = lookup_prior::<CollectionModel>(&req, &mut resp.diagnostics) else {
            return;
        };
        let slug = prior.get(|c| &c.slug);
        let Some(remote) = fetch::<Collection>(
            &self.client,
            &["collections", slug.value_str()],
            "read collection",
            &mut resp.diagnostics,
        ) else {
            return;
        };
        resp.set_state(&CollectionModel::from_api(remote, &prior));
    }
}

pub struct AttestationAuthorityData {
    client: Arc<Client>,
}

impl AttestationAuthorityData {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl DataSource for AttestationAuthorityData {
    fn type_name(&self) -> &'static str {
        attestation_authority::TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let schema = AttestationAuthorityResource::new(Arc::clone(&self.client)).schema()?;
        Ok(read_only(schema, &[("id", Key::Required)]))
    }

    fn read(&self, req: ReadDataRequest, resp: &mut ReadDataResponse) {
        let Some(prior) = lookup_prior::<AttestationAuthorityModel>(&req, &mut resp.diagnostics)
        else {
            return;
        };
        let id = prior.get(|a| &a.id);
        let Some(remote) = fetch::<AttestationAuthority>(
            &self.client,
            &["attestation-authorities", id.value_str()],
            "read attestation authority",
            &mut resp.diagnostics,
        ) else {
            return;
        };
        resp.set_state(&AttestationAuthorityModel::from_api(remote, &prior));
    }
}

pub struct AccountData {
    client: Arc<Client>,
}

impl AccountData {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl DataSource for AccountData {
    fn type_name(&self) -> &'static str {
        account::TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let schema = AccountResource::new(Arc::clone(&self.client)).schema()?;
        Ok(read_only(schema, &[("id", Key::Required)]))
    }

    fn read(&self, req: ReadDataRequest, resp: &mut ReadDataResponse) {
        let Some(prior) = lookup_prior::<AccountModel>(&req, &mut resp.diagnostics) else {
            return;
        };
        let id = prior.get(|a| &a.id);
        let Some(remote) = fetch::<Account>(
            &self.client,
            &["accounts", id.value_str()],
            "read account",
            &mut resp.diagnostics,
        ) else {
            return;
        };
        let state = AccountModel::from_api(remote, &prior, &mut resp.diagnostics);
        if resp.diagnostics.has_error() {
            return;
        }
        resp.set_state(&state);
    }
}

pub struct CredentialData {
    client: Arc<Client>,
}

impl CredentialData {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl DataSource for CredentialData {
    fn type_name(&self) -> &'static str {
        credential::TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let schema = CredentialResource::new(Arc::clone(&self.client)).schema()?;
        Ok(read_only(schema, &[("id", Key::Required)]))
    }

    fn read(&self, req: ReadDataRequest, resp: &mut ReadDataResponse) {
        let Some(prior) = lookup_prior::<CredentialModel>(&req, &mut resp.diagnostics) else {
            return;
        };
        let id = prior.get(|c| &c.id);
        let Some(remote) = fetch::<Credential>(
            &self.client,
            &["credentials", id.value_str()],
            "read credential",
            &mut resp.diagnostics,
        ) else {
            return;
        };
        resp.set_state(&CredentialModel::from_api(remote, &prior));
    }
}
