//! `smallstep_authority`: a hosted certificate authority.
//!
//! Only the admin emails can change after create. The subdomain and the
//! issuer settings are inputs the API never echoes back; they are kept
//! from prior state, and an imported authority recovers its subdomain
//! from the domain.

use crate::api::{self, Lookup};
use crate::bridge::{from_remote, from_remote_with, to_remote, to_remote_non_empty, write_only};
use crate::describe::describe;
use crate::equivalence::timestamp_equal;
use crate::resources::id_attribute;
use crate::validators::Matches;
use anyhow::Result;
use declarative::{
    Attr, Attribute, CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, OneOf,
    ReadRequest, ReadResponse, RequiresReplace, Resource, Schema, UpdateRequest, UpdateResponse,
    UseStateForUnknown, object,
};
use smallstep::Client;
use smallstep::models::{self, Authority};
use std::sync::Arc;

pub const TYPE_NAME: &str = "smallstep_authority";

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Subject {
        pub common_name: Attr<String>,
        pub country: Attr<String>,
        pub organization: Attr<String>,
        pub organizational_unit: Attr<String>,
        pub locality: Attr<String>,
        pub province: Attr<String>,
        pub street_address: Attr<String>,
        pub postal_code: Attr<String>,
        pub serial_number: Attr<String>,
    }
}

impl Subject {
    fn to_api(&self) -> models::DistinguishedName {
        models::DistinguishedName {
            common_name: to_remote(&self.common_name),
            country: to_remote(&self.country),
            organization: to_remote(&self.organization),
            organizational_unit: to_remote(&self.organizational_unit),
            locality: to_remote(&self.locality),
            province: to_remote(&self.province),
            street_address: to_remote(&self.street_address),
            postal_code: to_remote(&self.postal_code),
            serial_number: to_remote(&self.serial_number),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Issuer {
        pub name: Attr<String>,
        pub key_version: Attr<String>,
        pub duration: Attr<String>,
        pub max_path_length: Attr<i64>,
        pub subject: Attr<Subject>,
    }
}

impl Issuer {
    fn to_api(&self) -> models::X509Issuer {
        models::X509Issuer {
            name: self.name.value_str().to_string(),
            key_version: self.key_version.value_str().to_string(),
            duration: to_remote_non_empty(&self.duration),
            max_path_length: to_remote(&self.max_path_length),
            subject: self.subject.known().map(Subject::to_api),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct AuthorityModel {
        pub id: Attr<String>,
        pub subdomain: Attr<String>,
        pub name: Attr<String>,
        pub authority_type: Attr<String> => "type",
        pub domain: Attr<String>,
        pub fingerprint: Attr<String>,
        pub root: Attr<String>,
        pub created_at: Attr<String>,
        pub active_revocation: Attr<bool>,
        pub admin_emails: Attr<Vec<String>>,
        pub intermediate_issuer: Attr<Issuer>,
        pub root_issuer: Attr<Issuer>,
    }
}

impl AuthorityModel {
    fn to_api(&self) -> models::NewAuthority {
        models::NewAuthority {
            subdomain: self.subdomain.value_str().to_string(),
            name: self.name.value_str().to_string(),
            authority_type: self.authority_type.value_str().to_string(),
            admin_emails: to_remote(&self.admin_emails),
            active_revocation: to_remote(&self.active_revocation),
            intermediate_issuer: self.intermediate_issuer.known().map(Issuer::to_api),
            root_issuer: self.root_issuer.known().map(Issuer::to_api),
        }
    }

    pub(crate) fn from_api(remote: Authority, prior: &Attr<Self>) -> Self {
        let subdomain = match prior.get(|a| &a.subdomain) {
            Attr::Known(subdomain) => Attr::Known(subdomain),
            _ => Attr::from_option(
                remote
                    .domain
                    .split('.')
                    .next()
                    .filter(|label| !label.is_empty())
                    .map(ToString::to_string),
            ),
        };
        Self {
            id: from_remote(Some(remote.id), &prior.get(|a| &a.id)),
            subdomain,
            name: from_remote(Some(remote.name), &prior.get(|a| &a.name)),
            authority_type: from_remote(
                Some(remote.authority_type),
                &prior.get(|a| &a.authority_type),
            ),
            domain: from_remote(Some(remote.domain), &prior.get(|a| &a.domain)),
            fingerprint: from_remote(remote.fingerprint, &prior.get(|a| &a.fingerprint)),
            root: from_remote(remote.root, &prior.get(|a| &a.root)),
            created_at: from_remote_with(
                remote.created_at,
                &prior.get(|a| &a.created_at),
                timestamp_equal,
            ),
            active_revocation: from_remote(
                remote.active_revocation,
                &prior.get(|a| &a.active_revocation),
            ),
            admin_emails: from_remote(remote.admin_emails, &prior.get(|a| &a.admin_emails)),
            intermediate_issuer: write_only(&prior.get(|a| &a.intermediate_issuer)),
            root_issuer: write_only(&prior.get(|a| &a.root_issuer)),
        }
    }
}

fn issuer_attribute(description: &str) -> Result<Attribute> {
    let issuer = describe("x509Issuer")?;
    let subject = describe("distinguishedName")?;
    let subject_field =
        |name: &str| Attribute::string().optional().description(subject.property(name));
    Ok(Attribute::object([
        ("name", Attribute::string().required().description(issuer.property("name"))),
        (
            "key_version",
            Attribute::string().required().description(issuer.property("keyVersion")),
        ),
        ("duration", Attribute::string().optional().description(issuer.property("duration"))),
        (
            "max_path_length",
            Attribute::int64().optional().description(issuer.property("maxPathLength")),
        ),
        (
            "subject",
            Attribute::object([
                ("common_name", subject_field("commonName")),
                ("country", subject_field("country")),
                ("organization", subject_field("organization")),
                ("organizational_unit", subject_field("organizationalUnit")),
                ("locality", subject_field("locality")),
                ("province", subject_field("province")),
                ("street_address", subject_field("streetAddress")),
                ("postal_code", subject_field("postalCode")),
                ("serial_number", subject_field("serialNumber")),
            ])
            .optional()
            .description(issuer.property("subject")),
        ),
    ])
    .optional()
    .description(description)
    .plan_modifier(RequiresReplace))
}

/// Handler for [`TYPE_NAME`]
pub struct AuthorityResource {
    client: Arc<Client>,
}

impl AuthorityResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Resource for AuthorityResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let authority = describe("authority")?;
        let new_authority = describe("newAuthority")?;
        let computed = |name: &str| {
            Attribute::string()
                .computed()
                .description(authority.property(name))
                .plan_modifier(UseStateForUnknown)
        };

        Ok(Schema::new(authority.description.clone())
            .attribute("id", id_attribute(authority.property("id")))
            .attribute(
                "subdomain",
                Attribute::string()
                    .required()
                    .description(new_authority.property("subdomain"))
                    .validator(Matches::dns_label()?)
                    .plan_modifier(RequiresReplace),
            )
            .attribute(
                "name",
                Attribute::string()
                    .required()
                    .description(authority.property("name"))
                    .plan_modifier(RequiresReplace),
            )
            .attribute(
                "type",
                Attribute::string()
                    .required()
                    .description(authority.property("type"))
                    .validator(OneOf::new(["devops", "advanced"]))
                    .plan_modifier(RequiresReplace),
            )
            .attribute("domain", computed("domain"))
            .attribute("fingerprint", computed("fingerprint"))
            .attribute("root", computed("root"))
            .attribute("created_at", computed("createdAt"))
            .attribute(
                "active_revocation",
                Attribute::bool()
                    .optional()
                    .computed()
                    .description(authority.property("activeRevocation"))
                    .plan_modifier(UseStateForUnknown)
                    .plan_modifier(RequiresReplace),
            )
            .attribute(
                "admin_emails",
                Attribute::string_list()
                    .required()
                    .description(authority.property("adminEmails")),
            )
            .attribute(
                "intermediate_issuer",
                issuer_attribute(new_authority.property("intermediateIssuer"))?,
            )
            .attribute("root_issuer", issuer_attribute(new_authority.property("rootIssuer"))?))
    }

    fn create(&self, req: CreateRequest, resp: &mut CreateResponse) {
        let Some(plan) = api::decode_model::<AuthorityModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        log::debug!("create {TYPE_NAME} {}", plan.subdomain.value_str());

        let result = self.client.post(&["authorities"], &plan.to_api());
        let Some(remote) =
            api::expect_json::<Authority>(&mut resp.diagnostics, "create authority", result, 201)
        else {
            return;
        };
        resp.set_state(&AuthorityModel::from_api(remote, &Attr::Known(plan)));
    }

    fn read(&self, req: ReadRequest, resp: &mut ReadResponse) {
        let Some(state) = api::decode_model::<AuthorityModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.id.value_str().to_string();
        log::debug!("read {TYPE_NAME} {id}");

        let result = self.client.get(&["authorities", &id]);
        match api::lookup::<Authority>(&mut resp.diagnostics, "read authority", result) {
            Lookup::Found(remote) => {
                resp.set_state(&AuthorityModel::from_api(remote, &Attr::Known(state)));
                resp.private = req.private;
            }
            Lookup::Gone => resp.remove_resource(),
            Lookup::Failed => {}
        }
    }

    fn update(&self, req: UpdateRequest, resp: &mut UpdateResponse) {
        let Some(plan) = api::decode_model::<AuthorityModel>(&mut resp.diagnostics, &req.plan)
        else {
            return;
        };
        let Some(state) = api::decode_model::<AuthorityModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("update {TYPE_NAME} {id}");

        let body = models::AuthorityUpdate {
            admin_emails: plan.admin_emails.value_or(Vec::new()),
        };
        let result = self.client.put(&["authorities", id], &body);
        let Some(remote) =
            api::expect_json::<Authority>(&mut resp.diagnostics, "update authority", result, 200)
        else {
            return;
        };
        resp.set_state(&AuthorityModel::from_api(remote, &Attr::Known(plan)));
        resp.private = req.private;
    }

    fn delete(&self, req: DeleteRequest, resp: &mut DeleteResponse) {
        let Some(state) = api::decode_model::<AuthorityModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("delete {TYPE_NAME} {id}");
        api::expect(
            &mut resp.diagnostics,
            "delete authority",
            self.client.delete(&["authorities", id]),
            204,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{self, UUID};
    use declarative::{AttrPath, PrivateState, Value};
    use smallstep::Method;
    use smallstep::backend::MockBackend;

    const ID: &str = "0b8a6c52-6f54-4a8b-9d0b-2f6a4c8a1e33";
    const FINGERPRINT: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f90";

    fn remote_body(emails: &[&str]) -> String {
        serde_json::json!({
            "id": ID,
            "name": "Foo Authority",
            "type": "devops",
            "domain": "foo.testacc.ca.pki.pub",
            "fingerprint": FINGERPRINT,
            "root": "-----BEGIN CERTIFICATE-----\n...",
            "createdAt": "2025-01-02T03:04:05Z",
            "activeRevocation": false,
            "adminEmails": emails,
        })
        .to_string()
    }

    fn config(emails: &[&str]) -> Value {
        Value::object([
            ("subdomain", Value::string("foo")),
            ("name", Value::string("Foo Authority")),
            ("type", Value::string("devops")),
            (
                "admin_emails",
                Value::List(emails.iter().map(|e| Value::string(*e)).collect()),
            ),
            ("active_revocation", Value::Bool(false)),
        ])
    }

    fn setup() -> (MockBackend, AuthorityResource) {
        let mock = MockBackend::new();
        mock.respond(Method::Post, "/authorities", 201, &remote_body(&["a@b.com"]));
        mock.respond(Method::Get, &format!("/authorities/{ID}"), 200, &remote_body(&["a@b.com"]));
        let resource = AuthorityResource::new(testing::client(&mock));
        (mock, resource)
    }

    #[test]
    fn test_create_authority() {
        let (mock, resource) = setup();
        let created = testing::create(&resource, &config(&["a@b.com"]));
        assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);

        let state = &created.state;
        assert!(testing::matches(UUID, state.at(&AttrPath::root("id"))));
        assert_eq!(
            state.at(&AttrPath::root("domain")),
            &Value::string("foo.testacc.ca.pki.pub")
        );
        assert!(testing::matches("^[0-9a-f]{64}$", state.at(&AttrPath::root("fingerprint"))));
        assert_eq!(state.at(&AttrPath::root("active_revocation")), &Value::Bool(false));
        assert!(state.at(&AttrPath::root("root_issuer")).is_null());

        let sent: models::NewAuthority =
            mock.requests_to(Method::Post, "/authorities")[0].json().unwrap();
        assert_eq!(sent.subdomain, "foo");
        assert_eq!(sent.admin_emails, Some(vec!["a@b.com".to_string()]));
        assert_eq!(sent.intermediate_issuer, None);
    }

    #[test]
    fn test_read_is_stable() {
        let (_mock, resource) = setup();
        let created = testing::create(&resource, &config(&["a@b.com"]));
        let first = testing::read(&resource, &created.state, &created.private);
        let second = testing::read(&resource, &first.state, &first.private);
        assert!(first.diagnostics.is_empty());
        assert_eq!(first.state, created.state);
        assert_eq!(second.state, first.state);
    }

    #[test]
    fn test_import_recovers_subdomain() {
        let (_mock, resource) = setup();
        let created = testing::create(&resource, &config(&["a@b.com"]));
        let (_, refreshed) = testing::import(&resource, ID);
        assert!(refreshed.diagnostics.is_empty());
        for attribute in [
            "id",
            "subdomain",
            "name",
            "type",
            "domain",
            "fingerprint",
            "admin_emails",
        ] {
            let path = AttrPath::root(attribute);
            assert_eq!(refreshed.state.at(&path), created.state.at(&path), "{attribute}");
        }
    }

    #[test]
    fn test_deleted_out_of_band() {
        let (mock, resource) = setup();
        let created = testing::create(&resource, &config(&["a@b.com"]));
        mock.replace(Method::Get, &format!("/authorities/{ID}"), 404, r#"{"message":"not found"}"#);
        let read = testing::read(&resource, &created.state, &PrivateState::new());
        assert!(read.diagnostics.is_empty());
        assert!(read.state.is_null());
    }

    #[test]
    fn test_update_admin_emails() {
        let (mock, resource) = setup();
        let created = testing::create(&resource, &config(&["a@b.com"]));
        mock.respond(
            Method::Put,
            &format!("/authorities/{ID}"),
            200,
            &remote_body(&["a@b.com", "c@d.com"]),
        );

        let new_config = config(&["a@b.com", "c@d.com"]);
        let change = testing::plan(&resource, &created.state, &new_config, &created.private);
        assert!(change.requires_replace.is_empty());

        let updated = testing::update(&resource, &created.state, &new_config, &created.private);
        assert!(updated.diagnostics.is_empty(), "{:?}", updated.diagnostics);
        let sent: models::AuthorityUpdate =
            mock.requests_to(Method::Put, &format!("/authorities/{ID}"))[0].json().unwrap();
        assert_eq!(sent.admin_emails, vec!["a@b.com", "c@d.com"]);
        assert_eq!(
            updated.state.at(&AttrPath::root("admin_emails")),
            new_config.at(&AttrPath::root("admin_emails"))
        );
    }

    #[test]
    fn test_rename_requires_replace() {
        let (_mock, resource) = setup();
        let created = testing::create(&resource, &config(&["a@b.com"]));
        let mut renamed = config(&["a@b.com"]);
        renamed.set_at(&AttrPath::root("subdomain"), Value::string("bar")).unwrap();
        let change = testing::plan(&resource, &created.state, &renamed, &created.private);
        assert_eq!(change.requires_replace, vec![AttrPath::root("subdomain")]);
    }

    #[test]
    fn test_create_conflict_reports_request_id() {
        let mock = MockBackend::new();
        mock.respond_with(
            Method::Post,
            "/authorities",
            smallstep::ApiResponse::new(409, r#"{"message":"subdomain foo is taken"}"#)
                .with_request_id("req-42"),
        );
        let resource = AuthorityResource::new(testing::client(&mock));
        let created = testing::create(&resource, &config(&["a@b.com"]));
        let diag = created.diagnostics.errors().next().unwrap();
        assert_eq!(diag.summary, api::RESPONSE_ERROR);
        assert_eq!(diag.detail, "Request ID req-42: 409: subdomain foo is taken");
        assert!(created.state.is_null());
    }

    #[test]
    fn test_delete() {
        let (mock, resource) = setup();
        mock.respond(Method::Delete, &format!("/authorities/{ID}"), 204, "");
        let created = testing::create(&resource, &config(&["a@b.com"]));
        let mut resp = DeleteResponse::default();
        resource.delete(
            DeleteRequest {
                state: created.state,
                private: created.private,
            },
            &mut resp,
        );
        assert!(resp.diagnostics.is_empty());
    }
}
