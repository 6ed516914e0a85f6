//! `smallstep_account`: network or browser access provisioned onto
//! matching devices.
//!
//! Exactly one of `wifi`, `vpn`, `ethernet` or `browser` is set; which
//! one becomes the account `type` on the wire. The certificate carries a
//! second family, `x509` or `ssh`. The server fills in `key`, `reload`
//! and `certificate.x509` when they are left out, and private state
//! remembers which of them it filled.

use crate::api::{self, Lookup};
use crate::bridge::from_remote;
use crate::codec::account::{AccountCertificate, Browser, Ethernet, Variants, Vpn, Wifi};
use crate::codec::endpoint::{
    KEY_MARKER, KeyInfo, RELOAD_MARKER, ReloadInfo, key_attribute, reload_attribute,
};
use crate::codec::fields::{X509_MARKER, ssh_attribute, x509_attribute};
use crate::codec::policy::{Policy, policy_attribute};
use crate::codec::{decode, encode};
use crate::describe::{Description, describe};
use crate::marker;
use crate::modifiers::{
    NullWhenSiblingSet, UseStateIfServerComputed, requires_replace_if_presence_changes,
};
use crate::resources::id_attribute;
use anyhow::Result;
use declarative::{
    AtMostOneOf, Attr, AttrPath, Attribute, ConfigValidator, CreateRequest, CreateResponse,
    DeleteRequest, DeleteResponse, Diagnostics, ExactlyOneOf, OneOf, PrivateState, ReadRequest,
    ReadResponse, Resource, Schema, UpdateRequest, UpdateResponse, UseStateForUnknown, Value,
    object,
};
use smallstep::Client;
use smallstep::models::Account;
use std::sync::Arc;

pub const TYPE_NAME: &str = "smallstep_account";

const VARIANTS: [&str; 4] = ["wifi", "vpn", "ethernet", "browser"];

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct AccountModel {
        pub id: Attr<String>,
        pub name: Attr<String>,
        pub wifi: Attr<Wifi>,
        pub vpn: Attr<Vpn>,
        pub ethernet: Attr<Ethernet>,
        pub browser: Attr<Browser>,
        pub certificate: Attr<AccountCertificate>,
        pub key: Attr<KeyInfo>,
        pub reload: Attr<ReloadInfo>,
        pub policy: Attr<Policy>,
    }
}

impl AccountModel {
    fn variants(&self) -> Variants {
        Variants {
            wifi: self.wifi.clone(),
            vpn: self.vpn.clone(),
            ethernet: self.ethernet.clone(),
            browser: self.browser.clone(),
        }
    }

    fn to_api(&self) -> smallstep::Result<Account> {
        let (account_type, configuration) = self.variants().encode()?.ok_or_else(|| {
            smallstep::Error::encoding(
                "account configuration",
                "one of wifi, vpn, ethernet or browser must be set",
            )
        })?;
        let certificate = match self.certificate.known() {
            Some(certificate) => Some(certificate.to_api()?),
            None => None,
        };
        Ok(Account {
            id: None,
            name: self.name.value_str().to_string(),
            account_type: account_type.to_string(),
            configuration: Some(configuration),
            certificate,
            key: encode(&self.key),
            reload: encode(&self.reload),
            policy: encode(&self.policy),
        })
    }

    pub(crate) fn from_api(remote: Account, prior: &Attr<Self>, diags: &mut Diagnostics) -> Self {
        let prior_variants = prior.known().map(Self::variants).unwrap_or_default();
        let variants =
            Variants::decode(&remote.account_type, remote.configuration, &prior_variants, diags);
        let prior_certificate = prior.get(|a| &a.certificate);
        let certificate = match remote.certificate {
            Some(certificate) => Attr::Known(AccountCertificate::from_api(
                certificate,
                &prior_certificate,
                diags,
            )),
            None => Attr::Null,
        };
        Self {
            id: from_remote(remote.id, &prior.get(|a| &a.id)),
            name: from_remote(Some(remote.name), &prior.get(|a| &a.name)),
            wifi: variants.wifi,
            vpn: variants.vpn,
            ethernet: variants.ethernet,
            browser: variants.browser,
            certificate,
            key: decode(remote.key, &prior.get(|a| &a.key)),
            reload: decode(remote.reload, &prior.get(|a| &a.reload)),
            policy: decode(remote.policy, &prior.get(|a| &a.policy)),
        }
    }

    /// Record, for each server-defaulted object, whether the server
    /// supplied it.
    fn record_markers(&self, config: &Value, private: &mut PrivateState, diags: &mut Diagnostics) {
        let x509 = self.certificate.get(|c| &c.x509);
        let filled = [
            (KEY_MARKER, self.key.is_known()),
            (RELOAD_MARKER, self.reload.is_known()),
            (X509_MARKER, x509.is_known()),
        ];
        for (key, known) in filled {
            let unset = config.at(&AttrPath::parse(key)).is_null();
            marker::record(private, key, unset && known, diags);
        }
    }
}

fn string(doc: &Description, name: &str) -> Attribute {
    Attribute::string().optional().description(doc.property(name))
}

fn flag(doc: &Description, name: &str) -> Attribute {
    Attribute::bool().optional().description(doc.property(name))
}

/// A variant attribute; switching variants replaces the account.
fn variant(attribute: Attribute, doc: &Description) -> Attribute {
    attribute
        .optional()
        .description(doc.description.clone())
        .plan_modifier(requires_replace_if_presence_changes())
}

fn variant_attributes() -> Result<[(&'static str, Attribute); 4]> {
    let wifi = describe("wifiAccount")?;
    let vpn = describe("vpnAccount")?;
    let ike = describe("ikeV2Config")?;
    let ethernet = describe("ethernetAccount")?;
    let browser = describe("browserAccount")?;

    Ok([
        (
            "wifi",
            variant(
                Attribute::object([
                    ("ssid", Attribute::string().required().description(wifi.property("ssid"))),
                    ("hidden", flag(&wifi, "hidden")),
                    ("autojoin", flag(&wifi, "autojoin")),
                    ("network_access_server_ip", string(&wifi, "networkAccessServerIP")),
                    ("ca_chain", string(&wifi, "caChain")),
                    ("external_radius_server", flag(&wifi, "externalRadiusServer")),
                ]),
                &wifi,
            ),
        ),
        (
            "vpn",
            variant(
                Attribute::object([
                    (
                        "connection_type",
                        Attribute::string()
                            .required()
                            .description(vpn.property("connectionType"))
                            .validator(OneOf::new(["IPSec", "IKEv2", "SSL"])),
                    ),
                    (
                        "remote_address",
                        Attribute::string()
                            .required()
                            .description(vpn.property("remoteAddress")),
                    ),
                    ("autojoin", flag(&vpn, "autojoin")),
                    (
                        "vendor",
                        string(&vpn, "vendor").validator(OneOf::new([
                            "F5", "Cisco", "Juniper", "Fortinet", "Palo Alto",
                        ])),
                    ),
                    (
                        "ike",
                        Attribute::object([
                            ("ca_chain", string(&ike, "caChain")),
                            ("eap", flag(&ike, "eap")),
                            ("remote_id", string(&ike, "remoteID")),
                        ])
                        .optional()
                        .description(vpn.property("ike")),
                    ),
                ]),
                &vpn,
            ),
        ),
        (
            "ethernet",
            variant(
                Attribute::object([
                    ("autojoin", flag(&ethernet, "autojoin")),
                    ("ca_chain", string(&ethernet, "caChain")),
                    ("external_radius_server", flag(&ethernet, "externalRadiusServer")),
                    ("network_access_server_ip", string(&ethernet, "networkAccessServerIP")),
                ]),
                &ethernet,
            ),
        ),
        (
            "browser",
            variant(Attribute::object(Vec::<(String, Attribute)>::new()), &browser),
        ),
    ])
}

fn certificate_attribute(description: &str) -> Result<Attribute> {
    let doc = describe("endpointCertificateInfo")?;
    let server_default = |name: &str| {
        Attribute::string()
            .optional()
            .computed()
            .description(doc.property(name))
            .plan_modifier(UseStateForUnknown)
    };
    let int = |name: &str| Attribute::int64().optional().description(doc.property(name));

    Ok(Attribute::object([
        ("authority_id", server_default("authorityID")),
        ("duration", server_default("duration")),
        ("crt_file", string(&doc, "crtFile")),
        ("key_file", string(&doc, "keyFile")),
        ("root_file", string(&doc, "rootFile")),
        ("uid", int("uid")),
        ("gid", int("gid")),
        ("mode", int("mode")),
        (
            "x509",
            x509_attribute("Subject and SAN fields of an X.509 certificate.")?
                .computed()
                .plan_modifier(UseStateIfServerComputed::new(X509_MARKER))
                .plan_modifier(NullWhenSiblingSet::new("certificate.ssh")),
        ),
        ("ssh", ssh_attribute("Key id and principals of an SSH certificate.")?),
    ])
    .required()
    .description(description))
}

/// Handler for [`TYPE_NAME`]
pub struct AccountResource {
    client: Arc<Client>,
}

impl AccountResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Resource for AccountResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let doc = describe("account")?;
        let mut schema = Schema::new(doc.description.clone())
            .attribute("id", id_attribute(doc.property("id")))
            .attribute(
                "name",
                Attribute::string().required().description(doc.property("name")),
            )
            .attribute("certificate", certificate_attribute(doc.property("certificate"))?)
            .attribute("key", key_attribute(doc.property("key"))?)
            .attribute("reload", reload_attribute(doc.property("reload"))?)
            .attribute("policy", policy_attribute(doc.property("policy"))?);
        for (name, attribute) in variant_attributes()? {
            schema = schema.attribute(name, attribute);
        }
        Ok(schema)
    }

    fn config_validators(&self) -> Vec<Box<dyn ConfigValidator>> {
        vec![
            Box::new(ExactlyOneOf::new(VARIANTS.map(AttrPath::root))),
            Box::new(AtMostOneOf::new([
                AttrPath::parse("certificate.x509"),
                AttrPath::parse("certificate.ssh"),
            ])),
        ]
    }

    fn create(&self, req: CreateRequest, resp: &mut CreateResponse) {
        let Some(plan) = api::decode_model::<AccountModel>(&mut resp.diagnostics, &req.plan) else {
            return;
        };
        let body = match plan.to_api() {
            Ok(body) => body,
            Err(err) => {
                api::client_error(&mut resp.diagnostics, "encode account", err);
                return;
            }
        };
        log::debug!("create {TYPE_NAME} {} ({})", body.name, body.account_type);

        let result = self.client.post(&["accounts"], &body);
        let Some(remote) =
            api::expect_json::<Account>(&mut resp.diagnostics, "create account", result, 201)
        else {
            return;
        };
        let state = AccountModel::from_api(remote, &Attr::Known(plan), &mut resp.diagnostics);
        if resp.diagnostics.has_error() {
            return;
        }
        state.record_markers(&req.config, &mut resp.private, &mut resp.diagnostics);
        resp.set_state(&state);
    }

    fn read(&self, req: ReadRequest, resp: &mut ReadResponse) {
        let Some(state) = api::decode_model::<AccountModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("read {TYPE_NAME} {id}");

        let result = self.client.get(&["accounts", id]);
        match api::lookup::<Account>(&mut resp.diagnostics, "read account", result) {
            Lookup::Found(remote) => {
                let model =
                    AccountModel::from_api(remote, &Attr::Known(state), &mut resp.diagnostics);
                if resp.diagnostics.has_error() {
                    return;
                }
                resp.set_state(&model);
                resp.private = req.private;
            }
            Lookup::Gone => resp.remove_resource(),
            Lookup::Failed => {}
        }
    }

    fn update(&self, req: UpdateRequest, resp: &mut UpdateResponse) {
        let Some(plan) = api::decode_model::<AccountModel>(&mut resp.diagnostics, &req.plan) else {
            return;
        };
        let Some(prior) = api::decode_model::<AccountModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let mut body = match plan.to_api() {
            Ok(body) => body,
            Err(err) => {
                api::client_error(&mut resp.diagnostics, "encode account", err);
                return;
            }
        };
        let id = prior.id.value_str();
        body.id = Some(id.to_string());
        log::debug!("update {TYPE_NAME} {id}");

        let result = self.client.put(&["accounts", id], &body);
        let Some(remote) =
            api::expect_json::<Account>(&mut resp.diagnostics, "update account", result, 200)
        else {
            return;
        };
        let state = AccountModel::from_api(remote, &Attr::Known(plan), &mut resp.diagnostics);
        if resp.diagnostics.has_error() {
            return;
        }
        resp.private = req.private;
        state.record_markers(&req.config, &mut resp.private, &mut resp.diagnostics);
        resp.set_state(&state);
    }

    fn delete(&self, req: DeleteRequest, resp: &mut DeleteResponse) {
        let Some(state) = api::decode_model::<AccountModel>(&mut resp.diagnostics, &req.state)
        else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("delete {TYPE_NAME} {id}");
        api::expect(
            &mut resp.diagnostics,
            "delete account",
            self.client.delete(&["accounts", id]),
            204,
        );
    }
}
