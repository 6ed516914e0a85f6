//! `smallstep_device`: a device in the team's inventory.

use crate::api::{self, Lookup};
use crate::bridge::{from_remote, from_remote_with, to_remote};
use crate::describe::describe;
use crate::equivalence::timestamp_equal;
use crate::resources::id_attribute;
use anyhow::Result;
use declarative::{
    Attr, Attribute, CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, OneOf,
    ReadRequest, ReadResponse, RequiresReplace, Resource, Schema, UpdateRequest, UpdateResponse,
    UseStateForUnknown, object,
};
use smallstep::Client;
use smallstep::models::{Device, DeviceRequest, DeviceUser};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const TYPE_NAME: &str = "smallstep_device";

const OPERATING_SYSTEMS: [&str; 8] = [
    "Linux", "Windows", "macOS", "iOS", "iPadOS", "tvOS", "watchOS", "visionOS",
];
const OWNERSHIP: [&str; 2] = ["company", "user"];

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct UserModel {
        pub email: Attr<String>,
        pub display_name: Attr<String>,
    }
}

impl UserModel {
    fn decode(remote: Option<DeviceUser>, prior: &Attr<Self>) -> Attr<Self> {
        let Some(remote) = remote else {
            return Attr::Null;
        };
        Attr::Known(Self {
            email: from_remote(Some(remote.email), &prior.get(|u| &u.email)),
            display_name: from_remote(remote.display_name, &prior.get(|u| &u.display_name)),
        })
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct DeviceModel {
        pub id: Attr<String>,
        pub permanent_identifier: Attr<String>,
        pub serial: Attr<String>,
        pub display_id: Attr<String>,
        pub display_name: Attr<String>,
        pub os: Attr<String>,
        pub ownership: Attr<String>,
        pub metadata: Attr<BTreeMap<String, String>>,
        pub tags: Attr<Vec<String>>,
        pub user: Attr<UserModel>,
        pub connected: Attr<bool>,
        pub high_assurance: Attr<bool>,
        pub enrolled_at: Attr<String>,
        pub approved_at: Attr<String>,
        pub last_seen: Attr<String>,
    }
}

impl DeviceModel {
    fn to_api(&self) -> DeviceRequest {
        DeviceRequest {
            permanent_identifier: self.permanent_identifier.value_str().to_string(),
            serial: to_remote(&self.serial),
            display_id: to_remote(&self.display_id),
            display_name: to_remote(&self.display_name),
            os: to_remote(&self.os),
            ownership: to_remote(&self.ownership),
            metadata: to_remote(&self.metadata),
            tags: to_remote(&self.tags),
            user: self.user.known().map(|user| DeviceUser {
                email: user.email.value_str().to_string(),
                display_name: None,
            }),
        }
    }

    fn from_api(remote: Device, prior: &Attr<Self>) -> Self {
        let timestamp = |remote: Option<String>, prior: Attr<String>| {
            from_remote_with(remote, &prior, timestamp_equal)
        };
        Self {
            id: from_remote(Some(remote.id), &prior.get(|d| &d.id)),
            permanent_identifier: from_remote(
                Some(remote.permanent_identifier),
                &prior.get(|d| &d.permanent_identifier),
            ),
            serial: from_remote(remote.serial, &prior.get(|d| &d.serial)),
            display_id: from_remote(remote.display_id, &prior.get(|d| &d.display_id)),
            display_name: from_remote(remote.display_name, &prior.get(|d| &d.display_name)),
            os: from_remote(remote.os, &prior.get(|d| &d.os)),
            ownership: from_remote(remote.ownership, &prior.get(|d| &d.ownership)),
            metadata: from_remote(remote.metadata, &prior.get(|d| &d.metadata)),
            tags: from_remote(remote.tags, &prior.get(|d| &d.tags)),
            user: UserModel::decode(remote.user, &prior.get(|d| &d.user)),
            connected: from_remote(remote.connected, &prior.get(|d| &d.connected)),
            high_assurance: from_remote(remote.high_assurance, &prior.get(|d| &d.high_assurance)),
            enrolled_at: timestamp(remote.enrolled_at, prior.get(|d| &d.enrolled_at)),
            approved_at: timestamp(remote.approved_at, prior.get(|d| &d.approved_at)),
            last_seen: timestamp(remote.last_seen, prior.get(|d| &d.last_seen)),
        }
    }
}

/// Handler for [`TYPE_NAME`]
pub struct DeviceResource {
    client: Arc<Client>,
}

impl DeviceResource {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl Resource for DeviceResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        let doc = describe("device")?;
        let user = describe("deviceUser")?;
        let optional = |name: &str| Attribute::string().optional().description(doc.property(name));
        let read_only = |attribute: Attribute, name: &str| {
            attribute.computed().description(doc.property(name))
        };

        Ok(Schema::new(doc.description.clone())
            .attribute("id", id_attribute(doc.property("id")))
            .attribute(
                "permanent_identifier",
                Attribute::string()
                    .required()
                    .description(doc.property("permanentIdentifier"))
                    .plan_modifier(RequiresReplace),
            )
            .attribute("serial", optional("serial"))
            .attribute(
                "display_id",
                optional("displayId")
                    .computed()
                    .plan_modifier(UseStateForUnknown),
            )
            .attribute("display_name", optional("displayName"))
            .attribute("os", optional("os").validator(OneOf::new(OPERATING_SYSTEMS)))
            .attribute("ownership", optional("ownership").validator(OneOf::new(OWNERSHIP)))
            .attribute(
                "metadata",
                Attribute::string_map()
                    .optional()
                    .description(doc.property("metadata")),
            )
            .attribute(
                "tags",
                Attribute::string_list()
                    .optional()
                    .description(doc.property("tags")),
            )
            .attribute(
                "user",
                Attribute::object([
                    (
                        "email",
                        Attribute::string()
                            .required()
                            .description(user.property("email")),
                    ),
                    (
                        "display_name",
                        Attribute::string()
                            .computed()
                            .description(user.property("displayName")),
                    ),
                ])
                .optional()
                .description(doc.property("user")),
            )
            .attribute("connected", read_only(Attribute::bool(), "connected"))
            .attribute("high_assurance", read_only(Attribute::bool(), "highAssurance"))
            .attribute(
                "enrolled_at",
                read_only(Attribute::string(), "enrolledAt").plan_modifier(UseStateForUnknown),
            )
            .attribute("approved_at", read_only(Attribute::string(), "approvedAt"))
            .attribute("last_seen", read_only(Attribute::string(), "lastSeen")))
    }

    fn create(&self, req: CreateRequest, resp: &mut CreateResponse) {
        let Some(plan) = api::decode_model::<DeviceModel>(&mut resp.diagnostics, &req.plan) else {
            return;
        };
        log::debug!("create {TYPE_NAME}");
        let result = self.client.post(&["devices"], &plan.to_api());
        let Some(remote) =
            api::expect_json::<Device>(&mut resp.diagnostics, "create device", result, 201)
        else {
            return;
        };
        resp.set_state(&DeviceModel::from_api(remote, &Attr::Known(plan)));
    }

    fn read(&self, req: ReadRequest, resp: &mut ReadResponse) {
        let Some(state) = api::decode_model::<DeviceModel>(&mut resp.diagnostics, &req.state) else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("read {TYPE_NAME} {id}");

        let result = self.client.get(&["devices", id]);
        match api::lookup::<Device>(&mut resp.diagnostics, "read device", result) {
            Lookup::Found(remote) => {
                resp.set_state(&DeviceModel::from_api(remote, &Attr::Known(state)));
                resp.private = req.private;
            }
            Lookup::Gone => resp.remove_resource(),
            Lookup::Failed => {}
        }
    }

    fn update(&self, req: UpdateRequest, resp: &mut UpdateResponse) {
        let Some(plan) = api::decode_model::<DeviceModel>(&mut resp.diagnostics, &req.plan) else {
            return;
        };
        let Some(prior) = api::decode_model::<DeviceModel>(&mut resp.diagnostics, &req.state) else {
            return;
        };
        let id = prior.id.value_str();
        log::debug!("update {TYPE_NAME} {id}");

        let result = self.client.put(&["devices", id], &plan.to_api());
        let Some(remote) =
            api::expect_json::<Device>(&mut resp.diagnostics, "update device", result, 200)
        else {
            return;
        };
        resp.set_state(&DeviceModel::from_api(remote, &Attr::Known(plan)));
        resp.private = req.private;
    }

    fn delete(&self, req: DeleteRequest, resp: &mut DeleteResponse) {
        let Some(state) = api::decode_model::<DeviceModel>(&mut resp.diagnostics, &req.state) else {
            return;
        };
        let id = state.id.value_str();
        log::debug!("delete {TYPE_NAME} {id}");
        api::expect(
            &mut resp.diagnostics,
            "delete device",
            self.client.delete(&["devices", id]),
            204,
        );
    }
}
