//! Key and reload settings for certificates installed on devices.

use crate::bridge::{from_remote, to_remote};
use crate::codec::Codec;
use crate::describe::describe;
use crate::modifiers::{UseStateIfServerComputed, requires_replace_if_either_is};
use anyhow::Result;
use declarative::{Attr, Attribute, object};
use smallstep::models;

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct KeyInfo {
        pub key_type: Attr<String> => "type",
        pub protection: Attr<String>,
        pub pub_file: Attr<String>,
    }
}

impl Codec for KeyInfo {
    type Api = models::EndpointKeyInfo;

    fn to_api(&self) -> models::EndpointKeyInfo {
        models::EndpointKeyInfo {
            key_type: to_remote(&self.key_type),
            protection: to_remote(&self.protection),
            pub_file: to_remote(&self.pub_file),
        }
    }

    fn from_api(remote: models::EndpointKeyInfo, prior: &Attr<Self>) -> Self {
        Self {
            key_type: from_remote(remote.key_type, &prior.get(|k| &k.key_type)),
            protection: from_remote(remote.protection, &prior.get(|k| &k.protection)),
            pub_file: from_remote(remote.pub_file, &prior.get(|k| &k.pub_file)),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ReloadInfo {
        pub method: Attr<String>,
        pub pid_file: Attr<String>,
        pub signal: Attr<i64>,
        pub unit_name: Attr<String>,
    }
}

impl Codec for ReloadInfo {
    type Api = models::EndpointReloadInfo;

    fn to_api(&self) -> models::EndpointReloadInfo {
        models::EndpointReloadInfo {
            method: self.method.value_str().to_string(),
            pid_file: to_remote(&self.pid_file),
            signal: to_remote(&self.signal),
            unit_name: to_remote(&self.unit_name),
        }
    }

    fn from_api(remote: models::EndpointReloadInfo, prior: &Attr<Self>) -> Self {
        Self {
            method: from_remote(Some(remote.method), &prior.get(|r| &r.method)),
            pid_file: from_remote(remote.pid_file, &prior.get(|r| &r.pid_file)),
            signal: from_remote(remote.signal, &prior.get(|r| &r.signal)),
            unit_name: from_remote(remote.unit_name, &prior.get(|r| &r.unit_name)),
        }
    }
}

/// Private-state marker key for a key the server filled in.
pub const KEY_MARKER: &str = "key";

/// Private-state marker key for reload settings the server filled in.
pub const RELOAD_MARKER: &str = "reload";

/// Schema of a [`KeyInfo`] object the server fills in when omitted.
///
/// Moving the key to or from hardware attestation replaces the resource.
pub fn key_attribute(description: &str) -> Result<Attribute> {
    let doc = describe("endpointKeyInfo")?;
    Ok(Attribute::object([
        (
            "type",
            Attribute::string()
                .optional()
                .computed()
                .description(doc.property("type")),
        ),
        (
            "protection",
            Attribute::string()
                .optional()
                .computed()
                .description(doc.property("protection"))
                .plan_modifier(requires_replace_if_either_is("HARDWARE_ATTESTED")),
        ),
        (
            "pub_file",
            Attribute::string().optional().description(doc.property("pubFile")),
        ),
    ])
    .optional()
    .computed()
    .description(description)
    .plan_modifier(UseStateIfServerComputed::new(KEY_MARKER)))
}

/// Schema of a [`ReloadInfo`] object the server fills in when omitted.
pub fn reload_attribute(description: &str) -> Result<Attribute> {
    let doc = describe("endpointReloadInfo")?;
    Ok(Attribute::object([
        (
            "method",
            Attribute::string()
                .required()
                .description(doc.property("method")),
        ),
        (
            "pid_file",
            Attribute::string().optional().description(doc.property("pidFile")),
        ),
        (
            "signal",
            Attribute::int64().optional().description(doc.property("signal")),
        ),
        (
            "unit_name",
            Attribute::string().optional().description(doc.property("unitName")),
        ),
    ])
    .optional()
    .computed()
    .description(description)
    .plan_modifier(UseStateIfServerComputed::new(RELOAD_MARKER)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;

    #[test]
    fn test_server_default_key_against_unknown_plan() {
        let remote = models::EndpointKeyInfo {
            key_type: Some("ECDSA_P256".into()),
            protection: Some("NONE".into()),
            pub_file: None,
        };
        let decoded = decode::<KeyInfo>(Some(remote), &Attr::Unknown).into_known().unwrap();
        assert_eq!(decoded.key_type, Attr::string("ECDSA_P256"));
        assert_eq!(decoded.protection, Attr::string("NONE"));
        assert!(decoded.pub_file.is_null());
    }

    #[test]
    fn test_key_type_wire_name() {
        let key = KeyInfo {
            key_type: Attr::string("RSA_2048"),
            ..KeyInfo::default()
        };
        let json = serde_json::to_value(key.to_api()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "RSA_2048"}));
    }

    #[test]
    fn test_reload_round_trip() {
        let reload = ReloadInfo {
            method: Attr::string("PROCESS"),
            pid_file: Attr::string("/run/nginx.pid"),
            signal: Attr::Known(1),
            unit_name: Attr::Null,
        };
        let prior = Attr::Known(reload.clone());
        assert_eq!(decode(Some(reload.to_api()), &prior), prior);
    }
}
