//! Certificate subject fields.
//!
//! Each field takes its value either from a static value or from device
//! metadata. X509 and SSH field sets share the same field shapes.

use crate::bridge::{from_remote, to_remote};
use crate::codec::{Codec, decode, encode};
use crate::describe::describe;
use anyhow::Result;
use declarative::{Attr, Attribute, object};
use smallstep::models;

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct CertificateField {
        pub static_value: Attr<String> => "static",
        pub device_metadata: Attr<String>,
    }
}

impl Codec for CertificateField {
    type Api = models::CertificateField;

    fn to_api(&self) -> models::CertificateField {
        models::CertificateField {
            static_value: to_remote(&self.static_value),
            device_metadata: to_remote(&self.device_metadata),
        }
    }

    fn from_api(remote: models::CertificateField, prior: &Attr<Self>) -> Self {
        Self {
            static_value: from_remote(remote.static_value, &prior.get(|f| &f.static_value)),
            device_metadata: from_remote(
                remote.device_metadata,
                &prior.get(|f| &f.device_metadata),
            ),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct CertificateFieldList {
        pub static_values: Attr<Vec<String>> => "static",
        pub device_metadata: Attr<Vec<String>>,
    }
}

impl Codec for CertificateFieldList {
    type Api = models::CertificateFieldList;

    fn to_api(&self) -> models::CertificateFieldList {
        models::CertificateFieldList {
            static_values: to_remote(&self.static_values),
            device_metadata: to_remote(&self.device_metadata),
        }
    }

    fn from_api(remote: models::CertificateFieldList, prior: &Attr<Self>) -> Self {
        Self {
            static_values: from_remote(remote.static_values, &prior.get(|f| &f.static_values)),
            device_metadata: from_remote(
                remote.device_metadata,
                &prior.get(|f| &f.device_metadata),
            ),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct X509Fields {
        pub common_name: Attr<CertificateField>,
        pub sans: Attr<CertificateFieldList>,
        pub organization: Attr<CertificateFieldList>,
        pub organizational_unit: Attr<CertificateFieldList>,
        pub locality: Attr<CertificateFieldList>,
        pub province: Attr<CertificateFieldList>,
        pub street_address: Attr<CertificateFieldList>,
        pub postal_code: Attr<CertificateFieldList>,
        pub country: Attr<CertificateFieldList>,
    }
}

impl Codec for X509Fields {
    type Api = models::X509Fields;

    fn to_api(&self) -> models::X509Fields {
        models::X509Fields {
            common_name: encode(&self.common_name),
            sans: encode(&self.sans),
            organization: encode(&self.organization),
            organizational_unit: encode(&self.organizational_unit),
            locality: encode(&self.locality),
            province: encode(&self.province),
            street_address: encode(&self.street_address),
            postal_code: encode(&self.postal_code),
            country: encode(&self.country),
        }
    }

    fn from_api(remote: models::X509Fields, prior: &Attr<Self>) -> Self {
        Self {
            common_name: decode(remote.common_name, &prior.get(|f| &f.common_name)),
            sans: decode(remote.sans, &prior.get(|f| &f.sans)),
            organization: decode(remote.organization, &prior.get(|f| &f.organization)),
            organizational_unit: decode(
                remote.organizational_unit,
                &prior.get(|f| &f.organizational_unit),
            ),
            locality: decode(remote.locality, &prior.get(|f| &f.locality)),
            province: decode(remote.province, &prior.get(|f| &f.province)),
            street_address: decode(remote.street_address, &prior.get(|f| &f.street_address)),
            postal_code: decode(remote.postal_code, &prior.get(|f| &f.postal_code)),
            country: decode(remote.country, &prior.get(|f| &f.country)),
        }
    }

    fn is_vacant(remote: &models::X509Fields) -> bool {
        *remote == models::X509Fields::default()
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct SshFields {
        pub key_id: Attr<CertificateField>,
        pub principals: Attr<CertificateFieldList>,
    }
}

impl Codec for SshFields {
    type Api = models::SshFields;

    fn to_api(&self) -> models::SshFields {
        models::SshFields {
            key_id: encode(&self.key_id),
            principals: encode(&self.principals),
        }
    }

    fn from_api(remote: models::SshFields, prior: &Attr<Self>) -> Self {
        Self {
            key_id: decode(remote.key_id, &prior.get(|f| &f.key_id)),
            principals: decode(remote.principals, &prior.get(|f| &f.principals)),
        }
    }

    fn is_vacant(remote: &models::SshFields) -> bool {
        *remote == models::SshFields::default()
    }
}

/// Schema of a single-valued field, or of a list field when `list` is set.
fn field_attribute(list: bool, description: &str) -> Result<Attribute> {
    let doc = describe(if list { "certificateFieldList" } else { "certificateField" })?;
    let leaf = || {
        if list {
            Attribute::string_list()
        } else {
            Attribute::string()
        }
    };
    Ok(Attribute::object([
        ("static", leaf().optional().description(doc.property("static"))),
        (
            "device_metadata",
            leaf().optional().description(doc.property("deviceMetadata")),
        ),
    ])
    .optional()
    .description(description))
}

/// Private-state marker key for X509 fields the server filled in.
pub const X509_MARKER: &str = "certificate.x509";

/// Schema of an [`X509Fields`] object.
pub fn x509_attribute(description: &str) -> Result<Attribute> {
    let doc = describe("x509Fields")?;
    let list = |name: &str| field_attribute(true, doc.property(name));
    Ok(Attribute::object([
        ("common_name", field_attribute(false, doc.property("commonName"))?),
        ("sans", list("sans")?),
        ("organization", list("organization")?),
        ("organizational_unit", list("organizationalUnit")?),
        ("locality", list("locality")?),
        ("province", list("province")?),
        ("street_address", list("streetAddress")?),
        ("postal_code", list("postalCode")?),
        ("country", list("country")?),
    ])
    .optional()
    .description(description))
}

/// Schema of an [`SshFields`] object.
pub fn ssh_attribute(description: &str) -> Result<Attribute> {
    let doc = describe("sshFields")?;
    Ok(Attribute::object([
        ("key_id", field_attribute(false, doc.property("keyID"))?),
        ("principals", field_attribute(true, doc.property("principals"))?),
    ])
    .optional()
    .description(description))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common_name(value: &str) -> X509Fields {
        X509Fields {
            common_name: Attr::Known(CertificateField {
                static_value: Attr::string(value),
                device_metadata: Attr::Null,
            }),
            ..X509Fields::default()
        }
    }

    #[test]
    fn test_encode_static_common_name() {
        let api = common_name("X").to_api();
        assert_eq!(
            serde_json::to_value(&api).unwrap(),
            serde_json::json!({"commonName": {"static": "X"}})
        );
    }

    #[test]
    fn test_decode_keeps_subtree() {
        let prior = Attr::Known(common_name("X"));
        let api = common_name("X").to_api();
        assert_eq!(decode(Some(api), &prior), prior);
    }

    #[test]
    fn test_decode_device_metadata_lists() {
        let remote: models::X509Fields = serde_json::from_str(
            r#"{"sans": {"deviceMetadata": ["hostname"]}, "organization": {"static": []}}"#,
        )
        .unwrap();
        let prior = Attr::Known(X509Fields {
            organization: Attr::Known(CertificateFieldList {
                static_values: Attr::Known(vec![]),
                device_metadata: Attr::Null,
            }),
            ..X509Fields::default()
        });
        let decoded = X509Fields::from_api(remote, &prior);
        let sans = decoded.sans.known().unwrap();
        assert_eq!(sans.device_metadata, Attr::Known(vec!["hostname".to_string()]));
        assert!(sans.static_values.is_null());
        assert_eq!(
            decoded.organization.known().unwrap().static_values,
            Attr::Known(vec![])
        );
        assert!(decoded.common_name.is_null());
    }

    #[test]
    fn test_ssh_fields_wire_format() {
        let ssh = SshFields {
            key_id: Attr::Known(CertificateField {
                static_value: Attr::Null,
                device_metadata: Attr::string("email"),
            }),
            principals: Attr::Known(CertificateFieldList {
                static_values: Attr::Known(vec!["ops".into()]),
                device_metadata: Attr::Null,
            }),
        };
        let api = ssh.to_api();
        assert_eq!(
            serde_json::to_value(&api).unwrap(),
            serde_json::json!({
                "keyID": {"deviceMetadata": "email"},
                "principals": {"static": ["ops"]},
            })
        );
        assert_eq!(decode(Some(api), &Attr::Known(ssh.clone())), Attr::Known(ssh));
    }

    #[test]
    fn test_vacant_fields_decode_as_absent() {
        assert_eq!(
            decode::<X509Fields>(Some(models::X509Fields::default()), &Attr::Null),
            Attr::Null
        );
    }
}
