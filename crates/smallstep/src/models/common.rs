//! Objects shared by credentials and accounts.

use serde::{Deserialize, Serialize};

/// A single-valued certificate field: a fixed value or a device metadata key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateField {
    #[serde(rename = "static", skip_serializing_if = "Option::is_none")]
    pub static_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_metadata: Option<String>,
}

/// A multi-valued certificate field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateFieldList {
    #[serde(rename = "static", skip_serializing_if = "Option::is_none")]
    pub static_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_metadata: Option<Vec<String>>,
}

/// Subject and SAN fields of an X.509 certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct X509Fields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_name: Option<CertificateField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sans: Option<CertificateFieldList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<CertificateFieldList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizational_unit: Option<CertificateFieldList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<CertificateFieldList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<CertificateFieldList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_address: Option<CertificateFieldList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<CertificateFieldList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<CertificateFieldList>,
}

/// Fields of an SSH certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshFields {
    #[serde(rename = "keyID", skip_serializing_if = "Option::is_none")]
    pub key_id: Option<CertificateField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principals: Option<CertificateFieldList>,
}

/// How the endpoint key is generated and stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointKeyInfo {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_file: Option<String>,
}

/// Which devices a credential or account is issued to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assurance: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Where the agent writes certificate material on the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Files {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crt_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<i64>,
}

/// How the agent tells a workload its certificate was renewed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointReloadInfo {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certificate_field_wire_names() {
        let field = CertificateField {
            static_value: Some("web".into()),
            device_metadata: None,
        };
        assert_eq!(serde_json::to_string(&field).unwrap(), r#"{"static":"web"}"#);

        let ssh: SshFields =
            serde_json::from_str(r#"{"keyID":{"deviceMetadata":"user"}}"#).unwrap();
        assert_eq!(
            ssh.key_id.unwrap().device_metadata.as_deref(),
            Some("user")
        );
    }

    #[test]
    fn test_empty_policy_serializes_as_empty_object() {
        assert_eq!(serde_json::to_string(&Policy::default()).unwrap(), "{}");
    }

    #[test]
    fn test_key_type_renamed() {
        let key: EndpointKeyInfo =
            serde_json::from_str(r#"{"type":"ECDSA_P256","protection":"NONE"}"#).unwrap();
        assert_eq!(key.key_type.as_deref(), Some("ECDSA_P256"));
        assert!(key.pub_file.is_none());
    }
}
