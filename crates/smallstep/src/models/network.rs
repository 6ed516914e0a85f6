//! Browser profiles and managed RADIUS servers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub match_addresses: Vec<String>,
    /// Credential ids presented by the browser
    #[serde(default)]
    pub credentials: Vec<String>,
}

/// A RADIUS server run by Smallstep for network access.
///
/// `secret` is generated by the server and only returned on create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedRadius {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "nasIPs")]
    pub nas_ips: Vec<String>,
    #[serde(rename = "clientCA")]
    pub client_ca: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_attributes: Option<Vec<ReplyAttribute>>,
    #[serde(rename = "serverCA", default, skip_serializing_if = "Option::is_none")]
    pub server_ca: Option<String>,
    #[serde(rename = "serverIP", default, skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyAttribute {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from_certificate: Option<String>,
}
