use crate::models::Union;
use crate::models::common::{EndpointKeyInfo, EndpointReloadInfo, Policy};
use serde::{Deserialize, Serialize};

pub const ACCOUNT_TYPE_WIFI: &str = "WIFI";
pub const ACCOUNT_TYPE_VPN: &str = "VPN";
pub const ACCOUNT_TYPE_ETHERNET: &str = "ETHERNET";
pub const ACCOUNT_TYPE_BROWSER: &str = "BROWSER";

pub const CERTIFICATE_TYPE_X509: &str = "X509";
pub const CERTIFICATE_TYPE_SSH: &str = "SSH";

/// A network or browser account provisioned onto matching devices.
///
/// `account_type` selects the branch held by `configuration`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Union>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<EndpointCertificateInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<EndpointKeyInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload: Option<EndpointReloadInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<Policy>,
}

/// Certificate issued for an account; `details` holds X509 or SSH fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointCertificateInfo {
    #[serde(rename = "type")]
    pub certificate_type: String,
    #[serde(rename = "authorityID", default, skip_serializing_if = "Option::is_none")]
    pub authority_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crt_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Union>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiAccount {
    pub ssid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autojoin: Option<bool>,
    #[serde(rename = "networkAccessServerIP", default, skip_serializing_if = "Option::is_none")]
    pub network_access_server_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_chain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_radius_server: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpnAccount {
    pub connection_type: String,
    pub remote_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autojoin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ike: Option<IkeV2Config>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IkeV2Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_chain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eap: Option<bool>,
    #[serde(rename = "remoteID", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthernetAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autojoin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_chain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_radius_server: Option<bool>,
    #[serde(rename = "networkAccessServerIP", default, skip_serializing_if = "Option::is_none")]
    pub network_access_server_ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserAccount {}
