//! Account configuration and certificate variant families.
//!
//! On the wire an account carries a `type` discriminator and an opaque
//! `configuration` object; its certificate carries a `type` and opaque
//! `details`. In configuration each branch is its own sibling attribute
//! and at most one of them is set.

use crate::api::CLIENT_ERROR;
use crate::bridge::{from_remote, from_remote_with, to_remote, to_remote_non_empty};
use crate::codec::fields::{SshFields, X509Fields};
use crate::codec::{Codec, decode, encode};
use crate::equivalence::duration_equal;
use declarative::{Attr, Diagnostics, object};
use serde::de::DeserializeOwned;
use smallstep::models::{self, Union};
use smallstep::models::account::{
    ACCOUNT_TYPE_BROWSER, ACCOUNT_TYPE_ETHERNET, ACCOUNT_TYPE_VPN, ACCOUNT_TYPE_WIFI,
    CERTIFICATE_TYPE_SSH, CERTIFICATE_TYPE_X509,
};

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Wifi {
        pub ssid: Attr<String>,
        pub hidden: Attr<bool>,
        pub autojoin: Attr<bool>,
        pub network_access_server_ip: Attr<String>,
        pub ca_chain: Attr<String>,
        pub external_radius_server: Attr<bool>,
    }
}

impl Codec for Wifi {
    type Api = models::WifiAccount;

    fn to_api(&self) -> models::WifiAccount {
        models::WifiAccount {
            ssid: self.ssid.value_str().to_string(),
            hidden: to_remote(&self.hidden),
            autojoin: to_remote(&self.autojoin),
            network_access_server_ip: to_remote(&self.network_access_server_ip),
            ca_chain: to_remote(&self.ca_chain),
            external_radius_server: to_remote(&self.external_radius_server),
        }
    }

    fn from_api(remote: models::WifiAccount, prior: &Attr<Self>) -> Self {
        Self {
            ssid: from_remote(Some(remote.ssid), &prior.get(|w| &w.ssid)),
            hidden: from_remote(remote.hidden, &prior.get(|w| &w.hidden)),
            autojoin: from_remote(remote.autojoin, &prior.get(|w| &w.autojoin)),
            network_access_server_ip: from_remote(
                remote.network_access_server_ip,
                &prior.get(|w| &w.network_access_server_ip),
            ),
            ca_chain: from_remote(remote.ca_chain, &prior.get(|w| &w.ca_chain)),
            external_radius_server: from_remote(
                remote.external_radius_server,
                &prior.get(|w| &w.external_radius_server),
            ),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Ike {
        pub ca_chain: Attr<String>,
        pub eap: Attr<bool>,
        pub remote_id: Attr<String>,
    }
}

impl Codec for Ike {
    type Api = models::IkeV2Config;

    fn to_api(&self) -> models::IkeV2Config {
        models::IkeV2Config {
            ca_chain: to_remote(&self.ca_chain),
            eap: to_remote(&self.eap),
            remote_id: to_remote(&self.remote_id),
        }
    }

    fn from_api(remote: models::IkeV2Config, prior: &Attr<Self>) -> Self {
        Self {
            ca_chain: from_remote(remote.ca_chain, &prior.get(|i| &i.ca_chain)),
            eap: from_remote(remote.eap, &prior.get(|i| &i.eap)),
            remote_id: from_remote(remote.remote_id, &prior.get(|i| &i.remote_id)),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Vpn {
        pub connection_type: Attr<String>,
        pub remote_address: Attr<String>,
        pub autojoin: Attr<bool>,
        pub vendor: Attr<String>,
        pub ike: Attr<Ike>,
    }
}

impl Codec for Vpn {
    type Api = models::VpnAccount;

    fn to_api(&self) -> models::VpnAccount {
        models::VpnAccount {
            connection_type: self.connection_type.value_str().to_string(),
            remote_address: self.remote_address.value_str().to_string(),
            autojoin: to_remote(&self.autojoin),
            vendor: to_remote(&self.vendor),
            ike: encode(&self.ike),
        }
    }

    fn from_api(remote: models::VpnAccount, prior: &Attr<Self>) -> Self {
        Self {
            connection_type: from_remote(
                Some(remote.connection_type),
                &prior.get(|v| &v.connection_type),
            ),
            remote_address: from_remote(
                Some(remote.remote_address),
                &prior.get(|v| &v.remote_address),
            ),
            autojoin: from_remote(remote.autojoin, &prior.get(|v| &v.autojoin)),
            vendor: from_remote(remote.vendor, &prior.get(|v| &v.vendor)),
            ike: decode(remote.ike, &prior.get(|v| &v.ike)),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Ethernet {
        pub autojoin: Attr<bool>,
        pub ca_chain: Attr<String>,
        pub external_radius_server: Attr<bool>,
        pub network_access_server_ip: Attr<String>,
    }
}

impl Codec for Ethernet {
    type Api = models::EthernetAccount;

    fn to_api(&self) -> models::EthernetAccount {
        models::EthernetAccount {
            autojoin: to_remote(&self.autojoin),
            ca_chain: to_remote(&self.ca_chain),
            external_radius_server: to_remote(&self.external_radius_server),
            network_access_server_ip: to_remote(&self.network_access_server_ip),
        }
    }

    fn from_api(remote: models::EthernetAccount, prior: &Attr<Self>) -> Self {
        Self {
            autojoin: from_remote(remote.autojoin, &prior.get(|e| &e.autojoin)),
            ca_chain: from_remote(remote.ca_chain, &prior.get(|e| &e.ca_chain)),
            external_radius_server: from_remote(
                remote.external_radius_server,
                &prior.get(|e| &e.external_radius_server),
            ),
            network_access_server_ip: from_remote(
                remote.network_access_server_ip,
                &prior.get(|e| &e.network_access_server_ip),
            ),
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Browser {}
}

impl Codec for Browser {
    type Api = models::BrowserAccount;

    fn to_api(&self) -> models::BrowserAccount {
        models::BrowserAccount {}
    }

    fn from_api(_remote: models::BrowserAccount, _prior: &Attr<Self>) -> Self {
        Self {}
    }
}

/// The account variant family
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variants {
    pub wifi: Attr<Wifi>,
    pub vpn: Attr<Vpn>,
    pub ethernet: Attr<Ethernet>,
    pub browser: Attr<Browser>,
}

impl Variants {
    /// The discriminator and configuration object of the set variant, or
    /// `None` when no variant is known yet.
    pub fn encode(&self) -> smallstep::Result<Option<(&'static str, Union)>> {
        let encoded = if let Some(wifi) = self.wifi.known() {
            (ACCOUNT_TYPE_WIFI, Union::from_variant(&wifi.to_api())?)
        } else if let Some(vpn) = self.vpn.known() {
            (ACCOUNT_TYPE_VPN, Union::from_variant(&vpn.to_api())?)
        } else if let Some(ethernet) = self.ethernet.known() {
            (ACCOUNT_TYPE_ETHERNET, Union::from_variant(&ethernet.to_api())?)
        } else if let Some(browser) = self.browser.known() {
            (ACCOUNT_TYPE_BROWSER, Union::from_variant(&browser.to_api())?)
        } else {
            return Ok(None);
        };
        Ok(Some(encoded))
    }

    /// Decode the branch named by `account_type`; every other branch is
    /// null.
    pub fn decode(
        account_type: &str,
        configuration: Option<Union>,
        prior: &Self,
        diags: &mut Diagnostics,
    ) -> Self {
        let union = configuration.unwrap_or_default();
        let mut decoded = Self::default();
        match account_type {
            ACCOUNT_TYPE_WIFI => decoded.wifi = extract(&union, &prior.wifi, "wifi", diags),
            ACCOUNT_TYPE_VPN => decoded.vpn = extract(&union, &prior.vpn, "vpn", diags),
            ACCOUNT_TYPE_ETHERNET => {
                decoded.ethernet = extract(&union, &prior.ethernet, "ethernet", diags);
            }
            ACCOUNT_TYPE_BROWSER => {
                decoded.browser = extract(&union, &prior.browser, "browser", diags);
            }
            other => diags.add_error(
                CLIENT_ERROR,
                format!("Unsupported account type {other:?} in API response"),
            ),
        }
        decoded
    }
}

/// Decode a union branch the discriminator says is present.
fn extract<C>(union: &Union, prior: &Attr<C>, name: &str, diags: &mut Diagnostics) -> Attr<C>
where
    C: Codec,
    C::Api: DeserializeOwned,
{
    match union.as_variant::<C::Api>() {
        Ok(api) => Attr::Known(C::from_api(api, prior)),
        Err(err) => {
            diags.add_error(CLIENT_ERROR, format!("Failed to decode {name}: {err}"));
            Attr::Null
        }
    }
}

/// Decode optional union details into an optional object.
fn extract_details<C>(
    details: Option<Union>,
    prior: &Attr<C>,
    name: &str,
    diags: &mut Diagnostics,
) -> Attr<C>
where
    C: Codec,
    C::Api: DeserializeOwned,
{
    let Some(union) = details else {
        return decode(None, prior);
    };
    match union.as_variant::<C::Api>() {
        Ok(api) => decode(Some(api), prior),
        Err(err) => {
            diags.add_error(CLIENT_ERROR, format!("Failed to decode {name}: {err}"));
            Attr::Null
        }
    }
}

object! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct AccountCertificate {
        pub authority_id: Attr<String>,
        pub duration: Attr<String>,
        pub crt_file: Attr<String>,
        pub key_file: Attr<String>,
        pub root_file: Attr<String>,
        pub uid: Attr<i64>,
        pub gid: Attr<i64>,
        pub mode: Attr<i64>,
        pub x509: Attr<X509Fields>,
        pub ssh: Attr<SshFields>,
    }
}

impl AccountCertificate {
    /// Encode with the certificate type taken from the set branch.
    ///
    /// SSH wins when both branches are set. With neither set the type is
    /// X509 with empty details, and the server fills in the fields.
    pub fn to_api(&self) -> smallstep::Result<models::EndpointCertificateInfo> {
        let (certificate_type, details) = match (self.x509.known(), self.ssh.known()) {
            (_, Some(ssh)) => (CERTIFICATE_TYPE_SSH, Union::from_variant(&ssh.to_api())?),
            (Some(x509), None) => (CERTIFICATE_TYPE_X509, Union::from_variant(&x509.to_api())?),
            (None, None) => (CERTIFICATE_TYPE_X509, Union::default()),
        };
        Ok(models::EndpointCertificateInfo {
            certificate_type: certificate_type.to_string(),
            authority_id: to_remote(&self.authority_id),
            duration: to_remote_non_empty(&self.duration),
            crt_file: to_remote(&self.crt_file),
            key_file: to_remote(&self.key_file),
            root_file: to_remote(&self.root_file),
            uid: to_remote(&self.uid),
            gid: to_remote(&self.gid),
            mode: to_remote(&self.mode),
            details: Some(details),
        })
    }

    pub fn from_api(
        remote: models::EndpointCertificateInfo,
        prior: &Attr<Self>,
        diags: &mut Diagnostics,
    ) -> Self {
        let mut decoded = Self {
            authority_id: from_remote(remote.authority_id, &prior.get(|c| &c.authority_id)),
            duration: from_remote_with(
                remote.duration,
                &prior.get(|c| &c.duration),
                duration_equal,
            ),
            crt_file: from_remote(remote.crt_file, &prior.get(|c| &c.crt_file)),
            key_file: from_remote(remote.key_file, &prior.get(|c| &c.key_file)),
            root_file: from_remote(remote.root_file, &prior.get(|c| &c.root_file)),
            uid: from_remote(remote.uid, &prior.get(|c| &c.uid)),
            gid: from_remote(remote.gid, &prior.get(|c| &c.gid)),
            mode: from_remote(remote.mode, &prior.get(|c| &c.mode)),
            x509: Attr::Null,
            ssh: Attr::Null,
        };
        match remote.certificate_type.as_str() {
            CERTIFICATE_TYPE_X509 => {
                decoded.x509 =
                    extract_details(remote.details, &prior.get(|c| &c.x509), "x509", diags);
            }
            CERTIFICATE_TYPE_SSH => {
                decoded.ssh = extract_details(remote.details, &prior.get(|c| &c.ssh), "ssh", diags);
            }
            other => diags.add_error(
                CLIENT_ERROR,
                format!("Unsupported certificate type {other:?} in API response"),
            ),
        }
        decoded
    }
}
