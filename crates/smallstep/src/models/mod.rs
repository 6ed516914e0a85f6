//! Wire models for the Smallstep API.
//!
//! Field names follow the API's camelCase JSON. Optional fields are
//! `Option` and skipped when `None`, so an absent field and a zero value
//! stay distinguishable in both directions.

pub mod account;
pub mod authority;
pub mod collection;
pub mod common;
pub mod credential;
pub mod device;
pub mod identity;
pub mod network;
pub mod provisioner;
pub mod union;
pub mod webhook;

pub use account::{
    Account, BrowserAccount, EndpointCertificateInfo, EthernetAccount, IkeV2Config, VpnAccount,
    WifiAccount,
};
pub use authority::{Authority, AuthorityUpdate, DistinguishedName, NewAuthority, X509Issuer};
pub use collection::{
    AttestationAuthority, AttestationAuthorityUpdate, Collection, CollectionInstance,
    CollectionUpdate, InstanceData, NewCollection,
};
pub use common::{
    CertificateField, CertificateFieldList, EndpointKeyInfo, EndpointReloadInfo, Files, Policy,
    SshFields, X509Fields,
};
pub use credential::{Credential, CredentialCertificate};
pub use device::{Device, DeviceRequest, DeviceUser};
pub use identity::{IdentityProvider, IdpClient};
pub use network::{BrowserProfile, ManagedRadius, ReplyAttribute};
pub use provisioner::{
    AcmeAttestationProvisioner, AcmeProvisioner, AwsProvisioner, AzureProvisioner, GcpProvisioner,
    JwkProvisioner, OidcProvisioner, Provisioner, ProvisionerClaims, ProvisionerOptions,
    TemplateOptions, X5cProvisioner,
};
pub use union::Union;
pub use webhook::{BasicAuth, ProvisionerWebhook};
