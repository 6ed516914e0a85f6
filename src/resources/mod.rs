//! Resource handlers
//!
//! Every handler converges one kind of Smallstep object. Handlers share
//! one API client and never return errors: failures become diagnostics
//! and the handler returns without writing state.

pub mod account;
pub mod attestation_authority;
pub mod authority;
pub mod browser_profile;
pub mod collection;
pub mod collection_instance;
pub mod credential;
pub mod device;
pub mod identity_provider;
pub mod idp_client;
pub mod managed_radius;
pub mod provisioner;
pub mod webhook;

use anyhow::{Context, Result};
use declarative::{Attribute, AttrPath, BoxedResource, Diagnostics, UseStateForUnknown};
use smallstep::Client;
use std::fs;
use std::io::Write;
use std::sync::Arc;

/// Prefix of every resource and data source type name
pub const TYPE_PREFIX: &str = "smallstep_";

/// Every resource handler, sharing one API client.
pub fn all(client: &Arc<Client>) -> Vec<BoxedResource> {
    vec![
        Box::new(authority::AuthorityResource::new(Arc::clone(client))),
        Box::new(provisioner::ProvisionerResource::new(Arc::clone(client))),
        Box::new(webhook::WebhookResource::new(Arc::clone(client))),
        Box::new(credential::CredentialResource::new(Arc::clone(client))),
        Box::new(device::DeviceResource::new(Arc::clone(client))),
        Box::new(account::AccountResource::new(Arc::clone(client))),
        Box::new(browser_profile::BrowserProfileResource::new(Arc::clone(client))),
        Box::new(managed_radius::ManagedRadiusResource::new(Arc::clone(client))),
        Box::new(identity_provider::IdentityProviderResource::new(Arc::clone(client))),
        Box::new(idp_client::IdpClientResource::new(Arc::clone(client))),
        Box::new(collection::CollectionResource::new(Arc::clone(client))),
        Box::new(collection_instance::CollectionInstanceResource::new(Arc::clone(client))),
        Box::new(attestation_authority::AttestationAuthorityResource::new(Arc::clone(client))),
    ]
}

/// Server-assigned identifier, stable across plans.
pub(crate) fn id_attribute(description: &str) -> Attribute {
    Attribute::string()
        .computed()
        .description(description)
        .plan_modifier(UseStateForUnknown)
}

/// Split a composite import id such as `<authority_id>/<name>`.
pub(crate) fn split_import_id<const N: usize>(
    id: &str,
    format: &str,
    diags: &mut Diagnostics,
) -> Option<[String; N]> {
    let parts: Vec<&str> = id.split('/').collect();
    if parts.len() != N || parts.iter().any(|part| part.is_empty()) {
        diags.add_attribute_error(
            AttrPath::root("id"),
            "Invalid Import ID",
            format!("Expected an import id of the form {format}, got {id:?}"),
        );
        return None;
    }
    Some(std::array::from_fn(|i| parts[i].to_string()))
}

/// Write a secret the server returns only once, readable by the owner only.
pub(crate) fn write_secret_file(path: &str, secret: &str) -> Result<()> {
    let path = crate::paths::expand(path);
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to restrict {}", path.display()))?;
    }
    file.write_all(secret.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::debug!("wrote secret to {}", path.display());
    Ok(())
}

/// Write `secret` where the user asked for it; a failure is a warning
/// because the remote object already exists.
pub(crate) fn save_secret(path: Option<&String>, secret: Option<&String>, diags: &mut Diagnostics) {
    let (Some(path), Some(secret)) = (path, secret) else {
        return;
    };
    if let Err(err) = write_secret_file(path, secret) {
        diags.add_attribute_warning(
            AttrPath::root("write_secret_file"),
            "Failed to write secret file",
            format!("{err:#}"),
        );
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use smallstep::backend::MockBackend;

    #[test]
    fn test_split_import_id() {
        let mut diags = Diagnostics::new();
        let parts: Option<[String; 2]> =
            split_import_id("a1/jwk", "<authority_id>/<name>", &mut diags);
        assert_eq!(parts, Some(["a1".to_string(), "jwk".to_string()]));
        assert!(diags.is_empty());

        let parts: Option<[String; 3]> = split_import_id("a1/p1", "<a>/<p>/<name>", &mut diags);
        assert!(parts.is_none());
        let parts: Option<[String; 2]> = split_import_id("a1/", "<a>/<name>", &mut diags);
        assert!(parts.is_none());

        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.path, Some(AttrPath::root("id")));
        assert!(diag.detail.contains("<a>/<p>/<name>"));
    }

    #[cfg(unix)]
    #[test]
    fn test_write_secret_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("webhook.secret");
        fs::write(&path, "stale").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        write_secret_file(path.to_str().unwrap(), "c2VjcmV0").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "c2VjcmV0");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_save_secret_failure_is_warning() {
        let mut diags = Diagnostics::new();
        let path = "/nonexistent-dir-for-test/secret".to_string();
        save_secret(Some(&path), Some(&"s".to_string()), &mut diags);
        assert!(!diags.has_error());
        assert_eq!(diags.warnings().count(), 1);
    }

    #[test]
    fn test_type_names_are_prefixed_and_unique() {
        let resources = all(&testing::client(&MockBackend::new()));
        let mut names: Vec<&str> = resources.iter().map(|r| r.type_name()).collect();
        assert!(names.iter().all(|n| n.starts_with(TYPE_PREFIX)));
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 13);
    }

    #[test]
    fn test_every_schema_builds() {
        for resource in all(&testing::client(&MockBackend::new())) {
            let schema = resource.schema().unwrap();
            assert!(
                !schema.markdown_description.is_empty(),
                "{} has no description",
                resource.type_name()
            );
        }
    }
}
