//! The provider: one API client shared by every resource and data source.

use crate::config::ProviderConfig;
use crate::data_sources;
use crate::resources;
use anyhow::{Context, Result, bail};
use declarative::{
    BoxedDataSource, BoxedResource, DataSource, Diagnostics, ImportRequest, ImportResponse,
    ReadDataRequest, ReadDataResponse, ReadRequest, ReadResponse, Resource, Value,
};
use smallstep::backend::{ApiRequest, ApiResponse, Backend};
use smallstep::Client;
use std::sync::Arc;

pub struct Provider {
    resources: Vec<BoxedResource>,
    data_sources: Vec<BoxedDataSource>,
}

impl Provider {
    /// Resolve the configuration and connect.
    pub fn configure(config: ProviderConfig) -> Result<Self> {
        let resolved = config.resolve()?;
        log::debug!("connecting to {}", resolved.server_url);
        let client = Client::connect(&resolved.server_url, &resolved.credentials)
            .with_context(|| format!("Failed to configure client for {}", resolved.server_url))?;
        Ok(Self::with_client(Arc::new(client)))
    }

    /// Handlers with no connection, for listing types and schemas. Any
    /// API call they make fails.
    pub fn unconfigured() -> Self {
        Self::with_client(Arc::new(Client::with_backend(Unconfigured)))
    }

    pub fn with_client(client: Arc<Client>) -> Self {
        Self {
            resources: resources::all(&client),
            data_sources: data_sources::all(&client),
        }
    }

    pub fn resources(&self) -> impl Iterator<Item = &dyn Resource> {
        self.resources.iter().map(|r| &**r)
    }

    pub fn data_sources(&self) -> impl Iterator<Item = &dyn DataSource> {
        self.data_sources.iter().map(|d| &**d)
    }

    pub fn resource(&self, type_name: &str) -> Option<&dyn Resource> {
        self.resources().find(|r| r.type_name() == type_name)
    }

    pub fn data_source(&self, type_name: &str) -> Option<&dyn DataSource> {
        self.data_sources().find(|d| d.type_name() == type_name)
    }

    /// Schema of a resource or, failing that, a data source, as JSON.
    pub fn schema_json(&self, type_name: &str) -> Result<serde_json::Value> {
        let type_name = qualified(type_name);
        let schema = if let Some(resource) = self.resource(&type_name) {
            resource.schema()?
        } else if let Some(source) = self.data_source(&type_name) {
            source.schema()?
        } else {
            bail!("Unknown resource or data source: {type_name}");
        };
        Ok(schema.to_json())
    }

    /// Import `id` into a fresh state, then Read it.
    pub fn import_and_read(&self, type_name: &str, id: &str) -> Result<Value> {
        let type_name = qualified(type_name);
        let resource = self
            .resource(&type_name)
            .with_context(|| format!("Unknown resource: {type_name}"))?;

        let mut imported = ImportResponse::default();
        resource.import_state(ImportRequest { id: id.to_string() }, &mut imported);
        check(&imported.diagnostics).context("Import failed")?;

        let mut read = ReadResponse::default();
        resource.read(
            ReadRequest {
                state: imported.state,
                ..ReadRequest::default()
            },
            &mut read,
        );
        check(&read.diagnostics).context("Read failed")?;
        if read.state.is_null() {
            bail!("{type_name} {id} does not exist");
        }
        Ok(read.state)
    }

    /// Run a data source against a configuration.
    pub fn read_data(&self, type_name: &str, config: Value) -> Result<Value> {
        let type_name = qualified(type_name);
        let source = self
            .data_source(&type_name)
            .with_context(|| format!("Unknown data source: {type_name}"))?;
        let mut resp = ReadDataResponse::default();
        source.read(ReadDataRequest { config }, &mut resp);
        check(&resp.diagnostics).context("Read failed")?;
        Ok(resp.state)
    }
}

struct Unconfigured;

impl Backend for Unconfigured {
    fn send(&self, request: ApiRequest) -> smallstep::Result<ApiResponse> {
        Err(smallstep::Error::Other(format!(
            "provider is not configured; cannot send {} {}",
            request.method,
            request.path()
        )))
    }
}

/// Accept `authority` as well as `smallstep_authority`.
fn qualified(type_name: &str) -> String {
    if type_name.starts_with(resources::TYPE_PREFIX) {
        type_name.to_string()
    } else {
        format!("{}{type_name}", resources::TYPE_PREFIX)
    }
}

/// Log warnings; turn errors into one `anyhow` error.
fn check(diags: &Diagnostics) -> Result<()> {
    for warning in diags.warnings() {
        log::warn!("{warning}");
    }
    if diags.has_error() {
        let message = diags
            .errors()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        bail!(message);
    }
    Ok(())
}
