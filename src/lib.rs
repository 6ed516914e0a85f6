//! # Smallstep provider
//!
//! Converges Smallstep authorities, provisioners, credentials, devices,
//! accounts and related objects through the
//! [`declarative`] resource contract.
//!
//! ## Layers
//!
//! - [`bridge`]: optional API fields to four-state attributes and back
//! - [`equivalence`]: semantic equality for re-serialized strings
//! - [`describe`]: attribute documentation from the embedded API document
//! - [`modifiers`] and [`marker`]: plan modifiers for server-filled values
//! - [`codec`]: nested object models and their API counterparts
//! - [`resources`] and [`data_sources`]: lifecycle handlers
//! - [`validators`]: value checks shared by schemas
//! - [`provider`] and [`config`]: wiring one client to every handler

pub mod api;
pub mod bridge;
pub mod codec;
pub mod config;
pub mod data_sources;
pub mod describe;
pub mod equivalence;
pub mod marker;
pub mod modifiers;
pub mod paths;
pub mod provider;
pub mod resources;
pub mod validators;

pub use config::ProviderConfig;
pub use provider::Provider;
