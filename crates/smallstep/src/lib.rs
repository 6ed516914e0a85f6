//! # smallstep
//!
//! Blocking client for the Smallstep API.
//!
//! This crate provides:
//! - Serde models for authorities, provisioners, credentials, devices,
//!   accounts and the other API objects
//! - A [`Backend`](backend::Backend) abstraction with a ureq transport and
//!   an in-memory mock for tests
//! - Bearer-token authentication, either static or bootstrapped from a
//!   client certificate and rotated in the background
//!
//! ## Example
//!
//! ```no_run
//! use smallstep::{Client, Credentials};
//! use smallstep::models::Authority;
//!
//! let client = Client::connect(
//!     "https://gateway.smallstep.com",
//!     &Credentials::Token("api-token".into()),
//! ).expect("connect failed");
//!
//! let resp = client.get(&["authorities", "0b8a6c52-6f54-4a8b-9d0b-2f6a4c8a1e33"]).unwrap();
//! if resp.is_success() {
//!     let authority: Authority = resp.json().unwrap();
//!     println!("{} ({})", authority.name, authority.domain);
//! }
//! ```

pub mod auth;
pub mod backend;
pub mod client;
pub mod error;
pub mod models;

// Re-export main types at crate root
pub use backend::{ApiRequest, ApiResponse, Method};
pub use client::{Client, Credentials};
pub use error::{Error, ErrorCategory, Result};
