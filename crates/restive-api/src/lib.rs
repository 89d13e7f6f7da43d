//! Configurable async HTTP transport for REST JSON APIs.
//!
//! This crate is the transport half of the `restive` workspace: it turns
//! an [`ApiRequest`] (verb, server name, api version, path, JSON body)
//! into a decoded `serde_json::Value`, handling:
//!
//! - multi-server / multi-version base-URL resolution with
//!   warn-and-fall-back semantics ([`ApiConfig`]);
//! - GET bodies encoded as bracket-keyed query parameters;
//! - optional `_method` tunneling over POST for servers that only
//!   accept GET/POST (`method_override`);
//! - request interception and success/error post-processing [`Hooks`].
//!
//! The reactive resource layer lives in `restive-core`.

pub mod client;
pub mod config;
pub mod encode;
pub mod error;
pub mod request;
pub mod transport;

pub use client::ApiClient;
pub use config::{ApiConfig, Server};
pub use error::Error;
pub use request::{ApiRequest, ErrorHook, Hooks, InterceptHook, SuccessHook};
pub use transport::TransportConfig;
