//! Reactive REST-resource streams over the `restive-api` transport.
//!
//! This crate turns raw JSON responses into typed, paginated, cacheable
//! resource streams:
//!
//! - **[`Resource`]** — the orchestrator: one-shot CRUD operations
//!   (`get`/`find`/`create`/`update`/`delete` with fluent `where_`
//!   filters) plus [`init`](Resource::init)-activated long-lived
//!   streams ([`pages()`](Resource::pages), [`models()`](Resource::models),
//!   [`cached_model()`](Resource::cached_model)) driven by trigger
//!   cells, route parameters, and optional parent-resource nesting.
//!
//! - **[`AdapterMap`]** — bidirectional per-field transforms keyed by
//!   [`FieldPath`]; `up` rewrites outgoing bodies, `down` derives values
//!   into each record's parallel adapted map.
//!
//! - **Envelope normalization** ([`envelope`]) — reshapes arbitrary
//!   server responses into the canonical `{data, meta}` form, including
//!   relocating loose top-level pagination fields.
//!
//! - **[`SmartRefresh`]** — identity-aware reconciliation across
//!   refreshes: semantically identical pages are suppressed, changed
//!   records are merged into the previous [`Record`] handles in place.
//!
//! - **[`Trigger`]** — replay-latest tick cells; a new tick restarts the
//!   fetch pipeline and cancels the superseded in-flight chain
//!   (switch-to-latest via cooperative `CancellationToken`s).

pub mod adapter;
pub mod envelope;
pub mod error;
pub mod model;
pub mod path;
pub mod refresh;
pub mod resource;
pub mod route;
pub mod trigger;

pub use adapter::{AdapterMap, FieldAdapter, Operation};
pub use error::CoreError;
pub use model::{Item, Meta, Page, Pagination, Record};
pub use path::FieldPath;
pub use refresh::SmartRefresh;
pub use resource::{InitOptions, Resource, ResourceBuilder, TransformFn};
pub use route::{Route, RouteHandle};
pub use trigger::Trigger;

// Transport types callers need to construct a resource.
pub use restive_api::{ApiClient, ApiConfig, ApiRequest, Hooks, Server, TransportConfig};
