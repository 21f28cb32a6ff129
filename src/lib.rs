//! # dyntool-core
//!
//! **dyntool-core** turns "a base URL and a credential" into a resource-scoped,
//! permission-filtered, executable action catalog plus a request executor
//! that can run any action in it. It combines heuristic multi-strategy
//! network discovery, tolerant parsing of a large and sometimes-malformed
//! OpenAPI-family spec format, cross-operation indexing for fuzzy action
//! lookup, scope-based filtering driven by live credential introspection, and
//! per-request authentication synthesis from heterogeneous credential shapes.
//!
//! ## Architecture
//!
//! The library is organized into twelve collaborating components, each
//! owning one concern end to end:
//!
//! - **[`url_validate`]** — SSRF/scheme/host policy gating every outbound URL
//! - **[`format`]** — sniffs and converts Swagger 2.0/Postman/custom JSON into OpenAPI 3
//! - **[`sanitize`]** — byte- and model-level repair of malformed spec documents
//! - **[`spec`]** — strict OpenAPI 3 parsing, `Operation` extraction, TTL spec cache
//! - **[`discovery`]** — the strategy ladder that locates a spec from a base URL
//! - **[`learning`]** — remembers which discovery path worked for a domain
//! - **[`index`]** — cross-cutting lookup indices and fuzzy action-id resolution
//! - **[`scope`]** — derives and applies a tool's resource-type projection
//! - **[`permissions`]** — probes a live API for what a credential can actually do
//! - **[`auth`]** — synthesizes outbound authentication from a tagged credential
//! - **[`executor`]** — binds parameters into a request, retries, classifies the response
//! - **[`webhook`]** — extracts a spec's webhook contract, if any
//! - **[`binding`]** — `ToolBinding`, the single handle wiring all of the above together
//!
//! ## Quick Start
//!
//! ```no_run
//! use dyntool_core::{Credential, ToolBinding};
//!
//! # async fn run() -> dyntool_core::CoreResult<()> {
//! let binding = ToolBinding::new("github_issues", "https://api.github.com", Credential::Token("ghp_...".into()));
//! binding.discover().await?;
//! let catalog = binding.list_actions().await?;
//! println!("{} actions available", catalog.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Runtime considerations
//!
//! This crate is built on `tokio` and `reqwest`; library code never installs
//! a global `tracing` subscriber — it only emits events — so hosts compose it
//! into whatever subscriber they already run. See [`config::CoreConfig`] for
//! every environment-driven tunable, and [`store`] for the three collaborator
//! traits (spec cache, pattern store, encryption) a host can inject in place
//! of the in-memory defaults.

pub mod auth;
pub mod binding;
pub mod config;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod format;
pub mod http_client;
pub mod ids;
pub mod index;
pub mod learning;
pub mod permissions;
pub mod sanitize;
pub mod scope;
pub mod spec;
pub mod store;
pub mod url_validate;
pub mod webhook;

pub use auth::Credential;
pub use binding::{ActionCatalog, ActionCatalogEntry, ToolBinding};
pub use config::{CoreConfig, PassthroughMode};
pub use discovery::{DiscoveryHints, DiscoveryResult, DiscoveryStatus, MultiDiscoveryResult};
pub use error::{CoreError, CoreResult};
pub use executor::{ActionParams, ExecutionOutcome};
pub use ids::{ExecutionId, ToolId};
pub use index::{NotFound, OperationIndex, Resolved};
pub use learning::DiscoveryPattern;
pub use permissions::PermissionSnapshot;
pub use scope::ResourceScope;
pub use spec::{Operation, ParameterLocation, ParameterMeta, SecurityRequirement, SecurityScheme, SpecDescriptor};
pub use url_validate::UrlPolicy;
pub use webhook::WebhookConfig;
