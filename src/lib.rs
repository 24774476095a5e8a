//! # servicehandler
//!
//! **servicehandler** exposes the operations of a plain Rust service as
//! HTTP/JSON endpoints without hand-written route wiring.
//!
//! ## Overview
//!
//! A service declares its operations once. At startup the crate builds an
//! immutable routing table from that declaration and rejects operations that
//! do not fit the expected shape. Each request is then bound into the
//! operation's parameter structure, validated, dispatched and answered with a
//! uniform JSON envelope:
//!
//! ```json
//! {"success": true, "data": 1}
//! {"success": false, "error": "Invalid Request", "fields": {"Email": "a@b does not validate as email"}}
//! ```
//!
//! ## Architecture
//!
//! - **[`descriptor`]** - Static operation and parameter metadata
//! - **[`registry`]** - The [`Service`] trait and build-time shape checks
//! - **[`binder`]** - Query-string and JSON-body parameter binding
//! - **[`validator`]** - Declarative field constraints
//! - **[`dispatcher`]** - The per-request stage pipeline
//! - **[`server`]** - `may_minihttp` adapter and listener
//! - **[`logging`]** / **[`runtime_config`]** - Environment-driven setup
//!
//! ## Example
//!
//! ```rust,ignore
//! use servicehandler::{Operations, Params, Service};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default, Serialize, Deserialize, Params)]
//! struct GetParams {
//!     #[serde(rename = "ID")]
//!     #[validate(required)]
//!     id: i32,
//! }
//!
//! struct Users;
//!
//! impl Users {
//!     fn get(&self, p: GetParams) -> Result<String, String> {
//!         Ok(format!("user {}", p.id))
//!     }
//! }
//!
//! impl Service for Users {
//!     fn operations(ops: &mut Operations<Self>) {
//!         ops.query("Get", Users::get);
//!     }
//! }
//!
//! let app = servicehandler::wrap(Users)?;
//! let handle = servicehandler::server::HttpServer(app).start("0.0.0.0:8080")?;
//! handle.join().ok();
//! ```
//!
//! `GET /Get?ID=34` answers `{"success":true,"data":"user 34"}`.
//!
//! ## Status Codes
//!
//! | Status | Meaning |
//! |--------|---------|
//! | 200 | Operation succeeded |
//! | 400 | Binding, validation or business error |
//! | 404 | Unknown operation |
//! | 405 | Verb does not match the operation's binding mode |
//! | 500 | Result could not be encoded, or request handling panicked |

extern crate self as servicehandler;

pub mod binder;
pub mod descriptor;
pub mod dispatcher;
pub mod ids;
pub mod logging;
pub mod registry;
pub mod runtime_config;
pub mod server;
pub mod validator;

pub use descriptor::{
    BindingMode, MethodDescriptor, ParamShape, ParameterDescriptor, Params, Primitive,
    PrimitiveKind, ReturnArity,
};
pub use dispatcher::{Dispatcher, Envelope, HandlerResponse, ServiceRequest};
pub use registry::{ConstructionError, Operations, Registry, Service, ShapeViolation};
pub use server::{AppService, HttpServer, ServerHandle};
pub use validator::{Constraint, FieldErrors, RuleValidator, Validator};

/// Derive [`Params`] for a struct with named fields.
///
/// Field attributes:
///
/// - `#[param(query = "key")]` binds the field from query key `key`
/// - `#[validate(required, email, alphanum, ascii, length(min = 1, max = 32), range(min = 1, max = 100))]`
///   declares constraints, evaluated in the order written
/// - `#[serde(rename = "Name")]` sets the field name used in bodies and
///   validation messages
pub use servicehandler_macros::Params;

/// Build the registry for `service` and wrap it in a ready-to-serve
/// [`AppService`] using the default validator.
///
/// # Errors
///
/// The [`ConstructionError`] describing the first mis-shaped operation.
pub fn wrap<S: Service>(service: S) -> Result<AppService<S>, ConstructionError> {
    let registry = Registry::build(service)?;
    Ok(AppService::new(Dispatcher::new(registry)))
}
