//! # Server Module
//!
//! Thin adapter between `may_minihttp` and the transport-neutral
//! [`Dispatcher`](crate::dispatcher::Dispatcher).
//!
//! [`AppService`] turns each raw request into a
//! [`ServiceRequest`](crate::dispatcher::ServiceRequest), dispatches it and
//! writes the resulting status, headers and body. [`HttpServer`] starts a
//! listener for it; nothing in the crate starts one implicitly.

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_request, RequestError};
pub use response::write_handler_response;
pub use service::AppService;
