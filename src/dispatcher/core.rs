//! Dispatcher core - request/response types and the stage pipeline.

use super::envelope::Envelope;
use crate::ids::RequestId;
use crate::registry::{Invocation, InvokeError, RegisteredOperation, Registry};
use crate::validator::{RuleValidator, Validator};
use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Maximum inline response headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 4;

/// Query parameters in arrival order (stack-allocated for ≤8 params)
///
/// Keys are `Arc<str>` so that cloning a request does not copy them.
pub type ParamVec = SmallVec<[(Arc<str>, String); 8]>;

/// Full response header lines, e.g. `"Content-Type: application/json"`
pub type HeaderVec = SmallVec<[&'static str; MAX_INLINE_HEADERS]>;

const CONTENT_TYPE_JSON: &str = "Content-Type: application/json";

/// Body written when the envelope itself cannot be encoded.
const INTERNAL_ERROR_BODY: &[u8] = br#"{"success":false,"error":"Internal Server Error"}"#;

/// A request as seen by the dispatcher.
#[derive(Debug, Clone)]
pub struct ServiceRequest {
    /// Unique request ID for log correlation
    pub request_id: RequestId,
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// Decoded query string parameters
    pub query_params: ParamVec,
    /// Raw request body
    pub body: Vec<u8>,
}

impl ServiceRequest {
    /// Create a request from a method and a request target such as
    /// `/Get?ID=34`.
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        let query_params = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect();
        Self {
            request_id: RequestId::new(),
            method,
            path: path.to_string(),
            query_params,
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Get a query parameter by name
    ///
    /// If the key repeats (e.g. `?ID=1&ID=2`), the first occurrence wins.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Operation name addressed by this request: the last non-empty path
    /// segment.
    #[must_use]
    pub fn operation_name(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}

/// Response produced by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    /// HTTP status code (200, 400, 404, 405, 500)
    pub status: u16,
    pub headers: HeaderVec,
    /// Encoded JSON envelope
    pub body: Vec<u8>,
}

impl HandlerResponse {
    /// Encode an envelope as a JSON response.
    #[must_use]
    pub fn envelope(status: u16, envelope: &Envelope) -> Self {
        let mut headers = HeaderVec::new();
        headers.push(CONTENT_TYPE_JSON);
        match serde_json::to_vec(envelope) {
            Ok(body) => Self {
                status,
                headers,
                body,
            },
            Err(e) => {
                error!(error = %e, "Envelope encoding failed");
                Self::internal_error()
            }
        }
    }

    /// Generic 500 response.
    #[must_use]
    pub fn internal_error() -> Self {
        let mut headers = HeaderVec::new();
        headers.push(CONTENT_TYPE_JSON);
        Self {
            status: 500,
            headers,
            body: INTERNAL_ERROR_BODY.to_vec(),
        }
    }

    /// Get a header value by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&'static str> {
        self.headers.iter().copied().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    #[must_use]
    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or_default()
    }

    /// Body parsed as JSON; `None` if it is not valid JSON.
    #[must_use]
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Runs the stage pipeline for one service.
pub struct Dispatcher<S> {
    registry: Registry<S>,
    validator: Arc<dyn Validator>,
}

impl<S: Send + Sync + 'static> Dispatcher<S> {
    /// Create a dispatcher using the default [`RuleValidator`].
    #[must_use]
    pub fn new(registry: Registry<S>) -> Self {
        Self::with_validator(registry, Arc::new(RuleValidator::new()))
    }

    #[must_use]
    pub fn with_validator(registry: Registry<S>, validator: Arc<dyn Validator>) -> Self {
        Self {
            registry,
            validator,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry<S> {
        &self.registry
    }

    /// Run a request through the pipeline.
    ///
    /// Always returns a response; failures at any stage are converted into
    /// the matching status and envelope.
    pub fn dispatch(&self, request: &ServiceRequest) -> HandlerResponse {
        let start = Instant::now();
        let operation = request.operation_name();
        let response = self.run(request, operation);
        info!(
            request_id = %request.request_id,
            operation = %operation,
            method = %request.method,
            status = response.status,
            latency_us = start.elapsed().as_micros() as u64,
            "Request dispatched"
        );
        response
    }

    fn run(&self, request: &ServiceRequest, operation: &str) -> HandlerResponse {
        let request_id = request.request_id;

        // D1: Route lookup
        let Some(entry) = self.registry.get(operation) else {
            warn!(
                request_id = %request_id,
                operation = %operation,
                available = ?self.registry.operation_names(),
                "Unknown operation"
            );
            return HandlerResponse::envelope(
                404,
                &Envelope::failure(format!("Unknown operation {operation}")),
            );
        };
        let descriptor = &entry.descriptor;

        // D2: Verb check
        let mode = descriptor.binding_mode;
        if !mode.accepts(&request.method) {
            warn!(
                request_id = %request_id,
                operation = %operation,
                method = %request.method,
                binding_mode = %mode,
                "Method not allowed for operation"
            );
            let mut response =
                HandlerResponse::envelope(405, &Envelope::failure("Method Not Allowed"));
            response.headers.push(mode.allow_header());
            return response;
        }

        // D3-D6 run under one unwind guard; any panic becomes a 500.
        let outcome = catch_unwind(AssertUnwindSafe(|| self.handle(entry, request)));
        outcome.unwrap_or_else(|panic| {
            let panic_message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(
                request_id = %request_id,
                operation = %operation,
                panic_message = %panic_message,
                "Request handling panicked - CRITICAL"
            );
            HandlerResponse::internal_error()
        })
    }

    fn handle(&self, entry: &RegisteredOperation<S>, request: &ServiceRequest) -> HandlerResponse {
        let request_id = request.request_id;
        let descriptor = &entry.descriptor;
        let operation = descriptor.name.as_str();

        // D3: Bind
        let parameter = match entry.bind(request) {
            Ok(parameter) => parameter,
            Err(e) => {
                debug!(
                    request_id = %request_id,
                    operation = %operation,
                    error = %e,
                    "Parameter binding failed"
                );
                return HandlerResponse::envelope(400, &Envelope::failure(e.to_string()));
            }
        };

        // D4: Validate
        if let Err(fields) = self.validator.validate(parameter.view(), &descriptor.fields) {
            debug!(
                request_id = %request_id,
                operation = %operation,
                invalid_fields = ?fields.keys().collect::<Vec<_>>(),
                "Validation failed"
            );
            return HandlerResponse::envelope(400, &Envelope::invalid(fields));
        }

        // D5: Invoke
        let outcome = entry.invoke(self.registry.service(), parameter);

        // D6: Encode
        match outcome {
            Ok(Invocation::Done) => HandlerResponse::envelope(200, &Envelope::done()),
            Ok(Invocation::Value(data)) => HandlerResponse::envelope(200, &Envelope::ok(data)),
            Err(InvokeError::Business(message)) => {
                debug!(
                    request_id = %request_id,
                    operation = %operation,
                    error = %message,
                    "Operation returned an error"
                );
                HandlerResponse::envelope(400, &Envelope::failure(message))
            }
            Err(e) => {
                error!(
                    request_id = %request_id,
                    operation = %operation,
                    error = %e,
                    "Operation result could not be delivered"
                );
                HandlerResponse::internal_error()
            }
        }
    }
}
