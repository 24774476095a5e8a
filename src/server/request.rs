use crate::dispatcher::ServiceRequest;
use crate::ids::RequestId;
use http::Method;
use may_minihttp::Request;
use std::fmt;
use std::io::{self, Read};
use tracing::debug;

/// Header carrying a caller-supplied request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A raw request that cannot be turned into a [`ServiceRequest`].
#[derive(Debug)]
pub enum RequestError {
    /// The request line carries an invalid method token
    Method(String),
    /// The body could not be read from the connection
    Body(io::Error),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Method(method) => write!(f, "invalid method {method:?}"),
            RequestError::Body(e) => write!(f, "failed to read request body: {e}"),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::Body(e) => Some(e),
            RequestError::Method(_) => None,
        }
    }
}

/// Convert a `may_minihttp::Request` into a [`ServiceRequest`].
///
/// # Errors
///
/// See [`RequestError`].
pub fn parse_request(req: Request) -> Result<ServiceRequest, RequestError> {
    let method = Method::from_bytes(req.method().as_bytes())
        .map_err(|_| RequestError::Method(req.method().to_string()))?;
    let target = req.path().to_string();

    // R1: Request id from header or fresh
    let inbound_id = req
        .headers()
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(REQUEST_ID_HEADER))
        .map(|h| String::from_utf8_lossy(h.value).into_owned());
    let request_id = RequestId::from_header_or_new(inbound_id.as_deref());

    // R2: Body read
    let mut body = Vec::new();
    req.body().read_to_end(&mut body).map_err(RequestError::Body)?;

    let request = ServiceRequest::new(method, &target)
        .with_body(body)
        .with_request_id(request_id);

    debug!(
        request_id = %request.request_id,
        method = %request.method,
        path = %request.path,
        query_param_count = request.query_params.len(),
        body_size_bytes = request.body.len(),
        "HTTP request parsed"
    );
    Ok(request)
}
