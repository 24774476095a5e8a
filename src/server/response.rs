use crate::dispatcher::HandlerResponse;
use http::StatusCode;
use may_minihttp::Response;

/// Canonical reason phrase for a status code.
pub(crate) fn status_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown")
}

/// Write a dispatcher response onto the wire.
pub fn write_handler_response(res: &mut Response, response: HandlerResponse) {
    res.status_code(usize::from(response.status), status_reason(response.status));
    for header in response.headers {
        res.header(header);
    }
    res.body_vec(response.body);
}
