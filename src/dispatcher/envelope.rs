use crate::validator::FieldErrors;
use serde::Serialize;
use serde_json::Value;

/// Error message used for validation failures.
pub const INVALID_REQUEST: &str = "Invalid Request";

/// Uniform JSON response body.
///
/// Serialises as `{"success":..,"data":..,"error":..,"fields":..}` in that
/// key order, omitting absent keys. The constructors are the only way to
/// build one, so a success never carries `error`/`fields` and a failure
/// never carries `data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

impl Envelope {
    /// Success carrying a value; `null` is kept as `"data":null`.
    #[must_use]
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            fields: None,
        }
    }

    /// Success without a value.
    #[must_use]
    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            fields: None,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            fields: None,
        }
    }

    /// Validation failure with per-field messages.
    #[must_use]
    pub fn invalid(fields: FieldErrors) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(INVALID_REQUEST.to_string()),
            fields: Some(fields),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn fields(&self) -> Option<&FieldErrors> {
        self.fields.as_ref()
    }
}
