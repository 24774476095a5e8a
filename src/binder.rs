//! # Binder Module
//!
//! Materialises an operation's parameter value from an incoming request.
//!
//! Binding always starts from the parameter type's zero value ([`Default`]).
//! The [`BindingMode`] recorded on the operation's [`MethodDescriptor`]
//! selects where field values come from:
//!
//! - **Query**: each field reads the first occurrence of its wire key from the
//!   query string and coerces it to the field's [`PrimitiveKind`]. Absent or
//!   empty values leave the zero value in place. A value that cannot be
//!   coerced, or does not fit the declared type, is a [`BindError`].
//!   [`PrimitiveKind::Json`] fields take their value as inline JSON.
//! - **Body**: the request body is decoded as a JSON object and merged into
//!   the zero value. Keys match field names exactly, then case-insensitively.
//!   Malformed bodies and fields the parameter type rejects are ignored, so
//!   the validator sees zero values instead of a decode failure.

use crate::descriptor::{BindingMode, MethodDescriptor, ParameterDescriptor, Params, PrimitiveKind};
use crate::dispatcher::ServiceRequest;
use serde_json::{Map, Number, Value};
use std::any::Any;
use std::fmt;
use tracing::debug;

/// Error raised while binding a query-string parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum BindError {
    /// A query value could not be coerced to the field's kind
    Coercion {
        field: String,
        kind: PrimitiveKind,
        value: String,
    },
    /// The coerced values could not be assembled into the parameter type
    Decode { message: String },
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::Coercion { field, kind, value } => {
                write!(f, "{field}: cannot parse {value:?} as {kind}")
            }
            BindError::Decode { message } => write!(f, "invalid parameters: {message}"),
        }
    }
}

impl std::error::Error for BindError {}

/// A bound parameter with its concrete type erased.
///
/// Carries the JSON view the validator inspects alongside the typed value the
/// operation is invoked with.
pub struct ParameterValue {
    value: Box<dyn Any + Send>,
    view: Value,
}

impl ParameterValue {
    /// Wrap a bound parameter.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::Decode`] if the value cannot be rendered as JSON.
    pub fn new<P: Params>(value: P) -> Result<Self, BindError> {
        let view = serde_json::to_value(&value).map_err(|e| BindError::Decode {
            message: e.to_string(),
        })?;
        Ok(Self {
            value: Box::new(value),
            view,
        })
    }

    /// JSON rendering of the bound value.
    #[must_use]
    pub fn view(&self) -> &Value {
        &self.view
    }

    /// Recover the typed value; `None` if `P` is not the bound type.
    #[must_use]
    pub fn into_inner<P: 'static>(self) -> Option<P> {
        self.value.downcast::<P>().ok().map(|boxed| *boxed)
    }
}

impl fmt::Debug for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterValue")
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

/// Populate a fresh `P` from `request` according to the descriptor's mode.
///
/// # Errors
///
/// Only query binding fails; see [`BindError`].
pub fn bind<P: Params>(descriptor: &MethodDescriptor, request: &ServiceRequest) -> Result<P, BindError> {
    let mut fields = match serde_json::to_value(P::default()) {
        Ok(Value::Object(map)) => map,
        _ => return Ok(P::default()),
    };

    match descriptor.binding_mode {
        BindingMode::Query => {
            overlay_query(&mut fields, &descriptor.fields, request)?;
            serde_json::from_value(Value::Object(fields)).map_err(|e| BindError::Decode {
                message: e.to_string(),
            })
        }
        BindingMode::Body => {
            if let Some(object) = body_object(&request.body) {
                overlay_body::<P>(&mut fields, descriptor, &object);
            }
            Ok(serde_json::from_value(Value::Object(fields)).unwrap_or_else(|e| {
                debug!(
                    request_id = %request.request_id,
                    operation = %descriptor.name,
                    error = %e,
                    "Body decode failed, using zero value"
                );
                P::default()
            }))
        }
    }
}

fn overlay_query(
    target: &mut Map<String, Value>,
    fields: &[ParameterDescriptor],
    request: &ServiceRequest,
) -> Result<(), BindError> {
    for field in fields {
        let raw = match request.get_query_param(field.wire_key) {
            Some(raw) if !raw.is_empty() => raw,
            _ => continue,
        };
        let value = coerce(raw, field.kind).ok_or_else(|| BindError::Coercion {
            field: field.field_name.to_string(),
            kind: field.kind,
            value: raw.to_string(),
        })?;
        target.insert(field.field_name.to_string(), value);
    }
    Ok(())
}

fn body_object(body: &[u8]) -> Option<Map<String, Value>> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(object)) => Some(object),
        Ok(other) => {
            debug!(body_type = json_type(&other), "Ignoring non-object request body");
            None
        }
        Err(e) => {
            debug!(error = %e, "Ignoring malformed request body");
            None
        }
    }
}

fn overlay_body<P: Params>(
    target: &mut Map<String, Value>,
    descriptor: &MethodDescriptor,
    object: &Map<String, Value>,
) {
    let mut keys: Vec<String> = target.keys().cloned().collect();
    for field in &descriptor.fields {
        if !target.contains_key(field.field_name) {
            keys.push(field.field_name.to_string());
        }
    }

    let mut structured = Vec::new();
    for key in keys {
        let Some(value) = lookup(object, &key) else {
            continue;
        };
        match descriptor.field(&key) {
            Some(field) if field.kind != PrimitiveKind::Json => {
                if fits(value, field) {
                    target.insert(key, value.clone());
                } else {
                    debug!(
                        field = field.field_name,
                        expected = %field.kind,
                        found = json_type(value),
                        "Ignoring type-mismatched body field"
                    );
                }
            }
            _ => structured.push((key, value.clone())),
        }
    }

    // Structured values are only kept if the parameter type accepts them.
    for (key, value) in structured {
        let previous = target.insert(key.clone(), value);
        if let Err(e) = serde_json::from_value::<P>(Value::Object(target.clone())) {
            debug!(field = %key, error = %e, "Ignoring body field the parameter type rejects");
            match previous {
                Some(previous) => target.insert(key, previous),
                None => target.remove(&key),
            };
        }
    }
}

/// Exact key first, then a case-insensitive match.
fn lookup<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    })
}

/// Coerce a query-string value to a JSON value of the given kind.
fn coerce(raw: &str, kind: PrimitiveKind) -> Option<Value> {
    match kind {
        PrimitiveKind::Integer { min, max } => {
            let n = raw.parse::<i128>().ok().filter(|n| *n >= min && *n <= max)?;
            integer_value(n)
        }
        PrimitiveKind::Float { max } => raw
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.abs() <= max)
            .and_then(Number::from_f64)
            .map(Value::Number),
        PrimitiveKind::Boolean => parse_bool(raw).map(Value::Bool),
        PrimitiveKind::String => Some(Value::String(raw.to_string())),
        PrimitiveKind::Json => serde_json::from_str(raw).ok(),
    }
}

fn integer_value(n: i128) -> Option<Value> {
    if n < 0 {
        i64::try_from(n).ok().map(Value::from)
    } else {
        u64::try_from(n).ok().map(Value::from)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Whether a body value can be stored in the field without a decode error.
fn fits(value: &Value, field: &ParameterDescriptor) -> bool {
    match (value, field.kind) {
        (Value::Null, _) => field.optional,
        (Value::Number(n), PrimitiveKind::Integer { min, max }) => {
            let n = n
                .as_i64()
                .map(i128::from)
                .or_else(|| n.as_u64().map(i128::from));
            n.is_some_and(|n| n >= min && n <= max)
        }
        (Value::Number(n), PrimitiveKind::Float { max }) => n
            .as_f64()
            .is_some_and(|f| f.is_finite() && f.abs() <= max),
        (Value::Bool(_), PrimitiveKind::Boolean) => true,
        (Value::String(_), PrimitiveKind::String) => true,
        _ => false,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
