//! # Validator Module
//!
//! Structural validation of bound parameter values.
//!
//! The dispatcher only knows the [`Validator`] trait: it hands over the bound
//! parameter (rendered as JSON) together with the operation's field
//! descriptors and gets back either `Ok(())` or a map of field name to
//! message. [`RuleValidator`] is the default implementation and evaluates the
//! [`Constraint`] list attached to each field.
//!
//! ## Rule semantics
//!
//! - A field holding its zero value (`""`, `0`, `false`, `null`, empty
//!   collection) fails with `non zero value required` when it declares
//!   [`Constraint::Required`], and is skipped otherwise.
//! - Any other value is checked against the remaining constraints in
//!   declaration order; the first failure wins and is reported as
//!   `"<value> does not validate as <rule>"`.

use crate::descriptor::ParameterDescriptor;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Field name → violation message, sorted by field name.
pub type FieldErrors = BTreeMap<String, String>;

/// Message used for a missing required value.
pub const REQUIRED_MESSAGE: &str = "non zero value required";

#[allow(clippy::expect_used)]
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern is valid")
});

/// A declarative rule attached to a parameter field.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Value must not be the zero value
    Required,
    /// Value must be an e-mail address
    Email,
    /// Value must consist of ASCII letters and digits only
    Alphanumeric,
    /// Value must be ASCII
    Ascii,
    /// Character count must lie within `min..=max`
    Length { min: usize, max: usize },
    /// Numeric value must lie within `min..=max`
    Range { min: f64, max: f64 },
}

impl Constraint {
    /// Whether `value` (known to be non-zero) satisfies this rule.
    fn check(&self, value: &Value) -> bool {
        match self {
            Constraint::Required => true,
            Constraint::Email => value.as_str().is_some_and(|s| EMAIL.is_match(s)),
            Constraint::Alphanumeric => {
                let text = render(value);
                !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric())
            }
            Constraint::Ascii => render(value).is_ascii(),
            Constraint::Length { min, max } => {
                let len = render(value).chars().count();
                len >= *min && len <= *max
            }
            Constraint::Range { min, max } => {
                let number = match value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.parse::<f64>().ok(),
                    _ => None,
                };
                number.is_some_and(|n| n >= *min && n <= *max)
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Required => write!(f, "required"),
            Constraint::Email => write!(f, "email"),
            Constraint::Alphanumeric => write!(f, "alphanum"),
            Constraint::Ascii => write!(f, "ascii"),
            Constraint::Length { min, max } => write!(f, "length({min}|{max})"),
            Constraint::Range { min, max } => write!(f, "range({min}|{max})"),
        }
    }
}

/// Checks a bound parameter value against its declared constraints.
pub trait Validator: Send + Sync {
    /// # Errors
    ///
    /// Returns the per-field violations when the value is invalid.
    fn validate(&self, value: &Value, fields: &[ParameterDescriptor]) -> Result<(), FieldErrors>;
}

/// Default [`Validator`] evaluating each field's [`Constraint`] list.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleValidator;

impl RuleValidator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn check_field(value: &Value, field: &ParameterDescriptor) -> Option<String> {
        if is_zero(value) {
            return field
                .constraints
                .contains(&Constraint::Required)
                .then(|| REQUIRED_MESSAGE.to_string());
        }
        field
            .constraints
            .iter()
            .find(|c| !c.check(value))
            .map(|c| format!("{} does not validate as {}", render(value), c))
    }
}

impl Validator for RuleValidator {
    fn validate(&self, value: &Value, fields: &[ParameterDescriptor]) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        for field in fields {
            let field_value = value.get(field.field_name).unwrap_or(&Value::Null);
            if let Some(message) = Self::check_field(field_value, field) {
                errors.insert(field.field_name.to_string(), message);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Text form of a value as it appears in messages.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
