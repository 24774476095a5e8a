//! # Descriptor Module
//!
//! Static metadata for exposed operations. Everything here is produced once,
//! while the [`Registry`](crate::registry::Registry) is being built, and is
//! read-only afterwards.
//!
//! - [`ParameterDescriptor`] describes one field of an operation's parameter
//!   structure: its name, the query key it binds from, its primitive kind and
//!   the ordered list of constraints the validator checks.
//! - [`MethodDescriptor`] describes one operation: its name, parameter type,
//!   [`BindingMode`] and [`ReturnArity`].
//! - [`Params`] is implemented by every type usable as an operation
//!   parameter. Structures implement it through `#[derive(Params)]`; the
//!   primitive implementations only exist so that an operation taking a bare
//!   scalar is rejected at build time with a descriptive error.

use crate::validator::Constraint;
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Primitive kind of a parameter field, used to coerce query-string values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimitiveKind {
    /// Signed or unsigned integer; the bounds are those of the declared type.
    Integer { min: i128, max: i128 },
    /// Finite float whose magnitude fits the declared type.
    Float { max: f64 },
    Boolean,
    String,
    /// Array, map or nested structure carried as a JSON value
    Json,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveKind::Integer { .. } => write!(f, "integer"),
            PrimitiveKind::Float { .. } => write!(f, "float"),
            PrimitiveKind::Boolean => write!(f, "boolean"),
            PrimitiveKind::String => write!(f, "string"),
            PrimitiveKind::Json => write!(f, "json"),
        }
    }
}

/// Field types that can be bound from the wire.
///
/// `Option<T>` maps to the kind of `T` and marks the field optional, which
/// lets a JSON `null` through body binding. Collections and
/// [`serde_json::Value`] are [`PrimitiveKind::Json`]; nested structures opt in
/// with `#[param(json)]`.
pub trait Primitive {
    const KIND: PrimitiveKind;
    const OPTIONAL: bool = false;
}

macro_rules! impl_integer_primitive {
    ($($t:ty),* $(,)?) => {
        $(
            impl Primitive for $t {
                const KIND: PrimitiveKind = PrimitiveKind::Integer {
                    min: <$t>::MIN as i128,
                    max: <$t>::MAX as i128,
                };
            }
        )*
    };
}

impl_integer_primitive!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Primitive for f32 {
    const KIND: PrimitiveKind = PrimitiveKind::Float {
        max: f32::MAX as f64,
    };
}

impl Primitive for f64 {
    const KIND: PrimitiveKind = PrimitiveKind::Float { max: f64::MAX };
}

impl Primitive for bool {
    const KIND: PrimitiveKind = PrimitiveKind::Boolean;
}

impl Primitive for String {
    const KIND: PrimitiveKind = PrimitiveKind::String;
}

impl<T> Primitive for Vec<T> {
    const KIND: PrimitiveKind = PrimitiveKind::Json;
}

impl<K, V> Primitive for BTreeMap<K, V> {
    const KIND: PrimitiveKind = PrimitiveKind::Json;
}

impl<K, V, H> Primitive for HashMap<K, V, H> {
    const KIND: PrimitiveKind = PrimitiveKind::Json;
}

impl Primitive for serde_json::Value {
    const KIND: PrimitiveKind = PrimitiveKind::Json;
}

impl<T: Primitive> Primitive for Option<T> {
    const KIND: PrimitiveKind = T::KIND;
    const OPTIONAL: bool = true;
}

/// Static metadata for one field of a parameter structure.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    /// Field name as it appears in the serialized structure
    pub field_name: &'static str,
    /// Query-string key; defaults to `field_name`
    pub wire_key: &'static str,
    pub kind: PrimitiveKind,
    /// `true` for `Option<T>` fields
    pub optional: bool,
    /// Declared constraints, evaluated in order by the validator
    pub constraints: Vec<Constraint>,
}

impl ParameterDescriptor {
    /// Describe a field of primitive type `T`.
    #[must_use]
    pub fn of<T: Primitive>(field_name: &'static str) -> Self {
        Self {
            field_name,
            wire_key: field_name,
            kind: T::KIND,
            optional: T::OPTIONAL,
            constraints: Vec::new(),
        }
    }

    /// Describe a field of any serde type, bound as a whole JSON value.
    #[must_use]
    pub fn json(field_name: &'static str) -> Self {
        Self {
            field_name,
            wire_key: field_name,
            kind: PrimitiveKind::Json,
            optional: false,
            constraints: Vec::new(),
        }
    }

    /// Override the query-string key this field binds from.
    #[must_use]
    pub fn wire_key(mut self, key: &'static str) -> Self {
        self.wire_key = key;
        self
    }

    /// Append a constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// Shape of a parameter type as seen by the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamShape {
    /// A structure with named fields
    Struct(Vec<ParameterDescriptor>),
    /// A bare primitive; never accepted as an operation parameter
    Scalar(PrimitiveKind),
}

/// Implemented by every type usable as an operation's parameter.
///
/// The zero value of the parameter is its [`Default`]; binding starts from it
/// and overlays whatever the request supplies.
pub trait Params: Default + Serialize + DeserializeOwned + Send + 'static {
    fn shape() -> ParamShape;
}

macro_rules! impl_scalar_params {
    ($($t:ty),* $(,)?) => {
        $(
            impl Params for $t {
                fn shape() -> ParamShape {
                    ParamShape::Scalar(<$t as Primitive>::KIND)
                }
            }
        )*
    };
}

impl_scalar_params!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, String);

/// Where an operation's parameter is populated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingMode {
    /// URL query string; read verb only
    Query,
    /// JSON request body; write verbs only
    Body,
}

impl BindingMode {
    /// Whether an HTTP method is compatible with this binding mode.
    #[must_use]
    pub fn accepts(&self, method: &Method) -> bool {
        match self {
            BindingMode::Query => *method == Method::GET,
            BindingMode::Body => {
                *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
            }
        }
    }

    /// `Allow` header line advertised on a 405.
    #[must_use]
    pub fn allow_header(&self) -> &'static str {
        match self {
            BindingMode::Query => "Allow: GET",
            BindingMode::Body => "Allow: POST, PUT, PATCH",
        }
    }
}

impl fmt::Display for BindingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingMode::Query => write!(f, "Query"),
            BindingMode::Body => write!(f, "Body"),
        }
    }
}

/// Return-value convention of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnArity {
    /// `Result<(), E>`
    ErrorOnly,
    /// `Result<T, E>`
    ValueAndError,
}

impl fmt::Display for ReturnArity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnArity::ErrorOnly => write!(f, "ErrorOnly"),
            ReturnArity::ValueAndError => write!(f, "ValueAndError"),
        }
    }
}

/// Static metadata for one exposed operation.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub name: String,
    /// Rust type name of the parameter structure
    pub parameter_type: &'static str,
    pub fields: Vec<ParameterDescriptor>,
    pub binding_mode: BindingMode,
    pub return_arity: ReturnArity,
}

impl MethodDescriptor {
    /// Look up a field descriptor by field name.
    #[must_use]
    pub fn field(&self, field_name: &str) -> Option<&ParameterDescriptor> {
        self.fields.iter().find(|f| f.field_name == field_name)
    }
}
