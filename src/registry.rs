//! # Registry Module
//!
//! Build-time introspection of a service's operation set.
//!
//! A service lists its operations once through [`Service::operations`]. Each
//! entry pairs an operation name with a method of the service and the
//! [`BindingMode`] it is served with:
//!
//! ```rust,ignore
//! impl Service for UserService {
//!     fn operations(ops: &mut Operations<Self>) {
//!         ops.body("Create", UserService::create)
//!             .query("Get", UserService::get)
//!             .query("Recent", UserService::recent);
//!     }
//! }
//! ```
//!
//! [`Registry::build`] checks every entry against the method shape contract:
//! exactly one parameter beyond the receiver, that parameter a structure with
//! named fields, and a `Result<(), E>` or `Result<T, E>` return. The first
//! violation aborts construction with a [`ConstructionError`] naming the
//! operation. A built registry is immutable and shared without locks.

use crate::binder::{self, BindError, ParameterValue};
use crate::descriptor::{BindingMode, MethodDescriptor, ParamShape, Params, ReturnArity};
use crate::dispatcher::ServiceRequest;
use serde::Serialize;
use serde_json::Value;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info};

/// An application object whose operations are exposed over HTTP.
///
/// The core never synchronises access to the service; implementations guard
/// their own mutable state.
pub trait Service: Send + Sync + Sized + 'static {
    /// Declare the exposed operations.
    fn operations(ops: &mut Operations<Self>);
}

/// Why an operation does not satisfy the method shape contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeViolation {
    /// The operation takes `found` parameters instead of one
    ParameterCount { found: usize },
    /// The single parameter is not a structure with named fields
    NotAStructure { parameter_type: &'static str },
    /// The operation does not return a `Result`
    ReturnShape,
}

impl fmt::Display for ShapeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeViolation::ParameterCount { .. } | ShapeViolation::NotAStructure { .. } => {
                write!(f, "operation must take exactly one structure parameter")
            }
            ShapeViolation::ReturnShape => {
                write!(f, "operation must return (value,error) or (error)")
            }
        }
    }
}

/// Error returned when a registry cannot be built from a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    InvalidOperation {
        operation: String,
        violation: ShapeViolation,
    },
    DuplicateOperation {
        operation: String,
    },
    EmptyName,
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructionError::InvalidOperation {
                operation,
                violation,
            } => write!(f, "operation {operation}: {violation}"),
            ConstructionError::DuplicateOperation { operation } => {
                write!(f, "operation {operation}: registered more than once")
            }
            ConstructionError::EmptyName => write!(f, "operation name must not be empty"),
        }
    }
}

impl std::error::Error for ConstructionError {}

/// Outcome of a successful invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// `Ok(())` from an error-only operation
    Done,
    /// `Ok(value)` rendered as JSON
    Value(Value),
}

/// Failure while invoking an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// The operation returned `Err`; carries its message
    Business(String),
    /// The returned value cannot be represented as JSON
    Encoding(String),
    /// The invocation could not be carried out
    Internal(String),
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeError::Business(message) => write!(f, "{message}"),
            InvokeError::Encoding(message) => write!(f, "result encoding failed: {message}"),
            InvokeError::Internal(message) => write!(f, "invocation failed: {message}"),
        }
    }
}

impl std::error::Error for InvokeError {}

/// Return types accepted from an operation.
///
/// `Result<(), E>` is error-only, any other `Result<T, E>` carries a value.
/// `()` is accepted by the type system so that such operations surface as a
/// [`ShapeViolation::ReturnShape`] at build time.
pub trait Returns: 'static {
    /// # Errors
    ///
    /// [`ShapeViolation::ReturnShape`] when the type is not a `Result`.
    fn arity() -> Result<ReturnArity, ShapeViolation>;

    /// # Errors
    ///
    /// See [`InvokeError`].
    fn into_invocation(self) -> Result<Invocation, InvokeError>;
}

impl<T, E> Returns for Result<T, E>
where
    T: Serialize + 'static,
    E: fmt::Display + 'static,
{
    fn arity() -> Result<ReturnArity, ShapeViolation> {
        if TypeId::of::<T>() == TypeId::of::<()>() {
            Ok(ReturnArity::ErrorOnly)
        } else {
            Ok(ReturnArity::ValueAndError)
        }
    }

    fn into_invocation(self) -> Result<Invocation, InvokeError> {
        match self {
            Ok(_) if TypeId::of::<T>() == TypeId::of::<()>() => Ok(Invocation::Done),
            Ok(value) => serde_json::to_value(&value)
                .map(Invocation::Value)
                .map_err(|e| InvokeError::Encoding(e.to_string())),
            Err(e) => Err(InvokeError::Business(e.to_string())),
        }
    }
}

impl Returns for () {
    fn arity() -> Result<ReturnArity, ShapeViolation> {
        Err(ShapeViolation::ReturnShape)
    }

    fn into_invocation(self) -> Result<Invocation, InvokeError> {
        Err(InvokeError::Internal("operation has no result".to_string()))
    }
}

/// Type-erased operation entry.
pub trait Operation<S>: Send + Sync {
    /// Bind the operation's parameter from a request.
    ///
    /// # Errors
    ///
    /// See [`BindError`].
    fn bind(
        &self,
        descriptor: &MethodDescriptor,
        request: &ServiceRequest,
    ) -> Result<ParameterValue, BindError>;

    /// Call the operation with a previously bound parameter.
    ///
    /// # Errors
    ///
    /// See [`InvokeError`].
    fn invoke(&self, service: &S, parameter: ParameterValue) -> Result<Invocation, InvokeError>;
}

struct TypedOperation<F, P, R> {
    handler: F,
    _marker: PhantomData<fn(P) -> R>,
}

impl<S, F, P, R> Operation<S> for TypedOperation<F, P, R>
where
    F: Fn(&S, P) -> R + Send + Sync + 'static,
    P: Params,
    R: Returns,
{
    fn bind(
        &self,
        descriptor: &MethodDescriptor,
        request: &ServiceRequest,
    ) -> Result<ParameterValue, BindError> {
        let value = binder::bind::<P>(descriptor, request)?;
        ParameterValue::new(value)
    }

    fn invoke(&self, service: &S, parameter: ParameterValue) -> Result<Invocation, InvokeError> {
        let parameter = parameter
            .into_inner::<P>()
            .ok_or_else(|| InvokeError::Internal(format!("parameter is not a {}", type_name::<P>())))?;
        (self.handler)(service, parameter).into_invocation()
    }
}

type Entry<S> = (MethodDescriptor, Box<dyn Operation<S>>);

/// Conversion of a service method into a registry entry.
///
/// `Args` is the tuple of parameter types beyond the receiver. Only the
/// one-parameter form yields an entry; the others exist so that a mis-shaped
/// method is reported when the registry is built.
pub trait IntoOperation<S, Args>: Sized {
    /// # Errors
    ///
    /// The [`ShapeViolation`] the method exhibits.
    fn into_operation(self, name: &str, mode: BindingMode) -> Result<Entry<S>, ShapeViolation>;
}

impl<S, F, R> IntoOperation<S, ()> for F
where
    F: Fn(&S) -> R,
{
    fn into_operation(self, _name: &str, _mode: BindingMode) -> Result<Entry<S>, ShapeViolation> {
        Err(ShapeViolation::ParameterCount { found: 0 })
    }
}

impl<S, F, P, R> IntoOperation<S, (P,)> for F
where
    S: 'static,
    F: Fn(&S, P) -> R + Send + Sync + 'static,
    P: Params,
    R: Returns,
{
    fn into_operation(self, name: &str, mode: BindingMode) -> Result<Entry<S>, ShapeViolation> {
        let fields = match P::shape() {
            ParamShape::Struct(fields) => fields,
            ParamShape::Scalar(_) => {
                return Err(ShapeViolation::NotAStructure {
                    parameter_type: type_name::<P>(),
                })
            }
        };
        let descriptor = MethodDescriptor {
            name: name.to_string(),
            parameter_type: type_name::<P>(),
            fields,
            binding_mode: mode,
            return_arity: R::arity()?,
        };
        let operation = TypedOperation {
            handler: self,
            _marker: PhantomData,
        };
        Ok((descriptor, Box::new(operation)))
    }
}

impl<S, F, P1, P2, R> IntoOperation<S, (P1, P2)> for F
where
    F: Fn(&S, P1, P2) -> R,
{
    fn into_operation(self, _name: &str, _mode: BindingMode) -> Result<Entry<S>, ShapeViolation> {
        Err(ShapeViolation::ParameterCount { found: 2 })
    }
}

impl<S, F, P1, P2, P3, R> IntoOperation<S, (P1, P2, P3)> for F
where
    F: Fn(&S, P1, P2, P3) -> R,
{
    fn into_operation(self, _name: &str, _mode: BindingMode) -> Result<Entry<S>, ShapeViolation> {
        Err(ShapeViolation::ParameterCount { found: 3 })
    }
}

struct PendingOperation<S> {
    name: String,
    entry: Result<Entry<S>, ShapeViolation>,
}

/// Collects a service's operation declarations.
pub struct Operations<S> {
    pending: Vec<PendingOperation<S>>,
}

impl<S: 'static> Operations<S> {
    fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Declare an operation bound from the query string (`GET`).
    pub fn query<H, Args>(&mut self, name: &str, handler: H) -> &mut Self
    where
        H: IntoOperation<S, Args>,
    {
        self.register(name, BindingMode::Query, handler)
    }

    /// Declare an operation bound from a JSON body (`POST`, `PUT`, `PATCH`).
    pub fn body<H, Args>(&mut self, name: &str, handler: H) -> &mut Self
    where
        H: IntoOperation<S, Args>,
    {
        self.register(name, BindingMode::Body, handler)
    }

    /// Declare an operation with an explicit binding mode.
    pub fn register<H, Args>(&mut self, name: &str, mode: BindingMode, handler: H) -> &mut Self
    where
        H: IntoOperation<S, Args>,
    {
        self.pending.push(PendingOperation {
            name: name.to_string(),
            entry: handler.into_operation(name, mode),
        });
        self
    }
}

/// A validated operation: its descriptor and typed handler entry.
pub struct RegisteredOperation<S> {
    pub descriptor: MethodDescriptor,
    handler: Box<dyn Operation<S>>,
}

impl<S> RegisteredOperation<S> {
    /// # Errors
    ///
    /// See [`BindError`].
    pub fn bind(&self, request: &ServiceRequest) -> Result<ParameterValue, BindError> {
        self.handler.bind(&self.descriptor, request)
    }

    /// # Errors
    ///
    /// See [`InvokeError`].
    pub fn invoke(&self, service: &S, parameter: ParameterValue) -> Result<Invocation, InvokeError> {
        self.handler.invoke(service, parameter)
    }
}

/// Immutable routing table built from a [`Service`].
pub struct Registry<S> {
    service: Arc<S>,
    operations: HashMap<String, RegisteredOperation<S>>,
}

impl<S: Service> Registry<S> {
    /// Build the registry for `service`.
    ///
    /// # Errors
    ///
    /// The first [`ConstructionError`] found; nothing is partially built.
    pub fn build(service: S) -> Result<Self, ConstructionError> {
        Self::build_shared(Arc::new(service))
    }

    /// Build the registry for a service that is already shared.
    ///
    /// # Errors
    ///
    /// See [`Registry::build`].
    pub fn build_shared(service: Arc<S>) -> Result<Self, ConstructionError> {
        let mut declared = Operations::new();
        S::operations(&mut declared);
        debug!(
            service = type_name::<S>(),
            declared = declared.pending.len(),
            "Building operation registry"
        );

        let mut operations = HashMap::with_capacity(declared.pending.len());
        for PendingOperation { name, entry } in declared.pending {
            if name.is_empty() {
                return Err(ConstructionError::EmptyName);
            }
            let (descriptor, handler) = entry.map_err(|violation| {
                ConstructionError::InvalidOperation {
                    operation: name.clone(),
                    violation,
                }
            })?;
            if operations.contains_key(&name) {
                return Err(ConstructionError::DuplicateOperation { operation: name });
            }
            info!(
                operation = %name,
                parameter_type = descriptor.parameter_type,
                binding_mode = %descriptor.binding_mode,
                return_arity = %descriptor.return_arity,
                fields = descriptor.fields.len(),
                "Operation registered"
            );
            operations.insert(name, RegisteredOperation { descriptor, handler });
        }

        info!(
            service = type_name::<S>(),
            operation_count = operations.len(),
            "Registry built"
        );
        Ok(Self {
            service,
            operations,
        })
    }
}

impl<S> Registry<S> {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredOperation<S>> {
        self.operations.get(name)
    }

    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&MethodDescriptor> {
        self.operations.get(name).map(|op| &op.descriptor)
    }

    /// Registered operation names in sorted order.
    #[must_use]
    pub fn operation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }
}
