//! Integration tests for registry construction
//!
//! Covers the method shape contract (parameter count, structure parameter,
//! result shape), name uniqueness, and the descriptors recorded for a
//! well-formed service.

use serde::{Deserialize, Serialize};
use servicehandler::{
    BindingMode, Constraint, ConstructionError, Operations, Params, PrimitiveKind, Registry,
    ReturnArity, Service, ShapeViolation,
};
use user_service::{MemoryStore, UserService};

#[derive(Debug, Default, Serialize, Deserialize, Params)]
struct Note {
    text: String,
}

#[test]
fn test_user_service_descriptors() {
    let registry = Registry::build(UserService::new(MemoryStore::new())).unwrap();
    assert_eq!(registry.operation_names(), vec!["Create", "Delete", "Get", "Recent"]);
    assert_eq!(registry.len(), 4);

    let create = registry.descriptor("Create").unwrap();
    assert_eq!(create.binding_mode, BindingMode::Body);
    assert_eq!(create.return_arity, ReturnArity::ValueAndError);
    assert!(create.parameter_type.ends_with("User"));
    let names: Vec<&str> = create.fields.iter().map(|f| f.field_name).collect();
    assert_eq!(names, vec!["ID", "Name", "Email"]);
    assert_eq!(
        create.field("Name").unwrap().constraints,
        vec![Constraint::Alphanumeric, Constraint::Required]
    );

    let get = registry.descriptor("Get").unwrap();
    assert_eq!(get.binding_mode, BindingMode::Query);
    assert_eq!(
        get.field("ID").unwrap().kind,
        PrimitiveKind::Integer {
            min: i128::from(i32::MIN),
            max: i128::from(i32::MAX)
        }
    );

    let delete = registry.descriptor("Delete").unwrap();
    assert_eq!(delete.return_arity, ReturnArity::ErrorOnly);

    assert!(registry.descriptor("Missing").is_none());
}

#[test]
fn test_build_is_idempotent() {
    let a = Registry::build(UserService::new(MemoryStore::new())).unwrap();
    let b = Registry::build(UserService::new(MemoryStore::new())).unwrap();
    assert_eq!(a.operation_names(), b.operation_names());
    for name in a.operation_names() {
        assert_eq!(a.descriptor(name), b.descriptor(name));
    }
}

struct TwoParams;

impl TwoParams {
    fn fine(&self, _n: Note) -> Result<(), String> {
        Ok(())
    }

    fn save(&self, _n: Note, _force: bool) -> Result<(), String> {
        Ok(())
    }
}

impl Service for TwoParams {
    fn operations(ops: &mut Operations<Self>) {
        ops.body("Fine", TwoParams::fine).body("Save", TwoParams::save);
    }
}

#[test]
fn test_two_parameters_fail_construction() {
    let err = Registry::build(TwoParams).err().unwrap();
    assert_eq!(
        err,
        ConstructionError::InvalidOperation {
            operation: "Save".to_string(),
            violation: ShapeViolation::ParameterCount { found: 2 },
        }
    );
    assert_eq!(
        err.to_string(),
        "operation Save: operation must take exactly one structure parameter"
    );
}

struct ScalarParam;

impl ScalarParam {
    fn get(&self, _id: i32) -> Result<String, String> {
        Ok(String::new())
    }
}

impl Service for ScalarParam {
    fn operations(ops: &mut Operations<Self>) {
        ops.query("Get", ScalarParam::get);
    }
}

#[test]
fn test_scalar_parameter_fails_construction() {
    let err = Registry::build(ScalarParam).err().unwrap();
    assert!(matches!(
        err,
        ConstructionError::InvalidOperation {
            ref operation,
            violation: ShapeViolation::NotAStructure { .. },
        } if operation == "Get"
    ));
    assert_eq!(
        err.to_string(),
        "operation Get: operation must take exactly one structure parameter"
    );
}

struct NoResult;

impl NoResult {
    fn fire(&self, _n: Note) {}
}

impl Service for NoResult {
    fn operations(ops: &mut Operations<Self>) {
        ops.body("Fire", NoResult::fire);
    }
}

#[test]
fn test_missing_result_fails_construction() {
    let err = Registry::build(NoResult).err().unwrap();
    assert_eq!(
        err.to_string(),
        "operation Fire: operation must return (value,error) or (error)"
    );
}

struct NoParams;

impl NoParams {
    fn ping(&self) -> Result<String, String> {
        Ok("pong".to_string())
    }
}

impl Service for NoParams {
    fn operations(ops: &mut Operations<Self>) {
        ops.query("Ping", NoParams::ping);
    }
}

#[test]
fn test_zero_parameters_fail_construction() {
    let err = Registry::build(NoParams).err().unwrap();
    assert!(matches!(
        err,
        ConstructionError::InvalidOperation {
            violation: ShapeViolation::ParameterCount { found: 0 },
            ..
        }
    ));
}

struct Duplicated;

impl Duplicated {
    fn one(&self, _n: Note) -> Result<(), String> {
        Ok(())
    }
}

impl Service for Duplicated {
    fn operations(ops: &mut Operations<Self>) {
        ops.body("One", Duplicated::one).query("One", Duplicated::one);
    }
}

#[test]
fn test_duplicate_name_fails_construction() {
    let err = Registry::build(Duplicated).err().unwrap();
    assert_eq!(
        err,
        ConstructionError::DuplicateOperation {
            operation: "One".to_string()
        }
    );
}

struct Unnamed;

impl Unnamed {
    fn one(&self, _n: Note) -> Result<(), String> {
        Ok(())
    }
}

impl Service for Unnamed {
    fn operations(ops: &mut Operations<Self>) {
        ops.register("", BindingMode::Body, Unnamed::one);
    }
}

#[test]
fn test_empty_name_fails_construction() {
    assert_eq!(
        Registry::build(Unnamed).err(),
        Some(ConstructionError::EmptyName)
    );
}

struct Empty;

impl Service for Empty {
    fn operations(_ops: &mut Operations<Self>) {}
}

#[test]
fn test_service_without_operations_builds_empty_registry() {
    let registry = Registry::build(Empty).unwrap();
    assert!(registry.is_empty());
    assert!(registry.operation_names().is_empty());
}

#[test]
fn test_wrap_reports_construction_error() {
    let err = servicehandler::wrap(TwoParams).err().unwrap();
    assert!(err.to_string().contains("Save"));
}
