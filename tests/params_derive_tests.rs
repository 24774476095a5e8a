//! Tests for `#[derive(Params)]`

use serde::{Deserialize, Serialize};
use servicehandler::{Constraint, ParamShape, ParameterDescriptor, Params, PrimitiveKind};

fn fields<P: Params>() -> Vec<ParameterDescriptor> {
    match P::shape() {
        ParamShape::Struct(fields) => fields,
        ParamShape::Scalar(kind) => panic!("unexpected scalar shape {kind}"),
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Params)]
struct Search {
    #[serde(rename = "Query")]
    #[param(query = "q")]
    #[validate(required, length(min = 1, max = 32))]
    query: String,
    #[serde(rename = "Limit")]
    #[validate(range(min = 1, max = 100))]
    limit: u16,
    #[serde(default)]
    exact: bool,
    score: f64,
    #[validate(ascii)]
    nickname: Option<String>,
    #[serde(skip)]
    cache_key: String,
}

#[test]
fn test_field_names_follow_serde_rename() {
    let names: Vec<&str> = fields::<Search>().iter().map(|f| f.field_name).collect();
    assert_eq!(names, vec!["Query", "Limit", "exact", "score", "nickname"]);
}

#[test]
fn test_query_override_sets_wire_key() {
    let fields = fields::<Search>();
    assert_eq!(fields[0].wire_key, "q");
    assert_eq!(fields[1].wire_key, "Limit");
}

#[test]
fn test_constraints_keep_declaration_order() {
    let fields = fields::<Search>();
    assert_eq!(
        fields[0].constraints,
        vec![Constraint::Required, Constraint::Length { min: 1, max: 32 }]
    );
    assert_eq!(
        fields[1].constraints,
        vec![Constraint::Range {
            min: 1.0,
            max: 100.0
        }]
    );
    assert!(fields[2].constraints.is_empty());
    assert_eq!(fields[4].constraints, vec![Constraint::Ascii]);
}

#[test]
fn test_kinds_and_optionality() {
    let fields = fields::<Search>();
    assert_eq!(fields[1].kind, PrimitiveKind::Integer { min: 0, max: 65535 });
    assert_eq!(fields[2].kind, PrimitiveKind::Boolean);
    assert_eq!(fields[3].kind, PrimitiveKind::Float { max: f64::MAX });
    assert_eq!(fields[4].kind, PrimitiveKind::String);
    assert!(fields[4].optional);
    assert!(!fields[0].optional);
}

#[derive(Debug, Default, Serialize, Deserialize, Params)]
struct Nothing;

#[test]
fn test_unit_struct_has_no_fields() {
    assert!(fields::<Nothing>().is_empty());
}

#[derive(Debug, Default, Serialize, Deserialize, Params)]
struct OpenRange {
    #[validate(length(max = 8), range(min = 0.5))]
    value: String,
}

#[test]
fn test_omitted_bounds_use_type_limits() {
    let fields = fields::<OpenRange>();
    assert_eq!(
        fields[0].constraints,
        vec![
            Constraint::Length { min: 0, max: 8 },
            Constraint::Range {
                min: 0.5,
                max: f64::MAX
            }
        ]
    );
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Address {
    city: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Params)]
struct Profile {
    #[validate(required)]
    tags: Vec<String>,
    #[param(json)]
    address: Address,
    ratio: f32,
}

#[test]
fn test_collections_and_marked_structures_are_json() {
    let fields = fields::<Profile>();
    assert_eq!(fields[0].kind, PrimitiveKind::Json);
    assert_eq!(fields[0].constraints, vec![Constraint::Required]);
    assert_eq!(fields[1].field_name, "address");
    assert_eq!(fields[1].kind, PrimitiveKind::Json);
    assert_eq!(
        fields[2].kind,
        PrimitiveKind::Float {
            max: f64::from(f32::MAX)
        }
    );
}
