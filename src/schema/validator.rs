//! Document validator
//!
//! Validation semantics:
//! - Every mismatch is reported; validation never stops at the first one
//! - Absent or null values are valid for optional fields
//! - Fields not declared by the shape are permitted (open-world documents)
//! - System fields are never checked
//! - Ids are checked structurally only; the target table is not consulted
//! - No coercion: `"1"` is not a number, `1` is not `true`
//!
//! Each message reads
//! `Type '<observed>' is not assignable to <expected> for <path>` and is
//! shown verbatim in the editor's problems list.

use std::sync::OnceLock;

use base64::Engine as _;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use super::render::{compact, literal_text};
use super::table::TableSchema;
use super::types::{make_path, Field, Shape};
use crate::observability::Event;

/// Validates `value` against `shape`, returning one message per mismatch.
///
/// `path` prefixes every reported field path; pass `""` for a document root.
pub fn validate(value: &Value, shape: &Shape, path: &str) -> Vec<String> {
    let mut errors = Vec::new();
    check(Some(value), shape, false, path, &mut errors);
    errors
}

/// Validates a whole document against its table's document type.
///
/// Schemaless tables accept any document.
pub fn validate_document(document: &Value, table: &TableSchema) -> Vec<String> {
    let errors = match &table.document_type {
        Some(shape) => validate(document, shape, ""),
        None => Vec::new(),
    };

    debug!(
        event = %Event::DocumentValidated,
        table = %table.table_name,
        errors = errors.len(),
        "Document validated"
    );
    errors
}

/// Returns true if `value` validates against `shape` with no errors.
pub fn is_assignable(value: &Value, shape: &Shape) -> bool {
    assignable(Some(value), shape)
}

fn assignable(value: Option<&Value>, shape: &Shape) -> bool {
    let mut errors = Vec::new();
    check(value, shape, false, "", &mut errors);
    errors.is_empty()
}

/// `None` is an absent value (`undefined`), distinct from JSON null.
fn check(
    value: Option<&Value>,
    shape: &Shape,
    optional: bool,
    path: &str,
    errors: &mut Vec<String>,
) {
    if optional && value.map_or(true, Value::is_null) {
        return;
    }

    match shape {
        Shape::Any => {}
        Shape::Null => {
            if !matches!(value, Some(Value::Null)) {
                errors.push(type_error(value, shape, path));
            }
        }
        Shape::String => {
            if !matches!(value, Some(Value::String(_))) {
                errors.push(type_error(value, shape, path));
            }
        }
        Shape::Boolean => {
            if !matches!(value, Some(Value::Bool(_))) {
                errors.push(type_error(value, shape, path));
            }
        }
        Shape::Float64 => {
            let valid = match value {
                Some(Value::Number(n)) => !n.as_f64().is_some_and(f64::is_nan),
                _ => false,
            };
            if !valid {
                errors.push(type_error(value, shape, path));
            }
        }
        Shape::Int64 => {
            let valid = match value {
                Some(Value::Number(n)) => n.is_i64(),
                _ => false,
            };
            if !valid {
                errors.push(type_error(value, shape, path));
            }
        }
        Shape::Bytes => {
            let valid = match value {
                Some(Value::String(s)) => base64::engine::general_purpose::STANDARD
                    .decode(s)
                    .is_ok(),
                _ => false,
            };
            if !valid {
                errors.push(type_error(value, shape, path));
            }
        }
        Shape::Literal(literal) => {
            if !value.is_some_and(|v| literal.matches(v)) {
                errors.push(value_error(value, &compact(shape), path));
            }
        }
        Shape::Id { .. } => {
            let valid = match value {
                Some(Value::String(s)) => id_pattern().is_match(s),
                _ => false,
            };
            if !valid {
                errors.push(value_error(value, &compact(shape), path));
            }
        }
        Shape::Array(element) => match value {
            Some(Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, i);
                    check(Some(item), element, false, &item_path, errors);
                }
            }
            _ => errors.push(type_error(value, shape, path)),
        },
        Shape::Object(fields) => match value {
            Some(Value::Object(map)) => check_fields(map, fields, path, errors),
            _ => errors.push(type_error(value, shape, path)),
        },
        Shape::Record { keys, values } => match value {
            Some(Value::Object(map)) => {
                for (key, entry) in map {
                    let entry_path = make_path(path, key);
                    check(
                        Some(&Value::String(key.clone())),
                        keys,
                        false,
                        &entry_path,
                        errors,
                    );
                    check(
                        Some(entry),
                        &values.field_type,
                        values.optional,
                        &entry_path,
                        errors,
                    );
                }
            }
            _ => errors.push(type_error(value, shape, path)),
        },
        Shape::Union(variants) => {
            if !variants.iter().any(|variant| assignable(value, variant)) {
                errors.push(union_error(value, variants, path));
            }
        }
    }
}

fn check_fields(map: &Map<String, Value>, fields: &[Field], path: &str, errors: &mut Vec<String>) {
    for field in fields.iter().filter(|f| !f.is_system()) {
        let field_path = make_path(path, &field.name);
        check(map.get(&field.name), &field.shape, field.optional, &field_path, errors);
    }
}

/// Document ids are url-safe tokens.
fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("id pattern is a valid regex"))
}

/// Returns the JSON type name for error messages.
fn json_type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

/// Scalars are shown as their JSON text; everything else by type name.
fn describe_value(value: Option<&Value>) -> String {
    match value {
        Some(v @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => v.to_string(),
        other => json_type_name(other).to_string(),
    }
}

fn format_error(observed: &str, expected: &str, path: &str) -> String {
    if path.is_empty() {
        format!("Type '{}' is not assignable to {}", observed, expected)
    } else {
        format!("Type '{}' is not assignable to {} for {}", observed, expected, path)
    }
}

fn type_error(value: Option<&Value>, shape: &Shape, path: &str) -> String {
    format_error(json_type_name(value), &compact(shape), path)
}

fn value_error(value: Option<&Value>, expected: &str, path: &str) -> String {
    format_error(&describe_value(value), expected, path)
}

fn union_error(value: Option<&Value>, variants: &[Shape], path: &str) -> String {
    let literals: Vec<String> = variants
        .iter()
        .filter_map(|variant| match variant {
            Shape::Literal(literal) => Some(literal_text(literal)),
            _ => None,
        })
        .collect();

    if literals.is_empty() {
        let rendered: Vec<String> = variants.iter().map(compact).collect();
        let mut message = format_error(
            json_type_name(value),
            &format!("union v.union({})", rendered.join(", ")),
            path,
        );
        let closest = closest_variant_errors(value, variants, path);
        if !closest.is_empty() {
            message.push_str(&format!(" (closest variant: {})", closest.join("; ")));
        }
        message
    } else {
        value_error(value, &format!("one of {}", literals.join(" | ")), path)
    }
}

/// Nested errors of the container variant with the fewest mismatches.
/// Empty when no variant has the value's container type.
fn closest_variant_errors(value: Option<&Value>, variants: &[Shape], path: &str) -> Vec<String> {
    variants
        .iter()
        .filter(|variant| {
            matches!(
                (variant, value),
                (Shape::Object(_) | Shape::Record { .. }, Some(Value::Object(_)))
                    | (Shape::Array(_), Some(Value::Array(_)))
            )
        })
        .map(|variant| {
            let mut errors = Vec::new();
            check(value, variant, false, path, &mut errors);
            errors
        })
        .min_by_key(Vec::len)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person() -> Shape {
        Shape::object(vec![
            Field::required("age", Shape::Float64),
            Field::optional("nickname", Shape::String),
        ])
    }

    #[test]
    fn test_valid_document_passes() {
        assert!(validate(&json!({"age": 30, "nickname": "Al"}), &person(), "").is_empty());
    }

    #[test]
    fn test_wrong_type_single_error() {
        let errors = validate(&json!({"age": "old"}), &person(), "");
        assert_eq!(
            errors,
            vec!["Type 'string' is not assignable to v.float64() for age".to_string()]
        );
    }

    #[test]
    fn test_optional_absent_or_null_is_valid() {
        assert!(validate(&json!({"age": 1}), &person(), "").is_empty());
        assert!(validate(&json!({"age": 1, "nickname": null}), &person(), "").is_empty());
    }

    #[test]
    fn test_required_missing_vs_null() {
        let errors = validate(&json!({}), &person(), "");
        assert_eq!(
            errors,
            vec!["Type 'undefined' is not assignable to v.float64() for age".to_string()]
        );

        let errors = validate(&json!({"age": null}), &person(), "");
        assert_eq!(
            errors,
            vec!["Type 'null' is not assignable to v.float64() for age".to_string()]
        );
    }

    #[test]
    fn test_null_shape_accepts_null_only() {
        assert!(validate(&json!(null), &Shape::Null, "x").is_empty());
        assert_eq!(validate(&json!(0), &Shape::Null, "x").len(), 1);
    }

    #[test]
    fn test_any_always_valid() {
        let shape = Shape::object(vec![Field::required("blob", Shape::Any)]);
        assert!(validate(&json!({}), &shape, "").is_empty());
        assert!(validate(&json!({"blob": [1, {"a": null}]}), &shape, "").is_empty());
    }

    #[test]
    fn test_extra_fields_permitted() {
        assert!(validate(&json!({"age": 1, "unknown": "x"}), &person(), "").is_empty());
    }

    #[test]
    fn test_system_fields_skipped() {
        let shape = Shape::object(vec![
            Field::required("_id", Shape::id("users")),
            Field::required("_creationTime", Shape::Float64),
            Field::required("_internal", Shape::String),
        ]);
        assert!(validate(&json!({}), &shape, "").is_empty());
    }

    #[test]
    fn test_array_element_paths() {
        let errors = validate(&json!(["ok", 5]), &Shape::array(Shape::String), "tags");
        assert_eq!(
            errors,
            vec!["Type 'number' is not assignable to v.string() for tags[1]".to_string()]
        );
    }

    #[test]
    fn test_array_errors_accumulate() {
        let errors = validate(&json!([1, "a", 2, true]), &Shape::array(Shape::Float64), "xs");
        assert_eq!(errors.len(), 2);
        assert!(errors[0].ends_with("xs[1]"));
        assert!(errors[1].ends_with("xs[3]"));
    }

    #[test]
    fn test_nested_object_paths() {
        let shape = Shape::object(vec![Field::required(
            "address",
            Shape::object(vec![
                Field::required("city", Shape::String),
                Field::required("zip", Shape::String),
            ]),
        )]);
        let errors = validate(&json!({"address": {"city": 1}}), &shape, "");
        assert_eq!(errors.len(), 2);
        assert!(errors[0].ends_with("for address.city"));
        assert!(errors[1].ends_with("for address.zip"));
    }

    #[test]
    fn test_non_object_document_root() {
        let errors = validate(&json!([1]), &person(), "");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Type 'array' is not assignable to v.object("));
        assert!(!errors[0].contains(" for "));
    }

    #[test]
    fn test_literal_strict_equality() {
        let shape = Shape::literal("a");
        assert!(validate(&json!("a"), &shape, "s").is_empty());
        assert_eq!(
            validate(&json!("b"), &shape, "s"),
            vec![r#"Type '"b"' is not assignable to v.literal("a") for s"#.to_string()]
        );
        assert_eq!(validate(&json!(1), &Shape::literal(true), "s").len(), 1);
    }

    #[test]
    fn test_union_lists_literal_alternatives() {
        let shape = Shape::union(vec![Shape::literal("a"), Shape::literal("b")]);
        let errors = validate(&json!("c"), &shape, "status");
        assert_eq!(
            errors,
            vec![r#"Type '"c"' is not assignable to one of "a" | "b" for status"#.to_string()]
        );
    }

    #[test]
    fn test_union_generic_message() {
        let shape = Shape::union(vec![Shape::String, Shape::Boolean]);
        let errors = validate(&json!(3), &shape, "x");
        assert_eq!(
            errors,
            vec!["Type 'number' is not assignable to union v.union(v.string(), v.boolean()) for x".to_string()]
        );
    }

    #[test]
    fn test_union_with_null_variant_accepts_null() {
        let shape = Shape::union(vec![Shape::String, Shape::Null]);
        assert!(validate(&json!(null), &shape, "x").is_empty());
        assert!(validate(&json!("s"), &shape, "x").is_empty());
    }

    #[test]
    fn test_union_of_objects_checks_deeply() {
        let shape = Shape::union(vec![
            Shape::object(vec![Field::required("kind", Shape::literal("a"))]),
            Shape::object(vec![Field::required("kind", Shape::literal("b"))]),
        ]);
        assert!(validate(&json!({"kind": "b"}), &shape, "").is_empty());
        assert_eq!(validate(&json!({"kind": "c"}), &shape, "").len(), 1);
    }

    #[test]
    fn test_union_of_objects_reports_closest_variant() {
        let shape = Shape::union(vec![
            Shape::object(vec![
                Field::required("kind", Shape::literal("click")),
                Field::required("x", Shape::Float64),
            ]),
            Shape::object(vec![Field::required("kind", Shape::literal("view"))]),
        ]);
        let errors = validate(&json!({"kind": "view", "x": 1, "extra": true}), &shape, "");
        assert!(errors.is_empty());

        let errors = validate(&json!({"kind": 5}), &shape, "event");
        assert_eq!(
            errors,
            vec![concat!(
                "Type 'object' is not assignable to union v.union(v.object({...}), v.object({...})) for event",
                r#" (closest variant: Type '5' is not assignable to v.literal("view") for event.kind)"#
            )
            .to_string()]
        );
    }

    #[test]
    fn test_union_without_container_match_has_no_detail() {
        let shape = Shape::union(vec![Shape::object(vec![]), Shape::array(Shape::String)]);
        let errors = validate(&json!("s"), &shape, "x");
        assert_eq!(
            errors,
            vec!["Type 'string' is not assignable to union v.union(v.object({}), v.array(v.string())) for x".to_string()]
        );
    }

    #[test]
    fn test_id_structural_check() {
        let shape = Shape::id("users");
        assert!(validate(&json!("jd7f3k_-9"), &shape, "author").is_empty());
        assert_eq!(
            validate(&json!("not an id!"), &shape, "author"),
            vec![r#"Type '"not an id!"' is not assignable to v.id("users") for author"#.to_string()]
        );
        assert_eq!(validate(&json!(""), &shape, "author").len(), 1);
        assert!(validate(&json!(7), &shape, "author")[0].contains("users"));
    }

    #[test]
    fn test_int64_rejects_fractions() {
        assert!(validate(&json!(42), &Shape::Int64, "n").is_empty());
        assert_eq!(validate(&json!(4.5), &Shape::Int64, "n").len(), 1);
        assert!(validate(&json!(4.5), &Shape::Float64, "n").is_empty());
    }

    #[test]
    fn test_bytes_must_be_base64() {
        assert!(validate(&json!(""), &Shape::Bytes, "b").is_empty());
        assert!(validate(&json!("aGVsbG8="), &Shape::Bytes, "b").is_empty());
        assert_eq!(validate(&json!("not base64!"), &Shape::Bytes, "b").len(), 1);
    }

    #[test]
    fn test_record_values_and_keys() {
        let shape = Shape::record(Shape::String, Shape::Float64, false);
        assert!(validate(&json!({"a": 1, "b": 2}), &shape, "scores").is_empty());
        let errors = validate(&json!({"a": 1, "b": "x"}), &shape, "scores");
        assert_eq!(
            errors,
            vec!["Type 'string' is not assignable to v.float64() for scores.b".to_string()]
        );

        let keyed = Shape::record(Shape::id("users"), Shape::Boolean, false);
        assert_eq!(validate(&json!({"bad key": true}), &keyed, "seen").len(), 1);
    }

    #[test]
    fn test_record_optional_values_accept_null() {
        let shape = Shape::record(Shape::String, Shape::Float64, true);
        assert!(validate(&json!({"a": null}), &shape, "r").is_empty());
    }

    #[test]
    fn test_validate_document_schemaless() {
        let table = TableSchema::new("logs", None);
        assert!(validate_document(&json!({"anything": 1}), &table).is_empty());
    }

    #[test]
    fn test_is_assignable() {
        assert!(is_assignable(&json!(1), &Shape::Float64));
        assert!(!is_assignable(&json!("1"), &Shape::Float64));
    }
}
