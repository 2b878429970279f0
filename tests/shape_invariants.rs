//! Shape Invariant Tests
//!
//! End-to-end checks across loading, validation, rendering and synthesis:
//! - Synthesized defaults validate clean
//! - Rendering is deterministic
//! - Optional fields may be absent, required fields may not
//! - System fields never surface in output
//! - Union layout switches at the documented threshold

use proptest::prelude::*;
use proptest::test_runner::Config;
use serde_json::{json, Value};
use shape_engine::schema::{
    default_value, infer_table, render, render_table, synthesize, synthesize_table, validate,
    validate_document, Field, LiteralValue, SchemaLoader, Shape, TableSchema,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn person_shape() -> Shape {
    Shape::object(vec![
        Field::required("age", Shape::Float64),
        Field::optional("nickname", Shape::String),
    ])
}

fn load_messages() -> SchemaLoader {
    let mut loader = SchemaLoader::new();
    loader
        .load_table(
            r#"{
                "tableName": "messages",
                "documentType": {
                    "type": "object",
                    "value": {
                        "author": {"fieldType": {"type": "id", "tableName": "users"}, "optional": false},
                        "body": {"fieldType": {"type": "string"}, "optional": false},
                        "status": {"fieldType": {"type": "union", "value": [
                            {"type": "literal", "value": "draft"},
                            {"type": "literal", "value": "sent"}
                        ]}, "optional": true},
                        "_internal": {"fieldType": {"type": "string"}, "optional": false}
                    }
                },
                "indexes": [{"indexDescriptor": "by_author", "fields": ["author", "_creationTime"]}]
            }"#,
        )
        .unwrap();
    loader
}

// =============================================================================
// Validation Tests
// =============================================================================

/// A wrong type on a required field yields one error; an absent optional
/// field yields none.
#[test]
fn test_age_nickname_scenario() {
    let errors = validate(&json!({"age": "old"}), &person_shape(), "");
    assert_eq!(
        errors,
        vec!["Type 'string' is not assignable to v.float64() for age".to_string()]
    );
}

/// Union mismatch lists every literal alternative.
#[test]
fn test_union_error_lists_literals() {
    let shape = Shape::union(vec![Shape::literal("a"), Shape::literal("b")]);
    let errors = validate(&json!("c"), &shape, "status");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("\"a\""));
    assert!(errors[0].contains("\"b\""));
}

/// Array element errors carry the element index.
#[test]
fn test_array_element_path() {
    let errors = validate(&json!(["ok", 5]), &Shape::array(Shape::String), "tags");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].ends_with("[1]"));
}

/// Documents loaded from JSON validate against the normalized shape.
#[test]
fn test_loaded_table_validates_documents() {
    let loader = load_messages();
    let table = loader.get("messages").unwrap();

    let good = json!({"author": "k57abc", "body": "hi", "_internal": 1});
    assert!(validate_document(&good, table).is_empty());

    let bad = json!({"author": "not an id!", "body": 3, "status": "lost"});
    let errors = validate_document(&bad, table);
    assert_eq!(errors.len(), 3);
    assert!(errors[0].contains("v.id(\"users\")"));
    assert!(errors.iter().all(|e| !e.contains("_internal")));
}

// =============================================================================
// Rendering Tests
// =============================================================================

/// A loaded table renders with system fields and system index keys omitted.
#[test]
fn test_loaded_table_renders() {
    let loader = load_messages();
    let rendered = render_table(loader.get("messages").unwrap());
    assert_eq!(
        rendered,
        "defineTable({\n  author: v.id(\"users\"),\n  body: v.string(),\n  status: v.optional(v.union(v.literal(\"draft\"), v.literal(\"sent\"))),\n})\n  .index(\"by_author\", [\"author\"])"
    );
    assert!(!rendered.contains("_internal"));
    assert!(!rendered.contains("_creationTime"));
}

/// Two short variants stay inline; a third forces one variant per line.
#[test]
fn test_union_threshold() {
    let two = Shape::union(vec![Shape::literal("a"), Shape::literal("b")]);
    assert!(!render(&two).contains('\n'));

    let three = Shape::union(vec![Shape::literal("a"), Shape::literal("b"), Shape::literal("c")]);
    assert!(render(&three).contains('\n'));
}

/// Inference needs no shape tree.
#[test]
fn test_inference_from_samples() {
    let docs = vec![
        json!({"_id": "x1", "title": "a", "score": 1}),
        json!({"_id": "x2", "title": null, "score": "high"}),
    ];
    assert_eq!(
        infer_table(&docs),
        "defineTable({\n  score: v.union(v.float64(), v.string()),\n  title: v.string(),\n})"
    );
}

// =============================================================================
// Synthesis Tests
// =============================================================================

/// System fields are never synthesized.
#[test]
fn test_synthesis_skips_system_fields() {
    let loader = load_messages();
    let document = synthesize_table(loader.get("messages").unwrap());
    assert!(!document.contains_key("_internal"));
    assert_eq!(Value::Object(document), json!({"author": "", "body": "", "status": "draft"}));
}

/// The reference placeholder is left for the user and does not validate.
#[test]
fn test_id_placeholder_needs_filling() {
    let loader = load_messages();
    let table = loader.get("messages").unwrap();
    let document = Value::Object(synthesize_table(table));
    let errors = validate_document(&document, table);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].ends_with("for author"));
}

/// Schemaless tables synthesize an empty document.
#[test]
fn test_schemaless_synthesis() {
    assert!(synthesize_table(&TableSchema::new("logs", None)).is_empty());
}

// =============================================================================
// Property Tests
// =============================================================================

fn leaf() -> impl Strategy<Value = Shape> {
    prop_oneof![
        Just(Shape::Null),
        Just(Shape::String),
        Just(Shape::Boolean),
        Just(Shape::Float64),
        Just(Shape::Int64),
        Just(Shape::Bytes),
        Just(Shape::Any),
        "[a-z]{0,8}".prop_map(|s| Shape::Literal(LiteralValue::String(s))),
        any::<i32>().prop_map(|n| Shape::literal(n)),
        any::<bool>().prop_map(|b| Shape::literal(b)),
    ]
}

/// Shape trees without references.
fn shape() -> impl Strategy<Value = Shape> {
    leaf().prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(Shape::array),
            prop::collection::btree_map("[a-z]{1,6}", (any::<bool>(), inner.clone()), 0..4).prop_map(
                |fields| {
                    Shape::object(
                        fields
                            .into_iter()
                            .map(|(name, (optional, shape))| Field { name, optional, shape })
                            .collect(),
                    )
                }
            ),
            (inner.clone(), any::<bool>())
                .prop_map(|(values, optional)| Shape::record(Shape::String, values, optional)),
            prop::collection::vec(inner, 1..4).prop_map(Shape::union),
        ]
    })
}

proptest! {
    #![proptest_config(Config::with_cases(128))]

    #[test]
    fn default_value_validates_clean(shape in shape()) {
        let value = default_value(&shape);
        prop_assert_eq!(validate(&value, &shape, ""), Vec::<String>::new());
    }

    #[test]
    fn synthesized_document_validates_clean(
        fields in prop::collection::btree_map("[a-z]{1,6}", (any::<bool>(), shape()), 0..5)
    ) {
        let shape = Shape::object(
            fields
                .into_iter()
                .map(|(name, (optional, shape))| Field { name, optional, shape })
                .collect(),
        );
        let document = Value::Object(synthesize(&shape));
        prop_assert_eq!(validate(&document, &shape, ""), Vec::<String>::new());
    }

    #[test]
    fn render_is_idempotent(shape in shape()) {
        prop_assert_eq!(render(&shape), render(&shape));
    }

    #[test]
    fn optional_field_may_be_absent(
        name in "[a-z]{1,6}",
        leaf in prop_oneof![
            Just(Shape::Null),
            Just(Shape::String),
            Just(Shape::Boolean),
            Just(Shape::Float64),
            Just(Shape::Int64),
            Just(Shape::Bytes),
        ]
    ) {
        let optional = Shape::object(vec![Field::optional(name.clone(), leaf.clone())]);
        let absent_ok = validate(&json!({}), &optional, "").is_empty();
        prop_assert!(absent_ok);

        let required = Shape::object(vec![Field::required(name.clone(), leaf)]);
        let errors = validate(&json!({}), &required, "");
        prop_assert_eq!(errors.len(), 1);
        let names_field = errors[0].ends_with(&format!("for {}", name));
        prop_assert!(names_field, "unexpected message {:?}", errors[0]);
    }
}
