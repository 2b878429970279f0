//! Default-document synthesizer
//!
//! Produces the initial content offered when a user creates a document.
//! The result validates clean against its shape, except that references
//! are left as empty-string placeholders for the user to fill in.

use serde_json::{Map, Value};
use tracing::debug;

use super::table::TableSchema;
use super::types::{Field, Shape};
use super::validator::is_assignable;
use crate::observability::Event;

/// A synthesized document.
pub type Document = Map<String, Value>;

/// Default value for a single shape.
pub fn default_value(shape: &Shape) -> Value {
    match shape {
        Shape::Id { .. } => Value::String(String::new()),
        Shape::Boolean => Value::Bool(false),
        Shape::Float64 | Shape::Int64 => Value::from(0),
        Shape::Array(_) => Value::Array(Vec::new()),
        Shape::Object(fields) => Value::Object(required_fields(fields)),
        Shape::Record { .. } => Value::Object(Map::new()),
        Shape::Literal(literal) => literal.to_value(),
        Shape::Null => Value::Null,
        Shape::Union(variants) => union_default(variants),
        Shape::String | Shape::Bytes | Shape::Any => Value::String(String::new()),
    }
}

/// Top-level document for a shape: every declared user field, optional
/// ones included. Non-object shapes give an empty document.
pub fn synthesize(shape: &Shape) -> Document {
    match shape {
        Shape::Object(fields) => fields
            .iter()
            .filter(|f| !f.is_system())
            .map(|f| (f.name.clone(), default_value(&f.shape)))
            .collect(),
        Shape::Union(variants) => variants
            .iter()
            .find(|v| matches!(v, Shape::Object(_)))
            .map(synthesize)
            .unwrap_or_default(),
        _ => Document::new(),
    }
}

/// Default document for a table; schemaless tables give an empty document.
pub fn synthesize_table(table: &TableSchema) -> Document {
    let document = table
        .document_type
        .as_ref()
        .map(synthesize)
        .unwrap_or_default();

    debug!(
        event = %Event::DocumentSynthesized,
        table = %table.table_name,
        fields = document.len(),
        "Default document synthesized"
    );
    document
}

fn required_fields(fields: &[Field]) -> Map<String, Value> {
    fields
        .iter()
        .filter(|f| !f.optional && !f.is_system())
        .map(|f| (f.name.clone(), default_value(&f.shape)))
        .collect()
}

/// Default of the first variant that accepts its own default, else the
/// first variant's default.
fn union_default(variants: &[Shape]) -> Value {
    let mut defaults: Vec<Value> = variants.iter().map(default_value).collect();
    let accepted = variants
        .iter()
        .zip(&defaults)
        .position(|(variant, value)| is_assignable(value, variant));
    match accepted {
        Some(i) => defaults.swap_remove(i),
        None if defaults.is_empty() => Value::Null,
        None => defaults.swap_remove(0),
    }
}
