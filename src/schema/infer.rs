//! Shape inference from sampled documents
//!
//! Used when a table has no declared shape. The inferred declaration is
//! built from the observed JSON types only; no `Shape` tree is involved.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::debug;

use super::render::{object_key, Renderer};
use super::types::is_system_field;
use crate::config::RenderConfig;
use crate::observability::Event;

const ANY: &str = "v.any()";

/// JSON type seen for a field in at least one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ObservedType {
    Array,
    Boolean,
    Number,
    Object,
    String,
}

impl ObservedType {
    /// Observed type of a non-null value.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(ObservedType::Boolean),
            Value::Number(_) => Some(ObservedType::Number),
            Value::String(_) => Some(ObservedType::String),
            Value::Array(_) => Some(ObservedType::Array),
            Value::Object(_) => Some(ObservedType::Object),
        }
    }

    /// Validator expression for this type.
    pub fn token(&self) -> &'static str {
        match self {
            ObservedType::Array => "v.array(v.any())",
            ObservedType::Boolean => "v.boolean()",
            ObservedType::Number => "v.float64()",
            ObservedType::Object => ANY,
            ObservedType::String => "v.string()",
        }
    }
}

/// What the samples say about one top-level field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedField {
    /// Non-null types seen
    pub types: BTreeSet<ObservedType>,
    /// Number of samples carrying the key, null included
    pub present: usize,
}

/// Per-field observations over the object samples, keyed by field name.
/// Returns the map and the number of object samples seen.
pub fn infer_fields(documents: &[Value]) -> (BTreeMap<String, ObservedField>, usize) {
    let mut fields: BTreeMap<String, ObservedField> = BTreeMap::new();
    let mut samples = 0;

    for map in documents.iter().filter_map(Value::as_object) {
        samples += 1;
        for (name, value) in map {
            if is_system_field(name) {
                continue;
            }
            let field = fields.entry(name.clone()).or_default();
            field.present += 1;
            if let Some(observed) = ObservedType::of(value) {
                field.types.insert(observed);
            }
        }
    }

    (fields, samples)
}

/// Renders a `defineTable({...})` inferred from sampled documents.
pub fn infer_table(documents: &[Value]) -> String {
    infer_table_with(documents, &RenderConfig::default())
}

/// `infer_table` with explicit formatting.
pub fn infer_table_with(documents: &[Value], config: &RenderConfig) -> String {
    let (fields, samples) = infer_fields(documents);
    let renderer = Renderer::new(config.clone());

    let lines: Vec<String> = fields
        .iter()
        .map(|(name, field)| {
            let rendered = field_type(&renderer, field);
            let rendered = if field.present < samples {
                format!("v.optional({})", rendered)
            } else {
                rendered
            };
            format!("{}{}: {},", config.indent(1), object_key(name), rendered)
        })
        .collect();

    debug!(
        event = %Event::TableInferred,
        samples,
        fields = lines.len(),
        "Table inferred from samples"
    );

    if lines.is_empty() {
        "defineTable({})".to_string()
    } else {
        format!("defineTable({{\n{}\n}})", lines.join("\n"))
    }
}

fn field_type(renderer: &Renderer, field: &ObservedField) -> String {
    // tokens come out sorted and deduplicated
    let tokens: BTreeSet<&'static str> = field.types.iter().map(ObservedType::token).collect();

    if tokens.is_empty() || tokens.contains(ANY) {
        return ANY.to_string();
    }
    let mut variants: Vec<String> = tokens.into_iter().map(str::to_string).collect();
    if variants.len() == 1 {
        return variants.remove(0);
    }
    renderer.format_union(&variants, 2)
}
