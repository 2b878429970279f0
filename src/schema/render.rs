//! Validator-expression renderer
//!
//! Renders shapes as `v.*` builder expressions and tables as
//! `defineTable(...)` declarations. Output is a pure function of the input
//! and the `RenderConfig`; it is shown as the source of truth for a table,
//! so two renders of the same tree are byte-identical.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Number, Value};
use tracing::debug;

use super::table::{user_fields, DatabaseSchema, Index, SearchIndex, TableSchema, VectorIndex};
use super::types::{Field, LiteralValue, RecordValues, Shape};
use crate::config::RenderConfig;
use crate::observability::Event;

/// Renders a shape with the default configuration.
pub fn render(shape: &Shape) -> String {
    Renderer::default().render(shape)
}

/// Renders a table declaration with the default configuration.
pub fn render_table(table: &TableSchema) -> String {
    Renderer::default().render_table(table)
}

/// Renders a complete schema file with the default configuration.
pub fn render_schema(schema: &DatabaseSchema) -> String {
    Renderer::default().render_schema(schema)
}

/// Single-line form used inside validation messages: objects collapse to
/// `v.object({...})`.
pub fn compact(shape: &Shape) -> String {
    match shape {
        Shape::Literal(literal) => format!("v.literal({})", literal_text(literal)),
        Shape::Id { table_name } => format!("v.id({})", quote(table_name)),
        Shape::Array(element) => format!("v.array({})", compact(element)),
        Shape::Object(fields) if fields.iter().all(Field::is_system) => "v.object({})".to_string(),
        Shape::Object(_) => "v.object({...})".to_string(),
        Shape::Record { keys, values } => {
            format!("v.record({}, {})", compact(keys), optional_wrap(values.optional, compact(&values.field_type)))
        }
        Shape::Union(variants) => {
            let rendered: Vec<String> = variants.iter().map(compact).collect();
            format!("v.union({})", rendered.join(", "))
        }
        leaf => leaf_token(leaf).to_string(),
    }
}

/// Literal value as it appears inside `v.literal(...)`.
pub fn literal_text(literal: &LiteralValue) -> String {
    match literal {
        LiteralValue::String(s) => quote(s),
        LiteralValue::Number(n) => number_text(n),
        LiteralValue::Boolean(b) => b.to_string(),
    }
}

/// Token for a payload-free kind.
pub(crate) fn leaf_token(shape: &Shape) -> &'static str {
    match shape {
        Shape::Null => "v.null()",
        Shape::String => "v.string()",
        Shape::Boolean => "v.boolean()",
        Shape::Float64 => "v.float64()",
        Shape::Int64 => "v.int64()",
        Shape::Bytes => "v.bytes()",
        _ => "v.any()",
    }
}

/// Integral numbers render without a fractional part, like the schema
/// language's own number printing.
fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map_or_else(|| n.to_string(), |f| f.to_string())
    }
}

pub(crate) fn quote(s: &str) -> String {
    Value::from(s).to_string()
}

fn optional_wrap(optional: bool, rendered: String) -> String {
    if optional {
        format!("v.optional({})", rendered)
    } else {
        rendered
    }
}

/// Object keys that are not plain identifiers are quoted.
pub(crate) fn object_key(name: &str) -> String {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    let ident = IDENT
        .get_or_init(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern is a valid regex"));
    if ident.is_match(name) {
        name.to_string()
    } else {
        quote(name)
    }
}

fn string_list(items: &[&str]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| quote(s)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Validator-expression renderer.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    /// Creates a renderer with the given formatting.
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Returns the formatting configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Renders a shape as a top-level expression.
    pub fn render(&self, shape: &Shape) -> String {
        self.shape_at(shape, 1)
    }

    /// Renders `defineTable(...)` followed by one line per index.
    pub fn render_table(&self, table: &TableSchema) -> String {
        let rendered = self.table_at(table, 0);
        debug!(
            event = %Event::TableRendered,
            table = %table.table_name,
            bytes = rendered.len(),
            "Table rendered"
        );
        rendered
    }

    /// Renders the complete schema source file. Tables are sorted by name.
    pub fn render_schema(&self, schema: &DatabaseSchema) -> String {
        let mut tables: Vec<&TableSchema> = schema.tables.iter().collect();
        tables.sort_by(|a, b| a.table_name.cmp(&b.table_name));

        let mut out = String::from(
            "import { defineSchema, defineTable } from \"convex/server\";\nimport { v } from \"convex/values\";\n\nexport default defineSchema(",
        );

        if tables.is_empty() {
            out.push_str("{}");
        } else {
            out.push_str("{\n");
            for table in tables {
                out.push_str(&self.config.indent(1));
                out.push_str(&object_key(&table.table_name));
                out.push_str(": ");
                out.push_str(&self.table_at(table, 1));
                out.push_str(",\n");
            }
            out.push('}');
        }

        if !schema.schema_validation {
            out.push_str(", { schemaValidation: false }");
        }
        out.push_str(");\n");
        out
    }

    /// `depth` is the indentation of the line the declaration starts on.
    fn table_at(&self, table: &TableSchema, depth: usize) -> String {
        let document = match &table.document_type {
            Some(Shape::Object(fields)) => self.fields_block(fields, depth + 1),
            Some(Shape::Union(variants)) => self.union_at(variants, depth + 1),
            Some(other) => self.shape_at(other, depth + 1),
            None => "v.any()".to_string(),
        };

        let mut out = format!("defineTable({})", document);
        let line = format!("\n{}", self.config.indent(depth + 1));

        for index in &table.indexes {
            out.push_str(&line);
            out.push_str(&index_call(index, false));
        }
        for index in &table.search_indexes {
            out.push_str(&line);
            out.push_str(&search_index_call(index, false));
        }
        for index in &table.vector_indexes {
            out.push_str(&line);
            out.push_str(&vector_index_call(index, false));
        }
        for index in &table.staged_indexes {
            out.push_str(&line);
            out.push_str(&index_call(index, true));
        }
        for index in &table.staged_search_indexes {
            out.push_str(&line);
            out.push_str(&search_index_call(index, true));
        }
        for index in &table.staged_vector_indexes {
            out.push_str(&line);
            out.push_str(&vector_index_call(index, true));
        }

        out
    }

    /// `depth` is the indentation applied to lines nested inside the shape.
    fn shape_at(&self, shape: &Shape, depth: usize) -> String {
        match shape {
            Shape::Literal(literal) => format!("v.literal({})", literal_text(literal)),
            Shape::Id { table_name } => format!("v.id({})", quote(table_name)),
            Shape::Array(element) => format!("v.array({})", self.shape_at(element, depth)),
            Shape::Object(fields) => format!("v.object({})", self.fields_block(fields, depth)),
            Shape::Record { keys, values } => format!(
                "v.record({}, {})",
                self.shape_at(keys, depth),
                self.record_values(values, depth)
            ),
            Shape::Union(variants) => self.union_at(variants, depth),
            leaf => leaf_token(leaf).to_string(),
        }
    }

    fn record_values(&self, values: &RecordValues, depth: usize) -> String {
        optional_wrap(values.optional, self.shape_at(&values.field_type, depth))
    }

    /// `{ name: v.string(), ... }` with one field per line; system fields
    /// are skipped.
    fn fields_block(&self, fields: &[Field], depth: usize) -> String {
        let lines: Vec<String> = fields
            .iter()
            .filter(|f| !f.is_system())
            .map(|f| {
                format!(
                    "{}{}: {},",
                    self.config.indent(depth),
                    object_key(&f.name),
                    optional_wrap(f.optional, self.shape_at(&f.shape, depth + 1))
                )
            })
            .collect();

        if lines.is_empty() {
            "{}".to_string()
        } else {
            format!("{{\n{}\n{}}}", lines.join("\n"), self.config.indent(depth - 1))
        }
    }

    fn union_at(&self, variants: &[Shape], depth: usize) -> String {
        let expanded: Vec<String> = variants.iter().map(|v| self.shape_at(v, depth + 1)).collect();
        if self.config.union_is_multiline(&expanded) {
            self.format_union(&expanded, depth)
        } else {
            let inline: Vec<String> = variants.iter().map(|v| self.shape_at(v, depth)).collect();
            format!("v.union({})", inline.join(", "))
        }
    }

    /// Joins already-rendered variants, inline or one per line.
    pub(crate) fn format_union(&self, variants: &[String], depth: usize) -> String {
        if !self.config.union_is_multiline(variants) {
            return format!("v.union({})", variants.join(", "));
        }

        let mut out = String::from("v.union(\n");
        for variant in variants {
            out.push_str(&self.config.indent(depth));
            out.push_str(variant);
            out.push_str(",\n");
        }
        out.push_str(&self.config.indent(depth - 1));
        out.push(')');
        out
    }
}

fn index_call(index: &Index, staged: bool) -> String {
    let fields = string_list(&index.user_fields());
    if staged {
        format!(".index({}, {{ fields: {}, staged: true }})", quote(&index.name), fields)
    } else {
        format!(".index({}, {})", quote(&index.name), fields)
    }
}

fn search_index_call(index: &SearchIndex, staged: bool) -> String {
    format!(
        ".searchIndex({}, {{ searchField: {}, filterFields: {}{} }})",
        quote(&index.name),
        quote(&index.search_field),
        string_list(&user_fields(&index.filter_fields)),
        if staged { ", staged: true" } else { "" }
    )
}

fn vector_index_call(index: &VectorIndex, staged: bool) -> String {
    format!(
        ".vectorIndex({}, {{ vectorField: {}, dimensions: {}, filterFields: {}{} }})",
        quote(&index.name),
        quote(&index.vector_field),
        index.dimensions,
        string_list(&user_fields(&index.filter_fields)),
        if staged { ", staged: true" } else { "" }
    )
}
