//! Shape loader: decoded JSON in, canonical shapes out
//!
//! The backend describes shapes in two JSON dialects:
//! - validator JSON: lowercase tags, object fields as a map of
//!   `{ fieldType, optional }`, payloads under `value`
//! - shape JSON: capitalised tags, object fields as a list of
//!   `{ fieldName, optional, shape }`, payloads under `shape`/`shapes`
//!
//! Optionality arrives three ways: an `optional` wrapper kind, a sibling
//! `optional: true` boolean, and bare `{ shape: ... }` wrapper chains. All
//! three are folded into `Field::optional` here, once, with a bounded
//! unwrap loop.
//!
//! Malformed nodes never fail the load. They degrade to `Shape::Any` and a
//! warning is logged; the rest of the tree loads normally.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::errors::{ShapeError, ShapeResult};
use super::table::{DatabaseSchema, Index, SearchIndex, TableSchema, VectorIndex};
use super::types::{make_path, Field, LiteralValue, RecordValues, Shape};
use crate::config::EngineConfig;
use crate::observability::{display_path, Event};

/// Normalizes one decoded shape description.
pub fn load_shape(node: &Value, config: &EngineConfig) -> Shape {
    Normalizer { config }.shape(node, "", 0)
}

/// Parses one table schema from JSON text.
pub fn parse_table_schema(text: &str, config: &EngineConfig) -> ShapeResult<TableSchema> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ShapeError::invalid_json("table schema", e))?;
    parse_table_value(&value, config)
}

/// Parses a whole database schema (`{ tables, schemaValidation }`) from JSON text.
pub fn parse_database_schema(text: &str, config: &EngineConfig) -> ShapeResult<DatabaseSchema> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ShapeError::invalid_json("database schema", e))?;
    if !value.is_object() {
        return Err(ShapeError::NotAnObject("database schema".into()));
    }

    let raw = RawDatabaseSchema::deserialize(&value)
        .map_err(|e| ShapeError::invalid_json("database schema", e))?;

    let tables = raw
        .tables
        .unwrap_or_default()
        .iter()
        .map(|table| parse_table_value(table, config))
        .collect::<ShapeResult<Vec<_>>>()?;

    Ok(DatabaseSchema {
        tables,
        schema_validation: raw.schema_validation.unwrap_or(true),
    })
}

/// Parses one already-decoded table schema.
pub fn parse_table_value(value: &Value, config: &EngineConfig) -> ShapeResult<TableSchema> {
    if !value.is_object() {
        return Err(ShapeError::NotAnObject("table schema".into()));
    }

    let raw = RawTableSchema::deserialize(value)
        .map_err(|e| ShapeError::invalid_json("table schema", e))?;

    let table_name = raw
        .table_name
        .filter(|name| !name.is_empty())
        .ok_or(ShapeError::MissingTableName)?;

    let document_type = match raw.document_type.as_ref().filter(|v| !v.is_null()) {
        None => None,
        Some(node) => match document_variants(load_shape(node, config), &table_name) {
            Shape::Any => None,
            shape if shape.is_document_type() => Some(shape),
            shape => {
                warn!(
                    event = %Event::DocumentTypeRejected,
                    table = %table_name,
                    kind = shape.kind_name(),
                    "Document type is not an object or union of objects; treating table as schemaless"
                );
                None
            }
        },
    };

    let indexes = IndexParser { table: &table_name };
    Ok(TableSchema {
        indexes: indexes.parse(raw.indexes, "index"),
        search_indexes: indexes.parse(raw.search_indexes, "search index"),
        vector_indexes: indexes.parse(raw.vector_indexes, "vector index"),
        staged_indexes: indexes.parse(raw.staged_db_indexes, "staged index"),
        staged_search_indexes: indexes.parse(raw.staged_search_indexes, "staged search index"),
        staged_vector_indexes: indexes.parse(raw.staged_vector_indexes, "staged vector index"),
        table_name,
        document_type,
    })
}

/// Drops union variants that cannot describe a document, so one malformed
/// variant does not make the whole table schemaless. A single survivor is
/// unwrapped; with no survivors the union is returned unchanged.
fn document_variants(shape: Shape, table_name: &str) -> Shape {
    let Shape::Union(variants) = shape else {
        return shape;
    };
    if variants.iter().all(Shape::is_document_type) {
        return Shape::Union(variants);
    }

    let (mut kept, dropped): (Vec<Shape>, Vec<Shape>) =
        variants.iter().cloned().partition(Shape::is_document_type);
    if kept.is_empty() {
        return Shape::Union(variants);
    }

    for variant in &dropped {
        warn!(
            event = %Event::ShapeDegraded,
            table = %table_name,
            kind = variant.kind_name(),
            "Document type variant is not an object; variant dropped"
        );
    }

    if kept.len() == 1 {
        kept.remove(0)
    } else {
        Shape::Union(kept)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTableSchema {
    table_name: Option<String>,
    document_type: Option<Value>,
    indexes: Option<Vec<Value>>,
    search_indexes: Option<Vec<Value>>,
    vector_indexes: Option<Vec<Value>>,
    #[serde(alias = "stagedIndexes")]
    staged_db_indexes: Option<Vec<Value>>,
    staged_search_indexes: Option<Vec<Value>>,
    staged_vector_indexes: Option<Vec<Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDatabaseSchema {
    tables: Option<Vec<Value>>,
    schema_validation: Option<bool>,
}

/// Index definitions that can be checked before use.
trait IndexDefinition: DeserializeOwned {
    fn name(&self) -> &str;

    /// Why the definition is unusable, if it is.
    fn problem(&self) -> Option<&'static str>;
}

impl IndexDefinition for Index {
    fn name(&self) -> &str {
        &self.name
    }

    fn problem(&self) -> Option<&'static str> {
        if self.name.is_empty() {
            Some("empty name")
        } else if self.fields.is_empty() {
            Some("no fields")
        } else {
            None
        }
    }
}

impl IndexDefinition for SearchIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn problem(&self) -> Option<&'static str> {
        if self.name.is_empty() {
            Some("empty name")
        } else if self.search_field.is_empty() {
            Some("no search field")
        } else {
            None
        }
    }
}

impl IndexDefinition for VectorIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn problem(&self) -> Option<&'static str> {
        if self.name.is_empty() {
            Some("empty name")
        } else if self.vector_field.is_empty() {
            Some("no vector field")
        } else if self.dimensions == 0 {
            Some("zero dimensions")
        } else {
            None
        }
    }
}

/// Parses index lists entry by entry. A malformed entry is skipped with a
/// warning; the rest of the table still loads.
struct IndexParser<'a> {
    table: &'a str,
}

impl IndexParser<'_> {
    fn parse<T: IndexDefinition>(&self, entries: Option<Vec<Value>>, kind: &str) -> Vec<T> {
        entries
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| match T::deserialize(&entry) {
                Ok(index) => match index.problem() {
                    None => Some(index),
                    Some(reason) => {
                        self.skip(kind, index.name(), reason);
                        None
                    }
                },
                Err(e) => {
                    let name = entry
                        .get("name")
                        .or_else(|| entry.get("indexDescriptor"))
                        .and_then(Value::as_str)
                        .unwrap_or("");
                    self.skip(kind, name, &e.to_string());
                    None
                }
            })
            .collect()
    }

    fn skip(&self, kind: &str, name: &str, reason: &str) {
        warn!(
            event = %Event::ShapeDegraded,
            table = %self.table,
            kind,
            index = name,
            reason,
            "Malformed index definition skipped"
        );
    }
}

/// What a node is, before any kind dispatch.
enum Marker<'v> {
    /// `{ type: "optional", value: ... }`
    Optional(Option<&'v Value>),
    /// Untagged `{ shape: ... }` or `{ fieldType: ... }`
    Wrapper(&'v Value),
    /// Anything else
    Kind,
}

fn marker(node: &Value) -> Marker<'_> {
    let Some(obj) = node.as_object() else {
        return Marker::Kind;
    };

    match obj.get("type").and_then(Value::as_str) {
        Some(tag) if tag.eq_ignore_ascii_case("optional") => {
            Marker::Optional(payload(obj, &["value", "shape", "inner"]))
        }
        Some(_) => Marker::Kind,
        None => match payload(obj, &["fieldType", "shape"]) {
            Some(inner) => Marker::Wrapper(inner),
            None => Marker::Kind,
        },
    }
}

/// First non-null entry under any of `keys`.
fn payload<'v>(obj: &'v Map<String, Value>, keys: &[&str]) -> Option<&'v Value> {
    keys.iter()
        .find_map(|key| obj.get(*key))
        .filter(|v| !v.is_null())
}

struct Normalizer<'a> {
    config: &'a EngineConfig,
}

impl Normalizer<'_> {
    /// A shape in a position that cannot be optional (root, array element,
    /// union variant, record key).
    fn shape(&self, node: &Value, path: &str, depth: usize) -> Shape {
        let (shape, optional) = self.slot(node, path, depth);
        if optional {
            warn!(
                event = %Event::OptionalMarkerStripped,
                path = display_path(path),
                "Optional marker outside a field position ignored"
            );
        }
        shape
    }

    /// A shape plus the optional flag accumulated while unwrapping markers.
    fn slot(&self, node: &Value, path: &str, depth: usize) -> (Shape, bool) {
        if depth > self.config.max_nesting_depth {
            return (self.degrade(path, "nesting too deep"), false);
        }

        let mut current = node;
        let mut optional = false;
        for _ in 0..=self.config.max_optional_depth {
            optional |= current
                .get("optional")
                .and_then(Value::as_bool)
                .unwrap_or(false);

            match marker(current) {
                Marker::Kind => return (self.kind(current, path, depth), optional),
                Marker::Wrapper(inner) => current = inner,
                Marker::Optional(Some(inner)) => {
                    optional = true;
                    current = inner;
                }
                Marker::Optional(None) => {
                    return (self.degrade(path, "optional marker without inner shape"), true);
                }
            }
        }

        (self.degrade(path, "optional markers nested too deeply"), optional)
    }

    fn kind(&self, node: &Value, path: &str, depth: usize) -> Shape {
        let Some(obj) = node.as_object() else {
            return self.degrade(path, "shape is not a JSON object");
        };
        let Some(tag) = obj.get("type").and_then(Value::as_str) else {
            return self.degrade(path, "shape has no type tag");
        };

        match tag.to_ascii_lowercase().as_str() {
            "null" => Shape::Null,
            "string" => Shape::String,
            "boolean" | "bool" => Shape::Boolean,
            "number" | "float64" | "float" => Shape::Float64,
            "bigint" | "int64" => Shape::Int64,
            "bytes" => Shape::Bytes,
            "any" | "unknown" => Shape::Any,
            "literal" => match obj.get("value").and_then(LiteralValue::from_value) {
                Some(literal) => Shape::Literal(literal),
                None => self.degrade(path, "literal without a scalar value"),
            },
            "id" => match obj.get("tableName").and_then(Value::as_str) {
                Some(table_name) => Shape::id(table_name),
                None => self.degrade(path, "id without tableName"),
            },
            "array" => match payload(obj, &["value", "element", "shape"]) {
                Some(element) => {
                    Shape::array(self.shape(element, &format!("{}[]", path), depth + 1))
                }
                None => self.degrade(path, "array without element shape"),
            },
            "object" => self.object(obj, path, depth),
            "record" => self.record(obj, path, depth),
            "union" => self.union(obj, path, depth),
            "never" => self.degrade(path, "uninhabited shape"),
            other => self.degrade(path, &format!("unknown shape kind '{}'", other)),
        }
    }

    fn object(&self, obj: &Map<String, Value>, path: &str, depth: usize) -> Shape {
        let fields = match payload(obj, &["value", "fields"]) {
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(name, entry)| self.field(name, entry, path, depth))
                .collect(),
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| {
                    let name = entry
                        .get("fieldName")
                        .or_else(|| entry.get("name"))
                        .and_then(Value::as_str);
                    match name {
                        Some(name) => Some(self.field(name, entry, path, depth)),
                        None => {
                            warn!(
                                event = %Event::ShapeDegraded,
                                path = display_path(path),
                                "Object field entry without a name skipped"
                            );
                            None
                        }
                    }
                })
                .collect(),
            _ => return self.degrade(path, "object without fields"),
        };

        Shape::Object(fields)
    }

    fn field(&self, name: &str, entry: &Value, path: &str, depth: usize) -> Field {
        let field_path = make_path(path, name);
        let (shape, optional) = self.slot(entry, &field_path, depth + 1);
        Field {
            name: name.to_string(),
            optional,
            shape,
        }
    }

    fn record(&self, obj: &Map<String, Value>, path: &str, depth: usize) -> Shape {
        let keys = payload(obj, &["keys", "keyShape"]);
        let values = payload(obj, &["values", "valueShape"]);

        match (keys, values) {
            (Some(keys), Some(values)) => {
                let keys = self.shape(keys, &make_path(path, "<key>"), depth + 1);
                let (field_type, optional) =
                    self.slot(values, &make_path(path, "<value>"), depth + 1);
                Shape::Record {
                    keys: Box::new(keys),
                    values: RecordValues {
                        field_type: Box::new(field_type),
                        optional,
                    },
                }
            }
            _ => self.degrade(path, "record without keys or values"),
        }
    }

    fn union(&self, obj: &Map<String, Value>, path: &str, depth: usize) -> Shape {
        match payload(obj, &["value", "variants", "shapes"]).and_then(Value::as_array) {
            Some(variants) if !variants.is_empty() => Shape::Union(
                variants
                    .iter()
                    .map(|variant| self.shape(variant, path, depth + 1))
                    .collect(),
            ),
            _ => self.degrade(path, "union without variants"),
        }
    }

    fn degrade(&self, path: &str, reason: &str) -> Shape {
        warn!(
            event = %Event::ShapeDegraded,
            path = display_path(path),
            reason,
            "Malformed shape node treated as v.any()"
        );
        Shape::Any
    }
}

/// Registry of the table schemas of one deployment.
///
/// Shape trees are snapshots: loading a table that is already registered
/// replaces it wholesale. Nothing is patched in place.
#[derive(Debug)]
pub struct SchemaLoader {
    config: EngineConfig,
    schema_validation: bool,
    tables: BTreeMap<String, TableSchema>,
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl SchemaLoader {
    /// Creates an empty loader with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty loader with the given configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            schema_validation: true,
            tables: BTreeMap::new(),
        }
    }

    /// Returns the loader configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Normalizes a decoded shape with this loader's configuration.
    pub fn load_shape(&self, node: &Value) -> Shape {
        load_shape(node, &self.config)
    }

    /// Parses one table schema and registers it, replacing any previous
    /// snapshot of the same table.
    pub fn load_table(&mut self, text: &str) -> ShapeResult<&TableSchema> {
        let table = parse_table_schema(text, &self.config)?;
        Ok(self.register(table))
    }

    /// Parses a whole database schema and replaces the registry with it.
    ///
    /// Returns the number of tables loaded. On error the registry is left
    /// untouched.
    pub fn load_database(&mut self, text: &str) -> ShapeResult<usize> {
        let database = parse_database_schema(text, &self.config)?;

        self.tables.clear();
        self.schema_validation = database.schema_validation;
        let count = database.tables.len();
        for table in database.tables {
            self.register(table);
        }

        Ok(count)
    }

    /// Registers a table schema, replacing any previous snapshot.
    pub fn register(&mut self, table: TableSchema) -> &TableSchema {
        match self.tables.entry(table.table_name.clone()) {
            Entry::Occupied(mut entry) => {
                debug!(
                    event = %Event::SchemaReplaced,
                    table = %table.table_name,
                    "Table schema replaced"
                );
                entry.insert(table);
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                debug!(
                    event = %Event::SchemaLoaded,
                    table = %table.table_name,
                    "Table schema loaded"
                );
                entry.insert(table)
            }
        }
    }

    /// Looks up a table schema by name.
    pub fn get(&self, table_name: &str) -> Option<&TableSchema> {
        self.tables.get(table_name)
    }

    /// Removes a table schema.
    pub fn remove(&mut self, table_name: &str) -> Option<TableSchema> {
        self.tables.remove(table_name)
    }

    /// Registered table names, sorted.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no table is registered.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Snapshot of the registry as a database schema, tables sorted by name.
    pub fn database(&self) -> DatabaseSchema {
        DatabaseSchema {
            tables: self.tables.values().cloned().collect(),
            schema_validation: self.schema_validation,
        }
    }
}
