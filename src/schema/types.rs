//! Shape model for table documents
//!
//! Supported kinds:
//! - null, string, boolean, float64, int64, bytes, any: leaves
//! - literal: exactly one string, number or boolean
//! - id: string reference to a document in a named table
//! - array: homogeneous sequence
//! - object: named field set
//! - record: string-keyed map with a uniform value shape
//! - union: value matches at least one variant
//!
//! Optionality is not a kind. It is a flag on the enclosing `Field` (or on
//! `RecordValues`), set once by the loader.

use serde_json::{Number, Value};

/// Prefix reserved for system-owned fields (`_id`, `_creationTime`).
pub const SYSTEM_FIELD_PREFIX: char = '_';

/// Returns true if `name` is a system-owned field.
///
/// System fields are assigned by storage; they are skipped by validation,
/// rendering and synthesis alike.
pub fn is_system_field(name: &str) -> bool {
    name.starts_with(SYSTEM_FIELD_PREFIX)
}

/// Concrete value matched by a literal shape.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// String literal
    String(String),
    /// Numeric literal
    Number(Number),
    /// Boolean literal
    Boolean(bool),
}

impl LiteralValue {
    /// Converts a decoded JSON scalar into a literal.
    ///
    /// Returns `None` for null, arrays and objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(LiteralValue::String(s.clone())),
            Value::Number(n) => Some(LiteralValue::Number(n.clone())),
            Value::Bool(b) => Some(LiteralValue::Boolean(*b)),
            _ => None,
        }
    }

    /// Returns the literal as a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            LiteralValue::String(s) => Value::String(s.clone()),
            LiteralValue::Number(n) => Value::Number(n.clone()),
            LiteralValue::Boolean(b) => Value::Bool(*b),
        }
    }

    /// Strict equality against a document value. No coercion across types;
    /// numbers compare by numeric value so `1` matches `1.0`.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (LiteralValue::String(expected), Value::String(actual)) => expected == actual,
            (LiteralValue::Boolean(expected), Value::Bool(actual)) => expected == actual,
            (LiteralValue::Number(expected), Value::Number(actual)) => {
                // integers compare exactly; f64 would merge values above 2^53
                if let (Some(a), Some(b)) = (expected.as_i64(), actual.as_i64()) {
                    return a == b;
                }
                if let (Some(a), Some(b)) = (expected.as_u64(), actual.as_u64()) {
                    return a == b;
                }
                if expected.is_f64() || actual.is_f64() {
                    if let (Some(a), Some(b)) = (expected.as_f64(), actual.as_f64()) {
                        return a == b;
                    }
                }
                expected == actual
            }
            _ => false,
        }
    }
}

impl From<&str> for LiteralValue {
    fn from(value: &str) -> Self {
        LiteralValue::String(value.to_string())
    }
}

impl From<String> for LiteralValue {
    fn from(value: String) -> Self {
        LiteralValue::String(value)
    }
}

impl From<bool> for LiteralValue {
    fn from(value: bool) -> Self {
        LiteralValue::Boolean(value)
    }
}

impl From<i64> for LiteralValue {
    fn from(value: i64) -> Self {
        LiteralValue::Number(Number::from(value))
    }
}

impl From<i32> for LiteralValue {
    fn from(value: i32) -> Self {
        LiteralValue::Number(Number::from(value))
    }
}

/// A named field of an object shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Whether the field may be absent
    pub optional: bool,
    /// Shape of the field's value
    pub shape: Shape,
}

impl Field {
    /// Create a field that must be present
    pub fn required(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            optional: false,
            shape,
        }
    }

    /// Create a field that may be absent
    pub fn optional(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            optional: true,
            shape,
        }
    }

    /// Returns true if this is a system-owned field
    pub fn is_system(&self) -> bool {
        is_system_field(&self.name)
    }
}

/// Value side of a record shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordValues {
    /// Shape every value must match
    pub field_type: Box<Shape>,
    /// Whether entries may hold null
    pub optional: bool,
}

/// Recursive description of a value space.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Exactly null
    Null,
    /// UTF-8 string
    String,
    /// Boolean
    Boolean,
    /// 64-bit float (any JSON number)
    Float64,
    /// 64-bit signed integer
    Int64,
    /// Binary data, base64 encoded in JSON
    Bytes,
    /// Anything, including absence
    Any,
    /// Exactly one concrete value
    Literal(LiteralValue),
    /// Reference to a document in `table_name`
    Id {
        /// Target table
        table_name: String,
    },
    /// Homogeneous array (boxed to allow recursive types)
    Array(Box<Shape>),
    /// Named fields, in declaration order
    Object(Vec<Field>),
    /// Open-ended string-keyed map
    Record {
        /// Shape of the keys
        keys: Box<Shape>,
        /// Shape of the values
        values: RecordValues,
    },
    /// At least one variant must match
    Union(Vec<Shape>),
}

impl Shape {
    /// Create an object shape
    pub fn object(fields: Vec<Field>) -> Self {
        Shape::Object(fields)
    }

    /// Create an array shape
    pub fn array(element: Shape) -> Self {
        Shape::Array(Box::new(element))
    }

    /// Create a union shape
    pub fn union(variants: Vec<Shape>) -> Self {
        Shape::Union(variants)
    }

    /// Create an id shape targeting `table_name`
    pub fn id(table_name: impl Into<String>) -> Self {
        Shape::Id {
            table_name: table_name.into(),
        }
    }

    /// Create a literal shape
    pub fn literal(value: impl Into<LiteralValue>) -> Self {
        Shape::Literal(value.into())
    }

    /// Create a record shape
    pub fn record(keys: Shape, values: Shape, optional: bool) -> Self {
        Shape::Record {
            keys: Box::new(keys),
            values: RecordValues {
                field_type: Box::new(values),
                optional,
            },
        }
    }

    /// Returns the kind name for log lines
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Null => "null",
            Shape::String => "string",
            Shape::Boolean => "boolean",
            Shape::Float64 => "float64",
            Shape::Int64 => "int64",
            Shape::Bytes => "bytes",
            Shape::Any => "any",
            Shape::Literal(_) => "literal",
            Shape::Id { .. } => "id",
            Shape::Array(_) => "array",
            Shape::Object(_) => "object",
            Shape::Record { .. } => "record",
            Shape::Union(_) => "union",
        }
    }

    /// Declared fields of an object shape; empty for every other kind.
    pub fn fields(&self) -> &[Field] {
        match self {
            Shape::Object(fields) => fields,
            _ => &[],
        }
    }

    /// Target table of a reference-typed shape: an id, or an array of ids.
    pub fn referenced_table(&self) -> Option<&str> {
        match self {
            Shape::Id { table_name } => Some(table_name),
            Shape::Array(element) => match element.as_ref() {
                Shape::Id { table_name } => Some(table_name),
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether this shape may describe a whole document: an object, or a
    /// non-empty union of document shapes.
    pub fn is_document_type(&self) -> bool {
        match self {
            Shape::Object(_) => true,
            Shape::Union(variants) => {
                !variants.is_empty() && variants.iter().all(Shape::is_document_type)
            }
            _ => false,
        }
    }
}

/// Creates a field path from prefix and field name.
pub(crate) fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}
