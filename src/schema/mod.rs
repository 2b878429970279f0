//! Shape engine for table documents
//!
//! A table's document shape arrives as JSON from the storage layer, is
//! normalized once into a `Shape` tree, and is then consumed by three
//! independent operations: validation, rendering and synthesis.
//!
//! # Design Principles
//!
//! - Optionality lives on the field, never on the shape
//! - Malformed shape nodes degrade to `Any`, they never fail a whole table
//! - Validation accumulates every problem, it never stops at the first
//! - System fields (`_`-prefixed) are assigned by storage and skipped everywhere
//! - Every operation is a pure function of its input

mod errors;
mod infer;
mod loader;
mod render;
mod synth;
mod table;
mod types;
mod validator;

pub use errors::{ShapeError, ShapeResult};
pub use infer::{infer_fields, infer_table, infer_table_with, ObservedField, ObservedType};
pub use loader::{load_shape, parse_database_schema, parse_table_schema, parse_table_value, SchemaLoader};
pub use render::{compact, literal_text, render, render_schema, render_table, Renderer};
pub use synth::{default_value, synthesize, synthesize_table, Document};
pub use table::{DatabaseSchema, Index, SearchIndex, TableSchema, VectorIndex};
pub use types::{is_system_field, Field, LiteralValue, RecordValues, Shape, SYSTEM_FIELD_PREFIX};
pub use validator::{is_assignable, validate, validate_document};
