//! shape-engine - Validate, render and synthesize table documents
//!
//! Works over a normalized `Shape` tree describing one table's documents.

pub mod config;
pub mod observability;
pub mod schema;

pub use config::{EngineConfig, RenderConfig};
pub use schema::{
    infer_table, render, render_schema, render_table, synthesize, synthesize_table, validate,
    validate_document, DatabaseSchema, Field, SchemaLoader, Shape, ShapeError, ShapeResult,
    TableSchema,
};
