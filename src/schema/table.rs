//! Table schema definitions
//!
//! A table schema is one table's document shape plus its indexes. Staged
//! indexes are declared but not yet enforced; they are kept apart from the
//! active ones and never merged.

use serde::{Deserialize, Serialize};

use super::errors::ShapeResult;
use super::loader;
use super::types::{is_system_field, Field, Shape};
use crate::config::EngineConfig;

/// Database index over one or more fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    /// Index name
    #[serde(alias = "indexDescriptor")]
    pub name: String,
    /// Indexed field paths, in key order
    #[serde(default)]
    pub fields: Vec<String>,
}

impl Index {
    /// Create a new index
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Indexed fields with system fields filtered out
    pub fn user_fields(&self) -> Vec<&str> {
        user_fields(&self.fields)
    }
}

/// Full-text search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIndex {
    /// Index name
    #[serde(alias = "indexDescriptor")]
    pub name: String,
    /// Field holding the searchable text
    pub search_field: String,
    /// Fields usable as equality filters
    #[serde(default)]
    pub filter_fields: Vec<String>,
}

impl SearchIndex {
    /// Create a new search index
    pub fn new<I, S>(name: impl Into<String>, search_field: impl Into<String>, filter_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            search_field: search_field.into(),
            filter_fields: filter_fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// Vector similarity index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorIndex {
    /// Index name
    #[serde(alias = "indexDescriptor")]
    pub name: String,
    /// Field holding the embedding
    pub vector_field: String,
    /// Embedding dimensions
    pub dimensions: u32,
    /// Fields usable as equality filters
    #[serde(default)]
    pub filter_fields: Vec<String>,
}

impl VectorIndex {
    /// Create a new vector index
    pub fn new<I, S>(
        name: impl Into<String>,
        vector_field: impl Into<String>,
        dimensions: u32,
        filter_fields: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            vector_field: vector_field.into(),
            dimensions,
            filter_fields: filter_fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// One table's declaration.
///
/// `document_type`, when present, is an object or a union of objects; the
/// loader enforces this. `None` means the table is schemaless.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    /// Table name
    pub table_name: String,
    /// Shape of every document in the table
    pub document_type: Option<Shape>,
    /// Active database indexes
    pub indexes: Vec<Index>,
    /// Active search indexes
    pub search_indexes: Vec<SearchIndex>,
    /// Active vector indexes
    pub vector_indexes: Vec<VectorIndex>,
    /// Staged database indexes
    pub staged_indexes: Vec<Index>,
    /// Staged search indexes
    pub staged_search_indexes: Vec<SearchIndex>,
    /// Staged vector indexes
    pub staged_vector_indexes: Vec<VectorIndex>,
}

impl TableSchema {
    /// Create a table schema with no indexes
    pub fn new(table_name: impl Into<String>, document_type: Option<Shape>) -> Self {
        Self {
            table_name: table_name.into(),
            document_type,
            indexes: Vec::new(),
            search_indexes: Vec::new(),
            vector_indexes: Vec::new(),
            staged_indexes: Vec::new(),
            staged_search_indexes: Vec::new(),
            staged_vector_indexes: Vec::new(),
        }
    }

    /// Parse a table schema from JSON using the default configuration
    pub fn from_json(text: &str) -> ShapeResult<Self> {
        loader::parse_table_schema(text, &EngineConfig::default())
    }

    /// Add an active index
    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Add an active search index
    pub fn with_search_index(mut self, index: SearchIndex) -> Self {
        self.search_indexes.push(index);
        self
    }

    /// Add an active vector index
    pub fn with_vector_index(mut self, index: VectorIndex) -> Self {
        self.vector_indexes.push(index);
        self
    }

    /// Add a staged index
    pub fn with_staged_index(mut self, index: Index) -> Self {
        self.staged_indexes.push(index);
        self
    }

    /// Add a staged search index
    pub fn with_staged_search_index(mut self, index: SearchIndex) -> Self {
        self.staged_search_indexes.push(index);
        self
    }

    /// Add a staged vector index
    pub fn with_staged_vector_index(mut self, index: VectorIndex) -> Self {
        self.staged_vector_indexes.push(index);
        self
    }

    /// Top-level declared fields; empty for schemaless and union tables.
    pub fn fields(&self) -> &[Field] {
        match &self.document_type {
            Some(shape) => shape.fields(),
            None => &[],
        }
    }

    /// Top-level user fields that reference another table, with the
    /// table they point at.
    pub fn reference_fields(&self) -> Vec<(&str, &str)> {
        self.fields()
            .iter()
            .filter(|f| !f.is_system())
            .filter_map(|f| f.shape.referenced_table().map(|t| (f.name.as_str(), t)))
            .collect()
    }
}

/// Every table of a deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSchema {
    /// Table declarations
    pub tables: Vec<TableSchema>,
    /// Whether documents are validated on write
    pub schema_validation: bool,
}

impl DatabaseSchema {
    /// Create a database schema with validation enabled
    pub fn new(tables: Vec<TableSchema>) -> Self {
        Self {
            tables,
            schema_validation: true,
        }
    }

    /// Parse a database schema from JSON using the default configuration
    pub fn from_json(text: &str) -> ShapeResult<Self> {
        loader::parse_database_schema(text, &EngineConfig::default())
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.table_name == name)
    }
}

pub(crate) fn user_fields(fields: &[String]) -> Vec<&str> {
    fields
        .iter()
        .map(String::as_str)
        .filter(|f| !is_system_field(f))
        .collect()
}
