//! Engine configuration
//!
//! Defaults reproduce the schema viewer's output exactly; hosts only
//! override them to match a different code style. The engine performs no
//! I/O, so configuration arrives as a value or as JSON text embedded in the
//! host's own settings.

use serde::{Deserialize, Serialize};

use crate::schema::{ShapeError, ShapeResult};

/// Formatting knobs for the validator-expression renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    /// Spaces per nesting level.
    pub indent_width: usize,
    /// A union with more variants than this renders one variant per line.
    pub union_inline_max_variants: usize,
    /// A union with any variant longer than this (in chars) renders one
    /// variant per line.
    pub union_inline_max_len: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent_width: 2,
            union_inline_max_variants: 2,
            union_inline_max_len: 30,
        }
    }
}

impl RenderConfig {
    /// Leading whitespace for the given nesting level.
    pub fn indent(&self, depth: usize) -> String {
        " ".repeat(self.indent_width * depth)
    }

    /// Whether already-rendered union variants go one per line.
    pub fn union_is_multiline(&self, variants: &[String]) -> bool {
        variants.len() > self.union_inline_max_variants
            || variants
                .iter()
                .any(|v| v.chars().count() > self.union_inline_max_len)
    }
}

/// Configuration for shape ingestion and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Renderer formatting.
    pub render: RenderConfig,
    /// Maximum stacked optional markers unwrapped on one node.
    pub max_optional_depth: usize,
    /// Maximum shape nesting accepted by the loader.
    pub max_nesting_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            max_optional_depth: 8,
            max_nesting_depth: 64,
        }
    }
}

impl EngineConfig {
    /// Parse configuration from JSON. Missing keys take their defaults.
    pub fn from_json(text: &str) -> ShapeResult<Self> {
        serde_json::from_str(text).map_err(|e| ShapeError::invalid_json("engine config", e))
    }
}
