//! Observable events for the shape engine
//!
//! Every log line the engine emits carries one of these as its `event`
//! field, so log consumers can match on stable names instead of messages.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Ingestion
    /// Malformed shape node replaced by `v.any()`
    ShapeDegraded,
    /// Optional marker found outside a field position and dropped
    OptionalMarkerStripped,
    /// Document type was not an object or union of objects
    DocumentTypeRejected,
    /// Table schema registered
    SchemaLoaded,
    /// Registered table schema replaced by a newer snapshot
    SchemaReplaced,

    // Engine operations
    /// Document validated
    DocumentValidated,
    /// Default document synthesized
    DocumentSynthesized,
    /// Table declaration rendered
    TableRendered,
    /// Table declaration inferred from sampled documents
    TableInferred,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ShapeDegraded => "SHAPE_DEGRADED",
            Event::OptionalMarkerStripped => "OPTIONAL_MARKER_STRIPPED",
            Event::DocumentTypeRejected => "DOCUMENT_TYPE_REJECTED",
            Event::SchemaLoaded => "SCHEMA_LOADED",
            Event::SchemaReplaced => "SCHEMA_REPLACED",
            Event::DocumentValidated => "DOCUMENT_VALIDATED",
            Event::DocumentSynthesized => "DOCUMENT_SYNTHESIZED",
            Event::TableRendered => "TABLE_RENDERED",
            Event::TableInferred => "TABLE_INFERRED",
        }
    }

    /// Returns true if the event reports input that was repaired
    pub fn is_degradation(&self) -> bool {
        matches!(
            self,
            Event::ShapeDegraded | Event::OptionalMarkerStripped | Event::DocumentTypeRejected
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
