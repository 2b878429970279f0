//! Observability for the shape engine
//!
//! The engine logs through `tracing` and never installs a subscriber; the
//! host decides where lines go.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. Every line carries a stable `event` name
//! 3. Repaired input is logged at WARN, routine operations at DEBUG
//!
//! # Usage
//!
//! ```ignore
//! tracing::warn!(event = %Event::ShapeDegraded, path = "author", "...");
//! ```

mod events;

pub use events::Event;

/// Display form of a field path in log lines.
pub(crate) fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}
