//! Error taxonomy: configuration faults, invariant breaches, and input gaps.

use thiserror::Error;

/// Errors surfaced by scenario configuration and simulation.
///
/// The simulation itself is deterministic given seed and inputs, so there
/// are no retryable variants: every error here is fatal to the run.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid configuration, detected before any simulation runs.
    #[error("config error: {field} — {message}")]
    Configuration {
        /// Dotted field path (e.g., `"sources[2].start_year"`).
        field: String,
        /// Human-readable constraint description.
        message: String,
    },

    /// A bounds breach inside the dispatch engine. Indicates a bug.
    #[error("invariant violated for \"{source_name}\" at y{year} m{month} d{day} h{hour}: {message}")]
    InvariantViolation {
        /// Name of the offending source.
        source_name: String,
        year: usize,
        month: usize,
        day: usize,
        hour: usize,
        message: String,
    },

    /// A load or solar-profile cell was missing or non-finite.
    #[error("missing input data: {0}")]
    DataGap(String),
}

impl SimError {
    /// Shorthand for a configuration error with a field path.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }
}
