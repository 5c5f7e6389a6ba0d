//! Error types for the data model

/// Errors raised while parsing or validating model records
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Identifier is not a valid ULID
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Unknown enumeration label
    #[error("unknown {kind}: '{value}'")]
    UnknownVariant {
        /// Enumeration name (severity, category, ...)
        kind: &'static str,
        /// Rejected label
        value: String,
    },

    /// Score outside of the unit interval
    #[error("{field} must be within [0, 1], got {value}")]
    OutOfRange {
        /// Field name
        field: &'static str,
        /// Rejected value, formatted
        value: String,
    },
}

impl ModelError {
    /// Create unknown variant error
    #[inline]
    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.into(),
        }
    }
}
