//! Error types for OpenWarrant
//!
//! Decisions (NO_WARRANT, EXPIRED, DENIED, ESCALATE) are never errors.
//! Errors are reserved for malformed input and unreadable catalogs.

use thiserror::Error;

/// Result type for OpenWarrant operations
pub type Result<T> = std::result::Result<T, OpenWarrantError>;

/// OpenWarrant error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenWarrantError {
    // ========================================================================
    // Request Errors
    // ========================================================================

    /// A required request field is missing or blank
    #[error("Invalid request: required field '{field}' is missing or empty")]
    InvalidRequest { field: String },

    // ========================================================================
    // Warrant Errors
    // ========================================================================

    /// A condition entry could not be interpreted
    #[error("Invalid condition '{name}': {reason}")]
    InvalidCondition { name: String, reason: String },

    // ========================================================================
    // Catalog Errors
    // ========================================================================

    /// Catalog path does not exist
    #[error("Warrant catalog not found: {path}")]
    CatalogNotFound { path: String },

    /// Catalog path exists but could not be read
    #[error("Failed to read warrant catalog {path}: {message}")]
    CatalogIo { path: String, message: String },

    /// Catalog file could not be parsed into a warrant
    #[error("Failed to parse warrant file {path}: {message}")]
    CatalogParse { path: String, message: String },

    // ========================================================================
    // Serialization Errors
    // ========================================================================

    /// JSON serialization or deserialization failed
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl OpenWarrantError {
    /// Shorthand for a blank request field
    pub fn invalid_request(field: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.into(),
        }
    }

    /// Whether this error was raised while loading a catalog
    pub fn is_catalog_error(&self) -> bool {
        matches!(
            self,
            Self::CatalogNotFound { .. } | Self::CatalogIo { .. } | Self::CatalogParse { .. }
        )
    }
}

impl From<serde_json::Error> for OpenWarrantError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}
