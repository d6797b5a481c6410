//! Unified error handling for the street-matcher library.
//!
//! This module provides a consistent error type for all street-matcher
//! operations. Empty inputs are deliberately not errors: a region with no
//! tracks or no streets produces an empty result, not a failure.

use std::fmt;

/// Unified error type for street-matcher operations.
#[derive(Debug, Clone)]
pub enum StreetMatchError {
    /// Geometry rejected at ingestion (non-finite coordinates, zero-length street)
    MalformedGeometry { id: String, message: String },
    /// Configuration rejected at validation time
    ConfigError { message: String },
    /// GeoJSON parse or serialization error
    GeoJsonError { message: String },
    /// Upstream fetch failure (HTTP/API)
    HttpError {
        message: String,
        status_code: Option<u16>,
    },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for StreetMatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreetMatchError::MalformedGeometry { id, message } => {
                write!(f, "Malformed geometry '{}': {}", id, message)
            }
            StreetMatchError::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            StreetMatchError::GeoJsonError { message } => {
                write!(f, "GeoJSON error: {}", message)
            }
            StreetMatchError::HttpError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "HTTP error ({}): {}", code, message)
                } else {
                    write!(f, "HTTP error: {}", message)
                }
            }
            StreetMatchError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for StreetMatchError {}

/// Result type alias for street-matcher operations.
pub type Result<T> = std::result::Result<T, StreetMatchError>;

impl StreetMatchError {
    /// Construct a malformed-geometry error for the given entity id.
    pub fn malformed(id: impl Into<String>, message: impl Into<String>) -> Self {
        StreetMatchError::MalformedGeometry {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Construct a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        StreetMatchError::ConfigError {
            message: message.into(),
        }
    }
}
