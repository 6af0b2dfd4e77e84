//! Unified error handling for the map engine.
//!
//! Geometry and cache errors propagate to the immediate caller. Degenerate
//! traces and stale surface events are not errors and never reach this type.

use thiserror::Error;

/// Unified error type for map engine operations.
///
/// `Clone` is required: one in-flight trace decode hands the same outcome to
/// every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    /// Fetching a raw track or record set failed
    #[error("{}", fetch_message(.reference, .message, .status_code))]
    Fetch {
        reference: String,
        message: String,
        status_code: Option<u16>,
    },
    /// A raw track resource could not be parsed
    #[error("Route '{route_id}' track could not be decoded: {message}")]
    Decode { route_id: String, message: String },
    /// No route record is known for the identifier
    #[error("Unknown route '{route_id}'")]
    UnknownRoute { route_id: String },
    /// Invalid configuration value
    #[error("Configuration error: {message}")]
    Config { message: String },
    /// The owning map session was torn down
    #[error("Map session is closed")]
    SessionClosed,
    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn fetch_message(reference: &str, message: &str, status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!("Fetch of '{}' failed ({}): {}", reference, code, message),
        None => format!("Fetch of '{}' failed: {}", reference, message),
    }
}

impl MapError {
    /// Build a fetch error without an HTTP status.
    pub fn fetch(reference: &str, message: impl Into<String>) -> Self {
        MapError::Fetch {
            reference: reference.to_string(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Build a decode error for a route's track.
    pub fn decode(route_id: &str, message: impl Into<String>) -> Self {
        MapError::Decode {
            route_id: route_id.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for map engine operations.
pub type Result<T> = std::result::Result<T, MapError>;

/// Extension trait for converting Option to MapError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an unknown route error.
    fn ok_or_unknown_route(self, route_id: &str) -> Result<T>;

    /// Convert Option to Result with generic internal error.
    fn ok_or_internal(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_unknown_route(self, route_id: &str) -> Result<T> {
        self.ok_or_else(|| MapError::UnknownRoute {
            route_id: route_id.to_string(),
        })
    }

    fn ok_or_internal(self, message: &str) -> Result<T> {
        self.ok_or_else(|| MapError::Internal {
            message: message.to_string(),
        })
    }
}
