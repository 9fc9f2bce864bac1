//! Error types for relay operations

use thiserror::Error;

/// Failures raised by a scheduled data source while downloading and
/// persisting a dataset.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Download script {script} failed: {reason}")]
    Script { script: String, reason: String },

    #[error("Could not encode {what}: {reason}")]
    Encode { what: String, reason: String },

    #[error("Initial fetch for {service} failed: {reason}")]
    InitialFetch { service: String, reason: String },
}

/// Failures from an on-demand details lookup.
///
/// A definitive "not found" is not an error; see [`crate::Answer::NotFound`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Unexpected payload: {0}")]
    Parse(String),
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all relay errors.
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_display_http() {
        let err = SourceError::Http {
            url: "https://example.test/feed".to_string(),
            reason: "status 503".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("https://example.test/feed"));
        assert!(msg.contains("status 503"));
    }

    #[test]
    fn test_fetch_error_display() {
        assert_eq!(
            FetchError::Parse("missing content".to_string()).to_string(),
            "Unexpected payload: missing content"
        );
    }

    #[test]
    fn test_relay_error_from_config() {
        let err: RelayError = ConfigError::MissingRequired {
            field: "poll_interval".to_string(),
        }
        .into();
        assert!(matches!(err, RelayError::Config(_)));
        assert!(err.to_string().starts_with("Config error:"));
    }

    #[test]
    fn test_relay_error_from_source() {
        let err: RelayError = SourceError::InitialFetch {
            service: "GTFS".to_string(),
            reason: "timeout".to_string(),
        }
        .into();
        assert!(matches!(err, RelayError::Source(SourceError::InitialFetch { .. })));
    }
}
