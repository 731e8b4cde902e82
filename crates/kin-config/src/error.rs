//! Config-layer error type.

use thiserror::Error;

/// Failures from reading, parsing, or validating on-disk configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The home directory could not be determined.
    #[error("could not determine a home directory")]
    NoHomeDir,
    /// A file existed but could not be read.
    #[error("failed to read {path}: {source}")]
    ReadError {
        /// Path that failed to read.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// A file existed and was read but failed to parse as TOML.
    #[error("failed to parse {path}: {source}")]
    ParseError {
        /// Path that failed to parse.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// A file existed and was read but failed to parse as JSON.
    #[error("failed to parse {path}: {source}")]
    JsonError {
        /// Path that failed to parse.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The merged configuration failed validation.
    #[error("invalid config field {field}: {message}")]
    ValidationError {
        /// Name of the offending field.
        field: String,
        /// Human-readable explanation.
        message: String,
    },
}

/// Convenience alias for this crate's `Result`.
pub type ConfigResult<T> = Result<T, ConfigError>;
