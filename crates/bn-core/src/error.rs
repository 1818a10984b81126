//! Error types for bn-core

use thiserror::Error;

/// Core error type for Bottleneck
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Invalid configuration value
    #[error("[E002] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E003: Invalid table or column identifier
    #[error("[E003] Invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// E004: Step referenced but never declared
    #[error("[E004] Unknown step: {name}")]
    UnknownStep { name: String },

    /// E005: Step declared twice
    #[error("[E005] Duplicate step: {name}")]
    DuplicateStep { name: String },

    /// E006: Circular dependency between steps
    #[error("[E006] Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// E007: Malformed transform definition
    #[error("[E007] Invalid transform: {message}")]
    InvalidTransform { message: String },

    /// E008: IO error
    #[error("[E008] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E009: IO error with file path context
    #[error("[E009] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E010: YAML parse error
    #[error("[E010] Config parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
