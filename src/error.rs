//! Error types for rigdrive

use thiserror::Error;

/// Main error type for rigdrive
#[derive(Error, Debug)]
pub enum RigdriveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Rigged model runtime errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("No model is attached")]
    NotLoaded,

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Parameter {id} rejected value {value}")]
    Rejected { id: String, value: f32 },

    #[error("Unknown expression: {0}")]
    UnknownExpression(String),

    #[error("Unknown motion: {group}[{index}]")]
    UnknownMotion { group: String, index: usize },
}

/// Speech synthesis errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpeechError {
    #[error("Speech synthesis is unavailable")]
    Unavailable,

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),
}

/// Result type alias for rigdrive operations
pub type Result<T> = std::result::Result<T, RigdriveError>;
