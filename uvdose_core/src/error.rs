//! Error types for the uvdose_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for uvdose_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Forecast payload is missing fields, mismatched, or malformed
    #[error("Invalid forecast data: {0}")]
    InvalidForecastData(String),

    /// Skin class is not one of I..VI (or not present in the MED table)
    #[error("Unknown skin class: {0} (use I, II, III, IV, V, VI)")]
    UnknownSkinClass(String),

    /// Safety margin outside (0, 1]
    #[error("Invalid safety margin: {0} (must be in (0, 1])")]
    InvalidMargin(f64),

    /// Bisection precision below one second
    #[error("Invalid search precision: {0}s (must be at least 1s)")]
    InvalidPrecision(i64),

    /// Forecast does not cover the exposure window and the policy forbids assuming safety
    #[error("Forecast for zone {zone} does not cover the rest of the day")]
    InsufficientCoverage { zone: String },
}
