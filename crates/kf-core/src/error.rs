//! Error types for kinfit

use thiserror::Error;

/// kinfit error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed configuration (coefficient files, bin tables). Fatal at construction.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A region value lies outside every configured bin.
    #[error("{kind}: |region| = {value} exceeds last bin boundary {limit}")]
    OutOfRange {
        /// Object kind (or table) the lookup was made for.
        kind: String,
        /// Offending region value.
        value: f64,
        /// Upper edge of the last configured bin.
        limit: f64,
    },

    /// Validation error (caller contract violations)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
