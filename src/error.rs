//! Error types for the free-swimming tracker library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Results archive could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Video could not be opened for reading or writing
    #[error("Failed to open video: {0}")]
    VideoOpen(String),

    /// Background model could not be computed or loaded
    #[error("Background error: {0}")]
    Background(String),

    /// No pixel in the preprocessed frame rises above the pixel threshold
    #[error("No signal: frame maximum {max} does not exceed pixel threshold {threshold}")]
    NoSignal {
        /// Brightest value found in the frame
        max: u8,
        /// Threshold the maximum had to exceed
        threshold: u8,
    },

    /// Landmark geometry could not be resolved (missing contour, zero area, ...)
    #[error("Degenerate geometry: {0}")]
    Degenerate(String),

    /// Generic I/O error with description
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
