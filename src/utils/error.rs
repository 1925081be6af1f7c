//! Error types for the leaf components
//!
//! This module defines the errors raised by the upstream clients, the record
//! builder, the country store and the summary renderer. They are folded into
//! the unified [`crate::error::Error`] by the refresh orchestrator.

use thiserror::Error;

/// Errors that can occur while fetching from an upstream source
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error (connection refused, DNS, TLS, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status code
    #[error("Upstream returned status {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Body could not be decoded into the expected JSON shape
    #[error("Decoding error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether the failure is worth another attempt
    ///
    /// Retry on timeouts, transport failures and
    /// 429 / 500 / 502 / 503 / 504. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Http(_) => true,
            Self::Status(code) => matches!(code, 429 | 500 | 502 | 503 | 504),
            Self::Decode(_) => false,
        }
    }
}

/// Errors that can occur while building records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Multiplier range is empty
    #[error("Invalid GDP multiplier range: {min}..={max}")]
    InvalidRange { min: u32, max: u32 },
}

/// Errors raised by the country store
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem error while preparing the database location
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection mutex poisoned by a panicking writer
    #[error("Store connection lock poisoned")]
    Poisoned,

    /// Unsupported connection string
    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),
}

/// Errors raised while producing the summary image
#[derive(Error, Debug)]
pub enum RenderError {
    /// SVG document rejected by the parser
    #[error("Failed to parse summary SVG: {0}")]
    Svg(String),

    /// Pixmap allocation failed (zero or oversized canvas)
    #[error("Failed to allocate {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },

    /// PNG encoding failed
    #[error("Failed to encode PNG: {0}")]
    Encode(String),

    /// Writing the artifact failed
    #[error("Failed to write summary image: {0}")]
    Io(#[from] std::io::Error),
}
