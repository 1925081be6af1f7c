//! Unified error handling for the country-atlas crate
//!
//! Leaf components raise their own errors ([`FetchError`], [`StoreError`],
//! [`RenderError`], [`BuildError`]). The refresh orchestrator and the API
//! surface work with the unified [`Error`], whose variants carry the
//! service-level taxonomy:
//!
//! - `UpstreamUnavailable` - an external source could not be reached
//! - `ProcessingFailed` - fetched data could not be transformed
//! - `PersistenceFailed` - the write transaction failed and was rolled back
//! - `NotFound` - lookup or delete target absent
//!
//! # Usage
//!
//! ```rust,ignore
//! use country_atlas::error::{AtlasErrorTrait, Error, ErrorCategory};
//!
//! fn handle_error(err: Error) {
//!     if err.category() == ErrorCategory::Upstream {
//!         eprintln!("upstream down: {err}");
//!     }
//! }
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

pub use crate::utils::error::{BuildError, FetchError, RenderError, StoreError};

/// Common trait for all country-atlas error types
pub trait AtlasErrorTrait: std::error::Error {
    /// Check if this error is recoverable (a later retry may succeed)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// External source unreachable or misbehaving
    Upstream,
    /// Transforming fetched data failed
    Processing,
    /// Storage and transaction errors
    Persistence,
    /// Requested entity does not exist
    NotFound,
    /// Summary image generation
    Render,
    /// Configuration and validation errors
    Config,
}

impl ErrorCategory {
    /// Short label used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upstream => "upstream",
            Self::Processing => "processing",
            Self::Persistence => "persistence",
            Self::NotFound => "not_found",
            Self::Render => "render",
            Self::Config => "config",
        }
    }
}

/// Which external source a failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    Countries,
    Rates,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Countries => "countries",
            Self::Rates => "rates",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the country-atlas crate
#[derive(Error, Debug)]
pub enum Error {
    /// Network/HTTP failure reaching an external source
    #[error("External data source unavailable ({upstream}): {cause}")]
    UpstreamUnavailable {
        upstream: Upstream,
        #[source]
        cause: FetchError,
    },

    /// Unexpected failure transforming fetched data
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    /// Transactional write failed; the batch was rolled back
    #[error("Persistence failed: {0}")]
    PersistenceFailed(#[source] StoreError),

    /// Lookup or delete target absent
    #[error("Country not found: {0}")]
    NotFound(String),

    /// Store error outside a refresh write
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Summary image generation failed
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl AtlasErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        self.is_transient()
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Upstream
    }
}

impl AtlasErrorTrait for StoreError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            Self::Io(_) => true,
            _ => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedUrl(_) => ErrorCategory::Config,
            _ => ErrorCategory::Persistence,
        }
    }
}

impl AtlasErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::UpstreamUnavailable { cause, .. } => cause.is_recoverable(),
            Self::PersistenceFailed(e) | Self::Store(e) => e.is_recoverable(),
            Self::Io(_) => true,
            Self::ProcessingFailed(_)
            | Self::NotFound(_)
            | Self::Render(_)
            | Self::Config(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::UpstreamUnavailable { .. } => ErrorCategory::Upstream,
            Self::ProcessingFailed(_) => ErrorCategory::Processing,
            Self::PersistenceFailed(_) | Self::Io(_) => ErrorCategory::Persistence,
            Self::Store(e) => e.category(),
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Render(_) => ErrorCategory::Render,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a fetch failure for the given source
    pub fn upstream(upstream: Upstream, cause: FetchError) -> Self {
        Self::UpstreamUnavailable { upstream, cause }
    }

    /// Render the error and its full source chain on one line
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            let msg = err.to_string();
            if !out.contains(&msg) {
                out.push_str(": ");
                out.push_str(&msg);
            }
            source = err.source();
        }
        out
    }
}

impl From<BuildError> for Error {
    fn from(err: BuildError) -> Self {
        Self::ProcessingFailed(err.to_string())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
