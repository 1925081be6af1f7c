//! Country persistence
//!
//! The store maps a case-insensitive country name to one [`CountryRecord`].
//! [`repository`] holds the repository trait and its SQLite implementation;
//! this module resolves connection strings into a concrete repository.

pub mod repository;

use std::path::PathBuf;
use std::sync::Arc;

pub use repository::{CountryRepository, SqliteCountryRepository};

use crate::utils::error::StoreError;

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// Private in-memory database
    Memory,
    /// SQLite database file
    File(PathBuf),
}

impl DatabaseTarget {
    /// Parse a connection string
    ///
    /// URL forms follow the SQLAlchemy convention: `sqlite:///rel/path.db`
    /// is relative to the working directory, `sqlite:////abs/path.db` is
    /// absolute, and `sqlite://` or `sqlite:///:memory:` is an in-memory
    /// database. `sqlite::memory:`, `:memory:`, `sqlite:<path>` and a bare
    /// filesystem path are accepted too. A host part (`sqlite://host/...`)
    /// and any other scheme are rejected.
    pub fn parse(url: &str) -> Result<Self, StoreError> {
        let url = url.trim();
        let unsupported = || StoreError::UnsupportedUrl(url.to_string());

        if url.is_empty() {
            return Err(unsupported());
        }
        if url == "sqlite::memory:" || url == ":memory:" {
            return Ok(Self::Memory);
        }

        if let Some(rest) = url.strip_prefix("sqlite://") {
            if rest.is_empty() {
                return Ok(Self::Memory);
            }
            // Anything before the third slash would be a host
            let path = rest.strip_prefix('/').ok_or_else(unsupported)?;
            return match path {
                "" => Err(unsupported()),
                ":memory:" => Ok(Self::Memory),
                path => Ok(Self::File(PathBuf::from(path))),
            };
        }
        if let Some(path) = url.strip_prefix("sqlite:") {
            if path.is_empty() || path.starts_with('/') {
                return Err(unsupported());
            }
            return Ok(Self::File(PathBuf::from(path)));
        }
        if url.contains("://") {
            return Err(unsupported());
        }
        Ok(Self::File(PathBuf::from(url)))
    }
}

/// Open the repository described by a connection string
pub fn open_repository(url: &str) -> Result<Arc<dyn CountryRepository>, StoreError> {
    let repo = match DatabaseTarget::parse(url)? {
        DatabaseTarget::Memory => SqliteCountryRepository::in_memory()?,
        DatabaseTarget::File(path) => SqliteCountryRepository::new(path)?,
    };
    Ok(Arc::new(repo))
}
