//! country-atlas - Country data cache with estimated GDP
//!
//! Fetches country metadata and USD exchange rates from two public APIs,
//! merges them into per-country records with a randomized GDP estimate,
//! persists them in SQLite and serves them over HTTP together with a
//! summary image.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`sources`] - Upstream HTTP clients with retry
//! - [`builder`] - Merging upstream payloads into country records
//! - [`storage`] - Repository trait and SQLite implementation
//! - [`render`] - Summary image generation
//! - [`refresh`] - The fetch, build, persist, summarize pipeline
//! - [`server`] - REST API
//! - [`models`] - Core data structures and types
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use country_atlas::config::Config;
//! use country_atlas::server::AppState;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let state = AppState::from_config(&config)?;
//!     let report = state.orchestrator.refresh().await?;
//!     println!("{} countries cached", report.total_countries);
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod models;
pub mod refresh;
pub mod render;
pub mod server;
pub mod sources;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::builder::{FixedMultiplier, MultiplierSource, RandomMultiplier, RecordBuilder};
    pub use crate::config::Config;
    pub use crate::error::{AtlasErrorTrait, Error, ErrorCategory, Result, Upstream};
    pub use crate::models::{CountryFilter, CountryRecord, GdpRanking, NewCountry, SortOrder, StatusSnapshot};
    pub use crate::refresh::{RefreshOrchestrator, RefreshReport};
    pub use crate::render::SummaryRenderer;
    pub use crate::sources::SourceClient;
    pub use crate::storage::{CountryRepository, SqliteCountryRepository};
}

// Direct re-exports for convenience
pub use models::{CountryRecord, NewCountry};
