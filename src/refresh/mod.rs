//! Refresh orchestrator
//!
//! One refresh is a single unit of work:
//!
//! ```text
//! countries source ──┐
//!                    ├─► RecordBuilder ─► upsert batch (one tx) ─► summary image
//! rates source ──────┘
//! ```
//!
//! Failure contract:
//!
//! | step                 | error                              | state written |
//! |----------------------|------------------------------------|---------------|
//! | fetch countries      | `UpstreamUnavailable(countries)`   | none          |
//! | fetch rates          | `UpstreamUnavailable(rates)`       | none          |
//! | build records        | `ProcessingFailed`                 | none          |
//! | upsert batch         | `PersistenceFailed` (rolled back)  | none          |
//! | post-commit summary  | `Store`                            | batch durable |
//! | render image         | reported in `render_warning`       | batch durable |
//!
//! Rendering is best-effort: once the batch has committed, an image failure
//! is logged and reported alongside a successful result.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;

use crate::builder::{MultiplierSource, RandomMultiplier, RecordBuilder};
use crate::config::Config;
use crate::error::{Error, Result, Upstream};
use crate::models::GdpRanking;
use crate::render::SummaryRenderer;
use crate::sources::SourceClient;
use crate::storage::CountryRepository;
use crate::utils::format_timestamp;

/// Entries listed in the summary
pub const TOP_COUNT: usize = 5;

/// Outcome of a successful refresh
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    /// Records written by this refresh
    pub upserted: usize,
    /// Records in the store after the commit
    pub total_countries: u64,
    pub top_countries: Vec<GdpRanking>,
    /// Batch timestamp shared by every record of this refresh
    pub last_refreshed_at: String,
    /// Summary image path; `None` when rendering failed
    pub image: Option<PathBuf>,
    pub render_warning: Option<String>,
}

/// Sequences fetch -> build -> upsert -> summarize
pub struct RefreshOrchestrator {
    sources: SourceClient,
    repository: Arc<dyn CountryRepository>,
    renderer: Arc<SummaryRenderer>,
    builder: RecordBuilder,
    multipliers: Mutex<Box<dyn MultiplierSource>>,
    /// Serializes refreshes issued through this orchestrator
    running: AsyncMutex<()>,
}

impl RefreshOrchestrator {
    pub fn new(
        sources: SourceClient,
        repository: Arc<dyn CountryRepository>,
        renderer: Arc<SummaryRenderer>,
        builder: RecordBuilder,
        multipliers: Box<dyn MultiplierSource>,
    ) -> Self {
        Self {
            sources,
            repository,
            renderer,
            builder,
            multipliers: Mutex::new(multipliers),
            running: AsyncMutex::new(()),
        }
    }

    /// Wire an orchestrator from configuration with an entropy-seeded RNG
    pub fn from_config(
        config: &Config,
        repository: Arc<dyn CountryRepository>,
        renderer: Arc<SummaryRenderer>,
    ) -> Result<Self> {
        let sources = SourceClient::from_config(config)
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::new(
            sources,
            repository,
            renderer,
            RecordBuilder::new(config.gdp.random_min, config.gdp.random_max),
            Box::new(RandomMultiplier::from_entropy()),
        ))
    }

    /// Run one refresh
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let _guard = self.running.lock().await;
        let refreshed_at = format_timestamp(Utc::now());
        tracing::info!(batch = %refreshed_at, "Starting refresh");

        let countries = self
            .sources
            .fetch_countries()
            .await
            .map_err(|e| Error::upstream(Upstream::Countries, e))?;

        let rates = self
            .sources
            .fetch_rates()
            .await
            .map_err(|e| Error::upstream(Upstream::Rates, e))?;

        let records = {
            let mut multipliers = self
                .multipliers
                .lock()
                .map_err(|_| Error::ProcessingFailed("multiplier source poisoned".into()))?;
            self.builder
                .build(&countries, &rates, &refreshed_at, &mut **multipliers)?
        };
        tracing::info!(count = records.len(), "Built country records");

        let upserted = self
            .repository
            .upsert_batch(&records)
            .map_err(Error::PersistenceFailed)?;

        let total_countries = self.repository.count()?;
        let top_countries = self.repository.top_by_gdp(TOP_COUNT)?;

        let renderer = Arc::clone(&self.renderer);
        let ranking = top_countries.clone();
        let batch = refreshed_at.clone();
        let rendered = tokio::task::spawn_blocking(move || {
            renderer.render(total_countries, &ranking, &batch)
        })
        .await;

        let (image, render_warning) = match rendered {
            Ok(Ok(path)) => (Some(path), None),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Summary image generation failed; refresh data kept");
                (None, Some(e.to_string()))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Summary image task aborted; refresh data kept");
                (None, Some(format!("Summary image task aborted: {e}")))
            }
        };

        tracing::info!(
            upserted,
            total_countries,
            image = ?image,
            "Refresh complete"
        );

        Ok(RefreshReport {
            upserted,
            total_countries,
            top_countries,
            last_refreshed_at: refreshed_at,
            image,
            render_warning,
        })
    }
}
