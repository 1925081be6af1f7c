use anyhow::{Context, Result};

use country_atlas::config::Config;
use country_atlas::models::StatusSnapshot;
use country_atlas::storage::open_repository;

/// Print cache status
pub fn status(config: Config) -> Result<()> {
    let repository =
        open_repository(&config.database.url).context("Failed to open database")?;
    let snapshot = repository.status()?;

    print!("{}", status_report(&snapshot));
    Ok(())
}

fn status_report(snapshot: &StatusSnapshot) -> String {
    format!(
        "Countries cached: {}\nLast refreshed: {}\n",
        snapshot.total_countries,
        snapshot.last_refreshed_at.as_deref().unwrap_or("never")
    )
}
