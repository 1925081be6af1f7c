use anyhow::{Context, Result};

use country_atlas::config::Config;
use country_atlas::server::AppState;
use country_atlas::utils::format_optional_gdp;

/// Run one refresh outside the HTTP server
pub async fn refresh(config: Config) -> Result<()> {
    let state = AppState::from_config(&config).context("Failed to initialize")?;

    let report = state.orchestrator.refresh().await.map_err(|e| {
        tracing::error!(error = %e.chain(), "Refresh failed");
        anyhow::anyhow!(e.chain())
    })?;

    println!("Refresh complete");
    println!("  Records written: {}", report.upserted);
    println!("  Countries cached: {}", report.total_countries);
    println!("  Last refreshed: {}", report.last_refreshed_at);
    match (&report.image, &report.render_warning) {
        (Some(path), _) => println!("  Summary image: {}", path.display()),
        (None, Some(warning)) => println!("  Summary image: not generated ({warning})"),
        (None, None) => println!("  Summary image: not generated"),
    }

    if !report.top_countries.is_empty() {
        println!();
        println!("Top countries by estimated GDP:");
        for (i, entry) in report.top_countries.iter().enumerate() {
            println!(
                "  {}. {} {}",
                i + 1,
                entry.name,
                format_optional_gdp(entry.estimated_gdp)
            );
        }
    }

    Ok(())
}
