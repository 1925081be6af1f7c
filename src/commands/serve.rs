use anyhow::{Context, Result};

use country_atlas::config::Config;
use country_atlas::server::CountryServer;

/// Start the HTTP API and run until Ctrl+C
pub async fn serve(config: Config) -> Result<()> {
    let server = CountryServer::new(&config).context("Failed to create server")?;
    let bind_address = server.bind_address();

    println!("Country Atlas API");
    println!("{:-<40}", "");
    println!("  Database: {}", config.database.url);
    println!("  Summary image: {}", config.summary.image_path.display());
    println!(
        "  CORS: {}",
        if config.server.enable_cors { "enabled" } else { "disabled" }
    );
    println!(
        "  Request Logging: {}",
        if config.server.enable_request_logging {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!();
    println!("API Endpoints:");
    println!("  POST   /countries/refresh  - Fetch upstream data and rebuild the cache");
    println!("  GET    /countries          - List countries (?region=&currency=&sort=gdp_desc)");
    println!("  GET    /countries/image    - Summary image");
    println!("  GET    /countries/{{name}}   - Get one country");
    println!("  DELETE /countries/{{name}}   - Delete one country");
    println!("  GET    /status             - Cache status");
    println!();
    println!("Listening on http://{bind_address}");
    println!("Press Ctrl+C to stop.\n");

    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await?;

    println!("Server stopped.");
    Ok(())
}
