use geo_service::config::GeoConfig;
use geo_service::services::metrics::init_metrics;
use geo_service::startup::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_metrics();

    let config = GeoConfig::load().map_err(|e| {
        init_tracing("geo-service", "info", None);
        tracing::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    tracing::info!(
        environment = %config.environment,
        version = %config.service_version,
        store = ?config.store,
        "Starting geo-service"
    );

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    application.run_until_stopped().await?;

    tracing::info!("geo-service stopped");
    Ok(())
}
