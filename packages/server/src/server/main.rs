// Main entry point for the club member lifecycle API server

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use club_core::domains::rules::RuleScheduler;
use club_core::kernel::ServerDeps;
use club_core::server::build_app;
use club_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,club_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting club member lifecycle API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let port = config.port;
    let tick_cron = config.rule_tick_cron.clone();
    let deps = Arc::new(ServerDeps::new(config));

    // Start the rule scheduler and register schedules for any periodic
    // rules present at boot
    let scheduler = RuleScheduler::start(deps.rules.clone(), tick_cron)
        .await
        .context("Failed to start rule scheduler")?;
    scheduler
        .sync()
        .await
        .context("Failed to sync rule schedules")?;

    // Build application
    let app = build_app(deps);

    // Start server
    let addr = format!("0.0.0.0:{port}");
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
