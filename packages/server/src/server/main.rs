// Main entry point for the booking engine server

use std::sync::Arc;

use anyhow::{Context, Result};
use server_core::domains::bookings::data::PgBookingStore;
use server_core::kernel::presence::PgProviderPresence;
use server_core::kernel::scheduled_tasks::start_scheduler;
use server_core::kernel::{EngineDeps, NoopPaymentService, StreamHub, TracingAuditLog};
use server_core::server::app::build_app;
use server_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting booking lifecycle engine");

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let config = Arc::new(config);
    let deps = EngineDeps::new(
        Arc::new(PgBookingStore::new(pool.clone())),
        Arc::new(PgProviderPresence::new(pool.clone())),
        Arc::new(NoopPaymentService),
        Arc::new(TracingAuditLog),
        StreamHub::new(),
        config.clone(),
    );

    // Keep the scheduler handle alive for the life of the process
    let _scheduler = start_scheduler(deps.clone())
        .await
        .context("Failed to start scheduled tasks")?;

    let app = build_app(deps);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
