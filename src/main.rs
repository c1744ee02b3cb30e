// SPDX-License-Identifier: MIT

//! Zdraví-Tracker API Server
//!
//! Tracks family health records (illnesses, treatments, vaccinations,
//! growth measurements) and optionally mirrors records into Google Calendar.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zdravi_tracker::{
    config::Config,
    db::Db,
    services::{CalendarClient, GoogleAuthService},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    // Load configuration from environment. A missing Google client secret
    // is a fatal configuration error, not something to limp along without.
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Zdraví-Tracker API");

    // Initialize the database pool and apply migrations
    let db = Db::connect(&config.database_path).await?;
    tracing::info!(path = %config.database_path, "Database ready");

    // Make sure the attachment upload directory exists
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tracing::info!(dir = %config.upload_dir, "Upload directory ready");

    let google_auth = GoogleAuthService::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
    )?;

    let calendar = CalendarClient::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        google_auth,
        calendar,
    });

    let app = zdravi_tracker::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("zdravi_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
