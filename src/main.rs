// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Crescendo API Server
//!
//! Serves the followed-activity feed for the social music-review app:
//! listens, ratings and reviews by followed users, aggregated into a
//! deduplicated reverse-chronological feed.

use crescendo::{config::Config, db::SqliteStore, services::FeedService, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Crescendo API");

    // Initialize the SQLite store
    let store = SqliteStore::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");
    store
        .init_schema()
        .await
        .expect("Failed to initialize database schema");

    // The store serves both as the event-source reader and the avatar
    // resolver; the feed service only sees the traits.
    let store = Arc::new(store);
    let feed = FeedService::new(store.clone(), store);

    // Build shared state
    let state = Arc::new(AppState { config: config.clone(), feed });

    // Build router
    let app = crescendo::routes::create_router(state);

    // Start server
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
                .add_directive("crescendo=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
