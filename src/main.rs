// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! LogTrail API Server
//!
//! Ingests application logs from client SDKs and serves the operator
//! dashboard (log table, live console, statistics, settings).

use logtrail::{config::Config, db::FirestoreDb, services::RetentionSweeper, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Structured JSON logging
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting LogTrail API");

    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    // Seed settings and the stats aggregate on a fresh database
    db.bootstrap().await?;

    if config.retention_sweep_interval.is_zero() {
        tracing::info!("Retention sweeper disabled");
    } else {
        RetentionSweeper::new(db.clone(), config.retention_sweep_interval).spawn();
    }

    if config.ingest_api_key.is_none() {
        tracing::warn!("INGEST_API_KEY not set, log ingestion is unauthenticated");
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
    });

    let app = logtrail::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("logtrail=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
