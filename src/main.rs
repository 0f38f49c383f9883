use std::sync::Arc;

use tower_http::cors::CorsLayer;

use mordhau_stats::api::{self, AppState};
use mordhau_stats::config::Config;
use mordhau_stats::db::Database;
use mordhau_stats::metrics;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();

    let db = Database::with_acquire_timeout(&config.database_url, config.db_acquire_timeout)
        .await
        .map_err(|e| format!("Failed to initialize database: {e}"))?;
    let db = Arc::new(db);

    let state = AppState::new(db.clone(), &config)?;

    if let Some(seed) = &config.bootstrap {
        state
            .sessions
            .bootstrap(&seed.username, &seed.password)
            .await
            .map_err(|e| format!("Failed to create bootstrap user: {e}"))?;
    }

    metrics::register_metrics();

    let app = api::router(state).layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {addr}: {e}"))?;

    tracing::info!("Mordhau stats backend listening on {addr}");
    axum::serve(listener, app).await?;

    db.close().await;
    Ok(())
}
