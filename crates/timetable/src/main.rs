mod db;
mod schedule_import;
mod server;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::db::LessonStore;
use crate::schedule_import::{ScheduleFetcher, TimetableConfig};
use crate::types::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let db_path = std::env::var("LESSONS_DB").unwrap_or_else(|_| "lessons.db".to_string());
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8091".to_string());

    let mut config = TimetableConfig::default();
    if let Ok(base_url) = std::env::var("TIMETABLE_URL") {
        config.base_url = base_url;
    }

    let store = LessonStore::new(&db_path);
    let fetcher = ScheduleFetcher::with_config(config).context("failed to build timetable client")?;
    let state = Arc::new(AppState::new(store, fetcher));

    let router = server::create_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!("Schedule API server started on {bind_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
