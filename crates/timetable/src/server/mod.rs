use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware as mw, Router};

use crate::server::endpoints::{schedule, status};
use crate::server::middleware::identity;
use crate::types::AppState;

mod endpoints;
mod middleware;
mod types;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Schedule endpoints require an authenticated teacher identity
    let schedule_router = Router::new()
        .route("/", get(schedule::get_schedule))
        .route("/async", post(schedule::start_async_fetch))
        .route("/progress/:job_id", get(schedule::get_progress))
        .route("/results/:job_id", get(schedule::get_results))
        .route("/lesson", post(schedule::add_lesson))
        .route("/lessons", post(schedule::add_all_lessons))
        .layer(mw::from_fn(identity::require_teacher));

    Router::new()
        .route("/health", get(status::get_health))
        .nest("/api/schedule", schedule_router)
        .with_state(app_state)
}
