pub mod api;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::handlers;
use crate::state::AppState;

/// Public health route plus the completion API, bound to `state`
///
/// CORS and security headers are layered on in `main`.
pub fn create_app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::api::health_check))
        .merge(api::create_api_router())
        .with_state(state)
}
