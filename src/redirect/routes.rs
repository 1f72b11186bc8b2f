use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use super::handlers::{health_check, redirect_link, RedirectState};
use super::middleware::record_request_start;

pub fn create_redirect_router(state: Arc<RedirectState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/{slug}", get(redirect_link))
        .layer(middleware::from_fn(record_request_start))
        .with_state(state)
}
