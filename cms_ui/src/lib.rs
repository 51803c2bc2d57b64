//! CMS admin dashboard shell
//! This file enables the crate to be used as a library in tests

pub mod dashboard;
pub mod error;
pub mod events;
pub mod layout;
pub mod session;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Handler for the /ping endpoint
pub async fn ping_handler() -> &'static str {
    "pong"
}

/// Builds the dashboard router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(dashboard::index_handler))
        .route("/login", get(dashboard::login_handler))
        .route("/ping", get(ping_handler))
        .route("/events", get(events::sse_handler))
        .route("/api/session", get(session::session_handler))
        .route("/api/session/refresh", post(session::refresh_handler))
        .route("/logout", post(session::logout_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
