use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    healthz, list_interactions, log_interaction, readyz, restart_click, restart_session, root,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/log", post(log_interaction))
        .route("/all", get(list_interactions))
        .route("/session/restart", post(restart_session))
        .route("/session/restart_click", post(restart_click))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
