use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::session::{make_span_with_session, session_middleware};

use super::handlers;
use super::AppState;

/// Creates the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home).post(handlers::submit_rating))
        .route("/recommend", post(handlers::recommend))
        .route("/genres/:genre", get(handlers::genres))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        // Health checks do not open sessions
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_session))
        .with_state(state)
}
