use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Wishlist
        .route("/wishlist", get(handlers::get_wishlist))
        .route("/wishlist", post(handlers::add_to_wishlist))
        .route("/wishlist/:id", delete(handlers::remove_from_wishlist))
        .route("/wishlist/refresh", post(handlers::refresh_wishlist))
        .route("/wishlist/merge", post(handlers::retry_merge))
        // Session signals from the auth collaborator
        .route("/session/authenticating", post(handlers::begin_login))
        .route("/session/login", post(handlers::login))
        .route("/session/logout", post(handlers::logout))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
