//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend adapters shared by all handlers
//! - `routes/`: handlers, one file per area
//! - `views.rs`: HTML rendering
//! - `dto.rs`: form/query/JSON shapes
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;
pub mod views;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let api = routes::api_router().layer(axum::middleware::from_fn(middleware::require_session));

    // Everything except the health probe sees the caller's session.
    let session_aware = routes::page_router()
        .nest("/api", api)
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            services,
            middleware::session_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(session_aware)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::request_tracing)))
}
