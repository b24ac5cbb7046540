use axum::{
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod movements;
pub mod stock;
pub mod system;

/// Browser-facing pages and form posts.
pub fn page_router() -> Router {
    Router::new()
        .route("/", get(stock::home))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/confirm", get(auth::confirm))
        .route("/auth/sign-out", post(auth::sign_out))
        .route("/movements", post(movements::submit_form))
}

/// JSON endpoints; every route requires a session.
pub fn api_router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/warehouses", get(stock::api_warehouses))
        .route("/stock", get(stock::api_stock))
        .route("/movements", post(movements::api_record))
}
