use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// The docs site and quiz client are served from other origins.
pub fn quiz_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(Any)
}
