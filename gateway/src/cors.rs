//! CORS policy for `/api/*` and `/v1/*` (`spec.md` §4.1).

use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use datecore::config::CorsConfig;

pub fn layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::AUTHORIZATION, axum::http::HeaderName::from_static("x-requested-with")]);

    if config.webapp_domain == "*" {
        // `Allow-Credentials` is only meaningful (and only valid) alongside a
        // specific origin, never a wildcard.
        layer.allow_origin(AllowOrigin::any())
    } else {
        let origin = config
            .webapp_domain
            .parse::<HeaderValue>()
            .unwrap_or_else(|_| HeaderValue::from_static("*"));
        layer.allow_origin(AllowOrigin::exact(origin)).allow_credentials(true)
    }
}
