//! HTTP reverse proxy (`spec.md` §4.1): forwards a resolved request to its
//! upstream with a 10s total / 2s connect deadline, stripping hop-by-hop
//! headers and stamping a request id when the caller didn't supply one.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::routes;
use crate::state::AppState;

const TOTAL_TIMEOUT: Duration = Duration::from_secs(10);

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
];

pub async fn handle(State(state): State<AppState>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let path = uri.path();
    let Some((upstream, upstream_path)) = routes::resolve(path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let Some(base_url) = state.base_url_for(upstream) else {
        tracing::error!(upstream = upstream.env_name(), "upstream base url not configured");
        return StatusCode::BAD_GATEWAY.into_response();
    };

    let target = match uri.query() {
        Some(q) => format!("{base_url}{upstream_path}?{q}"),
        None => format!("{base_url}{upstream_path}"),
    };

    let request_id = request_id_of(&headers);

    let mut forward_headers = strip_hop_by_hop(headers);
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        forward_headers.insert(HeaderName::from_static("x-request-id"), value);
    }

    let outbound = state
        .http
        .request(method, target)
        .timeout(TOTAL_TIMEOUT)
        .headers(forward_headers)
        .body(body);

    match outbound.send().await {
        Ok(upstream_response) => {
            let status = upstream_response.status();
            let mut response_headers = HeaderMap::new();
            for (name, value) in upstream_response.headers().iter() {
                if !HOP_BY_HOP.contains(&name.as_str()) {
                    response_headers.insert(name.clone(), value.clone());
                }
            }
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response_headers.insert(HeaderName::from_static("x-request-id"), value);
            }

            let body = upstream_response.bytes().await.unwrap_or_default();
            let mut response = (status, body).into_response();
            for (name, value) in &response_headers {
                response.headers_mut().insert(name.clone(), value.clone());
            }
            response
        }
        Err(err) if err.is_connect() => {
            tracing::warn!(upstream = upstream.env_name(), error = %err, "upstream connect failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
        Err(err) if err.is_timeout() => {
            tracing::warn!(upstream = upstream.env_name(), error = %err, "upstream request timed out");
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
        Err(err) => {
            tracing::error!(upstream = upstream.env_name(), error = %err, "upstream request failed");
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

/// Pulls `X-Request-Id` from the inbound request, or mints a fresh v7 UUID.
fn request_id_of(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::now_v7().to_string())
}

fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
    headers
}
