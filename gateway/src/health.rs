//! Upstream reachability probing (`spec.md` §4.1: "probes run every 30 s
//! with a 2 s timeout; returns 503 if any required upstream is
//! unreachable for > 60 s").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::json;
use tokio::sync::RwLock;

use crate::state::AppState;

const PROBE_INTERVAL: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const UNREACHABLE_GRACE: Duration = Duration::from_secs(60);

/// Last-known-good timestamp per upstream name. `None` means never seen up.
#[derive(Clone, Default)]
pub struct HealthTracker {
    last_ok: Arc<RwLock<HashMap<&'static str, Instant>>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, name: &'static str, ok: bool) {
        if ok {
            self.last_ok.write().await.insert(name, Instant::now());
        }
    }

    async fn snapshot(&self) -> HashMap<String, bool> {
        let last_ok = self.last_ok.read().await;
        crate::state::PROBED_UPSTREAMS
            .iter()
            .map(|name| {
                let reachable = last_ok.get(*name).is_some_and(|seen| seen.elapsed() <= UNREACHABLE_GRACE);
                ((*name).to_owned(), reachable)
            })
            .collect()
    }
}

/// Background task: probe every upstream's `/health` on a fixed cadence.
pub async fn run_prober(state: AppState) {
    let client = reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .expect("building probe client");

    let mut interval = tokio::time::interval(PROBE_INTERVAL);
    loop {
        interval.tick().await;
        for name in crate::state::PROBED_UPSTREAMS {
            let Some(base_url) = state.upstream_base_urls.get(*name) else {
                continue;
            };
            let ok = client
                .get(format!("{base_url}/health"))
                .send()
                .await
                .is_ok_and(|resp| resp.status().is_success());
            state.health.record(*name, ok).await;
        }
    }
}

/// `GET /health` (`spec.md` §4.1, gateway-local).
pub async fn handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.health.snapshot().await;
    let any_down = snapshot.values().any(|reachable| !reachable);

    let status = if any_down { StatusCode::SERVICE_UNAVAILABLE } else { StatusCode::OK };
    (status, Json(json!({ "upstreams": snapshot })))
}
