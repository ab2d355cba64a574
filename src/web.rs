//! JSON lookup endpoint for `--serve`.
//!
//! `GET /lookup?target=8.8.8.8[&otype=ipv4]` runs one lookup and answers with
//! the same object the `J` format prints. `GET /health` answers `ok`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use machinae_lookup::Orchestrator;

use crate::output::json_record;
use crate::target::{self, OTYPES};

#[derive(Clone)]
struct WebState {
    orchestrator: Arc<Orchestrator>,
}

#[derive(serde::Deserialize)]
struct LookupQuery {
    #[serde(default)]
    target: String,
    #[serde(default)]
    otype: Option<String>,
}

/// The endpoint's routes over a shared orchestrator.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/lookup", get(lookup))
        .with_state(WebState { orchestrator })
}

/// Serve [`router`] on `listener` until the process is stopped.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve(
    listener: tokio::net::TcpListener,
    orchestrator: Arc<Orchestrator>,
) -> std::io::Result<()> {
    let local_addr: SocketAddr = listener.local_addr()?;
    tracing::info!("lookup endpoint listening on http://{local_addr}");
    axum::serve(listener, router(orchestrator)).await
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn lookup(
    State(state): State<WebState>,
    Query(query): Query<LookupQuery>,
) -> impl IntoResponse {
    let raw = query.target.trim();
    if raw.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "target must not be empty" })),
        );
    }
    let forced = query.otype.as_deref().map(str::to_lowercase);
    if let Some(otype) = forced.as_deref().filter(|o| !OTYPES.contains(o)) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": format!("unknown otype: {otype}") })),
        );
    }

    let info = target::target_info(raw, forced.as_deref());
    tracing::info!(observable = %info.target, otype = %info.otype, "web lookup");
    let set = state.orchestrator.lookup(info).await;
    (StatusCode::OK, Json(json_record(&set)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use machinae_lookup::{LookupConfig, Registry, SiteFactory};
    use serde_json::Value;

    async fn spawn() -> String {
        let config = LookupConfig::default();
        let factory = Arc::new(SiteFactory::new(config.timeout()));
        let orchestrator = Orchestrator::new(Registry::default(), factory, config).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, Arc::new(orchestrator)));
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let base = spawn().await;
        let body: Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn lookup_detects_otype() {
        let base = spawn().await;
        let body: Value = reqwest::get(format!("{base}/lookup?target=8.8.8.8"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["observable"], "8.8.8.8");
        assert_eq!(body["observable_type"], "ipv4");
        assert_eq!(body["sites"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn missing_target_is_json_error() {
        let base = spawn().await;
        for query in ["", "?target=%20"] {
            let response = reqwest::get(format!("{base}/lookup{query}")).await.unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
            let body: Value = response.json().await.unwrap();
            assert_eq!(body["error"], "target must not be empty");
        }
    }

    #[tokio::test]
    async fn rejects_unknown_otype() {
        let base = spawn().await;
        let response = reqwest::get(format!("{base}/lookup?target=x&otype=bogus"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    }
}
