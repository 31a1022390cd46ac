//! Liveness/readiness endpoints.

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Router, http::StatusCode};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        service: "hls-gateway",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn readiness_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn liveness_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "uptime_secs": state.start_time.elapsed().as_secs() }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use hls_gateway_core::GatewaySettings;
    use tower::ServiceExt;

    use super::*;
    use crate::extraction_client::HttpDelegatingExtractor;

    fn test_state() -> AppState {
        AppState::new(
            GatewaySettings::default(),
            Arc::new(HttpDelegatingExtractor::new("http://127.0.0.1:0", 10)),
        )
    }

    #[tokio::test]
    async fn health_returns_ok_with_version() {
        let app = Router::new().nest("/health", router()).with_state(test_state());
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_is_ok() {
        let app = Router::new().nest("/health", router()).with_state(test_state());
        let resp = app
            .oneshot(Request::builder().uri("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
