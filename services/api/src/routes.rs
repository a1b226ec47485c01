use crate::infra::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::Utc;
use deadline_tracker::awards::AwardQuery;
use serde_json::json;

/// Read-only awards API plus the operational endpoints.
pub(crate) fn with_tracker_routes(query: AwardQuery) -> Router {
    Router::new()
        .route("/api/awards", get(awards_endpoint))
        .with_state(query)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn awards_endpoint(State(query): State<AwardQuery>) -> impl IntoResponse {
    let snapshot = query.snapshot().await;
    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(snapshot),
    )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "time": Utc::now().to_rfc3339() }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
