use crate::infra::{preview_hash, AppState, HashPreview};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::Utc;
use lead_intake::error::AppError;
use lead_intake::leads::{
    lead_router, CrmTransport, LeadAdmissionService, LeadStore, NewLeadRequest,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_lead_routes<S, T>(service: Arc<LeadAdmissionService<S, T>>) -> axum::Router
where
    S: LeadStore + 'static,
    T: CrmTransport + 'static,
{
    lead_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/simulation-hash",
            axum::routing::post(simulation_hash_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
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

/// Report the identity a request would be admitted under, without admitting it.
pub(crate) async fn simulation_hash_endpoint(
    Json(payload): Json<NewLeadRequest>,
) -> Result<Json<HashPreview>, AppError> {
    preview_hash(payload, Utc::now()).map(Json)
}
