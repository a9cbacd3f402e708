use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;
use tracing::info;

use super::crm::{CrmTransport, ExternalServiceError};
use super::intake::{IntakeGuard, NewLeadRequest};
use super::service::{AdmissionError, LeadAdmissionService};
use super::store::{LeadStore, StoreError};

/// Router builder exposing the lead intake endpoint.
pub fn lead_router<S, T>(service: Arc<LeadAdmissionService<S, T>>) -> Router
where
    S: LeadStore + 'static,
    T: CrmTransport + 'static,
{
    Router::new()
        .route("/api/lead-service", post(submit_handler::<S, T>))
        .with_state(service)
}

pub(crate) async fn submit_handler<S, T>(
    State(service): State<Arc<LeadAdmissionService<S, T>>>,
    payload: Result<axum::Json<NewLeadRequest>, JsonRejection>,
) -> Response
where
    S: LeadStore + 'static,
    T: CrmTransport + 'static,
{
    let request = match payload {
        Ok(axum::Json(request)) => request,
        Err(rejection) => return rejection_response(rejection),
    };
    info!(phone_nr = %request.phone_nr, "creating new lead");

    let submission =
        match IntakeGuard::default().submission_from_request(request, service.clock().now()) {
            Ok(submission) => submission,
            Err(violation) => {
                let payload = json!({ "error": violation.to_string() });
                return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
            }
        };

    match service
        .submit(submission.phone_nr, submission.simulation)
        .await
    {
        Ok(lead) => (StatusCode::CREATED, axum::Json(lead)).into_response(),
        Err(err) => admission_error_response(err),
    }
}

/// Body rejections keep the `{"error": ..}` shape used by validation failures.
fn rejection_response(rejection: JsonRejection) -> Response {
    let payload = json!({ "error": rejection.body_text() });
    (rejection.status(), axum::Json(payload)).into_response()
}

pub(crate) fn admission_error_response(err: AdmissionError) -> Response {
    let status = match &err {
        AdmissionError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        AdmissionError::ExternalService(external) => external_status(external),
        AdmissionError::Storage(StoreError::Conflict(_)) => StatusCode::CONFLICT,
        AdmissionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": err.to_string(),
        "code": err.code(),
    });
    (status, axum::Json(payload)).into_response()
}

/// CRM codes double as HTTP statuses; anything else reads as a bad request.
fn external_status(err: &ExternalServiceError) -> StatusCode {
    err.code
        .parse::<u16>()
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .filter(|status| status.is_client_error() || status.is_server_error())
        .unwrap_or(StatusCode::BAD_REQUEST)
}
