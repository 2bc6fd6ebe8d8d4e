use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::advisory::AdvisoryScorer;
use super::domain::PatientId;
use super::retrieval::{DocumentSource, RetrievalError};
use super::service::{AssessmentError, ClaimVerificationService};

#[derive(Debug, Deserialize)]
pub struct AssessClaimRequest {
    pub document_reference: String,
    pub patient_identifier: String,
}

/// Router builder exposing the claim assessment endpoint.
pub fn claims_router<D, S>(service: Arc<ClaimVerificationService<D, S>>) -> Router
where
    D: DocumentSource + 'static,
    S: AdvisoryScorer + 'static,
{
    Router::new()
        .route("/api/v1/claims/assess", post(assess_handler::<D, S>))
        .with_state(service)
}

pub(crate) async fn assess_handler<D, S>(
    axum::extract::State(service): axum::extract::State<Arc<ClaimVerificationService<D, S>>>,
    axum::Json(request): axum::Json<AssessClaimRequest>,
) -> Response
where
    D: DocumentSource + 'static,
    S: AdvisoryScorer + 'static,
{
    let patient_id = PatientId(request.patient_identifier);
    match service.assess(&request.document_reference, &patient_id).await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(AssessmentError::ProfileNotFound(id)) => {
            let payload = json!({
                "error": format!("no profile on record for patient {}", id.0),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(AssessmentError::Extraction(error)) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(AssessmentError::Retrieval(RetrievalError::Timeout)) => {
            let payload = json!({
                "error": "document retrieval timed out",
            });
            (StatusCode::GATEWAY_TIMEOUT, axum::Json(payload)).into_response()
        }
        Err(AssessmentError::Retrieval(error)) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
