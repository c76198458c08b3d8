use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use climate_client::{AssessmentOutcome, AssessmentRequest};
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

const UNPARSEABLE: &str = "AI response could not be parsed";

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AssessBody {
    /// PM2.5 concentration, μg/m³
    pub pm25: Option<f64>,
    /// Annual solar output, kWh/m²/year
    pub solar: Option<f64>,
    /// Free-text place name passed to the model
    #[serde(default)]
    pub location: String,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub risk_tier: String,
    pub explanation: String,
    pub recommendations: Vec<String>,
}

/// Envelope for a reply the model produced but we could not read.
#[derive(Serialize)]
struct UnparsedReply {
    success: bool,
    error: &'static str,
    raw: Option<String>,
}

pub fn assess_routes() -> Router<AppState> {
    Router::new().route("/api/assess", post(assess_risk))
}

#[utoipa::path(
    post,
    path = "/api/assess",
    request_body = AssessBody,
    responses(
        (status = 200, description = "Model assessment, or success=false with the raw reply", body = AssessmentResult),
        (status = 503, description = "OpenRouter key not configured"),
        (status = 500, description = "OpenRouter request failed")
    ),
    tag = "Assessment"
)]
pub(crate) async fn assess_risk(
    State(state): State<AppState>,
    Json(body): Json<AssessBody>,
) -> Result<Response, AppError> {
    let assessor = state
        .assessor
        .as_ref()
        .ok_or_else(|| AppError::unavailable("Risk assessment not configured"))?;

    let request = AssessmentRequest {
        pm25: body.pm25,
        solar: body.solar,
        location: body.location,
    };

    let outcome = assessor
        .assess(&request)
        .await
        .map_err(|e| AppError::upstream("Failed to assess risk", e))?;

    match outcome {
        AssessmentOutcome::Parsed(assessment) => {
            tracing::info!(
                backend = assessor.backend_name(),
                tier = %assessment.risk_tier,
                "Assessment complete"
            );
            Ok(Json(ApiResponse::success(AssessmentResult {
                risk_tier: assessment.risk_tier,
                explanation: assessment.explanation,
                recommendations: assessment.recommendations,
            }))
            .into_response())
        }
        AssessmentOutcome::Unparseable { raw } => Ok(Json(UnparsedReply {
            success: false,
            error: UNPARSEABLE,
            raw,
        })
        .into_response()),
    }
}
