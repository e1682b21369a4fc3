use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};

use crate::{
    dto::analytics_dto::{
        AnalyticsResponse, BehavioralAnalysisPayload, BehavioralAnalysisResponse,
        GenerateAnalyticsPayload,
    },
    error::Result,
    middleware::auth::Claims,
    services::analytics_service::behavioral_analysis,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/ai-analytics",
    request_body = GenerateAnalyticsPayload,
    responses(
        (status = 200, description = "Generated or previously stored analytics", body = AnalyticsResponse),
        (status = 404, description = "Candidate not found"),
        (status = 500, description = "Model returned malformed output")
    )
)]
#[axum::debug_handler]
pub async fn generate_analytics(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<GenerateAnalyticsPayload>,
) -> Result<impl IntoResponse> {
    let analytics = state
        .analytics_service
        .generate(&claims.sub, payload.candidate_id)
        .await?;
    Ok(Json(analytics))
}

#[utoipa::path(
    post,
    path = "/api/behavioral-analysis",
    request_body = BehavioralAnalysisPayload,
    responses(
        (status = 200, description = "Rule-based analysis of the submitted answers", body = BehavioralAnalysisResponse),
        (status = 400, description = "No answers provided")
    )
)]
#[axum::debug_handler]
pub async fn analyze_behavior(
    Json(payload): Json<BehavioralAnalysisPayload>,
) -> Result<impl IntoResponse> {
    Ok(Json(behavioral_analysis(&payload)?))
}
