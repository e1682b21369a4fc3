use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde_json::json;
use validator::Validate;

use crate::{
    dto::{
        access_dto::{JoinRequest, JoinResponse, PreviewRequest},
        candidate_dto::{CandidateSummary, SubmitInterviewPayload},
    },
    error::Result,
    AppState,
};

#[axum::debug_handler]
pub async fn preview(
    State(state): State<AppState>,
    Json(payload): Json<PreviewRequest>,
) -> Result<impl IntoResponse> {
    let preview = state.access_gate.preview(&payload.token).await?;
    Ok(Json(preview))
}

#[axum::debug_handler]
pub async fn join(
    State(state): State<AppState>,
    Json(payload): Json<JoinRequest>,
) -> Result<impl IntoResponse> {
    let outcome = state
        .access_gate
        .request_join(&payload.token, &payload.email, &payload.profile)
        .await?;
    Ok(Json(JoinResponse {
        message: "Access granted",
        outcome,
    }))
}

#[axum::debug_handler]
pub async fn submit(
    State(state): State<AppState>,
    Json(payload): Json<SubmitInterviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job_post_id = state.access_gate.authorize(&payload.token)?;
    let candidate = state
        .candidate_service
        .submit_interview(job_post_id, &payload)
        .await?;
    Ok(Json(json!({
        "message": "Interview submitted",
        "candidate": CandidateSummary::from(candidate),
    })))
}
