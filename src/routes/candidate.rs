use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use validator::Validate;

use crate::{
    dto::candidate_dto::{
        AddCandidatesResponse, CandidateDetailResponse, CandidateSummary, RosterPayload,
        RosterResponse, UpdateStatusPayload,
    },
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/job-posts/{id}/candidates",
    params(("id" = i64, Path, description = "Job post ID")),
    responses(
        (status = 200, description = "Roster of the job post", body = RosterResponse),
        (status = 404, description = "Job post not found")
    )
)]
#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.job_post_service.find_owned(&claims.sub, id).await?;
    let candidates = state.candidate_service.list(id).await?;
    Ok(Json(RosterResponse {
        count: candidates.len(),
        candidates,
    }))
}

#[utoipa::path(
    post,
    path = "/api/job-posts/{id}/candidates",
    params(("id" = i64, Path, description = "Job post ID")),
    request_body = RosterPayload,
    responses(
        (status = 201, description = "Candidates added", body = AddCandidatesResponse),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Every candidate already exists")
    )
)]
#[axum::debug_handler]
pub async fn add_candidates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<RosterPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state.job_post_service.find_owned(&claims.sub, id).await?;
    let added = state.candidate_service.add(id, &payload.candidates).await?;
    Ok((StatusCode::CREATED, Json(added)))
}

#[utoipa::path(
    put,
    path = "/api/job-posts/{id}/candidates",
    params(("id" = i64, Path, description = "Job post ID")),
    request_body = RosterPayload,
    responses(
        (status = 200, description = "Roster replaced", body = RosterResponse),
        (status = 404, description = "Job post not found")
    )
)]
#[axum::debug_handler]
pub async fn replace_candidates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<RosterPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state.job_post_service.find_owned(&claims.sub, id).await?;
    let candidates = state.candidate_service.replace(id, &payload.candidates).await?;
    Ok(Json(RosterResponse {
        count: candidates.len(),
        candidates,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/job-posts/{id}/candidates",
    params(("id" = i64, Path, description = "Job post ID")),
    responses(
        (status = 200, description = "Roster cleared"),
        (status = 404, description = "Job post not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_all_candidates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.job_post_service.find_owned(&claims.sub, id).await?;
    let deleted = state.candidate_service.delete_all(id).await?;
    Ok(Json(json!({ "message": "Candidates deleted", "deleted": deleted })))
}

#[utoipa::path(
    get,
    path = "/api/job-posts/{id}/candidates/count",
    params(("id" = i64, Path, description = "Job post ID")),
    responses((status = 200, description = "Number of candidates on the roster"))
)]
#[axum::debug_handler]
pub async fn count_candidates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.job_post_service.find_owned(&claims.sub, id).await?;
    let count = state.candidate_service.count(id).await?;
    Ok(Json(json!({ "job_post_id": id, "count": count })))
}

#[utoipa::path(
    get,
    path = "/api/candidates/recent",
    responses((status = 200, description = "Five newest candidates", body = Vec<CandidateSummary>))
)]
#[axum::debug_handler]
pub async fn recent_candidates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let candidates = state.candidate_service.recent(&claims.sub).await?;
    Ok(Json(candidates))
}

#[utoipa::path(
    get,
    path = "/api/candidates/{id}",
    params(("id" = i64, Path, description = "Candidate ID")),
    responses(
        (status = 200, description = "Candidate with recorded answers", body = CandidateDetailResponse),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn get_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let detail = state.candidate_service.get_detail(&claims.sub, id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    delete,
    path = "/api/candidates/{id}",
    params(("id" = i64, Path, description = "Candidate ID")),
    responses(
        (status = 204, description = "Candidate deleted"),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.candidate_service.delete(&claims.sub, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/api/candidates/{id}/status",
    params(("id" = i64, Path, description = "Candidate ID")),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status changed", body = CandidateSummary),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn update_candidate_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse> {
    let candidate = state
        .candidate_service
        .update_status(&claims.sub, id, &payload)
        .await?;
    Ok(Json(CandidateSummary::from(candidate)))
}
