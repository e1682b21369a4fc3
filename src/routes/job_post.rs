use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::{
        access_dto::{IssueTokenResponse, SendLinkPayload, SendLinkResponse},
        job_post_dto::{
            CreateJobPostPayload, JobPostDetailResponse, JobPostResponse, UpdateJobPostPayload,
        },
    },
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/job-posts",
    request_body = CreateJobPostPayload,
    responses(
        (status = 201, description = "Job post created", body = JobPostResponse),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Missing or invalid bearer token")
    )
)]
#[axum::debug_handler]
pub async fn create_job_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateJobPostPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let post = state.job_post_service.create(&claims.sub, payload).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[utoipa::path(
    get,
    path = "/api/job-posts",
    responses(
        (status = 200, description = "Job posts of the caller, newest first", body = Vec<JobPostResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_job_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let posts = state.job_post_service.list(&claims.sub).await?;
    Ok(Json(posts))
}

#[utoipa::path(
    get,
    path = "/api/job-posts/{id}",
    params(("id" = i64, Path, description = "Job post ID")),
    responses(
        (status = 200, description = "Job post with questions and roster", body = JobPostDetailResponse),
        (status = 404, description = "Job post not found")
    )
)]
#[axum::debug_handler]
pub async fn get_job_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let post = state.job_post_service.get(&claims.sub, id).await?;
    Ok(Json(post))
}

#[utoipa::path(
    put,
    path = "/api/job-posts/{id}",
    params(("id" = i64, Path, description = "Job post ID")),
    request_body = UpdateJobPostPayload,
    responses(
        (status = 200, description = "Job post updated", body = JobPostResponse),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Job post not found")
    )
)]
#[axum::debug_handler]
pub async fn update_job_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateJobPostPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let post = state.job_post_service.update(&claims.sub, id, payload).await?;
    Ok(Json(post))
}

#[utoipa::path(
    delete,
    path = "/api/job-posts/{id}",
    params(("id" = i64, Path, description = "Job post ID")),
    responses(
        (status = 204, description = "Job post deleted"),
        (status = 404, description = "Job post not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_job_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.job_post_service.delete(&claims.sub, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/job-posts/{id}/token",
    params(("id" = i64, Path, description = "Job post ID")),
    responses(
        (status = 200, description = "30-day interview token and link", body = IssueTokenResponse),
        (status = 404, description = "Job post not found")
    )
)]
#[axum::debug_handler]
pub async fn generate_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let job = state.job_post_service.find_owned(&claims.sub, id).await?;
    let issued = state.notification_service.generate_token(&job)?;
    Ok(Json(issued))
}

#[utoipa::path(
    post,
    path = "/api/job-posts/{id}/share-link",
    params(("id" = i64, Path, description = "Job post ID")),
    request_body = SendLinkPayload,
    responses(
        (status = 200, description = "2-day links queued", body = SendLinkResponse),
        (status = 400, description = "No valid email addresses"),
        (status = 404, description = "Job post not found")
    )
)]
#[axum::debug_handler]
pub async fn share_link(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<SendLinkPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state.job_post_service.find_owned(&claims.sub, id).await?;
    let sent = state.notification_service.share_link(&job, &payload).await?;
    Ok(Json(sent))
}

#[utoipa::path(
    post,
    path = "/api/job-posts/{id}/exam-link",
    params(("id" = i64, Path, description = "Job post ID")),
    request_body = SendLinkPayload,
    responses(
        (status = 200, description = "30-day links queued for roster matches", body = SendLinkResponse),
        (status = 404, description = "Job post not found or no email on the roster")
    )
)]
#[axum::debug_handler]
pub async fn exam_link(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<SendLinkPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state.job_post_service.find_owned(&claims.sub, id).await?;
    let sent = state.notification_service.exam_link(&job, &payload).await?;
    Ok(Json(sent))
}
