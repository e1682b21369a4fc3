pub mod analytics;
pub mod candidate;
pub mod health;
pub mod interview;
pub mod job_post;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::get_config;
use crate::middleware::{
    auth::require_bearer_auth,
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::AppState;

/// Candidate-facing routes. The access token in each body is the only
/// credential.
fn public_routes(rps: u32) -> Router<AppState> {
    Router::new()
        .route("/api/interview/preview", post(interview::preview))
        .route("/api/interview/join", post(interview::join))
        .route("/api/interview/submit", post(interview::submit))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new("public", rps),
            rps_middleware,
        ))
}

fn admin_routes(rps: u32) -> Router<AppState> {
    Router::new()
        .route(
            "/api/job-posts",
            get(job_post::list_job_posts).post(job_post::create_job_post),
        )
        .route(
            "/api/job-posts/:id",
            get(job_post::get_job_post)
                .put(job_post::update_job_post)
                .delete(job_post::delete_job_post),
        )
        .route("/api/job-posts/:id/token", post(job_post::generate_token))
        .route("/api/job-posts/:id/share-link", post(job_post::share_link))
        .route("/api/job-posts/:id/exam-link", post(job_post::exam_link))
        .route(
            "/api/job-posts/:id/candidates",
            get(candidate::list_candidates)
                .post(candidate::add_candidates)
                .put(candidate::replace_candidates)
                .delete(candidate::delete_all_candidates),
        )
        .route(
            "/api/job-posts/:id/candidates/count",
            get(candidate::count_candidates),
        )
        .route("/api/candidates/recent", get(candidate::recent_candidates))
        .route(
            "/api/candidates/:id",
            get(candidate::get_candidate).delete(candidate::delete_candidate),
        )
        .route(
            "/api/candidates/:id/status",
            patch(candidate::update_candidate_status),
        )
        .route("/api/ai-analytics", post(analytics::generate_analytics))
        .route("/api/behavioral-analysis", post(analytics::analyze_behavior))
        .layer(axum::middleware::from_fn(require_bearer_auth))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new("admin", rps),
            rps_middleware,
        ))
}

pub fn router(state: AppState) -> Router {
    let config = get_config();
    Router::new()
        .route("/health", get(health::health))
        .merge(public_routes(config.public_rps))
        .merge(admin_routes(config.admin_rps))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
}
