//! Token-gated entry into an interview.
//!
//! A join runs a fixed sequence of checks, each with its own failure:
//!
//! 1. token signature and expiry (`InvalidToken`, `TokenExpired`)
//! 2. job post lookup (`JobNotFound`)
//! 3. scheduled start (`NotYetOpen`)
//! 4. roster lookup by job post and lower-cased email (`AccessDenied`)
//! 5. one-time use (`AlreadyCompleted`)
//!
//! Only after all of them pass does the store merge the profile, move the
//! candidate to `inprogress` and bump the applicant counter, as one unit.
//! The gate keeps no state between calls.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::models::candidate::{normalize_email, Candidate, CandidateStatus, ProfileUpdate};
use crate::models::interview_question::InterviewQuestion;
use crate::models::job_post::JobPost;
use crate::services::token_service::LinkTokenService;
use crate::utils::time::Clock;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired. Please request a new interview link.")]
    TokenExpired,

    #[error("Job post {0} not found")]
    JobNotFound(i64),

    #[error("This interview opens at {0}. Please try again after the scheduled start time.")]
    NotYetOpen(DateTime<Utc>),

    #[error("Access denied. Your email is not authorized for this interview.")]
    AccessDenied,

    #[error("You have already completed this interview or it is under review.")]
    AlreadyCompleted,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),
}

impl AccessError {
    pub fn code(&self) -> &'static str {
        match self {
            AccessError::InvalidToken => "invalid_token",
            AccessError::TokenExpired => "token_expired",
            AccessError::JobNotFound(_) => "job_not_found",
            AccessError::NotYetOpen(_) => "not_yet_open",
            AccessError::AccessDenied => "access_denied",
            AccessError::AlreadyCompleted => "already_completed",
            AccessError::StorageUnavailable(_) => "storage_unavailable",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AccessError::InvalidToken | AccessError::TokenExpired => StatusCode::BAD_REQUEST,
            AccessError::JobNotFound(_) => StatusCode::NOT_FOUND,
            AccessError::NotYetOpen(_) | AccessError::AccessDenied => StatusCode::FORBIDDEN,
            AccessError::AlreadyCompleted => StatusCode::CONFLICT,
            AccessError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AccessError::NotYetOpen(start) => json!({
                "error": self.code(),
                "message": self.to_string(),
                "interview_start_date_time": start,
            }),
            AccessError::StorageUnavailable(err) => {
                tracing::error!(error = %err, "interview store unavailable");
                json!({
                    "error": self.code(),
                    "message": "Interview service is temporarily unavailable",
                })
            }
            _ => json!({
                "error": self.code(),
                "message": self.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}

/// Result of a committed admission.
#[derive(Debug, Clone)]
pub struct Admission {
    pub candidate: Candidate,
    /// Applicant counter of the job post after the admission committed.
    pub applicants: i32,
    /// True when this admission moved the candidate out of `pending`.
    pub first_join: bool,
}

/// What the store must write for one admission.
#[derive(Debug, Clone)]
pub struct AdmissionPlan {
    pub candidate: Candidate,
    pub first_join: bool,
}

/// Decides an admission for a candidate row read under lock. Rejects
/// terminal candidates before touching anything, otherwise merges the
/// profile and moves the candidate to `inprogress`.
///
/// The applicant counter is owed only when the candidate leaves `pending`;
/// re-entering an interview already in progress is free.
pub fn plan_admission(
    mut candidate: Candidate,
    profile: &ProfileUpdate,
) -> Result<AdmissionPlan, AccessError> {
    if candidate.status.is_terminal() {
        return Err(AccessError::AlreadyCompleted);
    }
    let first_join = candidate.status == CandidateStatus::Pending;
    debug_assert!(candidate.status.can_transition_to(CandidateStatus::InProgress));

    profile.apply_to(&mut candidate);
    candidate.status = CandidateStatus::InProgress;
    Ok(AdmissionPlan {
        candidate,
        first_join,
    })
}

/// Persistence the gate depends on. Implementations must make
/// `admit_candidate` atomic per candidate: read the row under lock, run
/// [`plan_admission`], write the row and the counter, then commit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessStore: Send + Sync {
    async fn find_job_post(&self, job_post_id: i64) -> Result<Option<JobPost>, AccessError>;

    /// `email` is already normalized.
    async fn find_candidate(
        &self,
        job_post_id: i64,
        email: &str,
    ) -> Result<Option<Candidate>, AccessError>;

    async fn admit_candidate(
        &self,
        candidate_id: i64,
        profile: &ProfileUpdate,
    ) -> Result<Admission, AccessError>;

    async fn list_interview_questions(
        &self,
        job_post_id: i64,
    ) -> Result<Vec<InterviewQuestion>, AccessError>;
}

/// A question as shown to a candidate during the interview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateQuestion {
    pub id: i64,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub difficulty: Option<String>,
    pub expected_duration: Option<i32>,
    pub category: Option<String>,
    pub suggested_answers: Vec<String>,
    pub options: Vec<String>,
    // TODO: drop once multiple-choice grading moves server-side; clients
    // currently grade locally and need the answer key.
    pub right_answer: Option<String>,
    pub is_required: bool,
    pub order: i64,
}

impl CandidateQuestion {
    pub fn project(question: InterviewQuestion, include_right_answer: bool) -> Self {
        Self {
            id: question.id,
            question: question.question,
            question_type: question.question_type,
            difficulty: question.difficulty,
            expected_duration: question.duration,
            category: question.category,
            suggested_answers: question.suggested_answers,
            options: question.options,
            right_answer: if include_right_answer {
                question.right_answer
            } else {
                None
            },
            is_required: true,
            order: question.id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinOutcome {
    pub job_post_id: i64,
    pub job_title: String,
    pub applicants: i32,
    pub questions: Vec<CandidateQuestion>,
    pub candidate_id: i64,
    pub candidate_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobPreview {
    pub job_post: JobPost,
    pub questions: Vec<CandidateQuestion>,
}

#[derive(Clone)]
pub struct AccessGate {
    store: Arc<dyn AccessStore>,
    clock: Arc<dyn Clock>,
    tokens: LinkTokenService,
    expose_right_answers: bool,
}

impl AccessGate {
    pub fn new(store: Arc<dyn AccessStore>, clock: Arc<dyn Clock>, tokens: LinkTokenService) -> Self {
        Self {
            store,
            clock,
            tokens,
            expose_right_answers: true,
        }
    }

    pub fn with_right_answers(mut self, expose: bool) -> Self {
        self.expose_right_answers = expose;
        self
    }

    pub async fn request_join(
        &self,
        token: &str,
        email: &str,
        profile: &ProfileUpdate,
    ) -> Result<JoinOutcome, AccessError> {
        let now = self.clock.now();
        let claims = self.tokens.verify(token, now)?;
        let job_post_id = claims.job_post_id;

        let job = self
            .store
            .find_job_post(job_post_id)
            .await?
            .ok_or(AccessError::JobNotFound(job_post_id))?;

        if let Some(start) = job.opens_after(now) {
            tracing::info!(job_post_id, %start, "join attempted before interview start");
            return Err(AccessError::NotYetOpen(start));
        }

        let email = normalize_email(email);
        let candidate = self
            .store
            .find_candidate(job_post_id, &email)
            .await?
            .ok_or_else(|| {
                tracing::warn!(job_post_id, "join attempted by email not on roster");
                AccessError::AccessDenied
            })?;

        if candidate.status.is_terminal() {
            tracing::info!(job_post_id, candidate_id = candidate.id, status = %candidate.status, "join attempted after completion");
            return Err(AccessError::AlreadyCompleted);
        }

        // Loaded before admission so a failed read leaves the candidate untouched.
        let questions: Vec<CandidateQuestion> = self
            .store
            .list_interview_questions(job_post_id)
            .await?
            .into_iter()
            .map(|q| CandidateQuestion::project(q, self.expose_right_answers))
            .collect();

        let admission = self.store.admit_candidate(candidate.id, profile).await?;
        tracing::info!(
            job_post_id,
            candidate_id = admission.candidate.id,
            first_join = admission.first_join,
            applicants = admission.applicants,
            "candidate joined interview"
        );

        Ok(JoinOutcome {
            job_post_id,
            job_title: job.job_title,
            applicants: admission.applicants,
            questions,
            candidate_id: admission.candidate.id,
            candidate_name: admission.candidate.name,
        })
    }

    /// Resolves a token to its job post without joining.
    pub async fn preview(&self, token: &str) -> Result<JobPreview, AccessError> {
        let claims = self.tokens.verify(token, self.clock.now())?;
        let job_post = self
            .store
            .find_job_post(claims.job_post_id)
            .await?
            .ok_or(AccessError::JobNotFound(claims.job_post_id))?;
        let questions = self
            .store
            .list_interview_questions(job_post.id)
            .await?
            .into_iter()
            .map(|q| CandidateQuestion::project(q, self.expose_right_answers))
            .collect();
        Ok(JobPreview {
            job_post,
            questions,
        })
    }

    /// Verifies a token and returns the job post id it grants.
    pub fn authorize(&self, token: &str) -> Result<i64, AccessError> {
        Ok(self.tokens.verify(token, self.clock.now())?.job_post_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job_post::{DurationMode, JobPostStatus};
    use crate::services::token_service::LinkKind;
    use crate::utils::time::MockClock;
    use chrono::Duration;
    use mockall::predicate::eq;

    const SECRET: &str = "gate-secret";

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn job(id: i64, start: Option<DateTime<Utc>>) -> JobPost {
        let now = Utc::now();
        JobPost {
            id,
            owner_id: "admin".into(),
            job_title: "Backend Engineer".into(),
            company: "Acme".into(),
            department: "Platform".into(),
            location: vec!["Remote".into()],
            job_type: "full-time".into(),
            experience_level: "senior".into(),
            job_description: "Build things".into(),
            salary_min: None,
            salary_max: None,
            salary_currency: None,
            requirements: vec![],
            responsibilities: vec![],
            skills: vec![],
            status: JobPostStatus::Active,
            applicants: 0,
            interviews: 0,
            enable_video_recording: false,
            interview_start_date_time: start,
            logo_url: None,
            duration_mode: DurationMode::Question,
            interview_duration: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn question(id: i64, job_post_id: i64) -> InterviewQuestion {
        InterviewQuestion {
            id,
            job_post_id,
            question: "2 + 2?".into(),
            question_type: "mcq".into(),
            difficulty: Some("easy".into()),
            duration: Some(60),
            category: Some("math".into()),
            options: vec!["3".into(), "4".into()],
            right_answer: Some("4".into()),
            suggested_answers: vec!["four".into()],
            created_at: Utc::now(),
        }
    }

    fn clock_at(now: DateTime<Utc>) -> Arc<MockClock> {
        let mut clock = MockClock::new();
        clock.expect_now().return_const(now);
        Arc::new(clock)
    }

    fn token_for(job_post_id: i64, issued: DateTime<Utc>) -> String {
        LinkTokenService::new(SECRET)
            .issue_link(job_post_id, LinkKind::Exam, issued)
            .unwrap()
            .token
    }

    fn gate(store: MockAccessStore, now: DateTime<Utc>) -> AccessGate {
        AccessGate::new(Arc::new(store), clock_at(now), LinkTokenService::new(SECRET))
    }

    #[tokio::test]
    async fn expired_token_never_reaches_the_store() {
        let store = MockAccessStore::new();
        let issued = at("2026-01-01T00:00:00Z");
        let token = token_for(42, issued);
        let gate = gate(store, issued + Duration::days(31));

        let err = gate
            .request_join(&token, "a@b.com", &ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::TokenExpired));
    }

    #[tokio::test]
    async fn malformed_token_is_invalid() {
        let gate = gate(MockAccessStore::new(), Utc::now());
        let err = gate
            .request_join("abc.def.ghi", "a@b.com", &ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::InvalidToken));
    }

    #[tokio::test]
    async fn missing_job_post_is_reported() {
        let mut store = MockAccessStore::new();
        store
            .expect_find_job_post()
            .with(eq(42))
            .returning(|_| Ok(None));
        let now = at("2026-01-02T00:00:00Z");
        let gate = gate(store, now);

        let err = gate
            .request_join(&token_for(42, now), "a@b.com", &ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::JobNotFound(42)));
    }

    #[tokio::test]
    async fn join_before_start_returns_scheduled_time() {
        let start = at("2026-02-01T09:00:00Z");
        let mut store = MockAccessStore::new();
        store
            .expect_find_job_post()
            .returning(move |id| Ok(Some(job(id, Some(start)))));
        store.expect_find_candidate().never();
        let now = start - Duration::seconds(1);
        let gate = gate(store, now);

        let err = gate
            .request_join(&token_for(42, now), "a@b.com", &ProfileUpdate::default())
            .await
            .unwrap_err();
        match err {
            AccessError::NotYetOpen(scheduled) => assert_eq!(scheduled, start),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn join_exactly_at_start_is_allowed() {
        let start = at("2026-02-01T09:00:00Z");
        let mut store = MockAccessStore::new();
        store
            .expect_find_job_post()
            .returning(move |id| Ok(Some(job(id, Some(start)))));
        store
            .expect_find_candidate()
            .returning(|job_id, email| Ok(Some(Candidate::new_pending(7, job_id, "Al", email))));
        store.expect_admit_candidate().times(1).returning(|id, _| {
            let mut candidate = Candidate::new_pending(id, 42, "Al", "a@b.com");
            candidate.status = CandidateStatus::InProgress;
            Ok(Admission {
                candidate,
                applicants: 1,
                first_join: true,
            })
        });
        store
            .expect_list_interview_questions()
            .returning(|job_id| Ok(vec![question(1, job_id)]));
        let gate = gate(store, start);

        let outcome = gate
            .request_join(&token_for(42, start), "a@b.com", &ProfileUpdate::default())
            .await
            .unwrap();
        assert_eq!(outcome.candidate_id, 7);
        assert_eq!(outcome.applicants, 1);
        assert_eq!(outcome.questions.len(), 1);
    }

    #[tokio::test]
    async fn unknown_email_is_denied() {
        let mut store = MockAccessStore::new();
        store
            .expect_find_job_post()
            .returning(|id| Ok(Some(job(id, None))));
        store
            .expect_find_candidate()
            .with(eq(42), eq("stranger@x.com"))
            .returning(|_, _| Ok(None));
        store.expect_admit_candidate().never();
        let now = Utc::now();
        let gate = gate(store, now);

        let err = gate
            .request_join(&token_for(42, now), "Stranger@X.com", &ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::AccessDenied));
    }

    #[tokio::test]
    async fn completed_candidate_is_rejected_before_any_write() {
        let mut store = MockAccessStore::new();
        store
            .expect_find_job_post()
            .returning(|id| Ok(Some(job(id, None))));
        store.expect_find_candidate().returning(|job_id, email| {
            let mut candidate = Candidate::new_pending(3, job_id, "Done", email);
            candidate.status = CandidateStatus::Completed;
            Ok(Some(candidate))
        });
        store.expect_admit_candidate().never();
        store.expect_list_interview_questions().never();
        let now = Utc::now();
        let gate = gate(store, now);

        let err = gate
            .request_join(
                &token_for(42, now),
                "done@x.com",
                &ProfileUpdate {
                    name: Some("Overwritten".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::AlreadyCompleted));
    }

    #[tokio::test]
    async fn storage_failures_surface_as_unavailable() {
        let mut store = MockAccessStore::new();
        store
            .expect_find_job_post()
            .returning(|_| Err(AccessError::StorageUnavailable(sqlx::Error::PoolTimedOut)));
        let now = Utc::now();
        let gate = gate(store, now);

        let err = gate
            .request_join(&token_for(42, now), "a@b.com", &ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::StorageUnavailable(_)));
        assert_eq!(err.code(), "storage_unavailable");
    }

    #[tokio::test]
    async fn right_answers_can_be_withheld() {
        let mut store = MockAccessStore::new();
        store
            .expect_find_job_post()
            .returning(|id| Ok(Some(job(id, None))));
        store
            .expect_list_interview_questions()
            .returning(|job_id| Ok(vec![question(1, job_id)]));
        let now = Utc::now();
        let gate = gate(store, now).with_right_answers(false);

        let preview = gate.preview(&token_for(42, now)).await.unwrap();
        assert_eq!(preview.job_post.id, 42);
        assert_eq!(preview.questions[0].right_answer, None);
        assert_eq!(preview.questions[0].options, vec!["3".to_string(), "4".to_string()]);
    }

    #[test]
    fn plan_admission_only_counts_first_join() {
        let pending = Candidate::new_pending(1, 42, "Jane", "jane@x.com");
        let plan = plan_admission(pending, &ProfileUpdate::default()).unwrap();
        assert!(plan.first_join);
        assert_eq!(plan.candidate.status, CandidateStatus::InProgress);

        let plan = plan_admission(plan.candidate, &ProfileUpdate::default()).unwrap();
        assert!(!plan.first_join);
        assert_eq!(plan.candidate.status, CandidateStatus::InProgress);
    }

    #[test]
    fn plan_admission_rejects_terminal_states() {
        for status in [CandidateStatus::UnderReview, CandidateStatus::Completed] {
            let mut candidate = Candidate::new_pending(1, 42, "Jane", "jane@x.com");
            candidate.status = status;
            assert!(matches!(
                plan_admission(candidate, &ProfileUpdate::default()),
                Err(AccessError::AlreadyCompleted)
            ));
        }
    }
}
