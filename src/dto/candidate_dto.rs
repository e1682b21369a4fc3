use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

use crate::models::candidate::{Candidate, CandidateStatus};
use crate::models::interview_answer::RecordedAnswer;
use crate::models::job_post::JobPost;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RosterEntry {
    #[validate(length(min = 1, message = "Candidate name cannot be empty"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RosterPayload {
    #[validate(nested)]
    pub candidates: Vec<RosterEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub job_post_id: i64,
    pub status: CandidateStatus,
    pub applied_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Candidate> for CandidateSummary {
    fn from(c: Candidate) -> Self {
        Self {
            id: c.id,
            name: c.name,
            email: c.email,
            mobile: c.mobile,
            job_post_id: c.job_post_id,
            status: c.status,
            applied_date: c.applied_date,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AddCandidatesResponse {
    pub message: String,
    pub count: usize,
    pub candidates: Vec<CandidateSummary>,
    pub skipped_duplicates: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterResponse {
    pub count: usize,
    pub candidates: Vec<CandidateSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: CandidateStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateDetailResponse {
    pub candidate: Candidate,
    pub job_post: JobPost,
    pub answers: Vec<RecordedAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnswerPayload {
    pub question_id: Option<i64>,
    pub answer: Option<String>,
    pub ai_evaluation: Option<String>,
    pub score: Option<i32>,
    #[validate(range(min = 0))]
    pub response_time: Option<i64>,
    pub end_time: Option<i64>,
}

/// Results a candidate's client posts when an interview ends.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitInterviewPayload {
    #[validate(length(min = 1))]
    pub token: String,
    pub candidate_id: i64,
    pub status: Option<CandidateStatus>,
    pub duration: Option<i32>,
    pub overall_score: Option<i32>,
    pub total_score: Option<i32>,
    pub grade: Option<String>,
    pub attempted_questions: Option<i32>,
    pub average_response_time: Option<i32>,
    pub interview_video_link: Option<String>,
    pub photo_url: Option<String>,
    pub reason: Option<String>,
    pub category_percentage: Option<JsonValue>,
    pub proctoring_alerts: Option<JsonValue>,
    #[serde(default)]
    #[validate(nested)]
    pub answers: Vec<AnswerPayload>,
}

impl SubmitInterviewPayload {
    /// Submissions without an explicit status go to review.
    pub fn target_status(&self) -> CandidateStatus {
        self.status.unwrap_or(CandidateStatus::UnderReview)
    }
}
