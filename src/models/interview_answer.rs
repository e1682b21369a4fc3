use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A recorded answer joined with the question it responds to.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecordedAnswer {
    pub id: i64,
    pub candidate_id: i64,
    pub question_id: Option<i64>,
    pub answer: Option<String>,
    pub ai_evaluation: Option<String>,
    pub score: Option<i32>,
    pub response_time: Option<i64>,
    pub end_time: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub question: Option<String>,
    pub question_type: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
}
