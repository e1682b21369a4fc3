use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewQuestion {
    pub id: i64,
    pub job_post_id: i64,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub difficulty: Option<String>,
    pub duration: Option<i32>,
    pub category: Option<String>,
    pub options: Vec<String>,
    pub right_answer: Option<String>,
    pub suggested_answers: Vec<String>,
    pub created_at: DateTime<Utc>,
}
