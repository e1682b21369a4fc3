use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_post_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobPostStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "duration_mode", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DurationMode {
    #[default]
    Question,
    Interview,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPost {
    pub id: i64,
    pub owner_id: String,
    pub job_title: String,
    pub company: String,
    pub department: String,
    pub location: Vec<String>,
    pub job_type: String,
    pub experience_level: String,
    pub job_description: String,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub salary_currency: Option<String>,
    pub requirements: Vec<String>,
    pub responsibilities: Vec<String>,
    pub skills: Vec<String>,
    pub status: JobPostStatus,
    pub applicants: i32,
    pub interviews: i32,
    pub enable_video_recording: bool,
    pub interview_start_date_time: Option<DateTime<Utc>>,
    pub logo_url: Option<String>,
    pub duration_mode: DurationMode,
    pub interview_duration: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobPost {
    /// The scheduled start when the interview window is still closed at
    /// `now`. Posts without a start are always open.
    pub fn opens_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.interview_start_date_time.filter(|start| now < *start)
    }
}
