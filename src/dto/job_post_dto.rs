use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::dto::candidate_dto::{CandidateSummary, RosterEntry};
use crate::models::interview_question::InterviewQuestion;
use crate::models::job_post::{DurationMode, JobPost, JobPostStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalaryPayload {
    pub min: Option<i32>,
    pub max: Option<i32>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_right_answer"))]
pub struct QuestionPayload {
    #[validate(length(min = 1, message = "Question text cannot be empty"))]
    pub question: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1))]
    pub question_type: String,
    pub difficulty: Option<String>,
    pub expected_duration: Option<i32>,
    pub category: Option<String>,
    #[serde(default)]
    pub suggested_answers: Vec<String>,
    #[serde(default)]
    pub options: Vec<String>,
    pub right_answer: Option<String>,
}

/// A question ready to be stored: options trimmed with blanks dropped and the
/// right answer resolved against them.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub question: String,
    pub question_type: String,
    pub difficulty: Option<String>,
    pub duration: Option<i32>,
    pub category: Option<String>,
    pub options: Vec<String>,
    pub right_answer: Option<String>,
    pub suggested_answers: Vec<String>,
}

impl QuestionPayload {
    fn clean_options(&self) -> Vec<String> {
        self.options
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn clean_right_answer(&self) -> Option<String> {
        self.right_answer
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }

    pub fn normalize(&self) -> NewQuestion {
        NewQuestion {
            question: self.question.trim().to_string(),
            question_type: self.question_type.clone(),
            difficulty: self.difficulty.clone(),
            duration: self.expected_duration,
            category: self.category.clone(),
            options: self.clean_options(),
            right_answer: self.clean_right_answer(),
            suggested_answers: self
                .suggested_answers
                .iter()
                .filter(|s| !s.trim().is_empty())
                .cloned()
                .collect(),
        }
    }
}

fn validate_right_answer(q: &QuestionPayload) -> Result<(), ValidationError> {
    let Some(right) = q.clean_right_answer() else {
        return Ok(());
    };
    let options = q.clean_options();
    let snippet: String = q.question.chars().take(50).collect();
    if options.is_empty() {
        let mut err = ValidationError::new("right_answer_without_options");
        err.message = Some(
            format!("Question \"{}...\": right_answer can only be set when options are provided", snippet).into(),
        );
        return Err(err);
    }
    if !options.contains(&right) {
        let mut err = ValidationError::new("right_answer_not_an_option");
        err.message = Some(
            format!("Question \"{}...\": right_answer must be one of the option values", snippet).into(),
        );
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateJobPostPayload {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub company: String,
    #[validate(length(min = 1))]
    pub department: String,
    #[validate(length(min = 1, message = "At least one location is required"))]
    pub location: Vec<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1))]
    pub job_type: String,
    #[validate(length(min = 1))]
    pub experience: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub salary: Option<SalaryPayload>,
    pub status: Option<JobPostStatus>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub questions: Vec<QuestionPayload>,
    #[serde(default)]
    #[validate(nested)]
    pub students: Vec<RosterEntry>,
    #[serde(default)]
    pub enable_video_recording: bool,
    pub interview_start_date_time: Option<DateTime<Utc>>,
    pub logo_url: Option<String>,
    pub duration_mode: Option<DurationMode>,
    pub interview_duration: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateJobPostPayload {
    #[validate(length(min = 1))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub company: Option<String>,
    #[validate(length(min = 1))]
    pub department: Option<String>,
    pub location: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub experience: Option<String>,
    pub description: Option<String>,
    pub salary: Option<SalaryPayload>,
    pub status: Option<JobPostStatus>,
    pub requirements: Option<Vec<String>>,
    pub responsibilities: Option<Vec<String>>,
    pub skills: Option<Vec<String>>,
    #[validate(nested)]
    pub questions: Option<Vec<QuestionPayload>>,
    pub enable_video_recording: Option<bool>,
    pub interview_start_date_time: Option<DateTime<Utc>>,
    pub logo_url: Option<String>,
    pub duration_mode: Option<DurationMode>,
    pub interview_duration: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalaryView {
    pub min: i32,
    pub max: i32,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPostResponse {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub department: String,
    pub location: Vec<String>,
    #[serde(rename = "type")]
    pub job_type: String,
    pub experience: String,
    pub description: String,
    pub salary: Option<SalaryView>,
    pub requirements: Vec<String>,
    pub responsibilities: Vec<String>,
    pub skills: Vec<String>,
    pub questions: Vec<InterviewQuestion>,
    pub status: JobPostStatus,
    pub created_by: String,
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

impl JobPostResponse {
    pub fn new(job: JobPost, questions: Vec<InterviewQuestion>) -> Self {
        let salary = match (job.salary_min, job.salary_max) {
            (Some(min), Some(max)) => Some(SalaryView {
                min,
                max,
                currency: job.salary_currency.clone(),
            }),
            _ => None,
        };
        Self {
            id: job.id,
            title: job.job_title,
            company: job.company,
            department: job.department,
            location: job.location,
            job_type: job.job_type,
            experience: job.experience_level,
            description: job.job_description,
            salary,
            requirements: job.requirements,
            responsibilities: job.responsibilities,
            skills: job.skills,
            questions,
            status: job.status,
            created_by: job.owner_id,
            applicants: job.applicants,
            interviews: job.interviews,
            enable_video_recording: job.enable_video_recording,
            interview_start_date_time: job.interview_start_date_time,
            logo_url: job.logo_url,
            duration_mode: job.duration_mode,
            interview_duration: job.interview_duration,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobPostDetailResponse {
    pub post: JobPostResponse,
    pub candidates: Vec<CandidateSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: &[&str], right: Option<&str>) -> QuestionPayload {
        QuestionPayload {
            question: "Which keyword declares an immutable binding?".into(),
            question_type: "mcq".into(),
            difficulty: None,
            expected_duration: Some(30),
            category: None,
            suggested_answers: vec![],
            options: options.iter().map(|s| s.to_string()).collect(),
            right_answer: right.map(str::to_string),
        }
    }

    #[test]
    fn right_answer_must_match_an_option() {
        assert!(question(&["let", "mut"], Some("let")).validate().is_ok());
        assert!(question(&["let", "mut"], Some("const")).validate().is_err());
    }

    #[test]
    fn right_answer_requires_options() {
        assert!(question(&[], Some("let")).validate().is_err());
        assert!(question(&["", "  "], Some("let")).validate().is_err());
        assert!(question(&[], None).validate().is_ok());
    }

    #[test]
    fn normalize_trims_options_and_answer() {
        let q = question(&[" let ", "", "mut"], Some(" let "));
        assert!(q.validate().is_ok());
        let normalized = q.normalize();
        assert_eq!(normalized.options, vec!["let".to_string(), "mut".to_string()]);
        assert_eq!(normalized.right_answer.as_deref(), Some("let"));
    }

    #[test]
    fn blank_right_answer_is_ignored() {
        let q = question(&[], Some("   "));
        assert!(q.validate().is_ok());
        assert_eq!(q.normalize().right_answer, None);
    }
}
