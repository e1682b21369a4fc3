use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{types::Json, FromRow};

/// Interview progress of a candidate on one job post.
///
/// Allowed moves:
///
/// | from           | to                            |
/// |----------------|-------------------------------|
/// | `pending`      | `inprogress`                  |
/// | `inprogress`   | `inprogress`, `under_review`, `completed` |
/// | `under_review` | `completed`                   |
///
/// `under_review` and `completed` close the interview for joining.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "candidate_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    #[default]
    Pending,
    #[sqlx(rename = "inprogress")]
    #[serde(rename = "inprogress")]
    InProgress,
    UnderReview,
    Completed,
}

impl CandidateStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, CandidateStatus::UnderReview | CandidateStatus::Completed)
    }

    pub fn can_transition_to(self, next: CandidateStatus) -> bool {
        use CandidateStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (InProgress, InProgress)
                | (InProgress, UnderReview)
                | (InProgress, Completed)
                | (UnderReview, Completed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CandidateStatus::Pending => "pending",
            CandidateStatus::InProgress => "inprogress",
            CandidateStatus::UnderReview => "under_review",
            CandidateStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    /// `tenth`, `plus_two` or `degree`.
    #[serde(rename = "type")]
    pub kind: String,
    pub school_name: Option<String>,
    pub college_name: Option<String>,
    pub stream: Option<String>,
    pub percentage: Option<String>,
    pub year_of_passing: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: i64,
    pub job_post_id: i64,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub dob: Option<NaiveDate>,
    pub highest_qualification: Option<String>,
    pub educations: Json<Vec<Education>>,
    pub resume_url: Option<String>,
    pub location: Option<String>,
    pub residence_location: Option<String>,
    pub region: Option<String>,
    pub skills: Vec<String>,
    pub status: CandidateStatus,
    pub applied_date: Option<DateTime<Utc>>,
    pub interview_date: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
    pub overall_score: Option<i32>,
    pub total_score: Option<i32>,
    pub grade: Option<String>,
    pub attempted_questions: i32,
    pub average_response_time: i32,
    pub interview_video_link: Option<String>,
    pub photo_url: Option<String>,
    pub reason: Option<String>,
    pub category_percentage: Option<JsonValue>,
    pub proctoring_alerts: JsonValue,
    pub scores: Option<JsonValue>,
    pub ai_evaluation_summary: Option<JsonValue>,
    pub behavioral_analysis: Option<JsonValue>,
    pub performance_breakdown: Option<JsonValue>,
    pub quick_stats: Option<JsonValue>,
    pub recommendations: Option<JsonValue>,
    pub video_analysis_insights: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Candidate {
    /// A freshly registered roster entry, as an administrator would create it.
    pub fn new_pending(id: i64, job_post_id: i64, name: &str, email: &str) -> Self {
        let now = Utc::now();
        Self {
            id,
            job_post_id,
            name: name.to_string(),
            email: normalize_email(email),
            mobile: None,
            dob: None,
            highest_qualification: None,
            educations: Json(Vec::new()),
            resume_url: None,
            location: None,
            residence_location: None,
            region: None,
            skills: Vec::new(),
            status: CandidateStatus::Pending,
            applied_date: Some(now),
            interview_date: None,
            duration: None,
            overall_score: None,
            total_score: None,
            grade: None,
            attempted_questions: 0,
            average_response_time: 0,
            interview_video_link: None,
            photo_url: None,
            reason: None,
            category_percentage: None,
            proctoring_alerts: JsonValue::Array(Vec::new()),
            scores: None,
            ai_evaluation_summary: None,
            behavioral_analysis: None,
            performance_breakdown: None,
            quick_stats: None,
            recommendations: None,
            video_analysis_insights: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Roster emails are compared case-insensitively and stored lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Profile fields a candidate may supply while joining. Absent or blank
/// values leave the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub resume_url: Option<String>,
    pub mobile: Option<String>,
    pub dob: Option<NaiveDate>,
    pub highest_qualification: Option<String>,
    pub educations: Option<Vec<Education>>,
    pub location: Option<String>,
    pub skills: Option<Vec<String>>,
    pub region: Option<String>,
    pub residence_location: Option<String>,
}

impl ProfileUpdate {
    pub fn apply_to(&self, candidate: &mut Candidate) {
        if let Some(name) = present(&self.name) {
            candidate.name = name.to_string();
        }
        merge_text(&mut candidate.resume_url, &self.resume_url);
        merge_text(&mut candidate.mobile, &self.mobile);
        merge_text(&mut candidate.highest_qualification, &self.highest_qualification);
        merge_text(&mut candidate.location, &self.location);
        merge_text(&mut candidate.region, &self.region);
        merge_text(&mut candidate.residence_location, &self.residence_location);
        if let Some(dob) = self.dob {
            candidate.dob = Some(dob);
        }
        if let Some(educations) = self.educations.as_ref().filter(|e| !e.is_empty()) {
            candidate.educations = Json(educations.clone());
        }
        if let Some(skills) = self.skills.as_ref() {
            let skills: Vec<String> = skills
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if !skills.is_empty() {
                candidate.skills = skills;
            }
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn merge_text(stored: &mut Option<String>, incoming: &Option<String>) {
    if let Some(value) = present(incoming) {
        *stored = Some(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_close_the_interview() {
        assert!(!CandidateStatus::Pending.is_terminal());
        assert!(!CandidateStatus::InProgress.is_terminal());
        assert!(CandidateStatus::UnderReview.is_terminal());
        assert!(CandidateStatus::Completed.is_terminal());
    }

    #[test]
    fn transition_table() {
        use CandidateStatus::*;
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(UnderReview));
        assert!(InProgress.can_transition_to(Completed));
        assert!(UnderReview.can_transition_to(Completed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(UnderReview));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!UnderReview.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(Pending));
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&CandidateStatus::InProgress).unwrap(),
            "\"inprogress\""
        );
        assert_eq!(
            serde_json::from_str::<CandidateStatus>("\"under_review\"").unwrap(),
            CandidateStatus::UnderReview
        );
    }

    #[test]
    fn omitted_name_is_preserved() {
        let mut candidate = Candidate::new_pending(1, 1, "Jane", "jane@x.com");
        ProfileUpdate::default().apply_to(&mut candidate);
        assert_eq!(candidate.name, "Jane");
    }

    #[test]
    fn present_name_overwrites() {
        let mut candidate = Candidate::new_pending(1, 1, "Jane", "jane@x.com");
        let update = ProfileUpdate {
            name: Some("Jane Doe".into()),
            ..Default::default()
        };
        update.apply_to(&mut candidate);
        assert_eq!(candidate.name, "Jane Doe");
    }

    #[test]
    fn blank_values_do_not_clobber() {
        let mut candidate = Candidate::new_pending(1, 1, "Jane", "jane@x.com");
        candidate.mobile = Some("555-0100".into());
        candidate.skills = vec!["rust".into()];
        let update = ProfileUpdate {
            name: Some("   ".into()),
            mobile: Some(String::new()),
            skills: Some(vec!["".into()]),
            educations: Some(vec![]),
            ..Default::default()
        };
        update.apply_to(&mut candidate);
        assert_eq!(candidate.name, "Jane");
        assert_eq!(candidate.mobile.as_deref(), Some("555-0100"));
        assert_eq!(candidate.skills, vec!["rust".to_string()]);
    }

    #[test]
    fn partial_update_merges_field_by_field() {
        let mut candidate = Candidate::new_pending(1, 1, "Jane", "jane@x.com");
        candidate.location = Some("Lisbon".into());
        let update = ProfileUpdate {
            resume_url: Some("https://cv.example/jane.pdf".into()),
            dob: NaiveDate::from_ymd_opt(1995, 4, 2),
            educations: Some(vec![Education {
                kind: "degree".into(),
                college_name: Some("IST".into()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        update.apply_to(&mut candidate);
        assert_eq!(candidate.location.as_deref(), Some("Lisbon"));
        assert_eq!(candidate.resume_url.as_deref(), Some("https://cv.example/jane.pdf"));
        assert_eq!(candidate.dob, NaiveDate::from_ymd_opt(1995, 4, 2));
        assert_eq!(candidate.educations.0.len(), 1);
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Jane@X.com "), "jane@x.com");
    }
}
