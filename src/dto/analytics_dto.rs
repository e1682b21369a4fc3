use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateAnalyticsPayload {
    pub candidate_id: i64,
}

/// The six sections the model is asked to return, as stored on the
/// candidate row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateAnalytics {
    #[serde(alias = "aiEvaluationSummary")]
    pub ai_evaluation_summary: JsonValue,
    pub behavioral_analysis: JsonValue,
    #[serde(alias = "performanceBreakdown")]
    pub performance_breakdown: JsonValue,
    #[serde(alias = "quickStats")]
    pub quick_stats: JsonValue,
    pub recommendations: JsonValue,
    pub video_analysis_insights: JsonValue,
}

/// Headline percentages derived from `performance_breakdown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadlineScores {
    pub communication: i64,
    pub technical: i64,
    pub problem_solving: i64,
    pub leadership: i64,
    pub body_language: i64,
    pub confidence: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsResponse {
    pub candidate_id: i64,
    pub name: String,
    pub photo_url: Option<String>,
    pub interview_video_link: Option<String>,
    /// True when the analytics were already stored and no model call was made.
    pub cached: bool,
    #[serde(flatten)]
    pub analytics: CandidateAnalytics,
    pub scores: Option<JsonValue>,
}

/// One answered question as the interview client reports it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoredAnswer {
    /// Score out of 10.
    pub score: Option<f64>,
    /// Seconds.
    #[serde(alias = "responseTime")]
    pub response_time: Option<f64>,
    #[serde(alias = "userAnswer")]
    pub user_answer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BehavioralAnalysisPayload {
    pub video_url: Option<String>,
    #[serde(default, alias = "questionsWithAnswer")]
    pub questions_with_answer: Vec<ScoredAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehavioralAnalysisMeta {
    pub total_questions: usize,
    pub average_score: f64,
    pub average_response_time: f64,
    pub video_available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BehavioralAnalysisResponse {
    pub video_url: Option<String>,
    #[serde(flatten)]
    pub analytics: CandidateAnalytics,
    pub scores: HeadlineScores,
    pub meta: BehavioralAnalysisMeta,
}
