use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;

use crate::dto::analytics_dto::{
    AnalyticsResponse, BehavioralAnalysisMeta, BehavioralAnalysisPayload,
    BehavioralAnalysisResponse, CandidateAnalytics, HeadlineScores,
};
use crate::error::{Error, Result};
use crate::models::candidate::Candidate;
use crate::models::interview_answer::RecordedAnswer;
use crate::models::job_post::JobPost;
use crate::services::candidate_service::recorded_answers;

const MAX_PROMPT_ANSWERS: i64 = 60;

const SYSTEM_PROMPT: &str = r#"You are an HR analytics engine. Given raw interview data for a candidate, produce an honest, actionable analytics report.
Return a JSON object with exactly these keys:
- aiEvaluationSummary: { summary, keyStrengths[], areasOfGrowth[] }
- behavioral_analysis: { confidence, engagement, eye_contact, facial_expressions, gestures, posture, voice_tone } as integers 0-100
- performanceBreakdown: { behavior, body_language, communicationSkills, confidenceLevel, culturalFit, leadershipPotential, problemSolving, technicalKnowledge }, each { overallAveragePercentage, answeredAveragePercentage?, summary }
- quickStats: { communicationSkills, confidenceLevel, leadershipPotential, problemSolving, technicalKnowledge } each one of Excellent, Good, Fair, Poor
- recommendations: { recommendation, summary }
- video_analysis_insights: { keyStrengths[], areasOfGrowth[], positive_indicators[], areas_for_improvement[], recommendations[] }
All percentages are integers in [0, 100]."#;

/// Chat completion backend returning the model's JSON object.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<JsonValue>;
}

#[derive(Clone)]
pub struct OpenAiModel {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiModel {
    pub fn new(api_key: String, model: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl AnalyticsModel for OpenAiModel {
    async fn complete(&self, system: &str, user: &str) -> Result<JsonValue> {
        let payload = json!({
            "model": self.model,
            "temperature": 0.3,
            "response_format": { "type": "json_object" },
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ]
        });

        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            tracing::error!(%status, body = %text, "analytics completion failed");
            return Err(Error::Internal(format!("OpenAI API error {}", status)));
        }

        let body: JsonValue = res.json().await?;
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .and_then(|s| serde_json::from_str(s).ok())
            .ok_or_else(malformed)
    }
}

/// Reads and writes the rows behind an analytics report.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Candidate owned by `owner_id`, if any.
    async fn find_candidate(&self, owner_id: &str, candidate_id: i64) -> Result<Option<Candidate>>;
    async fn find_job_post(&self, job_post_id: i64) -> Result<JobPost>;
    async fn recorded_answers(&self, candidate_id: i64, limit: i64) -> Result<Vec<RecordedAnswer>>;
    async fn save_analytics(
        &self,
        candidate_id: i64,
        analytics: &CandidateAnalytics,
        scores: &JsonValue,
    ) -> Result<Candidate>;
}

pub struct PgAnalyticsStore {
    pool: PgPool,
}

impl PgAnalyticsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalyticsStore for PgAnalyticsStore {
    async fn find_candidate(&self, owner_id: &str, candidate_id: i64) -> Result<Option<Candidate>> {
        let candidate = sqlx::query_as::<_, Candidate>(
            r#"
            SELECT c.* FROM candidates c
            JOIN job_posts j ON j.id = c.job_post_id
            WHERE c.id = $1 AND j.owner_id = $2
            "#,
        )
        .bind(candidate_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(candidate)
    }

    async fn find_job_post(&self, job_post_id: i64) -> Result<JobPost> {
        let job = sqlx::query_as::<_, JobPost>(r#"SELECT * FROM job_posts WHERE id = $1"#)
            .bind(job_post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(job)
    }

    async fn recorded_answers(&self, candidate_id: i64, limit: i64) -> Result<Vec<RecordedAnswer>> {
        recorded_answers(&self.pool, candidate_id, Some(limit)).await
    }

    async fn save_analytics(
        &self,
        candidate_id: i64,
        analytics: &CandidateAnalytics,
        scores: &JsonValue,
    ) -> Result<Candidate> {
        let updated = sqlx::query_as::<_, Candidate>(
            r#"
            UPDATE candidates
            SET ai_evaluation_summary = $2, behavioral_analysis = $3, performance_breakdown = $4,
                quick_stats = $5, recommendations = $6, video_analysis_insights = $7,
                scores = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(&analytics.ai_evaluation_summary)
        .bind(&analytics.behavioral_analysis)
        .bind(&analytics.performance_breakdown)
        .bind(&analytics.quick_stats)
        .bind(&analytics.recommendations)
        .bind(&analytics.video_analysis_insights)
        .bind(scores)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }
}

#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn AnalyticsStore>,
    model: Arc<dyn AnalyticsModel>,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn AnalyticsStore>, model: Arc<dyn AnalyticsModel>) -> Self {
        Self { store, model }
    }

    /// Generates and stores the analytics report for a candidate, or returns
    /// the stored one if it already exists.
    pub async fn generate(&self, owner_id: &str, candidate_id: i64) -> Result<AnalyticsResponse> {
        let candidate = self
            .store
            .find_candidate(owner_id, candidate_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", candidate_id)))?;

        if let Some(stored) = stored_analytics(&candidate) {
            tracing::debug!(candidate_id, "returning stored analytics");
            return Ok(response(candidate, stored, true));
        }

        let job = self.store.find_job_post(candidate.job_post_id).await?;
        let answers = self
            .store
            .recorded_answers(candidate_id, MAX_PROMPT_ANSWERS)
            .await?;

        let prompt = build_prompt(&candidate, &job, &answers);
        let raw = self.model.complete(SYSTEM_PROMPT, &prompt).await?;
        let analytics = parse_analytics(raw)?;
        let scores = serde_json::to_value(derive_scores(&analytics.performance_breakdown))?;

        let updated = self
            .store
            .save_analytics(candidate_id, &analytics, &scores)
            .await?;

        tracing::info!(candidate_id, answers = answers.len(), "analytics generated");
        Ok(response(updated, analytics, false))
    }
}

fn malformed() -> Error {
    Error::Internal("AI returned malformed analytics. Please try again.".to_string())
}

fn response(candidate: Candidate, analytics: CandidateAnalytics, cached: bool) -> AnalyticsResponse {
    AnalyticsResponse {
        candidate_id: candidate.id,
        name: candidate.name,
        photo_url: candidate.photo_url,
        interview_video_link: candidate.interview_video_link,
        cached,
        analytics,
        scores: candidate.scores,
    }
}

/// Behavioral analysis is the marker that a report was generated.
fn stored_analytics(candidate: &Candidate) -> Option<CandidateAnalytics> {
    let behavioral_analysis = candidate.behavioral_analysis.clone()?;
    let or_null = |v: &Option<JsonValue>| v.clone().unwrap_or(JsonValue::Null);
    Some(CandidateAnalytics {
        ai_evaluation_summary: or_null(&candidate.ai_evaluation_summary),
        behavioral_analysis,
        performance_breakdown: or_null(&candidate.performance_breakdown),
        quick_stats: or_null(&candidate.quick_stats),
        recommendations: or_null(&candidate.recommendations),
        video_analysis_insights: or_null(&candidate.video_analysis_insights),
    })
}

/// Accepts the model's object when it carries a behavioral analysis and a
/// performance breakdown. Other sections may be absent.
pub fn parse_analytics(raw: JsonValue) -> Result<CandidateAnalytics> {
    if !raw.is_object() {
        return Err(malformed());
    }
    let analytics: CandidateAnalytics = serde_json::from_value(raw).map_err(|e| {
        tracing::warn!(error = %e, "unparseable analytics payload");
        malformed()
    })?;
    if !analytics.behavioral_analysis.is_object() || !analytics.performance_breakdown.is_object() {
        return Err(malformed());
    }
    Ok(analytics)
}

pub fn derive_scores(breakdown: &JsonValue) -> HeadlineScores {
    let pct = |section: &str| {
        breakdown
            .get(section)
            .and_then(|s| s.get("overallAveragePercentage"))
            .and_then(|v| v.as_f64())
            .map(|v| v.round().clamp(0.0, 100.0) as i64)
            .unwrap_or(0)
    };
    HeadlineScores {
        communication: pct("communicationSkills"),
        technical: pct("technicalKnowledge"),
        problem_solving: pct("problemSolving"),
        leadership: pct("leadershipPotential"),
        body_language: pct("body_language"),
        confidence: pct("confidenceLevel"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Strong,
    Moderate,
    Weak,
}

impl Band {
    /// Bands an average score out of 10.
    fn of(avg_score: f64) -> Self {
        if avg_score >= 7.0 {
            Band::Strong
        } else if avg_score >= 5.0 {
            Band::Moderate
        } else {
            Band::Weak
        }
    }

    fn pick<'a>(self, strong: &'a str, moderate: &'a str, weak: &'a str) -> &'a str {
        match self {
            Band::Strong => strong,
            Band::Moderate => moderate,
            Band::Weak => weak,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Rule-based report built from answer scores, response times and answer
/// lengths. Needs no model call and writes nothing.
pub fn behavioral_analysis(payload: &BehavioralAnalysisPayload) -> Result<BehavioralAnalysisResponse> {
    let answers = &payload.questions_with_answer;
    if answers.is_empty() {
        return Err(Error::BadRequest("No questions with answers provided".to_string()));
    }

    let n = answers.len() as f64;
    let avg_score = answers.iter().map(|a| a.score.unwrap_or(0.0)).sum::<f64>() / n;
    let avg_response = answers.iter().map(|a| a.response_time.unwrap_or(0.0)).sum::<f64>() / n;
    let lengths: Vec<usize> = answers
        .iter()
        .map(|a| a.user_answer.as_deref().unwrap_or("").chars().count())
        .collect();
    let avg_length = lengths.iter().sum::<usize>() as f64 / n;
    let detailed = lengths.iter().filter(|&&l| l > 50).count();
    let brief = lengths.iter().filter(|&&l| l < 30).count();

    let band = Band::of(avg_score);
    let pct = (avg_score / 10.0 * 100.0).clamp(0.0, 100.0);
    let has_video = payload.video_url.as_deref().is_some_and(|u| !u.is_empty());
    let slow = avg_response > 30.0;
    let section = |strong: &str, moderate: &str, weak: &str| {
        json!({ "overallAveragePercentage": pct, "summary": band.pick(strong, moderate, weak) })
    };

    let performance_breakdown = json!({
        "communicationSkills": section(
            "Demonstrated strong communication skills with clear and articulate responses.",
            "Showed adequate communication skills with room for improvement in clarity.",
            "Communication skills need development. Consider focusing on structured responses.",
        ),
        "technicalKnowledge": section(
            "Exhibited solid technical knowledge and understanding of key concepts.",
            "Displayed basic technical knowledge with some gaps in understanding.",
            "Technical knowledge requires further development and study.",
        ),
        "confidenceLevel": section(
            "Displayed high confidence in responses and knowledge.",
            "Showed moderate confidence with some hesitation.",
            "Confidence level needs improvement. Consider more preparation.",
        ),
        "problemSolving": section(
            "Demonstrated strong problem-solving abilities.",
            "Showed basic problem-solving skills.",
            "Problem-solving skills need enhancement.",
        ),
        "leadershipPotential": section(
            "Exhibited leadership qualities in responses.",
            "Showed potential for leadership development.",
            "Leadership potential requires further assessment.",
        ),
        "body_language": {
            "overallAveragePercentage": if has_video { 75 } else { 0 },
            "summary": if has_video {
                "Video recording available for detailed body language analysis."
            } else {
                "No video recording available for body language assessment."
            },
        },
    });

    let count = answers.len();
    let summary = match band {
        Band::Strong => format!(
            "The candidate demonstrated strong performance across {} questions with an average score of {:.1}/10. Responses were detailed and showed good understanding of the subject matter.",
            count, avg_score
        ),
        Band::Moderate => format!(
            "The candidate showed moderate performance with an average score of {:.1}/10 across {} questions. Some areas showed promise while others need improvement.",
            avg_score, count
        ),
        Band::Weak => format!(
            "The candidate's performance indicates areas for significant improvement. Average score was {:.1}/10 across {} questions. Additional preparation and study would be beneficial.",
            avg_score, count
        ),
    };
    let ai_evaluation_summary = json!({
        "summary": summary,
        "keyStrengths": [
            band.pick("Strong technical knowledge", "Basic understanding demonstrated", "Willingness to participate"),
            if avg_length > 50.0 { "Detailed and comprehensive responses" } else { "Concise communication style" },
            if detailed > brief { "Thorough in explanations" } else { "Direct and to the point" },
        ],
        "areasOfGrowth": [
            if band == Band::Strong { "Continue building on existing knowledge" } else { "Enhance technical knowledge depth" },
            if slow { "Improve response time and efficiency" } else { "Maintain current response pace" },
            if brief > detailed { "Develop more detailed explanations" } else { "Continue providing comprehensive answers" },
        ],
    });

    let positive_indicators = if has_video {
        json!([
            "Video recording completed successfully",
            "Interview session captured for review",
            format!("Average response time: {:.1} seconds", avg_response),
        ])
    } else {
        json!([])
    };
    let video_analysis_insights = json!({
        "positive_indicators": positive_indicators,
        "areas_for_improvement": [
            if band == Band::Strong { "Continue maintaining high standards" } else { "Focus on improving answer quality and depth" },
            if slow { "Work on reducing response time" } else { "Maintain efficient response patterns" },
        ],
        "recommendations": [
            if band == Band::Strong { "Strong candidate - proceed with next interview round" } else { "Consider additional assessment" },
            "Review video recording for detailed behavioral analysis",
            "Provide feedback on areas identified for improvement",
        ],
    });

    let camera = |score: i64| if has_video { score } else { 0 };
    let behavioral = json!({
        "eye_contact": camera(75),
        "posture": camera(70),
        "gestures": camera(65),
        "facial_expressions": camera(70),
        "voice_tone": 75,
        "confidence": pct,
        "engagement": pct,
    });

    let recommendations = json!({
        "recommendation": band.pick("Highly Recommended", "Recommended", "Consider with reservations"),
        "summary": match band {
            Band::Strong => format!("Strong performance with average score of {:.1}/10. Candidate demonstrates good understanding and communication skills.", avg_score),
            Band::Moderate => format!("Moderate performance with average score of {:.1}/10. Candidate shows potential but may need additional training.", avg_score),
            Band::Weak => format!("Performance below expectations with average score of {:.1}/10. Consider additional assessment or training before proceeding.", avg_score),
        },
    });

    let rating = band.pick("Excellent", "Good", "Fair");
    let quick_stats = json!({
        "communicationSkills": rating,
        "technicalKnowledge": rating,
        "problemSolving": rating,
        "leadershipPotential": band.pick("Good", "Fair", "Poor"),
    });

    let scores = derive_scores(&performance_breakdown);
    tracing::debug!(questions = count, avg_score, has_video, "behavioral analysis computed");

    Ok(BehavioralAnalysisResponse {
        video_url: payload.video_url.clone(),
        analytics: CandidateAnalytics {
            ai_evaluation_summary,
            behavioral_analysis: behavioral,
            performance_breakdown,
            quick_stats,
            recommendations,
            video_analysis_insights,
        },
        scores,
        meta: BehavioralAnalysisMeta {
            total_questions: count,
            average_score: round2(avg_score),
            average_response_time: round2(avg_response),
            video_available: has_video,
        },
    })
}

/// Counts proctoring alerts by severity and type.
pub fn summarize_alerts(alerts: &JsonValue) -> String {
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for alert in alerts.as_array().into_iter().flatten() {
        let field = |k: &str| alert.get(k).and_then(|v| v.as_str()).unwrap_or("unknown").to_string();
        *counts.entry((field("severity"), field("type"))).or_default() += 1;
    }
    if counts.is_empty() {
        return "No proctoring alerts were raised.".to_string();
    }
    counts
        .into_iter()
        .map(|((severity, kind), n)| format!("  - [{}] {} x {}", severity, kind, n))
        .collect::<Vec<_>>()
        .join("\n")
}

fn or_na(v: Option<&str>) -> &str {
    v.filter(|s| !s.is_empty()).unwrap_or("N/A")
}

pub fn build_prompt(candidate: &Candidate, job: &JobPost, answers: &[RecordedAnswer]) -> String {
    let educations = candidate
        .educations
        .0
        .iter()
        .map(|e| {
            format!(
                "{} ({}) - {}% - {}",
                e.kind,
                or_na(e.stream.as_deref()),
                or_na(e.percentage.as_deref()),
                or_na(e.year_of_passing.as_deref())
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    let skills = if candidate.skills.is_empty() {
        "Not specified".to_string()
    } else {
        candidate.skills.join(", ")
    };
    let description: String = job.job_description.chars().take(400).collect();
    let qa = answers
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "[{}] ({} | {} | {})\n    Q: {}\n    A: {}\n    Score: {} | Time: {}s | AI eval: {}",
                i + 1,
                a.question_type.as_deref().unwrap_or(""),
                a.category.as_deref().unwrap_or(""),
                a.difficulty.as_deref().unwrap_or(""),
                a.question.as_deref().unwrap_or(""),
                a.answer.as_deref().unwrap_or(""),
                a.score.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                a.response_time.unwrap_or(0),
                a.ai_evaluation.as_deref().unwrap_or(""),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "CANDIDATE: {name}\nEducation: {educations}\nHighest Qualification: {qualification}\nSkills: {skills}\nLocation: {location}\n\n\
JOB: {title} at {company} ({job_type}, {experience})\nDepartment: {department}\nJob description snippet: {description}\n\n\
INTERVIEW STATS:\n- Status: {status} | Reason: {reason}\n- Grade: {grade} | Overall: {overall}/{total}\n\
- Attempted: {attempted} questions in {duration} min\n- Avg response time: {avg}s\n\
- Category scores: {categories}\n- Video recording available: {video}\n\n\
PROCTORING:\n{alerts}\n\nQUESTIONS & ANSWERS:\n{qa}",
        name = candidate.name,
        qualification = or_na(candidate.highest_qualification.as_deref()),
        location = or_na(candidate.location.as_deref()),
        title = job.job_title,
        company = job.company,
        job_type = job.job_type,
        experience = job.experience_level,
        department = job.department,
        status = candidate.status,
        reason = or_na(candidate.reason.as_deref()),
        grade = or_na(candidate.grade.as_deref()),
        overall = candidate.overall_score.unwrap_or(0),
        total = candidate.total_score.unwrap_or(0),
        attempted = candidate.attempted_questions,
        duration = candidate.duration.unwrap_or(0),
        avg = candidate.average_response_time,
        categories = candidate.category_percentage.clone().unwrap_or(JsonValue::Null),
        video = if candidate.interview_video_link.is_some() { "Yes" } else { "No" },
        alerts = summarize_alerts(&candidate.proctoring_alerts),
    )
}
