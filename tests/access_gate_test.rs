use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use interview_backend::models::candidate::{Candidate, CandidateStatus, ProfileUpdate};
use interview_backend::models::interview_question::InterviewQuestion;
use interview_backend::models::job_post::{DurationMode, JobPost, JobPostStatus};
use interview_backend::services::access_gate::{
    plan_admission, AccessError, AccessGate, AccessStore, Admission,
};
use interview_backend::services::token_service::{LinkKind, LinkTokenService};
use interview_backend::utils::time::FixedClock;

const SECRET: &str = "integration-secret";

#[derive(Default)]
struct World {
    jobs: HashMap<i64, JobPost>,
    candidates: Vec<Candidate>,
    questions: Vec<InterviewQuestion>,
    questions_unavailable: bool,
}

/// Store that serializes admissions behind one lock, like a row lock would.
struct MemoryStore {
    world: Mutex<World>,
}

impl MemoryStore {
    fn new(world: World) -> Arc<Self> {
        Arc::new(Self {
            world: Mutex::new(world),
        })
    }

    async fn applicants(&self, job_post_id: i64) -> i32 {
        self.world.lock().await.jobs[&job_post_id].applicants
    }

    async fn candidate(&self, id: i64) -> Candidate {
        let world = self.world.lock().await;
        world.candidates.iter().find(|c| c.id == id).cloned().unwrap()
    }

    async fn set_status(&self, id: i64, status: CandidateStatus) {
        let mut world = self.world.lock().await;
        if let Some(c) = world.candidates.iter_mut().find(|c| c.id == id) {
            c.status = status;
        }
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    async fn find_job_post(&self, job_post_id: i64) -> Result<Option<JobPost>, AccessError> {
        Ok(self.world.lock().await.jobs.get(&job_post_id).cloned())
    }

    async fn find_candidate(
        &self,
        job_post_id: i64,
        email: &str,
    ) -> Result<Option<Candidate>, AccessError> {
        let world = self.world.lock().await;
        Ok(world
            .candidates
            .iter()
            .find(|c| c.job_post_id == job_post_id && c.email.to_lowercase() == email)
            .cloned())
    }

    async fn admit_candidate(
        &self,
        candidate_id: i64,
        profile: &ProfileUpdate,
    ) -> Result<Admission, AccessError> {
        let mut world = self.world.lock().await;
        let idx = world
            .candidates
            .iter()
            .position(|c| c.id == candidate_id)
            .ok_or(AccessError::AccessDenied)?;

        let plan = plan_admission(world.candidates[idx].clone(), profile)?;
        tokio::task::yield_now().await;
        world.candidates[idx] = plan.candidate.clone();

        let job_post_id = plan.candidate.job_post_id;
        let job = world
            .jobs
            .get_mut(&job_post_id)
            .ok_or(AccessError::JobNotFound(job_post_id))?;
        if plan.first_join {
            job.applicants += 1;
        }
        Ok(Admission {
            applicants: job.applicants,
            candidate: plan.candidate,
            first_join: plan.first_join,
        })
    }

    async fn list_interview_questions(
        &self,
        job_post_id: i64,
    ) -> Result<Vec<InterviewQuestion>, AccessError> {
        let world = self.world.lock().await;
        if world.questions_unavailable {
            return Err(AccessError::StorageUnavailable(sqlx::Error::PoolTimedOut));
        }
        Ok(world
            .questions
            .iter()
            .filter(|q| q.job_post_id == job_post_id)
            .cloned()
            .collect())
    }
}

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-10T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn job(id: i64, start: Option<DateTime<Utc>>) -> JobPost {
    JobPost {
        id,
        owner_id: "admin-1".into(),
        job_title: "Platform Engineer".into(),
        company: "Acme".into(),
        department: "Infra".into(),
        location: vec!["Remote".into()],
        job_type: "full-time".into(),
        experience_level: "mid".into(),
        job_description: "Keep the lights on".into(),
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
        created_at: now(),
        updated_at: now(),
    }
}

fn question(id: i64, job_post_id: i64, text: &str) -> InterviewQuestion {
    InterviewQuestion {
        id,
        job_post_id,
        question: text.into(),
        question_type: "text".into(),
        difficulty: None,
        duration: Some(120),
        category: Some("systems".into()),
        options: vec![],
        right_answer: None,
        suggested_answers: vec![],
        created_at: now(),
    }
}

/// Job 42 with candidate 1 (a@b.com) on its roster and two questions.
fn world(start: Option<DateTime<Utc>>) -> World {
    let mut world = World::default();
    world.jobs.insert(42, job(42, start));
    world.candidates.push(Candidate::new_pending(1, 42, "", "a@b.com"));
    world.candidates.push(Candidate::new_pending(2, 42, "Mixed", "Mixed@Case.org"));
    world.questions.push(question(10, 42, "Describe a recent outage."));
    world.questions.push(question(11, 42, "How do you size a thread pool?"));
    world
}

fn tokens() -> LinkTokenService {
    LinkTokenService::new(SECRET)
}

fn exam_token(job_post_id: i64) -> String {
    tokens()
        .issue_link(job_post_id, LinkKind::Exam, now())
        .unwrap()
        .token
}

fn gate(store: Arc<MemoryStore>) -> AccessGate {
    AccessGate::new(store, Arc::new(FixedClock(now())), tokens())
}

fn alice() -> ProfileUpdate {
    ProfileUpdate {
        name: Some("Alice".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn rostered_candidate_joins_with_exam_token() {
    let store = MemoryStore::new(world(None));
    let gate = gate(store.clone());

    let outcome = gate
        .request_join(&exam_token(42), "A@B.com", &alice())
        .await
        .expect("join");

    assert_eq!(outcome.job_post_id, 42);
    assert_eq!(outcome.applicants, 1);
    assert_eq!(outcome.candidate_id, 1);
    assert_eq!(outcome.candidate_name, "Alice");
    assert_eq!(outcome.job_title, "Platform Engineer");
    assert_eq!(outcome.questions.len(), 2);
    assert_eq!(outcome.questions[0].question, "Describe a recent outage.");

    let stored = store.candidate(1).await;
    assert_eq!(stored.status, CandidateStatus::InProgress);
    assert_eq!(stored.name, "Alice");
    assert_eq!(store.applicants(42).await, 1);
}

#[tokio::test]
async fn email_match_ignores_case_and_whitespace() {
    let store = MemoryStore::new(world(None));
    let outcome = gate(store)
        .request_join(&exam_token(42), "  MIXED@case.ORG ", &ProfileUpdate::default())
        .await
        .expect("join");
    assert_eq!(outcome.candidate_id, 2);
    assert_eq!(outcome.candidate_name, "Mixed");
}

#[tokio::test]
async fn rejoining_an_interview_in_progress_does_not_recount() {
    let store = MemoryStore::new(world(None));
    let gate = gate(store.clone());
    let token = exam_token(42);

    gate.request_join(&token, "a@b.com", &alice()).await.expect("first join");
    let again = gate
        .request_join(&token, "a@b.com", &ProfileUpdate::default())
        .await
        .expect("second join");

    assert_eq!(again.applicants, 1);
    assert_eq!(again.candidate_name, "Alice");
    assert_eq!(store.applicants(42).await, 1);
}

#[tokio::test]
async fn failed_question_read_leaves_candidate_untouched() {
    let mut world = world(None);
    world.questions_unavailable = true;
    let store = MemoryStore::new(world);

    let err = gate(store.clone())
        .request_join(&exam_token(42), "a@b.com", &alice())
        .await
        .unwrap_err();

    assert!(matches!(err, AccessError::StorageUnavailable(_)));
    let stored = store.candidate(1).await;
    assert_eq!(stored.status, CandidateStatus::Pending);
    assert_eq!(stored.name, "");
    assert_eq!(store.applicants(42).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_count_the_candidate_once() {
    let store = MemoryStore::new(world(None));
    let gate = Arc::new(gate(store.clone()));
    let token = exam_token(42);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let gate = gate.clone();
            let token = token.clone();
            tokio::spawn(async move { gate.request_join(&token, "a@b.com", &alice()).await })
        })
        .collect();

    for handle in handles {
        handle.await.expect("task").expect("join");
    }
    assert_eq!(store.applicants(42).await, 1);
    assert_eq!(store.candidate(1).await.status, CandidateStatus::InProgress);
}

#[tokio::test]
async fn completed_candidate_cannot_rejoin() {
    let store = MemoryStore::new(world(None));
    let gate = gate(store.clone());
    let token = exam_token(42);

    gate.request_join(&token, "a@b.com", &alice()).await.expect("join");
    store.set_status(1, CandidateStatus::Completed).await;

    let err = gate
        .request_join(&token, "a@b.com", &ProfileUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::AlreadyCompleted));
    assert_eq!(store.applicants(42).await, 1);
    assert_eq!(store.candidate(1).await.status, CandidateStatus::Completed);
}

#[tokio::test]
async fn candidate_under_review_cannot_rejoin() {
    let store = MemoryStore::new(world(None));
    store.set_status(1, CandidateStatus::UnderReview).await;

    let err = gate(store.clone())
        .request_join(&exam_token(42), "a@b.com", &alice())
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::AlreadyCompleted));
    assert_eq!(store.candidate(1).await.name, "");
}

#[tokio::test]
async fn expired_share_link_changes_nothing() {
    let store = MemoryStore::new(world(None));
    let token = tokens()
        .issue_link(42, LinkKind::Share, now() - Duration::days(2))
        .unwrap()
        .token;

    let err = gate(store.clone())
        .request_join(&token, "a@b.com", &alice())
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::TokenExpired));
    assert_eq!(store.applicants(42).await, 0);
    assert_eq!(store.candidate(1).await.status, CandidateStatus::Pending);
}

#[tokio::test]
async fn token_from_another_deployment_is_invalid() {
    let store = MemoryStore::new(world(None));
    let foreign = LinkTokenService::new("someone-else")
        .issue_link(42, LinkKind::Exam, now())
        .unwrap()
        .token;

    let err = gate(store)
        .request_join(&foreign, "a@b.com", &alice())
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::InvalidToken));
}

#[tokio::test]
async fn interview_closed_until_scheduled_start() {
    let start = now() + Duration::hours(2);
    let store = MemoryStore::new(world(Some(start)));

    let err = gate(store.clone())
        .request_join(&exam_token(42), "a@b.com", &alice())
        .await
        .unwrap_err();
    match err {
        AccessError::NotYetOpen(at) => assert_eq!(at, start),
        other => panic!("expected NotYetOpen, got {other:?}"),
    }
    assert_eq!(store.candidate(1).await.status, CandidateStatus::Pending);
    assert_eq!(store.applicants(42).await, 0);
}

#[tokio::test]
async fn interview_opens_at_scheduled_start() {
    let store = MemoryStore::new(world(Some(now())));
    let outcome = gate(store)
        .request_join(&exam_token(42), "a@b.com", &alice())
        .await
        .expect("join at start");
    assert_eq!(outcome.applicants, 1);
}

#[tokio::test]
async fn email_not_on_roster_is_denied() {
    let store = MemoryStore::new(world(None));
    let err = gate(store.clone())
        .request_join(&exam_token(42), "intruder@b.com", &alice())
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::AccessDenied));
    assert_eq!(store.applicants(42).await, 0);
}

#[tokio::test]
async fn token_for_deleted_job_post_is_not_found() {
    let store = MemoryStore::new(world(None));
    let err = gate(store)
        .request_join(&exam_token(99), "a@b.com", &alice())
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::JobNotFound(99)));
}

#[tokio::test]
async fn preview_resolves_job_without_joining() {
    let store = MemoryStore::new(world(None));
    let preview = gate(store.clone())
        .preview(&exam_token(42))
        .await
        .expect("preview");
    assert_eq!(preview.job_post.id, 42);
    assert_eq!(preview.questions.len(), 2);
    assert_eq!(store.candidate(1).await.status, CandidateStatus::Pending);
}
