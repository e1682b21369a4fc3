use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};

use crate::dto::candidate_dto::CandidateSummary;
use crate::dto::job_post_dto::{
    CreateJobPostPayload, JobPostDetailResponse, JobPostResponse, NewQuestion,
    UpdateJobPostPayload,
};
use crate::error::{Error, Result};
use crate::models::candidate::Candidate;
use crate::models::interview_question::InterviewQuestion;
use crate::models::job_post::{JobPost, JobPostStatus};
use crate::services::candidate_service::{dedupe_roster, insert_roster};

#[derive(Clone)]
pub struct JobPostService {
    pool: PgPool,
}

impl JobPostService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads a job post the caller owns. Posts owned by someone else are
    /// reported as missing.
    pub async fn find_owned(&self, owner_id: &str, id: i64) -> Result<JobPost> {
        sqlx::query_as::<_, JobPost>(r#"SELECT * FROM job_posts WHERE id = $1 AND owner_id = $2"#)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Job post {} not found", id)))
    }

    pub async fn create(
        &self,
        owner_id: &str,
        payload: CreateJobPostPayload,
    ) -> Result<JobPostResponse> {
        let questions: Vec<NewQuestion> = payload.questions.iter().map(|q| q.normalize()).collect();
        let roster = dedupe_roster(&payload.students);
        let salary = payload.salary.clone();

        let mut tx = self.pool.begin().await?;

        let job = sqlx::query_as::<_, JobPost>(
            r#"
            INSERT INTO job_posts (
                owner_id, job_title, company, department, location, job_type,
                experience_level, job_description, salary_min, salary_max, salary_currency,
                requirements, responsibilities, skills, status, enable_video_recording,
                interview_start_date_time, logo_url, duration_mode, interview_duration
            ) VALUES (
                $1,$2,$3,$4,$5,$6,
                $7,$8,$9,$10,$11,
                $12,$13,$14,$15,$16,
                $17,$18,$19,$20
            )
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(&payload.title)
        .bind(&payload.company)
        .bind(&payload.department)
        .bind(&payload.location)
        .bind(&payload.job_type)
        .bind(&payload.experience)
        .bind(&payload.description)
        .bind(salary.as_ref().and_then(|s| s.min))
        .bind(salary.as_ref().and_then(|s| s.max))
        .bind(salary.as_ref().and_then(|s| s.currency.clone()))
        .bind(&payload.requirements)
        .bind(&payload.responsibilities)
        .bind(&payload.skills)
        .bind(payload.status.unwrap_or(JobPostStatus::Draft))
        .bind(payload.enable_video_recording)
        .bind(payload.interview_start_date_time)
        .bind(&payload.logo_url)
        .bind(payload.duration_mode.unwrap_or_default())
        .bind(payload.interview_duration)
        .fetch_one(&mut *tx)
        .await?;

        let stored = insert_questions(&mut *tx, job.id, &questions).await?;
        let (added, _) = insert_roster(&mut *tx, job.id, &roster).await?;

        tx.commit().await?;

        tracing::info!(
            job_post_id = job.id,
            questions = stored.len(),
            candidates = added.len(),
            "job post created"
        );
        Ok(JobPostResponse::new(job, stored))
    }

    /// Job posts of one owner, newest first.
    pub async fn list(&self, owner_id: &str) -> Result<Vec<JobPostResponse>> {
        let jobs = sqlx::query_as::<_, JobPost>(
            r#"SELECT * FROM job_posts WHERE owner_id = $1 ORDER BY created_at DESC, id DESC"#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = jobs.iter().map(|j| j.id).collect();
        let questions = sqlx::query_as::<_, InterviewQuestion>(
            r#"SELECT * FROM interview_questions WHERE job_post_id = ANY($1) ORDER BY id ASC"#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_job: HashMap<i64, Vec<InterviewQuestion>> = HashMap::new();
        for q in questions {
            by_job.entry(q.job_post_id).or_default().push(q);
        }

        Ok(jobs
            .into_iter()
            .map(|job| {
                let qs = by_job.remove(&job.id).unwrap_or_default();
                JobPostResponse::new(job, qs)
            })
            .collect())
    }

    pub async fn get(&self, owner_id: &str, id: i64) -> Result<JobPostDetailResponse> {
        let job = self.find_owned(owner_id, id).await?;
        let questions = self.questions(id).await?;
        let candidates = sqlx::query_as::<_, Candidate>(
            r#"SELECT * FROM candidates WHERE job_post_id = $1 ORDER BY created_at DESC, id DESC"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(JobPostDetailResponse {
            post: JobPostResponse::new(job, questions),
            candidates: candidates.into_iter().map(CandidateSummary::from).collect(),
        })
    }

    /// Omitted fields keep their stored values. Questions are replaced as a
    /// whole when provided.
    pub async fn update(
        &self,
        owner_id: &str,
        id: i64,
        payload: UpdateJobPostPayload,
    ) -> Result<JobPostResponse> {
        let salary = payload.salary.clone();
        let mut tx = self.pool.begin().await?;

        let job = sqlx::query_as::<_, JobPost>(
            r#"
            UPDATE job_posts
            SET
                job_title = COALESCE($3, job_title),
                company = COALESCE($4, company),
                department = COALESCE($5, department),
                location = COALESCE($6, location),
                job_type = COALESCE($7, job_type),
                experience_level = COALESCE($8, experience_level),
                job_description = COALESCE($9, job_description),
                salary_min = COALESCE($10, salary_min),
                salary_max = COALESCE($11, salary_max),
                salary_currency = COALESCE($12, salary_currency),
                requirements = COALESCE($13, requirements),
                responsibilities = COALESCE($14, responsibilities),
                skills = COALESCE($15, skills),
                status = COALESCE($16, status),
                enable_video_recording = COALESCE($17, enable_video_recording),
                interview_start_date_time = COALESCE($18, interview_start_date_time),
                logo_url = COALESCE($19, logo_url),
                duration_mode = COALESCE($20, duration_mode),
                interview_duration = COALESCE($21, interview_duration),
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(&payload.title)
        .bind(&payload.company)
        .bind(&payload.department)
        .bind(&payload.location)
        .bind(&payload.job_type)
        .bind(&payload.experience)
        .bind(&payload.description)
        .bind(salary.as_ref().and_then(|s| s.min))
        .bind(salary.as_ref().and_then(|s| s.max))
        .bind(salary.as_ref().and_then(|s| s.currency.clone()))
        .bind(&payload.requirements)
        .bind(&payload.responsibilities)
        .bind(&payload.skills)
        .bind(payload.status)
        .bind(payload.enable_video_recording)
        .bind(payload.interview_start_date_time)
        .bind(&payload.logo_url)
        .bind(payload.duration_mode)
        .bind(payload.interview_duration)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Job post {} not found", id)))?;

        let questions = match payload.questions.as_ref() {
            Some(questions) => {
                let questions: Vec<NewQuestion> = questions.iter().map(|q| q.normalize()).collect();
                sqlx::query(r#"DELETE FROM interview_questions WHERE job_post_id = $1"#)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                insert_questions(&mut *tx, id, &questions).await?
            }
            None => {
                sqlx::query_as::<_, InterviewQuestion>(
                    r#"SELECT * FROM interview_questions WHERE job_post_id = $1 ORDER BY id ASC"#,
                )
                .bind(id)
                .fetch_all(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;

        tracing::info!(job_post_id = id, "job post updated");
        Ok(JobPostResponse::new(job, questions))
    }

    /// Questions, candidates and their answers go with the post.
    pub async fn delete(&self, owner_id: &str, id: i64) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM job_posts WHERE id = $1 AND owner_id = $2"#)
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Job post {} not found", id)));
        }
        tracing::info!(job_post_id = id, "job post deleted");
        Ok(())
    }

    pub async fn questions(&self, job_post_id: i64) -> Result<Vec<InterviewQuestion>> {
        let questions = sqlx::query_as::<_, InterviewQuestion>(
            r#"SELECT * FROM interview_questions WHERE job_post_id = $1 ORDER BY id ASC"#,
        )
        .bind(job_post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }
}

async fn insert_questions(
    conn: &mut PgConnection,
    job_post_id: i64,
    questions: &[NewQuestion],
) -> Result<Vec<InterviewQuestion>> {
    let mut stored = Vec::with_capacity(questions.len());
    for q in questions {
        let row = sqlx::query_as::<_, InterviewQuestion>(
            r#"
            INSERT INTO interview_questions (
                job_post_id, question, question_type, difficulty, duration,
                category, options, right_answer, suggested_answers
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            RETURNING *
            "#,
        )
        .bind(job_post_id)
        .bind(&q.question)
        .bind(&q.question_type)
        .bind(&q.difficulty)
        .bind(q.duration)
        .bind(&q.category)
        .bind(&q.options)
        .bind(&q.right_answer)
        .bind(&q.suggested_answers)
        .fetch_one(&mut *conn)
        .await?;
        stored.push(row);
    }
    Ok(stored)
}
