use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::candidate::{Candidate, ProfileUpdate};
use crate::models::interview_question::InterviewQuestion;
use crate::models::job_post::JobPost;
use crate::services::access_gate::{plan_admission, AccessError, AccessStore, Admission};

#[derive(Clone)]
pub struct PgAccessStore {
    pool: PgPool,
}

impl PgAccessStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessStore for PgAccessStore {
    async fn find_job_post(&self, job_post_id: i64) -> Result<Option<JobPost>, AccessError> {
        let job = sqlx::query_as::<_, JobPost>(r#"SELECT * FROM job_posts WHERE id = $1"#)
            .bind(job_post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn find_candidate(
        &self,
        job_post_id: i64,
        email: &str,
    ) -> Result<Option<Candidate>, AccessError> {
        let candidate = sqlx::query_as::<_, Candidate>(
            r#"SELECT * FROM candidates WHERE job_post_id = $1 AND lower(email) = $2"#,
        )
        .bind(job_post_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(candidate)
    }

    async fn admit_candidate(
        &self,
        candidate_id: i64,
        profile: &ProfileUpdate,
    ) -> Result<Admission, AccessError> {
        let mut tx = self.pool.begin().await?;

        // The row lock serializes concurrent joins for the same candidate, so
        // the second one sees `inprogress` and does not bump the counter.
        let locked = sqlx::query_as::<_, Candidate>(
            r#"SELECT * FROM candidates WHERE id = $1 FOR UPDATE"#,
        )
        .bind(candidate_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AccessError::AccessDenied)?;

        let plan = plan_admission(locked, profile)?;
        let merged = plan.candidate;

        let candidate = sqlx::query_as::<_, Candidate>(
            r#"
            UPDATE candidates
            SET name = $2, resume_url = $3, mobile = $4, dob = $5,
                highest_qualification = $6, educations = $7, location = $8,
                skills = $9, region = $10, residence_location = $11,
                status = $12, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(merged.id)
        .bind(&merged.name)
        .bind(&merged.resume_url)
        .bind(&merged.mobile)
        .bind(merged.dob)
        .bind(&merged.highest_qualification)
        .bind(&merged.educations)
        .bind(&merged.location)
        .bind(&merged.skills)
        .bind(&merged.region)
        .bind(&merged.residence_location)
        .bind(merged.status)
        .fetch_one(&mut *tx)
        .await?;

        let applicants: i32 = if plan.first_join {
            sqlx::query_scalar(
                r#"UPDATE job_posts SET applicants = applicants + 1, updated_at = NOW() WHERE id = $1 RETURNING applicants"#,
            )
            .bind(candidate.job_post_id)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_scalar(r#"SELECT applicants FROM job_posts WHERE id = $1"#)
                .bind(candidate.job_post_id)
                .fetch_one(&mut *tx)
                .await?
        };

        tx.commit().await?;

        Ok(Admission {
            candidate,
            applicants,
            first_join: plan.first_join,
        })
    }

    async fn list_interview_questions(
        &self,
        job_post_id: i64,
    ) -> Result<Vec<InterviewQuestion>, AccessError> {
        let questions = sqlx::query_as::<_, InterviewQuestion>(
            r#"SELECT * FROM interview_questions WHERE job_post_id = $1 ORDER BY id ASC"#,
        )
        .bind(job_post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }
}
