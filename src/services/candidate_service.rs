use std::collections::HashSet;

use sqlx::{PgConnection, PgPool};

use crate::dto::candidate_dto::{
    AddCandidatesResponse, CandidateDetailResponse, CandidateSummary, RosterEntry,
    SubmitInterviewPayload, UpdateStatusPayload,
};
use crate::error::{Error, Result};
use crate::models::candidate::{normalize_email, Candidate, CandidateStatus};
use crate::models::interview_answer::RecordedAnswer;
use crate::models::job_post::JobPost;
use crate::services::access_gate::AccessError;

#[derive(Clone)]
pub struct CandidateService {
    pool: PgPool,
}

impl CandidateService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Adds roster entries to a job post. Emails already on the roster are
    /// skipped and reported; adding nothing new is a conflict.
    pub async fn add(&self, job_post_id: i64, entries: &[RosterEntry]) -> Result<AddCandidatesResponse> {
        if entries.is_empty() {
            return Err(Error::BadRequest("At least one candidate is required".to_string()));
        }
        let roster = dedupe_roster(entries);

        let mut tx = self.pool.begin().await?;
        let (added, skipped) = insert_roster(&mut *tx, job_post_id, &roster).await?;
        if added.is_empty() {
            return Err(Error::Conflict(
                "All provided candidates already exist for this job post".to_string(),
            ));
        }
        tx.commit().await?;

        tracing::info!(job_post_id, added = added.len(), skipped = skipped.len(), "candidates added");
        Ok(AddCandidatesResponse {
            message: format!("{} candidate(s) added", added.len()),
            count: added.len(),
            candidates: added.into_iter().map(CandidateSummary::from).collect(),
            skipped_duplicates: skipped,
        })
    }

    pub async fn list(&self, job_post_id: i64) -> Result<Vec<CandidateSummary>> {
        let rows = sqlx::query_as::<_, Candidate>(
            r#"SELECT * FROM candidates WHERE job_post_id = $1 ORDER BY created_at DESC, id DESC"#,
        )
        .bind(job_post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CandidateSummary::from).collect())
    }

    pub async fn count(&self, job_post_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM candidates WHERE job_post_id = $1"#)
            .bind(job_post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn delete_all(&self, job_post_id: i64) -> Result<u64> {
        let result = sqlx::query(r#"DELETE FROM candidates WHERE job_post_id = $1"#)
            .bind(job_post_id)
            .execute(&self.pool)
            .await?;
        tracing::info!(job_post_id, deleted = result.rows_affected(), "roster cleared");
        Ok(result.rows_affected())
    }

    /// Swaps the whole roster for `entries` in one transaction.
    pub async fn replace(&self, job_post_id: i64, entries: &[RosterEntry]) -> Result<Vec<CandidateSummary>> {
        let roster = dedupe_roster(entries);
        let mut tx = self.pool.begin().await?;
        sqlx::query(r#"DELETE FROM candidates WHERE job_post_id = $1"#)
            .bind(job_post_id)
            .execute(&mut *tx)
            .await?;
        let (added, _) = insert_roster(&mut *tx, job_post_id, &roster).await?;
        tx.commit().await?;

        tracing::info!(job_post_id, count = added.len(), "roster replaced");
        Ok(added.into_iter().map(CandidateSummary::from).collect())
    }

    /// Five most recently added candidates across the owner's job posts.
    pub async fn recent(&self, owner_id: &str) -> Result<Vec<CandidateSummary>> {
        let rows = sqlx::query_as::<_, Candidate>(
            r#"
            SELECT c.* FROM candidates c
            JOIN job_posts j ON j.id = c.job_post_id
            WHERE j.owner_id = $1
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT 5
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CandidateSummary::from).collect())
    }

    async fn find_owned(&self, owner_id: &str, candidate_id: i64) -> Result<Candidate> {
        sqlx::query_as::<_, Candidate>(
            r#"
            SELECT c.* FROM candidates c
            JOIN job_posts j ON j.id = c.job_post_id
            WHERE c.id = $1 AND j.owner_id = $2
            "#,
        )
        .bind(candidate_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", candidate_id)))
    }

    pub async fn get_detail(&self, owner_id: &str, candidate_id: i64) -> Result<CandidateDetailResponse> {
        let candidate = self.find_owned(owner_id, candidate_id).await?;
        let job_post = sqlx::query_as::<_, JobPost>(r#"SELECT * FROM job_posts WHERE id = $1"#)
            .bind(candidate.job_post_id)
            .fetch_one(&self.pool)
            .await?;
        let answers = recorded_answers(&self.pool, candidate_id, None).await?;
        Ok(CandidateDetailResponse {
            candidate,
            job_post,
            answers,
        })
    }

    pub async fn delete(&self, owner_id: &str, candidate_id: i64) -> Result<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM candidates c
            USING job_posts j
            WHERE c.id = $1 AND j.id = c.job_post_id AND j.owner_id = $2
            "#,
        )
        .bind(candidate_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Candidate {} not found", candidate_id)));
        }
        tracing::info!(candidate_id, "candidate deleted");
        Ok(())
    }

    /// Administrative status change, held to the same transition table as
    /// the interview flow.
    pub async fn update_status(
        &self,
        owner_id: &str,
        candidate_id: i64,
        payload: &UpdateStatusPayload,
    ) -> Result<Candidate> {
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_as::<_, Candidate>(
            r#"
            SELECT c.* FROM candidates c
            JOIN job_posts j ON j.id = c.job_post_id
            WHERE c.id = $1 AND j.owner_id = $2
            FOR UPDATE OF c
            "#,
        )
        .bind(candidate_id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", candidate_id)))?;

        check_transition(current.status, payload.status)?;

        let updated = sqlx::query_as::<_, Candidate>(
            r#"
            UPDATE candidates
            SET status = $2, reason = COALESCE($3, reason), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(payload.status)
        .bind(&payload.reason)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(candidate_id, from = %current.status, to = %payload.status, "candidate status changed");
        Ok(updated)
    }

    /// Records the outcome of an interview for a candidate of `job_post_id`.
    /// Answers from an earlier submission are replaced. The job post's
    /// interview counter moves only on the candidate's first submission.
    pub async fn submit_interview(
        &self,
        job_post_id: i64,
        payload: &SubmitInterviewPayload,
    ) -> Result<Candidate> {
        let target = payload.target_status();
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Candidate>(
            r#"SELECT * FROM candidates WHERE id = $1 AND job_post_id = $2 FOR UPDATE"#,
        )
        .bind(payload.candidate_id)
        .bind(job_post_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AccessError::AccessDenied)?;

        check_transition(current.status, target)?;
        let first_submission = current.interview_date.is_none();

        sqlx::query(r#"DELETE FROM interview_answers WHERE candidate_id = $1"#)
            .bind(current.id)
            .execute(&mut *tx)
            .await?;
        for answer in &payload.answers {
            sqlx::query(
                r#"
                INSERT INTO interview_answers (
                    candidate_id, question_id, answer, ai_evaluation, score, response_time, end_time
                )
                SELECT $1, q.id, $3, $4, $5, $6, $7
                FROM (SELECT $2::BIGINT AS wanted) w
                LEFT JOIN interview_questions q ON q.id = w.wanted AND q.job_post_id = $8
                "#,
            )
            .bind(current.id)
            .bind(answer.question_id)
            .bind(&answer.answer)
            .bind(&answer.ai_evaluation)
            .bind(answer.score)
            .bind(answer.response_time)
            .bind(answer.end_time)
            .bind(job_post_id)
            .execute(&mut *tx)
            .await?;
        }

        let updated = sqlx::query_as::<_, Candidate>(
            r#"
            UPDATE candidates
            SET status = $2,
                interview_date = COALESCE(interview_date, NOW()),
                duration = COALESCE($3, duration),
                overall_score = COALESCE($4, overall_score),
                total_score = COALESCE($5, total_score),
                grade = COALESCE($6, grade),
                attempted_questions = COALESCE($7, attempted_questions),
                average_response_time = COALESCE($8, average_response_time),
                interview_video_link = COALESCE($9, interview_video_link),
                photo_url = COALESCE($10, photo_url),
                reason = COALESCE($11, reason),
                category_percentage = COALESCE($12, category_percentage),
                proctoring_alerts = COALESCE($13, proctoring_alerts),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(current.id)
        .bind(target)
        .bind(payload.duration)
        .bind(payload.overall_score)
        .bind(payload.total_score)
        .bind(&payload.grade)
        .bind(payload.attempted_questions)
        .bind(payload.average_response_time)
        .bind(&payload.interview_video_link)
        .bind(&payload.photo_url)
        .bind(&payload.reason)
        .bind(&payload.category_percentage)
        .bind(&payload.proctoring_alerts)
        .fetch_one(&mut *tx)
        .await?;

        if first_submission {
            sqlx::query(
                r#"UPDATE job_posts SET interviews = interviews + 1, updated_at = NOW() WHERE id = $1"#,
            )
            .bind(job_post_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            job_post_id,
            candidate_id = updated.id,
            status = %updated.status,
            answers = payload.answers.len(),
            first_submission,
            "interview submitted"
        );
        Ok(updated)
    }
}

/// Rejects moves outside the status table. Moves out of a closed interview
/// surface as `AlreadyCompleted` so candidates see the same answer as on join.
pub fn check_transition(from: CandidateStatus, to: CandidateStatus) -> Result<()> {
    if from.can_transition_to(to) {
        return Ok(());
    }
    if from.is_terminal() {
        return Err(AccessError::AlreadyCompleted.into());
    }
    Err(Error::BadRequest(format!(
        "Cannot change candidate status from {} to {}",
        from, to
    )))
}

/// Normalizes emails and keeps the first entry for each address.
pub fn dedupe_roster(entries: &[RosterEntry]) -> Vec<RosterEntry> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter_map(|e| {
            let email = normalize_email(&e.email);
            if email.is_empty() || !seen.insert(email.clone()) {
                return None;
            }
            Some(RosterEntry {
                name: e.name.trim().to_string(),
                email,
                phone_number: e.phone_number.clone(),
            })
        })
        .collect()
}

/// Inserts roster entries, leaving existing `(job_post_id, email)` pairs
/// alone. Returns the inserted rows and the skipped emails.
pub(crate) async fn insert_roster(
    conn: &mut PgConnection,
    job_post_id: i64,
    entries: &[RosterEntry],
) -> Result<(Vec<Candidate>, Vec<String>)> {
    let mut added = Vec::with_capacity(entries.len());
    let mut skipped = Vec::new();
    for entry in entries {
        let row = sqlx::query_as::<_, Candidate>(
            r#"
            INSERT INTO candidates (job_post_id, name, email, mobile, status, applied_date)
            VALUES ($1, $2, $3, $4, 'pending', NOW())
            ON CONFLICT (job_post_id, lower(email)) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(job_post_id)
        .bind(&entry.name)
        .bind(&entry.email)
        .bind(&entry.phone_number)
        .fetch_optional(&mut *conn)
        .await?;
        match row {
            Some(candidate) => added.push(candidate),
            None => skipped.push(entry.email.clone()),
        }
    }
    Ok((added, skipped))
}

/// Answers of a candidate joined with their questions, oldest first.
pub(crate) async fn recorded_answers(
    pool: &PgPool,
    candidate_id: i64,
    limit: Option<i64>,
) -> Result<Vec<RecordedAnswer>> {
    let rows = sqlx::query_as::<_, RecordedAnswer>(
        r#"
        SELECT a.id, a.candidate_id, a.question_id, a.answer, a.ai_evaluation, a.score,
               a.response_time, a.end_time, a.created_at,
               q.question, q.question_type, q.category, q.difficulty
        FROM interview_answers a
        LEFT JOIN interview_questions q ON q.id = a.question_id
        WHERE a.candidate_id = $1
        ORDER BY a.id ASC
        LIMIT $2
        "#,
    )
    .bind(candidate_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, email: &str) -> RosterEntry {
        RosterEntry {
            name: name.to_string(),
            email: email.to_string(),
            phone_number: None,
        }
    }

    #[test]
    fn roster_is_deduplicated_case_insensitively() {
        let roster = dedupe_roster(&[
            entry("Ann", "Ann@Example.com"),
            entry("Ann again", "ann@example.com "),
            entry("Bob", "bob@example.com"),
        ]);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].email, "ann@example.com");
        assert_eq!(roster[0].name, "Ann");
        assert_eq!(roster[1].email, "bob@example.com");
    }

    #[test]
    fn blank_emails_are_dropped() {
        assert!(dedupe_roster(&[entry("Nobody", "   ")]).is_empty());
    }

    #[test]
    fn submission_from_inprogress_is_allowed() {
        assert!(check_transition(CandidateStatus::InProgress, CandidateStatus::UnderReview).is_ok());
        assert!(check_transition(CandidateStatus::InProgress, CandidateStatus::Completed).is_ok());
        assert!(check_transition(CandidateStatus::UnderReview, CandidateStatus::Completed).is_ok());
    }

    #[test]
    fn submission_before_join_is_rejected() {
        let err = check_transition(CandidateStatus::Pending, CandidateStatus::UnderReview).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn closed_interview_reports_already_completed() {
        let err = check_transition(CandidateStatus::Completed, CandidateStatus::UnderReview).unwrap_err();
        assert!(matches!(err, Error::Access(AccessError::AlreadyCompleted)));

        let err = check_transition(CandidateStatus::UnderReview, CandidateStatus::InProgress).unwrap_err();
        assert!(matches!(err, Error::Access(AccessError::AlreadyCompleted)));

        let err = check_transition(CandidateStatus::Completed, CandidateStatus::Completed).unwrap_err();
        assert!(matches!(err, Error::Access(AccessError::AlreadyCompleted)));
    }
}
