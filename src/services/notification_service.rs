use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};
use sqlx::{PgConnection, PgPool};
use url::Url;
use validator::ValidateEmail;

use crate::dto::access_dto::{IssueTokenResponse, Recipient, SendLinkPayload, SendLinkResponse};
use crate::error::{Error, Result};
use crate::models::candidate::{normalize_email, Candidate};
use crate::models::job_post::JobPost;
use crate::models::outbox_message::OutboxMessage;
use crate::services::token_service::{LinkKind, LinkTokenService};
use crate::utils::time::Clock;

const DEFAULT_TEMPLATE: &str = "Hello {{name}},\n\n\
You have been invited to interview for {{job_title}} at {{company}}.\n\
Open the link below to begin:\n\n{{link}}\n\n\
This link expires on {{expires_at}}.";

/// Issues interview links and queues the emails that carry them. Messages
/// land in `email_outbox` as `pending`; a separate mailer delivers them.
#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
    tokens: LinkTokenService,
    clock: Arc<dyn Clock>,
    frontend_url: String,
}

impl NotificationService {
    pub fn new(
        pool: PgPool,
        tokens: LinkTokenService,
        clock: Arc<dyn Clock>,
        frontend_url: String,
    ) -> Self {
        Self {
            pool,
            tokens,
            clock,
            frontend_url,
        }
    }

    pub fn generate_token(&self, job: &JobPost) -> Result<IssueTokenResponse> {
        let issued = self.tokens.issue_link(job.id, LinkKind::Exam, self.clock.now())?;
        let link = interview_link(&self.frontend_url, &issued.token)?;
        Ok(IssueTokenResponse {
            message: "Token generated",
            token: issued.token,
            link,
            expires_at: issued.expires_at,
        })
    }

    /// Sends a short-lived link to arbitrary addresses.
    pub async fn share_link(&self, job: &JobPost, payload: &SendLinkPayload) -> Result<SendLinkResponse> {
        let emails = clean_emails(&payload.emails)?;
        let issued = self.tokens.issue_link(job.id, LinkKind::Share, self.clock.now())?;
        let link = interview_link(&self.frontend_url, &issued.token)?;

        let recipients: Vec<Recipient> = emails
            .into_iter()
            .map(|email| Recipient { name: None, email })
            .collect();
        self.enqueue_all("share_link", job, &recipients, &link, issued.expires_at, payload)
            .await?;

        tracing::info!(job_post_id = job.id, count = recipients.len(), "share links queued");
        Ok(SendLinkResponse {
            message: format!("Interview link queued for {} recipient(s)", recipients.len()),
            count: recipients.len(),
            sent_to: recipients,
            expires_at: issued.expires_at,
        })
    }

    /// Sends the long-lived exam link to the given addresses that are on the
    /// job post's roster. Addresses not on the roster are ignored.
    pub async fn exam_link(&self, job: &JobPost, payload: &SendLinkPayload) -> Result<SendLinkResponse> {
        let emails = clean_emails(&payload.emails)?;
        let matched = sqlx::query_as::<_, Candidate>(
            r#"SELECT * FROM candidates WHERE job_post_id = $1 AND lower(email) = ANY($2) ORDER BY id ASC"#,
        )
        .bind(job.id)
        .bind(&emails)
        .fetch_all(&self.pool)
        .await?;

        if matched.is_empty() {
            return Err(Error::NotFound(
                "None of the provided emails are registered candidates for this job post".to_string(),
            ));
        }

        let issued = self.tokens.issue_link(job.id, LinkKind::Exam, self.clock.now())?;
        let link = interview_link(&self.frontend_url, &issued.token)?;
        let recipients: Vec<Recipient> = matched
            .into_iter()
            .map(|c| Recipient {
                name: Some(c.name),
                email: c.email,
            })
            .collect();
        self.enqueue_all("exam_link", job, &recipients, &link, issued.expires_at, payload)
            .await?;

        tracing::info!(
            job_post_id = job.id,
            requested = emails.len(),
            count = recipients.len(),
            "exam links queued"
        );
        Ok(SendLinkResponse {
            message: format!("Exam link queued for {} candidate(s)", recipients.len()),
            count: recipients.len(),
            sent_to: recipients,
            expires_at: issued.expires_at,
        })
    }

    async fn enqueue_all(
        &self,
        kind: &str,
        job: &JobPost,
        recipients: &[Recipient],
        link: &str,
        expires_at: DateTime<Utc>,
        payload: &SendLinkPayload,
    ) -> Result<()> {
        let subject = payload
            .subject
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("Interview invitation: {}", job.job_title));
        let template = payload.message_template.as_deref().unwrap_or(DEFAULT_TEMPLATE);

        let mut tx = self.pool.begin().await?;
        for recipient in recipients {
            let body = render_message(template, recipient.name.as_deref(), job, link, expires_at);
            let message = json!({
                "job_post_id": job.id,
                "job_title": job.job_title,
                "company": job.company,
                "link": link,
                "expires_at": expires_at,
                "body": body,
            });
            enqueue(&mut *tx, kind, &recipient.email, &subject, &message).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

async fn enqueue(
    conn: &mut PgConnection,
    kind: &str,
    recipient: &str,
    subject: &str,
    payload: &JsonValue,
) -> Result<OutboxMessage> {
    let row = sqlx::query_as::<_, OutboxMessage>(
        r#"
        INSERT INTO email_outbox (kind, recipient, subject, payload, status)
        VALUES ($1, $2, $3, $4, 'pending')
        RETURNING *
        "#,
    )
    .bind(kind)
    .bind(recipient)
    .bind(subject)
    .bind(payload)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// `{frontend_url}/?token=...`
pub fn interview_link(frontend_url: &str, token: &str) -> Result<String> {
    let mut url = Url::parse(frontend_url)
        .map_err(|e| Error::Config(format!("Invalid FRONTEND_URL: {}", e)))?;
    url.query_pairs_mut().clear().append_pair("token", token);
    Ok(url.to_string())
}

/// Lower-cases, drops duplicates and rejects malformed addresses.
pub fn clean_emails(raw: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut emails = Vec::new();
    for email in raw {
        let email = normalize_email(email);
        if email.is_empty() {
            continue;
        }
        if !email.validate_email() {
            return Err(Error::BadRequest(format!("Invalid email address: {}", email)));
        }
        if seen.insert(email.clone()) {
            emails.push(email);
        }
    }
    if emails.is_empty() {
        return Err(Error::BadRequest("At least one email is required".to_string()));
    }
    Ok(emails)
}

pub fn render_message(
    template: &str,
    name: Option<&str>,
    job: &JobPost,
    link: &str,
    expires_at: DateTime<Utc>,
) -> String {
    template
        .replace("{{name}}", name.unwrap_or("there"))
        .replace("{{job_title}}", &job.job_title)
        .replace("{{company}}", &job.company)
        .replace("{{link}}", link)
        .replace("{{expires_at}}", &expires_at.format("%Y-%m-%d %H:%M UTC").to_string())
}
