use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::services::access_gate::AccessError;

/// The kinds of interview link the platform hands out. They carry identical
/// claims and differ only in lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Ad-hoc share link sent to arbitrary addresses.
    Share,
    /// Exam link distributed to a job post's roster.
    Exam,
}

impl LinkKind {
    pub fn ttl(self) -> Duration {
        match self {
            LinkKind::Share => Duration::days(2),
            LinkKind::Exam => Duration::days(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkClaims {
    pub job_post_id: i64,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub token: String,
    pub job_post_id: i64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies interview access tokens. Tokens are stateless: expiry
/// is the only way one stops working.
#[derive(Clone)]
pub struct LinkTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl LinkTokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(
        &self,
        job_post_id: i64,
        ttl: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<AccessToken> {
        let expires_at = issued_at + ttl;
        let claims = LinkClaims {
            job_post_id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("Failed to sign access token: {}", e)))?;

        Ok(AccessToken {
            token,
            job_post_id,
            issued_at,
            expires_at,
        })
    }

    pub fn issue_link(&self, job_post_id: i64, kind: LinkKind, issued_at: DateTime<Utc>) -> Result<AccessToken> {
        self.issue(job_post_id, kind.ttl(), issued_at)
    }

    /// Checks signature and expiry. Expiry is judged against `now` so the
    /// caller's clock is authoritative.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> std::result::Result<LinkClaims, AccessError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let data = decode::<LinkClaims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected access token");
            AccessError::InvalidToken
        })?;

        if now.timestamp() >= data.claims.exp {
            let expired_at = Utc.timestamp_opt(data.claims.exp, 0).single();
            tracing::debug!(job_post_id = data.claims.job_post_id, ?expired_at, "access token expired");
            return Err(AccessError::TokenExpired);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn issued_token_verifies_before_expiry() {
        let svc = LinkTokenService::new("secret");
        let issued = at("2026-03-01T10:00:00Z");
        let token = svc.issue_link(42, LinkKind::Exam, issued).unwrap();

        assert_eq!(token.expires_at, at("2026-03-31T10:00:00Z"));
        let claims = svc.verify(&token.token, at("2026-03-20T00:00:00Z")).unwrap();
        assert_eq!(claims.job_post_id, 42);
        assert_eq!(claims.iat, issued.timestamp());
    }

    #[test]
    fn share_links_live_two_days() {
        let svc = LinkTokenService::new("secret");
        let issued = at("2026-03-01T10:00:00Z");
        let token = svc.issue_link(7, LinkKind::Share, issued).unwrap();
        assert_eq!(token.expires_at, at("2026-03-03T10:00:00Z"));

        assert!(svc.verify(&token.token, at("2026-03-03T09:59:59Z")).is_ok());
        assert!(matches!(
            svc.verify(&token.token, at("2026-03-03T10:00:00Z")),
            Err(AccessError::TokenExpired)
        ));
    }

    #[test]
    fn tampered_token_is_invalid() {
        let svc = LinkTokenService::new("secret");
        let token = svc.issue_link(1, LinkKind::Share, Utc::now()).unwrap();
        let mut tampered = token.token.clone();
        tampered.push('x');
        assert!(matches!(svc.verify(&tampered, Utc::now()), Err(AccessError::InvalidToken)));
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let issuer = LinkTokenService::new("secret-a");
        let verifier = LinkTokenService::new("secret-b");
        let token = issuer.issue_link(1, LinkKind::Exam, Utc::now()).unwrap();
        assert!(matches!(
            verifier.verify(&token.token, Utc::now()),
            Err(AccessError::InvalidToken)
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        let svc = LinkTokenService::new("secret");
        assert!(matches!(svc.verify("not-a-token", Utc::now()), Err(AccessError::InvalidToken)));
        assert!(matches!(svc.verify("", Utc::now()), Err(AccessError::InvalidToken)));
    }
}
