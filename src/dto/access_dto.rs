use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::candidate::ProfileUpdate;
use crate::services::access_gate::JoinOutcome;

/// Join requests are not validated up front: the gate's own checks decide,
/// in order, what a malformed token or unknown email means.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinRequest {
    pub token: String,
    pub email: String,
    #[serde(flatten)]
    pub profile: ProfileUpdate,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub outcome: JoinOutcome,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueTokenResponse {
    pub message: &'static str,
    pub token: String,
    pub link: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendLinkPayload {
    #[validate(length(min = 1, message = "At least one email is required"))]
    pub emails: Vec<String>,
    pub subject: Option<String>,
    pub message_template: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipient {
    pub name: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendLinkResponse {
    pub message: String,
    pub count: usize,
    pub sent_to: Vec<Recipient>,
    pub expires_at: DateTime<Utc>,
}
