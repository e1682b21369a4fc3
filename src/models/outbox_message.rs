use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub kind: String,
    pub recipient: String,
    pub subject: String,
    pub payload: JsonValue,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
