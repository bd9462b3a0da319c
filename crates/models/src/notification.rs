use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ModelError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Parse a notification list; accepts a bare array or a paginated `{"results": [..]}` body.
pub fn parse_notifications(body: &Value) -> Result<Vec<Notification>, ModelError> {
    let list = body.get("results").unwrap_or(body);
    serde_json::from_value(list.clone()).map_err(|e| ModelError::Payload(e.to_string()))
}

pub fn unread_count(items: &[Notification]) -> usize {
    items.iter().filter(|n| !n.is_read).count()
}
