use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub action_type: String,
    pub cat_id: Option<Uuid>,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub details: Option<serde_json::Value>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
}

/// Action types recorded by the server side services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ActionType {
    CatCreated,
    CatUpdated,
    CatDeleted,
    CatRestored,
    CatPurged,
    MediaUploaded,
    MediaRegistered,
    MediaTrashed,
    MediaRestored,
    MediaLocked,
    MediaUnlocked,
    MediaPurged,
    TrashEmptied,
    LogsArchived,
    LogsDeleted,
    LogsPurged,
    SettingsUpdated,
}

/// A log entry to be recorded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLogEntry {
    #[serde(default)]
    pub level: LogLevel,
    pub message: String,
    pub action_type: String,
    pub cat_id: Option<Uuid>,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub details: Option<serde_json::Value>,
}

impl NewLogEntry {
    pub fn new(level: LogLevel, action: ActionType, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            action_type: action.to_string(),
            ..Default::default()
        }
    }

    pub fn with_cat(mut self, cat_id: Option<Uuid>) -> Self {
        self.cat_id = cat_id;
        self
    }

    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogQuery {
    pub level: Option<LogLevel>,
    pub action_type: Option<String>,
    pub cat_id: Option<Uuid>,
    pub archived: Option<bool>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveLogsRequest {
    pub older_than_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteLogsRequest {
    pub older_than_days: u32,
    #[serde(default = "default_archived_only")]
    pub archived_only: bool,
}

fn default_archived_only() -> bool {
    true
}

/// Returned when a background log operation has been started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStarted {
    pub operation_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_renders_snake_case() {
        assert_eq!(ActionType::MediaTrashed.to_string(), "media_trashed");
        let entry = NewLogEntry::new(LogLevel::Warn, ActionType::CatPurged, "gone");
        assert_eq!(entry.action_type, "cat_purged");
        assert_eq!(entry.level, LogLevel::Warn);
    }

    #[test]
    fn test_delete_request_defaults_to_archived_only() {
        let request: DeleteLogsRequest = serde_json::from_str(r#"{"older_than_days": 30}"#).unwrap();
        assert!(request.archived_only);
    }
}
