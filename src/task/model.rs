#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TaskdeckError;

pub const MAX_TITLE_LEN: usize = 200;

/// A to-do item as the task service serves it. Timestamps are kept as the
/// server-provided strings; the client never synthesizes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// Create request body: `{title, description?}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TaskRequest {
    /// Builds a request after client-side validation. A blank description
    /// is treated as absent.
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, TaskdeckError> {
        let title = title.into();
        validate_title(&title)?;
        Ok(Self {
            title,
            description: description.filter(|d| !d.trim().is_empty()),
        })
    }
}

/// Error body the task service produces for non-2xx responses. All fields
/// are optional on our side; proxies and load balancers return other shapes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub field_errors: Option<BTreeMap<String, String>>,
}

/// Rejects empty titles and titles over [`MAX_TITLE_LEN`] characters before
/// any network call is made.
pub fn validate_title(title: &str) -> Result<(), TaskdeckError> {
    if title.trim().is_empty() {
        return Err(TaskdeckError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(TaskdeckError::TitleTooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_validation_boundaries() {
        assert!(validate_title("buy milk").is_ok());
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN)).is_ok());

        assert!(matches!(
            validate_title(""),
            Err(TaskdeckError::EmptyTitle)
        ));
        assert!(matches!(
            validate_title("   "),
            Err(TaskdeckError::EmptyTitle)
        ));
        assert!(matches!(
            validate_title(&"x".repeat(MAX_TITLE_LEN + 1)),
            Err(TaskdeckError::TitleTooLong)
        ));
    }

    #[test]
    fn validation_messages_match_inline_field_errors() {
        assert_eq!(
            TaskdeckError::EmptyTitle.to_string(),
            "Title is required"
        );
        assert_eq!(
            TaskdeckError::TitleTooLong.to_string(),
            "Title must be less than 200 characters"
        );
    }

    #[test]
    fn task_parses_backend_camel_case() {
        let raw = r#"{
            "id": 7,
            "title": "write report",
            "description": null,
            "completed": false,
            "createdAt": "2025-01-04T10:15:30",
            "completedAt": null
        }"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.id, 7);
        assert_eq!(task.title, "write report");
        assert_eq!(task.description, None);
        assert!(!task.completed);
        assert_eq!(task.created_at, "2025-01-04T10:15:30");
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn request_omits_blank_description() {
        let req = TaskRequest::new("title", Some("  ".to_owned())).unwrap();
        assert_eq!(req.description, None);
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"title":"title"}"#);

        let req = TaskRequest::new("title", Some("details".to_owned())).unwrap();
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"title":"title","description":"details"}"#);
    }

    #[test]
    fn request_rejects_invalid_title() {
        assert!(TaskRequest::new("", None).is_err());
    }
}
