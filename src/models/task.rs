use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use validator::Validate;

use super::user::UserProfile;

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task is yet to be started. Every new task starts here.
    #[default]
    Todo,
    /// Task is currently being worked on.
    InProgress,
    /// Task is finished.
    Completed,
}

/// The scalar, caller-editable part of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub status: TaskStatus,
}

/// A task together with its assignees, as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub status: TaskStatus,
    pub assignees: Vec<UserProfile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn fields(&self) -> TaskFields {
        TaskFields {
            title: self.title.clone(),
            description: self.description.clone(),
            due_date: self.due_date,
            status: self.status,
        }
    }

    pub fn assignee_ids(&self) -> Vec<i32> {
        self.assignees.iter().map(|u| u.id).collect()
    }
}

/// Payload for creating a task.
///
/// Has no `status` field. A status sent by the caller is dropped during
/// deserialization and new tasks always start as [`TaskStatus::Todo`].
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[validate(length(max = 10000))]
    pub description: String,

    /// Accepts an RFC 3339 timestamp or a plain `YYYY-MM-DD` date.
    #[serde(deserialize_with = "deserialize_due_date")]
    pub due_date: DateTime<Utc>,

    #[serde(default)]
    pub assignee_ids: Option<Vec<i32>>,
}

/// Partial update for a task. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskInput {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,

    #[validate(length(max = 10000))]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_due_date")]
    pub due_date: Option<DateTime<Utc>>,

    pub status: Option<TaskStatus>,

    /// When present and non-empty, replaces the whole assignee set.
    pub assignee_ids: Option<Vec<i32>>,
}

impl UpdateTaskInput {
    /// Overlays the present scalar fields onto `fields`.
    pub fn apply(&self, fields: &mut TaskFields) {
        if let Some(title) = &self.title {
            fields.title = title.clone();
        }
        if let Some(description) = &self.description {
            fields.description = description.clone();
        }
        if let Some(due_date) = self.due_date {
            fields.due_date = due_date;
        }
        if let Some(status) = self.status {
            fields.status = status;
        }
    }

    /// The replacement assignee set, if this update carries one.
    pub fn replacement_assignees(&self) -> Option<&[i32]> {
        self.assignee_ids
            .as_deref()
            .filter(|ids| !ids.is_empty())
    }
}

/// Parses a due date given either as an RFC 3339 timestamp or as a calendar
/// date, which is taken as midnight UTC.
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
}

fn deserialize_due_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_due_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid due date: {}", raw)))
}

fn deserialize_optional_due_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_due_date(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid due date: {}", raw))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fields() -> TaskFields {
        TaskFields {
            title: "Write report".to_string(),
            description: "Quarterly numbers".to_string(),
            due_date: parse_due_date("2030-01-15").unwrap(),
            status: TaskStatus::Todo,
        }
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(json!(TaskStatus::Todo), json!("TODO"));
        assert_eq!(json!(TaskStatus::InProgress), json!("IN_PROGRESS"));
        assert_eq!(json!(TaskStatus::Completed), json!("COMPLETED"));
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
    }

    #[test]
    fn test_parse_due_date_formats() {
        let plain = parse_due_date("2030-01-15").unwrap();
        assert_eq!(plain.to_rfc3339(), "2030-01-15T00:00:00+00:00");

        let stamped = parse_due_date("2030-01-15T18:30:00+02:00").unwrap();
        assert_eq!(stamped.hour(), 16);

        assert!(parse_due_date("next tuesday").is_none());
        assert!(parse_due_date("2030-13-01").is_none());
    }

    #[test]
    fn test_create_input_ignores_status() {
        let input: CreateTaskInput = serde_json::from_value(json!({
            "title": "T1",
            "description": "d",
            "dueDate": "2030-01-15",
            "status": "COMPLETED"
        }))
        .unwrap();
        assert_eq!(input.title, "T1");
        assert!(input.assignee_ids.is_none());
    }

    #[test]
    fn test_create_input_rejects_bad_date() {
        let result: Result<CreateTaskInput, _> = serde_json::from_value(json!({
            "title": "T1",
            "description": "d",
            "dueDate": "soon"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_create_input_validation() {
        let mut input = CreateTaskInput {
            title: "Valid".to_string(),
            description: String::new(),
            due_date: Utc::now(),
            assignee_ids: None,
        };
        assert!(input.validate().is_ok());

        input.title = String::new();
        assert!(input.validate().is_err());

        input.title = "a".repeat(256);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let mut current = fields();
        let patch = UpdateTaskInput {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        };
        patch.apply(&mut current);

        assert_eq!(
            current,
            TaskFields {
                status: TaskStatus::InProgress,
                ..fields()
            }
        );
    }

    #[test]
    fn test_update_payload_with_missing_fields() {
        let patch: UpdateTaskInput = serde_json::from_value(json!({
            "title": "Renamed",
            "dueDate": "2031-02-03T10:00:00Z"
        }))
        .unwrap();

        let mut current = fields();
        patch.apply(&mut current);
        assert_eq!(current.title, "Renamed");
        assert_eq!(current.description, "Quarterly numbers");
        assert_eq!(current.due_date.to_rfc3339(), "2031-02-03T10:00:00+00:00");
        assert_eq!(current.status, TaskStatus::Todo);
        assert!(patch.replacement_assignees().is_none());
    }

    #[test]
    fn test_empty_assignee_list_is_not_a_replacement() {
        let patch = UpdateTaskInput {
            assignee_ids: Some(vec![]),
            ..Default::default()
        };
        assert!(patch.replacement_assignees().is_none());

        let patch = UpdateTaskInput {
            assignee_ids: Some(vec![4, 5]),
            ..Default::default()
        };
        assert_eq!(patch.replacement_assignees(), Some(&[4, 5][..]));
    }
}
