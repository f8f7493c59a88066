/*
[INPUT]:  Task service schema definitions and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

use super::enums::TaskStatus;

/// Opaque task identifier assigned by the remote service.
///
/// The backend uses numeric ids; strings are accepted too so the mirror never
/// depends on the server's id representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_helpers::deserialize_id(deserializer).map(Self)
    }
}

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for TaskId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

/// Remote task as reported by the service.
///
/// Only `id` and `status` are interpreted; everything else lands in `payload`
/// and is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            status,
            payload: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Processing progress in percent, when the backend reports it.
    pub fn progress(&self) -> Option<u32> {
        self.payload
            .get("progress")
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
    }

    pub fn current_step(&self) -> Option<&str> {
        self.str_field("currentStep")
    }

    pub fn original_name(&self) -> Option<&str> {
        self.str_field("originalName")
    }

    pub fn error_message(&self) -> Option<&str> {
        self.str_field("errorMessage")
    }

    pub fn created_at(&self) -> Option<NaiveDateTime> {
        self.str_field("createTime").and_then(|raw| raw.parse().ok())
    }

    pub fn updated_at(&self) -> Option<NaiveDateTime> {
        self.str_field("updateTime").and_then(|raw| raw.parse().ok())
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// Video file payload for the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Read a file from disk, using its final path component as the upload name.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

mod serde_helpers {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(value) => value,
            RawId::Signed(value) => value.to_string(),
            RawId::Unsigned(value) => value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_numeric_id_and_payload() {
        let raw = json!({
            "id": 42,
            "status": "PROCESSING",
            "originalName": "lecture.mp4",
            "progress": 35,
            "currentStep": "transcribing",
            "createTime": "2024-05-01T10:15:30"
        });

        let task: Task = serde_json::from_value(raw).expect("task");
        assert_eq!(task.id, TaskId::new("42"));
        assert_eq!(task.status, TaskStatus::Processing);
        assert_eq!(task.original_name(), Some("lecture.mp4"));
        assert_eq!(task.progress(), Some(35));
        assert_eq!(task.current_step(), Some("transcribing"));
        assert!(task.created_at().is_some());
        assert!(task.error_message().is_none());
        assert!(!task.payload.contains_key("id"));
        assert!(!task.payload.contains_key("status"));
    }

    #[test]
    fn test_task_string_id() {
        let task: Task =
            serde_json::from_value(json!({"id": "t1", "status": "PENDING"})).expect("task");
        assert_eq!(task.id.as_str(), "t1");
        assert!(task.payload.is_empty());
    }

    #[test]
    fn test_freshly_uploaded_task_is_pending() {
        let task: Task = serde_json::from_value(json!({
            "id": 1,
            "status": "UPLOADED",
            "originalName": "clip.mp4",
            "progress": 0
        }))
        .expect("task");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.progress(), Some(0));
    }

    #[test]
    fn test_task_payload_passes_through() {
        let task = Task::new("t1", TaskStatus::Completed)
            .with_field("subtitlePath", "/out/t1.srt")
            .with_field("fileSize", 1024);

        let value = serde_json::to_value(&task).expect("serialize");
        assert_eq!(value["id"], "t1");
        assert_eq!(value["status"], "COMPLETED");
        assert_eq!(value["subtitlePath"], "/out/t1.srt");
        assert_eq!(value["fileSize"], 1024);
    }

    #[test]
    fn test_task_missing_status_rejected() {
        assert!(serde_json::from_value::<Task>(json!({"id": 1})).is_err());
    }
}
