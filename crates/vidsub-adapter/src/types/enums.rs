/*
[INPUT]:  Task service schema definitions and serde requirements
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a remote task.
///
/// The backend reports `UPLOADED` once a file is stored (`UPLOADING` while
/// it is still arriving) and `UPLOAD_FAILED` when validation rejects it;
/// these fold into the closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[serde(alias = "UPLOADED", alias = "UPLOADING")]
    Pending,
    Processing,
    Completed,
    #[serde(alias = "UPLOAD_FAILED")]
    Failed,
}

impl TaskStatus {
    /// `COMPLETED` and `FAILED` end a task's lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("\"PENDING\"", TaskStatus::Pending)]
    #[case("\"UPLOADED\"", TaskStatus::Pending)]
    #[case("\"UPLOADING\"", TaskStatus::Pending)]
    #[case("\"PROCESSING\"", TaskStatus::Processing)]
    #[case("\"COMPLETED\"", TaskStatus::Completed)]
    #[case("\"FAILED\"", TaskStatus::Failed)]
    #[case("\"UPLOAD_FAILED\"", TaskStatus::Failed)]
    fn test_status_from_wire(#[case] raw: &str, #[case] expected: TaskStatus) {
        let status: TaskStatus = serde_json::from_str(raw).expect("status");
        assert_eq!(status, expected);
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!(serde_json::from_str::<TaskStatus>("\"ARCHIVED\"").is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }
}
