//! View-model records mirrored from server responses.
//!
//! These are plain records. The client never enforces invariants on them
//! beyond required-field checks before submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AnalysisId, FileId, UserId};

/// Authenticated user profile, persisted alongside the bearer token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Server-assigned id.
    pub id: UserId,
    /// Login email.
    pub email: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Role as reported by the server (e.g. `analyst`, `admin`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserProfile {
    /// Name to show in greetings: the full name if set, else the email.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Processing state of an uploaded file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Stored, not yet processed.
    #[default]
    Uploaded,
    /// Server-side parsing in progress.
    Processing,
    /// Parsed and ready for analysis.
    Processed,
    /// Parsing failed.
    #[serde(alias = "error")]
    Failed,
}

impl FileStatus {
    /// Map a free-form status string from a push payload.
    pub fn from_wire(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "failed" | "error" => Self::Failed,
            "processing" => Self::Processing,
            "uploaded" => Self::Uploaded,
            _ => Self::Processed,
        }
    }
}

/// An uploaded file record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Server-assigned id.
    pub id: FileId,
    /// Original file name.
    pub filename: String,
    /// Size in bytes, when reported.
    #[serde(default, alias = "size", skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Processing state.
    #[serde(default)]
    pub status: FileStatus,
    /// Upload time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of an analysis request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Accepted, not started.
    #[default]
    Pending,
    /// Running on the backend.
    #[serde(alias = "processing")]
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    #[serde(alias = "error")]
    Failed,
}

impl AnalysisStatus {
    /// Whether the request has reached a final state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// An analysis request record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Server-assigned id.
    pub id: AnalysisId,
    /// File the analysis runs on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<FileId>,
    /// Analysis kind (e.g. `financial_ratios`, `sector_benchmark`).
    #[serde(default)]
    pub analysis_type: String,
    /// Lifecycle state.
    #[serde(default)]
    pub status: AnalysisStatus,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Backend execution time, set on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<f64>,
    /// Failure description, set on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Result payload, opaque to the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
}

impl AnalysisRecord {
    /// A record known only by id, created when a push event arrives for an
    /// analysis this client has not listed yet.
    pub fn placeholder(id: AnalysisId) -> Self {
        Self {
            id,
            file_id: None,
            analysis_type: String::new(),
            status: AnalysisStatus::Pending,
            created_at: None,
            execution_time_ms: None,
            error: None,
            results: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_full_name() {
        let mut user = UserProfile {
            id: UserId::from_raw("1"),
            email: "a@b.c".into(),
            full_name: Some("Ada".into()),
            role: None,
        };
        assert_eq!(user.display_name(), "Ada");
        user.full_name = Some("  ".into());
        assert_eq!(user.display_name(), "a@b.c");
    }

    #[test]
    fn analysis_status_aliases() {
        let s: AnalysisStatus = serde_json::from_str("\"processing\"").unwrap();
        assert_eq!(s, AnalysisStatus::Running);
        let s: AnalysisStatus = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(s, AnalysisStatus::Failed);
        assert!(s.is_terminal());
        assert!(!AnalysisStatus::Running.is_terminal());
    }

    #[test]
    fn uploaded_file_accepts_size_alias_and_missing_status() {
        let f: UploadedFile = serde_json::from_value(serde_json::json!({
            "id": 7,
            "filename": "q3.xlsx",
            "size": 2048
        }))
        .unwrap();
        assert_eq!(f.id.as_str(), "7");
        assert_eq!(f.size_bytes, Some(2048));
        assert_eq!(f.status, FileStatus::Uploaded);
    }

    #[test]
    fn file_status_from_wire() {
        assert_eq!(FileStatus::from_wire("ERROR"), FileStatus::Failed);
        assert_eq!(FileStatus::from_wire("processed"), FileStatus::Processed);
        assert_eq!(FileStatus::from_wire("success"), FileStatus::Processed);
    }

    #[test]
    fn analysis_record_minimal_payload() {
        let r: AnalysisRecord = serde_json::from_value(serde_json::json!({
            "id": "r1",
            "file_id": "f1",
            "analysis_type": "financial_ratios",
            "status": "pending"
        }))
        .unwrap();
        assert_eq!(r.id.as_str(), "r1");
        assert_eq!(r.file_id, Some(FileId::from_raw("f1")));
        assert!(r.execution_time_ms.is_none());
    }
}
