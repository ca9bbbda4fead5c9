//! Push notifications received on the job-status channel.
//!
//! Wire format: a flat JSON object with a `type` discriminator, e.g.
//! `{"type":"analysis_completed","request_id":"r1","execution_time_ms":4200}`.

use serde::{Deserialize, Serialize};

use crate::ids::{AnalysisId, FileId};

/// A server push event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    /// The backend picked up an analysis request.
    AnalysisStarted {
        /// Analysis request id.
        request_id: AnalysisId,
        /// Analysis kind, when reported.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        analysis_type: Option<String>,
    },
    /// An analysis finished successfully.
    AnalysisCompleted {
        /// Analysis request id.
        request_id: AnalysisId,
        /// Backend execution time.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        execution_time_ms: Option<f64>,
        /// Result payload, opaque to the client.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        results: Option<serde_json::Value>,
    },
    /// An analysis failed.
    AnalysisError {
        /// Analysis request id.
        request_id: AnalysisId,
        /// Failure description.
        #[serde(default, alias = "message", skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// An uploaded file finished server-side processing.
    FileProcessed {
        /// File id.
        file_id: FileId,
        /// Original file name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        /// Free-form outcome (`processed`, `failed`, ...).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
    },
    /// Any `type` this client does not know.
    #[serde(other)]
    Unknown,
}

impl PushEvent {
    /// Parse a raw text frame.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Wire name of the event type, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AnalysisStarted { .. } => "analysis_started",
            Self::AnalysisCompleted { .. } => "analysis_completed",
            Self::AnalysisError { .. } => "analysis_error",
            Self::FileProcessed { .. } => "file_processed",
            Self::Unknown => "unknown",
        }
    }

    /// The analysis this event refers to, if any.
    pub fn analysis_id(&self) -> Option<&AnalysisId> {
        match self {
            Self::AnalysisStarted { request_id, .. }
            | Self::AnalysisCompleted { request_id, .. }
            | Self::AnalysisError { request_id, .. } => Some(request_id),
            Self::FileProcessed { .. } | Self::Unknown => None,
        }
    }
}
