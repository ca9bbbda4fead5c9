//! `/analysis` endpoints.

use finboard_core::{AnalysisId, AnalysisRecord, FileId};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{Listing, require};
use crate::errors::ApiError;
use crate::http::{RequestClient, path_segment};

/// Body of `POST /analysis`.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisSubmission {
    /// File to analyze.
    pub file_id: FileId,
    /// Analysis kind, e.g. `financial_ratios`.
    pub analysis_type: String,
    /// Benchmark sector, for sector comparisons.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// Business activity within the sector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    /// Extra parameters, passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl AnalysisSubmission {
    /// A submission with no optional fields.
    pub fn new(file_id: FileId, analysis_type: impl Into<String>) -> Self {
        Self {
            file_id,
            analysis_type: analysis_type.into(),
            sector: None,
            activity: None,
            parameters: None,
        }
    }
}

/// Analysis request endpoints.
pub struct AnalysisApi<'a> {
    client: &'a RequestClient,
}

impl<'a> AnalysisApi<'a> {
    pub(crate) fn new(client: &'a RequestClient) -> Self {
        Self { client }
    }

    /// `POST /analysis`.
    pub async fn create(
        &self,
        submission: &AnalysisSubmission,
    ) -> Result<AnalysisRecord, ApiError> {
        require(submission.file_id.as_str(), "file id")?;
        require(&submission.analysis_type, "analysis type")?;
        let record: AnalysisRecord = self.client.post("analysis", submission).await?;
        info!(
            analysis_id = %record.id,
            analysis_type = %submission.analysis_type,
            "analysis submitted"
        );
        Ok(record)
    }

    /// `GET /analysis`.
    pub async fn list(&self) -> Result<Vec<AnalysisRecord>, ApiError> {
        let listing: Listing<AnalysisRecord> = self.client.get("analysis").await?;
        Ok(listing.into_vec())
    }

    /// `GET /analysis/{id}`.
    pub async fn get(&self, id: &AnalysisId) -> Result<AnalysisRecord, ApiError> {
        let segment = path_segment(id.as_str()).ok_or(ApiError::Validation("analysis id"))?;
        self.client.get(&format!("analysis/{segment}")).await
    }
}
