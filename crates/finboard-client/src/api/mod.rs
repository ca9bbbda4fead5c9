//! Typed backend endpoints.
//!
//! Each group borrows the shared [`RequestClient`], so calls inherit the
//! auth header and interceptor. Required fields are checked before anything
//! is sent.

mod analysis;
mod auth;
mod files;

use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::http::RequestClient;

pub use analysis::{AnalysisApi, AnalysisSubmission};
pub use auth::{AuthApi, Credentials, LoginResponse, Registration};
pub use files::{FilesApi, mime_for};

/// Reply of `GET /health`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Reported status, usually `ok` or `healthy`.
    pub status: String,
    /// Backend version, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl RequestClient {
    /// Authentication endpoints.
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    /// File upload and listing endpoints.
    pub fn files(&self) -> FilesApi<'_> {
        FilesApi::new(self)
    }

    /// Analysis request endpoints.
    pub fn analysis(&self) -> AnalysisApi<'_> {
        AnalysisApi::new(self)
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get("health").await
    }
}

/// A list reply, either a bare array or wrapped in an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "files", alias = "analyses", alias = "data")]
        items: Vec<T>,
    },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { items } => items,
        }
    }
}

fn require(value: &str, field: &'static str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::Validation(field))
    } else {
        Ok(())
    }
}
