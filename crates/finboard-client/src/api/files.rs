//! `/files` endpoints.

use std::path::Path;

use finboard_core::{FileId, UploadedFile};
use reqwest::multipart::{Form, Part};
use tracing::info;

use super::{Listing, require};
use crate::errors::ApiError;
use crate::http::{RequestClient, path_segment};

/// File upload and listing endpoints.
pub struct FilesApi<'a> {
    client: &'a RequestClient,
}

impl<'a> FilesApi<'a> {
    pub(crate) fn new(client: &'a RequestClient) -> Self {
        Self { client }
    }

    /// `POST /files/upload` with the bytes in multipart field `file`.
    pub async fn upload_bytes(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, ApiError> {
        require(filename, "file name")?;
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(filename.to_owned())
            .mime_str(mime_for(filename))
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let form = Form::new().part("file", part);
        let uploaded: UploadedFile = self.client.post_multipart("files/upload", form).await?;
        info!(file_id = %uploaded.id, filename, size, "file uploaded");
        Ok(uploaded)
    }

    /// Read a local file and upload it under its own name.
    pub async fn upload_path(&self, path: &Path) -> Result<UploadedFile, ApiError> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(ApiError::Validation("file name"))?
            .to_owned();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::Io(format!("{}: {e}", path.display())))?;
        self.upload_bytes(&filename, bytes).await
    }

    /// `GET /files`.
    pub async fn list(&self) -> Result<Vec<UploadedFile>, ApiError> {
        let listing: Listing<UploadedFile> = self.client.get("files").await?;
        Ok(listing.into_vec())
    }

    /// `DELETE /files/{id}`.
    pub async fn delete(&self, id: &FileId) -> Result<(), ApiError> {
        let segment = path_segment(id.as_str()).ok_or(ApiError::Validation("file id"))?;
        self.client.delete(&format!("files/{segment}")).await
    }
}

/// Content type sent for an uploaded file, by extension.
pub fn mime_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("csv") => "text/csv",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use finboard_auth::SessionStore;
    use finboard_core::FileStatus;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::bus::EventBus;

    fn client_for(server: &MockServer) -> RequestClient {
        RequestClient::with_http(
            reqwest::Client::new(),
            &server.uri(),
            Arc::new(SessionStore::in_memory()),
            EventBus::new(8),
        )
    }

    #[test]
    fn mime_by_extension() {
        assert_eq!(mime_for("q3.CSV"), "text/csv");
        assert_eq!(
            mime_for("ledger.xlsx"),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(mime_for("noext"), "application/octet-stream");
    }

    #[tokio::test]
    async fn upload_sends_multipart_file_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/upload"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 5,
                "filename": "q3.csv",
                "size": 11,
                "status": "uploaded"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let file = client
            .files()
            .upload_bytes("q3.csv", b"a,b\n1,2\n3,4".to_vec())
            .await
            .unwrap();
        assert_eq!(file.id.as_str(), "5");
        assert_eq!(file.size_bytes, Some(11));
        assert_eq!(file.status, FileStatus::Uploaded);

        let requests = server.received_requests().await.unwrap();
        let content_type = requests[0].headers.get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data"));
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains(r#"name="file""#));
        assert!(body.contains(r#"filename="q3.csv""#));
    }

    #[tokio::test]
    async fn upload_requires_file_name() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        assert_eq!(
            client.files().upload_bytes("", vec![1]).await.unwrap_err(),
            ApiError::Validation("file name")
        );
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_path_reads_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "f1",
                "filename": "book.xlsx"
            })))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let local = dir.path().join("book.xlsx");
        std::fs::write(&local, b"PK").unwrap();

        let client = client_for(&server);
        let file = client.files().upload_path(&local).await.unwrap();
        assert_eq!(file.filename, "book.xlsx");

        let missing = client.files().upload_path(&dir.path().join("gone.csv")).await;
        assert!(matches!(missing, Err(ApiError::Io(_))));
    }

    #[tokio::test]
    async fn list_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [
                    {"id": 1, "filename": "a.csv", "status": "processed"},
                    {"id": 2, "filename": "b.csv", "status": "error"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/files/2"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let files = client.files().list().await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].status, FileStatus::Failed);
        client.files().delete(&FileId::from_raw("2")).await.unwrap();
    }

    #[tokio::test]
    async fn delete_keeps_id_in_one_segment() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/files/..%2Fauth%2Fme"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .files()
            .delete(&FileId::from_raw("../auth/me"))
            .await
            .unwrap();
        assert_eq!(
            client.files().delete(&FileId::from_raw("..")).await.unwrap_err(),
            ApiError::Validation("file id")
        );
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }
}
