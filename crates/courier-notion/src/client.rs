use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::blocks;

#[derive(Debug, thiserror::Error)]
pub enum NotionError {
    #[error("Notion API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Notion request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected Notion response: {0}")]
    Decode(String),

    #[error("File upload {id} ended in status '{status}'")]
    UploadStatus { id: String, status: String },
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectId {
    id: String,
}

/// A Notion file upload object
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileUpload {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub upload_url: Option<String>,
}

#[derive(Clone)]
pub struct NotionConfig {
    pub api_key: String,
    pub version: String,
    /// e.g. `https://api.notion.com/v1`
    pub base_url: String,
    pub timeout: Duration,
    /// Status polls after a send that did not report `uploaded`
    pub upload_poll_attempts: u32,
    pub upload_poll_initial_delay: Duration,
}

impl Debug for NotionConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("NotionConfig")
            .field("version", &self.version)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl NotionConfig {
    pub fn new(api_key: impl Into<String>, version: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            version: version.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            upload_poll_attempts: 6,
            upload_poll_initial_delay: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Notion API client
pub struct NotionClient {
    http_client: Client,
    config: NotionConfig,
}

impl Debug for NotionClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("NotionClient")
            .field("config", &self.config)
            .finish()
    }
}

impl NotionClient {
    pub fn new(config: NotionConfig) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client for Notion")?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &NotionConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.config.api_key)
            .header("Notion-Version", &self.config.version)
    }

    async fn check(response: Response) -> Result<Response, NotionError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let body: Option<ApiErrorBody> = serde_json::from_str(&error_text).ok();
        let (code, message) = match body {
            Some(body) => (
                body.code.unwrap_or_else(|| "unknown".to_string()),
                body.message.unwrap_or(error_text),
            ),
            None => ("unknown".to_string(), error_text),
        };

        Err(NotionError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, NotionError> {
        let response = Self::check(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| NotionError::Decode(e.to_string()))
    }

    /// Create a page under `parent_id`; returns the new page id
    pub async fn create_page(&self, parent_id: &str, title: &str) -> Result<String, NotionError> {
        tracing::debug!(title_length = title.len(), "Creating Notion page");

        let response = self
            .authorized(self.http_client.post(self.url("/pages")))
            .json(&blocks::page_payload(parent_id, title))
            .send()
            .await?;
        let page: ObjectId = Self::decode(response).await?;

        tracing::info!(page_id = %page.id, "Notion page created");
        Ok(page.id)
    }

    /// Append `children` to the end of block (or page) `block_id`
    pub async fn append_blocks(&self, block_id: &str, children: Vec<Value>) -> Result<(), NotionError> {
        let response = self
            .authorized(
                self.http_client
                    .patch(self.url(&format!("/blocks/{}/children", block_id))),
            )
            .json(&json!({ "children": children }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn append_text(&self, block_id: &str, text: &str) -> Result<(), NotionError> {
        tracing::debug!(block_id = %block_id, content_length = text.len(), "Appending text block");
        self.append_blocks(block_id, vec![blocks::paragraph(text)])
            .await
    }

    /// Start a single-part file upload
    pub async fn create_file_upload(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<FileUpload, NotionError> {
        let response = self
            .authorized(self.http_client.post(self.url("/file_uploads")))
            .json(&json!({
                "mode": "single_part",
                "filename": filename,
                "content_type": content_type,
            }))
            .send()
            .await?;
        let upload: FileUpload = Self::decode(response).await?;

        tracing::debug!(upload_id = %upload.id, content_type = %content_type, "File upload object created");
        Ok(upload)
    }

    /// Start a multi-part upload of `number_of_parts` parts
    pub async fn create_multi_part_upload(
        &self,
        filename: &str,
        content_type: &str,
        number_of_parts: usize,
    ) -> Result<FileUpload, NotionError> {
        let response = self
            .authorized(self.http_client.post(self.url("/file_uploads")))
            .json(&json!({
                "mode": "multi_part",
                "number_of_parts": number_of_parts,
                "filename": filename,
                "content_type": content_type,
            }))
            .send()
            .await?;
        let upload: FileUpload = Self::decode(response).await?;

        tracing::debug!(
            upload_id = %upload.id,
            number_of_parts = number_of_parts,
            "Multi-part file upload created"
        );
        Ok(upload)
    }

    async fn send_form(
        &self,
        upload_id: &str,
        data: Bytes,
        filename: &str,
        content_type: &str,
        part_number: Option<usize>,
    ) -> Result<FileUpload, NotionError> {
        let size = data.len();
        let part = Part::bytes(data.to_vec())
            .file_name(filename.to_string())
            .mime_str(content_type)?;
        let mut form = Form::new().part("file", part);
        if let Some(number) = part_number {
            form = form.text("part_number", number.to_string());
        }

        let response = self
            .authorized(
                self.http_client
                    .post(self.url(&format!("/file_uploads/{}/send", upload_id))),
            )
            .multipart(form)
            .send()
            .await?;
        let upload: FileUpload = Self::decode(response).await?;

        tracing::debug!(
            upload_id = %upload_id,
            part_number = ?part_number,
            bytes = size,
            status = %upload.status,
            "File bytes sent"
        );
        Ok(upload)
    }

    /// Send the bytes of a single-part upload
    pub async fn send_file_upload(
        &self,
        upload_id: &str,
        data: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<FileUpload, NotionError> {
        self.send_form(upload_id, data, filename, content_type, None)
            .await
    }

    /// Send part `part_number` (1-based) of a multi-part upload
    pub async fn send_file_part(
        &self,
        upload_id: &str,
        part_number: usize,
        data: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<FileUpload, NotionError> {
        self.send_form(upload_id, data, filename, content_type, Some(part_number))
            .await
    }

    /// Close a multi-part upload once every part is sent
    pub async fn complete_file_upload(&self, upload_id: &str) -> Result<FileUpload, NotionError> {
        let response = self
            .authorized(
                self.http_client
                    .post(self.url(&format!("/file_uploads/{}/complete", upload_id))),
            )
            .send()
            .await?;
        let upload: FileUpload = Self::decode(response).await?;

        tracing::info!(upload_id = %upload_id, status = %upload.status, "Multi-part upload completed");
        Ok(upload)
    }

    pub async fn get_file_upload(&self, upload_id: &str) -> Result<FileUpload, NotionError> {
        let response = self
            .authorized(
                self.http_client
                    .get(self.url(&format!("/file_uploads/{}", upload_id))),
            )
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Poll until the upload reports `uploaded`, doubling the delay each time.
    pub async fn wait_for_file_upload(&self, upload_id: &str) -> Result<(), NotionError> {
        let mut delay = self.config.upload_poll_initial_delay;
        let mut last_status = "pending".to_string();

        for attempt in 1..=self.config.upload_poll_attempts {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let upload = self.get_file_upload(upload_id).await?;
            match upload.status.as_str() {
                "uploaded" => return Ok(()),
                "failed" | "expired" => {
                    return Err(NotionError::UploadStatus {
                        id: upload_id.to_string(),
                        status: upload.status,
                    })
                }
                _ => {
                    tracing::debug!(
                        upload_id = %upload_id,
                        attempt = attempt,
                        status = %upload.status,
                        "File upload not ready yet"
                    );
                    last_status = upload.status;
                    delay *= 2;
                }
            }
        }

        Err(NotionError::UploadStatus {
            id: upload_id.to_string(),
            status: last_status,
        })
    }

    /// Upload `data` as a new file and append it to `block_id` as a media block
    pub async fn append_file(
        &self,
        block_id: &str,
        data: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<(), NotionError> {
        let upload = self.create_file_upload(filename, content_type).await?;
        let sent = self
            .send_file_upload(&upload.id, data, filename, content_type)
            .await?;
        if sent.status != "uploaded" {
            self.wait_for_file_upload(&upload.id).await?;
        }
        self.attach_file_upload(block_id, &upload.id, filename, content_type)
            .await
    }

    /// Complete a multi-part upload if still open, then append it to `block_id`.
    ///
    /// Safe to call again after a failed attempt: a finished upload is not completed twice.
    pub async fn finish_multi_part_upload(
        &self,
        block_id: &str,
        upload_id: &str,
        filename: &str,
        content_type: &str,
    ) -> Result<(), NotionError> {
        let current = self.get_file_upload(upload_id).await?;
        if current.status != "uploaded" {
            let completed = self.complete_file_upload(upload_id).await?;
            if completed.status != "uploaded" {
                self.wait_for_file_upload(upload_id).await?;
            }
        }
        self.attach_file_upload(block_id, upload_id, filename, content_type)
            .await
    }

    async fn attach_file_upload(
        &self,
        block_id: &str,
        upload_id: &str,
        filename: &str,
        content_type: &str,
    ) -> Result<(), NotionError> {
        self.append_blocks(
            block_id,
            vec![blocks::file_block(upload_id, filename, content_type)],
        )
        .await?;

        tracing::info!(
            block_id = %block_id,
            upload_id = %upload_id,
            block_type = blocks::block_type_for_mime(content_type),
            "File block appended"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::Server) -> NotionClient {
        let mut config = NotionConfig::new("secret_key", "2022-06-28", server.url());
        config.upload_poll_initial_delay = Duration::ZERO;
        NotionClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_create_page_sends_auth_and_title() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/pages")
            .match_header("authorization", "Bearer secret_key")
            .match_header("notion-version", "2022-06-28")
            .match_body(Matcher::PartialJson(json!({
                "parent": { "page_id": "parent-1" },
                "properties": { "title": { "title": [{ "text": { "content": "Hello" } }] } }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "object": "page", "id": "page-123" }).to_string())
            .create_async()
            .await;

        let page_id = client(&server).create_page("parent-1", "Hello").await.unwrap();
        assert_eq!(page_id, "page-123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_body_is_parsed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/blocks/missing/children")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "object": "error",
                    "status": 404,
                    "code": "object_not_found",
                    "message": "Could not find block"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = client(&server).append_text("missing", "hi").await.unwrap_err();
        match err {
            NotionError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 404);
                assert_eq!(code, "object_not_found");
                assert_eq!(message, "Could not find block");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_append_file_uploads_then_attaches() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/file_uploads")
            .match_body(Matcher::PartialJson(json!({
                "mode": "single_part",
                "filename": "cat.png",
                "content_type": "image/png"
            })))
            .with_status(200)
            .with_body(json!({ "id": "up-1", "status": "pending" }).to_string())
            .create_async()
            .await;
        let send = server
            .mock("POST", "/file_uploads/up-1/send")
            .match_header("content-type", Matcher::Regex("multipart/form-data".to_string()))
            .with_status(200)
            .with_body(json!({ "id": "up-1", "status": "uploaded" }).to_string())
            .create_async()
            .await;
        let attach = server
            .mock("PATCH", "/blocks/page-1/children")
            .match_body(Matcher::PartialJson(json!({
                "children": [{
                    "type": "image",
                    "image": { "type": "file_upload", "file_upload": { "id": "up-1" } }
                }]
            })))
            .with_status(200)
            .with_body(json!({ "results": [] }).to_string())
            .create_async()
            .await;

        client(&server)
            .append_file("page-1", Bytes::from_static(b"\x89PNG"), "cat.png", "image/png")
            .await
            .unwrap();

        create.assert_async().await;
        send.assert_async().await;
        attach.assert_async().await;
    }

    #[tokio::test]
    async fn test_pending_upload_is_polled() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/file_uploads")
            .with_status(200)
            .with_body(json!({ "id": "up-2", "status": "pending" }).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/file_uploads/up-2/send")
            .with_status(200)
            .with_body(json!({ "id": "up-2", "status": "pending" }).to_string())
            .create_async()
            .await;
        let poll = server
            .mock("GET", "/file_uploads/up-2")
            .with_status(200)
            .with_body(json!({ "id": "up-2", "status": "uploaded" }).to_string())
            .expect(1)
            .create_async()
            .await;
        server
            .mock("PATCH", "/blocks/page-2/children")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        client(&server)
            .append_file("page-2", Bytes::from_static(b"%PDF"), "doc.pdf", "application/pdf")
            .await
            .unwrap();
        poll.assert_async().await;
    }

    #[tokio::test]
    async fn test_multi_part_upload_sends_numbered_parts() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/file_uploads")
            .match_body(Matcher::PartialJson(json!({
                "mode": "multi_part",
                "number_of_parts": 2,
                "filename": "movie.mp4",
                "content_type": "video/mp4"
            })))
            .with_status(200)
            .with_body(json!({ "id": "up-9", "status": "pending" }).to_string())
            .create_async()
            .await;
        let part = server
            .mock("POST", "/file_uploads/up-9/send")
            .match_body(Matcher::Regex("name=\"part_number\"\r\n\r\n2".to_string()))
            .with_status(200)
            .with_body(json!({ "id": "up-9", "status": "pending" }).to_string())
            .create_async()
            .await;

        let client = client(&server);
        let upload = client
            .create_multi_part_upload("movie.mp4", "video/mp4", 2)
            .await
            .unwrap();
        client
            .send_file_part(&upload.id, 2, Bytes::from_static(b"tail"), "movie.mp4", "video/mp4")
            .await
            .unwrap();

        create.assert_async().await;
        part.assert_async().await;
    }

    #[tokio::test]
    async fn test_finish_completes_then_attaches_once() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/file_uploads/up-7")
            .with_status(200)
            .with_body(json!({ "id": "up-7", "status": "pending" }).to_string())
            .create_async()
            .await;
        let complete = server
            .mock("POST", "/file_uploads/up-7/complete")
            .with_status(200)
            .with_body(json!({ "id": "up-7", "status": "uploaded" }).to_string())
            .expect(1)
            .create_async()
            .await;
        let attach = server
            .mock("PATCH", "/blocks/page-7/children")
            .match_body(Matcher::PartialJson(json!({
                "children": [{
                    "type": "video",
                    "video": { "type": "file_upload", "file_upload": { "id": "up-7" } }
                }]
            })))
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        client(&server)
            .finish_multi_part_upload("page-7", "up-7", "movie.mp4", "video/mp4")
            .await
            .unwrap();

        complete.assert_async().await;
        attach.assert_async().await;
    }

    #[tokio::test]
    async fn test_finish_skips_complete_for_uploaded_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/file_uploads/up-8")
            .with_status(200)
            .with_body(json!({ "id": "up-8", "status": "uploaded" }).to_string())
            .create_async()
            .await;
        let complete = server
            .mock("POST", "/file_uploads/up-8/complete")
            .expect(0)
            .create_async()
            .await;
        server
            .mock("PATCH", "/blocks/page-8/children")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        client(&server)
            .finish_multi_part_upload("page-8", "up-8", "doc.pdf", "application/pdf")
            .await
            .unwrap();
        complete.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_upload_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/file_uploads/up-3")
            .with_status(200)
            .with_body(json!({ "id": "up-3", "status": "failed" }).to_string())
            .create_async()
            .await;

        let err = client(&server).wait_for_file_upload("up-3").await.unwrap_err();
        assert!(matches!(err, NotionError::UploadStatus { ref status, .. } if status == "failed"));
    }
}
