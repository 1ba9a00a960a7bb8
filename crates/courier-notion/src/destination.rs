use async_trait::async_trait;
use courier_pipeline::{ChunkContent, ChunkUpload, Destination, DestinationError};

use crate::client::{NotionClient, NotionError};

impl From<NotionError> for DestinationError {
    fn from(err: NotionError) -> Self {
        match err {
            NotionError::Api { status, .. } => DestinationError::from_status(status, err.to_string()),
            // A response we could not read may still have been applied
            NotionError::Network(_) | NotionError::Decode(_) => {
                DestinationError::transient(err.to_string())
            }
            NotionError::UploadStatus { ref status, .. } if status == "failed" || status == "expired" => {
                DestinationError::terminal(err.to_string())
            }
            NotionError::UploadStatus { .. } => DestinationError::transient(err.to_string()),
        }
    }
}

#[async_trait]
impl Destination for NotionClient {
    async fn create_page(&self, parent_id: &str, title: &str) -> Result<String, DestinationError> {
        Ok(NotionClient::create_page(self, parent_id, title).await?)
    }

    async fn append_chunk(
        &self,
        target_id: &str,
        chunk: &ChunkUpload<'_>,
    ) -> Result<(), DestinationError> {
        match &chunk.content {
            ChunkContent::Text(text) => self.append_text(target_id, text).await?,
            ChunkContent::File { filename, .. } if chunk.content.is_empty() => {
                self.append_text(target_id, &format!("{} (empty file)", filename))
                    .await?
            }
            ChunkContent::File {
                data,
                filename,
                mime_type,
            } => {
                self.append_file(target_id, data.clone(), filename, mime_type)
                    .await?
            }
        }

        tracing::debug!(
            target_id = %target_id,
            chunk_index = chunk.index,
            chunk_count = chunk.count,
            "Chunk appended to Notion"
        );
        Ok(())
    }

    fn assembles_parts(&self) -> bool {
        true
    }

    async fn begin_parts(
        &self,
        filename: &str,
        mime_type: &str,
        part_count: usize,
    ) -> Result<String, DestinationError> {
        let upload = self
            .create_multi_part_upload(filename, mime_type, part_count)
            .await?;
        Ok(upload.id)
    }

    async fn send_part(
        &self,
        upload_id: &str,
        part: &ChunkUpload<'_>,
    ) -> Result<(), DestinationError> {
        let ChunkContent::File {
            data,
            filename,
            mime_type,
        } = &part.content
        else {
            return Err(DestinationError::terminal("file parts must carry file data"));
        };
        self.send_file_part(upload_id, part.index + 1, data.clone(), filename, mime_type)
            .await?;
        Ok(())
    }

    async fn finish_parts(
        &self,
        target_id: &str,
        upload_id: &str,
        filename: &str,
        mime_type: &str,
    ) -> Result<(), DestinationError> {
        self.finish_multi_part_upload(target_id, upload_id, filename, mime_type)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NotionConfig;
    use bytes::Bytes;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    fn client(server: &mockito::Server) -> NotionClient {
        let mut config = NotionConfig::new("secret_key", "2022-06-28", server.url());
        config.upload_poll_initial_delay = Duration::ZERO;
        NotionClient::new(config).unwrap()
    }

    #[test]
    fn test_error_classification() {
        let busy = NotionError::Api {
            status: 429,
            code: "rate_limited".to_string(),
            message: "slow down".to_string(),
        };
        assert!(DestinationError::from(busy).is_retriable());

        let missing = NotionError::Api {
            status: 404,
            code: "object_not_found".to_string(),
            message: "gone".to_string(),
        };
        let err = DestinationError::from(missing);
        assert!(!err.is_retriable());
        assert_eq!(err.status(), Some(404));

        let garbled = NotionError::Decode("eof".to_string());
        assert!(DestinationError::from(garbled).is_retriable());

        let failed = NotionError::UploadStatus {
            id: "u".to_string(),
            status: "failed".to_string(),
        };
        assert!(!DestinationError::from(failed).is_retriable());
    }

    #[tokio::test]
    async fn test_text_chunk_becomes_paragraph() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/blocks/page-1/children")
            .match_body(Matcher::PartialJson(json!({
                "children": [{
                    "type": "paragraph",
                    "paragraph": { "rich_text": [{ "text": { "content": "hello" } }] }
                }]
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let chunk = ChunkUpload {
            index: 0,
            count: 1,
            content: ChunkContent::Text("hello"),
        };
        Destination::append_chunk(&client(&server), "page-1", &chunk)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_file_chunk_is_noted_as_text() {
        let mut server = mockito::Server::new_async().await;
        let uploads = server
            .mock("POST", "/file_uploads")
            .expect(0)
            .create_async()
            .await;
        let append = server
            .mock("PATCH", "/blocks/page-1/children")
            .match_body(Matcher::Regex("empty.txt \\(empty file\\)".to_string()))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let chunk = ChunkUpload {
            index: 0,
            count: 1,
            content: ChunkContent::File {
                data: Bytes::new(),
                filename: "empty.txt",
                mime_type: "text/plain",
            },
        };
        Destination::append_chunk(&client(&server), "page-1", &chunk)
            .await
            .unwrap();
        uploads.assert_async().await;
        append.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_maps_to_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/blocks/page-1/children")
            .with_status(503)
            .with_body(json!({ "code": "service_unavailable", "message": "busy" }).to_string())
            .create_async()
            .await;

        let chunk = ChunkUpload {
            index: 2,
            count: 3,
            content: ChunkContent::Text("x"),
        };
        let err = Destination::append_chunk(&client(&server), "page-1", &chunk)
            .await
            .unwrap_err();
        assert!(err.is_retriable());
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn test_split_file_becomes_one_notion_file() {
        use courier_core::{TargetSpec, UploadResult};
        use courier_pipeline::{ByteSource, ChunkLimit, PayloadFormat, RetryPolicy, UploadDriver, UploadRequest};
        use std::sync::Arc;

        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/file_uploads")
            .match_body(Matcher::PartialJson(json!({
                "mode": "multi_part",
                "number_of_parts": 3
            })))
            .with_status(200)
            .with_body(json!({ "id": "up-5", "status": "pending" }).to_string())
            .expect(1)
            .create_async()
            .await;
        let first = server
            .mock("POST", "/file_uploads/up-5/send")
            .match_body(Matcher::Regex("name=\"part_number\"\r\n\r\n1\r\n".to_string()))
            .with_status(200)
            .with_body(json!({ "id": "up-5", "status": "pending" }).to_string())
            .expect(1)
            .create_async()
            .await;
        let sends = server
            .mock("POST", "/file_uploads/up-5/send")
            .match_body(Matcher::Regex("name=\"part_number\"\r\n\r\n[23]\r\n".to_string()))
            .with_status(200)
            .with_body(json!({ "id": "up-5", "status": "pending" }).to_string())
            .expect(2)
            .create_async()
            .await;
        server
            .mock("GET", "/file_uploads/up-5")
            .with_status(200)
            .with_body(json!({ "id": "up-5", "status": "pending" }).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/file_uploads/up-5/complete")
            .with_status(200)
            .with_body(json!({ "id": "up-5", "status": "uploaded" }).to_string())
            .create_async()
            .await;
        let attach = server
            .mock("PATCH", "/blocks/page-5/children")
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let driver = UploadDriver::new(Arc::new(client(&server)), RetryPolicy::immediate(3));
        let result = driver
            .run(UploadRequest {
                item_key: "doc:5".to_string(),
                source: ByteSource::Buffered(Bytes::from(vec![1u8; 25])),
                format: PayloadFormat::File {
                    filename: "report.pdf".to_string(),
                    mime_type: "application/pdf".to_string(),
                },
                target: TargetSpec::existing("page-5"),
                limit: ChunkLimit::new(10).unwrap(),
            })
            .await;

        assert_eq!(
            result,
            UploadResult::Completed {
                target_id: "page-5".to_string(),
                bytes_written: 25,
                chunk_count: 3,
            }
        );
        create.assert_async().await;
        first.assert_async().await;
        sends.assert_async().await;
        attach.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_page_through_trait() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/pages")
            .with_status(401)
            .with_body(json!({ "code": "unauthorized", "message": "API token is invalid." }).to_string())
            .create_async()
            .await;

        let err = Destination::create_page(&client(&server), "parent", "title")
            .await
            .unwrap_err();
        assert!(!err.is_retriable());
        assert!(err.message().contains("API token is invalid."));
    }
}
