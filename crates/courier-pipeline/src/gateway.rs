//! Direct upload gateway
//!
//! Entry point for payloads that do not come from the chat transport. The
//! caller-declared limit replaces the chat platform's transfer ceiling; from
//! there the payload takes the same planner and driver path as chat items.

use std::sync::Arc;

use bytes::Bytes;
use courier_core::{TargetSpec, UploadResult};
use uuid::Uuid;

use crate::driver::{PayloadFormat, UploadDriver, UploadRequest};
use crate::planner::{ChunkLimit, PlanError};
use crate::source::ByteSource;

#[derive(Debug, Clone)]
pub enum DirectPayload {
    Text(String),
    File {
        data: Bytes,
        filename: String,
        mime_type: String,
    },
}

impl DirectPayload {
    pub fn len(&self) -> usize {
        match self {
            DirectPayload::Text(text) => text.len(),
            DirectPayload::File { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn validate_limit(&self, declared_limit: i64) -> Result<ChunkLimit, PlanError> {
        match self {
            DirectPayload::Text(_) => ChunkLimit::for_text(declared_limit),
            DirectPayload::File { .. } => ChunkLimit::new(declared_limit),
        }
    }

    fn into_source(self) -> (ByteSource, PayloadFormat) {
        match self {
            DirectPayload::Text(text) => (ByteSource::from(text), PayloadFormat::Text),
            DirectPayload::File {
                data,
                filename,
                mime_type,
            } => (
                ByteSource::Buffered(data),
                PayloadFormat::File {
                    filename,
                    mime_type,
                },
            ),
        }
    }
}

#[derive(Clone)]
pub struct DirectUploadGateway {
    driver: Arc<UploadDriver>,
}

impl DirectUploadGateway {
    pub fn new(driver: Arc<UploadDriver>) -> Self {
        Self { driver }
    }

    /// Upload `payload` under a fresh item key.
    ///
    /// An invalid `declared_limit` is rejected before the destination is contacted.
    pub async fn submit(
        &self,
        payload: DirectPayload,
        target: TargetSpec,
        declared_limit: i64,
    ) -> Result<UploadResult, PlanError> {
        let item_key = format!("direct:{}", Uuid::new_v4());
        self.submit_keyed(item_key, payload, target, declared_limit)
            .await
    }

    /// Upload `payload`, serialized with other runs sharing `item_key`.
    pub async fn submit_keyed(
        &self,
        item_key: impl Into<String>,
        payload: DirectPayload,
        target: TargetSpec,
        declared_limit: i64,
    ) -> Result<UploadResult, PlanError> {
        let limit = payload.validate_limit(declared_limit)?;
        let item_key = item_key.into();

        tracing::info!(
            item_key = %item_key,
            payload_bytes = payload.len(),
            declared_limit = declared_limit,
            "Accepted direct upload"
        );

        let (source, format) = payload.into_source();
        let request = UploadRequest {
            item_key,
            source,
            format,
            target,
            limit,
        };
        Ok(self.driver.run(request).await)
    }
}
