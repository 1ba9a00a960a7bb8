//! In-memory destination
//!
//! Records every page and append it receives and can be scripted to fail
//! specific chunk indices. Used by the pipeline tests and by the API
//! integration tests through the `testing` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::destination::{ChunkContent, ChunkUpload, Destination, DestinationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub id: String,
    pub parent_id: String,
    pub title: String,
}

/// A successfully applied append
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendRecord {
    pub target_id: String,
    pub index: usize,
    pub count: usize,
    pub data: Vec<u8>,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Default)]
struct MemoryState {
    pages: Vec<PageRecord>,
    appends: Vec<AppendRecord>,
    attempts: HashMap<usize, usize>,
    chunk_failures: HashMap<usize, VecDeque<DestinationError>>,
    create_failure: Option<DestinationError>,
    uploads: HashMap<String, OpenUpload>,
    finish_failures: VecDeque<DestinationError>,
}

struct OpenUpload {
    part_count: usize,
    parts: Vec<Vec<u8>>,
}

#[derive(Default)]
pub struct MemoryDestination {
    state: Mutex<MemoryState>,
    append_delay: Duration,
    assembles: bool,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before recording each append, to widen race windows in tests
    pub fn with_append_delay(mut self, delay: Duration) -> Self {
        self.append_delay = delay;
        self
    }

    /// Reassemble split files from parts instead of appending each part
    pub fn assembling(mut self) -> Self {
        self.assembles = true;
        self
    }

    /// Queue errors returned by successive attempts to finish a multi-part upload
    pub fn fail_finish(&self, errors: Vec<DestinationError>) {
        self.lock().finish_failures.extend(errors);
    }

    /// Multi-part uploads opened and not finished yet
    pub fn open_uploads(&self) -> usize {
        self.lock().uploads.len()
    }

    /// Queue errors returned by successive attempts at chunk `index`
    pub fn fail_chunk(&self, index: usize, errors: Vec<DestinationError>) {
        self.lock()
            .chunk_failures
            .entry(index)
            .or_default()
            .extend(errors);
    }

    /// Make every page creation fail with `error`
    pub fn fail_create(&self, error: DestinationError) {
        self.lock().create_failure = Some(error);
    }

    pub fn pages(&self) -> Vec<PageRecord> {
        self.lock().pages.clone()
    }

    pub fn appends(&self) -> Vec<AppendRecord> {
        self.lock().appends.clone()
    }

    pub fn appends_for(&self, target_id: &str) -> Vec<AppendRecord> {
        self.lock()
            .appends
            .iter()
            .filter(|r| r.target_id == target_id)
            .cloned()
            .collect()
    }

    /// Concatenated payload of every append to `target_id`, in arrival order
    pub fn content_of(&self, target_id: &str) -> Vec<u8> {
        self.appends_for(target_id)
            .into_iter()
            .flat_map(|r| r.data)
            .collect()
    }

    /// Calls made for chunk `index`, failed ones included
    pub fn attempts_for(&self, index: usize) -> usize {
        self.lock().attempts.get(&index).copied().unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // Poisoning only happens when a test panics mid-call.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Destination for MemoryDestination {
    async fn create_page(&self, parent_id: &str, title: &str) -> Result<String, DestinationError> {
        let mut state = self.lock();
        if let Some(error) = state.create_failure.clone() {
            return Err(error);
        }
        let id = Uuid::new_v4().to_string();
        state.pages.push(PageRecord {
            id: id.clone(),
            parent_id: parent_id.to_string(),
            title: title.to_string(),
        });
        Ok(id)
    }

    async fn append_chunk(
        &self,
        target_id: &str,
        chunk: &ChunkUpload<'_>,
    ) -> Result<(), DestinationError> {
        {
            let mut state = self.lock();
            *state.attempts.entry(chunk.index).or_default() += 1;
            if let Some(error) = state
                .chunk_failures
                .get_mut(&chunk.index)
                .and_then(|queue| queue.pop_front())
            {
                return Err(error);
            }
        }

        if !self.append_delay.is_zero() {
            tokio::time::sleep(self.append_delay).await;
        }

        let (data, filename, mime_type) = match &chunk.content {
            ChunkContent::Text(text) => (text.as_bytes().to_vec(), None, None),
            ChunkContent::File {
                data,
                filename,
                mime_type,
            } => (
                data.to_vec(),
                Some(filename.to_string()),
                Some(mime_type.to_string()),
            ),
        };

        self.lock().appends.push(AppendRecord {
            target_id: target_id.to_string(),
            index: chunk.index,
            count: chunk.count,
            data,
            filename,
            mime_type,
        });
        Ok(())
    }

    fn assembles_parts(&self) -> bool {
        self.assembles
    }

    async fn begin_parts(
        &self,
        _filename: &str,
        _mime_type: &str,
        part_count: usize,
    ) -> Result<String, DestinationError> {
        let id = Uuid::new_v4().to_string();
        self.lock().uploads.insert(
            id.clone(),
            OpenUpload {
                part_count,
                parts: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn send_part(
        &self,
        upload_id: &str,
        part: &ChunkUpload<'_>,
    ) -> Result<(), DestinationError> {
        let mut state = self.lock();
        *state.attempts.entry(part.index).or_default() += 1;
        if let Some(error) = state
            .chunk_failures
            .get_mut(&part.index)
            .and_then(|queue| queue.pop_front())
        {
            return Err(error);
        }

        let ChunkContent::File { data, .. } = &part.content else {
            return Err(DestinationError::terminal("parts must carry file data"));
        };
        let upload = state
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| DestinationError::terminal("unknown upload"))?;
        if upload.parts.len() != part.index {
            return Err(DestinationError::terminal(format!(
                "part {} sent out of order",
                part.index + 1
            )));
        }
        upload.parts.push(data.to_vec());
        Ok(())
    }

    async fn finish_parts(
        &self,
        target_id: &str,
        upload_id: &str,
        filename: &str,
        mime_type: &str,
    ) -> Result<(), DestinationError> {
        let mut state = self.lock();
        if let Some(error) = state.finish_failures.pop_front() {
            return Err(error);
        }
        let complete = state
            .uploads
            .get(upload_id)
            .is_some_and(|upload| upload.parts.len() == upload.part_count);
        if !complete {
            return Err(DestinationError::terminal("upload is missing parts"));
        }
        let data = state
            .uploads
            .remove(upload_id)
            .map(|upload| upload.parts.concat())
            .unwrap_or_default();
        state.appends.push(AppendRecord {
            target_id: target_id.to_string(),
            index: 0,
            count: 1,
            data,
            filename: Some(filename.to_string()),
            mime_type: Some(mime_type.to_string()),
        });
        Ok(())
    }
}
