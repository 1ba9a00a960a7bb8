//! Content classification
//!
//! Turns a normalized chat event into an [`InboundItem`]: picks the content kind,
//! resolves filename and mime type, and rejects what the relay cannot carry
//! before any bytes move.

use std::sync::Arc;

use courier_core::models::{is_supported_mime_type, normalize_mime_type};
use courier_core::ContentKind;

use crate::source::{ByteSource, FetchError, FileFetcher, InboundItem};

/// Attachment metadata as reported by the chat platform
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentMeta {
    pub file_id: String,
    pub file_size: Option<u64>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

/// Transport-neutral view of one chat message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundEvent {
    pub message_id: i64,
    pub text: Option<String>,
    pub caption: Option<String>,
    /// Available sizes of a photo, smallest first
    pub photo: Vec<AttachmentMeta>,
    pub document: Option<AttachmentMeta>,
    pub video: Option<AttachmentMeta>,
    pub audio: Option<AttachmentMeta>,
    pub voice: Option<AttachmentMeta>,
}

impl InboundEvent {
    pub fn has_attachment(&self) -> bool {
        !self.photo.is_empty()
            || self.document.is_some()
            || self.video.is_some()
            || self.audio.is_some()
            || self.voice.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassificationError {
    #[error("message carries no supported content")]
    Unsupported,

    #[error("file is {declared} bytes, above the {ceiling} byte transfer limit")]
    OversizedDeclared { declared: u64, ceiling: u64 },

    #[error("file type {mime} is not supported")]
    UnsupportedMime { mime: String },

    #[error("could not determine file size: {0}")]
    Fetch(#[from] FetchError),
}

pub struct ContentClassifier {
    transfer_ceiling: u64,
    fetcher: Arc<dyn FileFetcher>,
}

impl ContentClassifier {
    pub fn new(transfer_ceiling: u64, fetcher: Arc<dyn FileFetcher>) -> Self {
        Self {
            transfer_ceiling,
            fetcher,
        }
    }

    pub fn transfer_ceiling(&self) -> u64 {
        self.transfer_ceiling
    }

    pub async fn classify(&self, event: &InboundEvent) -> Result<InboundItem, ClassificationError> {
        if !event.has_attachment() {
            return match event.text.as_deref() {
                Some(text) if !text.is_empty() => Ok(InboundItem::text(text)),
                _ => Err(ClassificationError::Unsupported),
            };
        }

        let (kind, meta) = select_attachment(event).ok_or(ClassificationError::Unsupported)?;
        let (filename, mime_type) = resolve_name_and_mime(kind, meta, event.message_id);

        if let Some(declared) = meta.file_size {
            self.check_ceiling(declared)?;
        }

        if !is_supported_mime_type(&mime_type) {
            return Err(ClassificationError::UnsupportedMime { mime: mime_type });
        }

        // Without a declared size the only way to learn it is to download.
        let (source, declared_size) = match meta.file_size {
            Some(size) => (
                ByteSource::remote(meta.file_id.clone(), self.fetcher.clone()),
                Some(size),
            ),
            None => {
                let bytes = self.fetcher.fetch(&meta.file_id).await?;
                let measured = bytes.len() as u64;
                self.check_ceiling(measured)?;
                (ByteSource::Buffered(bytes), Some(measured))
            }
        };

        tracing::debug!(
            kind = %kind,
            declared_size = ?declared_size,
            mime_type = %mime_type,
            buffered = source.is_buffered(),
            "Classified inbound item"
        );

        Ok(InboundItem {
            kind,
            source,
            declared_size,
            filename: Some(filename),
            mime_type,
            caption: event.caption.clone().filter(|c| !c.is_empty()),
        })
    }

    fn check_ceiling(&self, size: u64) -> Result<(), ClassificationError> {
        if size > self.transfer_ceiling {
            return Err(ClassificationError::OversizedDeclared {
                declared: size,
                ceiling: self.transfer_ceiling,
            });
        }
        Ok(())
    }
}

fn select_attachment(event: &InboundEvent) -> Option<(ContentKind, &AttachmentMeta)> {
    if let Some(document) = &event.document {
        return Some((ContentKind::Document, document));
    }
    // Last entry is the largest rendition
    if let Some(photo) = event.photo.last() {
        return Some((ContentKind::Photo, photo));
    }
    if let Some(video) = &event.video {
        return Some((ContentKind::Video, video));
    }
    if let Some(audio) = &event.audio {
        return Some((ContentKind::Audio, audio));
    }
    event.voice.as_ref().map(|voice| (ContentKind::Voice, voice))
}

fn resolve_name_and_mime(kind: ContentKind, meta: &AttachmentMeta, message_id: i64) -> (String, String) {
    let (default_name, default_mime) = match kind {
        ContentKind::Photo => {
            return (format!("photo_{}.jpg", message_id), "image/jpeg".to_string());
        }
        ContentKind::Video => (format!("video_{}.mp4", message_id), "video/mp4"),
        ContentKind::Audio => (format!("audio_{}.mp3", message_id), "audio/mpeg"),
        ContentKind::Voice => (format!("voice_{}.ogg", message_id), "audio/ogg"),
        _ => return document_name_and_mime(meta, message_id),
    };

    let filename = meta.file_name.clone().unwrap_or(default_name);
    let mime_type = meta
        .mime_type
        .as_deref()
        .map(normalize_mime_type)
        .unwrap_or_else(|| default_mime.to_string());
    (filename, mime_type)
}

fn document_name_and_mime(meta: &AttachmentMeta, message_id: i64) -> (String, String) {
    let mime_type = meta
        .mime_type
        .as_deref()
        .map(normalize_mime_type)
        .or_else(|| {
            meta.file_name
                .as_deref()
                .and_then(|name| mime_guess::from_path(name).first_raw())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let filename = meta.file_name.clone().unwrap_or_else(|| {
        match mime_guess::get_mime_extensions_str(&mime_type).and_then(|exts| exts.first()) {
            Some(ext) => format!("document_{}.{}", message_id, ext),
            None => format!("document_{}", message_id),
        }
    });

    (filename, mime_type)
}
