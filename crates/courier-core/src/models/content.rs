use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of content carried by one inbound item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Photo,
    Document,
    Video,
    Audio,
    Voice,
    /// Payload handed in through the direct-upload interface
    DirectUpload,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Photo => "photo",
            ContentKind::Document => "document",
            ContentKind::Video => "video",
            ContentKind::Audio => "audio",
            ContentKind::Voice => "voice",
            ContentKind::DirectUpload => "direct_upload",
        }
    }

    /// Text content is appended as paragraphs, everything else as file blocks
    pub fn is_text(&self) -> bool {
        matches!(self, ContentKind::Text)
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mime types the destination accepts as file blocks
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    // Images
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    // Video
    "video/mp4",
    "video/quicktime",
    "video/x-msvideo",
    "video/webm",
    // Audio
    "audio/mpeg",
    "audio/mp4",
    "audio/wav",
    "audio/ogg",
    "audio/webm",
    // Documents
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    // Text
    "text/plain",
    "text/csv",
    "text/markdown",
    "text/html",
];

/// Strip parameters (`; charset=...`) and lowercase a mime type
pub fn normalize_mime_type(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or(mime)
        .trim()
        .to_lowercase()
}

pub fn is_supported_mime_type(mime: &str) -> bool {
    let normalized = normalize_mime_type(mime);
    SUPPORTED_MIME_TYPES.contains(&normalized.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_mime_type() {
        assert_eq!(normalize_mime_type("Text/Plain; charset=utf-8"), "text/plain");
        assert_eq!(normalize_mime_type("image/png"), "image/png");
    }

    #[test]
    fn test_supported_mime_types() {
        assert!(is_supported_mime_type("image/jpeg"));
        assert!(is_supported_mime_type("audio/ogg"));
        assert!(is_supported_mime_type("application/pdf"));
        assert!(!is_supported_mime_type("application/x-msdownload"));
        assert!(!is_supported_mime_type("application/octet-stream"));
    }
}
