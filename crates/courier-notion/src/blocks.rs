//! JSON builders for Notion request bodies

use serde_json::{json, Value};

fn rich_text(content: &str) -> Value {
    if content.is_empty() {
        return json!([]);
    }
    json!([{
        "type": "text",
        "text": { "content": content }
    }])
}

/// A paragraph block holding `text` verbatim
pub fn paragraph(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": { "rich_text": rich_text(text) }
    })
}

/// Block type Notion renders a file upload with
pub fn block_type_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/png" | "image/gif" | "image/webp" | "image/svg+xml" => "image",
        "video/mp4" | "video/quicktime" | "video/x-msvideo" | "video/webm" => "video",
        "audio/mpeg" | "audio/mp4" | "audio/wav" | "audio/ogg" | "audio/webm" => "audio",
        "application/pdf" => "pdf",
        _ => "file",
    }
}

/// A media block referencing a completed file upload, captioned with the filename
pub fn file_block(file_upload_id: &str, filename: &str, mime_type: &str) -> Value {
    let block_type = block_type_for_mime(mime_type);
    let mut block = json!({
        "object": "block",
        "type": block_type,
    });
    block[block_type] = json!({
        "type": "file_upload",
        "file_upload": { "id": file_upload_id },
        "caption": rich_text(filename),
    });
    block
}

/// Body for creating a child page of `parent_id`
pub fn page_payload(parent_id: &str, title: &str) -> Value {
    json!({
        "parent": { "type": "page_id", "page_id": parent_id },
        "properties": {
            "title": {
                "title": [{ "text": { "content": title } }]
            }
        },
        "children": []
    })
}
