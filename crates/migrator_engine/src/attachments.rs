use engine_logging::{engine_debug, engine_warn};
use migrator_core::{FileRef, MessageId, PhotoRef};
use serde::Serialize;

use crate::fetch::{Fetcher, ProgressSink};
use crate::store::ContentStore;
use crate::{EngineEvent, MigrateError, PublishProgress, Stage};

const FALLBACK_MIME: &str = "application/octet-stream";

/// A media item to move into content-addressed storage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaRef {
    pub address: String,
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl From<&PhotoRef> for MediaRef {
    fn from(photo: &PhotoRef) -> Self {
        Self {
            address: photo.address.clone(),
            mime_type: None,
            width: photo.width,
            height: photo.height,
        }
    }
}

impl From<&FileRef> for MediaRef {
    fn from(file: &FileRef) -> Self {
        Self {
            address: file.address.clone(),
            mime_type: file.mime_type.clone(),
            width: None,
            height: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentRecord {
    pub name: String,
    pub address: String,
    pub mime_type: String,
    pub size_in_bytes: u64,
    pub alt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Uploads media in order, stopping at the first reference without an address.
///
/// Any fetch or storage failure aborts the whole list.
pub async fn upload_attachments(
    fetcher: &dyn Fetcher,
    store: &dyn ContentStore,
    message_id: MessageId,
    refs: &[MediaRef],
    sink: &dyn ProgressSink,
) -> Result<Vec<AttachmentRecord>, MigrateError> {
    let mut records = Vec::with_capacity(refs.len());
    for media in refs {
        if media.address.trim().is_empty() {
            if records.len() + 1 < refs.len() {
                engine_debug!(
                    "Message {}: media list ends at entry {} without address",
                    message_id,
                    records.len()
                );
            }
            break;
        }
        records.push(upload_one(fetcher, store, message_id, media, sink).await?);
    }
    Ok(records)
}

async fn upload_one(
    fetcher: &dyn Fetcher,
    store: &dyn ContentStore,
    message_id: MessageId,
    media: &MediaRef,
    sink: &dyn ProgressSink,
) -> Result<AttachmentRecord, MigrateError> {
    let transfer_error = |message: String| MigrateError::Transfer {
        address: media.address.clone(),
        message,
    };

    let fetched = fetcher
        .fetch(message_id, &media.address, sink)
        .await
        .map_err(|err| transfer_error(err.to_string()))?;

    let mime_type = effective_mime_type(
        media.mime_type.as_deref(),
        fetched.metadata.content_type.as_deref(),
        &media.address,
    );
    let size_in_bytes = fetched.metadata.byte_len;
    let name = file_name(&media.address);

    sink.emit(EngineEvent::Progress(PublishProgress {
        message_id,
        stage: Stage::Uploading,
        bytes: Some(size_in_bytes),
    }));
    let pointer = store
        .upload_file(fetched.bytes, &name, &mime_type)
        .await
        .map_err(|err| {
            engine_warn!("Message {}: upload of {} failed: {}", message_id, media.address, err);
            transfer_error(err.to_string())
        })?;
    engine_debug!(
        "Message {}: {} ({} bytes, {}) -> {}",
        message_id,
        media.address,
        size_in_bytes,
        mime_type,
        pointer
    );

    Ok(AttachmentRecord {
        alt: name.clone(),
        name,
        address: pointer,
        mime_type,
        size_in_bytes,
        width: media.width,
        height: media.height,
    })
}

/// Declared type, then the type the source reported, then a guess from the extension.
pub fn effective_mime_type(declared: Option<&str>, reported: Option<&str>, address: &str) -> String {
    let clean = |value: &str| {
        value
            .split(';')
            .next()
            .unwrap_or(value)
            .trim()
            .to_ascii_lowercase()
    };
    declared
        .filter(|v| !v.trim().is_empty())
        .map(clean)
        .or_else(|| reported.filter(|v| !v.trim().is_empty()).map(clean))
        .or_else(|| guess_mime_type(address).map(str::to_string))
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}

fn guess_mime_type(address: &str) -> Option<&'static str> {
    let name = file_name(address);
    let (_, ext) = name.rsplit_once('.')?;
    let mime = match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "ogg" | "oga" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "json" => "application/json",
        "zip" => "application/zip",
        "tgs" => "application/x-tgsticker",
        _ => return None,
    };
    Some(mime)
}

fn file_name(address: &str) -> String {
    let path = address.split(['?', '#']).next().unwrap_or(address);
    path.rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_mime_wins_over_reported() {
        assert_eq!(
            effective_mime_type(Some("audio/ogg"), Some("application/octet-stream"), "v.bin"),
            "audio/ogg"
        );
    }

    #[test]
    fn reported_mime_drops_parameters() {
        assert_eq!(
            effective_mime_type(None, Some("Image/PNG; charset=binary"), "x"),
            "image/png"
        );
    }

    #[test]
    fn extension_guess_then_fallback() {
        assert_eq!(effective_mime_type(None, None, "photos/a.JPG"), "image/jpeg");
        assert_eq!(effective_mime_type(None, None, "files/blob"), FALLBACK_MIME);
    }

    #[test]
    fn file_name_is_last_path_segment() {
        assert_eq!(file_name("photos/photo_1@01-01-2023.jpg"), "photo_1@01-01-2023.jpg");
        assert_eq!(file_name("https://cdn.example.com/a/b.png?x=1"), "b.png");
        assert_eq!(file_name("files\\doc.pdf"), "doc.pdf");
    }
}
