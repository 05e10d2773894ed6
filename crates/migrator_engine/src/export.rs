//! Chat export loading.
//!
//! Reads the JSON export (`{"messages": [...]}`) and maps each entry into the
//! core [`Message`] model. Unknown fields are ignored and absent optional
//! fields fall back to empty values.

use std::path::Path;

use chrono::NaiveDateTime;
use engine_logging::engine_info;
use migrator_core::{FileRef, MediaKind, Message, MessageKind, PhotoRef, TextSpan};
use serde::Deserialize;
use serde_json::Value;

use crate::MigrateError;

#[derive(Debug, Deserialize)]
struct RawExport {
    messages: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: i64,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    date_unixtime: Option<Value>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    actor: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    photo: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    photos: Option<Vec<RawPhoto>>,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    text_entities: Vec<RawEntity>,
}

#[derive(Debug, Deserialize)]
struct RawPhoto {
    #[serde(default)]
    photo: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    href: Option<String>,
}

/// Read and parse an export file.
pub fn load_export(path: &Path) -> Result<Vec<Message>, MigrateError> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| MigrateError::Load(format!("{}: {err}", path.display())))?;
    let messages = parse_export(&text)?;
    engine_info!("Loaded {} messages from {:?}", messages.len(), path);
    Ok(messages)
}

pub fn parse_export(text: &str) -> Result<Vec<Message>, MigrateError> {
    let raw: RawExport =
        serde_json::from_str(text).map_err(|err| MigrateError::Load(err.to_string()))?;
    Ok(raw.messages.into_iter().map(message_from_raw).collect())
}

fn message_from_raw(raw: RawMessage) -> Message {
    let kind = if raw.kind == "service" {
        MessageKind::Service
    } else {
        MessageKind::Content
    };
    let timestamp = unix_time(raw.date_unixtime.as_ref(), raw.date.as_deref());

    let photos = match raw.photos {
        Some(list) => list
            .into_iter()
            .map(|p| PhotoRef {
                address: p.photo.unwrap_or_default(),
                width: p.width,
                height: p.height,
            })
            .collect(),
        None => raw
            .photo
            .map(|address| PhotoRef {
                address,
                width: raw.width,
                height: raw.height,
            })
            .into_iter()
            .collect(),
    };

    let file = raw.file.map(|address| FileRef {
        address,
        mime_type: raw.mime_type,
        media_kind: media_kind(raw.media_type.as_deref()),
    });

    Message {
        id: raw.id,
        kind,
        timestamp,
        action: raw.action,
        sender: raw.from.or(raw.actor),
        photos,
        file,
        text: raw.text_entities.into_iter().map(span).collect(),
    }
}

fn unix_time(unixtime: Option<&Value>, date: Option<&str>) -> i64 {
    let from_unix = unixtime.and_then(|value| match value {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    });
    from_unix
        .or_else(|| {
            date.and_then(|d| NaiveDateTime::parse_from_str(d, "%Y-%m-%dT%H:%M:%S").ok())
                .map(|dt| dt.and_utc().timestamp())
        })
        .unwrap_or(0)
}

fn media_kind(media_type: Option<&str>) -> MediaKind {
    match media_type {
        Some("audio_file" | "voice_message") => MediaKind::Audio,
        Some("video_file" | "video_message" | "animation") => MediaKind::Video,
        _ => MediaKind::Other,
    }
}

fn span(entity: RawEntity) -> TextSpan {
    match entity.kind.as_str() {
        "plain" => TextSpan::Plain(entity.text),
        "bold" => TextSpan::Bold(entity.text),
        "italic" => TextSpan::Italic(entity.text),
        "strikethrough" => TextSpan::Strikethrough(entity.text),
        "link" => TextSpan::Link(entity.text),
        "text_link" => TextSpan::TextLink {
            href: entity.href.unwrap_or_default(),
            text: entity.text,
        },
        _ => TextSpan::Other {
            kind: entity.kind,
            text: entity.text,
        },
    }
}
