use chrono::{DateTime, SecondsFormat, Utc};
use engine_logging::engine_warn;
use migrator_core::{format_message, Message};
use serde::Serialize;

use crate::attachments::AttachmentRecord;

const EPOCH: &str = "1970-01-01T00:00:00Z";

/// The payload stored for one migrated message. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteDocument {
    pub content: String,
    pub sources: Vec<String>,
    pub attachments: Vec<AttachmentRecord>,
    pub date_published: String,
    pub external_urls: Vec<String>,
}

impl NoteDocument {
    pub fn build(
        message: &Message,
        attachments: Vec<AttachmentRecord>,
        sources: &[String],
        channel_prefix: &str,
        channel: &str,
    ) -> Self {
        Self {
            content: format_message(message),
            sources: sources.to_vec(),
            attachments,
            date_published: publish_timestamp(message.timestamp).unwrap_or_else(|| {
                engine_warn!(
                    "Message {}: timestamp {} is out of range, publishing with {}",
                    message.id,
                    message.timestamp,
                    EPOCH
                );
                EPOCH.to_string()
            }),
            external_urls: external_link(channel_prefix, channel, message)
                .into_iter()
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// RFC 3339 in UTC with whole seconds; `None` outside chrono's range.
pub fn publish_timestamp(unix_seconds: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(unix_seconds, 0)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// `<prefix>/<channel>/<id>` when a channel is known.
pub fn external_link(channel_prefix: &str, channel: &str, message: &Message) -> Option<String> {
    let channel = channel.trim().trim_matches('/');
    if channel.is_empty() {
        return None;
    }
    Some(format!(
        "{}/{}/{}",
        channel_prefix.trim_end_matches('/'),
        channel,
        message.id
    ))
}
