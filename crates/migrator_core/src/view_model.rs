use crate::state::Candidate;
use crate::{format_message, CandidateStatus, MediaKind, Message, MessageId, SessionState};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub session: SessionState,
    pub include_service: bool,
    /// Candidates selected and not yet done.
    pub selected_count: usize,
    pub done_count: usize,
    pub rows: Vec<CandidateRow>,
    /// Message text of a fatal error awaiting acknowledgement.
    pub error_dialog: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    pub id: MessageId,
    pub selected: bool,
    pub status: CandidateStatus,
    pub body: MessageBody,
}

/// What a row shows for its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Service { action: String },
    Content { text: String, media: Vec<MediaPreview> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPreview {
    Photo {
        address: String,
        width: Option<u32>,
        height: Option<u32>,
    },
    Audio { address: String },
    Video { address: String },
    Unknown {
        address: String,
        mime_type: Option<String>,
    },
}

impl From<&Candidate> for CandidateRow {
    fn from(candidate: &Candidate) -> Self {
        Self {
            id: candidate.message.id,
            selected: candidate.selected,
            status: candidate.status(),
            body: MessageBody::from(&candidate.message),
        }
    }
}

impl From<&Message> for MessageBody {
    fn from(message: &Message) -> Self {
        if message.is_service() {
            return MessageBody::Service {
                action: format_message(message),
            };
        }

        let mut media: Vec<MediaPreview> = message
            .photos
            .iter()
            .take_while(|photo| !photo.address.is_empty())
            .map(|photo| MediaPreview::Photo {
                address: photo.address.clone(),
                width: photo.width,
                height: photo.height,
            })
            .collect();
        if let Some(file) = message.file.as_ref().filter(|f| !f.address.is_empty()) {
            let address = file.address.clone();
            media.push(match file.media_kind {
                MediaKind::Audio => MediaPreview::Audio { address },
                MediaKind::Video => MediaPreview::Video { address },
                MediaKind::Other => MediaPreview::Unknown {
                    address,
                    mime_type: file.mime_type.clone(),
                },
            });
        }

        MessageBody::Content {
            text: format_message(message),
            media,
        }
    }
}
