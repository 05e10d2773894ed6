/// Identifier of an exported message. Stable across runs; the unit of migration.
pub type MessageId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKind {
    /// Chat event such as "joined", "pinned", "changed title".
    Service,
    #[default]
    Content,
}

/// One exported chat event. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub id: MessageId,
    pub kind: MessageKind,
    /// Unix seconds.
    pub timestamp: i64,
    pub action: Option<String>,
    pub sender: Option<String>,
    pub photos: Vec<PhotoRef>,
    pub file: Option<FileRef>,
    pub text: Vec<TextSpan>,
}

impl Message {
    pub fn is_service(&self) -> bool {
        self.kind == MessageKind::Service
    }
}

/// A photo referenced by a message. An empty address ends the photo list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhotoRef {
    pub address: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileRef {
    pub address: String,
    pub mime_type: Option<String>,
    pub media_kind: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaKind {
    Audio,
    Video,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSpan {
    Plain(String),
    Bold(String),
    Italic(String),
    Strikethrough(String),
    /// Bare URL; the text is also the target.
    Link(String),
    TextLink { text: String, href: String },
    /// Span types without markup (mentions, hashtags, code, ...).
    Other { kind: String, text: String },
}

impl TextSpan {
    pub fn text(&self) -> &str {
        match self {
            TextSpan::Plain(text)
            | TextSpan::Bold(text)
            | TextSpan::Italic(text)
            | TextSpan::Strikethrough(text)
            | TextSpan::Link(text) => text,
            TextSpan::TextLink { text, .. } | TextSpan::Other { text, .. } => text,
        }
    }
}
