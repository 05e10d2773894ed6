use std::fmt;

use migrator_core::MessageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Formatting,
    Fetching,
    Uploading,
    Storing,
    Submitting,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishProgress {
    pub message_id: MessageId,
    pub stage: Stage,
    /// Bytes moved so far for the current media item, when known.
    pub bytes: Option<u64>,
}

/// What the chain accepted for one migrated message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub message_id: MessageId,
    pub content_pointer: String,
    pub transaction_hash: String,
    pub note_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRequest {
    SignerAddress,
    CheckOperator { operator: String },
    AddOperator { operator: String },
    RemoveOperator { operator: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityOutcome {
    Signer(String),
    IsOperator(bool),
    Submitted { transaction_hash: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(PublishProgress),
    PublishCompleted {
        message_id: MessageId,
        result: Result<PublishReceipt, MigrateError>,
    },
    IdentityCompleted {
        result: Result<IdentityOutcome, MigrateError>,
    },
}

/// Failures surfaced to the migration driver. Each one stops the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrateError {
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("failed to transfer {address}: {message}")]
    Transfer { address: String, message: String },
    #[error("failed to publish message {message_id}: {message}")]
    Publish {
        message_id: MessageId,
        message: String,
    },
    #[error("failed to load export: {0}")]
    Load(String),
    #[error("failed to record progress: {0}")]
    Progress(String),
    #[error("chain request failed: {0}")]
    Chain(String),
    #[error("engine unavailable: {0}")]
    Engine(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub address: String,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidAddress,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Io,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidAddress => write!(f, "invalid address"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "media too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
