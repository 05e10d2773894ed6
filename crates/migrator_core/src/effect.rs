use crate::{Message, MessageId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Clear the persisted finished set before a run.
    ResetProgress,
    /// Publish one message as a note.
    Publish { message: Message },
    /// Append a finished id to the persisted record.
    RecordProgress { id: MessageId },
    /// Persist the include-service setting.
    SaveSettings { include_service: bool },
    /// Navigate to the finished view.
    ShowFinished,
}
