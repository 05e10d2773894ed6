use crate::{Message, MessageId, ProgressSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Export parsed; progress read at list-load time.
    ExportLoaded {
        messages: Vec<Message>,
        progress: ProgressSnapshot,
    },
    /// Export could not be read or parsed.
    LoadFailed(String),
    /// User flipped the checkbox of one candidate.
    SelectionToggled(MessageId),
    /// User changed the "include service messages" setting.
    IncludeServiceChanged(bool),
    /// User clicked Start.
    StartClicked,
    /// Engine confirmed the note for this message on chain.
    ItemPublished { id: MessageId },
    /// Progress store now lists this message as finished.
    ProgressRecorded { id: MessageId },
    /// Publishing or recording failed; the run stops here.
    RunFailed { id: MessageId, message: String },
    /// The include-service value could not be written to the progress store.
    SettingsSaveFailed {
        include_service: bool,
        message: String,
    },
    /// User dismissed the error dialog.
    ErrorAcknowledged,
    /// Render tick.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
