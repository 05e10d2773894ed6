//! Migrator core: message model, text formatting and the migration state machine.
mod effect;
mod format;
mod message;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use format::{format_message, format_spans};
pub use message::{FileRef, MediaKind, Message, MessageId, MessageKind, PhotoRef, TextSpan};
pub use msg::Msg;
pub use state::{
    selected_by_default, AppState, Candidate, CandidateStatus, ProgressSnapshot, SessionState,
};
pub use update::update;
pub use view_model::{AppViewModel, CandidateRow, MediaPreview, MessageBody};
