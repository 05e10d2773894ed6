use std::collections::HashSet;

use crate::view_model::{AppViewModel, CandidateRow};
use crate::{Message, MessageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Export not loaded yet.
    #[default]
    Loading,
    /// List loaded; selection may be edited.
    Ready,
    /// A publish is outstanding or about to be issued.
    Running,
    /// The last run stopped on a fatal error.
    Halted,
    /// Every selected candidate is done.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateStatus {
    Excluded,
    Pending,
    InProgress,
    Done,
}

/// Persisted migration progress as read from or written to the progress store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub finished_ids: Vec<MessageId>,
    pub include_service: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub message: Message,
    pub selected: bool,
    pub in_progress: bool,
    pub complete: bool,
}

impl Candidate {
    pub fn status(&self) -> CandidateStatus {
        if self.complete {
            CandidateStatus::Done
        } else if self.in_progress {
            CandidateStatus::InProgress
        } else if self.selected {
            CandidateStatus::Pending
        } else {
            CandidateStatus::Excluded
        }
    }

    fn is_runnable(&self) -> bool {
        self.selected && !self.complete
    }
}

/// Default selection for a freshly loaded message.
pub fn selected_by_default(
    message: &Message,
    finished: &HashSet<MessageId>,
    include_service: bool,
) -> bool {
    !finished.contains(&message.id) && (include_service || !message.is_service())
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    session: SessionState,
    candidates: Vec<Candidate>,
    include_service: bool,
    current: Option<MessageId>,
    error: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn include_service(&self) -> bool {
        self.include_service
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidate(&self, id: MessageId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.message.id == id)
    }

    /// Message whose publish is currently outstanding.
    pub fn current(&self) -> Option<MessageId> {
        self.current
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn view(&self) -> AppViewModel {
        let rows: Vec<CandidateRow> = self.candidates.iter().map(CandidateRow::from).collect();
        AppViewModel {
            session: self.session,
            include_service: self.include_service,
            selected_count: self.candidates.iter().filter(|c| c.is_runnable()).count(),
            done_count: self.candidates.iter().filter(|c| c.complete).count(),
            rows,
            error_dialog: self.error.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether the state changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn load(&mut self, messages: Vec<Message>, progress: ProgressSnapshot) {
        let finished: HashSet<MessageId> = progress.finished_ids.into_iter().collect();
        self.include_service = progress.include_service;
        self.candidates = messages
            .into_iter()
            .map(|message| {
                let complete = finished.contains(&message.id);
                let selected = selected_by_default(&message, &finished, progress.include_service);
                Candidate {
                    message,
                    selected,
                    in_progress: false,
                    complete,
                }
            })
            .collect();
        self.session = SessionState::Ready;
        self.current = None;
        self.mark_dirty();
    }

    /// Leaves the session in `Loading` so an empty list can never be started.
    pub(crate) fn load_failed(&mut self, message: String) {
        self.candidates.clear();
        self.session = SessionState::Loading;
        self.current = None;
        self.error = Some(message);
        self.mark_dirty();
    }

    pub(crate) fn is_editable(&self) -> bool {
        matches!(self.session, SessionState::Ready | SessionState::Halted)
    }

    pub(crate) fn toggle(&mut self, id: MessageId) -> bool {
        let Some(candidate) = self.candidates.iter_mut().find(|c| c.message.id == id) else {
            return false;
        };
        if candidate.complete {
            return false;
        }
        candidate.selected = !candidate.selected;
        self.mark_dirty();
        true
    }

    /// Re-applies the service rule to service candidates that are not done.
    pub(crate) fn set_include_service(&mut self, include_service: bool) {
        self.include_service = include_service;
        for candidate in self
            .candidates
            .iter_mut()
            .filter(|c| c.message.is_service() && !c.complete)
        {
            candidate.selected = include_service;
        }
        self.mark_dirty();
    }

    pub(crate) fn start_run(&mut self) {
        self.session = SessionState::Running;
        self.error = None;
        self.mark_dirty();
    }

    /// Marks the next runnable candidate in load order as in progress.
    ///
    /// Returns `None` and finishes the session when nothing is left.
    pub(crate) fn advance(&mut self) -> Option<Message> {
        self.mark_dirty();
        match self.candidates.iter_mut().find(|c| c.is_runnable()) {
            Some(candidate) => {
                candidate.in_progress = true;
                self.current = Some(candidate.message.id);
                Some(candidate.message.clone())
            }
            None => {
                self.current = None;
                self.session = SessionState::Finished;
                None
            }
        }
    }

    pub(crate) fn complete_current(&mut self, id: MessageId) -> bool {
        if self.current != Some(id) {
            return false;
        }
        if let Some(candidate) = self.candidates.iter_mut().find(|c| c.message.id == id) {
            candidate.in_progress = false;
            candidate.complete = true;
        }
        self.current = None;
        self.mark_dirty();
        true
    }

    pub(crate) fn halt(&mut self, id: MessageId, message: String) {
        if let Some(candidate) = self.candidates.iter_mut().find(|c| c.message.id == id) {
            candidate.in_progress = false;
        }
        self.current = None;
        self.session = SessionState::Halted;
        self.error = Some(message);
        self.mark_dirty();
    }

    /// Reverts a setting change that could not be persisted and reports why.
    pub(crate) fn settings_not_saved(&mut self, include_service: bool, message: String) {
        if self.include_service == include_service {
            self.set_include_service(!include_service);
        }
        self.error = Some(message);
        self.mark_dirty();
    }

    pub(crate) fn acknowledge_error(&mut self) -> bool {
        if self.error.take().is_some() {
            self.mark_dirty();
            true
        } else {
            false
        }
    }
}
