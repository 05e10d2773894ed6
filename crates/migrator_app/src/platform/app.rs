use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use engine_logging::{engine_info, engine_warn};
use migrator_core::{update, AppState, AppViewModel, Effect, Msg, SessionState};
use migrator_engine::load_export;

use super::effects::EffectRunner;
use super::ui::render;

/// Terminal driver: feeds messages through `update`, renders, then runs effects.
pub struct Driver<W: Write> {
    state: AppState,
    runner: EffectRunner,
    out: W,
    shown: Option<AppViewModel>,
    failure: Option<String>,
}

impl<W: Write> Driver<W> {
    pub fn new(runner: EffectRunner, out: W) -> Self {
        Self {
            state: AppState::new(),
            runner,
            out,
            shown: None,
            failure: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Text of the last error shown in the dialog, if any.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Reads the export together with the progress record as of now.
    pub fn load(&mut self, export_path: &Path) -> io::Result<()> {
        let msg = load_msg(export_path, self.runner.progress().load());
        self.dispatch(msg)
    }

    /// Processes `msg` and everything its effects produce.
    pub fn dispatch(&mut self, msg: Msg) -> io::Result<()> {
        let mut queue = VecDeque::from([msg]);
        while let Some(msg) = queue.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (mut state, effects) = update(state, msg);
            let was_dirty = state.consume_dirty();
            self.state = state;

            if was_dirty && self.render()? {
                queue.push_back(Msg::ErrorAcknowledged);
            }
            let show_finished = effects
                .iter()
                .any(|effect| matches!(effect, Effect::ShowFinished));
            let follow = self.runner.run(effects);
            let failed = follow.iter().any(|msg| matches!(msg, Msg::RunFailed { .. }));
            if show_finished && !failed {
                let view = self.state.view();
                self.out
                    .write_all(render::finished(&view, Utc::now()).as_bytes())?;
            }
            queue.extend(follow);
        }
        self.out.flush()
    }

    /// Prints the rows that changed; returns whether an error dialog was shown.
    fn render(&mut self) -> io::Result<bool> {
        let view = self.state.view();
        match &self.shown {
            None => self.out.write_all(render::list(&view).as_bytes())?,
            Some(previous) => {
                for line in render::changed_rows(previous, &view) {
                    writeln!(self.out, "{line}")?;
                }
                if previous.session != view.session && view.session != SessionState::Finished {
                    writeln!(self.out, "{}", render::status_line(&view))?;
                }
            }
        }

        let dialog = view.error_dialog.clone();
        self.shown = Some(view);
        match dialog {
            Some(message) => {
                self.out.write_all(render::error_dialog(&message).as_bytes())?;
                self.failure = Some(message);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

pub fn load_msg(export_path: &Path, progress: migrator_core::ProgressSnapshot) -> Msg {
    match load_export(export_path) {
        Ok(messages) => {
            engine_info!(
                "{} messages, {} already finished",
                messages.len(),
                progress.finished_ids.len()
            );
            Msg::ExportLoaded { messages, progress }
        }
        Err(err) => {
            engine_warn!("{}", err);
            Msg::LoadFailed(err.to_string())
        }
    }
}
