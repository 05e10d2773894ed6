use crate::{AppState, Effect, Msg, SessionState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::ExportLoaded { messages, progress } => {
            if state.session() == SessionState::Running {
                return (state, Vec::new());
            }
            state.load(messages, progress);
            Vec::new()
        }
        Msg::LoadFailed(message) => {
            state.load_failed(message);
            Vec::new()
        }
        Msg::SelectionToggled(id) => {
            if state.is_editable() {
                state.toggle(id);
            }
            Vec::new()
        }
        Msg::IncludeServiceChanged(include_service) => {
            if state.is_editable() && state.include_service() != include_service {
                state.set_include_service(include_service);
                vec![Effect::SaveSettings { include_service }]
            } else {
                Vec::new()
            }
        }
        Msg::StartClicked => {
            if state.is_editable() {
                state.start_run();
                // The finished set is cleared on every run; candidates loaded
                // as done keep their status from the list-load snapshot.
                let mut effects = vec![Effect::ResetProgress];
                effects.push(next_step(&mut state));
                effects
            } else {
                Vec::new()
            }
        }
        Msg::ItemPublished { id } => {
            if state.session() == SessionState::Running && state.current() == Some(id) {
                vec![Effect::RecordProgress { id }]
            } else {
                Vec::new()
            }
        }
        Msg::ProgressRecorded { id } => {
            if state.session() == SessionState::Running && state.complete_current(id) {
                vec![next_step(&mut state)]
            } else {
                Vec::new()
            }
        }
        Msg::RunFailed { id, message } => {
            // A reset failing after an empty run already reached `Finished`.
            if matches!(
                state.session(),
                SessionState::Running | SessionState::Finished
            ) {
                state.halt(id, message);
            }
            Vec::new()
        }
        Msg::SettingsSaveFailed {
            include_service,
            message,
        } => {
            if state.is_editable() {
                state.settings_not_saved(include_service, message);
            }
            Vec::new()
        }
        Msg::ErrorAcknowledged => {
            state.acknowledge_error();
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn next_step(state: &mut AppState) -> Effect {
    match state.advance() {
        Some(message) => Effect::Publish { message },
        None => Effect::ShowFinished,
    }
}
