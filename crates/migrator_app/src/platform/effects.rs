use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use migrator_core::{Effect, MessageId, Msg};
use migrator_engine::{EngineEvent, EngineHandle, IdentityOutcome, IdentityRequest, MigrateError};

use super::persistence::ProgressStore;

/// Executes core effects against the engine and the progress store.
///
/// Effects run one at a time and block until their outcome is known, so a
/// publish is never in flight while the next one is being prepared.
pub struct EffectRunner {
    engine: EngineHandle,
    progress: ProgressStore,
    channel: String,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, progress: ProgressStore, channel: String) -> Self {
        Self {
            engine,
            progress,
            channel,
        }
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// Runs `effects` in order and returns the messages they produced.
    ///
    /// The first failure becomes a `RunFailed` and the remaining effects are dropped.
    pub fn run(&mut self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut msgs = Vec::new();
        let mut effects = effects.into_iter().peekable();
        while let Some(effect) = effects.next() {
            match self.execute(effect) {
                Ok(Some(msg)) => msgs.push(msg),
                Ok(None) => {}
                Err((id, err)) => {
                    let id = id
                        .or_else(|| effects.peek().and_then(publish_target))
                        .unwrap_or_default();
                    engine_error!("Migration halted at message {}: {}", id, err);
                    msgs.push(Msg::RunFailed {
                        id,
                        message: err.to_string(),
                    });
                    break;
                }
            }
        }
        msgs
    }

    fn execute(&mut self, effect: Effect) -> Result<Option<Msg>, (Option<MessageId>, MigrateError)> {
        match effect {
            Effect::ResetProgress => {
                self.progress
                    .reset_finished()
                    .map_err(|err| (None, MigrateError::Progress(err.to_string())))?;
                Ok(None)
            }
            Effect::Publish { message } => {
                let id = message.id;
                engine_info!("Publishing message {}", id);
                self.engine.publish(message, self.channel.as_str());
                self.await_publish(id)
                    .map(|id| Some(Msg::ItemPublished { id }))
                    .map_err(|err| (Some(id), err))
            }
            Effect::RecordProgress { id } => {
                let snapshot = self
                    .progress
                    .record_finished(id)
                    .map_err(|err| (Some(id), MigrateError::Progress(err.to_string())))?;
                engine_debug!("Message {} recorded; {} finished", id, snapshot.finished_ids.len());
                Ok(Some(Msg::ProgressRecorded { id }))
            }
            Effect::SaveSettings { include_service } => {
                match self.progress.set_include_service(include_service) {
                    Ok(()) => Ok(None),
                    Err(err) => {
                        engine_error!("Failed to save includeService={}: {}", include_service, err);
                        Ok(Some(Msg::SettingsSaveFailed {
                            include_service,
                            message: MigrateError::Progress(err.to_string()).to_string(),
                        }))
                    }
                }
            }
            Effect::ShowFinished => {
                engine_info!("Migration finished");
                Ok(None)
            }
        }
    }

    fn await_publish(&self, id: MessageId) -> Result<MessageId, MigrateError> {
        loop {
            match self.engine.recv() {
                Some(EngineEvent::Progress(progress)) => {
                    engine_debug!(
                        "Message {}: {:?} {:?}",
                        progress.message_id,
                        progress.stage,
                        progress.bytes
                    );
                }
                Some(EngineEvent::PublishCompleted { message_id, result }) => {
                    if message_id != id {
                        engine_warn!("Ignoring completion for message {}", message_id);
                        continue;
                    }
                    let receipt = result?;
                    engine_info!(
                        "Message {} on chain: tx {} note {:?}",
                        id,
                        receipt.transaction_hash,
                        receipt.note_id
                    );
                    return Ok(id);
                }
                Some(EngineEvent::IdentityCompleted { .. }) => {}
                None => return Err(worker_stopped()),
            }
        }
    }
}

fn worker_stopped() -> MigrateError {
    MigrateError::Engine("engine worker stopped".to_string())
}

fn publish_target(effect: &Effect) -> Option<MessageId> {
    match effect {
        Effect::Publish { message } => Some(message.id),
        _ => None,
    }
}

/// Sends one identity request and waits for its answer.
pub fn request_identity(
    engine: &EngineHandle,
    request: IdentityRequest,
) -> Result<IdentityOutcome, MigrateError> {
    engine.identity(request);
    loop {
        match engine.recv() {
            Some(EngineEvent::IdentityCompleted { result }) => return result,
            Some(_) => {}
            None => return Err(worker_stopped()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use migrator_core::Message;
    use migrator_engine::{
        LedgerChain, ProgressSink, PublishReceipt, Publisher, SigningContext,
    };
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    struct CrashingPublisher;

    #[async_trait::async_trait]
    impl Publisher for CrashingPublisher {
        async fn publish(
            &self,
            message: &Message,
            _channel: &str,
            _sink: &dyn ProgressSink,
        ) -> Result<PublishReceipt, MigrateError> {
            panic!("publisher crashed on message {}", message.id);
        }
    }

    fn runner(state_dir: std::path::PathBuf) -> EffectRunner {
        engine_logging::initialize_for_tests();
        let identity = Arc::new(SigningContext::new(Box::new(LedgerChain::in_memory())));
        let engine = EngineHandle::new(Arc::new(CrashingPublisher), identity);
        EffectRunner::new(engine, ProgressStore::new(state_dir), "chan".to_string())
    }

    #[test]
    fn dead_worker_is_an_engine_failure() {
        let temp = TempDir::new().unwrap();
        let mut runner = runner(temp.path().to_path_buf());

        let msgs = runner.run(vec![
            Effect::Publish {
                message: Message {
                    id: 5,
                    ..Message::default()
                },
            },
            Effect::RecordProgress { id: 5 },
        ]);

        assert_eq!(
            msgs,
            vec![Msg::RunFailed {
                id: 5,
                message: "engine unavailable: engine worker stopped".to_string(),
            }]
        );
        assert!(runner.progress().load().finished_ids.is_empty());
    }

    #[test]
    fn unsaved_setting_is_reported_back() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("state");
        std::fs::write(&blocker, "not a directory").unwrap();
        let mut runner = runner(blocker);

        let msgs = runner.run(vec![Effect::SaveSettings {
            include_service: true,
        }]);

        assert!(matches!(
            msgs.as_slice(),
            [Msg::SettingsSaveFailed { include_service: true, message }]
                if message.starts_with("failed to record progress:")
        ));
    }

    #[test]
    fn reset_failure_stops_before_publishing() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("state");
        std::fs::write(&blocker, "not a directory").unwrap();
        let mut runner = runner(blocker);

        let msgs = runner.run(vec![
            Effect::ResetProgress,
            Effect::Publish {
                message: Message {
                    id: 8,
                    ..Message::default()
                },
            },
        ]);

        assert!(matches!(
            msgs.as_slice(),
            [Msg::RunFailed { id: 8, message }] if message.starts_with("failed to record progress:")
        ));
    }
}
