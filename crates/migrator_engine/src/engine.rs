use std::sync::{mpsc, Arc};
use std::thread;

use engine_logging::engine_error;
use migrator_core::Message;

use crate::fetch::ChannelProgressSink;
use crate::identity::SigningContext;
use crate::publish::Publisher;
use crate::{EngineEvent, IdentityOutcome, IdentityRequest, MigrateError};

enum EngineCommand {
    Publish { message: Message, channel: String },
    Identity(IdentityRequest),
}

/// Runs publishes and identity requests on a tokio runtime in a worker thread.
///
/// Commands are processed one at a time, in the order they were sent.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(publisher: Arc<dyn Publisher>, identity: Arc<SigningContext>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    engine_error!("Failed to start engine runtime: {}", err);
                    return;
                }
            };
            while let Ok(command) = cmd_rx.recv() {
                runtime.block_on(handle_command(
                    publisher.as_ref(),
                    identity.as_ref(),
                    command,
                    &event_tx,
                ));
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn publish(&self, message: Message, channel: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Publish {
            message,
            channel: channel.into(),
        });
    }

    pub fn identity(&self, request: IdentityRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Identity(request));
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Blocks until the next event; `None` once the worker is gone.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }
}

async fn handle_command(
    publisher: &dyn Publisher,
    identity: &SigningContext,
    command: EngineCommand,
    event_tx: &mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::Publish { message, channel } => {
            let sink = ChannelProgressSink::new(event_tx.clone());
            let result = publisher.publish(&message, &channel, &sink).await;
            let _ = event_tx.send(EngineEvent::PublishCompleted {
                message_id: message.id,
                result,
            });
        }
        EngineCommand::Identity(request) => {
            let result = run_identity(identity, request).await;
            let _ = event_tx.send(EngineEvent::IdentityCompleted { result });
        }
    }
}

async fn run_identity(
    identity: &SigningContext,
    request: IdentityRequest,
) -> Result<IdentityOutcome, MigrateError> {
    let outcome = match request {
        IdentityRequest::SignerAddress => identity.signer_address().map(IdentityOutcome::Signer),
        IdentityRequest::CheckOperator { operator } => identity
            .check_operator(&operator)
            .await
            .map(IdentityOutcome::IsOperator),
        IdentityRequest::AddOperator { operator } => {
            identity
                .add_operator(&operator)
                .await
                .map(|receipt| IdentityOutcome::Submitted {
                    transaction_hash: receipt.transaction_hash,
                })
        }
        IdentityRequest::RemoveOperator { operator } => identity
            .remove_operator(&operator)
            .await
            .map(|receipt| IdentityOutcome::Submitted {
                transaction_hash: receipt.transaction_hash,
            }),
    };
    outcome.map_err(|err| err.into_migrate(None))
}
