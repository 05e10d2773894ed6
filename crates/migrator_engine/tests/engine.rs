mod common;

use std::sync::Arc;

use common::TEST_KEY;
use migrator_core::{Message, MessageId};
use migrator_engine::{
    EngineEvent, EngineHandle, IdentityOutcome, IdentityRequest, LedgerChain, MigrateError,
    ProgressSink, PublishProgress, PublishReceipt, Publisher, SigningContext, Stage,
};

/// Succeeds for every message except `fail_on`.
struct ScriptedPublisher {
    fail_on: MessageId,
}

#[async_trait::async_trait]
impl Publisher for ScriptedPublisher {
    async fn publish(
        &self,
        message: &Message,
        channel: &str,
        sink: &dyn ProgressSink,
    ) -> Result<PublishReceipt, MigrateError> {
        sink.emit(EngineEvent::Progress(PublishProgress {
            message_id: message.id,
            stage: Stage::Formatting,
            bytes: None,
        }));
        if message.id == self.fail_on {
            return Err(MigrateError::Transfer {
                address: "photos/x.jpg".to_string(),
                message: "gone".to_string(),
            });
        }
        Ok(PublishReceipt {
            message_id: message.id,
            content_pointer: format!("{channel}/{}", message.id),
            transaction_hash: "0xabc".to_string(),
            note_id: Some(1),
        })
    }
}

fn next_completion(engine: &EngineHandle) -> EngineEvent {
    loop {
        match engine.recv().expect("engine alive") {
            EngineEvent::Progress(_) => continue,
            other => return other,
        }
    }
}

fn message(id: MessageId) -> Message {
    Message {
        id,
        ..Message::default()
    }
}

#[test]
fn publish_commands_complete_in_order() {
    let identity = Arc::new(SigningContext::new(Box::new(LedgerChain::in_memory())));
    let engine = EngineHandle::new(Arc::new(ScriptedPublisher { fail_on: 2 }), identity);

    engine.publish(message(1), "chan");
    engine.publish(message(2), "chan");

    match engine.recv().unwrap() {
        EngineEvent::Progress(progress) => assert_eq!(progress.message_id, 1),
        other => panic!("expected progress first, got {other:?}"),
    }
    match next_completion(&engine) {
        EngineEvent::PublishCompleted { message_id, result } => {
            assert_eq!(message_id, 1);
            assert_eq!(result.unwrap().content_pointer, "chan/1");
        }
        other => panic!("unexpected {other:?}"),
    }
    match next_completion(&engine) {
        EngineEvent::PublishCompleted { message_id, result } => {
            assert_eq!(message_id, 2);
            assert!(matches!(result, Err(MigrateError::Transfer { .. })));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn identity_requests_map_chain_failures() {
    let mut context = SigningContext::new(Box::new(LedgerChain::in_memory()));
    context.init_with_private_key(TEST_KEY).unwrap();
    context.select_character(1);
    let engine = EngineHandle::new(
        Arc::new(ScriptedPublisher { fail_on: 0 }),
        Arc::new(context),
    );

    engine.identity(IdentityRequest::SignerAddress);
    engine.identity(IdentityRequest::AddOperator {
        operator: "bogus".to_string(),
    });

    match next_completion(&engine) {
        EngineEvent::IdentityCompleted { result } => {
            assert!(matches!(result, Ok(IdentityOutcome::Signer(address)) if address.len() == 42));
        }
        other => panic!("unexpected {other:?}"),
    }
    match next_completion(&engine) {
        EngineEvent::IdentityCompleted { result } => {
            assert!(matches!(result, Err(MigrateError::Chain(_))));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn identity_without_key_is_a_precondition() {
    let identity = Arc::new(SigningContext::new(Box::new(LedgerChain::in_memory())));
    let engine = EngineHandle::new(Arc::new(ScriptedPublisher { fail_on: 0 }), identity);

    engine.identity(IdentityRequest::CheckOperator {
        operator: "0x0000000000000000000000000000000000000001".to_string(),
    });

    match next_completion(&engine) {
        EngineEvent::IdentityCompleted { result } => {
            assert!(matches!(result, Err(MigrateError::Precondition(_))));
        }
        other => panic!("unexpected {other:?}"),
    }
}
