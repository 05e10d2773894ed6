#![allow(dead_code)]

use migrator_core::{
    update, AppState, Effect, Message, MessageId, MessageKind, Msg, ProgressSnapshot, TextSpan,
};

pub fn content(id: MessageId, text: &str) -> Message {
    Message {
        id,
        kind: MessageKind::Content,
        timestamp: 1_700_000_000 + id,
        text: vec![TextSpan::Plain(text.to_string())],
        ..Message::default()
    }
}

pub fn service(id: MessageId, action: &str) -> Message {
    Message {
        id,
        kind: MessageKind::Service,
        timestamp: 1_700_000_000 + id,
        action: Some(action.to_string()),
        ..Message::default()
    }
}

/// Messages 1..=3 with message 2 a service message.
pub fn three_messages() -> Vec<Message> {
    vec![
        content(1, "first"),
        service(2, "pin_message"),
        content(3, "third"),
    ]
}

pub fn loaded(messages: Vec<Message>, finished: &[MessageId], include_service: bool) -> AppState {
    let (state, effects) = update(
        AppState::new(),
        Msg::ExportLoaded {
            messages,
            progress: ProgressSnapshot {
                finished_ids: finished.to_vec(),
                include_service,
            },
        },
    );
    assert!(effects.is_empty());
    state
}

pub fn published_id(effects: &[Effect]) -> Option<MessageId> {
    effects.iter().find_map(|effect| match effect {
        Effect::Publish { message } => Some(message.id),
        _ => None,
    })
}
