use migrator_core::{format_message, format_spans, Message, MessageKind, TextSpan};

fn content(spans: Vec<TextSpan>) -> Message {
    Message {
        id: 1,
        kind: MessageKind::Content,
        text: spans,
        ..Message::default()
    }
}

#[test]
fn service_message_formats_to_action_regardless_of_spans() {
    let message = Message {
        kind: MessageKind::Service,
        action: Some("pin_message".to_string()),
        text: vec![TextSpan::Bold("ignored".to_string())],
        ..Message::default()
    };

    assert_eq!(format_message(&message), "pin_message");
}

#[test]
fn service_message_without_action_is_empty() {
    let message = Message {
        kind: MessageKind::Service,
        text: vec![TextSpan::Plain("ignored".to_string())],
        ..Message::default()
    };

    assert_eq!(format_message(&message), "");
}

#[test]
fn empty_content_message_formats_to_empty_string() {
    assert_eq!(format_message(&content(Vec::new())), "");
}

#[test]
fn spans_are_wrapped_in_order() {
    let message = content(vec![
        TextSpan::Plain("Hello ".to_string()),
        TextSpan::Bold("bold".to_string()),
        TextSpan::Plain(", ".to_string()),
        TextSpan::Italic("it".to_string()),
        TextSpan::Plain(" and ".to_string()),
        TextSpan::Strikethrough("gone".to_string()),
        TextSpan::Plain(".".to_string()),
    ]);

    assert_eq!(
        format_message(&message),
        "Hello **bold**, *it* and ~~gone~~."
    );
}

#[test]
fn links_render_as_markdown_hyperlinks() {
    let spans = vec![
        TextSpan::Link("https://example.com".to_string()),
        TextSpan::Plain(" ".to_string()),
        TextSpan::TextLink {
            text: "docs".to_string(),
            href: "https://docs.example.com/a".to_string(),
        },
    ];

    assert_eq!(
        format_spans(&spans),
        "[https://example.com](https://example.com) [docs](https://docs.example.com/a)"
    );
}

#[test]
fn unsupported_span_types_emit_raw_text() {
    let spans = vec![
        TextSpan::Other {
            kind: "mention".to_string(),
            text: "@someone".to_string(),
        },
        TextSpan::Other {
            kind: "code".to_string(),
            text: " x*y ".to_string(),
        },
    ];

    assert_eq!(format_spans(&spans), "@someone x*y ");
}

#[test]
fn markup_characters_in_input_are_not_escaped() {
    let message = content(vec![TextSpan::Bold("a**b".to_string())]);

    assert_eq!(format_message(&message), "**a**b**");
}

#[test]
fn formatting_is_deterministic() {
    let message = content(vec![
        TextSpan::Italic("x".to_string()),
        TextSpan::Link("https://t.me".to_string()),
    ]);

    assert_eq!(format_message(&message), format_message(&message));
}
