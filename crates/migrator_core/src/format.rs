use crate::{Message, MessageKind, TextSpan};

/// Flatten a message body into markdown.
///
/// Service messages render as their action text. Span text is not escaped, so
/// input that already contains markup characters is passed through verbatim.
pub fn format_message(message: &Message) -> String {
    match message.kind {
        MessageKind::Service => message.action.clone().unwrap_or_default(),
        MessageKind::Content => format_spans(&message.text),
    }
}

pub fn format_spans(spans: &[TextSpan]) -> String {
    let mut out = String::new();
    for span in spans {
        push_span(&mut out, span);
    }
    out
}

fn push_span(out: &mut String, span: &TextSpan) {
    match span {
        TextSpan::Bold(text) => wrap(out, "**", text),
        TextSpan::Italic(text) => wrap(out, "*", text),
        TextSpan::Strikethrough(text) => wrap(out, "~~", text),
        TextSpan::Link(text) => push_link(out, text, text),
        TextSpan::TextLink { text, href } => push_link(out, text, href),
        TextSpan::Plain(text) | TextSpan::Other { text, .. } => out.push_str(text),
    }
}

fn wrap(out: &mut String, marker: &str, text: &str) {
    out.push_str(marker);
    out.push_str(text);
    out.push_str(marker);
}

fn push_link(out: &mut String, label: &str, href: &str) {
    out.push('[');
    out.push_str(label);
    out.push_str("](");
    out.push_str(href);
    out.push(')');
}
