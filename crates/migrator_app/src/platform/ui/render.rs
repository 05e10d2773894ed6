use chrono::{DateTime, SecondsFormat, Utc};
use migrator_core::{
    AppViewModel, CandidateRow, CandidateStatus, MediaPreview, MessageBody, SessionState,
};

const MAX_TEXT_CHARS: usize = 72;

pub fn glyph(status: CandidateStatus) -> &'static str {
    match status {
        CandidateStatus::Excluded => " ",
        CandidateStatus::Pending => "·",
        CandidateStatus::InProgress => "…",
        CandidateStatus::Done => "✓",
    }
}

/// One list line: `[x] ✓ #12 text (photo photos/a.jpg 640x480)`.
pub fn row(row: &CandidateRow) -> String {
    let checkbox = if row.selected { "[x]" } else { "[ ]" };
    let body = match &row.body {
        MessageBody::Service { action } => format!("[service] {}", excerpt(action)),
        MessageBody::Content { text, media } => {
            let text = excerpt(text);
            let previews: Vec<String> = media.iter().map(media_preview).collect();
            match (text.is_empty(), previews.is_empty()) {
                (_, true) => text,
                (true, false) => format!("({})", previews.join(", ")),
                (false, false) => format!("{text} ({})", previews.join(", ")),
            }
        }
    };
    format!("{checkbox} {} #{} {body}", glyph(row.status), row.id)
        .trim_end()
        .to_string()
}

pub fn media_preview(media: &MediaPreview) -> String {
    match media {
        MediaPreview::Photo {
            address,
            width: Some(width),
            height: Some(height),
        } => format!("photo {address} {width}x{height}"),
        MediaPreview::Photo { address, .. } => format!("photo {address}"),
        MediaPreview::Audio { address } => format!("audio {address}"),
        MediaPreview::Video { address } => format!("video {address}"),
        MediaPreview::Unknown {
            address,
            mime_type: Some(mime_type),
        } => format!("file {address} {mime_type}"),
        MediaPreview::Unknown { address, .. } => format!("file {address}"),
    }
}

pub fn session_label(session: SessionState) -> &'static str {
    match session {
        SessionState::Loading => "Loading",
        SessionState::Ready => "Ready",
        SessionState::Running => "Running",
        SessionState::Halted => "Halted",
        SessionState::Finished => "Finished",
    }
}

pub fn status_line(view: &AppViewModel) -> String {
    format!(
        "Session: {} | Selected: {} | Done: {} | Service messages: {}",
        session_label(view.session),
        view.selected_count,
        view.done_count,
        if view.include_service { "included" } else { "excluded" }
    )
}

pub fn list(view: &AppViewModel) -> String {
    let mut out = String::new();
    for candidate in &view.rows {
        out.push_str(&row(candidate));
        out.push('\n');
    }
    out.push_str(&status_line(view));
    out.push('\n');
    out
}

/// Rows whose rendering changed between two views, in list order.
pub fn changed_rows(previous: &AppViewModel, next: &AppViewModel) -> Vec<String> {
    next.rows
        .iter()
        .filter(|candidate| {
            previous
                .rows
                .iter()
                .find(|old| old.id == candidate.id)
                .map_or(true, |old| old != *candidate)
        })
        .map(row)
        .collect()
}

pub fn error_dialog(message: &str) -> String {
    let lines: Vec<&str> = message.lines().collect();
    let width = lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0)
        .max(" Error ".len());
    let mut out = format!("+{:-<width$}+\n", "- Error ", width = width + 2);
    for line in &lines {
        out.push_str(&format!("| {line:<width$} |\n"));
    }
    out.push_str(&format!("+{}+\n", "-".repeat(width + 2)));
    out
}

pub fn finished(view: &AppViewModel, at: DateTime<Utc>) -> String {
    format!(
        "Migration finished at {}: {} of {} messages migrated.\n",
        at.to_rfc3339_opts(SecondsFormat::Secs, true),
        view.done_count,
        view.rows.len()
    )
}

fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MAX_TEXT_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(MAX_TEXT_CHARS - 3).collect();
    format!("{cut}...")
}
