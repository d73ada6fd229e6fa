//! Pure projection of transcript entries into display-ready rows.
//!
//! Nothing here knows about the drawing substrate; the desktop shell turns
//! these rows into elements and tests assert on them directly.

use crate::ids::EntryId;
use crate::message::{AnswerSource, Entry, Message, Role, TransactionInfo};
use crate::transcript::Transcript;

pub const TIMESTAMP_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTransaction {
    pub heading: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub role: Role,
    pub speaker: &'static str,
    pub time: String,
    pub attachment: Option<String>,
    pub transaction: Option<RenderedTransaction>,
    pub body: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedEntry {
    Message(RenderedMessage),
    Typing,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedTranscript {
    pub welcome_visible: bool,
    pub rows: Vec<(EntryId, RenderedEntry)>,
}

pub fn render_transcript(transcript: &Transcript) -> RenderedTranscript {
    RenderedTranscript {
        welcome_visible: transcript.welcome_visible(),
        rows: transcript
            .entries()
            .map(|(id, entry)| (id, render_entry(entry)))
            .collect(),
    }
}

pub fn render_entry(entry: &Entry) -> RenderedEntry {
    match entry {
        Entry::Message(message) => RenderedEntry::Message(render_message(message)),
        Entry::Typing => RenderedEntry::Typing,
    }
}

pub fn render_message(message: &Message) -> RenderedMessage {
    let body = match message.role {
        // Answers arrive with embedded newlines that should break lines.
        Role::Bot => message.text.split('\n').map(str::to_string).collect(),
        Role::User => vec![message.text.clone()],
    };

    RenderedMessage {
        role: message.role,
        speaker: message.role.speaker_label(),
        time: message.meta.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        attachment: message.attachment.clone(),
        transaction: match message.role {
            Role::Bot => message.transaction().map(render_transaction),
            Role::User => None,
        },
        body,
    }
}

/// Heading plus the count lines that are positive, then confidence and source
/// when the reply carried them.
pub fn render_transaction(info: &TransactionInfo) -> RenderedTransaction {
    let mut details = Vec::new();

    if let Some(count) = info.relevant_sentences_count.filter(|count| *count > 0) {
        details.push(format!("Found {count} relevant information pieces"));
    }

    if let Some(count) = info.urls_processed.filter(|count| *count > 0) {
        details.push(format!("Processed {count} website(s)"));
        details.push("Extracted detailed conditions from websites".to_string());
    }

    if let Some(confidence) = info.confidence {
        let percent = (confidence.clamp(0.0, 1.0) * 100.0).round();
        details.push(format!("Confidence: {percent:.0}%"));
    }

    if let Some(label) = info.source.and_then(AnswerSource::label) {
        details.push(format!("Source: {label}"));
    }

    RenderedTransaction {
        heading: format!(
            "Transaction Type: {}",
            capitalize_first(&info.transaction_type)
        ),
        details,
    }
}

fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
