use chrono::{DateTime, Local};
use serde::Deserialize;

/// Speaker of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Bot,
}

impl Role {
    /// Label shown next to the timestamp under each bubble.
    pub fn speaker_label(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Bot => "AI Assistant",
        }
    }
}

/// Where the answering service found the material behind an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    FileUpload,
    WebScraping,
    Database,
    #[serde(other)]
    Other,
}

impl AnswerSource {
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::FileUpload => Some("uploaded file"),
            Self::WebScraping => Some("website scraping"),
            Self::Database => Some("stored knowledge base"),
            Self::Other => None,
        }
    }
}

/// Presentational annotation attached to a bot answer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionInfo {
    pub transaction_type: String,
    pub relevant_sentences_count: Option<u64>,
    pub urls_processed: Option<u64>,
    pub confidence: Option<f64>,
    pub source: Option<AnswerSource>,
}

impl TransactionInfo {
    pub fn new(transaction_type: impl Into<String>) -> Self {
        Self {
            transaction_type: transaction_type.into(),
            relevant_sentences_count: None,
            urls_processed: None,
            confidence: None,
            source: None,
        }
    }

    pub fn with_relevant_sentences(mut self, count: u64) -> Self {
        self.relevant_sentences_count = Some(count);
        self
    }

    pub fn with_urls_processed(mut self, count: u64) -> Self {
        self.urls_processed = Some(count);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_source(mut self, source: AnswerSource) -> Self {
        self.source = Some(source);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageMeta {
    pub timestamp: DateTime<Local>,
    pub transaction: Option<TransactionInfo>,
}

/// One finished transcript message. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub attachment: Option<String>,
    pub meta: MessageMeta,
}

impl Message {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            attachment: None,
            meta: MessageMeta {
                timestamp: Local::now(),
                transaction: None,
            },
        }
    }

    /// Question typed by the user, carrying the staged file name if there was one.
    pub fn user(text: impl Into<String>, attachment: Option<String>) -> Self {
        Self {
            attachment,
            ..Self::new(Role::User, text)
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Role::Bot, text)
    }

    pub fn bot_with_transaction(text: impl Into<String>, transaction: TransactionInfo) -> Self {
        let mut message = Self::new(Role::Bot, text);
        message.meta.transaction = Some(transaction);
        message
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.meta.timestamp = timestamp;
        self
    }

    pub fn transaction(&self) -> Option<&TransactionInfo> {
        self.meta.transaction.as_ref()
    }
}

/// Anything the transcript can hold: a real message or the typing indicator.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Message(Message),
    Typing,
}

impl Entry {
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Message(message) => Some(message),
            Self::Typing => None,
        }
    }

    pub fn is_typing(&self) -> bool {
        matches!(self, Self::Typing)
    }
}
