use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use snafu::Snafu;

use crate::attachment::FileRef;
use crate::ids::ExchangeId;
use crate::message::{AnswerSource, TransactionInfo};

/// Outbound question for the answering endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskRequest {
    pub exchange_id: ExchangeId,
    pub question: String,
    pub attachment: Option<FileRef>,
}

/// Raw HTTP result of one completed exchange; classification happens in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeReply {
    pub status: u16,
    pub body: String,
}

impl ExchangeReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ExchangeError {
    #[snafu(display("answer exchange failed on `{stage}`: {message}"))]
    Transport {
        stage: &'static str,
        message: String,
    },
    #[snafu(display("answer exchange worker stopped before replying on `{stage}`"))]
    WorkerLost { stage: &'static str },
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
pub type ExchangeFuture<'a> = Pin<Box<dyn Future<Output = ExchangeResult<ExchangeReply>> + 'a>>;

/// The remote answering service, seen from the session.
pub trait AnswerService {
    fn ask(&self, request: AskRequest) -> ExchangeFuture<'_>;
}

/// Reads an optional field, treating a value of the wrong shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Body of a 2xx reply. `answer` is mandatory here; everything else is
/// display-only and never fails the body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnswerPayload {
    pub answer: String,
    #[serde(default, deserialize_with = "lenient")]
    pub transaction_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub relevant_sentences_count: Option<u64>,
    /// File-upload answers report their count under this key instead.
    #[serde(default, deserialize_with = "lenient")]
    pub sentences_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub urls_processed: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub source: Option<AnswerSource>,
}

impl AnswerPayload {
    /// Transaction details exist only when the reply names a transaction type.
    pub fn transaction_info(&self) -> Option<TransactionInfo> {
        let transaction_type = self
            .transaction_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())?;

        Some(TransactionInfo {
            transaction_type: transaction_type.to_string(),
            relevant_sentences_count: self.relevant_sentences_count.or(self.sentences_count),
            urls_processed: self.urls_processed,
            confidence: self.confidence.filter(|value| value.is_finite()),
            source: self.source,
        })
    }
}

/// Body of a non-2xx reply; the server may or may not explain itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FailurePayload {
    #[serde(default, deserialize_with = "lenient")]
    pub answer: Option<String>,
}
