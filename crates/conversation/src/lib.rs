//! Headless model of a single-conversation chat client.
//!
//! [`ConversationSession`] owns the request lifecycle, [`Transcript`] owns the
//! ordered history, and [`render`] turns entries into display rows. The
//! drawing surface and the HTTP transport live in other crates and plug in
//! through [`SessionObserver`] and [`AnswerService`].

pub mod attachment;
pub mod events;
pub mod ids;
pub mod message;
pub mod render;
pub mod service;
pub mod session;
pub mod transcript;

pub use attachment::{
    AttachmentError, AttachmentResult, FileRef, MAX_ATTACHMENT_BYTES, SUPPORTED_EXTENSIONS,
    is_supported_attachment,
};
pub use events::{Feedback, Phase, SessionEvent, SessionObserver};
pub use ids::{EntryId, ExchangeId};
pub use message::{AnswerSource, Entry, Message, MessageMeta, Role, TransactionInfo};
pub use render::{
    RenderedEntry, RenderedMessage, RenderedTransaction, RenderedTranscript, render_entry,
    render_message, render_transaction, render_transcript,
};
pub use service::{
    AnswerPayload, AnswerService, AskRequest, ExchangeError, ExchangeFuture, ExchangeReply,
    ExchangeResult, FailurePayload,
};
pub use session::{ConversationSession, GENERIC_FAILURE_TEXT, NETWORK_ERROR_TEXT, SendOutcome};
pub use transcript::{Transcript, TranscriptError, TranscriptResult};
