use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::attachment::FileRef;
use crate::events::{Feedback, Phase, SessionEvent, SessionObserver};
use crate::ids::{EntryId, ExchangeId, IdAllocator};
use crate::message::Message;
use crate::service::{
    AnswerPayload, AnswerService, AskRequest, ExchangeReply, ExchangeResult, FailurePayload,
};
use crate::transcript::Transcript;

pub const GENERIC_FAILURE_TEXT: &str = "An error occurred. Please try again.";
pub const NETWORK_ERROR_TEXT: &str = "Network error. Please check your connection and try again.";

/// How an accepted send settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendOutcome {
    /// 2xx with a usable answer.
    Answered,
    /// Non-2xx with a parseable body.
    ServerFailure,
    /// A reply arrived but its body could not be understood.
    ProtocolFailure,
    /// The exchange never completed.
    TransportFailure,
}

impl SendOutcome {
    pub fn feedback(self) -> Feedback {
        match self {
            Self::Answered => Feedback::Success,
            Self::ServerFailure | Self::ProtocolFailure | Self::TransportFailure => Feedback::Error,
        }
    }
}

struct SessionState {
    phase: Phase,
    staged_file: Option<FileRef>,
    exchange_ids: IdAllocator,
}

/// Owns the request lifecycle of the one conversation.
///
/// The session is single-threaded by construction: it is driven from one
/// event loop and the only suspension point is the answer exchange itself.
/// `Idle -> Sending` happens synchronously before the exchange starts and the
/// way back is owned by a [`SendLease`], so every exit path unlocks.
#[derive(Clone)]
pub struct ConversationSession {
    state: Rc<RefCell<SessionState>>,
    transcript: Rc<RefCell<Transcript>>,
    service: Rc<dyn AnswerService>,
    observer: Rc<dyn SessionObserver>,
}

impl ConversationSession {
    pub fn new(service: Rc<dyn AnswerService>, observer: Rc<dyn SessionObserver>) -> Self {
        Self {
            state: Rc::new(RefCell::new(SessionState {
                phase: Phase::Idle,
                staged_file: None,
                exchange_ids: IdAllocator::new(),
            })),
            transcript: Rc::new(RefCell::new(Transcript::new())),
            service,
            observer,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    pub fn staged_file_name(&self) -> Option<String> {
        self.state
            .borrow()
            .staged_file
            .as_ref()
            .map(|file| file.name.clone())
    }

    /// Read-only view of the transcript. Do not hold it across an await.
    pub fn transcript(&self) -> Ref<'_, Transcript> {
        self.transcript.borrow()
    }

    pub fn take_scroll_request(&self) -> bool {
        self.transcript.borrow_mut().take_scroll_request()
    }

    /// Replaces the staged file, or clears it with `None`.
    pub fn stage_file(&self, file: Option<FileRef>) {
        let name = file.as_ref().map(|file| file.name.clone());
        let previous = std::mem::replace(&mut self.state.borrow_mut().staged_file, file);

        if let Some(previous) = previous {
            tracing::debug!(replaced = %previous.name, "dropping previously staged file");
        }
        self.observer.on_event(SessionEvent::StagedFileChanged(name));
    }

    /// Sends one question. Returns `None` when the call is rejected because
    /// the question is blank or another exchange is still in flight.
    pub async fn request_send(&self, question: &str) -> Option<SendOutcome> {
        let (mut lease, request) = self.begin_send(question)?;
        let exchange_id = request.exchange_id;

        let result = self.service.ask(request).await;

        lease.clear_placeholder();
        let (message, outcome) = settle(exchange_id, result);
        self.transcript.borrow_mut().append(message);
        self.observer.on_event(SessionEvent::TranscriptChanged);
        self.observer
            .on_event(SessionEvent::Feedback(outcome.feedback()));

        tracing::info!(exchange = %exchange_id, ?outcome, "exchange settled");
        drop(lease);
        Some(outcome)
    }

    fn begin_send(&self, question: &str) -> Option<(SendLease, AskRequest)> {
        let question = question.trim();
        if question.is_empty() {
            tracing::debug!("ignoring send of a blank question");
            return None;
        }

        let (exchange_id, attachment) = {
            let mut state = self.state.borrow_mut();
            if state.phase.is_sending() {
                tracing::debug!("ignoring send while another exchange is in flight");
                return None;
            }
            state.phase = Phase::Sending;
            (state.exchange_ids.next_exchange(), state.staged_file.take())
        };

        let mut lease = SendLease {
            exchange_id,
            state: Rc::clone(&self.state),
            transcript: Rc::clone(&self.transcript),
            observer: Rc::clone(&self.observer),
            placeholder: None,
        };
        self.observer
            .on_event(SessionEvent::PhaseChanged(Phase::Sending));

        {
            let mut transcript = self.transcript.borrow_mut();
            transcript.append(Message::user(
                question,
                attachment.as_ref().map(|file| file.name.clone()),
            ));
            match transcript.append_placeholder() {
                Ok(placeholder) => lease.placeholder = Some(placeholder),
                Err(error) => {
                    tracing::error!(exchange = %exchange_id, error = %error, "typing placeholder not shown");
                }
            }
        }
        self.observer.on_event(SessionEvent::TranscriptChanged);
        self.observer.on_event(SessionEvent::InputCleared);
        self.observer.on_event(SessionEvent::StagedFileChanged(None));

        tracing::info!(
            exchange = %exchange_id,
            attachment = attachment.as_ref().map(|file| file.name.as_str()),
            "sending question"
        );

        Some((
            lease,
            AskRequest {
                exchange_id,
                question: question.to_string(),
                attachment,
            },
        ))
    }
}

/// Held for the lifetime of one accepted send; dropping it returns the session to idle.
struct SendLease {
    exchange_id: ExchangeId,
    state: Rc<RefCell<SessionState>>,
    transcript: Rc<RefCell<Transcript>>,
    observer: Rc<dyn SessionObserver>,
    placeholder: Option<EntryId>,
}

impl SendLease {
    /// Removes the typing entry. The handle is kept when the transcript is
    /// borrowed elsewhere so the drop path can retry.
    fn clear_placeholder(&mut self) {
        let Some(placeholder) = self.placeholder else {
            return;
        };

        match self.transcript.try_borrow_mut() {
            Ok(mut transcript) => {
                transcript.remove(placeholder);
            }
            Err(_) => {
                tracing::error!(exchange = %self.exchange_id, entry = %placeholder, "transcript busy; typing placeholder removal deferred");
                return;
            }
        }
        self.placeholder = None;
        self.observer.on_event(SessionEvent::TranscriptChanged);
    }
}

impl Drop for SendLease {
    fn drop(&mut self) {
        self.clear_placeholder();

        match self.state.try_borrow_mut() {
            Ok(mut state) => state.phase = Phase::Idle,
            Err(_) => {
                tracing::error!(exchange = %self.exchange_id, "session state busy; could not return to idle");
                return;
            }
        }
        self.observer.on_event(SessionEvent::PhaseChanged(Phase::Idle));
    }
}

fn settle(exchange_id: ExchangeId, result: ExchangeResult<ExchangeReply>) -> (Message, SendOutcome) {
    let reply = match result {
        Ok(reply) => reply,
        Err(error) => {
            tracing::warn!(exchange = %exchange_id, error = %error, "answer exchange did not complete");
            return (Message::bot(NETWORK_ERROR_TEXT), SendOutcome::TransportFailure);
        }
    };

    if reply.is_success() {
        return match serde_json::from_str::<AnswerPayload>(&reply.body) {
            Ok(payload) => {
                tracing::debug!(
                    exchange = %exchange_id,
                    transaction_type = payload.transaction_type.as_deref(),
                    source = ?payload.source,
                    confidence = payload.confidence,
                    "answer received"
                );
                let message = match payload.transaction_info() {
                    Some(info) => Message::bot_with_transaction(payload.answer, info),
                    None => Message::bot(payload.answer),
                };
                (message, SendOutcome::Answered)
            }
            Err(error) => {
                tracing::warn!(exchange = %exchange_id, status = reply.status, error = %error, "unreadable answer body");
                (Message::bot(NETWORK_ERROR_TEXT), SendOutcome::ProtocolFailure)
            }
        };
    }

    match serde_json::from_str::<FailurePayload>(&reply.body) {
        Ok(payload) => {
            tracing::warn!(exchange = %exchange_id, status = reply.status, "answering service reported a failure");
            let text = payload
                .answer
                .filter(|answer| !answer.is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE_TEXT.to_string());
            (Message::bot(text), SendOutcome::ServerFailure)
        }
        Err(error) => {
            tracing::warn!(exchange = %exchange_id, status = reply.status, error = %error, "unreadable failure body");
            (Message::bot(NETWORK_ERROR_TEXT), SendOutcome::ProtocolFailure)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use futures::FutureExt;
    use futures::channel::oneshot;
    use futures::executor::block_on;

    use super::*;
    use crate::message::{Entry, Role};
    use crate::render::{RenderedEntry, render_entry};
    use crate::service::{ExchangeError, ExchangeFuture};

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<SessionEvent>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<SessionEvent> {
            self.events.borrow().clone()
        }
    }

    impl SessionObserver for Recorder {
        fn on_event(&self, event: SessionEvent) {
            self.events.borrow_mut().push(event);
        }
    }

    /// Replies with a fixed script, one entry per call.
    #[derive(Default)]
    struct ScriptedService {
        replies: RefCell<VecDeque<ExchangeResult<ExchangeReply>>>,
        requests: RefCell<Vec<AskRequest>>,
    }

    impl ScriptedService {
        fn replying(reply: ExchangeResult<ExchangeReply>) -> Self {
            let service = Self::default();
            service.replies.borrow_mut().push_back(reply);
            service
        }

        fn requests(&self) -> Vec<AskRequest> {
            self.requests.borrow().clone()
        }
    }

    impl AnswerService for ScriptedService {
        fn ask(&self, request: AskRequest) -> ExchangeFuture<'_> {
            self.requests.borrow_mut().push(request);
            let reply = self
                .replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(ExchangeError::WorkerLost { stage: "script-exhausted" }));
            Box::pin(async move { reply })
        }
    }

    /// Holds the reply until the test releases it.
    struct GatedService {
        gate: RefCell<Option<oneshot::Receiver<ExchangeResult<ExchangeReply>>>>,
        calls: RefCell<usize>,
    }

    impl GatedService {
        fn new(gate: oneshot::Receiver<ExchangeResult<ExchangeReply>>) -> Self {
            Self {
                gate: RefCell::new(Some(gate)),
                calls: RefCell::new(0),
            }
        }
    }

    impl AnswerService for GatedService {
        fn ask(&self, _request: AskRequest) -> ExchangeFuture<'_> {
            *self.calls.borrow_mut() += 1;
            let gate = self.gate.borrow_mut().take();
            Box::pin(async move {
                match gate {
                    Some(gate) => gate
                        .await
                        .unwrap_or(Err(ExchangeError::WorkerLost { stage: "gate-dropped" })),
                    None => Err(ExchangeError::WorkerLost { stage: "gate-reused" }),
                }
            })
        }
    }

    struct PendingService;

    impl AnswerService for PendingService {
        fn ask(&self, _request: AskRequest) -> ExchangeFuture<'_> {
            Box::pin(futures::future::pending())
        }
    }

    fn session_with(service: Rc<dyn AnswerService>) -> (ConversationSession, Rc<Recorder>) {
        let recorder = Rc::new(Recorder::default());
        let session = ConversationSession::new(service, recorder.clone());
        (session, recorder)
    }

    fn ok(status: u16, body: &str) -> ExchangeResult<ExchangeReply> {
        Ok(ExchangeReply::new(status, body))
    }

    fn message_texts(session: &ConversationSession) -> Vec<(Role, String)> {
        session
            .transcript()
            .messages()
            .map(|message| (message.role, message.text.clone()))
            .collect()
    }

    fn typing_entries(session: &ConversationSession) -> usize {
        session
            .transcript()
            .entries()
            .filter(|(_, entry)| entry.is_typing())
            .count()
    }

    #[test]
    fn plain_question_gets_answer() {
        let service = Rc::new(ScriptedService::replying(ok(200, r#"{"answer":"It's a lease."}"#)));
        let (session, recorder) = session_with(service.clone());

        let outcome = block_on(session.request_send("What is this document about?"));

        assert_eq!(outcome, Some(SendOutcome::Answered));
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(
            message_texts(&session),
            [
                (Role::User, "What is this document about?".to_string()),
                (Role::Bot, "It's a lease.".to_string()),
            ]
        );
        assert_eq!(typing_entries(&session), 0);
        assert_eq!(service.requests().len(), 1);
        assert!(service.requests()[0].attachment.is_none());

        let events = recorder.events();
        assert_eq!(events.first(), Some(&SessionEvent::PhaseChanged(Phase::Sending)));
        assert_eq!(events.last(), Some(&SessionEvent::PhaseChanged(Phase::Idle)));
        assert!(events.contains(&SessionEvent::InputCleared));
        assert!(events.contains(&SessionEvent::Feedback(Feedback::Success)));
    }

    #[test]
    fn attached_file_travels_once_and_transaction_renders() {
        let service = Rc::new(ScriptedService::replying(ok(
            200,
            r#"{"answer":"Deposit is refundable.","transaction_type":"lease","urls_processed":2}"#,
        )));
        let (session, _) = session_with(service.clone());
        session.stage_file(Some(FileRef::new("terms.pdf", b"%PDF-1.7".to_vec())));
        assert_eq!(session.staged_file_name().as_deref(), Some("terms.pdf"));

        let outcome = block_on(session.request_send("Is the deposit refundable?"));
        assert_eq!(outcome, Some(SendOutcome::Answered));
        assert_eq!(session.staged_file_name(), None);

        let requests = service.requests();
        let attachment = requests[0].attachment.as_ref().expect("file was sent");
        assert_eq!(attachment.name, "terms.pdf");
        assert_eq!(attachment.blob, b"%PDF-1.7");

        let transcript = session.transcript();
        let messages = transcript.messages().collect::<Vec<_>>();
        assert_eq!(messages[0].attachment.as_deref(), Some("terms.pdf"));

        let RenderedEntry::Message(bot) = render_entry(&Entry::Message(messages[1].clone())) else {
            panic!("bot entry renders as a message");
        };
        let transaction = bot.transaction.expect("transaction block");
        assert_eq!(transaction.heading, "Transaction Type: Lease");
        assert!(transaction.details.contains(&"Processed 2 website(s)".to_string()));
    }

    #[test]
    fn server_failure_uses_reported_answer() {
        let service = Rc::new(ScriptedService::replying(ok(
            500,
            r#"{"answer":"Service unavailable"}"#,
        )));
        let (session, recorder) = session_with(service);

        let outcome = block_on(session.request_send("Any refunds?"));

        assert_eq!(outcome, Some(SendOutcome::ServerFailure));
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(
            message_texts(&session).last(),
            Some(&(Role::Bot, "Service unavailable".to_string()))
        );
        let events = recorder.events();
        assert!(events.contains(&SessionEvent::Feedback(Feedback::Error)));
        assert_eq!(events.last(), Some(&SessionEvent::PhaseChanged(Phase::Idle)));
    }

    #[test]
    fn server_failure_without_answer_uses_fallback() {
        let service = Rc::new(ScriptedService::replying(ok(400, r#"{"answer":""}"#)));
        let (session, _) = session_with(service);

        let outcome = block_on(session.request_send("?"));

        assert_eq!(outcome, Some(SendOutcome::ServerFailure));
        assert_eq!(
            message_texts(&session).last(),
            Some(&(Role::Bot, GENERIC_FAILURE_TEXT.to_string()))
        );
    }

    #[test]
    fn transport_failure_renders_network_error() {
        let service = Rc::new(ScriptedService::replying(Err(ExchangeError::Transport {
            stage: "send-chat-request",
            message: "connection refused".to_string(),
        })));
        let (session, recorder) = session_with(service);

        let outcome = block_on(session.request_send("Hello?"));

        assert_eq!(outcome, Some(SendOutcome::TransportFailure));
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(typing_entries(&session), 0);
        assert_eq!(
            message_texts(&session).last(),
            Some(&(Role::Bot, NETWORK_ERROR_TEXT.to_string()))
        );
        assert!(recorder
            .events()
            .contains(&SessionEvent::Feedback(Feedback::Error)));
    }

    #[test]
    fn unreadable_bodies_are_protocol_failures() {
        for (status, body) in [(200, "<html>oops</html>"), (200, r#"{"transaction_type":"lease"}"#), (502, "Bad Gateway")] {
            let service = Rc::new(ScriptedService::replying(ok(status, body)));
            let (session, _) = session_with(service);

            let outcome = block_on(session.request_send("question"));

            assert_eq!(outcome, Some(SendOutcome::ProtocolFailure), "status {status}");
            assert_eq!(
                message_texts(&session).last(),
                Some(&(Role::Bot, NETWORK_ERROR_TEXT.to_string()))
            );
            assert_eq!(session.phase(), Phase::Idle);
        }
    }

    #[test]
    fn both_count_keys_still_yield_the_answer() {
        let service = Rc::new(ScriptedService::replying(ok(
            200,
            r#"{"answer":"Refunds take 30 days.","transaction_type":"refunds","relevant_sentences_count":3,"sentences_count":3}"#,
        )));
        let (session, recorder) = session_with(service);

        let outcome = block_on(session.request_send("How long do refunds take?"));

        assert_eq!(outcome, Some(SendOutcome::Answered));
        assert_eq!(
            message_texts(&session).last(),
            Some(&(Role::Bot, "Refunds take 30 days.".to_string()))
        );
        let transcript = session.transcript();
        let bot = transcript.messages().last().expect("bot message");
        let info = bot.transaction().expect("transaction info");
        assert_eq!(info.relevant_sentences_count, Some(3));
        drop(transcript);
        assert!(recorder
            .events()
            .contains(&SessionEvent::Feedback(Feedback::Success)));
    }

    #[test]
    fn misshapen_display_fields_do_not_discard_the_answer() {
        let service = Rc::new(ScriptedService::replying(ok(
            200,
            r#"{"answer":"It's a lease.","transaction_type":"lease","confidence":"high","source":{"kind":"db"}}"#,
        )));
        let (session, _) = session_with(service);

        let outcome = block_on(session.request_send("What is this?"));

        assert_eq!(outcome, Some(SendOutcome::Answered));
        let transcript = session.transcript();
        let bot = transcript.messages().last().expect("bot message");
        assert_eq!(bot.text, "It's a lease.");
        let info = bot.transaction().expect("transaction info");
        assert_eq!(info.confidence, None);
        assert_eq!(info.source, None);
    }

    #[test]
    fn server_failure_with_non_text_answer_uses_fallback() {
        let service = Rc::new(ScriptedService::replying(ok(500, r#"{"answer":["oops"]}"#)));
        let (session, _) = session_with(service);

        let outcome = block_on(session.request_send("Any refunds?"));

        assert_eq!(outcome, Some(SendOutcome::ServerFailure));
        assert_eq!(
            message_texts(&session).last(),
            Some(&(Role::Bot, GENERIC_FAILURE_TEXT.to_string()))
        );
    }

    #[test]
    fn busy_transcript_defers_placeholder_removal_to_drop() {
        let (session, recorder) = session_with(Rc::new(ScriptedService::default()));
        let placeholder = session
            .transcript
            .borrow_mut()
            .append_placeholder()
            .expect("placeholder");
        session.state.borrow_mut().phase = Phase::Sending;

        let mut lease = SendLease {
            exchange_id: ExchangeId::new(1),
            state: Rc::clone(&session.state),
            transcript: Rc::clone(&session.transcript),
            observer: recorder.clone(),
            placeholder: Some(placeholder),
        };

        {
            let _reader = session.transcript();
            lease.clear_placeholder();
        }
        assert_eq!(lease.placeholder, Some(placeholder));
        assert_eq!(session.transcript().placeholder(), Some(placeholder));
        assert!(recorder.events().is_empty());

        drop(lease);
        assert_eq!(session.transcript().placeholder(), None);
        assert_eq!(typing_entries(&session), 0);
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(
            recorder.events(),
            [
                SessionEvent::TranscriptChanged,
                SessionEvent::PhaseChanged(Phase::Idle),
            ]
        );
    }

    #[test]
    fn blank_question_is_ignored() {
        let service = Rc::new(ScriptedService::default());
        let (session, recorder) = session_with(service.clone());
        session.stage_file(Some(FileRef::new("terms.pdf", Vec::new())));
        let staged_events = recorder.events().len();

        assert_eq!(block_on(session.request_send("   \n\t")), None);
        assert_eq!(block_on(session.request_send("")), None);

        assert!(session.transcript().is_empty());
        assert!(session.transcript().welcome_visible());
        assert!(service.requests().is_empty());
        assert_eq!(recorder.events().len(), staged_events);
        assert_eq!(session.staged_file_name().as_deref(), Some("terms.pdf"));
    }

    #[test]
    fn question_is_trimmed_before_sending() {
        let service = Rc::new(ScriptedService::replying(ok(200, r#"{"answer":"yes"}"#)));
        let (session, _) = session_with(service.clone());

        block_on(session.request_send("  refunds?  \n"));

        assert_eq!(service.requests()[0].question, "refunds?");
        assert_eq!(message_texts(&session)[0].1, "refunds?");
    }

    #[test]
    fn only_first_of_rapid_sends_takes_effect() {
        let (release, gate) = oneshot::channel();
        let service = Rc::new(GatedService::new(gate));
        let (session, _) = session_with(service.clone());

        let (first, second, third, ()) = block_on(async {
            futures::join!(
                session.request_send("first"),
                session.request_send("second"),
                session.request_send("third"),
                async {
                    assert_eq!(session.phase(), Phase::Sending);
                    assert_eq!(typing_entries(&session), 1);
                    let _ = release.send(ok(200, r#"{"answer":"done"}"#));
                }
            )
        });

        assert_eq!(first, Some(SendOutcome::Answered));
        assert_eq!(second, None);
        assert_eq!(third, None);
        assert_eq!(*service.calls.borrow(), 1);
        assert_eq!(
            message_texts(&session),
            [
                (Role::User, "first".to_string()),
                (Role::Bot, "done".to_string()),
            ]
        );
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn file_staged_mid_flight_waits_for_next_send() {
        let (release, gate) = oneshot::channel();
        let service = Rc::new(GatedService::new(gate));
        let (session, _) = session_with(service);
        session.stage_file(Some(FileRef::new("first.pdf", Vec::new())));

        block_on(async {
            futures::join!(session.request_send("question"), async {
                assert_eq!(session.staged_file_name(), None);
                session.stage_file(Some(FileRef::new("second.xlsx", Vec::new())));
                let _ = release.send(ok(200, r#"{"answer":"ok"}"#));
            })
        });

        let transcript = session.transcript();
        let user = transcript.messages().next().expect("user message");
        assert_eq!(user.attachment.as_deref(), Some("first.pdf"));
        drop(transcript);
        assert_eq!(session.staged_file_name().as_deref(), Some("second.xlsx"));
    }

    #[test]
    fn staged_file_is_consumed_even_on_failure() {
        let service = Rc::new(ScriptedService::replying(Err(ExchangeError::WorkerLost {
            stage: "test",
        })));
        let (session, recorder) = session_with(service);
        session.stage_file(Some(FileRef::new("ledger.xls", vec![1, 2, 3])));

        block_on(session.request_send("Summarize"));

        assert_eq!(session.staged_file_name(), None);
        assert!(recorder
            .events()
            .contains(&SessionEvent::StagedFileChanged(None)));
    }

    #[test]
    fn stage_file_replaces_and_clears() {
        let (session, recorder) = session_with(Rc::new(ScriptedService::default()));

        session.stage_file(Some(FileRef::new("a.txt", Vec::new())));
        session.stage_file(Some(FileRef::new("b.txt", Vec::new())));
        assert_eq!(session.staged_file_name().as_deref(), Some("b.txt"));

        session.stage_file(None);
        assert_eq!(session.staged_file_name(), None);
        assert!(session.transcript().is_empty());
        assert_eq!(
            recorder.events(),
            [
                SessionEvent::StagedFileChanged(Some("a.txt".to_string())),
                SessionEvent::StagedFileChanged(Some("b.txt".to_string())),
                SessionEvent::StagedFileChanged(None),
            ]
        );
    }

    #[test]
    fn dropping_an_in_flight_send_still_unlocks() {
        let (session, recorder) = session_with(Rc::new(PendingService));

        assert!(session.request_send("never answered").now_or_never().is_none());

        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(typing_entries(&session), 0);
        assert_eq!(session.transcript().placeholder(), None);
        assert_eq!(
            message_texts(&session),
            [(Role::User, "never answered".to_string())]
        );
        assert_eq!(recorder.events().last(), Some(&SessionEvent::PhaseChanged(Phase::Idle)));
    }

    #[test]
    fn placeholder_is_removed_exactly_once_per_outcome() {
        let scripts = [
            ok(200, r#"{"answer":"fine"}"#),
            ok(503, r#"{"answer":"busy"}"#),
            Err(ExchangeError::Transport {
                stage: "test",
                message: "reset".to_string(),
            }),
        ];

        for reply in scripts {
            let (session, recorder) = session_with(Rc::new(ScriptedService::replying(reply)));

            block_on(session.request_send("question"));

            // One change for user+placeholder, one for removal, one for the bot entry.
            let changes = recorder
                .events()
                .iter()
                .filter(|event| **event == SessionEvent::TranscriptChanged)
                .count();
            assert_eq!(changes, 3);
            assert_eq!(typing_entries(&session), 0);
            assert_eq!(session.transcript().len(), 2);
            assert_eq!(session.phase(), Phase::Idle);
        }
    }

    #[test]
    fn sends_after_settling_are_accepted_again() {
        let service = Rc::new(ScriptedService::default());
        service
            .replies
            .borrow_mut()
            .extend([ok(200, r#"{"answer":"one"}"#), ok(200, r#"{"answer":"two"}"#)]);
        let (session, _) = session_with(service.clone());

        block_on(session.request_send("first"));
        block_on(session.request_send("second"));

        let requests = service.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].exchange_id > requests[0].exchange_id);
        assert_eq!(session.transcript().len(), 4);
    }
}
