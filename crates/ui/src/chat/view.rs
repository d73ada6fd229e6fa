use std::rc::Rc;
use std::time::Duration;

use gpui::*;
use gpui_component::notification::{Notification, NotificationList};
use gpui_component::{ActiveTheme, v_flex};
use tally_conversation::{
    AnswerService, ConversationSession, Feedback, FileRef, SessionEvent, render_transcript,
};
use tokio::sync::mpsc;

use crate::chat::events::{ClearAttachment, PickAttachment, Submit};
use crate::chat::{MessageInput, MessageList};

/// How long the send button keeps its success/error color.
pub const FEEDBACK_REVERT_MS: u64 = 1000;

/// Binds one [`ConversationSession`] to the transcript list and the input.
///
/// Session events arrive over a channel and are applied on the window's
/// foreground executor, so every widget update sees a consistent session.
pub struct ChatView {
    session: ConversationSession,
    message_list: Entity<MessageList>,
    message_input: Entity<MessageInput>,
    notification_list: Entity<NotificationList>,
    _event_pump: Task<()>,
    feedback_task: Option<Task<()>>,
}

impl ChatView {
    pub fn new(
        service: Rc<dyn AnswerService>,
        notification_list: Entity<NotificationList>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let message_list = cx.new(MessageList::new);
        let message_input = cx.new(|cx| MessageInput::new(window, cx));

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let session = ConversationSession::new(service, Rc::new(event_tx));
        let event_pump = Self::spawn_event_pump(event_rx, window, cx);

        cx.subscribe(&message_input, |this, _, event: &Submit, cx| {
            this.handle_submit(event, cx);
        })
        .detach();

        cx.subscribe_in(
            &message_input,
            window,
            |this, _, _event: &PickAttachment, window, cx| {
                this.pick_attachment(window, cx);
            },
        )
        .detach();

        cx.subscribe(&message_input, |this, _, _event: &ClearAttachment, _cx| {
            this.session.stage_file(None);
        })
        .detach();

        message_input.update(cx, |input, cx| input.focus(window, cx));

        Self {
            session,
            message_list,
            message_input,
            notification_list,
            _event_pump: event_pump,
            feedback_task: None,
        }
    }

    fn spawn_event_pump(
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Task<()> {
        cx.spawn_in(window, async move |this, cx| {
            while let Some(event) = events.recv().await {
                let applied = this.update_in(cx, |this, window, cx| {
                    this.handle_session_event(event, window, cx);
                });
                if applied.is_err() {
                    break;
                }
            }
            tracing::debug!("session event pump stopped");
        })
    }

    fn handle_session_event(
        &mut self,
        event: SessionEvent,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        tracing::trace!(?event, "applying session event");
        match event {
            SessionEvent::PhaseChanged(phase) => {
                self.message_input
                    .update(cx, |input, cx| input.set_sending(phase.is_sending(), cx));
            }
            SessionEvent::StagedFileChanged(name) => {
                self.message_input
                    .update(cx, |input, cx| input.set_staged_file(name, cx));
            }
            SessionEvent::InputCleared => {
                self.message_input
                    .update(cx, |input, cx| input.clear(window, cx));
            }
            SessionEvent::TranscriptChanged => self.sync_transcript(cx),
            SessionEvent::Feedback(feedback) => self.show_feedback(feedback, cx),
        }
    }

    fn handle_submit(&mut self, event: &Submit, cx: &mut Context<Self>) {
        let session = self.session.clone();
        let question = event.question.clone();

        // Detached: dropping an accepted send would abandon the exchange.
        cx.spawn(async move |_, _| {
            if let Some(outcome) = session.request_send(&question).await {
                tracing::debug!(?outcome, "send finished");
            }
        })
        .detach();
    }

    pub fn pick_attachment(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        let picked = cx.prompt_for_paths(PathPromptOptions {
            files: true,
            directories: false,
            multiple: false,
            prompt: Some("Attach".into()),
        });

        cx.spawn_in(window, async move |this, cx| {
            let path = match picked.await {
                Ok(Ok(Some(mut paths))) => match paths.pop() {
                    Some(path) => path,
                    None => return,
                },
                Ok(Ok(None)) | Err(_) => return,
                Ok(Err(error)) => {
                    tracing::warn!(error = %error, "file picker failed");
                    return;
                }
            };

            let loaded = cx
                .background_spawn(async move { FileRef::load(&path) })
                .await;

            let _ = this.update_in(cx, |this, window, cx| match loaded {
                Ok(file) => this.session.stage_file(Some(file)),
                Err(error) => {
                    tracing::warn!(error = %error, "attachment rejected");
                    this.notify_error(error.to_string(), window, cx);
                }
            });
        })
        .detach();
    }

    pub fn notify_error(&mut self, message: String, window: &mut Window, cx: &mut Context<Self>) {
        self.notification_list.update(cx, |list, cx| {
            list.push(Notification::error(message), window, cx);
        });
    }

    fn sync_transcript(&mut self, cx: &mut Context<Self>) {
        let rendered = render_transcript(&self.session.transcript());
        let scroll = self.session.take_scroll_request();

        self.message_list.update(cx, |list, cx| {
            list.set_transcript(rendered, cx);
            if scroll {
                list.request_scroll_to_bottom(cx);
            }
        });
    }

    fn show_feedback(&mut self, feedback: Feedback, cx: &mut Context<Self>) {
        self.message_input
            .update(cx, |input, cx| input.set_feedback(Some(feedback), cx));

        // Replacing the task cancels any earlier revert timer.
        self.feedback_task = Some(cx.spawn(async move |this, cx| {
            cx.background_executor()
                .timer(Duration::from_millis(FEEDBACK_REVERT_MS))
                .await;

            let _ = this.update(cx, |this, cx| {
                this.message_input
                    .update(cx, |input, cx| input.set_feedback(None, cx));
                this.feedback_task = None;
            });
        }));
    }
}

impl Render for ChatView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .id("chat-view")
            .relative()
            .size_full()
            .min_h_0()
            .overflow_hidden()
            .bg(theme.background)
            .child(
                div()
                    .id("chat-view-message-list")
                    .flex_1()
                    .min_h_0()
                    .child(self.message_list.clone()),
            )
            .child(
                div()
                    .id("chat-view-message-input")
                    .flex_shrink_0()
                    .w_full()
                    .border_t_1()
                    .border_color(theme.border)
                    .child(self.message_input.clone()),
            )
    }
}
