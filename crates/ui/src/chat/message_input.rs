use gpui::prelude::FluentBuilder;
use gpui::*;
use gpui_component::{
    ActiveTheme, Icon, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    input::{Input, InputEvent, InputState},
    label::Label,
    v_flex,
};
use tally_conversation::{Feedback, SUPPORTED_EXTENSIONS};

use crate::chat::events::{ClearAttachment, PickAttachment, Submit};

pub struct MessageInput {
    input_state: Entity<InputState>,
    is_sending: bool,
    staged_file: Option<SharedString>,
    feedback: Option<Feedback>,
    pending_newline: bool,
}

impl EventEmitter<Submit> for MessageInput {}
impl EventEmitter<PickAttachment> for MessageInput {}
impl EventEmitter<ClearAttachment> for MessageInput {}

impl MessageInput {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let input_state = cx.new(|cx| {
            InputState::new(window, cx)
                .placeholder("Ask about a transaction...")
                .auto_grow(1, 8)
        });

        cx.subscribe_in(
            &input_state,
            window,
            |this, _, event: &InputEvent, window, cx| {
                if let InputEvent::PressEnter { secondary } = event {
                    if *secondary {
                        this.pending_newline = false;
                        return;
                    }

                    if this.pending_newline {
                        // Shift+Enter already inserted the newline; swallow the enter that follows.
                        this.pending_newline = false;
                    } else {
                        this.trim_trailing_newline(window, cx);
                        this.handle_submit(cx);
                    }
                }
            },
        )
        .detach();

        Self {
            input_state,
            is_sending: false,
            staged_file: None,
            feedback: None,
            pending_newline: false,
        }
    }

    pub fn set_sending(&mut self, sending: bool, cx: &mut Context<Self>) {
        self.is_sending = sending;
        if !sending {
            self.pending_newline = false;
        }
        cx.notify();
    }

    pub fn set_staged_file(&mut self, name: Option<String>, cx: &mut Context<Self>) {
        self.staged_file = name.map(SharedString::from);
        cx.notify();
    }

    pub fn set_feedback(&mut self, feedback: Option<Feedback>, cx: &mut Context<Self>) {
        self.feedback = feedback;
        cx.notify();
    }

    pub fn clear(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.input_state.update(cx, |state, cx| {
            state.set_value("", window, cx);
        });
        self.pending_newline = false;
    }

    pub fn focus(&self, window: &mut Window, cx: &mut Context<Self>) {
        self.input_state.update(cx, |state, cx| state.focus(window, cx));
    }

    fn handle_shift_enter(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        if self.is_sending {
            return;
        }

        self.pending_newline = true;
        self.input_state.update(cx, |state, cx| {
            state.insert("\n", window, cx);
        });
        cx.notify();
    }

    fn trim_trailing_newline(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.input_state.update(cx, |state, cx| {
            let value = state.value().to_string();
            if let Some(trimmed) = value.strip_suffix('\n') {
                state.set_value(trimmed.to_string(), window, cx);
            }
        });
    }

    // The session decides whether the send is accepted and asks for the
    // input to be cleared only then.
    fn handle_submit(&mut self, cx: &mut Context<Self>) {
        if self.is_sending {
            return;
        }

        let question = self.input_state.read(cx).value().to_string();
        cx.emit(Submit::new(question));
    }

    fn render_staged_file(&self, name: SharedString, cx: &Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        h_flex()
            .id("staged-file")
            .gap_2()
            .px_2()
            .py_1()
            .rounded_md()
            .border_1()
            .border_color(theme.border)
            .bg(theme.muted)
            .items_center()
            .child(
                Icon::new(IconName::File)
                    .size(px(14.))
                    .text_color(theme.muted_foreground),
            )
            .child(Label::new(name).text_xs())
            .child(
                Button::new("clear-staged-file")
                    .ghost()
                    .xsmall()
                    .icon(IconName::Close)
                    .on_click(cx.listener(|_, _, _window, cx| {
                        cx.emit(ClearAttachment);
                    })),
            )
    }

    fn render_send_button(&self, cx: &Context<Self>) -> Button {
        let button = Button::new("send")
            .small()
            .icon(IconName::ArrowUp)
            .child("Send")
            .disabled(self.is_sending)
            .loading(self.is_sending)
            .on_click(cx.listener(|this, _, _window, cx| {
                this.handle_submit(cx);
            }));

        match self.feedback {
            Some(Feedback::Success) => button.success(),
            Some(Feedback::Error) => button.danger(),
            None => button.primary(),
        }
    }
}

impl Render for MessageInput {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let is_sending = self.is_sending;
        let accepted = SUPPORTED_EXTENSIONS.join(", ");

        v_flex()
            .bg(theme.background)
            .gap_2()
            .p_3()
            .when_some(self.staged_file.clone(), |column, name| {
                column.child(h_flex().child(self.render_staged_file(name, cx)))
            })
            .child(
                div()
                    .w_full()
                    .px_3()
                    .py_2()
                    .rounded_lg()
                    .border_1()
                    .border_color(theme.border)
                    .bg(theme.background)
                    .on_key_down(cx.listener(|this, event: &KeyDownEvent, window, cx| {
                        if event.keystroke.key == "enter" && event.keystroke.modifiers.shift {
                            this.handle_shift_enter(window, cx);
                        }
                    }))
                    .child(Input::new(&self.input_state).w_full().disabled(is_sending)),
            )
            .child(
                h_flex()
                    .w_full()
                    .items_center()
                    .justify_between()
                    .child(
                        h_flex()
                            .gap_2()
                            .items_center()
                            .child(
                                Button::new("attach-file")
                                    .ghost()
                                    .small()
                                    .icon(IconName::Plus)
                                    .child("Attach")
                                    .on_click(cx.listener(|_, _, _window, cx| {
                                        cx.emit(PickAttachment);
                                    })),
                            )
                            .child(
                                Label::new(accepted)
                                    .text_xs()
                                    .text_color(theme.muted_foreground),
                            ),
                    )
                    .child(self.render_send_button(cx)),
            )
    }
}
