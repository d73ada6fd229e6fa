use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::rc::Rc;

use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{
    ActiveTheme, Icon, IconName, Sizable, h_flex, label::Label, v_flex, v_virtual_list,
};
use tally_conversation::{
    EntryId, RenderedEntry, RenderedMessage, RenderedTranscript, RenderedTransaction, Role,
};

use crate::chat::scroll_manager::ScrollManager;

const DEFAULT_CONTENT_WIDTH: Pixels = px(680.);
const LIST_HORIZONTAL_PADDING: Pixels = px(16.);
const CONTENT_WIDTH_CHANGE_EPSILON: f32 = 1.0;
const BUBBLE_MAX_WIDTH: Pixels = px(560.);
const BUBBLE_PADDING_X: Pixels = px(14.);
const BUBBLE_PADDING_Y: Pixels = px(10.);
const BUBBLE_LINE_GAP: Pixels = px(4.);
const META_ROW_HEIGHT: Pixels = px(16.);
const META_ROW_GAP: Pixels = px(4.);
const TYPING_ROW_HEIGHT: Pixels = px(36.);
const ESTIMATED_TEXT_LINE_HEIGHT: Pixels = px(18.);
const ESTIMATED_CHAR_WIDTH: f32 = 7.0;

pub const WELCOME_TITLE: &str = "Transaction Assistant";
pub const WELCOME_BODY: &str =
    "Ask a question about a transaction, or attach a document for the assistant to read.";

struct RowHeight {
    height: Pixels,
    measured: bool,
}

/// Virtualized transcript. Rows are immutable once appended, so a height only
/// changes when the available width does.
pub struct MessageList {
    rows: Vec<(EntryId, RenderedEntry)>,
    welcome_visible: bool,
    item_sizes: Rc<Vec<Size<Pixels>>>,
    heights: HashMap<EntryId, RowHeight>,
    scroll_manager: ScrollManager,
    content_width: Option<Pixels>,
}

impl MessageList {
    pub fn new(_cx: &mut Context<Self>) -> Self {
        Self {
            rows: Vec::new(),
            welcome_visible: true,
            item_sizes: Rc::new(Vec::new()),
            heights: HashMap::new(),
            scroll_manager: ScrollManager::new(),
            content_width: None,
        }
    }

    pub fn set_transcript(&mut self, transcript: RenderedTranscript, cx: &mut Context<Self>) {
        self.welcome_visible = transcript.welcome_visible;
        self.rows = transcript.rows;
        self.rebuild_item_sizes();
        cx.notify();
    }

    pub fn request_scroll_to_bottom(&mut self, cx: &mut Context<Self>) {
        self.scroll_manager.request_scroll_to_bottom();
        cx.notify();
    }

    fn update_content_width(&mut self, cx: &mut Context<Self>) {
        let list_width = self.scroll_manager.bounds().size.width;
        if list_width <= Pixels::ZERO {
            return;
        }

        let next_width = max_pixels(px(1.), list_width - LIST_HORIZONTAL_PADDING * 2);
        let width_changed = self.content_width.is_none_or(|current| {
            (f32::from(current) - f32::from(next_width)).abs() > CONTENT_WIDTH_CHANGE_EPSILON
        });

        if width_changed {
            self.content_width = Some(next_width);
            for row in self.heights.values_mut() {
                row.measured = false;
            }
            self.rebuild_item_sizes();
            cx.notify();
        }
    }

    fn rebuild_item_sizes(&mut self) {
        let content_width = self.content_width.unwrap_or(DEFAULT_CONTENT_WIDTH);
        let mut live = HashSet::with_capacity(self.rows.len());
        let mut sizes = Vec::with_capacity(self.rows.len());

        for (id, entry) in &self.rows {
            let row = self.heights.entry(*id).or_insert(RowHeight {
                height: estimate_row_height(entry, content_width),
                measured: false,
            });
            if !row.measured {
                row.height = estimate_row_height(entry, content_width);
            }

            sizes.push(size(px(0.), row.height));
            live.insert(*id);
        }

        // The typing row comes and goes; drop heights for anything removed.
        self.heights.retain(|id, _| live.contains(id));
        self.item_sizes = Rc::new(sizes);
    }

    fn measure_visible_rows(
        &mut self,
        visible_range: Range<usize>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        let content_width = self.content_width.unwrap_or(DEFAULT_CONTENT_WIDTH);
        let available_space = size(
            AvailableSpace::Definite(content_width),
            AvailableSpace::MinContent,
        );
        let mut updated = false;

        for index in visible_range {
            let Some((id, entry)) = self.rows.get(index).cloned() else {
                continue;
            };
            if self.heights.get(&id).is_some_and(|row| row.measured) {
                continue;
            }

            let mut element = self.render_row(&entry, cx);
            let measured = element.layout_as_root(available_space, window, cx).height;
            let row = self.heights.entry(id).or_insert(RowHeight {
                height: measured,
                measured: true,
            });
            if (f32::from(row.height) - f32::from(measured)).abs() > 0.5 {
                updated = true;
            }
            row.height = measured;
            row.measured = true;
        }

        if updated {
            self.rebuild_item_sizes();
            if self.scroll_manager.is_pinned_to_bottom() {
                self.scroll_manager.request_scroll_to_bottom();
            }
            cx.notify();
        }
    }

    fn render_row(&self, entry: &RenderedEntry, cx: &Context<Self>) -> AnyElement {
        match entry {
            RenderedEntry::Message(message) => self.render_message(message, cx),
            RenderedEntry::Typing => self.render_typing(cx),
        }
    }

    fn render_message(&self, message: &RenderedMessage, cx: &Context<Self>) -> AnyElement {
        let theme = cx.theme();
        let is_user = message.role == Role::User;
        let (bubble_bg, bubble_fg) = if is_user {
            (theme.accent, theme.accent_foreground)
        } else {
            (theme.muted, theme.foreground)
        };

        let bubble = v_flex()
            .max_w(BUBBLE_MAX_WIDTH)
            .px(BUBBLE_PADDING_X)
            .py(BUBBLE_PADDING_Y)
            .gap(BUBBLE_LINE_GAP)
            .rounded_lg()
            .bg(bubble_bg)
            .text_color(bubble_fg)
            .when_some(message.attachment.clone(), |bubble, name| {
                bubble.child(
                    h_flex()
                        .gap_1()
                        .items_center()
                        .child(Icon::new(IconName::File).size(px(12.)))
                        .child(Label::new(name).text_xs()),
                )
            })
            .when_some(message.transaction.clone(), |bubble, transaction| {
                bubble.child(self.render_transaction(transaction, cx))
            })
            .children(
                message
                    .body
                    .iter()
                    .map(|line| Label::new(display_line(line)).text_sm()),
            );

        let meta = Label::new(format!("{} · {}", message.speaker, message.time))
            .text_xs()
            .text_color(theme.muted_foreground);

        v_flex()
            .w_full()
            .gap(META_ROW_GAP)
            .map(|column| {
                if is_user {
                    column.items_end()
                } else {
                    column.items_start()
                }
            })
            .child(bubble)
            .child(meta)
            .into_any_element()
    }

    fn render_transaction(
        &self,
        transaction: RenderedTransaction,
        cx: &Context<Self>,
    ) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .gap_1()
            .pb_1()
            .mb_1()
            .border_b_1()
            .border_color(theme.border)
            .child(
                Label::new(transaction.heading)
                    .text_xs()
                    .font_semibold()
                    .text_color(theme.primary),
            )
            .children(transaction.details.into_iter().map(|line| {
                Label::new(line)
                    .text_xs()
                    .text_color(theme.muted_foreground)
            }))
    }

    fn render_typing(&self, cx: &Context<Self>) -> AnyElement {
        let theme = cx.theme();

        h_flex()
            .w_full()
            .h(TYPING_ROW_HEIGHT)
            .gap_2()
            .items_center()
            .children((0..3).map(|_| div().size(px(6.)).rounded_full().bg(theme.primary)))
            .child(
                Label::new("AI Assistant is typing")
                    .text_xs()
                    .text_color(theme.muted_foreground),
            )
            .into_any_element()
    }

    fn render_welcome(&self, cx: &Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .id("welcome-banner")
            .size_full()
            .items_center()
            .justify_center()
            .gap_2()
            .px_4()
            .child(Label::new(WELCOME_TITLE).text_lg().font_semibold())
            .child(
                Label::new(WELCOME_BODY)
                    .text_sm()
                    .text_color(theme.muted_foreground),
            )
    }
}

impl Render for MessageList {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        if self.welcome_visible {
            return v_flex()
                .size_full()
                .min_h_0()
                .child(self.render_welcome(cx));
        }

        self.update_content_width(cx);
        self.scroll_manager.apply_pending_scroll();

        v_flex().size_full().min_h_0().child(
            v_virtual_list(
                cx.entity().clone(),
                "message-list",
                self.item_sizes.clone(),
                |this, visible_range, window, cx| {
                    this.update_content_width(cx);
                    this.measure_visible_rows(visible_range.clone(), window, cx);
                    visible_range
                        .filter_map(|index| {
                            this.rows
                                .get(index)
                                .map(|(_, entry)| entry.clone())
                                .map(|entry| this.render_row(&entry, cx))
                        })
                        .collect::<Vec<_>>()
                },
            )
            .size_full()
            .px_4()
            .py_3()
            .gap_4()
            .track_scroll(self.scroll_manager.handle()),
        )
    }
}

// Empty lines collapse to nothing in a label; keep them as visible spacing.
fn display_line(line: &str) -> SharedString {
    if line.is_empty() {
        SharedString::from(" ")
    } else {
        SharedString::from(line.to_string())
    }
}

fn estimate_row_height(entry: &RenderedEntry, content_width: Pixels) -> Pixels {
    let RenderedEntry::Message(message) = entry else {
        return TYPING_ROW_HEIGHT;
    };

    let bubble_width = min_pixels(content_width, BUBBLE_MAX_WIDTH);
    let text_width = max_pixels(px(1.), bubble_width - BUBBLE_PADDING_X * 2);

    let mut lines = message
        .body
        .iter()
        .map(|line| wrapped_line_count(line, text_width))
        .sum::<usize>();
    if message.attachment.is_some() {
        lines += 1;
    }
    if let Some(transaction) = &message.transaction {
        lines += 1 + transaction.details.len();
    }

    let lines = lines.max(1);
    let gaps = BUBBLE_LINE_GAP * lines.saturating_sub(1);
    ESTIMATED_TEXT_LINE_HEIGHT * lines + gaps + BUBBLE_PADDING_Y * 2 + META_ROW_GAP + META_ROW_HEIGHT
}

fn wrapped_line_count(line: &str, width: Pixels) -> usize {
    let chars_per_line = (f32::from(width) / ESTIMATED_CHAR_WIDTH).floor().max(1.0) as usize;
    line.chars().count().max(1).div_ceil(chars_per_line)
}

fn max_pixels(a: Pixels, b: Pixels) -> Pixels {
    if f32::from(a) >= f32::from(b) { a } else { b }
}

fn min_pixels(a: Pixels, b: Pixels) -> Pixels {
    if f32::from(a) <= f32::from(b) { a } else { b }
}

#[cfg(test)]
mod tests {
    use tally_conversation::{Message, TransactionInfo, render_message};

    use super::*;

    fn rendered(message: Message) -> RenderedEntry {
        RenderedEntry::Message(render_message(&message))
    }

    #[test]
    fn typing_row_has_fixed_height() {
        assert_eq!(
            estimate_row_height(&RenderedEntry::Typing, px(680.)),
            TYPING_ROW_HEIGHT
        );
    }

    #[test]
    fn multi_line_answers_are_taller() {
        let single = estimate_row_height(&rendered(Message::bot("one line")), px(680.));
        let triple = estimate_row_height(&rendered(Message::bot("one\ntwo\nthree")), px(680.));
        assert!(triple > single);
    }

    #[test]
    fn transaction_details_add_height() {
        let plain = estimate_row_height(&rendered(Message::bot("answer")), px(680.));
        let annotated = estimate_row_height(
            &rendered(Message::bot_with_transaction(
                "answer",
                TransactionInfo::new("lease").with_urls_processed(2),
            )),
            px(680.),
        );
        assert!(annotated > plain);
    }

    #[test]
    fn narrow_width_wraps_long_questions() {
        let question = Message::user("x".repeat(400), None);
        let wide = estimate_row_height(&rendered(question.clone()), px(680.));
        let narrow = estimate_row_height(&rendered(question), px(200.));
        assert!(narrow > wide);
    }
}
