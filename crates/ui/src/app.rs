use std::path::PathBuf;
use std::rc::Rc;

use gpui::prelude::FluentBuilder;
use gpui::*;
use gpui_component::notification::{Notification, NotificationList};
use gpui_component::{
    ActiveTheme, IconName, Sizable, ThemeMode,
    button::{Button, ButtonVariants},
    h_flex,
    label::Label,
    v_flex,
};
use tally_client::{ClientConfig, HttpAnswerService};
use tally_conversation::{AnswerService, AskRequest, ExchangeError, ExchangeFuture};
use tokio::runtime::Handle;

use crate::chat::ChatView;
use crate::settings::{AppSettings, SettingsChanged, SettingsState};

/// Returns the default themes directory path.
pub fn default_themes_path() -> PathBuf {
    PathBuf::from("./themes")
}

#[cfg(target_os = "macos")]
const WINDOW_TOOLBAR_LEFT_SAFE_PADDING: f32 = 78.0;
#[cfg(not(target_os = "macos"))]
const WINDOW_TOOLBAR_LEFT_SAFE_PADDING: f32 = 16.0;
#[cfg(target_os = "windows")]
const WINDOW_TOOLBAR_RIGHT_SAFE_PADDING: f32 = 120.0;
#[cfg(not(target_os = "windows"))]
const WINDOW_TOOLBAR_RIGHT_SAFE_PADDING: f32 = 16.0;

pub const APP_TITLE: &str = "Transaction Assistant";

fn window_toolbar_height(window: &Window) -> Pixels {
    (1.75 * window.rem_size()).max(px(34.0))
}

gpui::actions!(tally, [AttachFile, ToggleTheme, Quit]);

/// Tokio runtime that HTTP exchanges are spawned onto.
pub struct TokioRuntime(pub Handle);

impl Global for TokioRuntime {}

/// Stand-in used when the configured endpoint cannot be turned into a client.
/// Every send settles as a transport failure carrying the reason.
struct UnavailableService {
    reason: String,
}

impl AnswerService for UnavailableService {
    fn ask(&self, request: AskRequest) -> ExchangeFuture<'_> {
        tracing::warn!(exchange = %request.exchange_id, reason = %self.reason, "answer service unavailable");
        let error = ExchangeError::Transport {
            stage: "answer-service-unavailable",
            message: self.reason.clone(),
        };
        Box::pin(async move { Err(error) })
    }
}

fn build_answer_service(
    config: &ClientConfig,
    runtime: Handle,
) -> (Rc<dyn AnswerService>, Option<String>) {
    match HttpAnswerService::new(config, runtime) {
        Ok(service) => (Rc::new(service), None),
        Err(error) => {
            tracing::error!(error = %error, endpoint = %config.base_url, "failed to configure answer service");
            let reason = error.to_string();
            (
                Rc::new(UnavailableService {
                    reason: reason.clone(),
                }),
                Some(reason),
            )
        }
    }
}

/// Main window layout: title bar over the single chat view, plus toasts.
pub struct TallyShell {
    notification_list: Entity<NotificationList>,
    settings_state: Entity<SettingsState>,
    chat_view: Entity<ChatView>,
    title_bar_should_move: bool,
}

impl TallyShell {
    pub fn new(
        notification_list: Entity<NotificationList>,
        settings_state: Entity<SettingsState>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let settings = settings_state.read(cx).settings();
        let runtime = cx.global::<TokioRuntime>().0.clone();
        let (service, service_error) = build_answer_service(&settings.client_config(), runtime);

        let chat_view = {
            let notification_list = notification_list.clone();
            cx.new(|cx| ChatView::new(service, notification_list, window, cx))
        };

        if let Some(reason) = service_error {
            notification_list.update(cx, |list, cx| {
                list.push(
                    Notification::error(format!("Answer service unavailable: {reason}")),
                    window,
                    cx,
                );
            });
        }

        cx.subscribe_in(
            &settings_state,
            window,
            |_, _, event: &SettingsChanged, window, cx| {
                event.settings.apply_theme(Some(window), cx);
                cx.refresh_windows();
            },
        )
        .detach();

        Self {
            notification_list,
            settings_state,
            chat_view,
            title_bar_should_move: false,
        }
    }

    fn attach_file(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.chat_view
            .update(cx, |chat_view, cx| chat_view.pick_attachment(window, cx));
    }

    fn toggle_theme(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        let current = self.settings_state.read(cx).settings();
        let next_mode = if current.theme_mode.is_dark() {
            ThemeMode::Light
        } else {
            ThemeMode::Dark
        };
        let next = AppSettings::clone(&current).with_theme_mode(next_mode);

        let saved = self
            .settings_state
            .update(cx, |state, cx| state.update_settings(next, cx));
        if let Err(error) = saved {
            tracing::warn!(error = %error, "failed to save theme preference");
            self.notification_list.update(cx, |list, cx| {
                list.push(
                    Notification::warning(format!("Theme not saved: {error}")),
                    window,
                    cx,
                );
            });
        }
    }
}

impl Render for TallyShell {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let toolbar_height = window_toolbar_height(window);

        div()
            .id("tally-shell")
            .size_full()
            .relative()
            .bg(theme.background)
            .on_action(cx.listener(|this, _: &AttachFile, window, cx| {
                this.attach_file(window, cx);
            }))
            .on_action(cx.listener(|this, _: &ToggleTheme, window, cx| {
                this.toggle_theme(window, cx);
            }))
            .child(
                v_flex().size_full().pt(toolbar_height).child(
                    div()
                        .id("main-content")
                        .flex_1()
                        .w_full()
                        .min_h_0()
                        .overflow_hidden()
                        .child(self.chat_view.clone()),
                ),
            )
            .child(
                div()
                    .absolute()
                    .top_0()
                    .left_0()
                    .right_0()
                    .child(self.render_top_bar(window, toolbar_height, cx)),
            )
            .child(self.notification_list.clone())
    }
}

impl TallyShell {
    fn render_top_bar(
        &self,
        window: &Window,
        toolbar_height: Pixels,
        cx: &Context<Self>,
    ) -> impl IntoElement {
        let theme = cx.theme();
        let settings = self.settings_state.read(cx).settings();
        let theme_icon = if settings.theme_mode.is_dark() {
            IconName::Sun
        } else {
            IconName::Moon
        };

        h_flex()
            .id("app-top-bar")
            .window_control_area(WindowControlArea::Drag)
            .on_mouse_down_out(cx.listener(|this, _, _window, _cx| {
                this.title_bar_should_move = false;
            }))
            .on_mouse_up(
                MouseButton::Left,
                cx.listener(|this, _, _window, _cx| {
                    this.title_bar_should_move = false;
                }),
            )
            .on_mouse_down(
                MouseButton::Left,
                cx.listener(|this, _, _window, _cx| {
                    this.title_bar_should_move = true;
                }),
            )
            .on_mouse_move(cx.listener(|this, _, window, _cx| {
                if this.title_bar_should_move {
                    this.title_bar_should_move = false;
                    window.start_window_move();
                }
            }))
            .w_full()
            .h(toolbar_height)
            .flex_shrink_0()
            .pl(px(WINDOW_TOOLBAR_LEFT_SAFE_PADDING))
            .pr(px(WINDOW_TOOLBAR_RIGHT_SAFE_PADDING))
            .items_center()
            .justify_between()
            .bg(theme.background)
            .border_b_1()
            .border_color(theme.border)
            .child(Label::new(APP_TITLE).text_sm().font_semibold())
            .child(
                h_flex()
                    .gap_2()
                    .items_center()
                    .child(
                        div()
                            .id("answer-endpoint")
                            .px_2()
                            .py_1()
                            .rounded_full()
                            .bg(theme.muted)
                            .border_1()
                            .border_color(theme.border)
                            .text_xs()
                            .text_color(theme.muted_foreground)
                            .child(settings.endpoint.clone()),
                    )
                    .child(
                        Button::new("toggle-theme")
                            .ghost()
                            .small()
                            .icon(theme_icon)
                            .on_click(cx.listener(|this, _, window, cx| {
                                this.toggle_theme(window, cx);
                            })),
                    )
                    .child(self.render_linux_window_controls(window, cx)),
            )
            .when(
                cfg!(target_os = "linux") && window.window_controls().window_menu,
                |title_bar| {
                    title_bar.on_mouse_down(MouseButton::Right, |event, window, _| {
                        window.show_window_menu(event.position);
                    })
                },
            )
    }

    fn render_linux_window_controls(&self, window: &Window, cx: &Context<Self>) -> AnyElement {
        #[cfg(target_os = "linux")]
        {
            let maximize_icon = if window.is_maximized() {
                IconName::WindowRestore
            } else {
                IconName::WindowMaximize
            };

            h_flex()
                .id("linux-window-controls")
                .items_center()
                // Keep clicks here out of the title bar drag and double-click handling.
                .on_mouse_down(MouseButton::Left, |_, _, cx| cx.stop_propagation())
                .on_mouse_down(MouseButton::Right, |_, _, cx| cx.stop_propagation())
                .gap_2()
                .ml_2()
                .child(
                    Button::new("linux-window-minimize")
                        .ghost()
                        .small()
                        .icon(IconName::WindowMinimize)
                        .on_click(cx.listener(|_, _, window, _| {
                            window.minimize_window();
                        })),
                )
                .child(
                    Button::new("linux-window-maximize")
                        .ghost()
                        .small()
                        .icon(maximize_icon)
                        .on_click(cx.listener(|_, _, window, _| {
                            window.zoom_window();
                        })),
                )
                .child(
                    Button::new("linux-window-close")
                        .ghost()
                        .small()
                        .icon(IconName::WindowClose)
                        .on_click(cx.listener(|_, _, window, _| {
                            window.remove_window();
                        })),
                )
                .into_any_element()
        }

        #[cfg(not(target_os = "linux"))]
        {
            let _ = (window, cx);
            div().into_any_element()
        }
    }
}
