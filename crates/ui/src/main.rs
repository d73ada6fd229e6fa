use gpui::*;
use gpui_component::notification::NotificationList;
use gpui_component::{Root, ThemeRegistry};
use tracing_subscriber::EnvFilter;

use tally::app::{AttachFile, Quit, TallyShell, ToggleTheme, TokioRuntime, default_themes_path};
use tally::settings::{SettingsState, SettingsStore};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Application entry point.
///
/// Starts a tokio runtime for HTTP exchanges, then hands the main thread to
/// gpui. The runtime lives until the gpui run loop returns.
fn main() {
    init_tracing();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("tally-http")
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!(error = %error, "failed to start tokio runtime");
            std::process::exit(1);
        }
    };
    let runtime_handle = runtime.handle().clone();

    let app = Application::new().with_assets(gpui_component_assets::Assets);

    app.run(move |cx| {
        gpui_component::init(cx);
        cx.set_global(TokioRuntime(runtime_handle));

        let settings_store = SettingsStore::load();
        tracing::info!(path = ?settings_store.config_path(), "settings loaded");
        let settings_state = SettingsState::new(settings_store, cx);

        // A missing themes directory is fine; built-in themes are used instead.
        let watched_settings = settings_state.downgrade();
        if let Err(error) = ThemeRegistry::watch_dir(default_themes_path(), cx, move |cx| {
            if let Some(settings_state) = watched_settings.upgrade() {
                let settings = settings_state.read(cx).settings();
                settings.apply_theme(None, cx);
            }
        }) {
            tracing::warn!(error = %error, "failed to watch themes directory, using built-in themes");
        }
        settings_state.read(cx).settings().apply_theme(None, cx);

        cx.on_action(|_: &Quit, cx| {
            cx.quit();
        });

        cx.bind_keys([
            KeyBinding::new("cmd-q", Quit, None),
            KeyBinding::new("cmd-o", AttachFile, None),
            KeyBinding::new("cmd-shift-t", ToggleTheme, None),
        ]);

        cx.spawn(async move |cx| {
            cx.update(|cx| {
                let options = WindowOptions {
                    window_bounds: Some(WindowBounds::Windowed(Bounds::centered(
                        None,
                        size(px(960.), px(760.)),
                        cx,
                    ))),
                    titlebar: Some(TitlebarOptions {
                        appears_transparent: true,
                        traffic_light_position: Some(point(px(9.), px(9.))),
                        ..Default::default()
                    }),
                    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
                    window_decorations: Some(WindowDecorations::Client),
                    #[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
                    window_decorations: None,
                    ..Default::default()
                };

                // Root hosts the gpui-component overlay layers.
                cx.open_window(options, |window, cx| {
                    let notification_list = cx.new(|cx| NotificationList::new(window, cx));
                    let shell = cx.new(|cx| {
                        TallyShell::new(notification_list, settings_state, window, cx)
                    });
                    cx.new(|cx| Root::new(shell, window, cx))
                })
                .expect("failed to open main window");

                cx.activate(true);
            })
        })
        .detach();
    });

    drop(runtime);
}
