use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use gpui::*;
use gpui_component::{Theme, ThemeMode, ThemeRegistry};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::{ResultExt, Snafu};
use tally_client::{ClientConfig, DEFAULT_BASE_URL};

pub const SETTINGS_DIRECTORY_NAME: &str = "tally";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Base URL of the answering service; `/chat` is appended per request.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(
        default = "default_theme_mode",
        serialize_with = "serialize_theme_mode",
        deserialize_with = "deserialize_theme_mode"
    )]
    pub theme_mode: ThemeMode,
    #[serde(default)]
    pub theme_name: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            theme_mode: default_theme_mode(),
            theme_name: String::new(),
        }
    }
}

impl AppSettings {
    pub fn normalized(mut self) -> Self {
        self.endpoint = match self.endpoint.trim() {
            "" => default_endpoint(),
            endpoint => endpoint.to_string(),
        };
        self.theme_name = self.theme_name.trim().to_string();
        self
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.endpoint.clone())
    }

    pub fn with_theme_mode(mut self, theme_mode: ThemeMode) -> Self {
        self.theme_mode = theme_mode;
        self
    }

    /// Applies the named theme when the registry knows it, else the plain mode.
    pub fn apply_theme(&self, window: Option<&mut Window>, cx: &mut App) {
        if let Some(theme_config) = ThemeRegistry::global(cx)
            .themes()
            .get(&SharedString::from(self.theme_name.clone()))
            .cloned()
            && theme_config.mode == self.theme_mode
        {
            let theme = Theme::global_mut(cx);
            if theme_config.mode.is_dark() {
                theme.dark_theme = theme_config;
            } else {
                theme.light_theme = theme_config;
            }
        }

        Theme::change(self.theme_mode, window, cx);
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<AppSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".tally"))
            .join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn settings(&self) -> Arc<AppSettings> {
        self.settings.load_full()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn update(&self, settings: AppSettings) -> SettingsResult<()> {
        let settings = settings.normalized();
        self.persist(&settings)?;
        self.settings.store(Arc::new(settings));
        Ok(())
    }

    fn load_from_disk(path: &Path) -> AppSettings {
        if !path.exists() {
            tracing::info!(path = ?path, "settings file not found, using defaults");
            return AppSettings::default();
        }

        let figment =
            Figment::from(Serialized::defaults(AppSettings::default())).merge(Json::file(path));

        match figment.extract::<AppSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(path = ?path, error = %error, "unreadable settings file, using defaults");
                AppSettings::default()
            }
        }
    }

    fn persist(&self, settings: &AppSettings) -> SettingsResult<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!(path = ?self.config_path, "saved settings");
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// App-wide settings entity; emits [`SettingsChanged`] after every saved update.
pub struct SettingsState {
    store: SettingsStore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsChanged {
    pub settings: AppSettings,
}

impl EventEmitter<SettingsChanged> for SettingsState {}

impl SettingsState {
    pub fn new(store: SettingsStore, cx: &mut App) -> Entity<Self> {
        cx.new(|_| Self { store })
    }

    pub fn settings(&self) -> Arc<AppSettings> {
        self.store.settings()
    }

    pub fn update_settings(
        &mut self,
        settings: AppSettings,
        cx: &mut Context<Self>,
    ) -> SettingsResult<()> {
        let settings = settings.normalized();
        self.store.update(settings.clone())?;
        cx.emit(SettingsChanged { settings });
        cx.notify();
        Ok(())
    }
}

fn default_endpoint() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_theme_mode() -> ThemeMode {
    ThemeMode::Light
}

fn serialize_theme_mode<S>(value: &ThemeMode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.name())
}

fn deserialize_theme_mode<'de, D>(deserializer: D) -> Result<ThemeMode, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(parse_theme_mode(&value))
}

fn parse_theme_mode(value: &str) -> ThemeMode {
    if value.trim().eq_ignore_ascii_case("dark") {
        ThemeMode::Dark
    } else {
        ThemeMode::Light
    }
}
