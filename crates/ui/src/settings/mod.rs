pub mod state;

pub use state::{AppSettings, SettingsChanged, SettingsError, SettingsState, SettingsStore};
