#![deny(unsafe_code)]

/// Window shell, global actions and the tokio runtime handle.
pub mod app;
/// Transcript list, input and the session-to-widget wiring.
pub mod chat;
/// Settings persistence.
pub mod settings;
