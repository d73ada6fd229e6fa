//! HTTP transport for the answering endpoint.

pub mod config;
pub mod error;
pub mod http;

pub use config::{CHAT_PATH, ClientConfig, DEFAULT_BASE_URL};
pub use error::{ClientError, ClientResult};
pub use http::HttpAnswerService;
