use reqwest::Url;

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5050";
pub const CHAT_PATH: &str = "/chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// `{base_url}/chat`, tolerating a trailing slash on the base.
    pub fn chat_url(&self) -> ClientResult<Url> {
        let base = self.base_url.trim().trim_end_matches('/');
        let endpoint = format!("{base}{CHAT_PATH}");

        let url = Url::parse(&endpoint).map_err(|source| ClientError::InvalidEndpoint {
            stage: "parse-chat-url",
            endpoint: endpoint.clone(),
            message: source.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidEndpoint {
                stage: "check-chat-url-scheme",
                endpoint,
                message: format!("unsupported scheme `{}`", url.scheme()),
            });
        }

        Ok(url)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
