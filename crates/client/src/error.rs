use snafu::Snafu;
use tally_conversation::ExchangeError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("invalid answering endpoint `{endpoint}` on `{stage}`: {message}"))]
    InvalidEndpoint {
        stage: &'static str,
        endpoint: String,
        message: String,
    },
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("failed to attach '{name}' on `{stage}`: {source}"))]
    AttachFile {
        stage: &'static str,
        name: String,
        source: reqwest::Error,
    },
    #[snafu(display("chat request failed on `{stage}`: {source}"))]
    SendRequest {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("failed to read chat response on `{stage}`: {source}"))]
    ReadBody {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("chat request worker failed on `{stage}`: {source}"))]
    WorkerJoin {
        stage: &'static str,
        source: tokio::task::JoinError,
    },
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint { stage, .. }
            | Self::BuildClient { stage, .. }
            | Self::AttachFile { stage, .. }
            | Self::SendRequest { stage, .. }
            | Self::ReadBody { stage, .. }
            | Self::WorkerJoin { stage, .. } => stage,
        }
    }
}

impl From<ClientError> for ExchangeError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::WorkerJoin { stage, .. } => ExchangeError::WorkerLost { stage },
            other => ExchangeError::Transport {
                stage: other.stage(),
                message: other.to_string(),
            },
        }
    }
}
