use reqwest::Url;
use reqwest::multipart::{Form, Part};
use snafu::ResultExt;
use tally_conversation::{
    AnswerService, AskRequest, ExchangeError, ExchangeFuture, ExchangeReply, FileRef,
};
use tokio::runtime::Handle;

use crate::config::ClientConfig;
use crate::error::{
    AttachFileSnafu, BuildClientSnafu, ClientResult, ReadBodySnafu, SendRequestSnafu,
    WorkerJoinSnafu,
};

const USER_AGENT: &str = concat!("tally/", env!("CARGO_PKG_VERSION"));

/// Posts questions to the answering endpoint as multipart forms.
///
/// Requests run on the supplied tokio runtime; the returned future only
/// awaits the join handle, so it can be polled from any executor.
pub struct HttpAnswerService {
    client: reqwest::Client,
    chat_url: Url,
    runtime: Handle,
}

impl HttpAnswerService {
    pub fn new(config: &ClientConfig, runtime: Handle) -> ClientResult<Self> {
        let chat_url = config.chat_url()?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context(BuildClientSnafu {
                stage: "build-http-client",
            })?;

        tracing::info!(endpoint = %chat_url, "answer service configured");
        Ok(Self {
            client,
            chat_url,
            runtime,
        })
    }

    pub fn chat_url(&self) -> &Url {
        &self.chat_url
    }

    fn file_part(file: FileRef) -> ClientResult<Part> {
        let mime = mime_guess::from_path(&file.name).first_or_octet_stream();
        let FileRef { name, blob } = file;

        Part::bytes(blob)
            .file_name(name.clone())
            .mime_str(mime.essence_str())
            .context(AttachFileSnafu {
                stage: "build-file-part",
                name,
            })
    }

    async fn post_question(
        client: reqwest::Client,
        chat_url: Url,
        request: AskRequest,
    ) -> ClientResult<ExchangeReply> {
        let AskRequest {
            exchange_id,
            question,
            attachment,
        } = request;

        let mut form = Form::new().text("question", question);
        if let Some(file) = attachment {
            tracing::debug!(exchange = %exchange_id, name = %file.name, bytes = file.len(), "attaching file");
            form = form.part("file", Self::file_part(file)?);
        }

        let response = client
            .post(chat_url)
            .multipart(form)
            .send()
            .await
            .context(SendRequestSnafu {
                stage: "send-chat-request",
            })?;

        let status = response.status();
        let body = response.text().await.context(ReadBodySnafu {
            stage: "read-chat-response",
        })?;

        tracing::debug!(
            exchange = %exchange_id,
            status = status.as_u16(),
            body_bytes = body.len(),
            "chat response received"
        );
        Ok(ExchangeReply::new(status.as_u16(), body))
    }
}

impl AnswerService for HttpAnswerService {
    fn ask(&self, request: AskRequest) -> ExchangeFuture<'_> {
        let worker = self.runtime.spawn(Self::post_question(
            self.client.clone(),
            self.chat_url.clone(),
            request,
        ));

        Box::pin(async move {
            let reply = worker
                .await
                .context(WorkerJoinSnafu {
                    stage: "join-chat-request",
                })
                .and_then(|result| result);
            reply.map_err(ExchangeError::from)
        })
    }
}
