//! HTTP client for the Ollama chat API: streamed (NDJSON) and single-object
//! replies, plus the installed-model listing.

use futures_util::StreamExt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::messages::{ChatChunk, ChatMessage, ChatRequest, TagsResponse};
use crate::stream::{decode_line, NdjsonDecoder};

/// Chat request error.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("{0}")]
    Api(String),

    #[error("invalid response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Progress of a streamed reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamUpdate<'a> {
    Started,
    Text(&'a str),
}

/// Client bound to one chat API base URL (e.g. `http://localhost:11434`).
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        stream: bool,
    ) -> Result<reqwest::Response, ClientError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(%url, model, messages = messages.len(), stream, "sending chat request");
        let body = ChatRequest {
            model,
            messages,
            stream,
        };
        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(response)
    }

    /// Send the conversation with `stream: true`. `on_update` gets
    /// [`StreamUpdate::Started`] once the response headers arrive, then the text
    /// accumulated so far after every non-empty delta. Returns the full reply.
    ///
    /// Lines that fail to decode are logged and skipped.
    pub async fn chat_stream<F>(
        &self,
        model: &str,
        messages: &[ChatMessage],
        mut on_update: F,
    ) -> Result<String, ClientError>
    where
        F: FnMut(StreamUpdate<'_>),
    {
        let response = self.post_chat(model, messages, true).await?;
        on_update(StreamUpdate::Started);

        let mut body = response.bytes_stream();
        let mut decoder = NdjsonDecoder::new();
        let mut reply = String::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for line in decoder.push(&chunk) {
                if apply_line(&line, &mut reply, &mut on_update)? {
                    return Ok(reply);
                }
            }
        }
        if let Some(line) = decoder.finish() {
            apply_line(&line, &mut reply, &mut on_update)?;
        }
        Ok(reply)
    }

    /// Send the conversation with `stream: false` and return the reply text.
    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ClientError> {
        let response = self.post_chat(model, messages, false).await?;
        let text = response.text().await?;
        let chunk: ChatChunk = serde_json::from_str(&text)?;
        if let Some(err) = chunk.error {
            return Err(ClientError::Api(err));
        }
        Ok(chunk.message.map(|m| m.content).unwrap_or_default())
    }

    /// Names of the models installed on the server (`GET /api/tags`).
    pub async fn list_models(&self) -> Result<Vec<String>, ClientError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

// Returns true once the server marks the reply done.
fn apply_line<F: FnMut(StreamUpdate<'_>)>(
    line: &str,
    reply: &mut String,
    on_update: &mut F,
) -> Result<bool, ClientError> {
    let mut chunk = match decode_line(line) {
        Ok(Some(chunk)) => chunk,
        Ok(None) => return Ok(false),
        Err(e) => {
            warn!(error = %e, line, "error parsing JSON line");
            return Ok(false);
        }
    };
    if let Some(err) = chunk.error.take() {
        return Err(ClientError::Api(err));
    }
    if let Some(delta) = chunk.content() {
        reply.push_str(delta);
        on_update(StreamUpdate::Text(reply.as_str()));
    }
    Ok(chunk.done)
}
