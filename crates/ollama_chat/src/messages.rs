//! JSON types for the two HTTP APIs the client talks to: the Ollama chat
//! endpoint (`/api/chat`) and the search proxy (`/context`).

use serde::{Deserialize, Serialize};

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation, sent as-is in `messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Client → server: chat request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
}

/// Incremental message inside a chat response line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub content: String,
}

/// Server → client: one NDJSON line of a streamed reply, or the whole body of
/// a non-streamed one. Unknown fields (timings, token counts) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatChunk {
    /// Content delta carried by this line, if non-empty.
    pub fn content(&self) -> Option<&str> {
        self.message
            .as_ref()
            .map(|m| m.content.as_str())
            .filter(|c| !c.is_empty())
    }
}

/// Client → search proxy.
#[derive(Debug, Clone, Serialize)]
pub struct ContextRequest<'a> {
    pub prompt: &'a str,
}

/// Search proxy → client. `context` is null when the proxy found nothing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextResponse {
    #[serde(default)]
    pub context: Option<String>,
}

/// `GET /api/tags` response, used to list installed models.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelTag {
    pub name: String,
}
