//! Chat client for a local Ollama server (config, HTTP/NDJSON protocol,
//! search-context augmentation, session handling).
//! Used by the `ollama-chat` terminal binary.

pub mod client;
pub mod config;
pub mod history;
pub mod messages;
pub mod render;
pub mod search;
pub mod session;
pub mod stream;

pub use client::{ChatClient, ClientError, StreamUpdate};
pub use config::{default_config_path, ChatSection, Config, ConfigError, RenderMode, SearchSection, UiSection};
pub use history::Conversation;
pub use messages::{ChatMessage, Role};
pub use render::Renderer;
pub use search::SearchClient;
pub use session::{ChatSession, ChatView};
