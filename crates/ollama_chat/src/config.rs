//! Client config load/save for `~/.ollama-chat/config.yaml`.
//! Sections: `chat.*` (Ollama endpoint and model), `search.*` (context proxy),
//! `ui.*` (reply rendering).

use std::path::{Path, PathBuf};

use thiserror::Error;

pub const DEFAULT_MODEL: &str = "llama3.1:latest";
pub const DEFAULT_CHAT_PORT: u16 = 11434;
pub const DEFAULT_SEARCH_PORT: u16 = 8001;

/// Chat section (protocol, host, port, model, stream).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ChatSection {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub stream: bool,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            protocol: "http".into(),
            host: "localhost".into(),
            port: DEFAULT_CHAT_PORT,
            model: DEFAULT_MODEL.into(),
            stream: true,
        }
    }
}

/// Search section (enabled, port, keyword override).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub enabled: bool,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            enabled: true,
            port: DEFAULT_SEARCH_PORT,
            keywords: None,
        }
    }
}

/// How assistant replies are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Plain,
    Markdown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UiSection {
    pub render: RenderMode,
}

/// Full client config. Every field falls back to its default when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub chat: ChatSection,
    pub search: SearchSection,
    pub ui: UiSection,
}

impl Config {
    /// Base URL of the chat API, e.g. `http://localhost:11434`.
    pub fn chat_base_url(&self) -> String {
        base_url(&self.chat.protocol, &self.chat.host, self.chat.port)
    }

    /// Base URL of the search proxy; shares protocol and host with the chat API.
    pub fn search_base_url(&self) -> String {
        base_url(&self.chat.protocol, &self.chat.host, self.search.port)
    }
}

// Accepts both "http" and the browser-style "http:".
fn base_url(protocol: &str, host: &str, port: u16) -> String {
    let scheme = protocol.trim_end_matches(|c| c == ':' || c == '/');
    format!("{}://{}:{}", scheme, host, port)
}

/// Returns the default config file path: `~/.ollama-chat/config.yaml` (platform-specific).
pub fn default_config_path() -> Option<PathBuf> {
    let home = home_dir()?;
    Some(home.join(".ollama-chat").join("config.yaml"))
}

#[cfg(unix)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(windows)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE").map(PathBuf::from)
}

#[cfg(not(any(unix, windows)))]
fn home_dir() -> Option<PathBuf> {
    None
}

/// Load config from a YAML file. An empty file yields the defaults.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(&contents)?)
}

/// Save config to a YAML file. Creates parent directory if missing.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Config load/save error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
