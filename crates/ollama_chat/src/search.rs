//! Search augmentation: decide from keywords whether a question needs fresh
//! context, fetch it from the search proxy, and prepend it to the question.

use tracing::{error, info};

use crate::messages::{ContextRequest, ContextResponse};

/// Phrases that route a question through the search proxy.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    // explicit requests
    "search", "web", "google", "look up", "find", "search for",
    // time-sensitive
    "weather", "current", "today", "latest", "news", "now", "recent",
    "yesterday", "tomorrow", "this week", "currently",
    // question words
    "who is", "what is", "when is", "where is", "how is",
    "who's", "what's", "where's", "how's",
    "who are", "what are", "where are",
    // real-time data
    "price", "stock", "score", "exchange rate", "currency",
    // events
    "when does", "when did", "won", "winner", "election", "appointed",
];

pub fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

/// Case-insensitive substring match against any keyword.
pub fn needs_search<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .any(|k| lower.contains(&k.as_ref().to_lowercase()))
}

pub fn augment_prompt(context: &str, question: &str) -> String {
    format!("{}\n\nUser question: {}", context, question)
}

/// Client for the search proxy's `/context` endpoint.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
}

impl SearchClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Context for `prompt`, or `None` when the proxy is unreachable, fails,
    /// or has nothing. Failures are logged, never returned.
    pub async fn fetch_context(&self, prompt: &str) -> Option<String> {
        let url = format!("{}/context", self.base_url);
        let response = match self
            .http
            .post(&url)
            .json(&ContextRequest { prompt })
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "failed to fetch search context");
                return None;
            }
        };
        if !response.status().is_success() {
            error!(status = response.status().as_u16(), "search proxy error");
            return None;
        }
        match response.json::<ContextResponse>().await {
            Ok(body) => {
                let context = body.context.filter(|c| !c.is_empty());
                info!(found = context.is_some(), "search context received");
                context
            }
            Err(e) => {
                error!(error = %e, "failed to decode search context");
                None
            }
        }
    }
}
