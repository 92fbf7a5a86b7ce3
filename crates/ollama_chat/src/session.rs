//! One chat session: history, optional search augmentation, and the
//! request/response cycle that drives a [`ChatView`].

use tracing::{debug, info};

use crate::client::{ChatClient, ClientError, StreamUpdate};
use crate::config::Config;
use crate::history::Conversation;
use crate::messages::Role;
use crate::search::{augment_prompt, default_keywords, needs_search, SearchClient};

/// Where an exchange is displayed. The terminal binary implements this; tests
/// record the calls.
pub trait ChatView {
    fn add_message(&mut self, role: Role, content: &str);

    fn set_thinking(&mut self, thinking: bool);

    /// A reply is about to stream in.
    fn begin_assistant(&mut self);

    /// Full reply text so far.
    fn update_assistant(&mut self, text: &str);

    fn finish_assistant(&mut self, text: &str);

    /// The reply failed; close whatever part of it was shown.
    fn abort_assistant(&mut self);

    fn show_error(&mut self, message: &str);
}

pub struct ChatSession {
    model: String,
    stream: bool,
    chat: ChatClient,
    search: Option<SearchClient>,
    keywords: Vec<String>,
    history: Conversation,
}

impl ChatSession {
    pub fn from_config(config: &Config) -> Self {
        let http = reqwest::Client::new();
        let search = config
            .search
            .enabled
            .then(|| SearchClient::with_http(http.clone(), config.search_base_url()));
        Self {
            model: config.chat.model.clone(),
            stream: config.chat.stream,
            chat: ChatClient::with_http(http, config.chat_base_url()),
            search,
            keywords: config
                .search
                .keywords
                .clone()
                .unwrap_or_else(default_keywords),
            history: Conversation::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn history(&self) -> &Conversation {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub async fn list_models(&self) -> Result<Vec<String>, ClientError> {
        self.chat.list_models().await
    }

    /// Run one exchange. Blank input is ignored (`Ok(None)`). On failure the
    /// error is shown in the view and returned; the user turn stays in the
    /// history.
    pub async fn send(
        &mut self,
        input: &str,
        view: &mut impl ChatView,
    ) -> Result<Option<String>, ClientError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        view.add_message(Role::User, input);
        view.set_thinking(true);

        let prompt = self.build_prompt(input).await;
        self.history.push_user(prompt);

        let result = if self.stream {
            self.chat
                .chat_stream(&self.model, self.history.messages(), |update| match update {
                    StreamUpdate::Started => {
                        view.set_thinking(false);
                        view.begin_assistant();
                    }
                    StreamUpdate::Text(text) => view.update_assistant(text),
                })
                .await
        } else {
            let result = self.chat.chat(&self.model, self.history.messages()).await;
            if let Ok(text) = &result {
                view.set_thinking(false);
                view.begin_assistant();
                view.update_assistant(text);
            }
            result
        };

        match result {
            Ok(reply) => {
                view.finish_assistant(&reply);
                self.history.push_assistant(reply.clone());
                Ok(Some(reply))
            }
            Err(e) => {
                view.set_thinking(false);
                view.abort_assistant();
                debug!(error = %e, "chat request failed");
                view.show_error(&format!("ERROR: {}. Check connection.", e));
                Err(e)
            }
        }
    }

    async fn build_prompt(&self, input: &str) -> String {
        let search = match &self.search {
            Some(s) if needs_search(input, &self.keywords) => s,
            _ => {
                debug!("replying with model knowledge only");
                return input.to_string();
            }
        };
        match search.fetch_context(input).await {
            Some(context) => {
                info!("replying with search context");
                augment_prompt(&context, input)
            }
            None => {
                info!("search failed, replying with model knowledge only");
                input.to_string()
            }
        }
    }
}
