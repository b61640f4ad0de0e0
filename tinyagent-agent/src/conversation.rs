//! Plain conversation agent - keeps a transcript, no tool handling

use serde::{Deserialize, Serialize};
use tinyagent_error::Result;
use tinyagent_gen::{GenerationRequest, TextGenerator};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Speaker label used in formatted prompts
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One turn of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Render a conversation as a prompt: one `Role: content` line per message,
/// then an `Assistant:` cue for the model to continue from.
pub fn format_history(messages: &[Message]) -> String {
    render(messages.iter())
}

fn render<'a>(messages: impl Iterator<Item = &'a Message>) -> String {
    let mut prompt = String::new();
    for message in messages {
        prompt.push_str(message.role.label());
        prompt.push_str(": ");
        prompt.push_str(&message.content);
        prompt.push('\n');
    }
    prompt.push_str(Role::Assistant.label());
    prompt.push(':');
    prompt
}

/// Configuration for the conversation agent
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub max_new_tokens: usize,
    /// Keeps the model from writing the user's next turn
    pub stop: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 64,
            stop: vec!["User:".to_string()],
        }
    }
}

/// Agent that feeds the whole history to the generator on every turn.
pub struct ChatAgent<G> {
    generator: G,
    history: Vec<Message>,
    config: ChatConfig,
}

impl<G: TextGenerator> ChatAgent<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            history: Vec::new(),
            config: ChatConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ChatConfig) -> Self {
        self.config = config;
        self
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// All messages so far, in call order
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Send one user message and return the assistant's reply.
    ///
    /// Both messages are recorded only when generation succeeds, so the
    /// history always alternates user / assistant.
    pub async fn run(&mut self, user_input: &str) -> Result<String> {
        let user = Message::user(user_input);
        let prompt = render(self.history.iter().chain(std::iter::once(&user)));

        let request = GenerationRequest::new(prompt.as_str())
            .with_max_new_tokens(self.config.max_new_tokens)
            .with_stop(self.config.stop.iter().cloned());
        let output = self.generator.generate(&request).await?;

        // Pipelines that return the full text echo the prompt first.
        let reply = output
            .strip_prefix(prompt.as_str())
            .unwrap_or(output.as_str())
            .trim()
            .to_string();
        debug!(turn = self.history.len() / 2 + 1, chars = reply.len(), "assistant replied");

        self.history.push(user);
        self.history.push(Message::assistant(reply.clone()));
        Ok(reply)
    }
}
