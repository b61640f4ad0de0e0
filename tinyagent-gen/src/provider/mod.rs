//! # Text Generation Interface
//!
//! A trait-based abstraction over text-generation backends.
//!
//! ## Design
//! - `TextGenerator` defines the core interface: prompt in, continuation out
//! - Implementations for the hosted inference endpoint, a local
//!   OpenAI-compatible completions server, and a scripted generator
//! - Every implementation cuts its output at the first stop sequence

pub mod completions;
pub mod hf_inference;
pub mod scripted;

#[cfg(test)]
mod test_server;

pub use completions::CompletionsProvider;
pub use hf_inference::HfInferenceProvider;
pub use scripted::ScriptedGenerator;

use crate::error::{Error, ErrorKind, Result};
use std::collections::HashMap;

// ============================================================================
// Core Types
// ============================================================================

/// A single generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_new_tokens: usize,
    pub stop: Vec<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_new_tokens: 50,
            stop: Vec::new(),
        }
    }

    pub fn with_max_new_tokens(mut self, max: usize) -> Self {
        self.max_new_tokens = max;
        self
    }

    pub fn with_stop<I, S>(mut self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop = stop.into_iter().map(Into::into).collect();
        self
    }
}

/// Cut `text` immediately before the earliest occurrence of any stop sequence.
///
/// Some servers include the matched stop text in their output; truncating on
/// our side keeps the contract identical across backends.
pub fn truncate_at_stop<'a>(text: &'a str, stop: &[String]) -> &'a str {
    let cut = stop
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s.as_str()))
        .min();
    match cut {
        Some(pos) => &text[..pos],
        None => text,
    }
}

/// Apply stop sequences to a backend's raw output.
///
/// With `echo` the first `prompt.len()` bytes are the echoed prompt: they are
/// kept verbatim and only the text after them is truncated. The split does
/// not rely on the server echoing the prompt byte for byte.
pub(crate) fn truncate_output(text: &str, prompt: &str, stop: &[String], echo: bool) -> String {
    if !echo {
        return truncate_at_stop(text, stop).to_string();
    }

    let mut split = prompt.len().min(text.len());
    while !text.is_char_boundary(split) {
        split += 1;
    }
    let (echoed, continuation) = text.split_at(split);
    format!("{}{}", echoed, truncate_at_stop(continuation, stop))
}

// ============================================================================
// Generator Trait
// ============================================================================

/// The generation service contract
#[allow(async_fn_in_trait)]
pub trait TextGenerator: Send + Sync {
    /// Backend name (e.g., "hf-inference", "completions")
    fn name(&self) -> &str;

    /// Model the backend will run
    fn model(&self) -> &str;

    /// Generate a continuation of `request.prompt`, truncated at the first
    /// stop sequence and bounded by `request.max_new_tokens`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Simple prompt -> continuation helper with no stop sequences
    async fn complete(&self, prompt: &str, max_new_tokens: usize) -> Result<String> {
        let request = GenerationRequest::new(prompt).with_max_new_tokens(max_new_tokens);
        self.generate(&request).await
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for creating providers
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub headers: HashMap<String, String>,
    pub timeout_secs: Option<u64>,
    /// Ask the backend to return the prompt in front of the continuation
    pub echo: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    HfInference,
    Local,
}

impl std::str::FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hf" | "hf-inference" | "huggingface" => Ok(ProviderType::HfInference),
            "local" | "completions" => Ok(ProviderType::Local),
            "scripted" => Err(Error::new(
                ErrorKind::Unsupported,
                "the scripted backend is selected with --dry-run",
            )
            .with_context("provider", s)),
            other => Err(Error::config_invalid(format!("unknown provider '{}'", other))
                .with_context("provider", other)),
        }
    }
}

pub const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";
pub const HF_DEFAULT_MODEL: &str = "gpt2";
pub const LOCAL_URL: &str = "http://localhost:8080/v1";
pub const LOCAL_DEFAULT_MODEL: &str = "gpt2";

impl ProviderConfig {
    /// Hosted text-generation endpoint. The token is optional for public models.
    pub fn hf_inference(token: Option<String>) -> Self {
        Self {
            provider_type: ProviderType::HfInference,
            api_key: token.filter(|t| !t.is_empty()),
            base_url: Some(HF_INFERENCE_URL.into()),
            default_model: Some(HF_DEFAULT_MODEL.into()),
            headers: HashMap::new(),
            timeout_secs: Some(120),
            echo: false,
        }
    }

    /// Local OpenAI-compatible completions server (llama.cpp, vLLM, Ollama)
    pub fn local(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::Local,
            api_key: None,
            base_url: Some(base_url.into()),
            default_model: Some(model.into()),
            headers: HashMap::new(),
            timeout_secs: Some(300),
            echo: false,
        }
    }

    /// Build a config from the environment.
    ///
    /// - `HF_TOKEN` (falls back to `HUGGING_FACE_HUB_TOKEN`)
    /// - `TINYAGENT_MODEL`
    /// - `TINYAGENT_BASE_URL`
    pub fn from_env(provider_type: ProviderType) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let mut config = match provider_type {
            ProviderType::Local => Self::local(LOCAL_URL, LOCAL_DEFAULT_MODEL),
            ProviderType::HfInference => {
                Self::hf_inference(var("HF_TOKEN").or_else(|| var("HUGGING_FACE_HUB_TOKEN")))
            }
        };

        if let Some(model) = var("TINYAGENT_MODEL") {
            config.default_model = Some(model);
        }
        if let Some(url) = var("TINYAGENT_BASE_URL") {
            config.base_url = Some(url);
        }
        config
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub(crate) fn http_client(&self, default_timeout: u64) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(
                self.timeout_secs.unwrap_or(default_timeout),
            ))
            .build()
            .map_err(|e| {
                Error::config_invalid(format!("failed to create HTTP client: {}", e))
                    .with_operation("provider::http_client")
                    .set_source(e)
            })
    }
}
