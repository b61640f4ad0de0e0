//! OpenAI-compatible text completions provider
//!
//! Talks to `{base_url}/completions` as exposed by llama.cpp's server, vLLM,
//! Ollama and friends. This is the local pipeline behind the plain
//! conversation agent.

use super::*;
use crate::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const OPERATION: &str = "completions::generate";

/// Local completions provider
pub struct CompletionsProvider {
    client: Client,
    config: ProviderConfig,
}

impl CompletionsProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = config.http_client(300)?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(LOCAL_URL)
            .trim_end_matches('/')
    }

    fn build_request<'a>(&'a self, request: &'a GenerationRequest) -> CompletionsRequest<'a> {
        CompletionsRequest {
            model: self.model(),
            prompt: &request.prompt,
            max_tokens: request.max_new_tokens,
            stop: if request.stop.is_empty() {
                None
            } else {
                Some(request.stop.as_slice())
            },
            echo: if self.config.echo { Some(true) } else { None },
            stream: false,
        }
    }
}

impl TextGenerator for CompletionsProvider {
    fn name(&self) -> &str {
        "completions"
    }

    fn model(&self) -> &str {
        self.config
            .default_model
            .as_deref()
            .unwrap_or(LOCAL_DEFAULT_MODEL)
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!(
            model = self.model(),
            prompt_chars = request.prompt.len(),
            echo = self.config.echo,
            "requesting completion"
        );

        let mut req = self
            .client
            .post(format!("{}/completions", self.base_url()))
            .json(&self.build_request(request));

        if let Some(api_key) = &self.config.api_key {
            if !api_key.is_empty() {
                req = req.bearer_auth(api_key);
            }
        }

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        let response = req.send().await.map_err(|e| error::network(OPERATION, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(error::http_status(OPERATION, status.as_u16(), text)
                .with_context("model", self.model()));
        }

        let api_response: CompletionsResponse = response
            .json()
            .await
            .map_err(|e| error::decode(OPERATION, e))?;

        let choice = api_response.choices.into_iter().next().ok_or_else(|| {
            Error::inference_failed("no choices in response")
                .with_operation(OPERATION)
                .with_context("model", self.model())
        })?;

        if let Some(reason) = choice.finish_reason.as_deref() {
            debug!(finish_reason = reason, chars = choice.text.len(), "completion finished");
        }

        // An echoed prompt may itself contain a stop sequence.
        Ok(truncate_output(
            &choice.text,
            &request.prompt,
            &request.stop,
            self.config.echo,
        ))
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    echo: Option<bool>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    choices: Vec<CompletionsChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionsChoice {
    text: String,
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::test_server::serve_once;

    fn provider_at(base_url: &str, echo: bool) -> CompletionsProvider {
        CompletionsProvider::new(ProviderConfig::local(base_url, "gpt2").with_echo(echo)).unwrap()
    }

    fn chat_request() -> GenerationRequest {
        GenerationRequest::new("User: Hello!\nAssistant:")
            .with_max_new_tokens(64)
            .with_stop(["User:"])
    }

    #[tokio::test]
    async fn test_generate_truncates_returned_stop_text() {
        let (url, server) = serve_once(
            200,
            r#"{"choices": [{"text": " I'm fine.\nUser: and you?", "index": 0, "finish_reason": "length"}]}"#,
        )
        .await;

        let output = provider_at(&url, false).generate(&chat_request()).await.unwrap();
        assert_eq!(output, " I'm fine.\n");

        let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(sent["prompt"], "User: Hello!\nAssistant:");
        assert_eq!(sent["max_tokens"], 64);
        assert!(sent.get("echo").is_none());
    }

    #[tokio::test]
    async fn test_generate_with_echo_keeps_prompt() {
        let (url, server) = serve_once(
            200,
            r#"{"choices": [{"text": "User: Hello!\nAssistant: Hi! How can I help?\nUser: ", "finish_reason": "stop"}]}"#,
        )
        .await;

        let output = provider_at(&url, true).generate(&chat_request()).await.unwrap();
        assert_eq!(output, "User: Hello!\nAssistant: Hi! How can I help?\n");

        let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(sent["echo"], true);
    }

    #[tokio::test]
    async fn test_generate_rate_limited() {
        let (url, _server) = serve_once(429, "").await;

        let err = provider_at(&url, false).generate(&chat_request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(err.is_retryable());
        assert_eq!(err.message(), "backend returned HTTP 429");
    }

    #[tokio::test]
    async fn test_generate_undecodable_body() {
        let (url, _server) = serve_once(200, "<html>gateway</html>").await;

        let err = provider_at(&url, false).generate(&chat_request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailed);
    }

    #[tokio::test]
    async fn test_generate_no_choices() {
        let (url, _server) = serve_once(200, r#"{"choices": []}"#).await;

        let err = provider_at(&url, false).generate(&chat_request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InferenceFailed);
        assert_eq!(err.message(), "no choices in response");
    }

    #[test]
    fn test_provider_defaults() {
        let provider =
            CompletionsProvider::new(ProviderConfig::local("http://localhost:8080/v1/", "gpt2"))
                .unwrap();
        assert_eq!(provider.name(), "completions");
        assert_eq!(provider.model(), "gpt2");
        assert_eq!(provider.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_request_body_shape() {
        let provider = CompletionsProvider::new(
            ProviderConfig::local("http://localhost:8080/v1", "llama3").with_echo(true),
        )
        .unwrap();
        let request = GenerationRequest::new("User: Hello!\nAssistant:")
            .with_max_new_tokens(64)
            .with_stop(["User:"]);

        let body = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(body["stop"][0], "User:");
        assert_eq!(body["echo"], true);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_request_body_omits_optional_fields() {
        let provider =
            CompletionsProvider::new(ProviderConfig::local("http://localhost:8080/v1", "gpt2"))
                .unwrap();
        let request = GenerationRequest::new("Hello");

        let body = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert!(body.get("stop").is_none());
        assert!(body.get("echo").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let response: CompletionsResponse = serde_json::from_str(
            r#"{"id": "cmpl-1", "model": "gpt2", "choices": [{"text": " I'm fine.", "index": 0, "finish_reason": "stop"}]}"#,
        )
        .unwrap();
        assert_eq!(response.choices[0].text, " I'm fine.");
        assert_eq!(response.choices[0].finish_reason.as_deref(), Some("stop"));
    }
}
