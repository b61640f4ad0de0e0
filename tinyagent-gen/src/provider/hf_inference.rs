//! Hosted text-generation endpoint
//!
//! `POST {base_url}/{model}` with `{"inputs": ..., "parameters": {...}}`.
//! The endpoint answers either a list of `{"generated_text"}` objects or a
//! single one, depending on the model's task pipeline.

use super::*;
use crate::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const OPERATION: &str = "hf_inference::generate";

/// Hosted inference endpoint provider
pub struct HfInferenceProvider {
    client: Client,
    config: ProviderConfig,
}

impl HfInferenceProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = config.http_client(120)?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(HF_INFERENCE_URL)
            .trim_end_matches('/')
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url(), self.model())
    }

    fn build_request<'a>(&self, request: &'a GenerationRequest) -> HfRequest<'a> {
        HfRequest {
            inputs: &request.prompt,
            parameters: HfParameters {
                max_new_tokens: request.max_new_tokens,
                stop: if request.stop.is_empty() {
                    None
                } else {
                    Some(request.stop.as_slice())
                },
                return_full_text: self.config.echo,
            },
            options: HfOptions {
                wait_for_model: true,
            },
        }
    }
}

impl TextGenerator for HfInferenceProvider {
    fn name(&self) -> &str {
        "hf-inference"
    }

    fn model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or(HF_DEFAULT_MODEL)
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!(
            model = self.model(),
            prompt_chars = request.prompt.len(),
            max_new_tokens = request.max_new_tokens,
            "requesting continuation"
        );

        let mut req = self
            .client
            .post(self.endpoint())
            .json(&self.build_request(request));

        if let Some(token) = &self.config.api_key {
            req = req.bearer_auth(token);
        }

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        let response = req.send().await.map_err(|e| error::network(OPERATION, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<HfErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(error::http_status(OPERATION, status.as_u16(), message)
                .with_context("model", self.model()));
        }

        let body: HfResponse = response
            .json()
            .await
            .map_err(|e| error::decode(OPERATION, e))?;

        let generated = body.into_text().ok_or_else(|| {
            Error::inference_failed("response contained no generated_text")
                .with_operation(OPERATION)
                .with_context("model", self.model())
        })?;

        Ok(truncate_output(
            &generated,
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
struct HfRequest<'a> {
    inputs: &'a str,
    parameters: HfParameters<'a>,
    options: HfOptions,
}

#[derive(Debug, Serialize)]
struct HfParameters<'a> {
    max_new_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
    return_full_text: bool,
}

#[derive(Debug, Serialize)]
struct HfOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
struct HfGeneration {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HfResponse {
    Many(Vec<HfGeneration>),
    One(HfGeneration),
}

impl HfResponse {
    fn into_text(self) -> Option<String> {
        match self {
            HfResponse::Many(items) => items.into_iter().next().map(|g| g.generated_text),
            HfResponse::One(g) => Some(g.generated_text),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HfErrorBody {
    error: String,
}
