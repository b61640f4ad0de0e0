//! Scripted generator - canned continuations, no network.
//!
//! Replays a fixed list of continuations in order and records every request
//! it receives, so callers can check exactly what prompt the model saw.

use super::*;
use std::collections::VecDeque;
use std::sync::Mutex;

pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<String>>,
    /// Returned forever once `responses` runs dry
    fallback: Option<String>,
    echo: bool,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            fallback: None,
            echo: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A generator that answers every request with the same text
    pub fn repeating(text: impl Into<String>) -> Self {
        let mut generator = Self::new(Vec::<String>::new());
        generator.fallback = Some(text.into());
        generator
    }

    /// Return the prompt in front of each continuation, like a local
    /// pipeline that yields the full text.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn next_response(&self) -> Result<String> {
        let mut responses = self.responses.lock().map_err(|_| {
            Error::unexpected("scripted generator lock poisoned")
                .with_operation("scripted::generate")
        })?;
        responses
            .pop_front()
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| {
                Error::inference_failed("script exhausted").with_operation("scripted::generate")
            })
    }
}

impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let response = self.next_response()?;
        let continuation = truncate_at_stop(&response, &request.stop);
        if self.echo {
            Ok(format!("{}{}", request.prompt, continuation))
        } else {
            Ok(continuation.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[tokio::test]
    async fn test_replays_in_order() {
        let generator = ScriptedGenerator::new(["first", "second"]);

        assert_eq!(generator.complete("p", 10).await.unwrap(), "first");
        assert_eq!(generator.complete("p", 10).await.unwrap(), "second");

        let err = generator.complete("p", 10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InferenceFailed);
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn test_honours_stop_sequences() {
        let generator = ScriptedGenerator::new(["Action: call\nObservation: made up"]);
        let request = GenerationRequest::new("prompt").with_stop(["Observation:"]);

        assert_eq!(generator.generate(&request).await.unwrap(), "Action: call\n");
    }

    #[tokio::test]
    async fn test_echo_and_recording() {
        let generator = ScriptedGenerator::repeating(" fine").with_echo(true);
        let request = GenerationRequest::new("User: hi\nAssistant:").with_max_new_tokens(5);

        let text = generator.generate(&request).await.unwrap();
        assert_eq!(text, "User: hi\nAssistant: fine");

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_new_tokens, 5);
    }

    #[test]
    fn test_repeating_never_runs_out() {
        let generator = ScriptedGenerator::repeating("again");
        for _ in 0..3 {
            let text = tokio_test::block_on(generator.complete("p", 1)).unwrap();
            assert_eq!(text, "again");
        }
    }
}
