//! Tool-calling agent - the generate / parse / execute / observe loop

use crate::protocol::{
    extract_final_answer, format_observation, try_parse_invocation, ToolInvocation,
    OBSERVATION_MARKER, USER_MARKER,
};
use crate::tools::ToolRegistry;
use tinyagent_error::{Error, Result};
use tinyagent_gen::{GenerationRequest, TextGenerator};
use tracing::{debug, info, warn};

/// Configuration for the tool loop
#[derive(Debug, Clone)]
pub struct ToolLoopConfig {
    /// Token budget for each continuation
    pub max_new_tokens: usize,
    /// Hard truncation points requested from the generator
    pub stop: Vec<String>,
    /// Generation calls allowed before giving up
    pub max_iterations: usize,
}

impl Default for ToolLoopConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 50,
            stop: vec![OBSERVATION_MARKER.to_string(), USER_MARKER.to_string()],
            max_iterations: 10,
        }
    }
}

impl ToolLoopConfig {
    /// A loop allowed zero generation calls could never answer
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::config_invalid("max_iterations must be at least 1")
                .with_operation("tool_loop::run")
                .with_context("max_iterations", "0"));
        }
        Ok(())
    }
}

/// The running prompt of one loop invocation. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    text: String,
}

impl Transcript {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            text: initial.into(),
        }
    }

    pub fn push(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub answer: String,
    /// Generation calls made, including the one that produced the answer
    pub iterations: usize,
    /// Tool calls executed, in order
    pub tool_calls: Vec<ToolInvocation>,
    pub transcript: Transcript,
}

enum Step {
    Answer(String),
    Observe(ToolInvocation, String),
    Idle,
}

/// Agent that lets the model call local tools through fenced JSON blocks.
pub struct ToolAgent<G> {
    generator: G,
    registry: ToolRegistry,
    config: ToolLoopConfig,
}

impl<G: TextGenerator> ToolAgent<G> {
    pub fn new(generator: G, registry: ToolRegistry) -> Self {
        Self {
            generator,
            registry,
            config: ToolLoopConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ToolLoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ToolLoopConfig {
        &self.config
    }

    /// System instructions describing the registered tools and the calling
    /// convention.
    pub fn system_prompt(&self) -> String {
        let tools = if self.registry.is_empty() {
            "(no tools available)".to_string()
        } else {
            self.registry.catalogue()
        };

        let example = self
            .registry
            .definitions()
            .into_iter()
            .next()
            .map(|d| {
                let input: serde_json::Map<String, serde_json::Value> = d
                    .parameters
                    .as_object()
                    .map(|props| {
                        props
                            .keys()
                            .map(|k| (k.clone(), k.to_uppercase().into()))
                            .collect()
                    })
                    .unwrap_or_default();
                serde_json::json!({ "action": d.name, "action_input": input }).to_string()
            })
            .unwrap_or_else(|| r#"{"action": "TOOL_NAME", "action_input": {}}"#.to_string());

        format!(
            "You are a helpful assistant that can use the following tools:\n\
             {}\n\n\
             Use a tool by responding with:\n\
             Action:\n\
             ```\n\
             {}\n\
             ```\n\
             Then wait for the Observation and provide a Final Answer.",
            tools, example
        )
    }

    /// The initial prompt for a user utterance
    pub fn format_prompt(&self, user_input: &str) -> String {
        format!(
            "{}\n\n{} {}\nAssistant: Let me check that for you.\n",
            self.system_prompt(),
            USER_MARKER,
            user_input
        )
    }

    /// Answer `user_input`, calling tools as the model requests them.
    pub async fn run(&self, user_input: &str) -> Result<String> {
        self.run_detailed(user_input).await.map(|outcome| outcome.answer)
    }

    /// Like [`run`](Self::run) but also returns the transcript and tool calls.
    pub async fn run_detailed(&self, user_input: &str) -> Result<RunOutcome> {
        self.config.validate()?;
        let mut transcript = Transcript::new(self.format_prompt(user_input));
        let mut tool_calls = Vec::new();

        for iteration in 1..=self.config.max_iterations {
            let request = GenerationRequest::new(transcript.as_str())
                .with_max_new_tokens(self.config.max_new_tokens)
                .with_stop(self.config.stop.iter().cloned());

            let continuation = self
                .generator
                .generate(&request)
                .await
                .map_err(|e| e.with_context("iteration", iteration.to_string()))?;
            debug!(iteration, chars = continuation.len(), "continuation received");

            transcript.push(&continuation);

            match self.step(&continuation)? {
                Step::Answer(answer) => {
                    info!(iteration, tool_calls = tool_calls.len(), "final answer");
                    return Ok(RunOutcome {
                        answer,
                        iterations: iteration,
                        tool_calls,
                        transcript,
                    });
                }
                Step::Observe(invocation, result) => {
                    transcript.push(&format_observation(&result));
                    tool_calls.push(invocation);
                }
                Step::Idle => {
                    debug!(iteration, "no tool call or final answer, continuing");
                }
            }
        }

        warn!(
            max_iterations = self.config.max_iterations,
            "tool loop gave up without a final answer"
        );
        Err(Error::iteration_limit(self.config.max_iterations).with_operation("tool_loop::run"))
    }

    fn step(&self, continuation: &str) -> Result<Step> {
        if let Some(answer) = extract_final_answer(continuation) {
            return Ok(Step::Answer(answer.to_string()));
        }

        let invocation = match try_parse_invocation(continuation) {
            Ok(Some(invocation)) => invocation,
            Ok(None) => return Ok(Step::Idle),
            Err(e) => {
                warn!(error = %e, "malformed tool call");
                return Err(e.with_operation("tool_loop::run"));
            }
        };

        info!(tool = %invocation.action, args = ?invocation.action_input, "executing tool");
        let result = self
            .registry
            .execute(&invocation.action, &invocation.action_input)
            .map_err(|e| e.with_operation("tool_loop::run"))?;

        Ok(Step::Observe(invocation, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::FnTool;
    use tinyagent_error::ErrorKind;
    use tinyagent_gen::ScriptedGenerator;

    const WEATHER_CALL: &str = "Action:\n```\n{\"action\": \"get_weather\", \"action_input\": {\"location\": \"Paris\"}}\n```\n";

    fn agent(responses: &[&str]) -> ToolAgent<ScriptedGenerator> {
        ToolAgent::new(
            ScriptedGenerator::new(responses.iter().copied()),
            ToolRegistry::builtin(),
        )
    }

    #[tokio::test]
    async fn test_final_answer_is_trimmed() {
        let agent = agent(&["Thought: easy.\nFinal Answer:   It is sunny.  \n"]);
        assert_eq!(agent.run("Weather?").await.unwrap(), "It is sunny.");
    }

    #[tokio::test]
    async fn test_tool_call_then_answer() {
        let agent = agent(&[WEATHER_CALL, "Final Answer: Sunny and cold in Paris."]);

        let outcome = agent.run_detailed("What's the weather in Paris?").await.unwrap();
        assert_eq!(outcome.answer, "Sunny and cold in Paris.");
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.tool_calls[0].action, "get_weather");

        let requests = agent.generator().requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].prompt.ends_with(
            "```\n\nObservation: the weather in Paris is sunny with low temperatures.\n\n"
        ));
        assert!(outcome
            .transcript
            .as_str()
            .ends_with("Final Answer: Sunny and cold in Paris."));
    }

    #[tokio::test]
    async fn test_requests_use_loop_config() {
        let agent = agent(&["Final Answer: ok"]);
        agent.run("hi").await.unwrap();

        let request = &agent.generator().requests()[0];
        assert_eq!(request.max_new_tokens, 50);
        assert_eq!(request.stop, vec!["Observation:".to_string(), "User:".to_string()]);
        assert!(request.prompt.ends_with("User: hi\nAssistant: Let me check that for you.\n"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let agent = agent(&[
            "```\n{\"action\": \"get_time\", \"action_input\": {\"zone\": \"UTC\"}}\n```",
        ]);

        let err = agent.run("What time is it?").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolUnknown);
        assert!(err.to_string().contains("Unknown tool"));
        assert_eq!(agent.generator().call_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_in_fence() {
        let agent = agent(&["Action:\n```\n{\"action\": get_weather\n```"]);

        let err = agent.run("Weather?").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailed);
        assert!(err.to_string().contains("invalid tool call"));
    }

    #[tokio::test]
    async fn test_tool_failure_aborts() {
        let agent = agent(&["```\n{\"action\": \"get_weather\", \"action_input\": {}}\n```"]);

        let err = agent.run("Weather?").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolFailed);
        assert!(err.message().contains("location"));
    }

    #[tokio::test]
    async fn test_idle_continuations_are_skipped() {
        let agent = agent(&[
            "Thought: I should look this up.",
            "Still thinking...",
            "Final Answer: done",
        ]);

        let outcome = agent.run_detailed("hi").await.unwrap();
        assert_eq!(outcome.answer, "done");
        assert_eq!(outcome.iterations, 3);
        assert!(outcome.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let agent = ToolAgent::new(
            ScriptedGenerator::repeating("Hmm, let me think."),
            ToolRegistry::builtin(),
        )
        .with_config(ToolLoopConfig {
            max_iterations: 4,
            ..Default::default()
        });

        let err = agent.run("hi").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IterationLimitExceeded);
        assert_eq!(agent.generator().call_count(), 4);
    }

    #[tokio::test]
    async fn test_zero_iterations_rejected() {
        let agent = agent(&["Final Answer: never asked"]).with_config(ToolLoopConfig {
            max_iterations: 0,
            ..Default::default()
        });

        let err = agent.run("hi").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(agent.generator().call_count(), 0);
    }

    #[tokio::test]
    async fn test_prompt_never_shrinks() {
        let agent = agent(&[
            "Thought: hmm",
            WEATHER_CALL,
            WEATHER_CALL,
            "Final Answer: sunny",
        ]);
        agent.run("Weather in Paris?").await.unwrap();

        let prompts: Vec<String> = agent
            .generator()
            .requests()
            .into_iter()
            .map(|r| r.prompt)
            .collect();
        for pair in prompts.windows(2) {
            assert!(pair[1].starts_with(&pair[0]));
            assert!(pair[1].len() > pair[0].len());
        }
    }

    #[tokio::test]
    async fn test_generation_error_propagates() {
        let agent = agent(&[]);

        let err = agent.run("hi").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InferenceFailed);
        assert!(err.context().iter().any(|(k, v)| *k == "iteration" && v == "1"));
    }

    #[tokio::test]
    async fn test_injected_registry() {
        let registry = ToolRegistry::new().with_tool(FnTool::new(
            "echo",
            "Repeat the input",
            serde_json::json!({ "text": { "type": "string" } }),
            |args| Ok(args.get("text").cloned().unwrap_or_default()),
        ));
        let agent = ToolAgent::new(
            ScriptedGenerator::new([
                "```\n{\"action\": \"echo\", \"action_input\": {\"text\": \"ping\"}}\n```",
                "Final Answer: ping",
            ]),
            registry,
        );

        assert_eq!(agent.run("say ping").await.unwrap(), "ping");
        assert!(agent.generator().requests()[1].prompt.contains("\nObservation: ping\n"));

        let err = ToolAgent::new(
            ScriptedGenerator::new([WEATHER_CALL]),
            ToolRegistry::new(),
        )
        .run("Weather?")
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolUnknown);
    }

    #[test]
    fn test_system_prompt_describes_tools() {
        let agent = agent(&[]);
        let prompt = agent.system_prompt();

        assert!(prompt.contains("- get_weather: Get the current weather in a given location."));
        assert!(prompt.contains(r#"{"action":"get_weather","action_input":{"location":"LOCATION"}}"#));
        assert!(prompt.ends_with("Then wait for the Observation and provide a Final Answer."));
    }

    #[test]
    fn test_format_prompt_is_deterministic() {
        let agent = agent(&[]);
        assert_eq!(agent.format_prompt("hello"), agent.format_prompt("hello"));
    }
}
