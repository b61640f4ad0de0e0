//! Text protocol spoken by the tool-calling agent
//!
//! The model requests a tool by emitting a fenced JSON block:
//!
//! ~~~text
//! Action:
//! ```
//! {"action": "get_weather", "action_input": {"location": "Paris"}}
//! ```
//! ~~~
//!
//! and ends the exchange with `Final Answer: <text>`. Everything here is a
//! pure function of the generated text.

use crate::tools::ToolArgs;
use serde::Deserialize;
use tinyagent_error::{Error, Result};

pub const FENCE: &str = "```";
pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";
pub const OBSERVATION_MARKER: &str = "Observation:";
pub const USER_MARKER: &str = "User:";

/// A tool call parsed from generated text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub action: String,
    pub action_input: ToolArgs,
}

#[derive(Debug, Deserialize)]
struct RawInvocation {
    action: String,
    action_input: serde_json::Map<String, serde_json::Value>,
}

/// Text after the last `Final Answer:` marker, trimmed
pub fn extract_final_answer(text: &str) -> Option<&str> {
    text.rfind(FINAL_ANSWER_MARKER)
        .map(|pos| text[pos + FINAL_ANSWER_MARKER.len()..].trim())
}

/// Contents of the first complete fenced block, trimmed.
///
/// An unterminated fence yields `None`. A leading `json` language tag is
/// dropped.
pub fn find_fenced_block(text: &str) -> Option<&str> {
    let start = text.find(FENCE)? + FENCE.len();
    let end = start + text[start..].find(FENCE)?;
    let inner = &text[start..end];

    let inner = match inner.strip_prefix("json") {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest,
        _ => inner,
    };
    Some(inner.trim())
}

/// Parse the tool invocation embedded in `text`.
///
/// `Ok(None)` when the text has no fenced block; an error when the block is
/// there but is not a valid invocation.
pub fn try_parse_invocation(text: &str) -> Result<Option<ToolInvocation>> {
    let Some(block) = find_fenced_block(text) else {
        return Ok(None);
    };

    let raw: RawInvocation = serde_json::from_str(block).map_err(|e| {
        Error::parse_failed(format!("invalid tool call: {}", e))
            .with_operation("protocol::parse_invocation")
            .with_context("block", block.to_string())
            .set_source(e)
    })?;

    let mut action_input = ToolArgs::new();
    for (key, value) in raw.action_input {
        let value = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            other => {
                return Err(Error::parse_failed(format!(
                    "argument '{}' must be a string, got {}",
                    key, other
                ))
                .with_operation("protocol::parse_invocation")
                .with_context("argument", key))
            }
        };
        action_input.insert(key, value);
    }

    Ok(Some(ToolInvocation {
        action: raw.action,
        action_input,
    }))
}

/// Lenient form of [`try_parse_invocation`]: any failure is `None`
pub fn parse_invocation(text: &str) -> Option<ToolInvocation> {
    try_parse_invocation(text).ok().flatten()
}

/// Render an observation the way it is folded back into the prompt
pub fn format_observation(result: &str) -> String {
    format!("\n{} {}\n", OBSERVATION_MARKER, result)
}
