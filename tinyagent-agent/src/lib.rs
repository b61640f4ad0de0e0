//! # tinyagent
//!
//! Two small agents over a text generator:
//!
//! - [`ToolAgent`] runs the tool loop: generate, look for `Final Answer:` or a
//!   fenced JSON tool call, execute the tool, append the `Observation:` and
//!   generate again, bounded by `max_iterations`.
//! - [`ChatAgent`] keeps a plain user / assistant transcript and feeds it to
//!   the generator on every turn.
//!
//! Tools live in an injected [`ToolRegistry`]; the text protocol is in
//! [`protocol`] as pure functions.

mod conversation;
pub mod protocol;
mod tool_loop;
mod tools;

pub use conversation::{format_history, ChatAgent, ChatConfig, Message, Role};
pub use protocol::{parse_invocation, try_parse_invocation, ToolInvocation};
pub use tool_loop::{RunOutcome, ToolAgent, ToolLoopConfig, Transcript};
pub use tools::{required_arg, FnTool, GetWeather, Tool, ToolArgs, ToolDefinition, ToolRegistry};
