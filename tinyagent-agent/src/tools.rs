//! Tool registry and executor

use serde::Serialize;
use std::collections::BTreeMap;
use tinyagent_error::{Error, Result};

/// Arguments handed to a tool, as parsed from `action_input`
pub type ToolArgs = BTreeMap<String, String>;

/// A locally executed tool the model can ask for.
///
/// Tools are plain synchronous functions of their arguments.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Argument schema, one entry per argument: `{"location": {"type": "string"}}`
    fn parameters(&self) -> serde_json::Value;

    fn call(&self, args: &ToolArgs) -> Result<String>;
}

/// Name, description and argument schema of a registered tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Fetch a required argument or fail with `InvalidArgument`
pub fn required_arg<'a>(args: &'a ToolArgs, key: &str) -> Result<&'a str> {
    args.get(key).map(String::as_str).ok_or_else(|| {
        Error::invalid_argument(format!("missing argument '{}'", key))
            .with_context("argument", key.to_string())
    })
}

// ============================================================================
// Built-in tools
// ============================================================================

/// Canned weather report for a location
#[derive(Debug, Default, Clone, Copy)]
pub struct GetWeather;

impl Tool for GetWeather {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather in a given location"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({ "location": { "type": "string" } })
    }

    fn call(&self, args: &ToolArgs) -> Result<String> {
        let location = required_arg(args, "location")?;
        Ok(format!(
            "the weather in {} is sunny with low temperatures.\n",
            location
        ))
    }
}

/// Adapter turning a closure into a [`Tool`]
pub struct FnTool<F> {
    name: String,
    description: String,
    parameters: serde_json::Value,
    func: F,
}

impl<F> FnTool<F>
where
    F: Fn(&ToolArgs) -> Result<String> + Send + Sync,
{
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
        func: F,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            func,
        }
    }
}

impl<F> Tool for FnTool<F>
where
    F: Fn(&ToolArgs) -> Result<String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> serde_json::Value {
        self.parameters.clone()
    }

    fn call(&self, args: &ToolArgs) -> Result<String> {
        (self.func)(args)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Name -> tool mapping, built once and handed to the agent.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in tools (`get_weather`)
    pub fn builtin() -> Self {
        Self::new().with_tool(GetWeather)
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    /// Register a tool, replacing any previous tool with the same name
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters(),
            })
            .collect()
    }

    /// One line per tool: `- name: description. Arguments: {schema}`
    pub fn catalogue(&self) -> String {
        self.definitions()
            .iter()
            .map(|d| format!("- {}: {}. Arguments: {}", d.name, d.description, d.parameters))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run the named tool.
    ///
    /// Unknown names fail with `ToolUnknown`; any failure inside the tool is
    /// reported as `ToolFailed` with the original error as source.
    pub fn execute(&self, name: &str, args: &ToolArgs) -> Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::unknown_tool(name).with_operation("tools::execute"))?;

        tool.call(args).map_err(|e| {
            Error::tool_failed(name, e.message().to_string())
                .with_operation("tools::execute")
                .set_source(e)
        })
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}
