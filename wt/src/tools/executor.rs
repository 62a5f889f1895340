//! ToolExecutor - dispatches tool calls by name

use std::collections::BTreeMap;
use tracing::debug;

use super::builtin::{
    EditFileTool, GlobTool, GrepTool, ReadFileTool, RunCommandTool, ThinkTool, TodoTool, WriteFileTool,
};
use super::{Tool, ToolCall, ToolContext, ToolDefinition, ToolError, ToolResult};

/// Tool profiles define which tools are available to a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolProfile {
    /// Every workspace tool
    #[default]
    Full,
    /// Read and search only (no shell, writes, edits or todo changes)
    ReadOnly,
}

/// Registry of tools, keyed by name
pub struct ToolExecutor {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolExecutor {
    /// Create executor with standard tools (full profile)
    pub fn standard() -> Self {
        Self::with_profile(ToolProfile::Full)
    }

    /// Create executor with a specific tool profile
    pub fn with_profile(profile: ToolProfile) -> Self {
        debug!(?profile, "ToolExecutor::with_profile: called");
        let mut executor = Self::empty();

        executor.add_tool(Box::new(ReadFileTool));
        executor.add_tool(Box::new(GrepTool));
        executor.add_tool(Box::new(GlobTool));
        executor.add_tool(Box::new(ThinkTool));

        if profile == ToolProfile::Full {
            executor.add_tool(Box::new(RunCommandTool));
            executor.add_tool(Box::new(WriteFileTool));
            executor.add_tool(Box::new(EditFileTool));
            executor.add_tool(Box::new(TodoTool));
        }

        executor
    }

    /// Create executor with read-only tools (for exploration)
    pub fn read_only() -> Self {
        Self::with_profile(ToolProfile::ReadOnly)
    }

    /// Create an empty executor
    pub fn empty() -> Self {
        debug!("ToolExecutor::empty: called");
        Self { tools: BTreeMap::new() }
    }

    /// Add a tool, replacing any tool with the same name
    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        debug!(tool_name = %tool.name(), "ToolExecutor::add_tool: called");
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Tool definitions for the host's function-calling protocol, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        debug!("ToolExecutor::definitions: called");
        self.tools.values().map(|t| definition(t.as_ref())).collect()
    }

    /// Definitions for a subset of tools; unknown names are skipped
    pub fn definitions_for(&self, tool_names: &[String]) -> Vec<ToolDefinition> {
        debug!(?tool_names, "ToolExecutor::definitions_for: called");
        tool_names
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| definition(t.as_ref()))
            .collect()
    }

    /// Execute a tool call
    pub async fn execute(&self, tool_call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        debug!(tool_name = %tool_call.name, tool_id = %tool_call.id, "ToolExecutor::execute: called");
        match self.tools.get(&tool_call.name) {
            Some(tool) => {
                debug!("ToolExecutor::execute: tool found, executing");
                tool.execute(tool_call.input.clone(), ctx).await
            }
            None => {
                debug!("ToolExecutor::execute: unknown tool");
                ToolError::UnknownTool {
                    name: tool_call.name.clone(),
                }
                .into()
            }
        }
    }

    /// Execute tool calls one after another, pairing each result with its call id
    pub async fn execute_all(&self, tool_calls: &[ToolCall], ctx: &ToolContext) -> Vec<(String, ToolResult)> {
        debug!(count = %tool_calls.len(), "ToolExecutor::execute_all: called");
        let mut results = Vec::with_capacity(tool_calls.len());

        for call in tool_calls {
            let result = self.execute(call, ctx).await;
            results.push((call.id.clone(), result));
        }

        debug!("ToolExecutor::execute_all: completed all tools");
        results
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::standard()
    }
}

fn definition(tool: &dyn Tool) -> ToolDefinition {
    ToolDefinition {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        input_schema: tool.input_schema(),
    }
}
