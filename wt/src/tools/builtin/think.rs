//! think tool - record a reasoning note without side effects

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::tools::traits::parse_input;
use crate::tools::{Tool, ToolContext, ToolResult};

#[derive(Debug, Deserialize)]
struct ThinkRequest {
    thought: String,
}

/// Capture intermediate reasoning in the log; returns nothing to the model
pub struct ThinkTool;

#[async_trait]
impl Tool for ThinkTool {
    fn name(&self) -> &'static str {
        "think"
    }

    fn description(&self) -> &'static str {
        "Record an internal thought or short working note. Does not read files, run commands, \
         or fetch new information."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "thought": {
                    "type": "string",
                    "description": "The note to record"
                }
            },
            "required": ["thought"]
        })
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> ToolResult {
        debug!("ThinkTool::execute: called");
        let req: ThinkRequest = match parse_input(self.name(), input) {
            Ok(r) => r,
            Err(e) => return e.into(),
        };
        info!(thought = %req.thought, "ThinkTool::execute: thought recorded");
        ToolResult::success(String::new())
    }
}
