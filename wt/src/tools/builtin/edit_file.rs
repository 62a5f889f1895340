//! edit_file tool - replace one unique string in a file

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::run_blocking;
use crate::tools::atomic::write_atomic;
use crate::tools::traits::parse_input;
use crate::tools::{Tool, ToolContext, ToolError, ToolResult};

#[derive(Debug, Deserialize)]
struct EditFileRequest {
    file_path: String,
    old_content: String,
    new_content: String,
}

/// Replace a single, unique occurrence of a string in a file
pub struct EditFileTool;

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &'static str {
        "edit_file"
    }

    fn description(&self) -> &'static str {
        "Replace text in an existing file. `old_content` must occur exactly once in the file; \
         include enough surrounding context to make it unique. Use write_file to create files."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Absolute path to an existing file inside the workspace"
                },
                "old_content": {
                    "type": "string",
                    "description": "Exact text to replace; must be unique in the file"
                },
                "new_content": {
                    "type": "string",
                    "description": "Replacement text"
                }
            },
            "required": ["file_path", "old_content", "new_content"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!("EditFileTool::execute: called");
        let req: EditFileRequest = match parse_input(self.name(), input) {
            Ok(r) => r,
            Err(e) => return e.into(),
        };

        if req.old_content.is_empty() {
            debug!("EditFileTool::execute: empty old_content");
            return ToolError::InvalidArgument("old_content must not be empty".to_string()).into();
        }

        let full_path = match ctx.validate_path("file_path", &req.file_path) {
            Ok(p) => {
                debug!(?p, "EditFileTool::execute: path validated");
                p
            }
            Err(e) => {
                debug!(%e, "EditFileTool::execute: path validation failed");
                return e.into();
            }
        };

        let EditFileRequest {
            file_path,
            old_content,
            new_content,
        } = req;
        match run_blocking(move || replace_unique(&full_path, &old_content, &new_content)).await {
            Ok(()) => {
                info!(path = %file_path, "EditFileTool::execute: file edited");
                ToolResult::success(format!("edit `{}` successfully.", file_path))
            }
            Err(e) => {
                debug!(%e, "EditFileTool::execute: edit failed");
                e.into()
            }
        }
    }
}

/// Replace the single occurrence of `old` with `new`, rewriting the file in full
///
/// Occurrences are counted as literal, non-overlapping substrings.
fn replace_unique(path: &Path, old: &str, new: &str) -> Result<(), ToolError> {
    if !path.exists() {
        return Err(ToolError::NotFound { path: path.to_path_buf() });
    }
    if !path.is_file() {
        return Err(ToolError::NotAFile { path: path.to_path_buf() });
    }

    let content = fs::read_to_string(path).map_err(|e| ToolError::io(path, e))?;

    let count = content.matches(old).count();
    debug!(%count, "replace_unique: occurrence count");
    match count {
        0 => return Err(ToolError::PatternNotFound),
        1 => {}
        count => return Err(ToolError::PatternNotUnique { count }),
    }

    let updated = content.replacen(old, new, 1);
    write_atomic(path, updated.as_bytes()).map_err(|e| ToolError::io(path, e))
}
