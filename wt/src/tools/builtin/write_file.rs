//! write_file tool - overwrite or create a file

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
struct WriteFileRequest {
    file_path: String,
    content: String,
}

/// Write content to a file, replacing it entirely
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Write a file, overwriting it entirely. Creates parent directories if needed. \
         Use edit_file for changes to an existing file."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Absolute path to a file inside the workspace"
                },
                "content": {
                    "type": "string",
                    "description": "Full content to write"
                }
            },
            "required": ["file_path", "content"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!("WriteFileTool::execute: called");
        let req: WriteFileRequest = match parse_input(self.name(), input) {
            Ok(r) => r,
            Err(e) => return e.into(),
        };
        debug!(content_len = %req.content.len(), "WriteFileTool::execute: request parsed");

        let full_path = match ctx.validate_path("file_path", &req.file_path) {
            Ok(p) => {
                debug!(?p, "WriteFileTool::execute: path validated");
                p
            }
            Err(e) => {
                debug!(%e, "WriteFileTool::execute: path validation failed");
                return e.into();
            }
        };

        let content = req.content;
        match run_blocking(move || write_file(&full_path, content.as_bytes())).await {
            Ok(()) => {
                info!(path = %req.file_path, "WriteFileTool::execute: file written");
                ToolResult::success(format!("write to `{}` successfully.", req.file_path))
            }
            Err(e) => {
                debug!(%e, "WriteFileTool::execute: write failed");
                e.into()
            }
        }
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), ToolError> {
    if let Some(parent) = path.parent() {
        if parent.exists() && !parent.is_dir() {
            return Err(ToolError::ParentNotDirectory {
                path: parent.to_path_buf(),
            });
        }
        if !parent.exists() {
            debug!(?parent, "write_file: creating parent directories");
            // Fails when an ancestor further up is a regular file
            fs::create_dir_all(parent).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotADirectory | std::io::ErrorKind::AlreadyExists => ToolError::ParentNotDirectory {
                    path: parent.to_path_buf(),
                },
                _ => ToolError::io(parent, e),
            })?;
        }
    }

    if path.is_dir() {
        return Err(ToolError::NotAFile { path: path.to_path_buf() });
    }

    write_atomic(path, contents).map_err(|e| ToolError::io(path, e))
}
