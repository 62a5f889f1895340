//! read_file tool - read a slice of a file with line numbers

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use super::run_blocking;
use crate::tools::traits::parse_input;
use crate::tools::{Tool, ToolContext, ToolError, ToolResult};

#[derive(Debug, Deserialize)]
struct ReadFileRequest {
    file_path: String,
    start_line: i64,
    #[serde(default)]
    limit: Option<i64>,
}

/// Read a file's contents with line numbers
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read a slice of a text file. Each output line is prefixed with its 1-based line number, \
         right-aligned to 6 columns and followed by `|` (e.g. `     1|content`)."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Absolute path to a file inside the workspace"
                },
                "start_line": {
                    "type": "integer",
                    "description": "1-based line number to start reading from"
                },
                "limit": {
                    "type": "integer",
                    "description": "Max lines to read (omit to read to end of file)"
                }
            },
            "required": ["file_path", "start_line"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "ReadFileTool::execute: called");
        match self.read(input, ctx).await {
            Ok(content) => ToolResult::success(content),
            Err(e) => {
                debug!(%e, "ReadFileTool::execute: failed");
                e.into()
            }
        }
    }
}

impl ReadFileTool {
    async fn read(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let req: ReadFileRequest = parse_input(self.name(), input)?;

        if req.start_line < 1 {
            return Err(ToolError::InvalidArgument(
                "start_line must be greater than or equal to 1".to_string(),
            ));
        }
        let limit = match req.limit {
            Some(l) if l < 0 => {
                return Err(ToolError::InvalidArgument(
                    "limit must be omitted or a non-negative integer".to_string(),
                ));
            }
            Some(l) => Some(l as usize),
            None => None,
        };

        let path = ctx.validate_path("file_path", &req.file_path)?;
        let start_line = req.start_line as usize;
        debug!(?path, %start_line, ?limit, "ReadFileTool::read: validated");

        run_blocking(move || read_slice(&path, start_line, limit)).await
    }
}

/// Format lines `start_line..` (at most `limit`) as `{:>6}|text`
fn read_slice(path: &Path, start_line: usize, limit: Option<usize>) -> Result<String, ToolError> {
    if !path.exists() {
        return Err(ToolError::NotFound { path: path.to_path_buf() });
    }
    if !path.is_file() {
        return Err(ToolError::NotAFile { path: path.to_path_buf() });
    }

    let file = File::open(path).map_err(|e| ToolError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    for _ in 1..start_line {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).map_err(|e| ToolError::io(path, e))?;
        if n == 0 {
            debug!("read_slice: start_line is beyond end of file");
            return Ok(String::new());
        }
    }

    let mut lines = Vec::new();
    let mut line_no = start_line;
    while limit.is_none_or(|l| lines.len() < l) {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).map_err(|e| ToolError::io(path, e))?;
        if n == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&buf);
        lines.push(format!("{:>6}|{}", line_no, text.trim_end_matches(['\n', '\r'])));
        line_no += 1;
    }

    debug!(lines = lines.len(), "read_slice: done");
    Ok(lines.join("\n"))
}
