//! glob tool - find files and directories matching a pattern

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use glob::Pattern;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::run_blocking;
use crate::tools::context::resolve_path;
use crate::tools::filters::ExcludedDirs;
use crate::tools::traits::parse_input;
use crate::tools::{Tool, ToolContext, ToolError, ToolResult};

#[derive(Debug, Deserialize)]
struct GlobRequest {
    pattern: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    max_results: Option<i64>,
}

/// Find paths matching a glob pattern
pub struct GlobTool;

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &'static str {
        "glob"
    }

    fn description(&self) -> &'static str {
        "Find files under a directory using a glob pattern (`*`, `?`, `**`). A pattern containing \
         `/` is matched as a path relative to `path` (e.g. `src/**/*.jsx`); otherwise it is \
         matched recursively against names (e.g. `*.py`). Returns absolute paths."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Glob pattern, e.g. `**/*.ts` or `*.py`"
                },
                "path": {
                    "type": "string",
                    "description": "Absolute directory to search under (default: workspace root)"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of paths to return (default: 500)"
                }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "GlobTool::execute: called");
        let query = match GlobQuery::from_input(input, ctx) {
            Ok(q) => q,
            Err(e) => {
                debug!(%e, "GlobTool::execute: invalid request");
                return e.into();
            }
        };

        match run_blocking(move || query.run()).await {
            Ok(output) => ToolResult::success(output),
            Err(e) => {
                debug!(%e, "GlobTool::execute: glob failed");
                e.into()
            }
        }
    }
}

struct GlobQuery {
    root: PathBuf,
    workspace_root: PathBuf,
    pattern: String,
    exclude_dirs: ExcludedDirs,
    max_results: usize,
}

impl GlobQuery {
    fn from_input(input: Value, ctx: &ToolContext) -> Result<Self, ToolError> {
        let req: GlobRequest = parse_input("glob", input)?;

        let pattern = req.pattern.trim().replace('\\', "/");
        if pattern.is_empty() {
            return Err(ToolError::InvalidArgument("pattern must be a non-empty string".to_string()));
        }

        let max_results = req.max_results.unwrap_or(ctx.search.glob_max_results as i64);
        if max_results <= 0 {
            return Err(ToolError::InvalidArgument("max_results must be greater than 0".to_string()));
        }

        let root = ctx.validate_dir("path", req.path.as_deref())?;
        debug!(?root, %pattern, "GlobQuery::from_input: validated");

        Ok(Self {
            root,
            workspace_root: ctx.workspace_root.clone(),
            pattern,
            exclude_dirs: ExcludedDirs::new(&ctx.search.exclude_dirs, Vec::new()),
            max_results: max_results as usize,
        })
    }

    fn run(&self) -> Result<String, ToolError> {
        let mut found = Vec::new();
        let limit_hit = if self.pattern.contains('/') {
            self.match_paths(&mut found)?
        } else {
            self.match_names(&mut found)?
        };
        debug!(count = found.len(), %limit_hit, "GlobQuery::run: done");

        let listing = found
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        let root = self.root.display();
        Ok(if limit_hit {
            format!("Found {} files (limit reached) under {}.\n{}", found.len(), root, listing)
        } else if found.is_empty() {
            format!("No files matched under {}.", root)
        } else {
            format!("Found {} files under {}.\n{}", found.len(), root, listing)
        })
    }

    /// Pattern relative to the root, e.g. `src/**/*.rs`
    fn match_paths(&self, found: &mut Vec<PathBuf>) -> Result<bool, ToolError> {
        let full = format!(
            "{}/{}",
            Pattern::escape(&self.root.to_string_lossy()),
            self.pattern.trim_start_matches('/')
        );
        debug!(%full, "GlobQuery::match_paths: called");

        let paths = glob::glob(&full).map_err(|e| self.invalid(e))?;
        for entry in paths {
            let path = match entry {
                Ok(p) => p,
                Err(e) => {
                    warn!(%e, "GlobQuery::match_paths: skipping unreadable path");
                    continue;
                }
            };
            let excluded = path
                .strip_prefix(&self.root)
                .ok()
                .and_then(Path::parent)
                .is_some_and(|parent| {
                    self.exclude_dirs
                        .any_segment(parent.components().map(|c| c.as_os_str().to_str().unwrap_or_default()))
                });
            if excluded || !self.keep(&path) {
                continue;
            }
            found.push(path);
            if found.len() >= self.max_results {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Name pattern applied recursively, e.g. `*.py`
    fn match_names(&self, found: &mut Vec<PathBuf>) -> Result<bool, ToolError> {
        let pattern = Pattern::new(&self.pattern).map_err(|e| self.invalid(e))?;
        debug!("GlobQuery::match_names: called");

        let mut walker = WalkDir::new(&self.root).min_depth(1).sort_by_file_name().into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(%e, "GlobQuery::match_names: skipping unreadable entry");
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy();
            // An excluded directory may match itself; its contents never do
            let prune = entry.file_type().is_dir() && self.exclude_dirs.contains(&name);

            if pattern.matches(&name) && self.keep(entry.path()) {
                found.push(entry.path().to_path_buf());
                if found.len() >= self.max_results {
                    return Ok(true);
                }
            }
            if prune {
                debug!(path = ?entry.path(), "GlobQuery::match_names: pruning excluded dir");
                walker.skip_current_dir();
            }
        }
        Ok(false)
    }

    /// Regular files and directories whose resolved location stays in the workspace
    fn keep(&self, path: &Path) -> bool {
        let is_candidate = fs::metadata(path)
            .map(|m| m.is_file() || m.is_dir())
            .unwrap_or(false);
        is_candidate
            && resolve_path(path)
                .map(|resolved| resolved.starts_with(&self.workspace_root))
                .unwrap_or(false)
    }

    fn invalid(&self, e: glob::PatternError) -> ToolError {
        ToolError::MalformedInput(format!("invalid glob pattern `{}`: {}", self.pattern, e))
    }
}
