//! grep tool - regex content search over the workspace

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use grep_searcher::sinks::Lossy;
use grep_matcher::LineTerminator;
use grep_searcher::{BinaryDetection, SearcherBuilder};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use super::run_blocking;
use crate::tools::filters::{ExcludedDirs, GlobSet, StringList, is_probably_binary, rel_posix};
use crate::tools::traits::parse_input;
use crate::tools::{Tool, ToolContext, ToolError, ToolResult};

fn default_case_sensitive() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct GrepRequest {
    patterns: StringList,
    #[serde(default)]
    root_dir: Option<String>,
    #[serde(default)]
    include_globs: Option<StringList>,
    #[serde(default)]
    exclude_dirs: Option<StringList>,
    #[serde(default)]
    exclude_globs: Option<StringList>,
    #[serde(default = "default_case_sensitive")]
    case_sensitive: bool,
    #[serde(default)]
    max_results: Option<i64>,
    #[serde(default)]
    max_file_size_kb: Option<i64>,
}

/// Grep tool - search file contents with one or more regexes
pub struct GrepTool;

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn description(&self) -> &'static str {
        "Search file contents under a directory using regular expressions. Provide multiple \
         patterns separated by newlines (never commas). Common vendor directories and binary \
         files are skipped. Each result is `/abs/path:line: [pattern] text`."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "patterns": {
                    "type": "string",
                    "description": "One or more regex patterns, newline-separated"
                },
                "root_dir": {
                    "type": "string",
                    "description": "Absolute directory to search under (default: workspace root)"
                },
                "include_globs": {
                    "type": "string",
                    "description": "File globs to include, comma or newline separated (e.g. `*.py,src/*`)"
                },
                "exclude_dirs": {
                    "type": "string",
                    "description": "Extra directory names to skip, comma or newline separated"
                },
                "exclude_globs": {
                    "type": "string",
                    "description": "Extra file globs to skip, comma or newline separated"
                },
                "case_sensitive": {
                    "type": "boolean",
                    "description": "Case-sensitive matching (default: true)",
                    "default": true
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of matching lines to return (default: 200)"
                },
                "max_file_size_kb": {
                    "type": "integer",
                    "description": "Skip files larger than this many KB (default: 2048)"
                }
            },
            "required": ["patterns"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "GrepTool::execute: called");
        let query = match GrepQuery::from_input(input, ctx) {
            Ok(q) => q,
            Err(e) => {
                debug!(%e, "GrepTool::execute: invalid request");
                return e.into();
            }
        };

        match run_blocking(move || Ok(query.run())).await {
            Ok(output) => ToolResult::success(output),
            Err(e) => e.into(),
        }
    }
}

/// A validated search, ready to run on a blocking thread
struct GrepQuery {
    root: PathBuf,
    workspace_root: PathBuf,
    patterns: Vec<(String, Regex)>,
    matcher: RegexMatcher,
    include: GlobSet,
    exclude: GlobSet,
    exclude_dirs: ExcludedDirs,
    max_results: usize,
    max_file_bytes: u64,
    sniff_bytes: usize,
}

impl GrepQuery {
    fn from_input(input: Value, ctx: &ToolContext) -> Result<Self, ToolError> {
        let req: GrepRequest = parse_input("grep", input)?;

        let raw_patterns = req.patterns.values(false);
        if raw_patterns.is_empty() {
            return Err(ToolError::InvalidArgument(
                "patterns must be a non-empty string (optionally newline-separated)".to_string(),
            ));
        }

        let max_results = req.max_results.unwrap_or(ctx.search.grep_max_results as i64);
        if max_results <= 0 {
            return Err(ToolError::InvalidArgument("max_results must be greater than 0".to_string()));
        }
        let max_file_size_kb = req
            .max_file_size_kb
            .unwrap_or(ctx.search.grep_max_file_size_kb as i64);
        if max_file_size_kb <= 0 {
            return Err(ToolError::InvalidArgument(
                "max_file_size_kb must be greater than 0".to_string(),
            ));
        }

        let root = ctx.validate_dir("root_dir", req.root_dir.as_deref())?;
        debug!(?root, "GrepQuery::from_input: root validated");

        let patterns = compile_patterns(raw_patterns, req.case_sensitive)?;
        let matcher = build_matcher(&patterns, req.case_sensitive)?;

        let include_globs = req.include_globs.map(|l| l.values(true)).unwrap_or_default();
        let include = GlobSet::compile(&include_globs)?;

        let mut exclude_globs = ctx.search.exclude_globs.clone();
        exclude_globs.extend(req.exclude_globs.map(|l| l.values(true)).unwrap_or_default());
        let exclude = GlobSet::compile(&exclude_globs)?;

        let exclude_dirs = ExcludedDirs::new(
            &ctx.search.exclude_dirs,
            req.exclude_dirs.map(|l| l.values(true)).unwrap_or_default(),
        );

        Ok(Self {
            root,
            workspace_root: ctx.workspace_root.clone(),
            patterns,
            matcher,
            include,
            exclude,
            exclude_dirs,
            max_results: max_results as usize,
            max_file_bytes: (max_file_size_kb as u64).saturating_mul(1024),
            sniff_bytes: ctx.search.binary_sniff_bytes,
        })
    }

    /// Scan every candidate file, stopping once `max_results` rows are collected
    fn run(&self) -> String {
        debug!(root = ?self.root, patterns = self.patterns.len(), "GrepQuery::run: called");
        let mut rows: Vec<String> = Vec::new();
        let mut matched_files = 0usize;

        for path in self.candidate_files() {
            let before = rows.len();
            let limit_hit = self.scan_file(&path, &mut rows);
            if rows.len() > before {
                matched_files += 1;
            }
            if limit_hit {
                debug!(matches = rows.len(), "GrepQuery::run: limit reached");
                return format!(
                    "Found {} matches (limit reached) in {} files under {}.\n{}",
                    rows.len(),
                    matched_files,
                    self.root.display(),
                    rows.join("\n")
                );
            }
        }

        if rows.is_empty() {
            debug!("GrepQuery::run: no matches");
            return format!("No matches found under {}.", self.root.display());
        }

        debug!(matches = rows.len(), %matched_files, "GrepQuery::run: done");
        format!(
            "Found {} matches in {} files under {}.\n{}",
            rows.len(),
            matched_files,
            self.root.display(),
            rows.join("\n")
        )
    }

    fn candidate_files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !(e.file_type().is_dir() && self.exclude_dirs.contains(&e.file_name().to_string_lossy()))
            })
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(err) => {
                    warn!(%err, "GrepQuery::candidate_files: skipping unreadable entry");
                    None
                }
            })
            .filter(|e| !e.file_type().is_dir() && self.accepts(e))
            .map(DirEntry::into_path)
    }

    /// include-glob → exclude-glob → regular file → size → not binary
    fn accepts(&self, entry: &DirEntry) -> bool {
        let path = entry.path();
        let rel = rel_posix(path, &self.root);
        let name = entry.file_name().to_string_lossy();

        if !self.include.is_empty() && !self.include.matches_any(&rel, &name) {
            return false;
        }
        if self.exclude.matches_any(&rel, &name) {
            return false;
        }

        let meta = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                debug!(?path, %e, "GrepQuery::accepts: stat failed");
                return false;
            }
        };
        if !meta.is_file() {
            return false;
        }
        if entry.path_is_symlink() && !self.link_stays_inside(path) {
            debug!(?path, "GrepQuery::accepts: symlink leaves workspace, skipping");
            return false;
        }
        if meta.len() > self.max_file_bytes {
            debug!(?path, size = meta.len(), "GrepQuery::accepts: file too large");
            return false;
        }

        !is_probably_binary(path, self.sniff_bytes)
    }

    fn link_stays_inside(&self, path: &Path) -> bool {
        fs::canonicalize(path)
            .map(|target| target.starts_with(&self.workspace_root))
            .unwrap_or(false)
    }

    /// Append one row per (line, pattern) match; true once the limit is hit
    fn scan_file(&self, path: &Path, rows: &mut Vec<String>) -> bool {
        let mut searcher = SearcherBuilder::new()
            .binary_detection(BinaryDetection::none())
            .line_terminator(LineTerminator::crlf())
            .line_number(true)
            .build();

        let mut limit_hit = false;
        let result = searcher.search_path(
            &self.matcher,
            path,
            Lossy(|line_num, text| {
                for (offset, line) in text.lines().enumerate() {
                    let line_no = line_num as usize + offset;
                    for (raw, regex) in &self.patterns {
                        if !regex.is_match(line) {
                            continue;
                        }
                        rows.push(format!("{}:{}: [{}] {}", path.display(), line_no, raw, line));
                        if rows.len() >= self.max_results {
                            limit_hit = true;
                            return Ok(false);
                        }
                    }
                }
                Ok(true)
            }),
        );

        if let Err(e) = result {
            warn!(?path, %e, "GrepQuery::scan_file: search failed");
        }
        limit_hit
    }
}

/// Compile every pattern up front so a bad one fails the whole call
fn compile_patterns(patterns: Vec<String>, case_sensitive: bool) -> Result<Vec<(String, Regex)>, ToolError> {
    patterns
        .into_iter()
        .map(|p| {
            RegexBuilder::new(&p)
                .multi_line(true)
                .case_insensitive(!case_sensitive)
                .build()
                .map(|re| (p.clone(), re))
                .map_err(|e| ToolError::MalformedInput(format!("invalid regex pattern `{}`: {}", p, e)))
        })
        .collect()
}

/// One line-oriented matcher for all patterns; hits are tagged per pattern in `scan_file`
///
/// CRLF mode lets `$` match before `\r\n`, so anchored patterns behave the
/// same on both line endings.
fn build_matcher(patterns: &[(String, Regex)], case_sensitive: bool) -> Result<RegexMatcher, ToolError> {
    let alternation = patterns
        .iter()
        .map(|(p, _)| format!("(?:{})", p))
        .collect::<Vec<_>>()
        .join("|");

    let mut builder = RegexMatcherBuilder::new();
    builder
        .case_insensitive(!case_sensitive)
        .multi_line(true)
        .crlf(true)
        .line_terminator(Some(b'\n'));

    builder.build(&alternation).map_err(|e| {
        // Name the pattern the line matcher refuses, e.g. one spelling out `\n`
        match patterns.iter().find_map(|(p, _)| builder.build(p).err().map(|err| (p, err))) {
            Some((p, err)) => ToolError::MalformedInput(format!("invalid regex pattern `{}`: {}", p, err)),
            None => ToolError::MalformedInput(format!("invalid regex pattern: {}", e)),
        }
    })
}
