//! Filtering primitives shared by the grep and glob tools

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use glob::Pattern;
use serde::Deserialize;
use tracing::{debug, warn};

use super::ToolError;

/// A list argument accepted either as a JSON array or a delimited string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    Many(Vec<String>),
    One(String),
}

impl StringList {
    /// Trimmed, non-empty values
    ///
    /// A single string is split on newlines, and also on commas when
    /// `split_commas` is set. Regex patterns must never be comma-split.
    pub fn values(&self, split_commas: bool) -> Vec<String> {
        match self {
            StringList::Many(values) => values
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
            StringList::One(raw) => split_values(raw, split_commas),
        }
    }
}

/// Split a delimited string into trimmed, non-empty values
pub fn split_values(raw: &str, split_commas: bool) -> Vec<String> {
    raw.lines()
        .flat_map(|line| {
            if split_commas {
                line.split(',').collect::<Vec<_>>()
            } else {
                vec![line]
            }
        })
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Directory names that are never descended into
#[derive(Debug, Clone, Default)]
pub struct ExcludedDirs {
    names: HashSet<String>,
}

impl ExcludedDirs {
    /// Build from the configured defaults plus caller extras
    pub fn new<'a>(defaults: impl IntoIterator<Item = &'a String>, extra: impl IntoIterator<Item = String>) -> Self {
        let mut names: HashSet<String> = defaults.into_iter().cloned().collect();
        names.extend(extra);
        Self { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// True if any of the given path segments is an excluded name
    pub fn any_segment<'a>(&self, mut segments: impl Iterator<Item = &'a str>) -> bool {
        segments.any(|s| self.contains(s))
    }
}

/// A compiled set of shell-style globs
#[derive(Debug, Clone, Default)]
pub struct GlobSet {
    patterns: Vec<Pattern>,
}

impl GlobSet {
    /// Compile globs, failing on the first invalid one
    pub fn compile<'a>(globs: impl IntoIterator<Item = &'a String>) -> Result<Self, ToolError> {
        let mut patterns = Vec::new();
        for g in globs {
            let pattern = Pattern::new(g)
                .map_err(|e| ToolError::MalformedInput(format!("invalid glob pattern `{}`: {}", g, e)))?;
            patterns.push(pattern);
        }
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True if any glob matches the relative path or the bare file name
    pub fn matches_any(&self, rel_path: &str, name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(rel_path) || p.matches(name))
    }
}

/// Probably-binary heuristic: a NUL byte within the first `sniff_bytes` bytes
///
/// Unreadable files count as binary so they are skipped rather than scanned.
pub fn is_probably_binary(path: &Path, sniff_bytes: usize) -> bool {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!(?path, %e, "is_probably_binary: cannot open, treating as binary");
            return true;
        }
    };

    let mut chunk = Vec::with_capacity(sniff_bytes);
    if let Err(e) = file.take(sniff_bytes as u64).read_to_end(&mut chunk) {
        warn!(?path, %e, "is_probably_binary: read failed, treating as binary");
        return true;
    }

    let binary = chunk.contains(&0);
    debug!(?path, %binary, "is_probably_binary: sniffed");
    binary
}

/// Path relative to `root` with `/` separators, for glob matching and display
pub fn rel_posix(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
