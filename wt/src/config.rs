//! worktools configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default todo store file name, created in the workspace root
pub const DEFAULT_TODO_STORE_NAME: &str = ".agent_todo.json";

/// Main worktools configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workspace sandbox configuration
    pub workspace: WorkspaceConfig,

    /// grep/glob defaults and exclusion sets
    pub search: SearchConfig,

    /// Shell command limits
    pub bash: BashConfig,

    /// Todo store configuration
    pub todo: TodoConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .worktools.yml
        let local_config = PathBuf::from(".worktools.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/worktools/worktools.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("worktools").join("worktools.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Resolve the workspace root: explicit override, then config, then the current directory
    pub fn resolve_root(&self, override_root: Option<&PathBuf>) -> Result<PathBuf> {
        let root = match override_root.or(self.workspace.root.as_ref()) {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };

        root.canonicalize()
            .context(format!("Workspace root {} is not accessible", root.display()))
    }
}

/// Workspace sandbox configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory all sandboxed tools are confined to
    pub root: Option<PathBuf>,
}

/// Search engine defaults
///
/// The exclusion sets are heuristics; callers may replace them here or extend
/// them per call through the `exclude_dirs`/`exclude_globs` arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Directory names never descended into
    #[serde(rename = "exclude-dirs")]
    pub exclude_dirs: Vec<String>,

    /// File globs skipped by grep (binary, media, archives)
    #[serde(rename = "exclude-globs")]
    pub exclude_globs: Vec<String>,

    /// Bytes sniffed for a NUL when deciding a file is binary
    #[serde(rename = "binary-sniff-bytes")]
    pub binary_sniff_bytes: usize,

    /// Default grep result cap
    #[serde(rename = "grep-max-results")]
    pub grep_max_results: usize,

    /// Default grep per-file size limit in KB
    #[serde(rename = "grep-max-file-size-kb")]
    pub grep_max_file_size_kb: u64,

    /// Default glob result cap
    #[serde(rename = "glob-max-results")]
    pub glob_max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            exclude_dirs: [
                ".git",
                ".hg",
                ".svn",
                ".venv",
                "venv",
                "__pycache__",
                "node_modules",
                ".mypy_cache",
                ".pytest_cache",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            exclude_globs: [
                "*.pyc", "*.pyo", "*.png", "*.jpg", "*.jpeg", "*.gif", "*.pdf", "*.zip", "*.gz", "*.tar", "*.tgz",
                "*.woff", "*.woff2", "*.ico", "*.mp4", "*.mp3", "*.mov", "*.sqlite", "*.db",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            binary_sniff_bytes: 2048,
            grep_max_results: 200,
            grep_max_file_size_kb: 2048,
            glob_max_results: 500,
        }
    }
}

/// Shell command limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BashConfig {
    /// Upper bound applied to caller-supplied timeouts
    #[serde(rename = "max-timeout-secs")]
    pub max_timeout_secs: u64,
}

impl Default for BashConfig {
    fn default() -> Self {
        Self { max_timeout_secs: 600 }
    }
}

/// Todo store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoConfig {
    /// File name of the default store inside the workspace root
    #[serde(rename = "store-name")]
    pub store_name: String,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            store_name: DEFAULT_TODO_STORE_NAME.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.search.exclude_dirs.contains(&".git".to_string()));
        assert!(config.search.exclude_dirs.contains(&"node_modules".to_string()));
        assert!(config.search.exclude_globs.contains(&"*.png".to_string()));
        assert_eq!(config.search.binary_sniff_bytes, 2048);
        assert_eq!(config.search.grep_max_results, 200);
        assert_eq!(config.search.glob_max_results, 500);
        assert_eq!(config.bash.max_timeout_secs, 600);
        assert_eq!(config.todo.store_name, ".agent_todo.json");
    }

    #[test]
    fn test_load_partial_yaml_keeps_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("worktools.yml");
        fs::write(
            &path,
            "search:\n  grep-max-results: 10\n  exclude-dirs: [target]\nbash:\n  max-timeout-secs: 30\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.search.grep_max_results, 10);
        assert_eq!(config.search.exclude_dirs, vec!["target".to_string()]);
        assert_eq!(config.search.glob_max_results, 500);
        assert_eq!(config.bash.max_timeout_secs, 30);
        assert_eq!(config.todo.store_name, DEFAULT_TODO_STORE_NAME);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_resolve_root_prefers_override() {
        let temp = tempdir().unwrap();
        let config = Config {
            workspace: WorkspaceConfig {
                root: Some(PathBuf::from("/definitely/not/here")),
            },
            ..Default::default()
        };

        let root = config.resolve_root(Some(&temp.path().to_path_buf())).unwrap();
        assert_eq!(root, temp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_root_missing_dir_fails() {
        let config = Config {
            workspace: WorkspaceConfig {
                root: Some(PathBuf::from("/definitely/not/here")),
            },
            ..Default::default()
        };

        assert!(config.resolve_root(None).is_err());
    }
}
