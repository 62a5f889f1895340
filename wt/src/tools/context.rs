//! ToolContext - execution context and path sandbox for tools

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{BashConfig, Config, SearchConfig, TodoConfig};

use super::ToolError;

/// Symlink hops followed before a path is rejected as a loop
const MAX_SYMLINK_HOPS: usize = 40;

/// Execution context for tools - scoped to a single workspace root
///
/// The root is fixed for the lifetime of the context. Every path argument a
/// tool receives goes through [`ToolContext::validate_path`] before any
/// filesystem access, so tools cannot escape the workspace through `..`
/// segments or symlinks.
#[derive(Clone)]
pub struct ToolContext {
    /// Canonical workspace root - all file ops constrained here
    pub workspace_root: PathBuf,

    /// grep/glob defaults and exclusion sets
    pub search: SearchConfig,

    /// Shell command limits
    pub bash: BashConfig,

    /// Todo store settings
    pub todo: TodoConfig,
}

impl ToolContext {
    /// Create a context with default settings
    pub fn new(workspace_root: PathBuf) -> Self {
        debug!(?workspace_root, "ToolContext::new: called");
        Self::with_config(workspace_root, &Config::default())
    }

    /// Create a context using the search/bash/todo sections of `config`
    pub fn with_config(workspace_root: PathBuf, config: &Config) -> Self {
        debug!(?workspace_root, "ToolContext::with_config: called");
        let workspace_root = match workspace_root.canonicalize() {
            Ok(root) => root,
            Err(e) => {
                warn!(?workspace_root, %e, "ToolContext::with_config: cannot canonicalize root, using it as given");
                workspace_root
            }
        };
        Self {
            workspace_root,
            search: config.search.clone(),
            bash: config.bash.clone(),
            todo: config.todo.clone(),
        }
    }

    /// Validate a caller-supplied path (sandbox enforcement)
    ///
    /// The path must be absolute and must resolve, after following symlinks
    /// and collapsing `.`/`..`, to the workspace root or a descendant of it.
    /// Returns the resolved path.
    pub fn validate_path(&self, arg: &'static str, path: &str) -> Result<PathBuf, ToolError> {
        debug!(%arg, %path, "ToolContext::validate_path: called");
        let raw = Path::new(path);
        if !raw.is_absolute() {
            debug!("ToolContext::validate_path: path is not absolute");
            return Err(ToolError::InvalidPath {
                arg,
                path: path.to_string(),
            });
        }

        let resolved = resolve_path(raw).map_err(|e| ToolError::io(raw, e))?;

        if resolved.starts_with(&self.workspace_root) {
            debug!(?resolved, "ToolContext::validate_path: path is within workspace");
            Ok(resolved)
        } else {
            debug!(?resolved, "ToolContext::validate_path: sandbox violation detected");
            Err(ToolError::OutOfSandbox {
                arg,
                path: resolved,
                root: self.workspace_root.clone(),
            })
        }
    }

    /// Validate an optional path argument, defaulting to the workspace root
    pub fn validate_optional_path(&self, arg: &'static str, path: Option<&str>) -> Result<PathBuf, ToolError> {
        match path {
            Some(p) => self.validate_path(arg, p),
            None => {
                debug!(%arg, "ToolContext::validate_optional_path: defaulting to workspace root");
                Ok(self.workspace_root.clone())
            }
        }
    }

    /// Validate a path that must name an existing directory
    pub fn validate_dir(&self, arg: &'static str, path: Option<&str>) -> Result<PathBuf, ToolError> {
        let dir = self.validate_optional_path(arg, path)?;
        if !dir.exists() {
            return Err(ToolError::NotFound { path: dir });
        }
        if !dir.is_dir() {
            return Err(ToolError::NotADirectory { path: dir });
        }
        Ok(dir)
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("workspace_root", &self.workspace_root)
            .finish()
    }
}

/// Resolve symlinks and `.`/`..` in an absolute path
///
/// Unlike `canonicalize`, the path does not need to exist: components past
/// the deepest existing ancestor are appended lexically. Dangling symlinks are
/// followed through their link target so a write cannot land outside the
/// resolved location.
pub(crate) fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    resolve_with_depth(path, 0)
}

fn resolve_with_depth(path: &Path, depth: usize) -> io::Result<PathBuf> {
    let mut resolved = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                resolved.push(name);
                let is_symlink = fs::symlink_metadata(&resolved)
                    .map(|m| m.file_type().is_symlink())
                    .unwrap_or(false);
                if is_symlink {
                    if depth >= MAX_SYMLINK_HOPS {
                        return Err(io::Error::other("too many levels of symbolic links"));
                    }
                    let target = fs::read_link(&resolved)?;
                    resolved.pop();
                    resolved = resolve_with_depth(&resolved.join(target), depth + 1)?;
                }
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ctx_for(temp: &tempfile::TempDir) -> ToolContext {
        ToolContext::new(temp.path().to_path_buf())
    }

    fn abs(temp: &tempfile::TempDir, rel: &str) -> String {
        temp.path().join(rel).to_string_lossy().to_string()
    }

    #[test]
    fn test_validate_path_within_workspace() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("test.txt"), "content").unwrap();
        let ctx = ctx_for(&temp);

        let result = ctx.validate_path("file_path", &abs(&temp, "test.txt")).unwrap();
        assert_eq!(result, ctx.workspace_root.join("test.txt"));
    }

    #[test]
    fn test_validate_root_itself() {
        let temp = tempdir().unwrap();
        let ctx = ctx_for(&temp);

        let result = ctx.validate_path("path", &temp.path().to_string_lossy()).unwrap();
        assert_eq!(result, ctx.workspace_root);
    }

    #[test]
    fn test_validate_relative_path_rejected() {
        let temp = tempdir().unwrap();
        let ctx = ctx_for(&temp);

        let result = ctx.validate_path("file_path", "test.txt");
        assert!(matches!(result.unwrap_err(), ToolError::InvalidPath { .. }));
    }

    #[test]
    fn test_validate_path_outside_workspace() {
        let temp = tempdir().unwrap();
        let ctx = ctx_for(&temp);

        let result = ctx.validate_path("file_path", "/etc/passwd");
        assert!(matches!(result.unwrap_err(), ToolError::OutOfSandbox { .. }));
    }

    #[test]
    fn test_validate_dotdot_escape() {
        let temp = tempdir().unwrap();
        let ctx = ctx_for(&temp);

        let result = ctx.validate_path("file_path", &abs(&temp, "sub/../../escape.txt"));
        assert!(matches!(result.unwrap_err(), ToolError::OutOfSandbox { .. }));
    }

    #[test]
    fn test_validate_dotdot_staying_inside() {
        let temp = tempdir().unwrap();
        let ctx = ctx_for(&temp);

        let result = ctx.validate_path("file_path", &abs(&temp, "a/b/../c.txt")).unwrap();
        assert_eq!(result, ctx.workspace_root.join("a").join("c.txt"));
    }

    #[test]
    fn test_validate_new_file_path() {
        let temp = tempdir().unwrap();
        let ctx = ctx_for(&temp);

        let result = ctx.validate_path("file_path", &abs(&temp, "nested/new_file.txt"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_sibling_prefix_rejected() {
        let parent = tempdir().unwrap();
        let root = parent.path().join("ws");
        let sibling = parent.path().join("ws2");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&sibling).unwrap();
        let ctx = ToolContext::new(root);

        let result = ctx.validate_path("file_path", &sibling.join("a.txt").to_string_lossy());
        assert!(matches!(result.unwrap_err(), ToolError::OutOfSandbox { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_symlink_escape() {
        let temp = tempdir().unwrap();
        let outside = tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("link")).unwrap();
        let ctx = ctx_for(&temp);

        let result = ctx.validate_path("file_path", &abs(&temp, "link/secret.txt"));
        assert!(matches!(result.unwrap_err(), ToolError::OutOfSandbox { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_dangling_symlink_escape() {
        let temp = tempdir().unwrap();
        let outside = tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path().join("new.txt"), temp.path().join("dangling")).unwrap();
        let ctx = ctx_for(&temp);

        let result = ctx.validate_path("file_path", &abs(&temp, "dangling"));
        assert!(matches!(result.unwrap_err(), ToolError::OutOfSandbox { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_internal_symlink_allowed() {
        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("real")).unwrap();
        fs::write(temp.path().join("real/a.txt"), "a").unwrap();
        std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("alias")).unwrap();
        let ctx = ctx_for(&temp);

        let result = ctx.validate_path("file_path", &abs(&temp, "alias/a.txt")).unwrap();
        assert_eq!(result, ctx.workspace_root.join("real").join("a.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_symlink_loop_is_error() {
        let temp = tempdir().unwrap();
        std::os::unix::fs::symlink(temp.path().join("b"), temp.path().join("a")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("a"), temp.path().join("b")).unwrap();
        let ctx = ctx_for(&temp);

        let result = ctx.validate_path("file_path", &abs(&temp, "a"));
        assert!(matches!(result.unwrap_err(), ToolError::Io { .. }));
    }

    #[test]
    fn test_validate_dir_defaults_to_root() {
        let temp = tempdir().unwrap();
        let ctx = ctx_for(&temp);

        assert_eq!(ctx.validate_dir("root_dir", None).unwrap(), ctx.workspace_root);
    }

    #[cfg(unix)]
    #[test]
    fn test_root_is_canonicalized() {
        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("real")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("alias")).unwrap();

        let ctx = ToolContext::new(temp.path().join("alias"));

        assert_eq!(ctx.workspace_root, temp.path().join("real").canonicalize().unwrap());
    }

    #[test]
    fn test_missing_root_kept_as_given() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("not-created");

        let ctx = ToolContext::new(missing.clone());

        assert_eq!(ctx.workspace_root, missing);
    }

    #[test]
    fn test_validate_dir_rejects_file() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("f.txt"), "x").unwrap();
        let ctx = ctx_for(&temp);

        let result = ctx.validate_dir("root_dir", Some(&abs(&temp, "f.txt")));
        assert!(matches!(result.unwrap_err(), ToolError::NotADirectory { .. }));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn segment() -> impl Strategy<Value = String> {
            prop_oneof![3 => "[a-z]{1,8}", 1 => Just("..".to_string()), 1 => Just(".".to_string())]
        }

        proptest! {
            #[test]
            fn accepts_iff_never_climbs_above_root(segments in prop::collection::vec(segment(), 0..8)) {
                let temp = tempdir().unwrap();
                let ctx = ToolContext::new(temp.path().to_path_buf());

                let mut depth: i64 = 0;
                let mut escaped = false;
                for s in &segments {
                    match s.as_str() {
                        "." => {}
                        ".." => depth -= 1,
                        _ => depth += 1,
                    }
                    if depth < 0 {
                        escaped = true;
                    }
                }

                let mut candidate = ctx.workspace_root.clone();
                for s in &segments {
                    candidate.push(s);
                }

                let result = ctx.validate_path("file_path", &candidate.to_string_lossy());
                prop_assert_eq!(result.is_ok(), !escaped);
            }
        }
    }
}
