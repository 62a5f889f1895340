//! bash tool - execute shell commands with a timeout

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::tools::traits::parse_input;
use crate::tools::{Tool, ToolContext, ToolError, ToolResult};

#[derive(Debug, Deserialize)]
struct RunCommandRequest {
    shell_command: String,
    timeout: i64,
}

/// Execute a shell command in the workspace root
pub struct RunCommandTool;

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &'static str {
        "bash"
    }

    fn description(&self) -> &'static str {
        "Execute a shell command for terminal operations like git, build tools, and tests. \
         Do not use it for reading, writing, or editing files; use the file tools instead."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "shell_command": {
                    "type": "string",
                    "description": "Shell command to execute"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Timeout in seconds (max 600)"
                }
            },
            "required": ["shell_command", "timeout"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "RunCommandTool::execute: called");
        let req: RunCommandRequest = match parse_input(self.name(), input) {
            Ok(r) => r,
            Err(e) => return e.into(),
        };

        if req.timeout <= 0 {
            debug!("RunCommandTool::execute: non-positive timeout");
            return ToolError::InvalidArgument("timeout must be greater than 0".to_string()).into();
        }

        let timeout_secs = (req.timeout as u64).min(ctx.bash.max_timeout_secs);
        debug!(%timeout_secs, "RunCommandTool::execute: effective timeout");

        match run_shell(&req.shell_command, timeout_secs, ctx).await {
            Ok(result) => result,
            Err(e) => {
                debug!(%e, "RunCommandTool::execute: command did not complete");
                e.into()
            }
        }
    }
}

async fn run_shell(command: &str, timeout_secs: u64, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(&ctx.workspace_root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group, so a timeout can take down everything the shell spawned
    #[cfg(unix)]
    cmd.process_group(0);

    debug!(%command, "run_shell: spawning command");
    let child = cmd.spawn().map_err(ToolError::Spawn)?;
    let pid = child.id();

    let output = match tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await {
        Ok(Ok(output)) => {
            debug!(status = ?output.status, "run_shell: command completed");
            output
        }
        Ok(Err(e)) => {
            debug!(%e, "run_shell: failed waiting for command");
            return Err(ToolError::Spawn(e));
        }
        Err(_) => {
            warn!(%command, %timeout_secs, "run_shell: command timed out, killing process group");
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            return Err(ToolError::CommandTimeout {
                command: command.to_string(),
                timeout_secs,
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(stdout_len = %stdout.len(), stderr_len = %stderr.len(), "run_shell: output lengths");

    if output.status.success() {
        info!(%command, "run_shell: command succeeded");
        return Ok(ToolResult::success(format!(
            "The Command `{}` executed successfully.\nThe StdOut:\n{}\n\nThe StdErr:\n{}\n",
            command, stdout, stderr
        )));
    }

    let code = output.status.code().unwrap_or(-1);
    debug!(%code, "run_shell: command failed");
    let mut message = format!("The Command `{}` failed with exit code {}", command, code);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        message.push('\n');
        message.push_str(stderr);
    }
    Ok(ToolResult::error(message))
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        debug!(%pid, %e, "kill_process_group: killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {
    // kill_on_drop already terminated the direct child
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::tempdir;

    async fn bash(ctx: &ToolContext, command: &str, timeout: i64) -> ToolResult {
        RunCommandTool
            .execute(serde_json::json!({"shell_command": command, "timeout": timeout}), ctx)
            .await
    }

    #[tokio::test]
    async fn test_run_command_basic() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let result = bash(&ctx, "echo hello", 10).await;

        assert!(!result.is_error);
        assert!(result.content.contains("executed successfully"));
        assert!(result.content.contains("The StdOut:\nhello\n"));
    }

    #[tokio::test]
    async fn test_run_command_success_includes_stderr() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let result = bash(&ctx, "echo warn >&2", 10).await;

        assert!(!result.is_error);
        assert!(result.content.contains("The StdErr:\nwarn\n"));
    }

    #[tokio::test]
    async fn test_run_command_in_workspace_root() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let result = bash(&ctx, "pwd -P", 10).await;

        assert!(!result.is_error);
        assert!(result.content.contains(&*ctx.workspace_root.to_string_lossy()));
    }

    #[tokio::test]
    async fn test_run_command_failure() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let result = bash(&ctx, "echo out; echo boom >&2; exit 3", 10).await;

        assert!(result.is_error);
        assert!(result.content.contains("failed with exit code 3"));
        assert!(result.content.ends_with("\nboom"));
        assert!(!result.content.contains("out"));
    }

    #[tokio::test]
    async fn test_run_command_failure_without_stderr() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let result = bash(&ctx, "false", 10).await;

        assert!(result.is_error);
        assert_eq!(result.content, "The Command `false` failed with exit code 1");
    }

    #[tokio::test]
    async fn test_run_command_timeout() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let started = Instant::now();
        let result = bash(&ctx, "sleep 5", 1).await;

        assert!(result.is_error);
        assert_eq!(result.content, "The Command `sleep 5` timed out after 1 seconds");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_run_command_timeout_kills_children() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());
        let pid_file = temp.path().join("child.pid");

        let command = format!("sleep 30 & echo $! > {}; wait", pid_file.display());
        let result = bash(&ctx, &command, 1).await;
        assert!(result.is_error);
        assert!(result.content.contains("timed out"));

        let pid: u32 = std::fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();

        let mut alive = true;
        for _ in 0..40 {
            if !is_running(pid) {
                alive = false;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(!alive, "background child {} still running after timeout", pid);
    }

    #[cfg(target_os = "linux")]
    fn is_running(pid: u32) -> bool {
        // Zombies awaiting reaping count as gone
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.trim_start().chars().next())
                .is_some_and(|state| state != 'Z' && state != 'X'),
            Err(_) => false,
        }
    }

    #[tokio::test]
    async fn test_run_command_invalid_timeout() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let result = bash(&ctx, "echo hi", 0).await;

        assert!(result.is_error);
        assert!(result.content.contains("timeout must be greater than 0"));
    }

    #[tokio::test]
    async fn test_run_command_missing_command() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let result = RunCommandTool
            .execute(serde_json::json!({"timeout": 5}), &ctx)
            .await;

        assert!(result.is_error);
        assert!(result.content.contains("shell_command"));
    }

    #[tokio::test]
    async fn test_run_command_lossy_output() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf());

        let result = bash(&ctx, "printf 'a\\377b'", 10).await;

        assert!(!result.is_error);
        assert!(result.content.contains("a\u{FFFD}b"));
    }
}
