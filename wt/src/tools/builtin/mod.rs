//! Built-in workspace tools

mod edit_file;
mod glob;
mod grep;
mod read_file;
mod run_command;
mod think;
mod todo;
mod write_file;

pub use edit_file::EditFileTool;
pub use glob::GlobTool;
pub use grep::GrepTool;
pub use read_file::ReadFileTool;
pub use run_command::RunCommandTool;
pub use think::ThinkTool;
pub use todo::TodoTool;
pub use write_file::WriteFileTool;

use crate::tools::ToolError;

/// Run blocking filesystem work off the async runtime
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, ToolError>
where
    F: FnOnce() -> Result<T, ToolError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) => Err(ToolError::Worker(e.to_string())),
    }
}
