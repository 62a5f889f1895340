//! Tool system for an LLM tool-calling loop
//!
//! Tools give a model sandboxed access to one workspace: shell commands, file
//! reads and writes, unique-string edits, regex and glob search, and a
//! persistent todo list. Every tool gets a `ToolContext` scoped to the
//! workspace root - path arguments cannot escape it.

mod atomic;
mod context;
mod error;
mod executor;
mod filters;
mod traits;

pub mod builtin;

pub use atomic::write_atomic;
pub use context::ToolContext;
pub use error::ToolError;
pub use executor::{ToolExecutor, ToolProfile};
pub use traits::{Tool, ToolCall, ToolDefinition, ToolResult};
