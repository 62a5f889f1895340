//! worktools - sandboxed workspace tools for LLM tool-calling loops
//!
//! An orchestration engine hands the model a fixed set of tools and executes
//! the calls it makes. This crate provides those tools, each confined to a
//! single workspace root:
//!
//! - `bash` - shell commands with a hard timeout
//! - `read_file`, `write_file`, `edit_file` - line-numbered reads, full
//!   rewrites, and unique-string replacement
//! - `grep`, `glob` - regex content search and path search with vendor and
//!   binary filtering
//! - `todo_list` - a persistent JSON todo list
//! - `think` - a no-op scratchpad that only logs
//!
//! # Modules
//!
//! - [`tools`] - the `Tool` trait, the path sandbox, and the executor
//! - [`store`] - the todo list store
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface for the `wt` binary

pub mod cli;
pub mod config;
pub mod store;
pub mod tools;

pub use config::Config;
pub use tools::{Tool, ToolCall, ToolContext, ToolDefinition, ToolError, ToolExecutor, ToolProfile, ToolResult};
