//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// wt - sandboxed workspace tools
#[derive(Parser)]
#[command(
    name = "wt",
    about = "Sandboxed workspace tools for LLM tool-calling loops",
    version,
    after_help = generate_after_help(),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Workspace root all tools are confined to
    #[arg(short, long, global = true, help = "Workspace root (default: config or current directory)")]
    pub root: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the available tools
    Tools {
        /// Only the read-only profile (read_file, grep, glob, think)
        #[arg(long)]
        read_only: bool,

        /// Print tool definitions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Call one tool with JSON input and print its result
    Call {
        /// Tool name (see `wt tools`)
        tool: String,

        /// JSON object of tool arguments (read from stdin when omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Refuse tools outside the read-only profile
        #[arg(long)]
        read_only: bool,
    },
}

/// Log file location, under the platform data directory
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("worktools")
        .join("logs")
        .join("worktools.log")
}

fn generate_after_help() -> String {
    debug!("generate_after_help: called");
    format!("Logs are written to: {}", get_log_path().display())
}
