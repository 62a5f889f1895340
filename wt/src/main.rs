//! wt - run sandboxed workspace tools from the command line
//!
//! Lists the tool definitions or executes a single tool call against a
//! workspace root, printing the tool's result to stdout.

use std::fs;
use std::io::{IsTerminal, Read};
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use worktools::cli::{Cli, Command, get_log_path};
use worktools::config::Config;
use worktools::tools::{ToolCall, ToolContext, ToolExecutor, ToolProfile};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Tools { read_only, json } => cmd_tools(profile(read_only), json),
        Command::Call { tool, input, read_only } => {
            let root = config.resolve_root(cli.root.as_ref())?;
            info!(root = %root.display(), "main: workspace root resolved");
            let ctx = ToolContext::with_config(root, &config);
            cmd_call(&ctx, profile(read_only), &tool, input).await
        }
    }
}

fn profile(read_only: bool) -> ToolProfile {
    if read_only { ToolProfile::ReadOnly } else { ToolProfile::Full }
}

fn cmd_tools(profile: ToolProfile, json: bool) -> Result<ExitCode> {
    debug!(?profile, %json, "cmd_tools: called");
    let executor = ToolExecutor::with_profile(profile);
    let definitions = executor.definitions();

    if json {
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(ExitCode::SUCCESS);
    }

    for def in &definitions {
        let summary = def.description.split(". ").next().unwrap_or_default();
        println!("{} {}", format!("{:<12}", def.name).green().bold(), summary);
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_call(ctx: &ToolContext, profile: ToolProfile, tool: &str, input: Option<String>) -> Result<ExitCode> {
    debug!(%tool, ?profile, "cmd_call: called");
    let raw = match input {
        Some(raw) => raw,
        None => read_stdin()?,
    };
    let input: serde_json::Value = if raw.trim().is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str(&raw).context("Tool input is not valid JSON")?
    };
    if !input.is_object() {
        return Err(eyre!("Tool input must be a JSON object"));
    }

    let executor = ToolExecutor::with_profile(profile);
    let call = ToolCall {
        id: "cli".to_string(),
        name: tool.to_string(),
        input,
    };
    let result = executor.execute(&call, ctx).await;

    println!("{}", result.content);
    if result.is_error {
        info!(%tool, "cmd_call: tool returned an error");
        eprintln!("{} {}", "error:".red().bold(), format!("{} failed", tool).red());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn read_stdin() -> Result<String> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        debug!("read_stdin: stdin is a terminal, using empty input");
        return Ok(String::new());
    }
    let mut buf = String::new();
    stdin.read_to_string(&mut buf).context("Failed to read tool input from stdin")?;
    Ok(buf)
}
