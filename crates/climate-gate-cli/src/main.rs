// crates/climate-gate-cli/src/main.rs
// ============================================================================
// Module: Climate Gate CLI Entry Point
// Description: Command dispatcher for the Climate Gate MCP server and tooling.
// Purpose: Serve the tool set, validate configuration, and estimate queries offline.
// Dependencies: clap, climate-gate-config, climate-gate-mcp, serde, thiserror, tokio.
// ============================================================================

//! ## Overview
//! The `climate-gate` binary starts the MCP server over the configured
//! transport, validates configuration files, and runs the admission pipeline
//! without fetching so a query's cost and verdict can be checked from a shell.
//! Query arguments are untrusted input and are read under a size limit.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use climate_gate_config::ClimateGateConfig;
use climate_gate_core::AdmissionDecision;
use climate_gate_core::SizeEstimate;
use climate_gate_core::Verdict;
use climate_gate_mcp::McpServer;
use climate_gate_mcp::QueryDataArgs;
use climate_gate_mcp::QueryPipeline;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a query-arguments document.
const MAX_ARGS_BYTES: usize = 64 * 1024;

/// Exit code for a query the gate rejects.
const REJECTED_EXIT: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "climate-gate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Climate Gate MCP server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Estimate a `query_data` request and print the admission decision.
    Estimate(EstimateCommand),
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to climate-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a Climate Gate configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to climate-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `estimate`.
#[derive(Args, Debug)]
struct EstimateCommand {
    /// Optional config file path (defaults to climate-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Inline `query_data` arguments as JSON.
    #[arg(long, value_name = "JSON", conflicts_with = "args_file")]
    args: Option<String>,
    /// File holding `query_data` arguments as JSON.
    #[arg(long, value_name = "PATH")]
    args_file: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a printable message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors raised while reading bounded inputs.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// Underlying I/O failure.
    #[error("{0}")]
    Io(std::io::Error),
    /// Input exceeds the size limit.
    #[error("size {size} exceeds limit {limit}")]
    TooLarge {
        /// Observed size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("climate-gate {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command,
        } => command_config(&command),
        Commands::Estimate(command) => command_estimate(command).await,
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let help = Cli::command().render_help().to_string();
    write_stdout_line(&help).map_err(|err| CliError::new(output_error("stdout", &err)))
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = ClimateGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let server = tokio::task::spawn_blocking(move || McpServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init failed: join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = ClimateGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Estimate Command
// ============================================================================

/// Admission outcome printed by `estimate`.
#[derive(Debug, Serialize)]
struct EstimateReport {
    /// Threshold classification.
    verdict: Verdict,
    /// Cost estimate of the request as normalized.
    estimate: SizeEstimate,
    /// Decision with warning text or alternatives.
    decision: AdmissionDecision,
}

/// Executes the `estimate` command.
async fn command_estimate(command: EstimateCommand) -> CliResult<ExitCode> {
    let args = read_query_args(command.args.as_deref(), command.args_file.as_deref())?;
    let config = ClimateGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let report = tokio::task::spawn_blocking(move || {
        let server = McpServer::from_config(config)
            .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
        estimate_report(server.router().pipeline(), &args)
    })
    .await
    .map_err(|err| CliError::new(format!("estimate failed: join failed: {err}")))??;

    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|err| CliError::new(format!("failed to encode estimate: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(match report.verdict {
        Verdict::Reject => ExitCode::from(REJECTED_EXIT),
        Verdict::Admit | Verdict::AdmitWithWarning => ExitCode::SUCCESS,
    })
}

/// Runs the admission pipeline for `args` without fetching.
fn estimate_report(pipeline: &QueryPipeline, args: &QueryDataArgs) -> CliResult<EstimateReport> {
    let admission = pipeline
        .estimate_query(args)
        .map_err(|err| CliError::new(format!("estimate failed: {err}")))?;
    Ok(EstimateReport {
        verdict: admission.verdict(),
        estimate: admission.estimate().clone(),
        decision: admission.decision(),
    })
}

/// Decodes `query_data` arguments from inline JSON or a file.
fn read_query_args(inline: Option<&str>, file: Option<&Path>) -> CliResult<QueryDataArgs> {
    let bytes = match (inline, file) {
        (Some(text), None) => {
            if text.len() > MAX_ARGS_BYTES {
                return Err(CliError::new(format!(
                    "--args exceeds {MAX_ARGS_BYTES} bytes"
                )));
            }
            text.as_bytes().to_vec()
        }
        (None, Some(path)) => read_bytes_with_limit(path, MAX_ARGS_BYTES).map_err(|err| {
            CliError::new(format!("failed to read {}: {err}", path.display()))
        })?,
        (None, None) => {
            return Err(CliError::new("one of --args or --args-file is required".to_string()));
        }
        (Some(_), Some(_)) => {
            return Err(CliError::new(
                "--args and --args-file are mutually exclusive".to_string(),
            ));
        }
    };
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("invalid query arguments: {err}")))
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
