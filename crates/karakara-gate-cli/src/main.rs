// crates/karakara-gate-cli/src/main.rs
// ============================================================================
// Module: Karakara Gate CLI Entry Point
// Description: Command dispatcher for the auth service and one-off checks.
// Purpose: Run the gate, probe single decisions and validate configuration.
// Dependencies: clap, karakara-gate-config, karakara-gate-core,
// karakara-gate-server, tokio, tracing-subscriber.
// ============================================================================

//! ## Overview
//! The `karakara-gate` binary runs the broker auth service and answers single
//! access or credential checks from the command line. Check commands print
//! `allow` or `deny` and exit 0 on allow, 1 on deny and 2 on errors. Logs go
//! to stderr so stdout carries only command output.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use karakara_gate_config::GateConfig;
use karakara_gate_core::ConnectionContext;
use karakara_gate_core::Identity;
use karakara_gate_core::Operation;
use karakara_gate_core::ProtocolKind;
use karakara_gate_core::Secret;
use karakara_gate_core::Verdict;
use karakara_gate_server::GateServer;
use karakara_gate_server::build_gate;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "karakara-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the broker auth service.
    Serve(ConfigArgs),
    /// Evaluate a single decision.
    Check {
        /// Selected check subcommand.
        #[command(subcommand)]
        command: CheckCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Check subcommands.
#[derive(Subcommand, Debug)]
enum CheckCommand {
    /// Decide a topic operation.
    Access(CheckAccessCommand),
    /// Decide a connect-time credential check.
    Credentials(CheckCredentialsCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate(ConfigArgs),
}

/// Config file selection shared by every command.
#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// Optional config file path (defaults to karakara-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Connection facts shared by the check commands.
#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Protocol the client connected with.
    #[arg(long, value_enum)]
    protocol: ProtocolArg,
    /// Client transport address; omit for broker-internal connections.
    #[arg(long, value_name = "ADDR")]
    address: Option<String>,
    /// Identity presented by the client.
    #[arg(long, value_name = "ID")]
    identity: Option<String>,
}

impl ConnectionArgs {
    /// Builds the connection context these facts describe.
    fn to_context(&self) -> ConnectionContext {
        ConnectionContext::establish(
            self.address.clone(),
            self.protocol.into(),
            self.identity.clone().map(Identity::new),
        )
    }
}

/// Arguments for `check access`.
#[derive(Args, Debug)]
struct CheckAccessCommand {
    /// Connection facts.
    #[command(flatten)]
    connection: ConnectionArgs,
    /// Requested topic operation.
    #[arg(long, value_enum)]
    operation: OperationArg,
    /// Topic path or subscription filter.
    #[arg(long, value_name = "TOPIC")]
    topic: String,
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
}

/// Arguments for `check credentials`.
#[derive(Args, Debug)]
struct CheckCredentialsCommand {
    /// Connection facts.
    #[command(flatten)]
    connection: ConnectionArgs,
    /// Secret presented by the client.
    #[arg(long, value_name = "SECRET")]
    secret: Option<String>,
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
}

/// Protocol selections.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum ProtocolArg {
    /// Raw MQTT.
    Mqtt,
    /// MQTT over websockets.
    Websockets,
}

impl From<ProtocolArg> for ProtocolKind {
    fn from(value: ProtocolArg) -> Self {
        match value {
            ProtocolArg::Mqtt => Self::Mqtt,
            ProtocolArg::Websockets => Self::Websockets,
        }
    }
}

/// Topic operation selections.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OperationArg {
    /// Receive a delivered message.
    Read,
    /// Publish.
    Write,
    /// Register a subscription filter.
    Subscribe,
}

impl From<OperationArg> for Operation {
    fn from(value: OperationArg) -> Self {
        match value {
            OperationArg::Read => Self::Read,
            OperationArg::Write => Self::Write,
            OperationArg::Subscribe => Self::Subscribe,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
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

/// Exit code for command errors, distinct from a deny verdict.
const EXIT_ERROR: u8 = 2;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    init_logging();
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Installs the stderr log subscriber, honoring `RUST_LOG`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Executes the CLI command dispatcher.
async fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Serve(command) => command_serve(&command).await,
        Commands::Check {
            command,
        } => match command {
            CheckCommand::Access(command) => command_check_access(&command),
            CheckCommand::Credentials(command) => command_check_credentials(&command).await,
        },
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(command) => command_config_validate(&command),
        },
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Loads configuration for a command.
fn load_config(args: &ConfigArgs) -> CliResult<GateConfig> {
    GateConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Executes the `serve` command.
async fn command_serve(command: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(command)?;
    let server = GateServer::from_config(&config)
        .map_err(|err| CliError::new(format!("auth service init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("auth service failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `check access`.
fn command_check_access(command: &CheckAccessCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let verdict = evaluate_access(&config, command)?;
    report_verdict(verdict)
}

/// Executes `check credentials`.
async fn command_check_credentials(command: &CheckCredentialsCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let verdict = evaluate_credentials(&config, command).await?;
    report_verdict(verdict)
}

/// Executes `config validate`.
fn command_config_validate(command: &ConfigArgs) -> CliResult<ExitCode> {
    let _config = load_config(command)?;
    write_stdout_line("ok").map_err(|err| output_error(&err))?;
    Ok(ExitCode::SUCCESS)
}

/// Decides a topic operation against the configured gate.
fn evaluate_access(config: &GateConfig, command: &CheckAccessCommand) -> CliResult<Verdict> {
    let gate =
        build_gate(config).map_err(|err| CliError::new(format!("gate init failed: {err}")))?;
    let connection = command.connection.to_context();
    Ok(gate.authorize(&connection, command.operation.into(), &command.topic))
}

/// Decides a credential check against the configured gate.
async fn evaluate_credentials(
    config: &GateConfig,
    command: &CheckCredentialsCommand,
) -> CliResult<Verdict> {
    let gate =
        build_gate(config).map_err(|err| CliError::new(format!("gate init failed: {err}")))?;
    let connection = command.connection.to_context();
    let secret = command.secret.clone().map(Secret::new);
    Ok(gate.authenticate(&connection, secret.as_ref()).await)
}

/// Prints a verdict and maps it to the process exit code.
fn report_verdict(verdict: Verdict) -> CliResult<ExitCode> {
    write_stdout_line(verdict.as_str()).map_err(|err| output_error(&err))?;
    Ok(verdict_exit_code(verdict))
}

/// Exit code for a verdict.
const fn verdict_exit_code(verdict: Verdict) -> ExitCode {
    if verdict.is_allow() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

// ============================================================================
// SECTION: Output
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

/// Wraps an output failure.
fn output_error(error: &std::io::Error) -> CliError {
    CliError::new(format!("failed to write output: {error}"))
}

/// Prints an error and returns the error exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::from(EXIT_ERROR)
}
