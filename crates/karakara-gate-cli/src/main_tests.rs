// crates/karakara-gate-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and check evaluation.
// Purpose: Ensure check commands reach the gate with the intended facts.
// Dependencies: karakara-gate-cli main helpers
// ============================================================================

//! ## Overview
//! Validates clap parsing of the check commands and that evaluation follows
//! the configured gate without needing a live identity authority.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use clap::Parser;
use karakara_gate_config::GateConfig;
use karakara_gate_core::Origin;
use karakara_gate_core::Verdict;

use super::CheckAccessCommand;
use super::CheckCommand;
use super::CheckCredentialsCommand;
use super::Cli;
use super::Commands;
use super::ConfigArgs;
use super::ConfigCommand;
use super::OperationArg;
use super::ProtocolArg;
use super::evaluate_access;
use super::evaluate_credentials;
use super::load_config;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Config with auditing disabled and defaults elsewhere.
fn quiet_config() -> GateConfig {
    GateConfig::from_bytes(b"[audit]\nsink = \"none\"\n").unwrap()
}

/// Parses a `check access` command line.
fn parse_access(args: &[&str]) -> CheckAccessCommand {
    let mut argv = vec!["karakara-gate", "check", "access"];
    argv.extend_from_slice(args);
    match Cli::try_parse_from(argv).unwrap().command {
        Commands::Check {
            command: CheckCommand::Access(command),
        } => command,
        _ => panic!("expected check access"),
    }
}

/// Parses a `check credentials` command line.
fn parse_credentials(args: &[&str]) -> CheckCredentialsCommand {
    let mut argv = vec!["karakara-gate", "check", "credentials"];
    argv.extend_from_slice(args);
    match Cli::try_parse_from(argv).unwrap().command {
        Commands::Check {
            command: CheckCommand::Credentials(command),
        } => command,
        _ => panic!("expected check credentials"),
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn check_access_parses_connection_facts() {
    let command = parse_access(&[
        "--protocol",
        "websockets",
        "--address",
        "203.0.113.9",
        "--identity",
        "alice",
        "--operation",
        "write",
        "--topic",
        "karakara/room/alice/x",
    ]);
    assert_eq!(command.connection.protocol, ProtocolArg::Websockets);
    assert_eq!(command.operation, OperationArg::Write);
    assert_eq!(command.connection.to_context().origin(), Origin::GatewayUntrusted);
    assert!(command.config.config.is_none());
}

#[test]
fn omitted_address_means_internal() {
    let command =
        parse_access(&["--protocol", "mqtt", "--operation", "read", "--topic", "anything"]);
    assert_eq!(command.connection.to_context().origin(), Origin::Internal);
}

#[test]
fn unknown_protocol_and_operation_are_rejected() {
    let bad_protocol = Cli::try_parse_from([
        "karakara-gate",
        "check",
        "access",
        "--protocol",
        "carrier",
        "--operation",
        "read",
        "--topic",
        "x",
    ]);
    assert!(bad_protocol.is_err());
    let bad_operation = Cli::try_parse_from([
        "karakara-gate",
        "check",
        "access",
        "--protocol",
        "mqtt",
        "--operation",
        "delete",
        "--topic",
        "x",
    ]);
    assert!(bad_operation.is_err());
}

#[test]
fn config_validate_accepts_explicit_path() {
    let cli = Cli::try_parse_from(["karakara-gate", "config", "validate", "--config", "gate.toml"])
        .unwrap();
    let Commands::Config {
        command: ConfigCommand::Validate(args),
    } = cli.command
    else {
        panic!("expected config validate");
    };
    assert_eq!(args.config.unwrap().to_str(), Some("gate.toml"));
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

#[test]
fn access_checks_follow_room_rules() {
    let config = quiet_config();
    let own = parse_access(&[
        "--protocol",
        "websockets",
        "--address",
        "203.0.113.9",
        "--identity",
        "alice",
        "--operation",
        "write",
        "--topic",
        "karakara/room/alice/x",
    ]);
    assert_eq!(evaluate_access(&config, &own).unwrap(), Verdict::Allow);
    let other = parse_access(&[
        "--protocol",
        "websockets",
        "--address",
        "203.0.113.9",
        "--identity",
        "alice",
        "--operation",
        "write",
        "--topic",
        "karakara/room/bob/x",
    ]);
    assert_eq!(evaluate_access(&config, &other).unwrap(), Verdict::Deny);
}

#[tokio::test]
async fn raw_credentials_are_trusted_without_the_authority() {
    let config = quiet_config();
    let command = parse_credentials(&["--protocol", "mqtt", "--address", "10.0.0.2"]);
    assert_eq!(evaluate_credentials(&config, &command).await.unwrap(), Verdict::Allow);
}

#[tokio::test]
async fn gateway_without_secret_is_denied() {
    let config = quiet_config();
    let command = parse_credentials(&[
        "--protocol",
        "websockets",
        "--address",
        "203.0.113.9",
        "--identity",
        "alice",
    ]);
    assert_eq!(evaluate_credentials(&config, &command).await.unwrap(), Verdict::Deny);
}

#[test]
fn load_config_reports_invalid_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("karakara-gate.toml");
    fs::write(&path, "[rules]\nroom_root = \"karakara/room\"\n").unwrap();
    let err = load_config(&ConfigArgs {
        config: Some(path),
    })
    .unwrap_err();
    assert!(err.to_string().contains("config load failed"));
}
