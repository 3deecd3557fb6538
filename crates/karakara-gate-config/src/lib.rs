// crates/karakara-gate-config/src/lib.rs
// ============================================================================
// Module: Karakara Gate Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for karakara-gate.toml semantics.
// Dependencies: karakara-gate-core, karakara-gate-verifier, serde, toml
// ============================================================================

//! ## Overview
//! `karakara-gate-config` defines the configuration model for Karakara Gate
//! and provides strict, fail-closed validation. Validated configuration is
//! turned into a [`karakara_gate_core::RulePolicy`] and a
//! [`karakara_gate_verifier::HttpVerifierConfig`].
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
